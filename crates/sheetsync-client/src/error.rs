use sheetsync_core::{EditError, WorksheetId};
use thiserror::Error;

/// The single failure kind for every request made to the API.
///
/// Callers only ever see "it failed"; the variants keep the cause for logs.
/// Not-found responses are not distinguished from other statuses.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NetworkError {
    #[error("Request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("Request to {url} returned status {status}")]
    Status { url: String, status: u16 },

    #[error("Invalid response from {url}: {message}")]
    Decode { url: String, message: String },
}

impl NetworkError {
    pub(crate) fn from_reqwest(url: &str, err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return NetworkError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            };
        }
        if err.is_decode() {
            return NetworkError::Decode {
                url: url.to_string(),
                message: err.to_string(),
            };
        }
        NetworkError::Transport {
            url: url.to_string(),
            message: err.to_string(),
        }
    }

    /// HTTP status, when the server answered
    pub fn status(&self) -> Option<u16> {
        match self {
            NetworkError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn url(&self) -> &str {
        match self {
            NetworkError::Transport { url, .. }
            | NetworkError::Status { url, .. }
            | NetworkError::Decode { url, .. } => url,
        }
    }
}

/// Errors from the worksheet client
#[derive(Error, Debug)]
pub enum SyncError {
    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error(transparent)]
    Edit(#[from] EditError),

    #[error("Worksheet {0} has not been loaded")]
    NotLoaded(WorksheetId),
}
