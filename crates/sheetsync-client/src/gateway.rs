use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use sheetsync_core::{Workbook, Worksheet, WorksheetId};

use crate::error::NetworkError;

/// Access to the remote workbook/worksheet API.
///
/// Each call performs exactly one HTTP request. Dropping the returned future
/// abandons the request; that is how in-flight fetches are cancelled.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// `GET /workbooks`
    async fn fetch_workbooks(&self) -> Result<Vec<Workbook>, NetworkError>;

    /// `GET /worksheets/{id}`
    async fn fetch_worksheet(&self, id: &WorksheetId) -> Result<Worksheet, NetworkError>;

    /// `PATCH /worksheets/{id}` with the full updated worksheet
    async fn patch_worksheet(
        &self,
        id: &WorksheetId,
        worksheet: &Worksheet,
    ) -> Result<Worksheet, NetworkError>;
}

/// [`Gateway`] backed by `reqwest`
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: Client,
    base_url: Url,
}

impl HttpGateway {
    pub fn new(base_url: &str) -> Result<Self, NetworkError> {
        let invalid = |message: String| NetworkError::Transport {
            url: base_url.to_string(),
            message,
        };
        let base_url = Url::parse(base_url).map_err(|e| invalid(e.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(invalid("base URL cannot carry a path".to_string()));
        }
        let client = Client::builder()
            .build()
            .map_err(|e| invalid(e.to_string()))?;
        Ok(Self { client, base_url })
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        url: &Url,
    ) -> Result<T, NetworkError> {
        let url = url.as_str();
        let response = request
            .send()
            .await
            .map_err(|e| NetworkError::from_reqwest(url, e))?;
        let response = response
            .error_for_status()
            .map_err(|e| NetworkError::from_reqwest(url, e))?;
        response
            .json::<T>()
            .await
            .map_err(|e| NetworkError::from_reqwest(url, e))
    }
}

#[async_trait]
impl Gateway for HttpGateway {
    async fn fetch_workbooks(&self) -> Result<Vec<Workbook>, NetworkError> {
        let url = self.endpoint(&["workbooks"]);
        tracing::debug!("GET {}", url);
        self.send_json(self.client.get(url.clone()), &url).await
    }

    async fn fetch_worksheet(&self, id: &WorksheetId) -> Result<Worksheet, NetworkError> {
        let id = id.to_string();
        let url = self.endpoint(&["worksheets", &id]);
        tracing::debug!("GET {}", url);
        self.send_json(self.client.get(url.clone()), &url).await
    }

    async fn patch_worksheet(
        &self,
        id: &WorksheetId,
        worksheet: &Worksheet,
    ) -> Result<Worksheet, NetworkError> {
        let id = id.to_string();
        let url = self.endpoint(&["worksheets", &id]);
        tracing::debug!(rows = worksheet.row_count(), columns = worksheet.columns.len(), "PATCH {}", url);
        self.send_json(self.client.patch(url.clone()).json(worksheet), &url)
            .await
    }
}
