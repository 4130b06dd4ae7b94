use thiserror::Error;

use crate::editor::EditorKind;
use crate::workbook::ResourceId;

/// Errors produced while turning a baseline worksheet into an edited candidate
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EditError {
    #[error("Edit has nothing to apply")]
    EmptyEdit,

    #[error("Column field cannot be blank")]
    BlankField,

    #[error("Column field '{0}' already exists")]
    DuplicateField(String),

    #[error("Unknown column field '{0}'")]
    UnknownField(String),

    #[error("Row {0} not found")]
    UnknownRow(ResourceId),

    #[error("'{input}' is not a valid {kind} value")]
    InvalidInput { kind: EditorKind, input: String },

    #[error("No row id left after the largest existing one")]
    RowIdExhausted,
}

impl EditError {
    /// Stable machine-readable code for the error
    pub fn code(&self) -> &'static str {
        match self {
            EditError::EmptyEdit => "EMPTY_EDIT",
            EditError::BlankField => "BLANK_FIELD",
            EditError::DuplicateField(_) => "DUPLICATE_FIELD",
            EditError::UnknownField(_) => "UNKNOWN_FIELD",
            EditError::UnknownRow(_) => "UNKNOWN_ROW",
            EditError::InvalidInput { .. } => "INVALID_INPUT",
            EditError::RowIdExhausted => "ROW_ID_EXHAUSTED",
        }
    }
}

/// Errors reported by the add-rows and add-columns forms
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormError {
    #[error("Please add the number of rows to add")]
    MissingRowCount,

    #[error("'{0}' is not a positive number of rows")]
    InvalidRowCount(String),

    #[error("Please add a header name for column {0}")]
    MissingHeaderName(usize),

    #[error("Please add a unique field name for column {0}")]
    MissingFieldName(usize),

    #[error("Expected HEADER:FIELD, got '{0}'")]
    MalformedColumn(String),

    #[error("At least one column is required")]
    NoColumns,
}
