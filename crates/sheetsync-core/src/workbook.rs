use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Identifier used by the API for workbooks, worksheets and rows.
///
/// The API hands out both numeric and string ids, so either is accepted and
/// written back in the same shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResourceId {
    Int(i64),
    Text(String),
}

/// Key of a workbook menu entry
pub type WorkbookKey = ResourceId;
/// Identifier of a worksheet resource
pub type WorksheetId = ResourceId;
/// Identifier of a row inside a worksheet
pub type RowId = ResourceId;

impl ResourceId {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            ResourceId::Int(n) => Some(*n),
            ResourceId::Text(_) => None,
        }
    }

    /// Parse user input, preferring the numeric form
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        match input.parse::<i64>() {
            Ok(n) => ResourceId::Int(n),
            Err(_) => ResourceId::Text(input.to_string()),
        }
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceId::Int(n) => write!(f, "{}", n),
            ResourceId::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for ResourceId {
    fn from(n: i64) -> Self {
        ResourceId::Int(n)
    }
}

impl From<&str> for ResourceId {
    fn from(s: &str) -> Self {
        ResourceId::Text(s.to_string())
    }
}

/// Reference from a workbook to one of its worksheets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorksheetRef {
    pub worksheet_id: WorksheetId,
    #[serde(default)]
    pub worksheet_name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A workbook as listed by the API. Read-only on the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workbook {
    /// Menu key
    pub key: WorkbookKey,
    /// Display label
    #[serde(default)]
    pub label: String,
    /// Worksheets in tab order
    #[serde(rename = "worksheetIds", default)]
    pub worksheets: Vec<WorksheetRef>,
    /// Fields the client does not interpret
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Workbook {
    pub fn new(key: impl Into<WorkbookKey>, label: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            worksheets: Vec::new(),
            extra: Map::new(),
        }
    }

    /// Append a worksheet reference
    pub fn with_worksheet(mut self, id: impl Into<WorksheetId>, name: impl Into<String>) -> Self {
        self.worksheets.push(WorksheetRef {
            worksheet_id: id.into(),
            worksheet_name: name.into(),
            extra: Map::new(),
        });
        self
    }

    /// Case-insensitive substring match on the label
    pub fn matches_label(&self, query: &str) -> bool {
        self.label.to_lowercase().contains(&query.to_lowercase())
    }
}
