//! Cell editor capabilities.
//!
//! Every column carries an explicit [`EditorKind`]. Rendering and editing code
//! resolves the behaviour for a kind through [`editor_for`] instead of
//! dispatching on editor names.

use chrono::{NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::cell::CellValue;
use crate::error::EditError;

/// The kind of editor a column uses
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditorKind {
    #[default]
    Text,
    Number,
    Boolean,
    Date,
}

impl EditorKind {
    pub const ALL: [EditorKind; 4] = [
        EditorKind::Text,
        EditorKind::Number,
        EditorKind::Boolean,
        EditorKind::Date,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EditorKind::Text => "text",
            EditorKind::Number => "number",
            EditorKind::Boolean => "boolean",
            EditorKind::Date => "date",
        }
    }
}

impl fmt::Display for EditorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Behaviour shared by all cell editors
pub trait CellEditor: Send + Sync {
    fn kind(&self) -> EditorKind;

    /// Value placed in a freshly added row
    fn default_value(&self) -> CellValue;

    /// Convert text typed by the user into a cell value
    fn parse_input(&self, input: &str) -> Result<CellValue, EditError>;
}

struct TextEditor;
struct NumberEditor;
struct BooleanEditor;
struct DateEditor;

static TEXT: TextEditor = TextEditor;
static NUMBER: NumberEditor = NumberEditor;
static BOOLEAN: BooleanEditor = BooleanEditor;
static DATE: DateEditor = DateEditor;

/// Look up the editor for a column kind
pub fn editor_for(kind: EditorKind) -> &'static dyn CellEditor {
    match kind {
        EditorKind::Text => &TEXT,
        EditorKind::Number => &NUMBER,
        EditorKind::Boolean => &BOOLEAN,
        EditorKind::Date => &DATE,
    }
}

fn invalid(kind: EditorKind, input: &str) -> EditError {
    EditError::InvalidInput {
        kind,
        input: input.to_string(),
    }
}

impl CellEditor for TextEditor {
    fn kind(&self) -> EditorKind {
        EditorKind::Text
    }

    fn default_value(&self) -> CellValue {
        CellValue::Text(String::new())
    }

    fn parse_input(&self, input: &str) -> Result<CellValue, EditError> {
        Ok(CellValue::Text(input.to_string()))
    }
}

impl CellEditor for NumberEditor {
    fn kind(&self) -> EditorKind {
        EditorKind::Number
    }

    fn default_value(&self) -> CellValue {
        CellValue::from(0)
    }

    fn parse_input(&self, input: &str) -> Result<CellValue, EditError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Ok(CellValue::Null);
        }
        if let Ok(n) = trimmed.parse::<i64>() {
            return Ok(CellValue::from(n));
        }
        trimmed
            .parse::<f64>()
            .ok()
            .and_then(CellValue::from_f64)
            .ok_or_else(|| invalid(EditorKind::Number, input))
    }
}

impl CellEditor for BooleanEditor {
    fn kind(&self) -> EditorKind {
        EditorKind::Boolean
    }

    fn default_value(&self) -> CellValue {
        CellValue::Bool(false)
    }

    fn parse_input(&self, input: &str) -> Result<CellValue, EditError> {
        match input.trim().to_lowercase().as_str() {
            "" => Ok(CellValue::Null),
            "true" | "yes" | "1" => Ok(CellValue::Bool(true)),
            "false" | "no" | "0" => Ok(CellValue::Bool(false)),
            _ => Err(invalid(EditorKind::Boolean, input)),
        }
    }
}

impl CellEditor for DateEditor {
    fn kind(&self) -> EditorKind {
        EditorKind::Date
    }

    fn default_value(&self) -> CellValue {
        CellValue::Text(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    fn parse_input(&self, input: &str) -> Result<CellValue, EditError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Ok(CellValue::Null);
        }
        if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(trimmed) {
            let utc = dt.with_timezone(&Utc);
            return Ok(CellValue::Text(
                utc.to_rfc3339_opts(SecondsFormat::Millis, true),
            ));
        }
        let date = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
            .map_err(|_| invalid(EditorKind::Date, input))?;
        let midnight = date
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| invalid(EditorKind::Date, input))?
            .and_utc();
        Ok(CellValue::Text(
            midnight.to_rfc3339_opts(SecondsFormat::Millis, true),
        ))
    }
}
