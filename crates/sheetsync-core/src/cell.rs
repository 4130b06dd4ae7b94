use serde::{Deserialize, Serialize};
use serde_json::Number;
use std::fmt;

/// A scalar stored in a row under a column field.
///
/// Numbers keep their JSON representation, so an integer read from the API is
/// written back as an integer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Null,
    Bool(bool),
    Number(Number),
    Text(String),
}

impl Default for CellValue {
    fn default() -> Self {
        CellValue::Null
    }
}

impl CellValue {
    /// Build a number cell, `None` for NaN or infinite values
    pub fn from_f64(n: f64) -> Option<Self> {
        Number::from_f64(n).map(CellValue::Number)
    }

    /// Check if the value is null
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Try to get the value as a number
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => n.as_f64(),
            CellValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Try to get the value as a boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            CellValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Text shown in a grid cell
    pub fn as_text(&self) -> String {
        match self {
            CellValue::Null => String::new(),
            CellValue::Bool(b) => b.to_string(),
            CellValue::Number(n) => n.to_string(),
            CellValue::Text(s) => s.clone(),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_text())
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Bool(b)
    }
}

impl From<i64> for CellValue {
    fn from(n: i64) -> Self {
        CellValue::Number(n.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_integers_round_trip_as_integers() {
        let value: CellValue = serde_json::from_value(json!(7)).unwrap();
        assert_eq!(value, CellValue::from(7));
        assert_eq!(serde_json::to_value(&value).unwrap(), json!(7));
    }

    #[test]
    fn test_untagged_variants() {
        let values: Vec<CellValue> =
            serde_json::from_value(json!([null, true, 2.5, "x"])).unwrap();
        assert!(values[0].is_null());
        assert_eq!(values[1].as_bool(), Some(true));
        assert_eq!(values[2].as_f64(), Some(2.5));
        assert_eq!(values[3], CellValue::from("x"));
    }

    #[test]
    fn test_as_text() {
        assert_eq!(CellValue::Null.as_text(), "");
        assert_eq!(CellValue::from(false).as_text(), "false");
        assert_eq!(CellValue::from(42).as_text(), "42");
        assert_eq!(CellValue::from_f64(f64::NAN), None);
    }
}
