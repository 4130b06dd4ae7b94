use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::cell::CellValue;
use crate::editor::EditorKind;
use crate::workbook::{RowId, WorksheetId};

/// A column definition as stored by the API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    /// Key into row data, unique within a worksheet
    pub field: String,
    /// Display label
    #[serde(default)]
    pub name: String,
    /// Declared value type, drives the cell editor
    #[serde(rename = "dataType", default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<EditorKind>,
    /// Display settings and other server fields, sent back untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Column {
    pub fn new(field: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            name: name.into(),
            data_type: None,
            extra: Map::new(),
        }
    }

    pub fn with_type(mut self, kind: EditorKind) -> Self {
        self.data_type = Some(kind);
        self
    }

    /// Editor kind, text when the column does not declare one
    pub fn editor_kind(&self) -> EditorKind {
        self.data_type.unwrap_or_default()
    }
}

/// A single row: cell values keyed by column field
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Row {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RowId>,
    #[serde(flatten)]
    pub cells: BTreeMap<String, CellValue>,
}

impl Row {
    pub fn new(id: impl Into<RowId>) -> Self {
        Self {
            id: Some(id.into()),
            cells: BTreeMap::new(),
        }
    }

    pub fn with_cell(mut self, field: impl Into<String>, value: impl Into<CellValue>) -> Self {
        self.cells.insert(field.into(), value.into());
        self
    }

    pub fn get(&self, field: &str) -> Option<&CellValue> {
        self.cells.get(field)
    }
}

/// Row container, shaped `{ "data": [...] }` on the wire
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Rows {
    #[serde(default)]
    pub data: Vec<Row>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A worksheet: one table of columns and rows
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Worksheet {
    #[serde(rename = "worksheetId", default, skip_serializing_if = "Option::is_none")]
    pub worksheet_id: Option<WorksheetId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub columns: Vec<Column>,
    #[serde(default)]
    pub rows: Rows,
    /// Server fields the client does not interpret, sent back untouched on PATCH
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Worksheet {
    pub fn new(id: impl Into<WorksheetId>, name: impl Into<String>) -> Self {
        Self {
            worksheet_id: Some(id.into()),
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn with_column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    pub fn with_row(mut self, row: Row) -> Self {
        self.rows.data.push(row);
        self
    }

    pub fn row_count(&self) -> usize {
        self.rows.data.len()
    }

    pub fn column(&self, field: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.field == field)
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.column(field).is_some()
    }

    pub fn row(&self, id: &RowId) -> Option<&Row> {
        self.rows.data.iter().find(|r| r.id.as_ref() == Some(id))
    }

    pub fn row_mut(&mut self, id: &RowId) -> Option<&mut Row> {
        self.rows.data.iter_mut().find(|r| r.id.as_ref() == Some(id))
    }

    /// Next free integer row id (string ids are ignored).
    ///
    /// `None` once the highest id is `i64::MAX`.
    pub fn next_row_id(&self) -> Option<i64> {
        self.rows
            .data
            .iter()
            .filter_map(|r| r.id.as_ref().and_then(|id| id.as_int()))
            .max()
            .unwrap_or(0)
            .checked_add(1)
    }

    /// Fields that appear more than once in the column set
    pub fn duplicate_fields(&self) -> Vec<&str> {
        let mut seen = std::collections::HashSet::new();
        let mut dups = Vec::new();
        for column in &self.columns {
            if !seen.insert(column.field.as_str()) && !dups.contains(&column.field.as_str()) {
                dups.push(column.field.as_str());
            }
        }
        dups
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "id": 5,
            "worksheetId": 5,
            "name": "Products",
            "columns": [
                {"field": "a", "name": "A", "width": 120, "pinned": "left"},
                {"field": "price", "name": "Price", "dataType": "number"}
            ],
            "rows": {"data": [{"id": 1, "a": "x", "price": 9.5}, {"id": 2, "a": "y"}]}
        })
    }

    #[test]
    fn test_worksheet_from_api() {
        let ws: Worksheet = serde_json::from_value(sample()).unwrap();
        assert_eq!(ws.worksheet_id, Some(5.into()));
        assert_eq!(ws.columns.len(), 2);
        assert_eq!(ws.columns[1].editor_kind(), EditorKind::Number);
        assert_eq!(ws.row_count(), 2);
        assert_eq!(ws.row(&1.into()).unwrap().get("a"), Some(&CellValue::from("x")));
        assert_eq!(ws.extra.get("id"), Some(&json!(5)));
        assert_eq!(ws.columns[0].extra.get("width"), Some(&json!(120)));
    }

    #[test]
    fn test_unknown_fields_survive_round_trip() {
        let ws: Worksheet = serde_json::from_value(sample()).unwrap();
        let back = serde_json::to_value(&ws).unwrap();
        assert_eq!(back, sample());
    }

    #[test]
    fn test_missing_sections_default_to_empty() {
        let ws: Worksheet = serde_json::from_value(json!({})).unwrap();
        assert!(ws.columns.is_empty());
        assert_eq!(ws.row_count(), 0);
        assert_eq!(ws.next_row_id(), Some(1));
    }

    #[test]
    fn test_next_row_id_skips_text_ids() {
        let ws = Worksheet::default()
            .with_row(Row::new(4))
            .with_row(Row::new("temp"))
            .with_row(Row::new(2));
        assert_eq!(ws.next_row_id(), Some(5));
    }

    #[test]
    fn test_next_row_id_at_max() {
        let ws = Worksheet::default().with_row(Row::new(i64::MAX));
        assert_eq!(ws.next_row_id(), None);
    }

    #[test]
    fn test_duplicate_fields() {
        let ws = Worksheet::default()
            .with_column(Column::new("a", "A"))
            .with_column(Column::new("b", "B"))
            .with_column(Column::new("a", "Again"));
        assert_eq!(ws.duplicate_fields(), vec!["a"]);
    }
}
