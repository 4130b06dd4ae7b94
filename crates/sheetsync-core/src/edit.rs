//! Local worksheet edits.
//!
//! An edit turns the last known worksheet (the baseline) into a candidate that
//! is submitted to the API as a whole. The baseline itself is never modified.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashSet;

use crate::cell::CellValue;
use crate::editor::editor_for;
use crate::error::EditError;
use crate::sheet::{Column, Row, Worksheet};
use crate::workbook::{ResourceId, RowId};

/// Worksheet field listing the columns picked for display
const SELECTED_COLUMNS: &str = "selectedColumns";

/// A column requested through the add-columns form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewColumn {
    pub header_name: String,
    pub field: String,
}

impl NewColumn {
    pub fn new(header_name: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            header_name: header_name.into(),
            field: field.into(),
        }
    }
}

impl From<NewColumn> for Column {
    fn from(c: NewColumn) -> Self {
        Column::new(c.field, c.header_name)
    }
}

/// An edit applied to a worksheet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorksheetEdit {
    /// Append blank rows
    AddRows { count: usize },
    /// Append columns after the existing ones
    AddColumns { columns: Vec<NewColumn> },
    /// Remove the selected rows
    DeleteRows { ids: Vec<RowId> },
    /// Set a single cell
    UpdateCell {
        row_id: RowId,
        field: String,
        value: CellValue,
    },
}

impl WorksheetEdit {
    pub fn add_row() -> Self {
        WorksheetEdit::AddRows { count: 1 }
    }

    /// Short label used in logs
    pub fn describe(&self) -> &'static str {
        match self {
            WorksheetEdit::AddRows { .. } => "add rows",
            WorksheetEdit::AddColumns { .. } => "add columns",
            WorksheetEdit::DeleteRows { .. } => "delete rows",
            WorksheetEdit::UpdateCell { .. } => "update cell",
        }
    }

    /// Produce the candidate worksheet for this edit
    pub fn apply(&self, baseline: &Worksheet) -> Result<Worksheet, EditError> {
        let mut candidate = baseline.clone();
        match self {
            WorksheetEdit::AddRows { count } => {
                if *count == 0 {
                    return Err(EditError::EmptyEdit);
                }
                let first_id = baseline.next_row_id().ok_or(EditError::RowIdExhausted)?;
                for offset in 0..*count {
                    let id = i64::try_from(offset)
                        .ok()
                        .and_then(|offset| first_id.checked_add(offset))
                        .ok_or(EditError::RowIdExhausted)?;
                    candidate.rows.data.push(blank_row(baseline, id));
                }
            }
            WorksheetEdit::AddColumns { columns } => {
                if columns.is_empty() {
                    return Err(EditError::EmptyEdit);
                }
                let mut fields: HashSet<&str> =
                    baseline.columns.iter().map(|c| c.field.as_str()).collect();
                for column in columns {
                    let field = column.field.trim();
                    if field.is_empty() {
                        return Err(EditError::BlankField);
                    }
                    if !fields.insert(field) {
                        return Err(EditError::DuplicateField(field.to_string()));
                    }
                }
                let added: Vec<Column> = columns
                    .iter()
                    .map(|c| Column::new(c.field.trim(), c.header_name.trim()))
                    .collect();

                // new columns are also shown right away
                let selected = candidate
                    .extra
                    .entry(SELECTED_COLUMNS)
                    .or_insert_with(|| Value::Array(Vec::new()));
                if !selected.is_array() {
                    *selected = Value::Array(Vec::new());
                }
                if let Value::Array(list) = selected {
                    list.extend(
                        added
                            .iter()
                            .map(|c| json!({"name": c.name, "field": c.field})),
                    );
                }
                candidate.columns.extend(added);
            }
            WorksheetEdit::DeleteRows { ids } => {
                if ids.is_empty() {
                    return Err(EditError::EmptyEdit);
                }
                let selected: HashSet<&ResourceId> = ids.iter().collect();
                candidate
                    .rows
                    .data
                    .retain(|row| row.id.as_ref().map_or(true, |id| !selected.contains(id)));
            }
            WorksheetEdit::UpdateCell {
                row_id,
                field,
                value,
            } => {
                if !baseline.has_field(field) {
                    return Err(EditError::UnknownField(field.clone()));
                }
                let row = candidate
                    .row_mut(row_id)
                    .ok_or_else(|| EditError::UnknownRow(row_id.clone()))?;
                row.cells.insert(field.clone(), value.clone());
            }
        }
        Ok(candidate)
    }
}

/// A new row holding each column's default value
fn blank_row(worksheet: &Worksheet, id: i64) -> Row {
    let mut row = Row::new(id);
    for column in &worksheet.columns {
        let value = editor_for(column.editor_kind()).default_value();
        row.cells.insert(column.field.clone(), value);
    }
    row
}

/// Parse text typed into a cell using the column's editor, then build the edit
pub fn cell_update_from_input(
    worksheet: &Worksheet,
    row_id: RowId,
    field: &str,
    input: &str,
) -> Result<WorksheetEdit, EditError> {
    let column = worksheet
        .column(field)
        .ok_or_else(|| EditError::UnknownField(field.to_string()))?;
    let value = editor_for(column.editor_kind()).parse_input(input)?;
    Ok(WorksheetEdit::UpdateCell {
        row_id,
        field: field.to_string(),
        value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::EditorKind;
    use serde_json::json;

    fn products() -> Worksheet {
        Worksheet::new(5, "Products")
            .with_column(Column::new("a", "A"))
            .with_row(Row::new(1).with_cell("a", "x"))
    }

    #[test]
    fn test_add_rows_appends_count() {
        let baseline = products();
        let candidate = WorksheetEdit::AddRows { count: 3 }.apply(&baseline).unwrap();

        assert_eq!(candidate.row_count(), 4);
        assert_eq!(baseline.row_count(), 1);
        let ids: Vec<_> = candidate.rows.data.iter().map(|r| r.id.clone().unwrap()).collect();
        assert_eq!(ids, vec![1.into(), 2.into(), 3.into(), 4.into()]);
        assert_eq!(candidate.rows.data[3].get("a"), Some(&CellValue::from("")));
    }

    #[test]
    fn test_add_rows_uses_column_defaults() {
        let baseline = Worksheet::default()
            .with_column(Column::new("qty", "Qty").with_type(EditorKind::Number))
            .with_column(Column::new("ok", "Ok").with_type(EditorKind::Boolean));
        let candidate = WorksheetEdit::add_row().apply(&baseline).unwrap();
        let row = &candidate.rows.data[0];
        assert_eq!(row.id, Some(1.into()));
        assert_eq!(row.get("qty"), Some(&CellValue::from(0)));
        assert_eq!(row.get("ok"), Some(&CellValue::from(false)));
    }

    #[test]
    fn test_add_rows_after_largest_id_is_rejected() {
        let baseline = Worksheet::default().with_row(Row::new(i64::MAX));
        let err = WorksheetEdit::add_row().apply(&baseline).unwrap_err();
        assert_eq!(err, EditError::RowIdExhausted);

        let near_max = Worksheet::default().with_row(Row::new(i64::MAX - 1));
        assert!(WorksheetEdit::AddRows { count: 1 }.apply(&near_max).is_ok());
        assert_eq!(
            WorksheetEdit::AddRows { count: 2 }.apply(&near_max).unwrap_err(),
            EditError::RowIdExhausted
        );
    }

    #[test]
    fn test_add_zero_rows_is_rejected() {
        let err = WorksheetEdit::AddRows { count: 0 }.apply(&products()).unwrap_err();
        assert_eq!(err, EditError::EmptyEdit);
    }

    #[test]
    fn test_add_columns_merges_after_existing() {
        let edit = WorksheetEdit::AddColumns {
            columns: vec![NewColumn::new("Price", "price")],
        };
        let candidate = edit.apply(&products()).unwrap();
        assert_eq!(
            serde_json::to_value(&candidate.columns).unwrap(),
            json!([{"field": "a", "name": "A"}, {"name": "Price", "field": "price"}])
        );
        // rows are untouched
        assert_eq!(candidate.rows, products().rows);
    }

    #[test]
    fn test_add_columns_extends_selected_columns() {
        let mut baseline = products();
        baseline
            .extra
            .insert("selectedColumns".to_string(), json!([{"name": "A", "field": "a"}]));
        let edit = WorksheetEdit::AddColumns {
            columns: vec![NewColumn::new("Price", "price")],
        };

        let candidate = edit.apply(&baseline).unwrap();
        assert_eq!(
            candidate.extra["selectedColumns"],
            json!([{"name": "A", "field": "a"}, {"name": "Price", "field": "price"}])
        );

        let fresh = edit.apply(&products()).unwrap();
        assert_eq!(
            fresh.extra["selectedColumns"],
            json!([{"name": "Price", "field": "price"}])
        );
    }

    #[test]
    fn test_add_columns_rejects_duplicates() {
        let existing = WorksheetEdit::AddColumns {
            columns: vec![NewColumn::new("Again", "a")],
        };
        assert_eq!(
            existing.apply(&products()).unwrap_err(),
            EditError::DuplicateField("a".to_string())
        );

        let within_batch = WorksheetEdit::AddColumns {
            columns: vec![NewColumn::new("B", "b"), NewColumn::new("B2", "b")],
        };
        assert!(matches!(
            within_batch.apply(&products()),
            Err(EditError::DuplicateField(_))
        ));

        let blank = WorksheetEdit::AddColumns {
            columns: vec![NewColumn::new("Blank", "  ")],
        };
        assert_eq!(blank.apply(&products()).unwrap_err(), EditError::BlankField);
    }

    #[test]
    fn test_delete_rows_keeps_unselected_in_order() {
        let baseline = Worksheet::default()
            .with_row(Row::new(1))
            .with_row(Row::new(2))
            .with_row(Row::new(3));
        let edit = WorksheetEdit::DeleteRows {
            ids: vec![1.into(), 3.into()],
        };
        let candidate = edit.apply(&baseline).unwrap();
        assert_eq!(
            serde_json::to_value(&candidate.rows).unwrap(),
            json!({"data": [{"id": 2}]})
        );
    }

    #[test]
    fn test_delete_without_selection_is_rejected() {
        let edit = WorksheetEdit::DeleteRows { ids: vec![] };
        assert_eq!(edit.apply(&products()).unwrap_err(), EditError::EmptyEdit);
    }

    #[test]
    fn test_update_cell() {
        let edit = WorksheetEdit::UpdateCell {
            row_id: 1.into(),
            field: "a".to_string(),
            value: "changed".into(),
        };
        let candidate = edit.apply(&products()).unwrap();
        assert_eq!(
            candidate.row(&1.into()).unwrap().get("a"),
            Some(&CellValue::from("changed"))
        );
    }

    #[test]
    fn test_update_cell_errors() {
        let unknown_row = WorksheetEdit::UpdateCell {
            row_id: 9.into(),
            field: "a".to_string(),
            value: CellValue::Null,
        };
        assert_eq!(
            unknown_row.apply(&products()).unwrap_err(),
            EditError::UnknownRow(9.into())
        );

        let unknown_field = WorksheetEdit::UpdateCell {
            row_id: 1.into(),
            field: "zzz".to_string(),
            value: CellValue::Null,
        };
        assert_eq!(
            unknown_field.apply(&products()).unwrap_err().code(),
            "UNKNOWN_FIELD"
        );
    }

    #[test]
    fn test_cell_update_from_input_uses_column_editor() {
        let ws = Worksheet::default()
            .with_column(Column::new("qty", "Qty").with_type(EditorKind::Number))
            .with_row(Row::new(1));
        let edit = cell_update_from_input(&ws, 1.into(), "qty", "15").unwrap();
        assert_eq!(
            edit,
            WorksheetEdit::UpdateCell {
                row_id: 1.into(),
                field: "qty".to_string(),
                value: CellValue::from(15),
            }
        );
        assert!(cell_update_from_input(&ws, 1.into(), "qty", "lots").is_err());
    }
}
