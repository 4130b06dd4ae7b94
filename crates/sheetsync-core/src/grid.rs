//! Grid-ready shapes for a worksheet.
//!
//! System columns (currently only the row selection checkbox) are added here,
//! at the formatting boundary, and never appear in the worksheet's own
//! column list.

use serde::Serialize;

use crate::editor::EditorKind;
use crate::sheet::{Column, Row, Worksheet};

/// Page sizes offered by the grid
pub const PAGE_SIZES: [usize; 3] = [10, 20, 50];
/// Page size used when none is chosen
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Width of the selection checkbox column in pixels
const SELECTION_COLUMN_WIDTH: u32 = 50;

/// Columns the grid adds in front of the worksheet's columns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemColumn {
    Selection,
}

impl SystemColumn {
    pub const LEADING: [SystemColumn; 1] = [SystemColumn::Selection];

    pub fn column_def(&self) -> ColumnDef {
        match self {
            SystemColumn::Selection => ColumnDef {
                header_checkbox_selection: true,
                checkbox_selection: true,
                width: Some(SELECTION_COLUMN_WIDTH),
                ..ColumnDef::default()
            },
        }
    }
}

fn is_false(b: &bool) -> bool {
    !*b
}

/// Column definition handed to the grid widget
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDef {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header_name: Option<String>,
    #[serde(skip_serializing_if = "is_false")]
    pub editable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cell_editor: Option<EditorKind>,
    #[serde(skip_serializing_if = "is_false")]
    pub header_checkbox_selection: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub checkbox_selection: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
}

impl ColumnDef {
    /// Editable definition for a worksheet column
    pub fn for_column(column: &Column) -> Self {
        Self {
            field: Some(column.field.clone()),
            header_name: Some(column.name.clone()),
            editable: true,
            cell_editor: Some(column.editor_kind()),
            ..Self::default()
        }
    }

    pub fn is_system(&self) -> bool {
        self.field.is_none()
    }
}

/// Column definitions and row records for one worksheet
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridModel {
    pub column_defs: Vec<ColumnDef>,
    pub row_data: Vec<Row>,
}

impl GridModel {
    pub fn from_worksheet(worksheet: &Worksheet) -> Self {
        Self {
            column_defs: column_defs(&worksheet.columns),
            row_data: worksheet.rows.data.clone(),
        }
    }

    /// Only the worksheet's own columns, without system columns
    pub fn user_columns(&self) -> impl Iterator<Item = &ColumnDef> {
        self.column_defs.iter().filter(|c| !c.is_system())
    }
}

/// System columns followed by one definition per worksheet column
pub fn column_defs(columns: &[Column]) -> Vec<ColumnDef> {
    SystemColumn::LEADING
        .iter()
        .map(SystemColumn::column_def)
        .chain(columns.iter().map(ColumnDef::for_column))
        .collect()
}

/// Rows with any cell value containing `text`, ignoring case. Row ids are
/// not searched.
pub fn quick_filter<'a>(rows: &'a [Row], text: &str) -> Vec<&'a Row> {
    let needle = text.trim().to_lowercase();
    if needle.is_empty() {
        return rows.iter().collect();
    }
    rows.iter()
        .filter(|row| {
            row.cells
                .values()
                .any(|cell| cell.as_text().to_lowercase().contains(&needle))
        })
        .collect()
}

/// One page of rows
#[derive(Debug, Clone, PartialEq)]
pub struct Page<'a, T> {
    pub items: &'a [T],
    /// 1-based page number actually shown
    pub number: usize,
    pub page_count: usize,
    pub total: usize,
}

/// Slice out a 1-based page, clamping to the valid range
pub fn paginate<T>(items: &[T], page: usize, page_size: usize) -> Page<'_, T> {
    let page_size = page_size.max(1);
    let total = items.len();
    let page_count = total.div_ceil(page_size).max(1);
    let number = page.clamp(1, page_count);
    let start = (number - 1) * page_size;
    let end = (start + page_size).min(total);
    Page {
        items: &items[start.min(total)..end],
        number,
        page_count,
        total,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_grid_model_from_worksheet() {
        let ws: Worksheet = serde_json::from_value(json!({
            "columns": [{"field": "a", "name": "A"}],
            "rows": {"data": [{"id": 1, "a": "x"}]}
        }))
        .unwrap();

        let grid = GridModel::from_worksheet(&ws);
        let value = serde_json::to_value(&grid).unwrap();

        assert_eq!(
            value["columnDefs"][0],
            json!({"headerCheckboxSelection": true, "checkboxSelection": true, "width": 50})
        );
        assert_eq!(value["columnDefs"][1]["field"], json!("a"));
        assert_eq!(value["columnDefs"][1]["headerName"], json!("A"));
        assert_eq!(value["columnDefs"][1]["editable"], json!(true));
        assert_eq!(value["columnDefs"][1]["cellEditor"], json!("text"));
        assert_eq!(value["rowData"], json!([{"id": 1, "a": "x"}]));
    }

    #[test]
    fn test_system_columns_stay_out_of_worksheet() {
        let ws = Worksheet::default().with_column(Column::new("a", "A"));
        let grid = GridModel::from_worksheet(&ws);
        assert_eq!(grid.column_defs.len(), 2);
        assert_eq!(grid.user_columns().count(), 1);
        assert_eq!(ws.columns.len(), 1);
    }

    #[test]
    fn test_empty_worksheet_still_has_selection_column() {
        let grid = GridModel::from_worksheet(&Worksheet::default());
        assert_eq!(grid.column_defs, vec![SystemColumn::Selection.column_def()]);
        assert!(grid.row_data.is_empty());
    }

    #[test]
    fn test_quick_filter() {
        let rows = vec![
            Row::new(1).with_cell("name", "Widget").with_cell("price", 10),
            Row::new(2).with_cell("name", "Gadget").with_cell("price", 25),
        ];
        assert_eq!(quick_filter(&rows, "widg").len(), 1);
        assert_eq!(quick_filter(&rows, "DGET").len(), 2);
        assert_eq!(quick_filter(&rows, "25")[0].id, Some(2.into()));
        assert_eq!(quick_filter(&rows, "  ").len(), 2);
        assert!(quick_filter(&rows, "nothing").is_empty());
    }

    #[test]
    fn test_quick_filter_ignores_row_ids() {
        let rows = vec![
            Row::new(1).with_cell("name", "Widget"),
            Row::new(2).with_cell("name", "Gadget 1"),
        ];
        let found = quick_filter(&rows, "1");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, Some(2.into()));
    }

    #[test]
    fn test_paginate() {
        let items: Vec<u32> = (0..23).collect();

        let first = paginate(&items, 1, DEFAULT_PAGE_SIZE);
        assert_eq!(first.items.len(), 10);
        assert_eq!(first.page_count, 3);

        let last = paginate(&items, 3, 10);
        assert_eq!(last.items, &[20, 21, 22]);

        let clamped = paginate(&items, 99, 10);
        assert_eq!(clamped.number, 3);

        let empty: Vec<u32> = Vec::new();
        let page = paginate(&empty, 1, 10);
        assert!(page.items.is_empty());
        assert_eq!(page.page_count, 1);
    }
}
