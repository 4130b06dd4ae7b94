pub mod cell;
pub mod edit;
pub mod editor;
pub mod error;
pub mod forms;
pub mod grid;
pub mod navigation;
pub mod sheet;
pub mod workbook;

pub use cell::CellValue;
pub use edit::{cell_update_from_input, NewColumn, WorksheetEdit};
pub use editor::{editor_for, CellEditor, EditorKind};
pub use error::{EditError, FormError};
pub use forms::{ColumnForm, RowCountForm};
pub use grid::{
    column_defs, paginate, quick_filter, ColumnDef, GridModel, Page, SystemColumn,
    DEFAULT_PAGE_SIZE, PAGE_SIZES,
};
pub use navigation::{TabItem, TabStrip, WorkbookMenu};
pub use sheet::{Column, Row, Rows, Worksheet};
pub use workbook::{ResourceId, RowId, Workbook, WorkbookKey, WorksheetId, WorksheetRef};
