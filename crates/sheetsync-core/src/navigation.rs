use crate::workbook::{Workbook, WorkbookKey, WorksheetId};

/// Sidebar state: the fetched workbooks, the search text and the selection.
///
/// Searching only narrows what is listed, it never touches the data source.
#[derive(Debug, Clone, Default)]
pub struct WorkbookMenu {
    workbooks: Vec<Workbook>,
    search: String,
    selected: Option<WorkbookKey>,
}

impl WorkbookMenu {
    /// Build the menu and select the first workbook
    pub fn new(workbooks: Vec<Workbook>) -> Self {
        let mut menu = Self::default();
        menu.load(workbooks);
        menu
    }

    /// Replace the workbooks after a (re)fetch; selection falls back to the first one
    pub fn load(&mut self, workbooks: Vec<Workbook>) {
        self.selected = workbooks.first().map(|wb| wb.key.clone());
        self.workbooks = workbooks;
    }

    pub fn set_search(&mut self, text: impl Into<String>) {
        self.search = text.into();
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    /// Workbooks whose label matches the search text
    pub fn filtered(&self) -> Vec<&Workbook> {
        self.workbooks
            .iter()
            .filter(|wb| wb.matches_label(&self.search))
            .collect()
    }

    /// Select a workbook by key. Only workbooks currently listed can be selected.
    pub fn select(&mut self, key: &WorkbookKey) -> Option<&Workbook> {
        let found = self
            .filtered()
            .into_iter()
            .find(|wb| &wb.key == key)
            .map(|wb| wb.key.clone());
        self.selected = Some(found?);
        self.selected()
    }

    pub fn selected(&self) -> Option<&Workbook> {
        let key = self.selected.as_ref()?;
        self.workbooks.iter().find(|wb| &wb.key == key)
    }

    pub fn is_empty(&self) -> bool {
        self.workbooks.is_empty()
    }
}

/// One worksheet tab
#[derive(Debug, Clone, PartialEq)]
pub struct TabItem {
    pub key: WorksheetId,
    pub label: String,
}

/// Worksheet tabs of the selected workbook
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TabStrip {
    tabs: Vec<TabItem>,
    active: Option<WorksheetId>,
}

impl TabStrip {
    /// One tab per worksheet, the first one active
    pub fn for_workbook(workbook: &Workbook) -> Self {
        let tabs: Vec<TabItem> = workbook
            .worksheets
            .iter()
            .map(|ws| TabItem {
                key: ws.worksheet_id.clone(),
                label: ws.worksheet_name.clone(),
            })
            .collect();
        let active = tabs.first().map(|t| t.key.clone());
        Self { tabs, active }
    }

    pub fn tabs(&self) -> &[TabItem] {
        &self.tabs
    }

    pub fn active(&self) -> Option<&TabItem> {
        let key = self.active.as_ref()?;
        self.tabs.iter().find(|t| &t.key == key)
    }

    /// Switch to another tab; unknown keys leave the active tab unchanged
    pub fn activate(&mut self, key: &WorksheetId) -> bool {
        if self.tabs.iter().any(|t| &t.key == key) {
            self.active = Some(key.clone());
            true
        } else {
            false
        }
    }
}
