use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use sheetsync_core::{
    paginate, quick_filter, ColumnForm, GridModel, ResourceId, Row, RowCountForm, TabStrip,
    WorkbookMenu, Worksheet, WorksheetId, DEFAULT_PAGE_SIZE, PAGE_SIZES,
};
use std::fmt::Write;

use crate::query::QueryObserver;
use crate::sheets::SheetClient;

#[derive(Parser, Debug)]
#[command(name = "sheetsync")]
#[command(about = "Browse and edit workbooks served by a SheetSync API", long_about = None)]
pub struct Cli {
    /// Base URL of the API (overrides SHEETSYNC_API_URL)
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Commands {
    /// List workbooks, optionally narrowed by label
    Workbooks {
        #[arg(long, default_value = "")]
        search: String,
    },

    /// List the worksheet tabs of a workbook
    Tabs {
        /// Workbook key
        workbook: String,
    },

    /// Show one page of a worksheet
    Show {
        worksheet: String,

        /// Only rows with a cell containing this text
        #[arg(long, default_value = "")]
        filter: String,

        #[arg(long, default_value_t = 1)]
        page: usize,

        #[arg(long, default_value_t = DEFAULT_PAGE_SIZE, value_parser = parse_page_size)]
        page_size: usize,
    },

    /// Append blank rows
    AddRows {
        worksheet: String,

        #[arg(long, default_value = "1")]
        count: String,
    },

    /// Append columns given as HEADER:FIELD
    AddColumn {
        worksheet: String,

        #[arg(required = true)]
        columns: Vec<String>,
    },

    /// Delete rows by id
    DeleteRows {
        worksheet: String,

        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Set one cell, parsed according to the column's type
    SetCell {
        worksheet: String,
        row: String,
        field: String,
        value: String,
    },
}

fn parse_page_size(value: &str) -> Result<usize, String> {
    let size: usize = value.parse().map_err(|_| format!("'{}' is not a number", value))?;
    if PAGE_SIZES.contains(&size) {
        Ok(size)
    } else {
        Err(format!("page size must be one of {:?}", PAGE_SIZES))
    }
}

/// Run one command and return what should be printed
pub async fn execute(client: &SheetClient, command: Commands) -> Result<String> {
    match command {
        Commands::Workbooks { search } => {
            let mut observer = client.workbooks();
            let mut menu = WorkbookMenu::new(settled(&mut observer).await?);
            menu.set_search(search);
            Ok(render_workbooks(&menu))
        }
        Commands::Tabs { workbook } => {
            let mut observer = client.workbooks();
            let mut menu = WorkbookMenu::new(settled(&mut observer).await?);
            let key = ResourceId::parse(&workbook);
            let Some(selected) = menu.select(&key) else {
                bail!("workbook {} not found", key);
            };
            Ok(render_tabs(&TabStrip::for_workbook(selected)))
        }
        Commands::Show {
            worksheet,
            filter,
            page,
            page_size,
        } => {
            let id = ResourceId::parse(&worksheet);
            let mut observer = client.worksheet(&id);
            let worksheet = settled(&mut observer).await?;
            Ok(render_grid(
                &GridModel::from_worksheet(&worksheet),
                &filter,
                page,
                page_size,
            ))
        }
        Commands::AddRows { worksheet, count } => {
            let form = RowCountForm::parse(&count)?;
            let id = ResourceId::parse(&worksheet);
            let updated = edit(client, &id, |client, id| async move {
                client.add_rows(&id, form.rows_count).await
            })
            .await?;
            Ok(format!(
                "Added {} row(s); worksheet now has {} rows\n",
                form.rows_count,
                updated.row_count()
            ))
        }
        Commands::AddColumn { worksheet, columns } => {
            let mut form = ColumnForm::new();
            for spec in &columns {
                form.add_spec(spec)?;
            }
            let columns = form.submit()?;
            let added = columns.len();
            let id = ResourceId::parse(&worksheet);
            let updated = edit(client, &id, |client, id| async move {
                client.add_columns(&id, columns).await
            })
            .await?;
            Ok(format!(
                "Added {} column(s); worksheet now has {} columns\n",
                added,
                updated.columns.len()
            ))
        }
        Commands::DeleteRows { worksheet, ids } => {
            let ids: Vec<ResourceId> = ids.iter().map(|id| ResourceId::parse(id)).collect();
            let id = ResourceId::parse(&worksheet);
            let updated = edit(client, &id, |client, id| async move {
                client.delete_rows(&id, ids).await
            })
            .await?;
            Ok(format!(
                "Deleted rows; worksheet now has {} rows\n",
                updated.row_count()
            ))
        }
        Commands::SetCell {
            worksheet,
            row,
            field,
            value,
        } => {
            let id = ResourceId::parse(&worksheet);
            let row_id = ResourceId::parse(&row);
            let updated = edit(client, &id, |client, id| async move {
                client.update_cell(&id, row_id.clone(), &field, &value).await?;
                Ok(row_id)
            })
            .await?;
            Ok(format!("Updated row {}\n", updated))
        }
    }
}

/// Wait for a query to settle and surface its error, if any
async fn settled<T, S>(observer: &mut QueryObserver<T, S>) -> Result<S>
where
    T: Send + Sync + 'static,
    S: Default,
{
    let result = observer.wait_settled().await;
    match result.error {
        Some(err) if result.is_error => Err(err.into()),
        _ => Ok(result.data),
    }
}

/// Load the worksheet, run an edit against it and wait for the refetch the
/// edit triggers, so the process does not exit with a request in flight.
async fn edit<F, Fut, R>(client: &SheetClient, id: &WorksheetId, run: F) -> Result<R>
where
    F: FnOnce(SheetClient, WorksheetId) -> Fut,
    Fut: std::future::Future<Output = Result<R, crate::error::SyncError>>,
{
    let mut observer = client.worksheet(id);
    settled(&mut observer).await?;
    let outcome = run(client.clone(), id.clone()).await;
    let refreshed: Worksheet = observer.wait_settled().await.data;
    tracing::debug!(worksheet = %id, rows = refreshed.row_count(), "worksheet refreshed");
    Ok(outcome?)
}

pub fn render_workbooks(menu: &WorkbookMenu) -> String {
    let mut out = String::new();
    if menu.is_empty() {
        out.push_str("No workbooks found\n");
        return out;
    }
    let listed = menu.filtered();
    if listed.is_empty() {
        let _ = writeln!(out, "No workbooks match '{}'", menu.search());
        return out;
    }
    let selected = menu.selected().map(|wb| &wb.key);
    for workbook in listed {
        let marker = if Some(&workbook.key) == selected { '*' } else { ' ' };
        let _ = writeln!(
            out,
            "{} {:<6} {} ({} worksheets)",
            marker,
            workbook.key.to_string(),
            workbook.label,
            workbook.worksheets.len()
        );
    }
    out
}

pub fn render_tabs(strip: &TabStrip) -> String {
    let active = strip.active().map(|t| &t.key);
    let mut out = String::new();
    for tab in strip.tabs() {
        let marker = if Some(&tab.key) == active { '*' } else { ' ' };
        let _ = writeln!(out, "{} {:<6} {}", marker, tab.key.to_string(), tab.label);
    }
    out
}

/// Text table of one page of the grid
pub fn render_grid(grid: &GridModel, filter: &str, page: usize, page_size: usize) -> String {
    let fields: Vec<(&str, &str)> = grid
        .user_columns()
        .filter_map(|def| {
            let field = def.field.as_deref()?;
            Some((field, def.header_name.as_deref().unwrap_or(field)))
        })
        .collect();

    let visible: Vec<&Row> = quick_filter(&grid.row_data, filter);
    let page = paginate(&visible, page, page_size);

    let mut table: Vec<Vec<String>> = vec![std::iter::once("id".to_string())
        .chain(fields.iter().map(|(_, header)| header.to_string()))
        .collect()];
    for row in page.items {
        table.push(
            std::iter::once(row.id.as_ref().map(|id| id.to_string()).unwrap_or_default())
                .chain(
                    fields
                        .iter()
                        .map(|(field, _)| row.get(field).map(|v| v.as_text()).unwrap_or_default()),
                )
                .collect(),
        );
    }

    let widths: Vec<usize> = (0..table[0].len())
        .map(|col| table.iter().map(|line| line[col].chars().count()).max().unwrap_or(0))
        .collect();

    let mut out = String::new();
    for line in &table {
        let cells: Vec<String> = line
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{:<width$}", cell, width = width))
            .collect();
        let _ = writeln!(out, "{}", cells.join(" | ").trim_end());
    }
    let _ = writeln!(
        out,
        "Page {} of {} ({} rows)",
        page.number, page.page_count, page.total
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use sheetsync_core::{Column, Workbook};

    #[test]
    fn test_parse_show_command() {
        let cli = Cli::parse_from([
            "sheetsync",
            "show",
            "5",
            "--filter",
            "bolt",
            "--page-size",
            "20",
        ]);
        assert_eq!(
            cli.command,
            Commands::Show {
                worksheet: "5".to_string(),
                filter: "bolt".to_string(),
                page: 1,
                page_size: 20,
            }
        );
        assert!(Cli::try_parse_from(["sheetsync", "show", "5", "--page-size", "15"]).is_err());
    }

    #[test]
    fn test_parse_api_url_after_subcommand() {
        let cli = Cli::parse_from(["sheetsync", "workbooks", "--api-url", "http://api.test"]);
        assert_eq!(cli.api_url.as_deref(), Some("http://api.test"));
    }

    #[test]
    fn test_render_workbooks_marks_selection() {
        let mut menu = WorkbookMenu::new(vec![
            Workbook::new(1, "Inventory").with_worksheet(5, "Products"),
            Workbook::new(2, "Payroll"),
        ]);
        assert_eq!(
            render_workbooks(&menu),
            "* 1      Inventory (1 worksheets)\n  2      Payroll (0 worksheets)\n"
        );
        menu.set_search("zzz");
        assert_eq!(render_workbooks(&menu), "No workbooks match 'zzz'\n");
        assert_eq!(render_workbooks(&WorkbookMenu::default()), "No workbooks found\n");
    }

    #[test]
    fn test_render_grid_page() {
        let mut sheet = Worksheet::new(5, "Products")
            .with_column(Column::new("name", "Name"))
            .with_column(Column::new("qty", "Qty"));
        for i in 1..=12i64 {
            sheet = sheet.with_row(
                Row::new(i)
                    .with_cell("name", format!("item {}", i))
                    .with_cell("qty", i),
            );
        }
        let grid = GridModel::from_worksheet(&sheet);

        let out = render_grid(&grid, "", 2, 10);
        assert_eq!(
            out,
            "id | Name    | Qty\n11 | item 11 | 11\n12 | item 12 | 12\nPage 2 of 2 (12 rows)\n"
        );

        let out = render_grid(&grid, "item 1", 1, 10);
        assert!(out.ends_with("Page 1 of 1 (4 rows)\n"));
    }
}
