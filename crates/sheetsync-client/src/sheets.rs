//! Worksheet client: the gateway wired into the query cache.
//!
//! Every edit follows the same path: take the cached worksheet as baseline,
//! apply the edit locally, show the candidate immediately, PATCH it as a
//! whole and, once the request settles, invalidate the worksheet's key so
//! the server's copy is fetched again. Concurrent edits of one worksheet are
//! not merged; the last PATCH to reach the server wins.

use parking_lot::Mutex;
use sheetsync_core::{
    cell_update_from_input, NewColumn, RowId, Workbook, Worksheet, WorksheetEdit, WorksheetId,
};
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::Config;
use crate::error::{NetworkError, SyncError};
use crate::gateway::{Gateway, HttpGateway};
use crate::mutation::{Mutation, MutationCallbacks};
use crate::query::{QueryClient, QueryKey, QueryObserver, QueryOptions};

/// PATCH of a full worksheet
pub type WorksheetMutation = Mutation<Worksheet, Worksheet>;

#[derive(Clone)]
pub struct SheetClient {
    gateway: Arc<dyn Gateway>,
    queries: QueryClient,
    mutations: Arc<Mutex<HashMap<QueryKey, WorksheetMutation>>>,
}

impl SheetClient {
    pub fn new(gateway: Arc<dyn Gateway>, queries: QueryClient) -> Self {
        Self {
            gateway,
            queries,
            mutations: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Client talking HTTP to `config.api_url`
    pub fn from_config(config: &Config) -> Result<Self, NetworkError> {
        let gateway = HttpGateway::new(&config.api_url)?;
        Ok(Self::new(
            Arc::new(gateway),
            QueryClient::new(config.query.clone()),
        ))
    }

    pub fn queries(&self) -> &QueryClient {
        &self.queries
    }

    /// Observe the workbook list
    pub fn workbooks(&self) -> QueryObserver<Vec<Workbook>> {
        let gateway = Arc::clone(&self.gateway);
        self.queries
            .query(QueryOptions::new(QueryKey::workbooks(), move || {
                let gateway = Arc::clone(&gateway);
                async move { gateway.fetch_workbooks().await }
            }))
    }

    /// Observe one worksheet
    pub fn worksheet(&self, id: &WorksheetId) -> QueryObserver<Worksheet> {
        let gateway = Arc::clone(&self.gateway);
        let id = id.clone();
        self.queries
            .query(QueryOptions::new(QueryKey::worksheet(&id), move || {
                let gateway = Arc::clone(&gateway);
                let id = id.clone();
                async move {
                    let worksheet = gateway.fetch_worksheet(&id).await?;
                    let duplicates = worksheet.duplicate_fields();
                    if !duplicates.is_empty() {
                        tracing::warn!(worksheet = %id, ?duplicates, "column fields are not unique");
                    }
                    Ok::<_, NetworkError>(worksheet)
                }
            }))
    }

    /// The PATCH mutation for a worksheet, shared by all edits of it
    pub fn worksheet_mutation(&self, id: &WorksheetId) -> WorksheetMutation {
        let mut mutations = self.mutations.lock();
        mutations
            .entry(QueryKey::worksheet(id))
            .or_insert_with(|| {
                let gateway = Arc::clone(&self.gateway);
                let id = id.clone();
                Mutation::new(move |worksheet: Worksheet| {
                    let gateway = Arc::clone(&gateway);
                    let id = id.clone();
                    async move { gateway.patch_worksheet(&id, &worksheet).await }
                })
            })
            .clone()
    }

    /// Last worksheet held in the cache
    pub fn cached_worksheet(&self, id: &WorksheetId) -> Option<Arc<Worksheet>> {
        self.queries
            .get_query_data::<Worksheet>(&QueryKey::worksheet(id))
    }

    /// Apply an edit optimistically and persist it
    pub async fn apply_edit(
        &self,
        id: &WorksheetId,
        edit: WorksheetEdit,
    ) -> Result<Worksheet, SyncError> {
        let key = QueryKey::worksheet(id);
        let baseline = self
            .cached_worksheet(id)
            .ok_or_else(|| SyncError::NotLoaded(id.clone()))?;
        let candidate = edit.apply(&baseline)?;

        let mutation = self.worksheet_mutation(id);
        if mutation.is_loading() {
            tracing::warn!(worksheet = %id, "overlapping edits, last write wins");
        }

        // a fetch started before this edit would overwrite the candidate
        self.queries.cancel(&key);
        self.queries.set_query_data(&key, candidate.clone());

        let action = edit.describe();
        let queries = self.queries.clone();
        let worksheet = id.clone();
        let callbacks = MutationCallbacks::new()
            .on_success(move |saved: &Worksheet| {
                tracing::debug!(%worksheet, rows = saved.row_count(), "{} saved", action);
            })
            .on_error({
                let worksheet = id.clone();
                move |err: &NetworkError| {
                    tracing::error!(%worksheet, url = err.url(), "{} failed: {}", action, err)
                }
            })
            .on_settled(move |_| {
                queries.invalidate(&key);
            });

        Ok(mutation.mutate(candidate, callbacks).await?)
    }

    pub async fn add_row(&self, id: &WorksheetId) -> Result<Worksheet, SyncError> {
        self.apply_edit(id, WorksheetEdit::add_row()).await
    }

    pub async fn add_rows(&self, id: &WorksheetId, count: usize) -> Result<Worksheet, SyncError> {
        self.apply_edit(id, WorksheetEdit::AddRows { count }).await
    }

    pub async fn add_columns(
        &self,
        id: &WorksheetId,
        columns: Vec<NewColumn>,
    ) -> Result<Worksheet, SyncError> {
        self.apply_edit(id, WorksheetEdit::AddColumns { columns }).await
    }

    pub async fn delete_rows(
        &self,
        id: &WorksheetId,
        ids: Vec<RowId>,
    ) -> Result<Worksheet, SyncError> {
        self.apply_edit(id, WorksheetEdit::DeleteRows { ids }).await
    }

    /// Set a cell from text input, parsed by the column's editor
    pub async fn update_cell(
        &self,
        id: &WorksheetId,
        row_id: RowId,
        field: &str,
        input: &str,
    ) -> Result<Worksheet, SyncError> {
        let baseline = self
            .cached_worksheet(id)
            .ok_or_else(|| SyncError::NotLoaded(id.clone()))?;
        let edit = cell_update_from_input(&baseline, row_id, field, input)?;
        self.apply_edit(id, edit).await
    }
}
