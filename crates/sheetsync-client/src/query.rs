//! Query cache.
//!
//! The [`QueryClient`] exclusively owns one cache entry per [`QueryKey`].
//! Views never write to an entry directly: they mount a [`QueryObserver`] to
//! read it and go through [`QueryClient::invalidate`] or
//! [`QueryClient::set_query_data`] to change it.
//!
//! Per entry the status moves `Empty -> Loading -> {Ready, Errored}`, and
//! back to `Loading` on every refetch. At most one fetch per key is in flight;
//! a forced refetch replaces the running one. A fetch that is cancelled
//! (last observer unmounted, or [`QueryClient::cancel`]) leaves the entry as
//! it was before the fetch started and never reports an error.
//!
//! Fetches run on spawned tokio tasks, so mounting an observer or
//! invalidating a key must happen inside a tokio runtime.

use futures::future::BoxFuture;
use parking_lot::Mutex;
use sheetsync_core::WorksheetId;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::{QueryConfig, RetryPolicy};
use crate::error::NetworkError;

/// Type-erased payload stored in a cache entry
pub type Payload = Arc<dyn Any + Send + Sync>;

type Fetcher = Arc<dyn Fn() -> BoxFuture<'static, Result<Payload, NetworkError>> + Send + Sync>;
type Selector<T, S> = Arc<dyn Fn(&T) -> S + Send + Sync>;

/// Identifier of a cache entry and its backing fetch
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey(String);

impl QueryKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Key of the workbook list
    pub fn workbooks() -> Self {
        Self::new("workbooks")
    }

    /// Key of a single worksheet. Fetching and invalidation both use this.
    pub fn worksheet(id: &WorksheetId) -> Self {
        Self(format!("worksheets/{}", id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle state of a cache entry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum QueryStatus {
    /// Never fetched
    #[default]
    Empty,
    /// A fetch is in flight; earlier data, if any, is still readable
    Loading,
    /// Last fetch succeeded
    Ready,
    /// Last fetch failed
    Errored,
}

#[derive(Clone, Default)]
pub(crate) struct Snapshot {
    status: QueryStatus,
    data: Option<Payload>,
    error: Option<NetworkError>,
    updated_at: Option<Instant>,
    data_version: u64,
}

/// What an observer sees
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult<S> {
    /// Selected data, `S::default()` when nothing has been fetched
    pub data: S,
    pub status: QueryStatus,
    pub is_loading: bool,
    pub is_error: bool,
    pub error: Option<NetworkError>,
    /// Bumped on every successful fetch or local write
    pub data_version: u64,
}

struct InFlight {
    id: u64,
    handle: JoinHandle<()>,
    /// Status to restore if the fetch is cancelled
    prior: QueryStatus,
}

struct CacheEntry {
    tx: watch::Sender<Snapshot>,
    fetcher: Option<Fetcher>,
    in_flight: Option<InFlight>,
    observers: usize,
    invalidated: bool,
}

impl CacheEntry {
    fn new() -> Self {
        let (tx, _) = watch::channel(Snapshot::default());
        Self {
            tx,
            fetcher: None,
            in_flight: None,
            observers: 0,
            invalidated: false,
        }
    }

    fn status(&self) -> QueryStatus {
        self.tx.borrow().status
    }

    /// Abort the running fetch and restore the status it replaced
    fn abort_fetch(&mut self) -> bool {
        let Some(fetch) = self.in_flight.take() else {
            return false;
        };
        fetch.handle.abort();
        self.tx.send_modify(|s| s.status = fetch.prior);
        true
    }
}

struct Shared {
    entries: Mutex<HashMap<QueryKey, CacheEntry>>,
    config: QueryConfig,
    next_fetch_id: AtomicU64,
}

/// Handle to the query cache. Clones share the same cache.
#[derive(Clone)]
pub struct QueryClient {
    inner: Arc<Shared>,
}

impl Default for QueryClient {
    fn default() -> Self {
        Self::new(QueryConfig::default())
    }
}

impl QueryClient {
    pub fn new(config: QueryConfig) -> Self {
        Self {
            inner: Arc::new(Shared {
                entries: Mutex::new(HashMap::new()),
                config,
                next_fetch_id: AtomicU64::new(1),
            }),
        }
    }

    /// Mount an observer for `options.key`.
    ///
    /// Fetches unless the entry is still fresh; if a fetch for the key is
    /// already running the observer shares it instead of starting another.
    pub fn query<T, S>(&self, options: QueryOptions<T, S>) -> QueryObserver<T, S> {
        let QueryOptions {
            key,
            fetcher,
            select,
        } = options;

        let rx = {
            let mut entries = self.inner.entries.lock();
            let entry = entries.entry(key.clone()).or_insert_with(CacheEntry::new);
            entry.fetcher = Some(fetcher);
            entry.observers += 1;

            if entry.in_flight.is_some() {
                tracing::debug!(%key, "attaching observer to in-flight fetch");
            } else if self.is_stale(entry) {
                self.start_fetch(&key, entry);
            }
            entry.tx.subscribe()
        };

        QueryObserver {
            client: self.clone(),
            key,
            rx,
            select,
        }
    }

    /// Mark `key` stale and refetch it for its mounted observers.
    ///
    /// Without observers nothing is fetched; the next mount will fetch.
    /// Returns whether a fetch was started.
    pub fn invalidate(&self, key: &QueryKey) -> bool {
        let mut entries = self.inner.entries.lock();
        let Some(entry) = entries.get_mut(key) else {
            return false;
        };
        entry.invalidated = true;
        if entry.observers == 0 {
            tracing::debug!(%key, "invalidated without observers");
            return false;
        }
        self.start_fetch(key, entry)
    }

    /// Refetch a mounted key now, replacing any running fetch
    pub fn refetch(&self, key: &QueryKey) -> bool {
        let mut entries = self.inner.entries.lock();
        match entries.get_mut(key) {
            Some(entry) if entry.observers > 0 => self.start_fetch(key, entry),
            _ => false,
        }
    }

    /// Cancel the in-flight fetch for `key`, if any
    pub fn cancel(&self, key: &QueryKey) -> bool {
        let mut entries = self.inner.entries.lock();
        let cancelled = entries
            .get_mut(key)
            .map(CacheEntry::abort_fetch)
            .unwrap_or(false);
        if cancelled {
            tracing::debug!(%key, "fetch cancelled");
        }
        cancelled
    }

    /// The window regained focus. Refetches stale observed entries only when
    /// `refetch_on_window_focus` is enabled. Returns the number of fetches started.
    pub fn window_focused(&self) -> usize {
        if !self.inner.config.refetch_on_window_focus {
            return 0;
        }
        let mut entries = self.inner.entries.lock();
        let mut started = 0;
        for (key, entry) in entries.iter_mut() {
            if entry.observers > 0
                && entry.in_flight.is_none()
                && self.is_stale(entry)
                && self.start_fetch(key, entry)
            {
                started += 1;
            }
        }
        started
    }

    /// Write data into the cache without a round trip (optimistic update)
    pub fn set_query_data<T: Send + Sync + 'static>(&self, key: &QueryKey, data: T) {
        let mut entries = self.inner.entries.lock();
        let entry = entries.entry(key.clone()).or_insert_with(CacheEntry::new);
        let payload: Payload = Arc::new(data);
        entry.tx.send_modify(|s| {
            s.data = Some(payload);
            s.updated_at = Some(Instant::now());
            s.data_version += 1;
            if s.status != QueryStatus::Loading {
                s.status = QueryStatus::Ready;
                s.error = None;
            }
        });
    }

    /// Last known data for `key`, if it holds a `T`
    pub fn get_query_data<T: Send + Sync + 'static>(&self, key: &QueryKey) -> Option<Arc<T>> {
        let entries = self.inner.entries.lock();
        let payload = entries.get(key)?.tx.borrow().data.clone()?;
        payload.downcast::<T>().ok()
    }

    pub fn status(&self, key: &QueryKey) -> QueryStatus {
        self.inner
            .entries
            .lock()
            .get(key)
            .map(CacheEntry::status)
            .unwrap_or_default()
    }

    pub fn is_fetching(&self, key: &QueryKey) -> bool {
        self.inner
            .entries
            .lock()
            .get(key)
            .is_some_and(|e| e.in_flight.is_some())
    }

    pub fn observer_count(&self, key: &QueryKey) -> usize {
        self.inner
            .entries
            .lock()
            .get(key)
            .map_or(0, |e| e.observers)
    }

    fn is_stale(&self, entry: &CacheEntry) -> bool {
        if entry.invalidated {
            return true;
        }
        match entry.tx.borrow().updated_at {
            Some(at) => at.elapsed() >= self.inner.config.stale_time,
            None => true,
        }
    }

    /// Start a fetch for `entry`, replacing a running one. Caller holds the lock.
    fn start_fetch(&self, key: &QueryKey, entry: &mut CacheEntry) -> bool {
        let Some(fetcher) = entry.fetcher.clone() else {
            return false;
        };

        let prior = match entry.in_flight.take() {
            Some(previous) => {
                previous.handle.abort();
                tracing::debug!(%key, "replacing in-flight fetch");
                previous.prior
            }
            None => entry.status(),
        };

        let id = self.inner.next_fetch_id.fetch_add(1, Ordering::Relaxed);
        entry.tx.send_modify(|s| s.status = QueryStatus::Loading);

        let client = self.clone();
        let task_key = key.clone();
        let retry = self.inner.config.retry;
        let handle = tokio::spawn(async move {
            let result = fetch_with_retry(&fetcher, retry, &task_key).await;
            client.finish_fetch(&task_key, id, result);
        });

        entry.in_flight = Some(InFlight { id, handle, prior });
        true
    }

    fn finish_fetch(&self, key: &QueryKey, id: u64, result: Result<Payload, NetworkError>) {
        let mut entries = self.inner.entries.lock();
        let Some(entry) = entries.get_mut(key) else {
            return;
        };
        if entry.in_flight.as_ref().map(|f| f.id) != Some(id) {
            tracing::debug!(%key, "dropping result of superseded fetch");
            return;
        }
        entry.in_flight = None;

        match result {
            Ok(payload) => {
                entry.invalidated = false;
                entry.tx.send_modify(|s| {
                    s.status = QueryStatus::Ready;
                    s.data = Some(payload);
                    s.error = None;
                    s.updated_at = Some(Instant::now());
                    s.data_version += 1;
                });
                tracing::debug!(%key, "query ready");
            }
            Err(err) => {
                tracing::warn!(%key, "query failed: {}", err);
                entry.tx.send_modify(|s| {
                    s.status = QueryStatus::Errored;
                    s.error = Some(err);
                });
            }
        }
    }

    fn unmount(&self, key: &QueryKey) {
        let mut entries = self.inner.entries.lock();
        if let Some(entry) = entries.get_mut(key) {
            entry.observers = entry.observers.saturating_sub(1);
            if entry.observers == 0 && entry.abort_fetch() {
                tracing::debug!(%key, "last observer unmounted, fetch cancelled");
            }
        }
    }
}

async fn fetch_with_retry(
    fetcher: &Fetcher,
    retry: RetryPolicy,
    key: &QueryKey,
) -> Result<Payload, NetworkError> {
    let mut attempt = 0;
    loop {
        match fetcher().await {
            Ok(payload) => return Ok(payload),
            Err(err) if attempt < retry.max_retries => {
                let delay = retry.delay(attempt);
                tracing::debug!(%key, attempt, ?delay, "retrying after error: {}", err);
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

/// What to fetch for a key and how to shape it for the observer
pub struct QueryOptions<T, S = T> {
    key: QueryKey,
    fetcher: Fetcher,
    select: Selector<T, S>,
}

impl<T: Clone + Send + Sync + 'static> QueryOptions<T, T> {
    pub fn new<F, Fut>(key: QueryKey, fetch: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, NetworkError>> + Send + 'static,
    {
        let fetcher: Fetcher = Arc::new(move || -> BoxFuture<'static, Result<Payload, NetworkError>> {
            let fut = fetch();
            Box::pin(async move { fut.await.map(|data| Arc::new(data) as Payload) })
        });
        Self {
            key,
            fetcher,
            select: Arc::new(T::clone),
        }
    }
}

impl<T, S> QueryOptions<T, S> {
    /// Transform the fetched payload before it reaches the observer
    pub fn select<S2>(self, select: impl Fn(&T) -> S2 + Send + Sync + 'static) -> QueryOptions<T, S2> {
        QueryOptions {
            key: self.key,
            fetcher: self.fetcher,
            select: Arc::new(select),
        }
    }
}

/// A mounted subscription to one cache entry. Dropping it unmounts.
pub struct QueryObserver<T, S = T> {
    client: QueryClient,
    key: QueryKey,
    rx: watch::Receiver<Snapshot>,
    select: Selector<T, S>,
}

impl<T: Send + Sync + 'static, S: Default> QueryObserver<T, S> {
    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    /// Current state of the entry
    pub fn result(&self) -> QueryResult<S> {
        let snapshot = self.rx.borrow();
        let data = snapshot
            .data
            .clone()
            .and_then(|payload| payload.downcast::<T>().ok())
            .map(|data| (self.select)(&data))
            .unwrap_or_default();
        QueryResult {
            data,
            status: snapshot.status,
            is_loading: snapshot.status == QueryStatus::Loading,
            is_error: snapshot.status == QueryStatus::Errored,
            error: snapshot.error.clone(),
            data_version: snapshot.data_version,
        }
    }

    /// Wait for the next change of the entry
    pub async fn changed(&mut self) -> Option<QueryResult<S>> {
        self.rx.changed().await.ok()?;
        Some(self.result())
    }

    /// Wait until no fetch is running, then return the state
    pub async fn wait_settled(&mut self) -> QueryResult<S> {
        let _ = self
            .rx
            .wait_for(|s| s.status != QueryStatus::Loading)
            .await;
        self.result()
    }

    /// Explicit refresh
    pub fn refetch(&self) -> bool {
        self.client.refetch(&self.key)
    }
}

impl<T, S> Drop for QueryObserver<T, S> {
    fn drop(&mut self) {
        self.client.unmount(&self.key);
    }
}
