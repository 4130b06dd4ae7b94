use futures::future::BoxFuture;
use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;

use crate::error::NetworkError;

type MutationFn<V, R> = Arc<dyn Fn(V) -> BoxFuture<'static, Result<R, NetworkError>> + Send + Sync>;

/// State of a mutation handle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MutationStatus {
    #[default]
    Idle,
    Loading,
    Success,
    Error,
}

#[derive(Debug, Default)]
struct MutationState {
    pending: usize,
    status: MutationStatus,
    last_error: Option<NetworkError>,
}

/// Callbacks for a single `mutate` call.
///
/// `on_settled` runs after `on_success` or `on_error`, whatever the outcome.
pub struct MutationCallbacks<R> {
    on_success: Option<Box<dyn FnOnce(&R) + Send>>,
    on_error: Option<Box<dyn FnOnce(&NetworkError) + Send>>,
    on_settled: Option<Box<dyn FnOnce(Result<&R, &NetworkError>) + Send>>,
}

impl<R> Default for MutationCallbacks<R> {
    fn default() -> Self {
        Self {
            on_success: None,
            on_error: None,
            on_settled: None,
        }
    }
}

impl<R> MutationCallbacks<R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_success(mut self, f: impl FnOnce(&R) + Send + 'static) -> Self {
        self.on_success = Some(Box::new(f));
        self
    }

    pub fn on_error(mut self, f: impl FnOnce(&NetworkError) + Send + 'static) -> Self {
        self.on_error = Some(Box::new(f));
        self
    }

    pub fn on_settled(
        mut self,
        f: impl FnOnce(Result<&R, &NetworkError>) + Send + 'static,
    ) -> Self {
        self.on_settled = Some(Box::new(f));
        self
    }

    fn settle(self, result: &Result<R, NetworkError>) {
        match result {
            Ok(data) => {
                if let Some(f) = self.on_success {
                    f(data);
                }
            }
            Err(err) => {
                if let Some(f) = self.on_error {
                    f(err);
                }
            }
        }
        if let Some(f) = self.on_settled {
            f(result.as_ref());
        }
    }
}

/// Decrements the pending count even if the `mutate` future is dropped early
struct PendingGuard<'a> {
    state: &'a Mutex<MutationState>,
    finished: bool,
}

impl PendingGuard<'_> {
    fn finish<R>(mut self, result: &Result<R, NetworkError>) {
        let mut state = self.state.lock();
        state.pending -= 1;
        match result {
            Ok(_) => state.last_error = None,
            Err(err) => state.last_error = Some(err.clone()),
        }
        if state.pending == 0 {
            state.status = if result.is_ok() {
                MutationStatus::Success
            } else {
                MutationStatus::Error
            };
        }
        self.finished = true;
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        let mut state = self.state.lock();
        state.pending -= 1;
        if state.pending == 0 {
            state.status = MutationStatus::Idle;
        }
    }
}

/// A write operation against the API.
///
/// Each `mutate` call runs the function exactly once; nothing is retried.
/// Calls are not serialized against each other.
pub struct Mutation<V, R> {
    func: MutationFn<V, R>,
    state: Arc<Mutex<MutationState>>,
}

impl<V, R> Clone for Mutation<V, R> {
    fn clone(&self) -> Self {
        Self {
            func: Arc::clone(&self.func),
            state: Arc::clone(&self.state),
        }
    }
}

impl<V: Send + 'static, R: Send + 'static> Mutation<V, R> {
    pub fn new<F, Fut>(func: F) -> Self
    where
        F: Fn(V) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, NetworkError>> + Send + 'static,
    {
        Self {
            func: Arc::new(move |vars| -> BoxFuture<'static, Result<R, NetworkError>> {
                Box::pin(func(vars))
            }),
            state: Arc::new(Mutex::new(MutationState::default())),
        }
    }

    /// Run the mutation once and fire the callbacks
    pub async fn mutate(
        &self,
        variables: V,
        callbacks: MutationCallbacks<R>,
    ) -> Result<R, NetworkError> {
        let guard = {
            let mut state = self.state.lock();
            state.pending += 1;
            state.status = MutationStatus::Loading;
            PendingGuard {
                state: &self.state,
                finished: false,
            }
        };

        let result = (self.func)(variables).await;
        guard.finish(&result);
        callbacks.settle(&result);
        result
    }

    pub fn status(&self) -> MutationStatus {
        self.state.lock().status
    }

    pub fn is_loading(&self) -> bool {
        self.state.lock().pending > 0
    }

    pub fn is_error(&self) -> bool {
        self.status() == MutationStatus::Error
    }

    pub fn error(&self) -> Option<NetworkError> {
        self.state.lock().last_error.clone()
    }

    /// Forget the outcome of earlier calls
    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.last_error = None;
        if state.pending == 0 {
            state.status = MutationStatus::Idle;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::oneshot;

    fn failure() -> NetworkError {
        NetworkError::Transport {
            url: "http://localhost:3001/worksheets/1".to_string(),
            message: "connection refused".to_string(),
        }
    }

    #[tokio::test]
    async fn test_success_runs_success_then_settled() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let mutation = Mutation::new(move |n: u32| {
            counter.fetch_add(1, Ordering::SeqCst);
            async move { Ok(n * 2) }
        });

        let order = Arc::new(Mutex::new(Vec::new()));
        let (success, settled) = (order.clone(), order.clone());
        let callbacks = MutationCallbacks::new()
            .on_success(move |r: &u32| success.lock().push(format!("success {}", r)))
            .on_error(|_| panic!("no error expected"))
            .on_settled(move |r| settled.lock().push(format!("settled {}", r.is_ok())));

        assert_eq!(mutation.mutate(21, callbacks).await.unwrap(), 42);
        assert_eq!(*order.lock(), vec!["success 42", "settled true"]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(mutation.status(), MutationStatus::Success);
        assert!(!mutation.is_loading());
    }

    #[tokio::test]
    async fn test_failure_runs_error_then_settled_without_retry() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let mutation: Mutation<(), ()> = Mutation::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            async move { Err(failure()) }
        });

        let settled = Arc::new(AtomicUsize::new(0));
        let settled_count = settled.clone();
        let callbacks = MutationCallbacks::new()
            .on_success(|_| panic!("no success expected"))
            .on_settled(move |r| {
                assert!(r.is_err());
                settled_count.fetch_add(1, Ordering::SeqCst);
            });

        assert!(mutation.mutate((), callbacks).await.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(settled.load(Ordering::SeqCst), 1);
        assert!(mutation.is_error());
        assert_eq!(mutation.error(), Some(failure()));

        mutation.reset();
        assert_eq!(mutation.status(), MutationStatus::Idle);
    }

    #[tokio::test]
    async fn test_loading_while_in_flight() {
        let (tx, rx) = oneshot::channel::<()>();
        let rx = Arc::new(Mutex::new(Some(rx)));
        let mutation: Mutation<(), ()> = Mutation::new(move |_| {
            let rx = rx.lock().take();
            async move {
                if let Some(rx) = rx {
                    let _ = rx.await;
                }
                Ok(())
            }
        });

        let running = mutation.clone();
        let task = tokio::spawn(async move { running.mutate((), MutationCallbacks::new()).await });
        tokio::task::yield_now().await;
        assert!(mutation.is_loading());
        assert_eq!(mutation.status(), MutationStatus::Loading);

        tx.send(()).unwrap();
        task.await.unwrap().unwrap();
        assert!(!mutation.is_loading());
        assert_eq!(mutation.status(), MutationStatus::Success);
    }

    #[tokio::test]
    async fn test_dropped_call_does_not_stay_loading() {
        let mutation: Mutation<(), ()> = Mutation::new(|_| futures::future::pending());
        let call = mutation.mutate((), MutationCallbacks::new());
        let _ = tokio::time::timeout(std::time::Duration::from_millis(5), call).await;
        assert!(!mutation.is_loading());
        assert_eq!(mutation.status(), MutationStatus::Idle);
    }
}
