//! The persistence worker (component C6).
//!
//! Persistence is deliberately a pair of callbacks, not a pluggable backend: the runtime has no
//! opinion on where checkpoints live, only on when `persist` and `restore` are called and how
//! enqueue failures are reported. One background task drains a bounded job queue, calling the
//! host-supplied [`PersistFn`]; enqueue failures are reported to the caller via monitor entries
//! rather than blocking the node that triggered them.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::time::{Duration, Instant};
use tracing::{instrument, warn};

use crate::error::{BoxError, PersistenceError};

/// Saves a thread's state to whatever backing store the host chooses.
#[async_trait]
pub trait PersistFn<T>: Send + Sync {
    async fn persist(&self, thread_id: &str, state: &T) -> Result<(), BoxError>;
}

/// Loads a thread's last-persisted state, if any, when a thread id is used for the first time.
#[async_trait]
pub trait RestoreFn<T>: Send + Sync {
    async fn restore(&self, thread_id: &str) -> Result<Option<T>, BoxError>;
}

struct PersistenceJob<T> {
    thread_id: String,
    state: T,
}

/// Producer-side handle: enqueues jobs for the background worker to drain.
#[derive(Clone)]
pub struct PersistenceHandle<T> {
    tx: mpsc::Sender<PersistenceJob<T>>,
}

impl<T> PersistenceHandle<T>
where
    T: Send + 'static,
{
    /// Enqueue `state` for persistence under `thread_id`, waiting up to `timeout` for room in the
    /// queue. A full queue that doesn't drain within `timeout` yields
    /// [`PersistenceError::Timeout`]; a closed queue (shutdown in progress) is not an error.
    #[instrument(skip(self, state), fields(thread_id = %thread_id))]
    pub async fn enqueue(&self, thread_id: impl Into<String>, state: T, timeout: Duration) -> Result<(), PersistenceError> {
        let thread_id = thread_id.into();
        let job = PersistenceJob {
            thread_id: thread_id.clone(),
            state,
        };
        match tokio::time::timeout(timeout, self.tx.send(job)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) => Ok(()),
            Err(_) => Err(PersistenceError::Timeout { thread_id }),
        }
    }
}

/// Owns the background draining task; drop to let it exit once the queue closes.
pub struct PersistenceWorker {
    handle: tokio::task::JoinHandle<()>,
}

impl PersistenceWorker {
    /// Spawn the draining task. `on_failure` is invoked (typically to emit a non-fatal monitor
    /// entry) whenever the persist callback itself fails; enqueue-side failures are reported by
    /// the caller of [`PersistenceHandle::enqueue`] instead.
    pub fn spawn<T, P, F, Fut>(
        queue_size: usize,
        persist_fn: Arc<P>,
        on_failure: F,
    ) -> (PersistenceHandle<T>, Self)
    where
        T: Clone + Send + Sync + 'static,
        P: PersistFn<T> + 'static,
        F: Fn(String, T, BoxError) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        let (tx, mut rx) = mpsc::channel::<PersistenceJob<T>>(queue_size);
        let handle = tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                if let Err(err) = persist_fn.persist(&job.thread_id, &job.state).await {
                    warn!(thread_id = %job.thread_id, error = %err, "persist callback failed");
                    on_failure(job.thread_id, job.state, err).await;
                }
            }
        });
        (PersistenceHandle { tx }, Self { handle })
    }

    pub async fn join(self) {
        let _ = self.handle.await;
    }

    pub fn abort(&self) {
        self.handle.abort();
    }

    /// Let the draining task finish clearing the queue on its own, up to `deadline`; abort it if
    /// the deadline passes first. The task only exits on its own once its sender side (the
    /// [`PersistenceHandle`]) is dropped, so this is only useful once the caller has stopped
    /// enqueueing new jobs.
    pub async fn drain_or_abort(mut self, deadline: Instant) {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if tokio::time::timeout(remaining, &mut self.handle).await.is_err() {
            self.handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingPersist {
        count: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl PersistFn<i32> for CountingPersist {
        async fn persist(&self, _thread_id: &str, _state: &i32) -> Result<(), BoxError> {
            self.count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct FailingPersist;

    #[async_trait]
    impl PersistFn<i32> for FailingPersist {
        async fn persist(&self, _thread_id: &str, _state: &i32) -> Result<(), BoxError> {
            Err("boom".into())
        }
    }

    #[tokio::test]
    async fn enqueued_job_reaches_persist_callback() {
        let count = Arc::new(AtomicUsize::new(0));
        let (handle, worker) = PersistenceWorker::spawn(
            8,
            Arc::new(CountingPersist { count: count.clone() }),
            |_thread_id, _state, _err| async {},
        );
        handle.enqueue("t1", 42, Duration::from_millis(100)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
        worker.abort();
    }

    #[tokio::test]
    async fn persist_failure_invokes_on_failure_callback() {
        let failures = Arc::new(AtomicUsize::new(0));
        let failures_clone = failures.clone();
        let (handle, worker) = PersistenceWorker::spawn(
            8,
            Arc::new(FailingPersist),
            move |_thread_id, _state, _err| {
                let failures = failures_clone.clone();
                async move {
                    failures.fetch_add(1, Ordering::SeqCst);
                }
            },
        );
        handle.enqueue("t1", 1, Duration::from_millis(100)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(failures.load(Ordering::SeqCst), 1);
        worker.abort();
    }
}
