//! Node mailboxes and the shared worker pool (component C3).
//!
//! Each node gets its own [`NodeMailbox`]: a [`tokio::sync::Semaphore`] whose permit count is the
//! node's mailbox capacity, gating admission onto ONE shared dispatch queue. A fixed-size pool of
//! workers pulls tasks off that shared queue, so the pool — not any one node — bounds total
//! concurrency, while each node's own semaphore still bounds how much unstarted work can pile up
//! against it specifically. A permit is held only until a worker picks the task up; it is dropped
//! immediately after `recv()`, before the node function runs, so mailbox capacity bounds queued
//! backlog, not in-flight execution time.

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex, OwnedSemaphorePermit, Semaphore};
use tokio::time::Duration;

use crate::error::MailboxError;

/// A unit of work queued for a node, still holding the permit that admitted it.
pub struct MailboxTask<I> {
    pub node: String,
    pub input: I,
    pub thread_id: String,
    permit: OwnedSemaphorePermit,
}

/// The same unit of work, handed to a worker after its permit has been released.
pub struct DispatchTask<I> {
    pub node: String,
    pub input: I,
    pub thread_id: String,
}

impl<I> MailboxTask<I> {
    fn into_dispatch(self) -> DispatchTask<I> {
        DispatchTask {
            node: self.node,
            input: self.input,
            thread_id: self.thread_id,
        }
    }
}

/// A single node's admission gate onto the shared dispatch queue.
pub struct NodeMailbox<I> {
    node: String,
    semaphore: Arc<Semaphore>,
    queue_tx: mpsc::Sender<MailboxTask<I>>,
}

impl<I> NodeMailbox<I> {
    pub fn new(node: impl Into<String>, capacity: usize, queue_tx: mpsc::Sender<MailboxTask<I>>) -> Self {
        Self {
            node: node.into(),
            semaphore: Arc::new(Semaphore::new(capacity)),
            queue_tx,
        }
    }

    /// Acquire a mailbox permit and enqueue `input`, waiting at most `grace` for both steps
    /// combined. Returns [`MailboxError::Overflow`] on timeout, [`MailboxError::Closed`] if the
    /// shared queue has been shut down.
    pub async fn enqueue(&self, input: I, thread_id: impl Into<String>, grace: Duration) -> Result<(), MailboxError> {
        let thread_id = thread_id.into();
        let semaphore = self.semaphore.clone();
        let attempt = async {
            let permit = semaphore
                .acquire_owned()
                .await
                .map_err(|_| MailboxError::Closed { node: self.node.clone() })?;
            let task = MailboxTask {
                node: self.node.clone(),
                input,
                thread_id,
                permit,
            };
            self.queue_tx
                .send(task)
                .await
                .map_err(|_| MailboxError::Closed { node: self.node.clone() })
        };
        tokio::time::timeout(grace, attempt)
            .await
            .unwrap_or_else(|_| {
                Err(MailboxError::Overflow {
                    node: self.node.clone(),
                    waited: grace,
                })
            })
    }

    pub fn close(&self) {
        self.semaphore.close();
    }
}

/// A fixed-size pool of workers draining the shared dispatch queue.
pub struct WorkerPool;

impl WorkerPool {
    /// Spawn `worker_count` tasks, each looping: receive a [`MailboxTask`], drop its permit, then
    /// invoke `handle` with the resulting [`DispatchTask`]. Workers share one receiver behind a
    /// `tokio::sync::Mutex`, so exactly one worker holds it at a time between successive `recv`s.
    pub fn spawn<I, F, Fut>(
        worker_count: usize,
        queue_rx: mpsc::Receiver<MailboxTask<I>>,
        handle: F,
    ) -> Vec<tokio::task::JoinHandle<()>>
    where
        I: Send + 'static,
        F: Fn(DispatchTask<I>) -> Fut + Send + Sync + Clone + 'static,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        let shared_rx = Arc::new(Mutex::new(queue_rx));
        (0..worker_count.max(1))
            .map(|_| {
                let shared_rx = shared_rx.clone();
                let handle = handle.clone();
                tokio::spawn(async move {
                    loop {
                        let task = {
                            let mut rx = shared_rx.lock().await;
                            rx.recv().await
                        };
                        match task {
                            Some(task) => handle(task.into_dispatch()).await,
                            None => break,
                        }
                    }
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn enqueue_and_dispatch_round_trip() {
        let (tx, rx) = mpsc::channel(8);
        let mailbox = NodeMailbox::new("n", 2, tx);
        mailbox.enqueue(1, "t1", Duration::from_millis(100)).await.unwrap();
        mailbox.enqueue(2, "t2", Duration::from_millis(100)).await.unwrap();

        let seen = Arc::new(AtomicUsize::new(0));
        let seen_clone = seen.clone();
        let handles = WorkerPool::spawn(2, rx, move |task: DispatchTask<i32>| {
            let seen = seen_clone.clone();
            async move {
                seen.fetch_add(task.input as usize, Ordering::SeqCst);
            }
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(seen.load(Ordering::SeqCst), 3);
        for handle in handles {
            handle.abort();
        }
    }

    #[tokio::test]
    async fn overflow_when_mailbox_is_saturated_and_unconsumed() {
        let (tx, _rx) = mpsc::channel(1);
        let mailbox = NodeMailbox::new("n", 1, tx);
        mailbox.enqueue(1, "t1", Duration::from_millis(100)).await.unwrap();
        let err = mailbox
            .enqueue(2, "t2", Duration::from_millis(20))
            .await
            .unwrap_err();
        assert!(matches!(err, MailboxError::Overflow { .. }));
    }
}
