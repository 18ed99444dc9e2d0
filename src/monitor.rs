//! The caller-visible state monitor channel (component C5).
//!
//! Every observable event in a thread's lifecycle — a node starting, a partial update, a
//! successful or failed completion, a non-fatal hiccup, an eviction — is rendered as one
//! [`StateMonitorEntry`] and pushed onto the caller-supplied [`MonitorSink`]. Emission never
//! blocks the runtime indefinitely: a slow or absent consumer gets a bounded grace window before
//! its entry is silently dropped (I1 guarantees completeness, not delivery).

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::mpsc::Sender;
use tokio::time::Duration;
use tracing::warn;

use crate::error::RuntimeError;

/// One observable event in a thread's lifecycle.
#[derive(Debug, Clone)]
pub struct StateMonitorEntry<T> {
    pub node: String,
    pub thread_id: String,
    /// `true` while the thread has an in-flight node invocation; `false` on any terminal entry.
    pub running: bool,
    /// `true` for a mid-execution partial update; `false` for every other kind of entry.
    pub partial: bool,
    pub new_state: T,
    pub error: Option<RuntimeError>,
}

impl<T> StateMonitorEntry<T> {
    /// A node has started (or is still) executing; `new_state` is the thread's state prior to
    /// this invocation returning.
    pub fn running(node: impl Into<String>, thread_id: impl Into<String>, state: T) -> Self {
        Self {
            node: node.into(),
            thread_id: thread_id.into(),
            running: true,
            partial: false,
            new_state: state,
            error: None,
        }
    }

    /// A node function published a partial state update mid-execution.
    pub fn partial(node: impl Into<String>, thread_id: impl Into<String>, state: T) -> Self {
        Self {
            node: node.into(),
            thread_id: thread_id.into(),
            running: true,
            partial: true,
            new_state: state,
            error: None,
        }
    }

    /// The thread reached an end edge successfully.
    pub fn completed(node: impl Into<String>, thread_id: impl Into<String>, state: T) -> Self {
        Self {
            node: node.into(),
            thread_id: thread_id.into(),
            running: false,
            partial: false,
            new_state: state,
            error: None,
        }
    }

    /// Something went wrong but the thread is not being torn down (e.g. a persistence hiccup).
    pub fn non_fatal(
        node: impl Into<String>,
        thread_id: impl Into<String>,
        state: T,
        error: RuntimeError,
    ) -> Self {
        Self {
            node: node.into(),
            thread_id: thread_id.into(),
            running: true,
            partial: false,
            new_state: state,
            error: Some(error),
        }
    }

    /// The thread terminated due to an unrecoverable error (node failure, timeout, eviction, ...).
    pub fn fatal(
        node: impl Into<String>,
        thread_id: impl Into<String>,
        state: T,
        error: RuntimeError,
    ) -> Self {
        Self {
            node: node.into(),
            thread_id: thread_id.into(),
            running: false,
            partial: false,
            new_state: state,
            error: Some(error),
        }
    }
}

/// Wraps the caller-supplied monitor channel with bounded, non-blocking-forever emission.
#[derive(Clone)]
pub struct MonitorSink<T> {
    tx: Sender<StateMonitorEntry<T>>,
}

impl<T> MonitorSink<T>
where
    T: Send + 'static,
{
    pub fn new(tx: Sender<StateMonitorEntry<T>>) -> Self {
        Self { tx }
    }

    /// Try to deliver immediately; if the channel is full, wait up to `max_interval` for room
    /// before giving up and dropping the entry. A closed channel drops the entry silently — the
    /// caller has stopped listening, which is not itself a runtime error.
    pub async fn emit(&self, entry: StateMonitorEntry<T>, max_interval: Duration) {
        match self.tx.try_send(entry) {
            Ok(()) => {}
            Err(TrySendError::Closed(_)) => {}
            Err(TrySendError::Full(entry)) => {
                if tokio::time::timeout(max_interval, self.tx.send(entry))
                    .await
                    .is_err()
                {
                    warn!("monitor channel saturated; dropping entry after grace window");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn delivers_when_channel_has_room() {
        let (tx, mut rx) = tokio::sync::mpsc::channel(4);
        let sink = MonitorSink::new(tx);
        sink.emit(
            StateMonitorEntry::completed("n", "t", 1),
            Duration::from_millis(50),
        )
        .await;
        let entry = rx.recv().await.unwrap();
        assert!(!entry.running);
        assert_eq!(entry.new_state, 1);
    }

    #[tokio::test]
    async fn drops_silently_once_closed() {
        let (tx, rx) = tokio::sync::mpsc::channel(4);
        drop(rx);
        let sink = MonitorSink::new(tx);
        sink.emit(
            StateMonitorEntry::completed("n", "t", 1),
            Duration::from_millis(10),
        )
        .await;
    }

    #[test]
    fn constructors_set_expected_flags() {
        let running = StateMonitorEntry::running("n", "t", 1);
        assert!(running.running && !running.partial && running.error.is_none());

        let partial = StateMonitorEntry::partial("n", "t", 1);
        assert!(partial.running && partial.partial);

        let completed = StateMonitorEntry::completed("n", "t", 1);
        assert!(!completed.running && completed.error.is_none());
    }
}
