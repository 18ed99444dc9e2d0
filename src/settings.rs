//! Runtime configuration: [`RuntimeSettings`] and its zero-means-default filling.
//!
//! Mirrors the project's established configuration idiom — see `EventBusConfig::new` in the
//! teacher codebase, which replaces a zero buffer capacity with a compile-time default. Here the
//! same rule is applied field-by-field across every numeric/duration setting the runtime takes.

use std::time::Duration;

/// Worker pool size multiplexing all node mailboxes.
pub const DEFAULT_WORKER_COUNT: usize = 8;
/// Capacity of the shared dispatch queue workers pull tasks from.
pub const DEFAULT_WORKER_QUEUE_SIZE: usize = 256;
/// Buffer size suggested for the caller-supplied monitor channel.
pub const DEFAULT_OUTCOME_NOTIFICATION_QUEUE_SIZE: usize = 256;
/// Grace window for a blocked monitor send before the entry is dropped.
pub const DEFAULT_OUTCOME_NOTIFICATION_MAX_INTERVAL: Duration = Duration::from_millis(250);
/// Capacity of the persistence worker's pending-checkpoint queue.
pub const DEFAULT_PERSISTENCE_JOBS_QUEUE_SIZE: usize = 64;
/// Grace window for enqueueing a persistence job before it is dropped.
pub const DEFAULT_PERSISTENCE_JOB_TIMEOUT: Duration = Duration::from_millis(500);
/// How long a thread may sit idle before the evictor removes it.
pub const DEFAULT_THREAD_TTL: Duration = Duration::from_secs(30 * 60);
/// How often the evictor sweeps the thread registry.
pub const DEFAULT_THREAD_EVICTOR_INTERVAL: Duration = Duration::from_secs(60);
/// How long `shutdown` waits for in-flight work to drain before force-exiting.
pub const DEFAULT_GRACEFUL_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);
/// Per-node invocation timeout, used when a [`crate::node::Node`] doesn't override it.
pub const DEFAULT_NODE_TIMEOUT: Duration = Duration::from_secs(5);

/// Numeric and duration knobs governing the runtime's internal subsystems.
///
/// Every field defaults to its zero value so that [`RuntimeSettings::fill_defaults`] has full
/// effect on a `Default::default()` instance: zero means "use the compiled-in default", any
/// other value (including a negative one, where the field type allows it) is preserved verbatim.
/// This makes it safe for tests to override exactly one knob and let the rest fall back.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RuntimeSettings {
    pub worker_count: usize,
    pub worker_queue_size: usize,
    pub outcome_notification_queue_size: usize,
    pub outcome_notification_max_interval: Duration,
    pub persistence_jobs_queue_size: usize,
    pub persistence_job_timeout: Duration,
    pub thread_ttl: Duration,
    pub thread_evictor_interval: Duration,
    pub graceful_shutdown_timeout: Duration,
}

impl RuntimeSettings {
    /// Returns a settings value with every field filled: zero is replaced by its compiled-in
    /// default, any other value is kept as-is. Idempotent — calling it again on its own output
    /// changes nothing, since no field it touches is ever left at zero. Does not mutate `self`.
    #[must_use]
    pub fn fill_defaults(&self) -> Self {
        Self {
            worker_count: non_zero_or(self.worker_count, DEFAULT_WORKER_COUNT),
            worker_queue_size: non_zero_or(self.worker_queue_size, DEFAULT_WORKER_QUEUE_SIZE),
            outcome_notification_queue_size: non_zero_or(
                self.outcome_notification_queue_size,
                DEFAULT_OUTCOME_NOTIFICATION_QUEUE_SIZE,
            ),
            outcome_notification_max_interval: non_zero_duration_or(
                self.outcome_notification_max_interval,
                DEFAULT_OUTCOME_NOTIFICATION_MAX_INTERVAL,
            ),
            persistence_jobs_queue_size: non_zero_or(
                self.persistence_jobs_queue_size,
                DEFAULT_PERSISTENCE_JOBS_QUEUE_SIZE,
            ),
            persistence_job_timeout: non_zero_duration_or(
                self.persistence_job_timeout,
                DEFAULT_PERSISTENCE_JOB_TIMEOUT,
            ),
            thread_ttl: non_zero_duration_or(self.thread_ttl, DEFAULT_THREAD_TTL),
            thread_evictor_interval: non_zero_duration_or(
                self.thread_evictor_interval,
                DEFAULT_THREAD_EVICTOR_INTERVAL,
            ),
            graceful_shutdown_timeout: non_zero_duration_or(
                self.graceful_shutdown_timeout,
                DEFAULT_GRACEFUL_SHUTDOWN_TIMEOUT,
            ),
        }
    }

    #[must_use]
    pub fn with_worker_count(mut self, count: usize) -> Self {
        self.worker_count = count;
        self
    }

    #[must_use]
    pub fn with_worker_queue_size(mut self, size: usize) -> Self {
        self.worker_queue_size = size;
        self
    }

    #[must_use]
    pub fn with_outcome_notification_queue_size(mut self, size: usize) -> Self {
        self.outcome_notification_queue_size = size;
        self
    }

    #[must_use]
    pub fn with_outcome_notification_max_interval(mut self, interval: Duration) -> Self {
        self.outcome_notification_max_interval = interval;
        self
    }

    #[must_use]
    pub fn with_persistence_jobs_queue_size(mut self, size: usize) -> Self {
        self.persistence_jobs_queue_size = size;
        self
    }

    #[must_use]
    pub fn with_persistence_job_timeout(mut self, timeout: Duration) -> Self {
        self.persistence_job_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_thread_ttl(mut self, ttl: Duration) -> Self {
        self.thread_ttl = ttl;
        self
    }

    #[must_use]
    pub fn with_thread_evictor_interval(mut self, interval: Duration) -> Self {
        self.thread_evictor_interval = interval;
        self
    }

    #[must_use]
    pub fn with_graceful_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.graceful_shutdown_timeout = timeout;
        self
    }
}

fn non_zero_or(value: usize, default: usize) -> usize {
    if value == 0 { default } else { value }
}

fn non_zero_duration_or(value: Duration, default: Duration) -> Duration {
    if value.is_zero() { default } else { value }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_every_zero_field() {
        let filled = RuntimeSettings::default().fill_defaults();
        assert_eq!(filled.worker_count, DEFAULT_WORKER_COUNT);
        assert_eq!(filled.worker_queue_size, DEFAULT_WORKER_QUEUE_SIZE);
        assert_eq!(
            filled.outcome_notification_queue_size,
            DEFAULT_OUTCOME_NOTIFICATION_QUEUE_SIZE
        );
        assert_eq!(filled.thread_ttl, DEFAULT_THREAD_TTL);
        assert_eq!(
            filled.graceful_shutdown_timeout,
            DEFAULT_GRACEFUL_SHUTDOWN_TIMEOUT
        );
    }

    #[test]
    fn preserves_non_zero_overrides() {
        let custom = RuntimeSettings::default().with_worker_count(3);
        let filled = custom.fill_defaults();
        assert_eq!(filled.worker_count, 3);
        assert_eq!(filled.worker_queue_size, DEFAULT_WORKER_QUEUE_SIZE);
    }

    #[test]
    fn is_idempotent_and_does_not_mutate_input() {
        let original = RuntimeSettings::default().with_worker_count(5);
        let once = original.fill_defaults();
        let twice = once.fill_defaults();
        assert_eq!(once, twice);
        assert_eq!(original.worker_count, 5);
        assert_eq!(original.worker_queue_size, 0);
    }
}
