//! Thread registry with TTL-based eviction (component C7).
//!
//! A [`Thread`] is the runtime's unit of conversational/session state: its current value of `T`,
//! when it was last touched, what was last handed to persistence, and whether a node invocation
//! currently owns it. [`ThreadRegistry`] is the map from thread id to `Thread`, plus the sweep
//! that evicts threads idle past their TTL.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

/// Where a thread sits in its own lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// No node invocation is currently in flight.
    Idle,
    /// A node invocation currently owns this thread.
    Running,
    /// `shutdown` has been called; no new invocations are accepted.
    Terminating,
    /// Removed from the registry by the evictor after exceeding its TTL.
    Evicted,
}

struct ThreadState<T> {
    state: T,
    last_persisted: Option<T>,
    lifecycle: Lifecycle,
    last_activity: Instant,
}

/// A single thread's state, guarded against concurrent invocation.
pub struct Thread<T> {
    id: String,
    executing: AtomicBool,
    inner: Mutex<ThreadState<T>>,
}

impl<T: Clone + PartialEq> Thread<T> {
    fn new(id: impl Into<String>, state: T) -> Self {
        Self {
            id: id.into(),
            executing: AtomicBool::new(false),
            inner: Mutex::new(ThreadState {
                state,
                last_persisted: None,
                lifecycle: Lifecycle::Idle,
                last_activity: Instant::now(),
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Atomically claim this thread for an invocation; `false` means it's already busy.
    pub fn try_acquire(&self) -> bool {
        if self
            .executing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            let mut guard = self.inner.lock();
            guard.lifecycle = Lifecycle::Running;
            guard.last_activity = Instant::now();
            true
        } else {
            false
        }
    }

    /// Release the claim taken by [`Thread::try_acquire`].
    pub fn release(&self) {
        let mut guard = self.inner.lock();
        if guard.lifecycle == Lifecycle::Running {
            guard.lifecycle = Lifecycle::Idle;
        }
        guard.last_activity = Instant::now();
        self.executing.store(false, Ordering::SeqCst);
    }

    pub fn current_state(&self) -> T {
        self.inner.lock().state.clone()
    }

    pub fn set_state(&self, state: T) {
        let mut guard = self.inner.lock();
        guard.state = state;
        guard.last_activity = Instant::now();
    }

    /// `true` if `state` differs from the last value handed to the persistence worker; updates
    /// the recorded last-persisted value as a side effect when it returns `true`.
    pub fn should_persist(&self, state: &T) -> bool {
        let mut guard = self.inner.lock();
        if guard.last_persisted.as_ref() == Some(state) {
            false
        } else {
            guard.last_persisted = Some(state.clone());
            true
        }
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.inner.lock().lifecycle
    }

    pub fn set_lifecycle(&self, lifecycle: Lifecycle) {
        self.inner.lock().lifecycle = lifecycle;
    }

    pub fn idle_for(&self) -> Duration {
        self.inner.lock().last_activity.elapsed()
    }
}

/// Map from thread id to [`Thread`], plus TTL-based eviction.
pub struct ThreadRegistry<T> {
    threads: parking_lot::RwLock<FxHashMap<String, Arc<Thread<T>>>>,
}

impl<T: Clone + PartialEq> ThreadRegistry<T> {
    pub fn new() -> Self {
        Self {
            threads: parking_lot::RwLock::new(FxHashMap::default()),
        }
    }

    pub fn get(&self, id: &str) -> Option<Arc<Thread<T>>> {
        self.threads.read().get(id).cloned()
    }

    /// Returns the existing thread for `id`, or creates one seeded with `initial_state`.
    /// `created` is `true` only when a new thread was inserted.
    pub fn get_or_create(&self, id: &str, initial_state: impl FnOnce() -> T) -> (Arc<Thread<T>>, bool) {
        if let Some(existing) = self.get(id) {
            return (existing, false);
        }
        let mut guard = self.threads.write();
        if let Some(existing) = guard.get(id) {
            return (existing.clone(), false);
        }
        let thread = Arc::new(Thread::new(id, initial_state()));
        guard.insert(id.to_string(), thread.clone());
        (thread, true)
    }

    pub fn remove(&self, id: &str) -> Option<Arc<Thread<T>>> {
        self.threads.write().remove(id)
    }

    pub fn len(&self) -> usize {
        self.threads.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.threads.read().is_empty()
    }

    pub fn all(&self) -> Vec<Arc<Thread<T>>> {
        self.threads.read().values().cloned().collect()
    }

    /// Remove and return every idle thread whose idle duration exceeds `ttl`. Threads currently
    /// `Running` are never evicted regardless of `last_activity`.
    pub fn evict_idle_past_ttl(&self, ttl: Duration) -> Vec<Arc<Thread<T>>> {
        let expired_ids: Vec<String> = self
            .threads
            .read()
            .iter()
            .filter(|(_, thread)| thread.lifecycle() == Lifecycle::Idle && thread.idle_for() >= ttl)
            .map(|(id, _)| id.clone())
            .collect();

        let mut guard = self.threads.write();
        expired_ids
            .into_iter()
            .filter_map(|id| {
                let thread = guard.remove(&id)?;
                thread.set_lifecycle(Lifecycle::Evicted);
                Some(thread)
            })
            .collect()
    }
}

impl<T: Clone + PartialEq> Default for ThreadRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}
