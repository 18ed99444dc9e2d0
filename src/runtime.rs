//! The runtime orchestrator (component C8) tying every other component together.
//!
//! [`RuntimeBuilder`] assembles a graph of [`crate::edge::Edge`]s and compiles it into a
//! [`Runtime`]: a worker pool multiplexing every node's mailbox, a single dispatcher task that
//! performs routing and hands work to the next mailbox (or completes the thread), a persistence
//! worker, and a thread-eviction sweep. `Runtime::invoke` enqueues one unit of work on the start
//! node's mailbox and returns immediately with the thread id; callers observe partial updates and
//! the terminal outcome asynchronously over the monitor channel.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex as SyncMutex;
use rustc_hash::FxHashMap;
use tokio::sync::mpsc;
use tokio::time::{Duration, Instant};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::edge::{Edge, EdgeEndpoint};
use crate::error::{MailboxError, RoutingError, RuntimeError, ValidationDefect, ValidationReport};
use crate::mailbox::{DispatchTask, MailboxTask, NodeMailbox, WorkerPool};
use crate::monitor::{MonitorSink, StateMonitorEntry};
use crate::node::{Node, PartialNotifier, Role};
use crate::persistence::{PersistFn, PersistenceHandle, PersistenceWorker, RestoreFn};
use crate::settings::RuntimeSettings;
use crate::thread_registry::{Thread, ThreadRegistry};

const EVICTOR_SOURCE: &str = "<evictor>";
const PERSISTENCE_SOURCE: &str = "<persistence>";

/// Per-invocation options. Reserved for growth (e.g. cancellation tokens); today it only carries
/// the thread id.
#[derive(Debug, Clone, Default)]
pub struct InvokeConfig {
    pub thread_id: Option<String>,
}

struct GraphData<I, T> {
    start_edge: Edge<I, T>,
    nodes: FxHashMap<String, Arc<Node<I, T>>>,
    outbound: FxHashMap<String, Vec<Edge<I, T>>>,
}

/// Builds a [`Runtime`] by accumulating edges and configuration, then compiling.
pub struct RuntimeBuilder<I, T> {
    initial_state: T,
    edges: Vec<Edge<I, T>>,
    settings: RuntimeSettings,
    persist_fn: Option<Arc<dyn PersistFn<T>>>,
    restore_fn: Option<Arc<dyn RestoreFn<T>>>,
}

impl<I, T> RuntimeBuilder<I, T>
where
    I: Clone + Send + Sync + 'static,
    T: Clone + PartialEq + Send + Sync + 'static,
{
    /// `initial_state` is mandatory: `T` is not required to implement `Default`, so the builder
    /// cannot synthesize a starting value on the caller's behalf.
    pub fn new(initial_state: T) -> Self {
        Self {
            initial_state,
            edges: Vec::new(),
            settings: RuntimeSettings::default(),
            persist_fn: None,
            restore_fn: None,
        }
    }

    #[must_use]
    pub fn with_settings(mut self, settings: RuntimeSettings) -> Self {
        self.settings = settings;
        self
    }

    #[must_use]
    pub fn with_persist_fn(mut self, persist_fn: impl PersistFn<T> + 'static) -> Self {
        self.persist_fn = Some(Arc::new(persist_fn));
        self
    }

    #[must_use]
    pub fn with_restore_fn(mut self, restore_fn: impl RestoreFn<T> + 'static) -> Self {
        self.restore_fn = Some(Arc::new(restore_fn));
        self
    }

    #[must_use]
    pub fn add_edge(mut self, edge: Edge<I, T>) -> Self {
        self.edges.push(edge);
        self
    }

    #[must_use]
    pub fn add_edges(mut self, edges: impl IntoIterator<Item = Edge<I, T>>) -> Self {
        self.edges.extend(edges);
        self
    }

    /// Validate the accumulated graph and spin up the runtime's background tasks. `monitor_tx`
    /// receives every [`StateMonitorEntry`] for the lifetime of the runtime.
    pub fn build(self, monitor_tx: mpsc::Sender<StateMonitorEntry<T>>) -> Result<Runtime<I, T>, RuntimeError> {
        let settings = self.settings.fill_defaults();
        let graph = compile_graph(self.edges)?;

        let (queue_tx, queue_rx) = mpsc::channel::<MailboxTask<I>>(settings.worker_queue_size);

        let mut mailboxes = FxHashMap::default();
        for name in graph.nodes.keys() {
            let node = &graph.nodes[name];
            mailboxes.insert(
                name.clone(),
                Arc::new(NodeMailbox::new(name.clone(), node.mailbox_capacity(), queue_tx.clone())),
            );
        }

        let (outcome_tx, outcome_rx) = mpsc::channel::<NodeOutcome<I, T>>(settings.worker_queue_size);

        let monitor = MonitorSink::new(monitor_tx);

        let (persist_handle, persistence_worker) = match self.persist_fn.clone() {
            Some(persist_fn) => {
                let monitor_for_failures = monitor.clone();
                let interval = settings.outcome_notification_max_interval;
                let (handle, worker) = PersistenceWorker::spawn(
                    settings.persistence_jobs_queue_size,
                    persist_fn,
                    move |thread_id: String, state: T, err| {
                        let monitor = monitor_for_failures.clone();
                        async move {
                            let wrapped = RuntimeError::from(crate::error::PersistenceError::Callback {
                                thread_id: thread_id.clone(),
                                source: err,
                            });
                            monitor
                                .emit(StateMonitorEntry::non_fatal(PERSISTENCE_SOURCE, thread_id, state, wrapped), interval)
                                .await;
                        }
                    },
                );
                (Some(handle), Some(worker))
            }
            None => (None, None),
        };

        let inner = Arc::new(RuntimeInner {
            initial_state: self.initial_state,
            graph,
            settings,
            mailboxes,
            thread_registry: ThreadRegistry::new(),
            pending_invokes: SyncMutex::new(HashSet::default()),
            monitor,
            persist_handle,
            restore_fn: self.restore_fn,
            started: AtomicBool::new(false),
            terminating: AtomicBool::new(false),
        });

        let worker_handles = {
            let inner = inner.clone();
            let outcome_tx = outcome_tx.clone();
            WorkerPool::spawn(settings.worker_count, queue_rx, move |task| {
                let inner = inner.clone();
                let outcome_tx = outcome_tx.clone();
                async move { run_node(inner, outcome_tx, task).await }
            })
        };

        let dispatcher_handle = {
            let inner = inner.clone();
            tokio::spawn(async move { run_dispatcher(inner, outcome_rx).await })
        };

        let evictor_handle = {
            let inner = inner.clone();
            tokio::spawn(async move { run_evictor(inner).await })
        };

        Ok(Runtime {
            inner,
            worker_handles: SyncMutex::new(worker_handles),
            dispatcher_handle: SyncMutex::new(Some(dispatcher_handle)),
            evictor_handle: SyncMutex::new(Some(evictor_handle)),
            persistence_worker: SyncMutex::new(persistence_worker),
        })
    }
}

fn compile_graph<I, T>(edges: Vec<Edge<I, T>>) -> Result<GraphData<I, T>, RuntimeError> {
    let mut defects = Vec::new();
    let mut nodes: FxHashMap<String, Arc<Node<I, T>>> = FxHashMap::default();
    let mut outbound: FxHashMap<String, Vec<Edge<I, T>>> = FxHashMap::default();
    let mut start_edges: Vec<Edge<I, T>> = Vec::new();

    for edge in &edges {
        if matches!(edge.from, EdgeEndpoint::End) || matches!(edge.to, EdgeEndpoint::Start) {
            defects.push(ValidationDefect::NilEndpoint);
        }
        if let EdgeEndpoint::Node(node) = &edge.from {
            if node.name().is_empty() {
                defects.push(ValidationDefect::EmptyNodeName);
            }
            nodes.entry(node.name().to_string()).or_insert_with(|| node.clone());
            outbound.entry(node.name().to_string()).or_default().push(edge.clone());
        }
        if let EdgeEndpoint::Node(node) = &edge.to {
            nodes.entry(node.name().to_string()).or_insert_with(|| node.clone());
        }
        if edge.is_start_edge() {
            start_edges.push(edge.clone());
        }
    }

    let start_edge = match start_edges.len() {
        0 => {
            defects.push(ValidationDefect::MissingStartEdge);
            None
        }
        1 => Some(start_edges[0].clone()),
        _ => {
            defects.push(ValidationDefect::DuplicateStartEdge);
            None
        }
    };

    for (name, node) in &nodes {
        if node.role() != Role::End && outbound.get(name).map(Vec::is_empty).unwrap_or(true) {
            defects.push(ValidationDefect::DeadEndNode(name.clone()));
        }
    }

    if let Some(start_edge) = &start_edge {
        if start_edge.to.node().is_none() {
            defects.push(ValidationDefect::NilEndpoint);
        } else if !reaches_end(start_edge, &outbound) {
            defects.push(ValidationDefect::NoPathToEnd);
        }
    }

    ValidationReport::ok_or(defects).map_err(RuntimeError::from)?;

    Ok(GraphData {
        start_edge: start_edge.expect("validated: exactly one start edge"),
        nodes,
        outbound,
    })
}

fn reaches_end<I, T>(start_edge: &Edge<I, T>, outbound: &FxHashMap<String, Vec<Edge<I, T>>>) -> bool {
    let Some(start_node) = start_edge.to.node() else {
        return false;
    };
    let mut seen = HashSet::new();
    let mut queue = VecDeque::new();
    queue.push_back(start_node.name().to_string());
    seen.insert(start_node.name().to_string());

    while let Some(name) = queue.pop_front() {
        let Some(edges) = outbound.get(&name) else {
            continue;
        };
        for edge in edges {
            if edge.is_end_edge() {
                return true;
            }
            if let Some(next) = edge.to.node() {
                if seen.insert(next.name().to_string()) {
                    queue.push_back(next.name().to_string());
                }
            }
        }
    }
    false
}

/// Handed from a worker to the single dispatcher task after a node function succeeds.
struct NodeOutcome<I, T> {
    node: String,
    thread_id: String,
    input: I,
    state: T,
}

struct RuntimeInner<I, T> {
    initial_state: T,
    graph: GraphData<I, T>,
    settings: RuntimeSettings,
    mailboxes: FxHashMap<String, Arc<NodeMailbox<I>>>,
    thread_registry: ThreadRegistry<T>,
    /// Thread ids with a dispatched, not-yet-finalized invocation. Tracked only so
    /// [`Runtime::shutdown`] can tell when every in-flight thread has reached a terminal state;
    /// `invoke` itself no longer waits on anything keyed off this set.
    pending_invokes: SyncMutex<HashSet<String>>,
    monitor: MonitorSink<T>,
    persist_handle: Option<PersistenceHandle<T>>,
    restore_fn: Option<Arc<dyn RestoreFn<T>>>,
    started: AtomicBool,
    terminating: AtomicBool,
}

impl<I, T> RuntimeInner<I, T>
where
    I: Send + Sync + 'static,
    T: Clone + PartialEq + Send + Sync + 'static,
{
    /// Mark `thread_id`'s invocation as finished. `invoke` is fire-and-forget, so nothing awaits
    /// this directly — the terminal [`StateMonitorEntry`] already emitted by the caller is the
    /// only place the outcome is observable.
    fn finalize(&self, thread_id: &str) {
        self.pending_invokes.lock().remove(thread_id);
        if let Some(thread) = self.thread_registry.get(thread_id) {
            thread.release();
        }
    }

    async fn maybe_persist(&self, thread_id: &str, thread: &Arc<Thread<T>>, state: &T) {
        let Some(persist_handle) = &self.persist_handle else {
            return;
        };
        if !thread.should_persist(state) {
            return;
        }
        if let Err(err) = persist_handle
            .enqueue(thread_id.to_string(), state.clone(), self.settings.persistence_job_timeout)
            .await
        {
            self.monitor
                .emit(
                    StateMonitorEntry::non_fatal(PERSISTENCE_SOURCE, thread_id, state.clone(), RuntimeError::from(err)),
                    self.settings.outcome_notification_max_interval,
                )
                .await;
        }
    }
}

fn wrap_routing_error(node: &str, err: RoutingError) -> RuntimeError {
    match err {
        RoutingError::NoOutboundEdges => RuntimeError::NoOutboundEdges { node: node.to_string() },
        RoutingError::NoMatchingEdge { .. } => RuntimeError::NoOutboundEdges { node: node.to_string() },
        RoutingError::NilEdge => RuntimeError::NilEdge { node: node.to_string() },
        RoutingError::Selector(message) => RuntimeError::NodeFailed {
            node: node.to_string(),
            thread_id: String::new(),
            source: message.into(),
        },
        RoutingError::NoRoutingPolicy => RuntimeError::NoRoutingPolicy { node: node.to_string() },
        RoutingError::NextEdgeNil => RuntimeError::NextEdgeNil { node: node.to_string() },
    }
}

fn wrap_mailbox_error(err: MailboxError) -> RuntimeError {
    match err {
        MailboxError::Overflow { node, waited } => RuntimeError::MailboxOverflow { node, waited },
        MailboxError::Closed { node } => RuntimeError::MailboxOverflow { node, waited: Duration::ZERO },
    }
}

async fn select_next_edge<I, T>(node: &Node<I, T>, edges: Vec<Edge<I, T>>, input: I, state: T) -> Result<Edge<I, T>, RuntimeError>
where
    I: Send + Sync + 'static,
    T: Send + Sync + 'static,
{
    if edges.is_empty() {
        return Err(RuntimeError::NoOutboundEdges { node: node.name().to_string() });
    }
    match node.route() {
        Some(policy) => policy
            .select_edge(input, state, edges)
            .await
            .map_err(|err| wrap_routing_error(node.name(), err)),
        None if edges.len() == 1 => Ok(edges.into_iter().next().expect("len checked above")),
        None => Err(RuntimeError::NoRoutingPolicy { node: node.name().to_string() }),
    }
}

#[instrument(skip(inner, outcome_tx, task), fields(node = %task.node, thread_id = %task.thread_id))]
async fn run_node<I, T>(inner: Arc<RuntimeInner<I, T>>, outcome_tx: mpsc::Sender<NodeOutcome<I, T>>, task: DispatchTask<I>)
where
    I: Clone + Send + Sync + 'static,
    T: Clone + PartialEq + Send + Sync + 'static,
{
    let DispatchTask { node: node_name, input, thread_id } = task;
    let Some(node) = inner.graph.nodes.get(&node_name).cloned() else {
        warn!("dispatch task referenced unknown node; dropping");
        return;
    };
    let Some(thread) = inner.thread_registry.get(&thread_id) else {
        warn!("dispatch task referenced unknown thread; dropping");
        return;
    };

    let state = thread.current_state();
    let input_for_routing = input.clone();

    let notify_inner = inner.clone();
    let notify_thread = thread.clone();
    let notify_node = node.clone();
    let notify_thread_id = thread_id.clone();
    let notifier = PartialNotifier::new(move |change: T| {
        let inner = notify_inner.clone();
        let thread = notify_thread.clone();
        let node = notify_node.clone();
        let thread_id = notify_thread_id.clone();
        Box::pin(async move {
            let reduced = node.reducer_or_default().reduce(thread.current_state(), change);
            thread.set_state(reduced.clone());
            inner
                .monitor
                .emit(
                    StateMonitorEntry::partial(node.name(), thread_id.clone(), reduced.clone()),
                    inner.settings.outcome_notification_max_interval,
                )
                .await;
            inner.maybe_persist(&thread_id, &thread, &reduced).await;
        })
    });

    let call = node.func().call(input, state.clone(), notifier);
    match tokio::time::timeout(node.timeout(), call).await {
        Ok(Ok(change)) => {
            let reduced = node.reducer_or_default().reduce(state, change);
            thread.set_state(reduced.clone());
            inner
                .monitor
                .emit(
                    StateMonitorEntry::running(node.name(), thread_id.clone(), reduced.clone()),
                    inner.settings.outcome_notification_max_interval,
                )
                .await;
            let outcome = NodeOutcome {
                node: node.name().to_string(),
                thread_id: thread_id.clone(),
                input: input_for_routing,
                state: reduced,
            };
            if outcome_tx.send(outcome).await.is_err() {
                warn!("dispatcher channel closed; dropping outcome");
            }
        }
        Ok(Err(source)) => {
            let err = RuntimeError::NodeFailed {
                node: node.name().to_string(),
                thread_id: thread_id.clone(),
                source,
            };
            inner
                .monitor
                .emit(
                    StateMonitorEntry::fatal(node.name(), thread_id.clone(), state, err.duplicate()),
                    inner.settings.outcome_notification_max_interval,
                )
                .await;
            inner.finalize(&thread_id);
        }
        Err(_elapsed) => {
            let err = RuntimeError::NodeTimeout {
                node: node.name().to_string(),
                thread_id: thread_id.clone(),
            };
            inner
                .monitor
                .emit(
                    StateMonitorEntry::fatal(node.name(), thread_id.clone(), state, err.duplicate()),
                    inner.settings.outcome_notification_max_interval,
                )
                .await;
            inner.finalize(&thread_id);
        }
    }
}

async fn run_dispatcher<I, T>(inner: Arc<RuntimeInner<I, T>>, mut outcome_rx: mpsc::Receiver<NodeOutcome<I, T>>)
where
    I: Clone + Send + Sync + 'static,
    T: Clone + PartialEq + Send + Sync + 'static,
{
    while let Some(outcome) = outcome_rx.recv().await {
        let NodeOutcome { node: node_name, thread_id, input, state } = outcome;
        let Some(node) = inner.graph.nodes.get(&node_name).cloned() else {
            continue;
        };
        let Some(thread) = inner.thread_registry.get(&thread_id) else {
            continue;
        };
        let outbound = inner.graph.outbound.get(&node_name).cloned().unwrap_or_default();

        match select_next_edge(&node, outbound, input.clone(), state.clone()).await {
            Ok(edge) if edge.is_end_edge() => {
                inner.maybe_persist(&thread_id, &thread, &state).await;
                inner
                    .monitor
                    .emit(
                        StateMonitorEntry::completed(node.name(), thread_id.clone(), state.clone()),
                        inner.settings.outcome_notification_max_interval,
                    )
                    .await;
                inner.finalize(&thread_id);
            }
            Ok(edge) => {
                inner.maybe_persist(&thread_id, &thread, &state).await;
                let Some(next_node) = edge.to.node().cloned() else {
                    inner.finalize(&thread_id);
                    continue;
                };
                let Some(mailbox) = inner.mailboxes.get(next_node.name()).cloned() else {
                    inner.finalize(&thread_id);
                    continue;
                };
                if let Err(mailbox_err) = mailbox.enqueue(input, thread_id.clone(), next_node.timeout()).await {
                    let err = wrap_mailbox_error(mailbox_err);
                    inner
                        .monitor
                        .emit(
                            StateMonitorEntry::fatal(node.name(), thread_id.clone(), state, err.duplicate()),
                            inner.settings.outcome_notification_max_interval,
                        )
                        .await;
                    inner.finalize(&thread_id);
                }
            }
            Err(err) => {
                inner
                    .monitor
                    .emit(
                        StateMonitorEntry::fatal(node.name(), thread_id.clone(), state, err.duplicate()),
                        inner.settings.outcome_notification_max_interval,
                    )
                    .await;
                inner.finalize(&thread_id);
            }
        }
    }
}

async fn run_evictor<I, T>(inner: Arc<RuntimeInner<I, T>>)
where
    I: Send + Sync + 'static,
    T: Clone + PartialEq + Send + Sync + 'static,
{
    let mut ticker = tokio::time::interval(inner.settings.thread_evictor_interval);
    loop {
        ticker.tick().await;
        if inner.terminating.load(Ordering::SeqCst) {
            break;
        }
        let evicted = inner.thread_registry.evict_idle_past_ttl(inner.settings.thread_ttl);
        for thread in evicted {
            let state = thread.current_state();
            let err = RuntimeError::EvictionByInactivity { thread_id: thread.id().to_string() };
            inner
                .monitor
                .emit(
                    StateMonitorEntry::fatal(EVICTOR_SOURCE, thread.id(), state, err),
                    inner.settings.outcome_notification_max_interval,
                )
                .await;
            info!(thread_id = %thread.id(), "evicted idle thread");
        }
    }
}

/// A compiled, running graph, plus the handles needed to shut its background tasks down.
///
/// The background-task handles sit behind [`SyncMutex`] so [`Runtime::shutdown`] can take `&self`
/// rather than consuming the runtime: callers routinely share a `Runtime` via `Arc` across
/// concurrent `invoke` calls, and shutdown must be both callable from that shared handle and safe
/// to call more than once.
pub struct Runtime<I, T> {
    inner: Arc<RuntimeInner<I, T>>,
    worker_handles: SyncMutex<Vec<tokio::task::JoinHandle<()>>>,
    dispatcher_handle: SyncMutex<Option<tokio::task::JoinHandle<()>>>,
    evictor_handle: SyncMutex<Option<tokio::task::JoinHandle<()>>>,
    persistence_worker: SyncMutex<Option<PersistenceWorker>>,
}

impl<I, T> Runtime<I, T>
where
    I: Clone + Send + Sync + 'static,
    T: Clone + PartialEq + Send + Sync + 'static,
{
    /// Enqueue one unit of work on the start node's mailbox for the given (or freshly generated)
    /// thread id and return immediately with the thread id used — fire-and-forget. The caller
    /// never learns the execution outcome from this call; it must watch the monitor channel for
    /// the thread's terminal entry (`running == false`), or poll [`Runtime::current_state`].
    ///
    /// Only invocation-time failures are returned synchronously: a thread id already mid-invocation
    /// ([`RuntimeError::ThreadBusy`]), a restore callback failure, or a mailbox that couldn't admit
    /// the first task within its grace window. Once the task is enqueued, every later failure
    /// (node error, timeout, routing error) surfaces solely as a fatal monitor entry.
    #[instrument(skip(self, input), fields(thread_id))]
    pub async fn invoke(&self, input: I, config: InvokeConfig) -> Result<String, RuntimeError> {
        self.inner.started.store(true, Ordering::SeqCst);
        if self.inner.terminating.load(Ordering::SeqCst) {
            return Err(RuntimeError::RuntimeExecuting);
        }

        let thread_id = match config.thread_id {
            Some(id) if id.is_empty() => return Err(RuntimeError::RuntimeIdNotSet),
            Some(id) => id,
            None => Uuid::new_v4().to_string(),
        };
        tracing::Span::current().record("thread_id", tracing::field::display(&thread_id));

        let (thread, created) = self
            .inner
            .thread_registry
            .get_or_create(&thread_id, || self.inner.initial_state.clone());

        if created {
            if let Some(restore_fn) = &self.inner.restore_fn {
                match restore_fn.restore(&thread_id).await {
                    Ok(Some(restored)) => thread.set_state(restored),
                    Ok(None) => {}
                    Err(source) => {
                        self.inner.thread_registry.remove(&thread_id);
                        return Err(RuntimeError::RestoreFailed { thread_id, source });
                    }
                }
            }
        }

        if !thread.try_acquire() {
            return Err(RuntimeError::ThreadBusy { thread_id });
        }

        self.inner.pending_invokes.lock().insert(thread_id.clone());

        let Some(start_node) = self.inner.graph.start_edge.to.node().cloned() else {
            thread.release();
            self.inner.pending_invokes.lock().remove(&thread_id);
            return Err(RuntimeError::StartNodeNil);
        };
        let Some(mailbox) = self.inner.mailboxes.get(start_node.name()).cloned() else {
            thread.release();
            self.inner.pending_invokes.lock().remove(&thread_id);
            return Err(RuntimeError::StartNodeNil);
        };

        if let Err(mailbox_err) = mailbox.enqueue(input, thread_id.clone(), start_node.timeout()).await {
            self.inner.pending_invokes.lock().remove(&thread_id);
            thread.release();
            return Err(wrap_mailbox_error(mailbox_err));
        }

        Ok(thread_id)
    }

    pub fn current_state(&self, thread_id: &str) -> Result<T, RuntimeError> {
        self.inner
            .thread_registry
            .get(thread_id)
            .map(|thread| thread.current_state())
            .ok_or_else(|| RuntimeError::UnknownThreadId(thread_id.to_string()))
    }

    /// Explicitly reload `thread_id`'s last checkpoint via the registered restore callback,
    /// seeding (or overwriting) its in-memory state without going through `invoke`. Distinct from
    /// the implicit restore-on-first-invoke in [`Runtime::invoke`]: this is for a caller that
    /// wants to rehydrate and inspect a thread's persisted state on demand.
    pub async fn restore(&self, thread_id: &str) -> Result<T, RuntimeError> {
        let Some(restore_fn) = &self.inner.restore_fn else {
            return Err(RuntimeError::RestoreNotSet);
        };
        match restore_fn.restore(thread_id).await {
            Ok(Some(state)) => {
                let (thread, _) = self
                    .inner
                    .thread_registry
                    .get_or_create(thread_id, || state.clone());
                thread.set_state(state.clone());
                Ok(state)
            }
            Ok(None) => Err(RuntimeError::UnknownThreadId(thread_id.to_string())),
            Err(source) => Err(RuntimeError::RestoreFailed {
                thread_id: thread_id.to_string(),
                source,
            }),
        }
    }

    /// Stop accepting new invocations, close every mailbox, then wait up to the configured
    /// graceful-shutdown timeout for (a) running threads to reach a terminal state and (b) the
    /// persistence queue to drain, before force-exiting: aborting whatever background tasks are
    /// still alive. Returns early the moment no invocation is still pending.
    ///
    /// Idempotent and safe to call concurrently from a `Runtime` shared via `Arc`: the first
    /// caller to flip the runtime's terminating flag from `false` does the draining; every other
    /// call (including ones already in flight) observes it already set and returns immediately.
    pub async fn shutdown(&self) {
        if self.inner.terminating.swap(true, Ordering::SeqCst) {
            return;
        }
        for mailbox in self.inner.mailboxes.values() {
            mailbox.close();
        }

        let deadline = Instant::now() + self.inner.settings.graceful_shutdown_timeout;
        while Instant::now() < deadline {
            if self.inner.pending_invokes.lock().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        let handles = std::mem::take(&mut *self.worker_handles.lock());
        for handle in handles {
            handle.abort();
        }
        let dispatcher_handle = self.dispatcher_handle.lock().take();
        if let Some(handle) = dispatcher_handle {
            handle.abort();
        }
        let evictor_handle = self.evictor_handle.lock().take();
        if let Some(handle) = evictor_handle {
            handle.abort();
        }
        let persistence_worker = self.persistence_worker.lock().take();
        if let Some(worker) = persistence_worker {
            worker.drain_or_abort(deadline).await;
        }
    }
}
