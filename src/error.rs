//! Crate-wide error taxonomy.
//!
//! Every fallible operation on [`crate::runtime::Runtime`] returns [`RuntimeError`], a single
//! `thiserror`-derived enum carrying one variant per error identity the runtime distinguishes.
//! Internal subsystems (routing, mailboxes, persistence) use their own smaller error enums for
//! local plumbing and convert into [`RuntimeError`] at the boundary where the orchestrator
//! surfaces them to a monitor entry or a synchronous caller.

use std::time::Duration;

use miette::Diagnostic;
use thiserror::Error;

/// Boxed user error, for node functions and host callbacks whose error type we don't control.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised while selecting the next edge for a node (component C2).
#[derive(Debug, Error, Diagnostic)]
pub enum RoutingError {
    #[error("node has no outbound edges")]
    #[diagnostic(
        code(threadwheel::routing::no_outbound_edges),
        help("Every non-end node must have at least one outbound edge.")
    )]
    NoOutboundEdges,

    #[error("no outbound edge matched tag {key}={value}")]
    #[diagnostic(code(threadwheel::routing::no_matching_edge))]
    NoMatchingEdge { key: String, value: String },

    #[error("conditional route selector returned no edge")]
    #[diagnostic(code(threadwheel::routing::nil_edge))]
    NilEdge,

    #[error("conditional route selector failed: {0}")]
    #[diagnostic(code(threadwheel::routing::selector))]
    Selector(String),

    #[error("node has no routing policy configured")]
    #[diagnostic(
        code(threadwheel::routing::no_policy),
        help("Intermediate nodes with more than one outbound edge need a RoutePolicy.")
    )]
    NoRoutingPolicy,

    #[error("selected edge has no destination node")]
    #[diagnostic(code(threadwheel::routing::next_edge_nil))]
    NextEdgeNil,
}

/// Errors raised while enqueueing work onto a node's mailbox (component C3).
#[derive(Debug, Error, Diagnostic)]
pub enum MailboxError {
    #[error("mailbox for node {node} overflowed after waiting {waited:?}")]
    #[diagnostic(
        code(threadwheel::mailbox::overflow),
        help("The node is falling behind; raise its mailbox capacity or the worker count.")
    )]
    Overflow { node: String, waited: Duration },

    #[error("mailbox for node {node} is closed")]
    #[diagnostic(code(threadwheel::mailbox::closed))]
    Closed { node: String },
}

/// Errors raised by the persistence worker (component C6).
#[derive(Debug, Error, Diagnostic)]
pub enum PersistenceError {
    #[error("persistence queue full for thread {thread_id}")]
    #[diagnostic(code(threadwheel::persistence::queue_full))]
    QueueFull { thread_id: String },

    #[error("persistence enqueue timed out for thread {thread_id}")]
    #[diagnostic(code(threadwheel::persistence::timeout))]
    Timeout { thread_id: String },

    #[error("persist callback failed for thread {thread_id}: {source}")]
    #[diagnostic(code(threadwheel::persistence::callback))]
    Callback {
        thread_id: String,
        #[source]
        source: BoxError,
    },

    #[error("restore callback failed for thread {thread_id}: {source}")]
    #[diagnostic(code(threadwheel::persistence::restore_failed))]
    RestoreFailed {
        thread_id: String,
        #[source]
        source: BoxError,
    },
}

/// A single structural defect found by [`crate::runtime::Runtime::validate`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationDefect {
    #[error("no start edge registered")]
    MissingStartEdge,
    #[error("more than one start edge registered")]
    DuplicateStartEdge,
    #[error("no end edge is reachable from the start edge")]
    NoPathToEnd,
    #[error("node {0} has no outbound edges")]
    DeadEndNode(String),
    #[error("edge references a nil endpoint")]
    NilEndpoint,
    #[error("node has an empty name")]
    EmptyNodeName,
}

/// Aggregated validation failure: every defect found in one pass, not just the first.
#[derive(Debug, Error, Diagnostic, Clone, PartialEq, Eq)]
#[error("graph failed validation: {}", render_defects(.defects))]
#[diagnostic(
    code(threadwheel::graph::invalid),
    help("Fix every listed defect; validate() reports all of them in one pass.")
)]
pub struct ValidationReport {
    pub defects: Vec<ValidationDefect>,
}

fn render_defects(defects: &[ValidationDefect]) -> String {
    defects
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationReport {
    pub fn ok_or(defects: Vec<ValidationDefect>) -> Result<(), Self> {
        if defects.is_empty() {
            Ok(())
        } else {
            Err(Self { defects })
        }
    }
}

/// The single public error type returned by [`crate::runtime::Runtime`].
#[derive(Debug, Error, Diagnostic)]
pub enum RuntimeError {
    #[error("runtime is already executing; structural changes are rejected after the first invoke")]
    #[diagnostic(code(threadwheel::runtime::executing))]
    RuntimeExecuting,

    #[error("start edge was not provided")]
    #[diagnostic(code(threadwheel::runtime::start_edge_nil))]
    StartEdgeNil,

    #[error("start edge has no destination node")]
    #[diagnostic(code(threadwheel::runtime::start_node_nil))]
    StartNodeNil,

    #[error(transparent)]
    #[diagnostic(transparent)]
    Invalid(#[from] ValidationReport),

    #[error("no restore callback registered")]
    #[diagnostic(code(threadwheel::runtime::restore_not_set))]
    RestoreNotSet,

    #[error("restore failed for thread {thread_id}")]
    #[diagnostic(code(threadwheel::runtime::restore_failed))]
    RestoreFailed {
        thread_id: String,
        #[source]
        source: BoxError,
    },

    #[error("no thread id could be determined for this invocation")]
    #[diagnostic(code(threadwheel::runtime::id_not_set))]
    RuntimeIdNotSet,

    #[error("unknown thread id: {0}")]
    #[diagnostic(code(threadwheel::runtime::unknown_thread))]
    UnknownThreadId(String),

    #[error("runtime is already executing thread {thread_id}")]
    #[diagnostic(
        code(threadwheel::runtime::thread_busy),
        help("Wait for the in-flight invoke on this thread id to finish, or use a distinct id.")
    )]
    ThreadBusy { thread_id: String },

    #[error("persistence queue is full for thread {thread_id}")]
    #[diagnostic(code(threadwheel::runtime::persistence_queue_full))]
    PersistenceQueueFull { thread_id: String },

    #[error("persistence enqueue timed out for thread {thread_id}")]
    #[diagnostic(code(threadwheel::runtime::persistence_timeout))]
    PersistenceTimeout { thread_id: String },

    #[error("node {node} has no outbound edges")]
    #[diagnostic(code(threadwheel::runtime::no_outbound_edges))]
    NoOutboundEdges { node: String },

    #[error("node {node} has more than one outbound edge but no routing policy")]
    #[diagnostic(code(threadwheel::runtime::no_routing_policy))]
    NoRoutingPolicy { node: String },

    #[error("conditional route selector for node {node} returned no edge")]
    #[diagnostic(code(threadwheel::runtime::nil_edge))]
    NilEdge { node: String },

    #[error("edge selected by node {node}'s routing policy has no destination node")]
    #[diagnostic(code(threadwheel::runtime::next_edge_nil))]
    NextEdgeNil { node: String },

    #[error("thread {thread_id} evicted after exceeding its TTL")]
    #[diagnostic(code(threadwheel::runtime::eviction))]
    EvictionByInactivity { thread_id: String },

    #[error("mailbox for node {node} overflowed after waiting {waited:?}")]
    #[diagnostic(code(threadwheel::runtime::mailbox_overflow))]
    MailboxOverflow { node: String, waited: Duration },

    #[error("node {node} timed out on thread {thread_id}")]
    #[diagnostic(code(threadwheel::runtime::node_timeout))]
    NodeTimeout { node: String, thread_id: String },

    #[error("node {node} failed on thread {thread_id}: {source}")]
    #[diagnostic(code(threadwheel::runtime::node_failed))]
    NodeFailed {
        node: String,
        thread_id: String,
        #[source]
        source: BoxError,
    },
}

impl From<RoutingError> for RuntimeError {
    fn from(err: RoutingError) -> Self {
        match err {
            RoutingError::NoOutboundEdges => RuntimeError::NoOutboundEdges {
                node: String::new(),
            },
            RoutingError::NoMatchingEdge { .. } => RuntimeError::NoOutboundEdges {
                node: String::new(),
            },
            RoutingError::NilEdge => RuntimeError::NilEdge {
                node: String::new(),
            },
            RoutingError::Selector(msg) => RuntimeError::NodeFailed {
                node: String::new(),
                thread_id: String::new(),
                source: msg.into(),
            },
            RoutingError::NoRoutingPolicy => RuntimeError::NoRoutingPolicy {
                node: String::new(),
            },
            RoutingError::NextEdgeNil => RuntimeError::NextEdgeNil {
                node: String::new(),
            },
        }
    }
}

impl From<MailboxError> for RuntimeError {
    fn from(err: MailboxError) -> Self {
        match err {
            MailboxError::Overflow { node, waited } => RuntimeError::MailboxOverflow { node, waited },
            MailboxError::Closed { node } => RuntimeError::MailboxOverflow {
                node,
                waited: Duration::ZERO,
            },
        }
    }
}

impl From<PersistenceError> for RuntimeError {
    fn from(err: PersistenceError) -> Self {
        match err {
            PersistenceError::QueueFull { thread_id } => {
                RuntimeError::PersistenceQueueFull { thread_id }
            }
            PersistenceError::Timeout { thread_id } => {
                RuntimeError::PersistenceTimeout { thread_id }
            }
            PersistenceError::Callback { thread_id, source } => RuntimeError::NodeFailed {
                node: String::new(),
                thread_id,
                source,
            },
            PersistenceError::RestoreFailed { thread_id, source } => {
                RuntimeError::RestoreFailed { thread_id, source }
            }
        }
    }
}

impl RuntimeError {
    /// Rebuilds an equivalent `RuntimeError` for a second destination (e.g. a monitor entry)
    /// when the original has already been moved elsewhere. Variants carrying a boxed source
    /// error lose the source's concrete type, keeping only its message, since `BoxError` isn't
    /// `Clone`.
    #[must_use]
    pub fn duplicate(&self) -> Self {
        match self {
            RuntimeError::RuntimeExecuting => RuntimeError::RuntimeExecuting,
            RuntimeError::StartEdgeNil => RuntimeError::StartEdgeNil,
            RuntimeError::StartNodeNil => RuntimeError::StartNodeNil,
            RuntimeError::Invalid(report) => RuntimeError::Invalid(report.clone()),
            RuntimeError::RestoreNotSet => RuntimeError::RestoreNotSet,
            RuntimeError::RestoreFailed { thread_id, source } => RuntimeError::RestoreFailed {
                thread_id: thread_id.clone(),
                source: source.to_string().into(),
            },
            RuntimeError::RuntimeIdNotSet => RuntimeError::RuntimeIdNotSet,
            RuntimeError::UnknownThreadId(id) => RuntimeError::UnknownThreadId(id.clone()),
            RuntimeError::ThreadBusy { thread_id } => RuntimeError::ThreadBusy { thread_id: thread_id.clone() },
            RuntimeError::PersistenceQueueFull { thread_id } => {
                RuntimeError::PersistenceQueueFull { thread_id: thread_id.clone() }
            }
            RuntimeError::PersistenceTimeout { thread_id } => {
                RuntimeError::PersistenceTimeout { thread_id: thread_id.clone() }
            }
            RuntimeError::NoOutboundEdges { node } => RuntimeError::NoOutboundEdges { node: node.clone() },
            RuntimeError::NoRoutingPolicy { node } => RuntimeError::NoRoutingPolicy { node: node.clone() },
            RuntimeError::NilEdge { node } => RuntimeError::NilEdge { node: node.clone() },
            RuntimeError::NextEdgeNil { node } => RuntimeError::NextEdgeNil { node: node.clone() },
            RuntimeError::EvictionByInactivity { thread_id } => {
                RuntimeError::EvictionByInactivity { thread_id: thread_id.clone() }
            }
            RuntimeError::MailboxOverflow { node, waited } => {
                RuntimeError::MailboxOverflow { node: node.clone(), waited: *waited }
            }
            RuntimeError::NodeTimeout { node, thread_id } => {
                RuntimeError::NodeTimeout { node: node.clone(), thread_id: thread_id.clone() }
            }
            RuntimeError::NodeFailed { node, thread_id, source } => RuntimeError::NodeFailed {
                node: node.clone(),
                thread_id: thread_id.clone(),
                source: source.to_string().into(),
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, RuntimeError>;
