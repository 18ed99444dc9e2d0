//! Graph nodes (component C1/C3).
//!
//! A [`Node`] bundles a name, a [`Role`] in the graph, the async function it runs, and the
//! execution knobs (routing policy, reducer, mailbox capacity, timeout) that govern how the
//! worker pool invokes it. Nodes are always shared by reference (`Arc<Node<I, T>>`) once attached
//! to an edge, since the same node instance can appear as the source of several edges.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::future::BoxFuture;

use crate::error::BoxError;
use crate::reducer::{Reducer, ReplaceReducer};
use crate::routing::RoutePolicy;
use crate::settings::DEFAULT_NODE_TIMEOUT;

/// A node's position in the graph. Purely descriptive — routing is driven by edges, not by role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Directly downstream of the synthetic start edge.
    Start,
    /// Any node with at least one non-start, non-end edge on either side.
    Intermediate,
    /// Has at least one end edge among its outbound edges.
    End,
}

/// Callback a node function uses to publish a partial state update mid-execution, before its
/// final return value is ready. See [`crate::monitor::StateMonitorEntry::partial`].
#[derive(Clone)]
pub struct PartialNotifier<T> {
    inner: Arc<dyn Fn(T) -> BoxFuture<'static, ()> + Send + Sync>,
}

impl<T> PartialNotifier<T> {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(T) -> BoxFuture<'static, ()> + Send + Sync + 'static,
    {
        Self { inner: Arc::new(f) }
    }

    pub async fn notify(&self, change: T) {
        (self.inner)(change).await;
    }
}

/// The async function a node runs on each invocation.
#[async_trait]
pub trait NodeFn<I, T>: Send + Sync {
    async fn call(&self, input: I, state: T, notify: PartialNotifier<T>) -> Result<T, BoxError>;
}

/// Adapts a plain async closure into a [`NodeFn`].
pub struct FnNode<F>(pub F);

#[async_trait]
impl<I, T, F, Fut> NodeFn<I, T> for FnNode<F>
where
    I: Send + 'static,
    T: Send + 'static,
    F: Fn(I, T, PartialNotifier<T>) -> Fut + Send + Sync,
    Fut: std::future::Future<Output = Result<T, BoxError>> + Send + 'static,
{
    async fn call(&self, input: I, state: T, notify: PartialNotifier<T>) -> Result<T, BoxError> {
        (self.0)(input, state, notify).await
    }
}

/// A graph node: name, role, function, and per-node execution policy.
pub struct Node<I, T> {
    name: String,
    role: Role,
    func: Option<Arc<dyn NodeFn<I, T>>>,
    route: Option<RoutePolicy<I, T>>,
    reducer: Option<Arc<dyn Reducer<T>>>,
    mailbox_capacity: usize,
    timeout: Duration,
}

/// Mailbox capacity used when a node doesn't set its own via [`Node::with_mailbox_capacity`].
pub const DEFAULT_MAILBOX_CAPACITY: usize = 100;

impl<I, T> Node<I, T>
where
    I: Send + Sync + 'static,
    T: Send + Sync + 'static,
{
    fn new(name: impl Into<String>, role: Role, func: impl NodeFn<I, T> + 'static) -> Self {
        Self {
            name: name.into(),
            role,
            func: Some(Arc::new(func)),
            route: None,
            reducer: None,
            mailbox_capacity: DEFAULT_MAILBOX_CAPACITY,
            timeout: DEFAULT_NODE_TIMEOUT,
        }
    }

    pub fn start(name: impl Into<String>, func: impl NodeFn<I, T> + 'static) -> Self {
        Self::new(name, Role::Start, func)
    }

    pub fn intermediate(name: impl Into<String>, func: impl NodeFn<I, T> + 'static) -> Self {
        Self::new(name, Role::Intermediate, func)
    }

    pub fn end(name: impl Into<String>, func: impl NodeFn<I, T> + 'static) -> Self {
        Self::new(name, Role::End, func)
    }

    #[must_use]
    pub fn with_route(mut self, route: RoutePolicy<I, T>) -> Self {
        self.route = Some(route);
        self
    }

    #[must_use]
    pub fn with_reducer(mut self, reducer: impl Reducer<T> + 'static) -> Self {
        self.reducer = Some(Arc::new(reducer));
        self
    }

    #[must_use]
    pub fn with_mailbox_capacity(mut self, capacity: usize) -> Self {
        self.mailbox_capacity = capacity;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn route(&self) -> Option<&RoutePolicy<I, T>> {
        self.route.as_ref()
    }

    pub fn mailbox_capacity(&self) -> usize {
        self.mailbox_capacity
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn func(&self) -> Arc<dyn NodeFn<I, T>> {
        self.func.clone().expect("node function set at construction")
    }

    /// The node's reducer, or the crate-wide default (replace) if none was set.
    pub fn reducer_or_default(&self) -> Arc<dyn Reducer<T>> {
        self.reducer
            .clone()
            .unwrap_or_else(|| Arc::new(ReplaceReducer) as Arc<dyn Reducer<T>>)
    }
}

impl<I, T> fmt::Debug for Node<I, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("name", &self.name)
            .field("role", &self.role)
            .field("mailbox_capacity", &self.mailbox_capacity)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
