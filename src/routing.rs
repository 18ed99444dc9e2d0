//! Edge selection (component C2).
//!
//! A [`RoutePolicy`] picks the next [`Edge`] out of a node given the user input, the node's
//! current state, and its outbound edges in insertion order. Tie-breaks are always positional:
//! the first matching edge wins, never an arbitrary one.

use std::sync::Arc;

use async_trait::async_trait;

use crate::edge::Edge;
use crate::error::RoutingError;

/// User-supplied selector backing [`RoutePolicy::Conditional`].
///
/// A selector that cannot choose an edge should return [`RoutingError::NilEdge`] rather than
/// panicking; any other `Err` is surfaced to the caller verbatim.
#[async_trait]
pub trait RouteSelector<I, T>: Send + Sync {
    async fn select(
        &self,
        input: I,
        state: T,
        edges: Vec<Edge<I, T>>,
    ) -> Result<Edge<I, T>, RoutingError>;
}

/// Adapts a plain async closure into a [`RouteSelector`].
pub struct FnSelector<F>(pub F);

#[async_trait]
impl<I, T, F, Fut> RouteSelector<I, T> for FnSelector<F>
where
    I: Send + Sync + 'static,
    T: Send + Sync + 'static,
    F: Fn(I, T, Vec<Edge<I, T>>) -> Fut + Send + Sync,
    Fut: std::future::Future<Output = Result<Edge<I, T>, RoutingError>> + Send + 'static,
{
    async fn select(
        &self,
        input: I,
        state: T,
        edges: Vec<Edge<I, T>>,
    ) -> Result<Edge<I, T>, RoutingError> {
        (self.0)(input, state, edges).await
    }
}

/// How a node with more than one outbound edge decides which one to take.
#[derive(Clone)]
pub enum RoutePolicy<I, T> {
    /// Always the first outbound edge, positionally.
    Any,
    /// The first outbound edge whose tag map has `key == value`.
    TagMatch { key: String, value: String },
    /// Delegates the decision to a user-supplied selector.
    Conditional(Arc<dyn RouteSelector<I, T>>),
}

impl<I, T> RoutePolicy<I, T>
where
    I: Send + Sync + 'static,
    T: Send + Sync + 'static,
{
    pub fn tag_match(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::TagMatch {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn conditional(selector: impl RouteSelector<I, T> + 'static) -> Self {
        Self::Conditional(Arc::new(selector))
    }

    /// Select the next edge. `edges` must already be the node's outbound edges in insertion
    /// order; tie-breaks within `Any`/`TagMatch` are positional over that order.
    pub async fn select_edge(
        &self,
        input: I,
        state: T,
        edges: Vec<Edge<I, T>>,
    ) -> Result<Edge<I, T>, RoutingError> {
        match self {
            RoutePolicy::Any => edges.into_iter().next().ok_or(RoutingError::NoOutboundEdges),
            RoutePolicy::TagMatch { key, value } => edges
                .into_iter()
                .find(|edge| edge.tags.get(key).is_some_and(|v| v == value))
                .ok_or_else(|| RoutingError::NoMatchingEdge {
                    key: key.clone(),
                    value: value.clone(),
                }),
            RoutePolicy::Conditional(selector) => selector.select(input, state, edges).await,
        }
    }
}
