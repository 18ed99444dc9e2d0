//! Graph edges (component C1).
//!
//! An [`Edge`] is a directed pair of [`EdgeEndpoint`]s plus an optional tag map used by
//! [`crate::routing::RoutePolicy::TagMatch`]. The synthetic `Start`/`End` endpoints mark the
//! graph's entry and exits without requiring a real [`crate::node::Node`].

use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::node::Node;

/// One end of an [`Edge`]: either a synthetic marker or a reference to a real node.
#[derive(Clone)]
pub enum EdgeEndpoint<I, T> {
    /// The synthetic source of the graph's single start edge.
    Start,
    /// The synthetic sink of every end edge.
    End,
    /// A real, user-defined node, shared by reference with the runtime.
    Node(Arc<Node<I, T>>),
}

impl<I, T> EdgeEndpoint<I, T> {
    /// Stable display name: `"Start"`, `"End"`, or the node's own name.
    pub fn name(&self) -> &str {
        match self {
            EdgeEndpoint::Start => "Start",
            EdgeEndpoint::End => "End",
            EdgeEndpoint::Node(node) => node.name(),
        }
    }

    pub fn is_start(&self) -> bool {
        matches!(self, EdgeEndpoint::Start)
    }

    pub fn is_end(&self) -> bool {
        matches!(self, EdgeEndpoint::End)
    }

    pub fn node(&self) -> Option<&Arc<Node<I, T>>> {
        match self {
            EdgeEndpoint::Node(node) => Some(node),
            _ => None,
        }
    }
}

impl<I, T> fmt::Debug for EdgeEndpoint<I, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EdgeEndpoint").field(&self.name()).finish()
    }
}

impl<I, T> From<Arc<Node<I, T>>> for EdgeEndpoint<I, T> {
    fn from(node: Arc<Node<I, T>>) -> Self {
        EdgeEndpoint::Node(node)
    }
}

/// A directed connection between two [`EdgeEndpoint`]s.
///
/// Three kinds exist, distinguished structurally rather than by a tag: a **start edge** has
/// `from == Start`; an **end edge** has `to == End`; everything else is a **regular edge**.
#[derive(Clone)]
pub struct Edge<I, T> {
    pub from: EdgeEndpoint<I, T>,
    pub to: EdgeEndpoint<I, T>,
    pub tags: FxHashMap<String, String>,
}

impl<I, T> Edge<I, T> {
    pub fn new(from: impl Into<EdgeEndpoint<I, T>>, to: impl Into<EdgeEndpoint<I, T>>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            tags: FxHashMap::default(),
        }
    }

    /// Build the graph's single start edge: `Start -> to`.
    pub fn start(to: impl Into<EdgeEndpoint<I, T>>) -> Self {
        Self::new(EdgeEndpoint::Start, to)
    }

    /// Build an end edge: `from -> End`.
    pub fn end(from: impl Into<EdgeEndpoint<I, T>>) -> Self {
        Self::new(from, EdgeEndpoint::End)
    }

    #[must_use]
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn is_start_edge(&self) -> bool {
        self.from.is_start()
    }

    pub fn is_end_edge(&self) -> bool {
        self.to.is_end()
    }
}

impl<I, T> fmt::Debug for Edge<I, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Edge")
            .field("from", &self.from.name())
            .field("to", &self.to.name())
            .field("tags", &self.tags)
            .finish()
    }
}
