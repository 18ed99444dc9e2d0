//! Graph validation: [`RuntimeBuilder::build`] must report every structural defect in one pass.

use std::sync::Arc;

use async_trait::async_trait;
use threadwheel::edge::Edge;
use threadwheel::error::{BoxError, RuntimeError, ValidationDefect};
use threadwheel::node::{Node, NodeFn, PartialNotifier};
use threadwheel::runtime::RuntimeBuilder;

struct NoOp;

#[async_trait]
impl NodeFn<(), i32> for NoOp {
    async fn call(&self, _input: (), state: i32, _notify: PartialNotifier<i32>) -> Result<i32, BoxError> {
        Ok(state)
    }
}

#[tokio::test]
async fn missing_start_edge_is_reported() {
    let node = Arc::new(Node::start("n", NoOp));
    let (tx, _rx) = tokio::sync::mpsc::channel(4);
    let err = RuntimeBuilder::new(0i32).add_edge(Edge::end(node)).build(tx).unwrap_err();
    match err {
        RuntimeError::Invalid(report) => {
            assert!(report.defects.contains(&ValidationDefect::MissingStartEdge));
        }
        other => panic!("expected Invalid, got {other:?}"),
    }
}

#[tokio::test]
async fn duplicate_start_edges_are_reported() {
    let a = Arc::new(Node::start("a", NoOp));
    let b = Arc::new(Node::start("b", NoOp));
    let (tx, _rx) = tokio::sync::mpsc::channel(4);
    let err = RuntimeBuilder::new(0i32)
        .add_edge(Edge::start(a.clone()))
        .add_edge(Edge::start(b.clone()))
        .add_edge(Edge::end(a))
        .add_edge(Edge::end(b))
        .build(tx)
        .unwrap_err();
    match err {
        RuntimeError::Invalid(report) => {
            assert!(report.defects.contains(&ValidationDefect::DuplicateStartEdge));
        }
        other => panic!("expected Invalid, got {other:?}"),
    }
}

#[tokio::test]
async fn dead_end_node_with_no_outbound_edges_is_reported() {
    let start = Arc::new(Node::start("start", NoOp));
    let dead_end = Arc::new(Node::intermediate("dead_end", NoOp));
    let (tx, _rx) = tokio::sync::mpsc::channel(4);
    let err = RuntimeBuilder::new(0i32)
        .add_edge(Edge::start(start.clone()))
        .add_edge(Edge::new(start, dead_end))
        .build(tx)
        .unwrap_err();
    match err {
        RuntimeError::Invalid(report) => {
            assert!(report
                .defects
                .iter()
                .any(|d| matches!(d, ValidationDefect::DeadEndNode(name) if name == "dead_end")));
        }
        other => panic!("expected Invalid, got {other:?}"),
    }
}

#[tokio::test]
async fn unreachable_end_edge_is_reported_as_no_path_to_end() {
    let start = Arc::new(Node::start("start", NoOp));
    let orphan = Arc::new(Node::end("orphan", NoOp));
    let (tx, _rx) = tokio::sync::mpsc::channel(4);
    // `start` has an outbound edge back to itself, so it's not a dead end, but no edge ever
    // reaches `orphan`'s end edge.
    let err = RuntimeBuilder::new(0i32)
        .add_edge(Edge::start(start.clone()))
        .add_edge(Edge::new(start.clone(), start))
        .add_edge(Edge::end(orphan))
        .build(tx)
        .unwrap_err();
    match err {
        RuntimeError::Invalid(report) => {
            assert!(report.defects.contains(&ValidationDefect::NoPathToEnd));
        }
        other => panic!("expected Invalid, got {other:?}"),
    }
}

#[tokio::test]
async fn valid_linear_graph_builds_successfully() {
    let node = Arc::new(Node::start("n", NoOp));
    let (tx, _rx) = tokio::sync::mpsc::channel(4);
    let result = RuntimeBuilder::new(0i32)
        .add_edge(Edge::start(node.clone()))
        .add_edge(Edge::end(node))
        .build(tx);
    assert!(result.is_ok());
}
