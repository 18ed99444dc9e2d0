//! End-to-end tests driving a real [`Runtime`] through `tokio::sync::mpsc` monitor channels.

use std::sync::Arc;

use async_trait::async_trait;
use threadwheel::edge::Edge;
use threadwheel::error::{BoxError, RuntimeError};
use threadwheel::monitor::StateMonitorEntry;
use threadwheel::node::{Node, NodeFn, PartialNotifier};
use threadwheel::routing::RoutePolicy;
use threadwheel::runtime::{InvokeConfig, RuntimeBuilder};

struct Increment;

#[async_trait]
impl NodeFn<(), i32> for Increment {
    async fn call(&self, _input: (), state: i32, _notify: PartialNotifier<i32>) -> Result<i32, BoxError> {
        Ok(state + 1)
    }
}

struct Fails;

#[async_trait]
impl NodeFn<(), i32> for Fails {
    async fn call(&self, _input: (), _state: i32, _notify: PartialNotifier<i32>) -> Result<i32, BoxError> {
        Err("boom".into())
    }
}

struct SlowIncrement;

#[async_trait]
impl NodeFn<(), i32> for SlowIncrement {
    async fn call(&self, _input: (), state: i32, _notify: PartialNotifier<i32>) -> Result<i32, BoxError> {
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        Ok(state + 1)
    }
}

struct EmitsPartial;

#[async_trait]
impl NodeFn<(), i32> for EmitsPartial {
    async fn call(&self, _input: (), state: i32, notify: PartialNotifier<i32>) -> Result<i32, BoxError> {
        notify.notify(state + 1).await;
        Ok(state + 10)
    }
}

/// Drains `rx` until it sees a terminal entry (`running == false`) and returns it.
async fn recv_terminal(rx: &mut tokio::sync::mpsc::Receiver<StateMonitorEntry<i32>>) -> StateMonitorEntry<i32> {
    loop {
        let entry = rx.recv().await.expect("monitor channel closed before terminal entry");
        if !entry.running {
            return entry;
        }
    }
}

/// Scenario 1: a single pass-through node emits a running entry, then a completed entry.
#[tokio::test]
async fn linear_pass_through_emits_running_then_completed() {
    let increment = Arc::new(Node::start("increment", Increment));
    let (monitor_tx, mut monitor_rx) = tokio::sync::mpsc::channel(16);
    let runtime = RuntimeBuilder::new(0i32)
        .add_edge(Edge::start(increment.clone()))
        .add_edge(Edge::end(increment))
        .build(monitor_tx)
        .unwrap();

    let thread_id = runtime.invoke((), InvokeConfig::default()).await.unwrap();

    let first = monitor_rx.recv().await.unwrap();
    assert!(first.running && !first.partial);
    let second = monitor_rx.recv().await.unwrap();
    assert!(!second.running && second.error.is_none());
    assert_eq!(second.new_state, 1);
    assert_eq!(runtime.current_state(&thread_id).unwrap(), 1);
}

#[tokio::test]
async fn node_failure_emits_single_fatal_entry_and_propagates_error() {
    let fails = Arc::new(Node::start("fails", Fails));
    let (monitor_tx, mut monitor_rx) = tokio::sync::mpsc::channel(16);
    let runtime = RuntimeBuilder::new(0i32)
        .add_edge(Edge::start(fails.clone()))
        .add_edge(Edge::end(fails))
        .build(monitor_tx)
        .unwrap();

    runtime.invoke((), InvokeConfig::default()).await.unwrap();

    let running = monitor_rx.recv().await.unwrap();
    assert!(running.running);
    let fatal = monitor_rx.recv().await.unwrap();
    assert!(!fatal.running && !fatal.partial);
    assert!(fatal.error.is_some());
    assert!(matches!(fatal.error.unwrap(), RuntimeError::NodeFailed { .. }));
}

#[tokio::test]
async fn partial_update_precedes_terminal_outcome() {
    let node = Arc::new(Node::start("partial", EmitsPartial));
    let (monitor_tx, mut monitor_rx) = tokio::sync::mpsc::channel(16);
    let runtime = RuntimeBuilder::new(0i32)
        .add_edge(Edge::start(node.clone()))
        .add_edge(Edge::end(node))
        .build(monitor_tx)
        .unwrap();

    let thread_id = runtime.invoke((), InvokeConfig::default()).await.unwrap();

    let running = monitor_rx.recv().await.unwrap();
    assert!(running.running && !running.partial);
    let partial = monitor_rx.recv().await.unwrap();
    assert!(partial.partial);
    assert_eq!(partial.new_state, 1);
    let running_after_call = monitor_rx.recv().await.unwrap();
    assert!(running_after_call.running && !running_after_call.partial);
    let completed = monitor_rx.recv().await.unwrap();
    assert!(!completed.running);
    assert_eq!(completed.new_state, 10);
    assert_eq!(runtime.current_state(&thread_id).unwrap(), 10);
}

#[tokio::test]
async fn tag_match_routes_to_the_matching_edge() {
    let first = Arc::new(
        Node::intermediate("first", Increment).with_route(RoutePolicy::tag_match("branch", "double")),
    );
    let double = Arc::new(Node::start("double", Increment));
    let skip = Arc::new(Node::start("skip", Increment));

    let (monitor_tx, mut monitor_rx) = tokio::sync::mpsc::channel(16);
    let runtime = RuntimeBuilder::new(0i32)
        .add_edge(Edge::start(first.clone()))
        .add_edge(Edge::new(first.clone(), double.clone()).with_tag("branch", "double"))
        .add_edge(Edge::new(first, skip.clone()).with_tag("branch", "skip"))
        .add_edge(Edge::end(double))
        .add_edge(Edge::end(skip))
        .build(monitor_tx)
        .unwrap();

    let thread_id = runtime.invoke((), InvokeConfig::default()).await.unwrap();

    // first (+1) -> double (+1) = 2, never visits skip.
    let terminal = recv_terminal(&mut monitor_rx).await;
    assert_eq!(terminal.node, "double");
    assert_eq!(terminal.new_state, 2);
    assert_eq!(runtime.current_state(&thread_id).unwrap(), 2);
}

#[tokio::test]
async fn concurrent_invoke_on_same_thread_id_is_rejected() {
    let node = Arc::new(Node::start("slow", SlowIncrement));
    let (monitor_tx, mut monitor_rx) = tokio::sync::mpsc::channel(16);
    let runtime = Arc::new(
        RuntimeBuilder::new(0i32)
            .add_edge(Edge::start(node.clone()))
            .add_edge(Edge::end(node))
            .build(monitor_tx)
            .unwrap(),
    );

    let first = {
        let runtime = runtime.clone();
        tokio::spawn(async move {
            runtime
                .invoke((), InvokeConfig { thread_id: Some("shared".into()) })
                .await
        })
    };
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    let second = runtime
        .invoke((), InvokeConfig { thread_id: Some("shared".into()) })
        .await;

    assert!(matches!(second, Err(RuntimeError::ThreadBusy { .. })));
    assert_eq!(first.await.unwrap().unwrap(), "shared");

    let terminal = recv_terminal(&mut monitor_rx).await;
    assert_eq!(terminal.new_state, 1);

    // Now that the first invoke released the thread, a fresh invoke on the same id succeeds.
    let third = runtime
        .invoke((), InvokeConfig { thread_id: Some("shared".into()) })
        .await;
    assert_eq!(third.unwrap(), "shared");
    let terminal = recv_terminal(&mut monitor_rx).await;
    assert_eq!(terminal.new_state, 2);
}

#[tokio::test]
async fn distinct_thread_ids_carry_independent_state() {
    let node = Arc::new(Node::start("increment", Increment));
    let (monitor_tx, mut monitor_rx) = tokio::sync::mpsc::channel(16);
    let runtime = RuntimeBuilder::new(0i32)
        .add_edge(Edge::start(node.clone()))
        .add_edge(Edge::end(node))
        .build(monitor_tx)
        .unwrap();

    runtime
        .invoke((), InvokeConfig { thread_id: Some("a".into()) })
        .await
        .unwrap();
    recv_terminal(&mut monitor_rx).await;
    runtime
        .invoke((), InvokeConfig { thread_id: Some("b".into()) })
        .await
        .unwrap();
    recv_terminal(&mut monitor_rx).await;

    assert_eq!(runtime.current_state("a").unwrap(), 1);
    assert_eq!(runtime.current_state("b").unwrap(), 1);
    assert!(matches!(
        runtime.current_state("unknown"),
        Err(RuntimeError::UnknownThreadId(_))
    ));
}

/// A single outbound edge tagged for a policy that doesn't match it must still fail routing
/// rather than being silently auto-selected.
#[tokio::test]
async fn sole_outbound_edge_still_honors_a_non_matching_tag_policy() {
    let branch = Arc::new(
        Node::intermediate("branch", Increment).with_route(RoutePolicy::tag_match("x", "z")),
    );
    let sink = Arc::new(Node::start("sink", Increment));

    let (monitor_tx, mut monitor_rx) = tokio::sync::mpsc::channel(16);
    let runtime = RuntimeBuilder::new(0i32)
        .add_edge(Edge::start(branch.clone()))
        .add_edge(Edge::new(branch, sink.clone()).with_tag("x", "y"))
        .add_edge(Edge::end(sink))
        .build(monitor_tx)
        .unwrap();

    runtime.invoke((), InvokeConfig::default()).await.unwrap();

    let running = monitor_rx.recv().await.unwrap();
    assert!(running.running);
    let fatal = monitor_rx.recv().await.unwrap();
    assert!(!fatal.running);
    assert!(matches!(fatal.error, Some(RuntimeError::NoOutboundEdges { .. })));
}

/// `shutdown` is idempotent and callable through a shared `Arc<Runtime>` alongside `invoke`.
#[tokio::test]
async fn shutdown_is_idempotent_and_callable_via_shared_handle() {
    let node = Arc::new(Node::start("increment", Increment));
    let (monitor_tx, _rx) = tokio::sync::mpsc::channel(16);
    let runtime = Arc::new(
        RuntimeBuilder::new(0i32)
            .add_edge(Edge::start(node.clone()))
            .add_edge(Edge::end(node))
            .build(monitor_tx)
            .unwrap(),
    );

    runtime.invoke((), InvokeConfig::default()).await.unwrap();
    runtime.shutdown().await;
    runtime.shutdown().await;

    assert!(matches!(
        runtime.invoke((), InvokeConfig::default()).await,
        Err(RuntimeError::RuntimeExecuting)
    ));
}

/// An explicit empty thread id is rejected rather than silently treated as a valid key.
#[tokio::test]
async fn empty_thread_id_is_rejected() {
    let node = Arc::new(Node::start("increment", Increment));
    let (monitor_tx, _rx) = tokio::sync::mpsc::channel(16);
    let runtime = RuntimeBuilder::new(0i32)
        .add_edge(Edge::start(node.clone()))
        .add_edge(Edge::end(node))
        .build(monitor_tx)
        .unwrap();

    let err = runtime
        .invoke((), InvokeConfig { thread_id: Some(String::new()) })
        .await
        .unwrap_err();
    assert!(matches!(err, RuntimeError::RuntimeIdNotSet));
}

/// Calling `restore` without a registered restore callback surfaces `RestoreNotSet`.
#[tokio::test]
async fn restore_without_a_registered_callback_fails() {
    let node = Arc::new(Node::start("increment", Increment));
    let (monitor_tx, _rx) = tokio::sync::mpsc::channel(16);
    let runtime = RuntimeBuilder::new(0i32)
        .add_edge(Edge::start(node.clone()))
        .add_edge(Edge::end(node))
        .build(monitor_tx)
        .unwrap();

    let err = runtime.restore("unknown").await.unwrap_err();
    assert!(matches!(err, RuntimeError::RestoreNotSet));
}
