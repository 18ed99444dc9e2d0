//! Throughput of the mailbox/worker-pool pipeline under a simple pass-through graph.

use std::sync::Arc;

use async_trait::async_trait;
use criterion::{criterion_group, criterion_main, Criterion};
use threadwheel::edge::Edge;
use threadwheel::error::BoxError;
use threadwheel::node::{Node, NodeFn, PartialNotifier};
use threadwheel::runtime::{InvokeConfig, RuntimeBuilder};
use tokio::runtime::Runtime as TokioRuntime;

struct Increment;

#[async_trait]
impl NodeFn<(), u64> for Increment {
    async fn call(&self, _input: (), state: u64, _notify: PartialNotifier<u64>) -> Result<u64, BoxError> {
        Ok(state + 1)
    }
}

fn bench_invoke_throughput(c: &mut Criterion) {
    let tokio_rt = TokioRuntime::new().unwrap();

    c.bench_function("invoke_single_node_graph", |b| {
        b.to_async(&tokio_rt).iter(|| async {
            let node = Arc::new(Node::start("increment", Increment));
            let (tx, _rx) = tokio::sync::mpsc::channel(256);
            let runtime = RuntimeBuilder::new(0u64)
                .add_edge(Edge::start(node.clone()))
                .add_edge(Edge::end(node))
                .build(tx)
                .unwrap();
            runtime.invoke((), InvokeConfig::default()).await.unwrap();
        });
    });
}

criterion_group!(benches, bench_invoke_throughput);
criterion_main!(benches);
