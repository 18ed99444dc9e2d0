//! A single counting node that reports partial progress and persists every change to an
//! in-memory map, demonstrating [`PersistFn`]/[`RestoreFn`] and thread resumption.
//!
//! Run with: `cargo run --example persisted_counter`.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use threadwheel::edge::Edge;
use threadwheel::error::BoxError;
use threadwheel::node::{Node, NodeFn, PartialNotifier};
use threadwheel::persistence::{PersistFn, RestoreFn};
use threadwheel::runtime::{InvokeConfig, RuntimeBuilder};
use threadwheel::telemetry::{PlainFormatter, TelemetryFormatter};
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(ErrorLayer::default())
        .init();
}

struct CountUp {
    steps: u32,
}

#[async_trait]
impl NodeFn<(), u32> for CountUp {
    async fn call(&self, _input: (), mut state: u32, notify: PartialNotifier<u32>) -> Result<u32, BoxError> {
        for _ in 0..self.steps {
            state += 1;
            notify.notify(state).await;
        }
        Ok(state)
    }
}

struct MapStore(Arc<Mutex<HashMap<String, u32>>>);

#[async_trait]
impl PersistFn<u32> for MapStore {
    async fn persist(&self, thread_id: &str, state: &u32) -> Result<(), BoxError> {
        self.0.lock().insert(thread_id.to_string(), *state);
        Ok(())
    }
}

#[async_trait]
impl RestoreFn<u32> for MapStore {
    async fn restore(&self, thread_id: &str) -> Result<Option<u32>, BoxError> {
        Ok(self.0.lock().get(thread_id).copied())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let store = Arc::new(Mutex::new(HashMap::new()));
    let count_up = Arc::new(Node::start("count_up", CountUp { steps: 3 }));

    let (monitor_tx, mut monitor_rx) = tokio::sync::mpsc::channel(64);
    let runtime = RuntimeBuilder::new(0u32)
        .with_persist_fn(MapStore(store.clone()))
        .with_restore_fn(MapStore(store.clone()))
        .add_edge(Edge::start(count_up.clone()))
        .add_edge(Edge::end(count_up))
        .build(monitor_tx)?;

    let printer = tokio::spawn(async move {
        while let Some(entry) = monitor_rx.recv().await {
            println!("{}", PlainFormatter.render(&entry));
        }
    });

    let thread_id = runtime
        .invoke((), InvokeConfig { thread_id: Some("session-1".into()) })
        .await?;
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    println!("final count: {}", runtime.current_state(&thread_id)?);
    println!("persisted snapshot: {:?}", store.lock().get("session-1"));

    drop(printer);
    Ok(())
}
