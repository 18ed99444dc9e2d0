//! A long-running node invoked in a loop until Ctrl-C arrives, then drained through
//! [`Runtime::shutdown`].
//!
//! Run with: `cargo run --example graceful_shutdown`, then press Ctrl-C.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use threadwheel::edge::Edge;
use threadwheel::error::BoxError;
use threadwheel::node::{Node, NodeFn, PartialNotifier};
use threadwheel::runtime::{InvokeConfig, RuntimeBuilder};
use tokio::signal;
use tracing::info;
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

struct SlowStep;

#[async_trait]
impl NodeFn<(), u32> for SlowStep {
    async fn call(&self, _input: (), state: u32, _notify: PartialNotifier<u32>) -> Result<u32, BoxError> {
        tokio::time::sleep(Duration::from_millis(50)).await;
        Ok(state + 1)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let slow_step = Arc::new(Node::start("slow_step", SlowStep));
    let (monitor_tx, mut monitor_rx) = tokio::sync::mpsc::channel(64);
    let runtime = RuntimeBuilder::new(0u32)
        .add_edge(Edge::start(slow_step.clone()))
        .add_edge(Edge::end(slow_step))
        .build(monitor_tx)?;

    tokio::spawn(async move { while monitor_rx.recv().await.is_some() {} });

    let config = InvokeConfig {
        thread_id: Some("ticker".to_string()),
    };

    // Paced slower than `SlowStep`'s own latency so each tick's thread is released again
    // before the next one is dispatched.
    loop {
        tokio::select! {
            _ = tokio::time::sleep(Duration::from_millis(75)) => {
                match runtime.invoke((), config.clone()).await {
                    Ok(thread_id) => info!(%thread_id, state = ?runtime.current_state(&thread_id), "tick"),
                    Err(err) => {
                        info!(%err, "invocation rejected, stopping");
                        break;
                    }
                }
            }
            _ = signal::ctrl_c() => {
                info!("ctrl-c received, shutting down");
                break;
            }
        }
    }

    runtime.shutdown().await;
    Ok(())
}
