//! A three-node linear pipeline with tagged branching, run to completion once.
//!
//! Run with: `cargo run --example basic_pipeline`.

use std::sync::Arc;

use async_trait::async_trait;
use threadwheel::edge::Edge;
use threadwheel::error::BoxError;
use threadwheel::node::{Node, NodeFn, PartialNotifier};
use threadwheel::routing::RoutePolicy;
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

#[derive(Debug, Clone, PartialEq)]
struct Order {
    total_cents: i64,
    discounted: bool,
}

struct ApplyDiscount;

#[async_trait]
impl NodeFn<(), Order> for ApplyDiscount {
    async fn call(&self, _input: (), mut state: Order, _notify: PartialNotifier<Order>) -> Result<Order, BoxError> {
        state.discounted = state.total_cents >= 10_000;
        Ok(state)
    }
}

struct ChargeFull;

#[async_trait]
impl NodeFn<(), Order> for ChargeFull {
    async fn call(&self, _input: (), state: Order, _notify: PartialNotifier<Order>) -> Result<Order, BoxError> {
        Ok(state)
    }
}

struct ChargeDiscounted;

#[async_trait]
impl NodeFn<(), Order> for ChargeDiscounted {
    async fn call(&self, _input: (), mut state: Order, _notify: PartialNotifier<Order>) -> Result<Order, BoxError> {
        state.total_cents = (state.total_cents * 9) / 10;
        Ok(state)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let apply_discount = Arc::new(
        Node::start("apply_discount", ApplyDiscount).with_route(RoutePolicy::tag_match("discounted", "true")),
    );
    let charge_full = Arc::new(Node::intermediate("charge_full", ChargeFull));
    let charge_discounted = Arc::new(Node::intermediate("charge_discounted", ChargeDiscounted));

    let (monitor_tx, mut monitor_rx) = tokio::sync::mpsc::channel(64);
    let runtime = RuntimeBuilder::new(Order { total_cents: 15_000, discounted: false })
        .add_edge(Edge::start(apply_discount.clone()))
        .add_edge(Edge::new(apply_discount.clone(), charge_discounted.clone()).with_tag("discounted", "true"))
        .add_edge(Edge::new(apply_discount, charge_full.clone()).with_tag("discounted", "false"))
        .add_edge(Edge::end(charge_full))
        .add_edge(Edge::end(charge_discounted))
        .build(monitor_tx)?;

    let printer = tokio::spawn(async move {
        while let Some(entry) = monitor_rx.recv().await {
            println!("{}", PlainFormatter.render(&entry));
        }
    });

    let thread_id = runtime.invoke((), InvokeConfig::default()).await?;
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    println!("final order: {:?}", runtime.current_state(&thread_id)?);

    drop(printer);
    Ok(())
}
