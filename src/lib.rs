//! # threadwheel: a typed, graph-structured workflow runtime
//!
//! threadwheel runs a directed graph of async nodes against per-thread state, routing between
//! nodes along typed edges and multiplexing every node's mailbox over a fixed-size worker pool.
//! Callers drive it by invoking the graph with an input and a thread id, and observe progress
//! (including partial updates and terminal outcomes) over a plain channel.
//!
//! ## Core Concepts
//!
//! - **Nodes** ([`node`]): async units of work, each owning a role, a routing policy, a reducer,
//!   and execution knobs like mailbox capacity and timeout.
//! - **Edges** ([`edge`]): directed connections between nodes (or the synthetic `Start`/`End`
//!   markers), optionally tagged for [`routing::RoutePolicy::TagMatch`].
//! - **Threads** ([`thread_registry`]): a runtime's unit of session state, evicted after sitting
//!   idle past its TTL.
//! - **Runtime** ([`runtime`]): the orchestrator — worker pool, dispatcher, persistence worker,
//!   and evictor — built from a [`runtime::RuntimeBuilder`].
//!
//! ## Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use threadwheel::edge::Edge;
//! use threadwheel::error::BoxError;
//! use threadwheel::node::{Node, NodeFn, PartialNotifier};
//! use threadwheel::runtime::{InvokeConfig, RuntimeBuilder};
//!
//! struct Increment;
//!
//! #[async_trait]
//! impl NodeFn<(), i32> for Increment {
//!     async fn call(&self, _input: (), state: i32, _notify: PartialNotifier<i32>) -> Result<i32, BoxError> {
//!         Ok(state + 1)
//!     }
//! }
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let increment = Arc::new(Node::start("increment", Increment));
//! let (monitor_tx, mut monitor_rx) = tokio::sync::mpsc::channel(16);
//! let runtime = RuntimeBuilder::new(0i32)
//!     .add_edge(Edge::start(increment.clone()))
//!     .add_edge(Edge::end(increment))
//!     .build(monitor_tx)?;
//!
//! let thread_id = runtime.invoke((), InvokeConfig::default()).await?;
//! let terminal = loop {
//!     let entry = monitor_rx.recv().await.unwrap();
//!     if !entry.running {
//!         break entry;
//!     }
//! };
//! assert_eq!(terminal.new_state, 1);
//! assert_eq!(runtime.current_state(&thread_id)?, 1);
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Guide
//!
//! - [`edge`] — typed graph edges and the `Start`/`End` markers
//! - [`node`] — node definitions, roles, and the async node-function trait
//! - [`routing`] — edge-selection policies
//! - [`reducer`] — state-merge strategies
//! - [`monitor`] — the caller-visible observation channel
//! - [`mailbox`] — per-node mailboxes and the shared worker pool
//! - [`persistence`] — checkpoint callbacks and the persistence worker
//! - [`thread_registry`] — per-thread state and TTL-based eviction
//! - [`runtime`] — the orchestrator tying every component together
//! - [`telemetry`] — plain-text rendering of monitor entries
//! - [`settings`] — zero-means-default runtime configuration
//! - [`error`] — the crate-wide error taxonomy

pub mod edge;
pub mod error;
pub mod mailbox;
pub mod monitor;
pub mod node;
pub mod persistence;
pub mod reducer;
pub mod routing;
pub mod runtime;
pub mod settings;
pub mod telemetry;
pub mod thread_registry;
