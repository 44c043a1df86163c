//! ### `apm-collector-stream`: worker graphs
//!
//! Records travel through a graph of worker stages. Each stage owns a bounded queue and a
//! single consumer task; stages are wired by synchronous hops (the downstream worker runs
//! inline) or asynchronous hops (the record is enqueued downstream).
//!
//! Backpressure is explicit: a full queue either blocks the producer for a bounded time or
//! drops the record right away (see [`Overflow`]), and in both cases the producer gets a
//! `Retryable` outcome. Nothing blocks indefinitely.
//!
//! Graphs are registered in a [`GraphManager`] under a [`GraphId`](apm_collector_types::GraphId)
//! and the [`RecordType`](apm_collector_types::RecordType) they carry.

mod batch;
mod error;
mod graph;
mod manager;
mod options;
mod worker;

pub use batch::*;
pub use error::*;
pub use graph::*;
pub use manager::*;
pub use options::*;
pub use worker::*;
