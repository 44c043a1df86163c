//! # APM Collector
//!
//! The ingestion side of an APM collector: trace segments sent by agents are exchanged for
//! compact surrogate ids and persisted through a graph of worker stages. Segments that
//! cannot be processed yet are kept in a durable, file-based buffer and replayed from there,
//! so nothing acknowledged to an agent is lost to a restart.
//!
//! ## Architecture
//!
//! `apm-collector` is the facade crate re-exporting implementation from a number of sub-crates:
//!
//! + `apm-collector-types`: records, identifiers, outcomes and the storage traits
//! + `apm-collector-runtime`: tasks, timers and files over `tokio` or `async-std`
//! + `apm-collector-buffer`: rotating data files with persisted read / write cursors
//! + `apm-collector-stream`: worker graphs with bounded queues
//! + `apm-collector-cache`: the identifier cache in front of the registry
//! + `apm-collector-core`: module providers started in dependency order
//! + `apm-collector-agent`: the segment pipeline and the `Collector` itself
//!
//! ## Quick start
//!
//! ```ignore
//! let collector = Collector::start(options, registry, segment_dao).await?;
//! match collector.ingest(&bytes).await {
//!     Outcome::Success => (), // stored, or buffered
//!     Outcome::Retryable(reason) => (), // ask the agent to send it again
//!     Outcome::Fatal(reason) => (), // malformed, drop it
//! }
//! collector.shutdown().await?;
//! ```

pub use apm_collector_types::*;

#[cfg(feature = "apm-collector-runtime")]
pub use apm_collector_runtime as runtime;

#[cfg(feature = "apm-collector-buffer")]
pub use apm_collector_buffer as buffer;

#[cfg(feature = "apm-collector-stream")]
pub use apm_collector_stream as stream;

#[cfg(feature = "apm-collector-cache")]
pub use apm_collector_cache as cache;

#[cfg(feature = "apm-collector-core")]
pub use apm_collector_core as bootstrap;

#[cfg(feature = "apm-collector-agent")]
pub use apm_collector_agent::*;
