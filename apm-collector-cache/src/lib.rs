//! ### `apm-collector-cache`: identifier cache
//!
//! Textual identifiers (application codes, operation names, peer addresses) are replaced by
//! compact surrogate ids before records are stored. [`IdService`] resolves them through a
//! bounded LRU [`IdCache`] in front of the [`IdRegistry`](apm_collector_types::IdRegistry).
//!
//! The hot path only ever looks mappings up; creating them is left to an asynchronous
//! registration path, see `get_or_create`.

mod cache;
mod error;
mod registry;
mod service;

pub use cache::*;
pub use error::*;
pub use registry::*;
pub use service::*;
