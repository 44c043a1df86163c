//! ### `apm-collector-agent`: the segment pipeline
//!
//! Segments sent by agents are decoded by the [`SegmentParser`], their textual identifiers
//! exchanged for surrogate ids ([`SpanIdExchanger`], [`ReferenceIdExchanger`]), then handed
//! to the segment graph which persists them in batches.
//!
//! A segment referring to an identifier that is not registered yet cannot be stored now. The
//! identifier is submitted to the register graph, and the segment is appended to the buffer,
//! from where the buffer reader replays it until the exchange succeeds.
//!
//! [`Collector`] assembles the modules (storage, cache, stream, buffer and agent stream)
//! and starts them in dependency order.

mod collector;
pub mod define;
mod error;
mod exchange;
mod parser;
mod provider;
mod register;
mod segment;
mod storage;

pub use collector::*;
pub use error::*;
pub use exchange::*;
pub use parser::*;
pub use provider::*;
pub use register::*;
pub use segment::*;
pub use storage::*;
