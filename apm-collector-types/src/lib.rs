//! # APM Collector Types
//!
//! This crate defines the types shared by every stage of the collector pipeline (records,
//! identifiers, time buckets, processing outcomes) and the traits of the storage
//! collaborators, but does not provide any implementation.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_debug_implementations)]

mod error;
mod id;
mod outcome;
mod record;
mod segment;
mod storage;
mod time_bucket;

pub use error::*;
pub use id::*;
pub use outcome::*;
pub use record::*;
pub use segment::*;
pub use storage::*;
pub use time_bucket::*;

pub mod export;
