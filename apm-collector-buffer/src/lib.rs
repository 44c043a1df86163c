//! ### `apm-collector-buffer`: the segment buffer
//!
//! A crash-recoverable on-disk queue that absorbs bursts of segments the pipeline cannot
//! process right away.
//!
//! + [`BufferWriter`] appends length-prefixed records to a rotating sequence of data files
//! + [`BufferReader`] drains them, oldest first, into a [`RecordDispatcher`] on a periodic tick
//! + [`OffsetTracker`] persists where the writer appends and where the reader resumes
//!
//! Data files are named `<prefix>_<timeBucket>.<suffix>`, e.g. `data_20171122102345.sw`.
//! See [`format`] for the framing of records.
//!
//! Delivery is at-least-once: a record is dispatched again if the collector crashes between
//! dispatching it and persisting the read cursor.

mod error;
mod file;
pub mod format;
mod offset;
mod reader;
mod writer;

pub use error::*;
pub use file::*;
pub use offset::*;
pub use reader::*;
pub use writer::*;
