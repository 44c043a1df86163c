//! ### `apm-collector-runtime`: Async runtime abstraction
//!
//! This crate aligns the handful of runtime facilities the collector needs (tasks, timers,
//! locks and the filesystem) between `tokio` and `async-std`, so that the buffer and the
//! worker graph can be built generic to both runtimes.

#[cfg(all(feature = "runtime-async-std", feature = "runtime-tokio"))]
compile_error!("'runtime-async-std' and 'runtime-tokio' cannot be enabled at the same time");

#[cfg(not(any(feature = "runtime-async-std", feature = "runtime-tokio")))]
compile_error!("Please enable a runtime: 'runtime-tokio' or 'runtime-async-std'");

pub mod file;
mod mutex;
mod task;
mod time;

pub use mutex::*;
pub use task::*;
pub use time::*;
