#[cfg(feature = "runtime-tokio")]
pub use tokio::task::{spawn as spawn_task, JoinError, JoinHandle as TaskHandle};

#[cfg(feature = "runtime-async-std")]
mod async_std_task;

#[cfg(feature = "runtime-async-std")]
pub use async_std_task::*;
