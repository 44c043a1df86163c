//! Filesystem facilities used by the segment buffer.
//!
//! Besides re-exporting the runtime's async `File`, this module papers over the few
//! directory operations whose signatures differ between runtimes.

#[cfg(feature = "runtime-tokio")]
pub use tokio::{
    fs::{File, OpenOptions},
    io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt},
};

#[cfg(feature = "runtime-async-std")]
pub use async_std::{
    fs::{File, OpenOptions},
    io::{prelude::SeekExt as AsyncSeekExt, ReadExt as AsyncReadExt, WriteExt as AsyncWriteExt},
};

#[cfg(feature = "runtime-tokio")]
mod tokio_file;

#[cfg(feature = "runtime-tokio")]
pub use tokio_file::*;

#[cfg(feature = "runtime-async-std")]
mod async_std_file;

#[cfg(feature = "runtime-async-std")]
pub use async_std_file::*;

pub use std::io::SeekFrom;

/// Whether anything exists at `path`.
pub async fn exists<P: AsRef<std::path::Path>>(path: P) -> bool {
    file_len(path).await.is_ok()
}
