use thiserror::Error;

/// Type alias of the [`Result`] type specific to the collector.
pub type CollectorResult<T, E> = std::result::Result<T, CollectorErr<E>>;

#[derive(Error, Debug)]
/// Common errors that may occur. Each component plugs its own error type in as `E`.
pub enum CollectorErr<E: std::error::Error> {
    #[error("StorageErr: {0}")]
    Storage(#[from] StorageErr),
    #[error("SegmentErr: {0}")]
    Segment(#[from] SegmentErr),
    #[error("Component error: {0}")]
    Backend(E),
    #[error("Runtime error: {0}")]
    Runtime(Box<dyn std::error::Error + Send + Sync>),
}

#[derive(Error, Debug)]
/// Errors reported by the storage collaborators (identifier registry, batch DAO).
pub enum StorageErr {
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
    #[error("Storage rejected the request: {0}")]
    Rejected(String),
    #[error("Storage error: {0}")]
    Other(Box<dyn std::error::Error + Send + Sync>),
}

#[derive(Error, Debug)]
/// Errors that may happen when encoding or decoding a segment.
pub enum SegmentErr {
    #[error("serde_json::Error {0}")]
    SerdeJson(#[from] serde_json::Error),
    #[error("Segment id is empty")]
    MissingSegmentId,
}

/// Function to construct a [`StorageErr::Other`] error variant.
pub fn storage_error<E: std::error::Error + Send + Sync + 'static>(e: E) -> StorageErr {
    StorageErr::Other(Box::new(e))
}

/// Function to construct a [`CollectorErr::Runtime`] error variant.
pub fn runtime_error<T: std::error::Error, E: std::error::Error + Send + Sync + 'static>(
    e: E,
) -> CollectorErr<T> {
    CollectorErr::Runtime(Box::new(e))
}
