use crate::format::FormatErr;
use apm_collector_types::CollectorResult;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BufferErr {
    #[error("IO Error: {0}")]
    IoError(#[source] std::io::Error),
    #[error("FormatErr: {0}")]
    FormatErr(#[source] FormatErr),
    #[error("serde_json::Error {0}")]
    SerdeJson(#[source] serde_json::Error),
    #[error("Buffer writer has not been initialized")]
    NotInitialized,
    #[error("Cursor store is unavailable: {0}")]
    CursorStore(String),
    #[error("Task Dead ({0})")]
    TaskDead(&'static str),
}

pub type BufferResult<T> = CollectorResult<T, BufferErr>;
