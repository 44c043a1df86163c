//! The offset tracker persists the two cursors of the segment buffer: where the writer
//! appends and where the reader resumes. Both survive restarts.
//!
//! The persisted state is four scalars, kept in a small key-value store behind the
//! [`CursorStore`] trait. [`FileCursorStore`] keeps them as a JSON document next to the
//! data files.

use crate::BufferErr;
use apm_collector_runtime::{
    file::{exists, read, rename, AsyncWriteExt, OpenOptions},
    AsyncMutex,
};
use apm_collector_types::export::async_trait;
use serde::{Deserialize, Serialize};
use std::{
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Mutex,
    },
};

pub const DEFAULT_CURSOR_FILE: &str = "offset.json";

/// A position in the buffer: a data file name and a byte offset into it. An empty file
/// name means the cursor has never been set.
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash)]
pub struct Cursor {
    pub file_name: String,
    pub offset: u64,
}

impl Cursor {
    pub fn new<S: Into<String>>(file_name: S, offset: u64) -> Self {
        Self {
            file_name: file_name.into(),
            offset,
        }
    }

    pub fn is_set(&self) -> bool {
        !self.file_name.is_empty()
    }
}

/// The persisted state of the tracker.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CursorState {
    pub write_file_name: String,
    pub write_offset: u64,
    pub read_file_name: String,
    pub read_offset: u64,
}

impl CursorState {
    pub fn write_cursor(&self) -> Cursor {
        Cursor::new(self.write_file_name.clone(), self.write_offset)
    }

    pub fn read_cursor(&self) -> Cursor {
        Cursor::new(self.read_file_name.clone(), self.read_offset)
    }
}

#[async_trait]
/// Durable storage of the cursor state. `store` must not return before the state is durable.
pub trait CursorStore: Send + Sync {
    /// Returns `None` if nothing has ever been stored.
    async fn load(&self) -> Result<Option<CursorState>, BufferErr>;

    async fn store(&self, state: &CursorState) -> Result<(), BufferErr>;
}

#[derive(Debug, Clone)]
/// Keeps the cursor state in a JSON file. Each store writes a temporary file, syncs it and
/// renames it over the previous one, so a crash leaves either the old or the new state.
pub struct FileCursorStore {
    path: PathBuf,
}

impl FileCursorStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".tmp");
        PathBuf::from(name)
    }
}

#[async_trait]
impl CursorStore for FileCursorStore {
    async fn load(&self) -> Result<Option<CursorState>, BufferErr> {
        if !exists(&self.path).await {
            return Ok(None);
        }
        let bytes = read(self.path.as_path())
            .await
            .map_err(BufferErr::IoError)?;
        let state = serde_json::from_slice(&bytes).map_err(BufferErr::SerdeJson)?;
        Ok(Some(state))
    }

    async fn store(&self, state: &CursorState) -> Result<(), BufferErr> {
        let bytes = serde_json::to_vec(state).map_err(BufferErr::SerdeJson)?;
        let temp = self.temp_path();
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(temp.as_path())
            .await
            .map_err(BufferErr::IoError)?;
        file.write_all(&bytes).await.map_err(BufferErr::IoError)?;
        file.flush().await.map_err(BufferErr::IoError)?;
        file.sync_all().await.map_err(BufferErr::IoError)?;
        drop(file);
        rename(temp.as_path(), self.path.as_path())
            .await
            .map_err(BufferErr::IoError)?;
        Ok(())
    }
}

#[derive(Debug, Default)]
/// Keeps the cursor state in memory. It can be told to fail, to exercise the error paths.
pub struct MemoryCursorStore {
    state: Mutex<Option<CursorState>>,
    failing: AtomicBool,
}

impl MemoryCursorStore {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn with_state(state: CursorState) -> Self {
        Self {
            state: Mutex::new(Some(state)),
            failing: AtomicBool::new(false),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// The last successfully stored state.
    pub fn state(&self) -> Option<CursorState> {
        self.state.lock().ok().and_then(|s| s.clone())
    }
}

#[async_trait]
impl CursorStore for MemoryCursorStore {
    async fn load(&self) -> Result<Option<CursorState>, BufferErr> {
        Ok(self.state())
    }

    async fn store(&self, state: &CursorState) -> Result<(), BufferErr> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(BufferErr::CursorStore("store is failing".to_owned()));
        }
        let mut guard = self
            .state
            .lock()
            .map_err(|_| BufferErr::CursorStore("lock poisoned".to_owned()))?;
        *guard = Some(state.clone());
        Ok(())
    }
}

/// Shared by the writer and the reader. Every setter persists the new state before it
/// becomes visible; if persisting fails, the previous value stays and the error is returned.
pub struct OffsetTracker {
    store: Box<dyn CursorStore>,
    state: AsyncMutex<CursorState>,
}

impl std::fmt::Debug for OffsetTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OffsetTracker").finish()
    }
}

impl OffsetTracker {
    pub fn new<S: CursorStore + 'static>(store: S) -> Self {
        Self {
            store: Box::new(store),
            state: AsyncMutex::new(CursorState::default()),
        }
    }

    /// Load the persisted state. Nothing persisted means both cursors are unset.
    pub async fn initialize(&self) -> Result<(), BufferErr> {
        let loaded = self.store.load().await.map_err(|e| {
            log::error!("Failed to load buffer cursors: {e}");
            e
        })?;
        if let Some(loaded) = loaded {
            log::info!(
                "Buffer cursors: write {}@{}, read {}@{}",
                loaded.write_file_name,
                loaded.write_offset,
                loaded.read_file_name,
                loaded.read_offset
            );
            *self.state.lock().await = loaded;
        }
        Ok(())
    }

    pub async fn state(&self) -> CursorState {
        self.state.lock().await.clone()
    }

    pub async fn write_cursor(&self) -> Cursor {
        self.state.lock().await.write_cursor()
    }

    pub async fn read_cursor(&self) -> Cursor {
        self.state.lock().await.read_cursor()
    }

    pub async fn set_write_cursor(&self, file_name: &str, offset: u64) -> Result<(), BufferErr> {
        self.update(|s| {
            s.write_file_name = file_name.to_owned();
            s.write_offset = offset;
        })
        .await
    }

    pub async fn set_write_offset(&self, offset: u64) -> Result<(), BufferErr> {
        self.update(|s| s.write_offset = offset).await
    }

    pub async fn set_read_cursor(&self, file_name: &str, offset: u64) -> Result<(), BufferErr> {
        self.update(|s| {
            s.read_file_name = file_name.to_owned();
            s.read_offset = offset;
        })
        .await
    }

    pub async fn set_read_offset(&self, offset: u64) -> Result<(), BufferErr> {
        self.update(|s| s.read_offset = offset).await
    }

    async fn update<F: FnOnce(&mut CursorState)>(&self, f: F) -> Result<(), BufferErr> {
        // held while persisting: stores happen in the order of updates
        let mut state = self.state.lock().await;
        let mut next = state.clone();
        f(&mut next);
        if next == *state {
            return Ok(());
        }
        if let Err(e) = self.store.store(&next).await {
            log::error!("Failed to persist buffer cursors: {e}");
            return Err(e);
        }
        *state = next;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[cfg(feature = "runtime-tokio")]
    #[tokio::test]
    async fn test_stale_but_safe() {
        let tracker = OffsetTracker::new(MemoryCursorStore::new());
        tracker.initialize().await.unwrap();
        assert!(!tracker.write_cursor().await.is_set());

        tracker.set_write_cursor("data_1.sw", 0).await.unwrap();
        tracker.set_write_offset(42).await.unwrap();
        assert_eq!(tracker.write_cursor().await, Cursor::new("data_1.sw", 42));

        let store = MemoryCursorStore::with_state(tracker.state().await);
        store.set_failing(true);
        let tracker = OffsetTracker::new(store);
        tracker.initialize().await.unwrap();
        assert!(tracker.set_write_offset(50).await.is_err());
        assert!(tracker.set_read_cursor("data_1.sw", 10).await.is_err());
        assert_eq!(tracker.write_cursor().await, Cursor::new("data_1.sw", 42));
        assert!(!tracker.read_cursor().await.is_set());
    }

    #[cfg(feature = "runtime-tokio")]
    #[tokio::test]
    async fn test_file_store() {
        let dir = std::env::temp_dir().join(format!("apm-offset-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let store = FileCursorStore::new(dir.join(DEFAULT_CURSOR_FILE));
        assert_eq!(store.load().await.unwrap(), None);

        let tracker = OffsetTracker::new(store.clone());
        tracker.initialize().await.unwrap();
        tracker.set_write_cursor("data_2.sw", 7).await.unwrap();
        tracker.set_read_cursor("data_1.sw", 3).await.unwrap();

        let reopened = OffsetTracker::new(store);
        reopened.initialize().await.unwrap();
        assert_eq!(reopened.write_cursor().await, Cursor::new("data_2.sw", 7));
        assert_eq!(reopened.read_cursor().await, Cursor::new("data_1.sw", 3));
        assert!(!dir.join("offset.json.tmp").exists());

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
