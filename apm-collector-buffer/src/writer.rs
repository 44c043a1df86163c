use crate::{format, BufferErr, BufferOptions, Cursor, DataFile, OffsetTracker};
use apm_collector_runtime::{
    file::{
        create_dir_all, exists, remove_file, AsyncSeekExt, AsyncWriteExt, File, OpenOptions,
        SeekFrom,
    },
    AsyncMutex,
};
use apm_collector_types::{Outcome, TimeBucket};
use std::sync::Arc;

/// Appends records to the data files of the segment buffer.
///
/// Records are appended to the active data file until it grows beyond the max file size,
/// at which point the writer rotates to a new data file. The write cursor always points at
/// the end of the last complete record of the active file.
///
/// All operations are serialized; the writer can be shared by any number of producers.
pub struct BufferWriter {
    options: BufferOptions,
    offsets: Arc<OffsetTracker>,
    active: AsyncMutex<Option<ActiveFile>>,
}

struct ActiveFile {
    data_file: DataFile,
    file: File,
    offset: u64,
}

impl std::fmt::Debug for BufferWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferWriter")
            .field("options", &self.options)
            .finish()
    }
}

impl BufferWriter {
    pub fn new(options: BufferOptions, offsets: Arc<OffsetTracker>) -> Self {
        Self {
            options,
            offsets,
            active: AsyncMutex::new(None),
        }
    }

    pub fn options(&self) -> &BufferOptions {
        &self.options
    }

    /// Open the data file to append to. The offset tracker must have been initialized.
    ///
    /// If the write cursor points to an existing data file, it is reopened at exactly the
    /// persisted offset: bytes beyond it belong to a record that was never acknowledged, and
    /// are truncated. Otherwise a new data file is created.
    pub async fn initialize(&self) -> Result<(), BufferErr> {
        let mut active = self.active.lock().await;
        if active.is_some() {
            return Ok(());
        }
        let dir = self.options.buffer_dir();
        let file = if !exists(dir).await {
            create_dir_all(dir.as_path())
                .await
                .map_err(BufferErr::IoError)?;
            log::info!("Created buffer directory {}", dir.display());
            self.new_data_file(None).await?
        } else {
            let cursor = self.offsets.write_cursor().await;
            match self.reopen(&cursor).await? {
                Some(file) => file,
                None => {
                    let last = self
                        .options
                        .list_data_files()
                        .await?
                        .last()
                        .map(|f| f.time_bucket());
                    self.new_data_file(last).await?
                }
            }
        };
        *active = Some(file);
        Ok(())
    }

    /// Name of the data file being appended to, if initialized.
    pub async fn active_file(&self) -> Option<String> {
        self.active
            .lock()
            .await
            .as_ref()
            .map(|a| a.data_file.name().to_owned())
    }

    /// Append one record. Failures are logged and reported as retryable; the write cursor
    /// only advances once the record is completely written.
    pub async fn append(&self, record: &[u8]) -> Outcome {
        let mut guard = self.active.lock().await;
        let active = match guard.as_mut() {
            Some(active) => active,
            None => {
                log::error!("Dropped a write: {}", BufferErr::NotInitialized);
                return Outcome::retryable(BufferErr::NotInitialized.to_string());
            }
        };

        let bytes = format::frame(record);
        let len = match Self::write(active, &bytes).await {
            Ok(len) => len,
            Err(e) => {
                log::error!("Failed to append to {}: {e}", active.data_file.name());
                Self::rollback(active).await;
                return Outcome::retryable(e.to_string());
            }
        };

        if len > self.options.max_file_size() {
            match self.new_data_file(Some(active.data_file.time_bucket())).await {
                Ok(next) => {
                    let full = std::mem::replace(active, next);
                    log::debug!(
                        "Rotated from {} ({len} bytes) to {}",
                        full.data_file.name(),
                        active.data_file.name()
                    );
                    Self::close_file(full).await;
                    return Outcome::Success;
                }
                Err(e) => {
                    // keep appending to the current file; rotation is retried on the next append
                    log::error!("Failed to rotate {}: {e}", active.data_file.name());
                }
            }
        }

        if let Err(e) = self.offsets.set_write_offset(len).await {
            Self::rollback(active).await;
            return Outcome::retryable(e.to_string());
        }
        active.offset = len;
        log::trace!("Appended {} bytes to {}", bytes.len(), active.data_file.name());
        Outcome::Success
    }

    /// Sync the active data file to disk.
    pub async fn flush(&self) -> Result<(), BufferErr> {
        let mut guard = self.active.lock().await;
        if let Some(active) = guard.as_mut() {
            active.file.flush().await.map_err(BufferErr::IoError)?;
            active.file.sync_data().await.map_err(BufferErr::IoError)?;
        }
        Ok(())
    }

    /// Close the active data file. Appending afterwards fails until the writer is
    /// initialized again.
    pub async fn close(&self) {
        if let Some(active) = self.active.lock().await.take() {
            Self::close_file(active).await;
        }
    }

    async fn reopen(&self, cursor: &Cursor) -> Result<Option<ActiveFile>, BufferErr> {
        if !cursor.is_set() {
            return Ok(None);
        }
        let data_file = match self.options.parse_file_name(&cursor.file_name) {
            Some(data_file) => data_file,
            None => {
                log::warn!("Write cursor points to {}, not a data file", cursor.file_name);
                return Ok(None);
            }
        };
        let path = self.options.path_of(data_file.name());
        if !exists(&path).await {
            log::warn!("{} is gone, starting a new data file", path.display());
            return Ok(None);
        }

        let mut file = OpenOptions::new()
            .write(true)
            .open(path.as_path())
            .await
            .map_err(BufferErr::IoError)?;
        let len = file.metadata().await.map_err(BufferErr::IoError)?.len();
        let mut offset = cursor.offset;
        if len > offset {
            log::warn!(
                "Truncating {} bytes beyond the write cursor of {}",
                len - offset,
                data_file.name()
            );
            file.set_len(offset).await.map_err(BufferErr::IoError)?;
            file.sync_all().await.map_err(BufferErr::IoError)?;
        } else if len < offset {
            log::warn!(
                "{} has {len} bytes but its write cursor is at {offset}",
                data_file.name()
            );
            self.offsets.set_write_offset(len).await?;
            offset = len;
        }
        let read = self.offsets.read_cursor().await;
        if read.file_name == data_file.name() && read.offset > offset {
            log::warn!(
                "Read cursor {} is beyond the write cursor {offset} of {}",
                read.offset,
                data_file.name()
            );
            self.offsets.set_read_offset(offset).await?;
        }
        file.seek(SeekFrom::Start(offset))
            .await
            .map_err(BufferErr::IoError)?;
        log::info!("Reopened {} at {offset}", path.display());

        Ok(Some(ActiveFile {
            data_file,
            file,
            offset,
        }))
    }

    /// Names are unique and strictly increasing: a bucket that is not after `last` (or is
    /// taken) is bumped.
    async fn new_data_file(&self, last: Option<TimeBucket>) -> Result<ActiveFile, BufferErr> {
        let mut bucket = TimeBucket::now();
        if let Some(last) = last {
            if bucket <= last {
                bucket = last.succ();
            }
        }
        while exists(self.options.path_of(&self.options.file_name(bucket))).await {
            bucket = bucket.succ();
        }
        let data_file = self.options.data_file(bucket);
        let path = self.options.path_of(data_file.name());

        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path.as_path())
            .await
            .map_err(BufferErr::IoError)?;
        if let Err(e) = self.offsets.set_write_cursor(data_file.name(), 0).await {
            drop(file);
            if let Err(e) = remove_file(path.as_path()).await {
                log::error!("Failed to remove {}: {e}", path.display());
            }
            return Err(e);
        }
        log::info!("Created data file {}", path.display());

        Ok(ActiveFile {
            data_file,
            file,
            offset: 0,
        })
    }

    async fn write(active: &mut ActiveFile, bytes: &[u8]) -> Result<u64, BufferErr> {
        active
            .file
            .write_all(bytes)
            .await
            .map_err(BufferErr::IoError)?;
        active.file.flush().await.map_err(BufferErr::IoError)?;
        Ok(active
            .file
            .metadata()
            .await
            .map_err(BufferErr::IoError)?
            .len())
    }

    async fn rollback(active: &mut ActiveFile) {
        let offset = active.offset;
        let res = async {
            active.file.set_len(offset).await?;
            active.file.seek(SeekFrom::Start(offset)).await?;
            Ok::<(), std::io::Error>(())
        }
        .await;
        if let Err(e) = res {
            log::error!(
                "Failed to roll {} back to {offset}: {e}",
                active.data_file.name()
            );
        }
    }

    async fn close_file(mut active: ActiveFile) {
        let res = async {
            active.file.flush().await?;
            active.file.sync_all().await?;
            Ok::<(), std::io::Error>(())
        }
        .await;
        if let Err(e) = res {
            log::error!("Failed to close {}: {e}", active.data_file.name());
        }
    }
}
