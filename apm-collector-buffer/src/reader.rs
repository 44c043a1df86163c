use crate::{format, BufferErr, BufferOptions, DataFile, OffsetTracker};
use apm_collector_runtime::{
    file::{file_len, remove_file, AsyncReadExt, AsyncSeekExt, File, SeekFrom},
    spawn_task, TaskHandle, Ticker,
};
use apm_collector_types::{
    export::{
        async_trait,
        futures::{select, FutureExt},
    },
    Outcome,
};
use flume::{bounded, Sender};
use std::sync::Arc;

#[async_trait]
/// Where the reader delivers buffered records.
pub trait RecordDispatcher: Send + Sync {
    /// `Retryable` halts the read; the same record is dispatched again on the next tick.
    /// `Fatal` means the record can never be processed, it is skipped.
    async fn dispatch(&self, record: &[u8]) -> Outcome;
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
/// What a single tick of the reader did.
pub struct TickReport {
    /// The data file read from
    pub file: Option<String>,
    /// Records dispatched successfully
    pub dispatched: usize,
    /// Records skipped because their dispatch failed fatally
    pub skipped: usize,
    /// Whether the tick stopped before the end of the file
    pub halted: bool,
    /// Whether the file was consumed and deleted
    pub deleted: bool,
    /// Older data files purged before reading
    pub purged: Vec<String>,
}

/// Drains the segment buffer, oldest data file first, into a [`RecordDispatcher`].
///
/// Each tick reads one data file from the read cursor, up to the write cursor if it is the
/// file being written, or to its end otherwise. A fully consumed file is deleted, unless it
/// is the file being written. The read cursor is persisted after every record, so a record
/// is dispatched again after a crash at most once per crash.
pub struct BufferReader {
    options: BufferOptions,
    offsets: Arc<OffsetTracker>,
    dispatcher: Arc<dyn RecordDispatcher>,
}

impl std::fmt::Debug for BufferReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferReader")
            .field("options", &self.options)
            .finish()
    }
}

/// Handle to the periodic reader task.
pub struct BufferReaderHandle {
    stop: Sender<()>,
    handle: TaskHandle<()>,
}

impl std::fmt::Debug for BufferReaderHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferReaderHandle").finish()
    }
}

impl BufferReaderHandle {
    /// Stop the reader. The current tick, if any, completes first.
    pub async fn stop(self) -> Result<(), BufferErr> {
        // it is fine if the task has already ended
        self.stop.try_send(()).ok();
        self.handle
            .await
            .map_err(|_| BufferErr::TaskDead("BufferReader"))
    }
}

impl BufferReader {
    pub fn new(
        options: BufferOptions,
        offsets: Arc<OffsetTracker>,
        dispatcher: Arc<dyn RecordDispatcher>,
    ) -> Self {
        Self {
            options,
            offsets,
            dispatcher,
        }
    }

    /// Tick every `read_period` on a background task, until stopped.
    pub fn spawn(self) -> BufferReaderHandle {
        let (stop, stopped) = bounded(1);
        let mut ticker = Ticker::new(self.options.read_period());
        let handle = spawn_task(async move {
            log::info!(
                "Buffer reader started on {}",
                self.options.buffer_dir().display()
            );
            loop {
                select! {
                    _ = ticker.tick().fuse() => (),
                    // stop signal or handle dropped
                    _ = stopped.recv_async().fuse() => break,
                }
                let report = self.tick().await;
                if report.dispatched > 0 || report.halted {
                    log::debug!("{report:?}");
                }
            }
            log::info!("Buffer reader stopped");
        });
        BufferReaderHandle { stop, handle }
    }

    pub async fn tick(&self) -> TickReport {
        let mut report = TickReport::default();

        let files = match self.options.list_data_files().await {
            Ok(files) => files,
            Err(e) => {
                log::error!("Failed to scan the buffer: {e}");
                report.halted = true;
                return report;
            }
        };
        let (data_file, offset) = match self.position(files, &mut report).await {
            Some(pos) => pos,
            None => return report,
        };
        report.file = Some(data_file.name().to_owned());

        match self.read(&data_file, offset, &mut report).await {
            Ok(true) => {
                let path = self.options.path_of(data_file.name());
                match remove_file(path.as_path()).await {
                    Ok(()) => {
                        log::debug!("Consumed {}", path.display());
                        report.deleted = true;
                    }
                    Err(e) => log::error!("Failed to remove {}: {e}", path.display()),
                }
            }
            Ok(false) => (),
            Err(e) => {
                log::error!("Failed to read {}: {e}", data_file.name());
                report.halted = true;
            }
        }
        report
    }

    /// Where to read from. Purges data files older than the read cursor; if the read
    /// cursor is unset or points to a missing file, resets it to the earliest data file.
    async fn position(
        &self,
        files: Vec<DataFile>,
        report: &mut TickReport,
    ) -> Option<(DataFile, u64)> {
        let cursor = self.offsets.read_cursor().await;
        let active = self.offsets.write_cursor().await;

        let mut remaining = Vec::with_capacity(files.len());
        match self.options.parse_file_name(&cursor.file_name) {
            Some(current) if cursor.is_set() => {
                for file in files {
                    if file < current && file.name() != active.file_name {
                        self.purge(&file, report).await;
                    } else {
                        remaining.push(file);
                    }
                }
                if let Some(file) = remaining.iter().find(|f| f.name() == current.name()) {
                    return Some((file.clone(), cursor.offset));
                }
            }
            _ => remaining = files,
        }

        let earliest = remaining.into_iter().next()?;
        if let Err(e) = self.offsets.set_read_cursor(earliest.name(), 0).await {
            log::error!("Failed to move the read cursor to {}: {e}", earliest.name());
            return None;
        }
        log::debug!("Read cursor moved to {}", earliest.name());
        Some((earliest, 0))
    }

    async fn purge(&self, file: &DataFile, report: &mut TickReport) {
        let path = self.options.path_of(file.name());
        match remove_file(path.as_path()).await {
            Ok(()) => {
                log::info!("Purged {}", path.display());
                report.purged.push(file.name().to_owned());
            }
            Err(e) => log::error!("Failed to purge {}: {e}", path.display()),
        }
    }

    /// Returns true if the file has been consumed and can be deleted.
    async fn read(
        &self,
        data_file: &DataFile,
        offset: u64,
        report: &mut TickReport,
    ) -> Result<bool, BufferErr> {
        let path = self.options.path_of(data_file.name());
        let write = self.offsets.write_cursor().await;
        let is_active = write.file_name == data_file.name();
        let len = file_len(&path).await.map_err(BufferErr::IoError)?;
        // never read past the write cursor: bytes beyond it may be an incomplete record
        let end = if is_active { write.offset.min(len) } else { len };

        if offset > end {
            log::warn!(
                "Read cursor {offset} is beyond the end {end} of {}",
                data_file.name()
            );
            if is_active {
                // resume from the end, or frames written afterwards would be read mid-way
                self.offsets.set_read_offset(end).await?;
            }
            return Ok(!is_active);
        }
        if offset == end {
            return Ok(!is_active);
        }

        let size = usize::try_from(end - offset).map_err(|_| {
            BufferErr::IoError(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "data file too large",
            ))
        })?;
        let mut bytes = vec![0u8; size];
        let mut file = File::open(path.as_path())
            .await
            .map_err(BufferErr::IoError)?;
        file.seek(SeekFrom::Start(offset))
            .await
            .map_err(BufferErr::IoError)?;
        file.read_exact(&mut bytes)
            .await
            .map_err(BufferErr::IoError)?;

        let mut pos = 0;
        while pos < bytes.len() {
            let at = offset + pos as u64;
            let (record, frame_size) = match format::read_frame(&bytes[pos..]) {
                Ok(frame) => frame,
                Err(e) => {
                    log::warn!("Malformed record at {}@{at}: {e}", data_file.name());
                    report.halted = true;
                    return Ok(false);
                }
            };
            match self.dispatcher.dispatch(record).await {
                Outcome::Success => report.dispatched += 1,
                Outcome::Retryable(reason) => {
                    log::debug!("Record at {}@{at} will be retried: {reason}", data_file.name());
                    report.halted = true;
                    return Ok(false);
                }
                Outcome::Fatal(reason) => {
                    log::error!("Skipped record at {}@{at}: {reason}", data_file.name());
                    report.skipped += 1;
                }
            }
            pos += frame_size;
            if self
                .offsets
                .set_read_offset(offset + pos as u64)
                .await
                .is_err()
            {
                report.halted = true;
                return Ok(false);
            }
        }

        Ok(!is_active)
    }
}
