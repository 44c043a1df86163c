mod util;
use util::*;

use apm_collector_buffer::{
    format, BufferOptions, BufferWriter, FileCursorStore, OffsetTracker, DEFAULT_CURSOR_FILE,
};
use std::{io::Write, path::Path, sync::Arc};

static INIT: std::sync::Once = std::sync::Once::new();

async fn open_writer(dir: &Path, max_file_size: u64) -> anyhow::Result<(Arc<OffsetTracker>, BufferWriter)> {
    let mut options = BufferOptions::default();
    options.set_buffer_dir(dir).set_max_file_size(max_file_size);
    let offsets = Arc::new(OffsetTracker::new(FileCursorStore::new(
        dir.join(DEFAULT_CURSOR_FILE),
    )));
    offsets.initialize().await?;
    let writer = BufferWriter::new(options, offsets.clone());
    writer.initialize().await?;
    Ok((offsets, writer))
}

// cargo test --test writer -- --nocapture
#[cfg_attr(feature = "runtime-tokio", tokio::test)]
#[cfg_attr(feature = "runtime-async-std", async_std::test)]
async fn rotation() -> anyhow::Result<()> {
    INIT.call_once(env_logger::init);

    let dir = temp_dir("rotation")?;
    let (offsets, writer) = open_writer(&dir, 1000).await?;

    let records: Vec<Vec<u8>> = (0..100u8)
        .map(|i| vec![i; 10 + i as usize])
        .collect();
    let mut total = 0;
    for record in records.iter() {
        assert!(writer.append(record).await.is_success());
        total += format::frame_size(record.len()) as u64;
    }

    let options = writer.options().clone();
    let files = options.list_data_files().await?;
    assert!(files.len() > 1);

    let mut size = 0;
    let mut read = Vec::new();
    for (i, file) in files.iter().enumerate() {
        let path = options.path_of(file.name());
        let len = std::fs::metadata(&path)?.len();
        let frames = read_data_file(&path);
        if i + 1 < files.len() {
            // rotated right after exceeding the limit
            assert!(len > 1000);
            let last = frames.last().unwrap();
            assert!(len - format::frame_size(last.len()) as u64 <= 1000);
        } else {
            assert_eq!(writer.active_file().await.as_deref(), Some(file.name()));
            assert_eq!(offsets.write_cursor().await.offset, len);
        }
        size += len;
        read.extend(frames);
    }
    assert_eq!(size, total);
    assert_eq!(read, records);

    writer.close().await;
    std::fs::remove_dir_all(&dir)?;
    Ok(())
}

#[cfg_attr(feature = "runtime-tokio", tokio::test)]
#[cfg_attr(feature = "runtime-async-std", async_std::test)]
async fn crash_restart() -> anyhow::Result<()> {
    INIT.call_once(env_logger::init);

    let dir = temp_dir("crash-restart")?;
    let (offsets, writer) = open_writer(&dir, 1 << 20).await?;
    for record in [b"one".as_slice(), b"two", b"three"] {
        assert!(writer.append(record).await.is_success());
    }
    let active = writer.active_file().await.unwrap();
    let persisted = offsets.write_cursor().await;
    assert_eq!(persisted.file_name, active);
    drop(writer);
    drop(offsets);

    // a record torn in the middle by the crash
    let path = dir.join(&active);
    let mut file = std::fs::OpenOptions::new().append(true).open(&path)?;
    file.write_all(&[0x20, b'f', b'o'])?;
    drop(file);

    let (offsets, writer) = open_writer(&dir, 1 << 20).await?;
    assert_eq!(writer.active_file().await, Some(active.clone()));
    assert_eq!(offsets.write_cursor().await, persisted);
    assert_eq!(std::fs::metadata(&path)?.len(), persisted.offset);

    assert!(writer.append(b"four").await.is_success());
    writer.flush().await?;
    assert_eq!(
        read_data_file(&path),
        vec![
            b"one".to_vec(),
            b"two".to_vec(),
            b"three".to_vec(),
            b"four".to_vec()
        ]
    );
    assert_eq!(
        offsets.write_cursor().await.offset,
        std::fs::metadata(&path)?.len()
    );

    writer.close().await;
    assert!(writer.append(b"five").await.is_retryable());
    std::fs::remove_dir_all(&dir)?;
    Ok(())
}

#[cfg_attr(feature = "runtime-tokio", tokio::test)]
#[cfg_attr(feature = "runtime-async-std", async_std::test)]
async fn missing_cursor_file() -> anyhow::Result<()> {
    INIT.call_once(env_logger::init);

    let dir = temp_dir("missing-cursor-file")?;
    let (offsets, writer) = open_writer(&dir, 1 << 20).await?;
    assert!(writer.append(b"one").await.is_success());
    let first = writer.active_file().await.unwrap();
    drop(writer);
    std::fs::remove_file(dir.join(&first))?;

    let writer = BufferWriter::new(writer_options(&dir), offsets.clone());
    writer.initialize().await?;
    let second = writer.active_file().await.unwrap();
    assert_eq!(std::fs::metadata(dir.join(&second))?.len(), 0);
    assert_eq!(offsets.write_cursor().await.file_name, second);
    assert_eq!(offsets.write_cursor().await.offset, 0);

    std::fs::remove_dir_all(&dir)?;
    Ok(())
}

#[cfg_attr(feature = "runtime-tokio", tokio::test)]
#[cfg_attr(feature = "runtime-async-std", async_std::test)]
async fn new_buffer_dir() -> anyhow::Result<()> {
    INIT.call_once(env_logger::init);

    let dir = temp_dir("new-buffer-dir")?.join("buffer");
    let offsets = Arc::new(OffsetTracker::new(
        apm_collector_buffer::MemoryCursorStore::new(),
    ));
    let writer = BufferWriter::new(writer_options(&dir), offsets.clone());
    writer.initialize().await?;
    assert!(dir.is_dir());
    let active = writer.active_file().await.unwrap();
    assert!(writer.options().parse_file_name(&active).is_some());
    assert!(dir.join(&active).is_file());

    std::fs::remove_dir_all(dir.parent().unwrap())?;
    Ok(())
}

fn writer_options(dir: &Path) -> BufferOptions {
    let mut options = BufferOptions::default();
    options.set_buffer_dir(dir);
    options
}
