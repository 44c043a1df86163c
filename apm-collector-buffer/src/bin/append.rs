//! Appends the lines typed into stdin to a segment buffer.
//!
//! A line holding a JSON segment is buffered as is; any other line becomes the id of an
//! otherwise empty segment.
use anyhow::{bail, Result};
use apm_collector_buffer::{
    BufferOptions, BufferWriter, FileCursorStore, OffsetTracker, DEFAULT_CURSOR_FILE,
};
use apm_collector_types::Segment;
use clap::Parser;
use flume::{unbounded, Receiver};
use std::{path::PathBuf, sync::Arc};

#[derive(Debug, Parser)]
struct Args {
    #[clap(long, help = "Buffer directory", default_value = "../buffer/")]
    dir: PathBuf,
    #[clap(long, help = "Rotate data files beyond this many bytes")]
    max_file_size: Option<u64>,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    log::info!("Please type something into the console and press enter:");

    let (sender, receiver) = unbounded();

    let sink = std::thread::spawn(move || -> Result<()> {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        rt.block_on(buffer_sink(args, receiver))
    });

    loop {
        let mut line = String::new();
        match std::io::stdin().read_line(&mut line) {
            Ok(0) => break, // this means stdin is closed
            Ok(_) => (),
            Err(e) => bail!("Failed to read stdin: {e}"),
        }
        sender.send(line)?;
    }
    drop(sender);

    match sink.join() {
        Ok(res) => res,
        Err(_) => bail!("buffer sink panicked"),
    }
}

async fn buffer_sink(args: Args, receiver: Receiver<String>) -> Result<()> {
    let mut options = BufferOptions::default();
    options.set_buffer_dir(args.dir.clone());
    if let Some(size) = args.max_file_size {
        options.set_max_file_size(size);
    }
    std::fs::create_dir_all(&args.dir)?;

    let offsets = Arc::new(OffsetTracker::new(FileCursorStore::new(
        args.dir.join(DEFAULT_CURSOR_FILE),
    )));
    offsets.initialize().await?;
    let writer = BufferWriter::new(options, offsets);
    writer.initialize().await?;

    while let Ok(line) = receiver.recv_async().await {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let segment = match serde_json::from_str::<Segment>(line) {
            Ok(segment) if !segment.segment_id.is_empty() => segment,
            _ => Segment {
                segment_id: line.to_owned(),
                ..Default::default()
            },
        };
        let outcome = writer.append(&segment.to_bytes()?).await;
        if !outcome.is_success() {
            log::warn!("{}: {outcome}", segment.segment_id);
        }
    }

    writer.close().await;
    Ok(())
}
