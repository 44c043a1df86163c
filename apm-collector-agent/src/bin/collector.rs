//! Runs a standalone collector fed by stdin, one JSON segment per line, with in-memory
//! storage. Segments that cannot be stored yet go to the buffer directory and are replayed
//! from there.
use anyhow::Result;
use apm_collector_agent::{Collector, CollectorOptions, MemorySegmentDao};
use apm_collector_cache::MemoryIdRegistry;
use clap::Parser;
use std::{path::PathBuf, sync::Arc, time::Duration};
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Debug, Parser)]
struct Args {
    #[clap(long, help = "JSON file of collector options")]
    config: Option<PathBuf>,
    #[clap(long, help = "Buffer directory, overrides the config")]
    dir: Option<PathBuf>,
    #[clap(long, help = "Buffer read period in milliseconds, overrides the config")]
    read_period: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut options: CollectorOptions = match &args.config {
        Some(path) => serde_json::from_slice(&std::fs::read(path)?)?,
        None => Default::default(),
    };
    if let Some(dir) = args.dir {
        options.buffer_mut().set_buffer_dir(dir);
    }
    if let Some(millis) = args.read_period {
        options.buffer_mut().set_read_period(Duration::from_millis(millis));
    }

    let registry = Arc::new(MemoryIdRegistry::new());
    let dao = Arc::new(MemorySegmentDao::new());
    let collector = Collector::start(options, registry.clone(), dao.clone()).await?;
    log::info!("Collector started: {:?}", collector.sequence());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let line = match line {
            Some(line) => line,
            None => break,
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let outcome = collector.ingest(line.as_bytes()).await;
        if !outcome.is_success() {
            log::warn!("{outcome}");
        }
    }

    collector.shutdown().await?;
    log::info!(
        "Stored {} segments, {} identifiers registered",
        dao.len(),
        registry.len()
    );
    Ok(())
}
