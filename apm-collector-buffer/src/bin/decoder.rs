//! This program decodes a data file of the segment buffer and outputs it as plain text,
//! one record per line:
//!
//! ```ignore
//! [0 | 42] {"segment_id":"1.2.3",...}
//! [44 | 17] <17 bytes>
//! ```
//!
//! Decoding stops at the first malformed frame.
use anyhow::Result;
use apm_collector_buffer::format::read_frame;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
struct Args {
    #[clap(long, help = "Decode this file")]
    file: PathBuf,
    #[clap(long, help = "If set, skip printing the payload")]
    header_only: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let Args { file, header_only } = Args::parse();
    let bytes = tokio::fs::read(&file).await?;

    let mut pos = 0;
    let mut count = 0;
    while pos < bytes.len() {
        let (payload, size) = match read_frame(&bytes[pos..]) {
            Ok(frame) => frame,
            Err(e) => {
                eprintln!("# {e} at offset {pos}");
                break;
            }
        };
        print!("[{pos} | {}]", payload.len());
        if !header_only {
            match std::str::from_utf8(payload) {
                Ok(text) => print!(" {text}"),
                Err(_) => print!(" <{} bytes>", payload.len()),
            }
        }
        println!();
        pos += size;
        count += 1;
    }
    eprintln!("# {count} records, {pos} of {} bytes", bytes.len());

    Ok(())
}
