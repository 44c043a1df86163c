#![allow(dead_code)]
use apm_collector_buffer::{format, RecordDispatcher};
use apm_collector_types::{export::async_trait, Outcome};
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::Mutex,
    time::{SystemTime, UNIX_EPOCH},
};

/// A fresh, empty directory under the system temp dir.
pub fn temp_dir(name: &str) -> std::io::Result<PathBuf> {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    let path = std::env::temp_dir().join(format!("apm-collector-{name}-{nanos}"));
    std::fs::create_dir_all(&path)?;
    Ok(path)
}

/// Write `records` as a data file, returning the size of each frame.
pub fn write_data_file(path: &Path, records: &[&[u8]]) -> std::io::Result<Vec<u64>> {
    let mut bytes = Vec::new();
    let mut sizes = Vec::new();
    for record in records {
        let frame = format::frame(record);
        sizes.push(frame.len() as u64);
        bytes.extend_from_slice(&frame);
    }
    std::fs::write(path, bytes)?;
    Ok(sizes)
}

/// Decode a whole data file; panics on a malformed frame.
pub fn read_data_file(path: &Path) -> Vec<Vec<u8>> {
    let bytes = std::fs::read(path).unwrap();
    let mut records = Vec::new();
    let mut pos = 0;
    while pos < bytes.len() {
        let (record, size) = format::read_frame(&bytes[pos..]).unwrap();
        records.push(record.to_vec());
        pos += size;
    }
    records
}

/// Remembers every record it accepts. Records registered with `fail_with` are answered
/// with the given outcome instead.
#[derive(Default)]
pub struct Recorder {
    records: Mutex<Vec<Vec<u8>>>,
    failures: Mutex<HashMap<Vec<u8>, Outcome>>,
}

impl Recorder {
    pub fn records(&self) -> Vec<Vec<u8>> {
        self.records.lock().unwrap().clone()
    }

    pub fn fail_with(&self, record: &[u8], outcome: Outcome) {
        self.failures
            .lock()
            .unwrap()
            .insert(record.to_vec(), outcome);
    }

    pub fn heal(&self) {
        self.failures.lock().unwrap().clear();
    }
}

#[async_trait]
impl RecordDispatcher for Recorder {
    async fn dispatch(&self, record: &[u8]) -> Outcome {
        if let Some(outcome) = self.failures.lock().unwrap().get(record) {
            return outcome.clone();
        }
        self.records.lock().unwrap().push(record.to_vec());
        Outcome::Success
    }
}
