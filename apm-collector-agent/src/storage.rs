use apm_collector_types::{export::async_trait, BatchDao, Segment, StorageErr};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Mutex,
};

#[derive(Debug, Default)]
/// Keeps persisted segments in memory. Stands in for a storage backend when running
/// standalone, and in tests.
pub struct MemorySegmentDao {
    segments: Mutex<Vec<Segment>>,
    unavailable: AtomicBool,
}

impl MemorySegmentDao {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn segments(&self) -> Vec<Segment> {
        self.segments
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.segments.lock().map(|s| s.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl BatchDao<Segment> for MemorySegmentDao {
    async fn batch_persist(&self, records: &[Segment]) -> Result<(), StorageErr> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StorageErr::Unavailable("segment storage is down".to_owned()));
        }
        let mut segments = self
            .segments
            .lock()
            .map_err(|_| StorageErr::Rejected("poisoned".to_owned()))?;
        segments.extend_from_slice(records);
        Ok(())
    }
}
