use apm_collector_types::{export::async_trait, IdKey, IdRegistry, StorageErr, SurrogateId};
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Mutex,
    },
};

#[derive(Debug, Default)]
struct Mappings {
    ids: HashMap<IdKey, SurrogateId>,
    last: SurrogateId,
}

#[derive(Debug, Default)]
/// An identifier registry kept in memory. Ids are assigned from 1 upwards.
///
/// It counts the calls it receives, and can be made unavailable, to observe the caching
/// and failure behaviour of its users.
pub struct MemoryIdRegistry {
    mappings: Mutex<Mappings>,
    unavailable: AtomicBool,
    resolve_calls: AtomicUsize,
    create_calls: AtomicUsize,
}

impl MemoryIdRegistry {
    pub fn new() -> Self {
        Default::default()
    }

    /// Register `key` as `id`, as if done by another collector.
    pub fn insert(&self, key: IdKey, id: SurrogateId) {
        let mut mappings = self.lock();
        mappings.last = mappings.last.max(id);
        mappings.ids.insert(key, id);
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn resolve_calls(&self) -> usize {
        self.resolve_calls.load(Ordering::SeqCst)
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.lock().ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check(&self) -> Result<(), StorageErr> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(StorageErr::Unavailable("registry is unavailable".to_owned()))
        } else {
            Ok(())
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Mappings> {
        self.mappings.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl IdRegistry for MemoryIdRegistry {
    async fn resolve(&self, key: &IdKey) -> Result<Option<SurrogateId>, StorageErr> {
        self.resolve_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        Ok(self.lock().ids.get(key).copied())
    }

    async fn get_or_create(&self, key: &IdKey) -> Result<SurrogateId, StorageErr> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        let mut mappings = self.lock();
        if let Some(id) = mappings.ids.get(key) {
            return Ok(*id);
        }
        mappings.last += 1;
        let id = mappings.last;
        mappings.ids.insert(key.clone(), id);
        Ok(id)
    }
}
