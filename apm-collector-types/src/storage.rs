use crate::{export::async_trait, IdKey, StorageErr, SurrogateId};

#[async_trait]
/// The durable identifier registry. Implemented by the storage layer.
pub trait IdRegistry: Send + Sync {
    /// Look up a mapping without creating it. `Ok(None)` means the key is unknown.
    async fn resolve(&self, key: &IdKey) -> Result<Option<SurrogateId>, StorageErr>;

    /// Look up a mapping, creating it if absent.
    async fn get_or_create(&self, key: &IdKey) -> Result<SurrogateId, StorageErr>;
}

#[async_trait]
/// Persists records in batches. Implemented by the storage layer.
pub trait BatchDao<R>: Send + Sync
where
    R: Send + Sync + 'static,
{
    async fn batch_persist(&self, records: &[R]) -> Result<(), StorageErr>;
}
