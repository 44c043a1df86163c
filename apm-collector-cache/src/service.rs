use crate::{CacheErr, CacheOptions, IdCache};
use apm_collector_types::{IdKey, IdRegistry, SurrogateId, UNKNOWN_ID};
use std::sync::Arc;

/// Resolves identifier keys to surrogate ids, through a bounded cache in front of the
/// registry.
pub struct IdService {
    cache: IdCache,
    registry: Arc<dyn IdRegistry>,
}

impl std::fmt::Debug for IdService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdService")
            .field("cache", &self.cache)
            .finish()
    }
}

impl IdService {
    pub fn new(registry: Arc<dyn IdRegistry>, options: &CacheOptions) -> Self {
        Self {
            cache: IdCache::new(options),
            registry,
        }
    }

    pub fn cache(&self) -> &IdCache {
        &self.cache
    }

    /// Look up a key without creating it. A cache miss queries the registry directly, and a
    /// registry hit is cached. `None` means the key is not registered (yet).
    pub async fn resolve(&self, key: &IdKey) -> Result<Option<SurrogateId>, CacheErr> {
        if let Some(id) = self.cache.get(key) {
            return Ok(Some(id));
        }
        let id = self
            .registry
            .resolve(key)
            .await
            .map_err(|source| CacheErr::Registry {
                key: key.clone(),
                source,
            })?;
        match id {
            Some(id) if id != UNKNOWN_ID => {
                log::trace!("Resolved {key} to {id}");
                self.cache.put(key.clone(), id);
                Ok(Some(id))
            }
            _ => Ok(None),
        }
    }

    /// Look up a key, registering it if absent. The id is cached.
    pub async fn get_or_create(&self, key: &IdKey) -> Result<SurrogateId, CacheErr> {
        if let Some(id) = self.cache.get(key) {
            return Ok(id);
        }
        let id = self
            .registry
            .get_or_create(key)
            .await
            .map_err(|source| CacheErr::Registry {
                key: key.clone(),
                source,
            })?;
        if id == UNKNOWN_ID {
            return Err(CacheErr::ReservedId(key.clone()));
        }
        log::debug!("Registered {key} as {id}");
        self.cache.put(key.clone(), id);
        Ok(id)
    }

    pub async fn application_id(&self, code: &str) -> Result<Option<SurrogateId>, CacheErr> {
        self.resolve(&IdKey::Application {
            code: code.to_owned(),
        })
        .await
    }

    /// The application owning an application instance.
    pub async fn instance_application_id(
        &self,
        instance_id: SurrogateId,
    ) -> Result<Option<SurrogateId>, CacheErr> {
        self.resolve(&IdKey::InstanceApplication { instance_id })
            .await
    }

    pub async fn service_id(
        &self,
        application_id: SurrogateId,
        name: &str,
    ) -> Result<Option<SurrogateId>, CacheErr> {
        self.resolve(&IdKey::service_name(application_id, name))
            .await
    }

    pub async fn network_address_id(&self, address: &str) -> Result<Option<SurrogateId>, CacheErr> {
        self.resolve(&IdKey::network_address(address)).await
    }
}
