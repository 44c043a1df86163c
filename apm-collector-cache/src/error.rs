use apm_collector_types::{CollectorResult, IdKey, StorageErr};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CacheErr {
    #[error("Registry failed to resolve {key}: {source}")]
    Registry {
        key: IdKey,
        #[source]
        source: StorageErr,
    },
    #[error("Registry assigned the reserved id 0 to {0}")]
    ReservedId(IdKey),
}

pub type CacheResult<T> = CollectorResult<T, CacheErr>;
