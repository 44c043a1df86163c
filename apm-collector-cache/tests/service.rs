use apm_collector_cache::{CacheErr, CacheOptions, IdService, MemoryIdRegistry};
use apm_collector_types::IdKey;
use std::sync::Arc;

static INIT: std::sync::Once = std::sync::Once::new();

fn service(registry: &Arc<MemoryIdRegistry>) -> IdService {
    IdService::new(registry.clone(), &CacheOptions::default())
}

// cargo test --test service -- --nocapture
#[tokio::test]
async fn cache_coherency() -> anyhow::Result<()> {
    INIT.call_once(env_logger::init);

    let registry = Arc::new(MemoryIdRegistry::new());
    // ids 1 to 6 are taken already
    registry.insert(IdKey::network_address("10.0.0.6:80"), 6);
    let service = service(&registry);
    let key = IdKey::service_name(3, "/orders");

    assert_eq!(service.get_or_create(&key).await?, 7);
    assert_eq!(registry.create_calls(), 1);
    assert_eq!(service.resolve(&key).await?, Some(7));
    assert_eq!(service.service_id(3, "/orders").await?, Some(7));
    assert_eq!(registry.resolve_calls(), 0);

    // cached too
    assert_eq!(service.get_or_create(&key).await?, 7);
    assert_eq!(registry.create_calls(), 1);
    Ok(())
}

#[tokio::test]
async fn miss_goes_to_registry() -> anyhow::Result<()> {
    INIT.call_once(env_logger::init);

    let registry = Arc::new(MemoryIdRegistry::new());
    let service = service(&registry);

    assert_eq!(service.network_address_id("10.0.0.1:80").await?, None);
    assert_eq!(registry.resolve_calls(), 1);
    // a miss is not cached
    assert_eq!(service.network_address_id("10.0.0.1:80").await?, None);
    assert_eq!(registry.resolve_calls(), 2);

    // registered elsewhere
    registry.insert(IdKey::network_address("10.0.0.1:80"), 42);
    assert_eq!(service.network_address_id("10.0.0.1:80").await?, Some(42));
    assert_eq!(service.network_address_id("10.0.0.1:80").await?, Some(42));
    assert_eq!(registry.resolve_calls(), 3);
    assert_eq!(registry.create_calls(), 0);
    assert_eq!(service.cache().len(), 1);
    Ok(())
}

#[tokio::test]
async fn registry_unavailable() -> anyhow::Result<()> {
    INIT.call_once(env_logger::init);

    let registry = Arc::new(MemoryIdRegistry::new());
    let service = service(&registry);
    registry.insert(IdKey::InstanceApplication { instance_id: 9 }, 2);
    assert_eq!(service.instance_application_id(9).await?, Some(2));

    registry.set_unavailable(true);
    // cached mappings are still served
    assert_eq!(service.instance_application_id(9).await?, Some(2));
    assert!(matches!(
        service.application_id("shop").await,
        Err(CacheErr::Registry { .. })
    ));
    assert!(matches!(
        service
            .get_or_create(&IdKey::Application {
                code: "shop".to_owned()
            })
            .await,
        Err(CacheErr::Registry { .. })
    ));

    registry.set_unavailable(false);
    let id = service
        .get_or_create(&IdKey::Application {
            code: "shop".to_owned(),
        })
        .await?;
    assert_eq!(service.application_id("shop").await?, Some(id));
    Ok(())
}
