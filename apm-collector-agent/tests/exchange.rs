mod util;
use apm_collector_agent::{
    define::REGISTER_GRAPH_ID, register_graph, IdExchanger, IdLookup, ReferenceIdExchanger,
    SpanIdExchanger,
};
use apm_collector_cache::{CacheOptions, IdService, MemoryIdRegistry};
use apm_collector_stream::StageOptions;
use apm_collector_types::{IdKey, Outcome};
use std::{sync::Arc, time::Duration};
use util::*;

static INIT: std::sync::Once = std::sync::Once::new();

// cargo test --test exchange -- --nocapture
#[cfg_attr(feature = "runtime-tokio", tokio::test)]
#[cfg_attr(feature = "runtime-async-std", async_std::test)]
async fn span_exchange() -> anyhow::Result<()> {
    INIT.call_once(env_logger::init);

    let registry = Arc::new(MemoryIdRegistry::new());
    registry.insert(IdKey::network_address("10.0.0.1:3306"), 11);
    registry.insert(IdKey::service_name(2, "/orders"), 12);
    let ids = Arc::new(IdService::new(registry.clone(), &CacheOptions::default()));
    let exchanger = SpanIdExchanger::new(IdLookup::new(ids, None));

    let mut span = span("/orders", "10.0.0.1:3306");
    assert_eq!(exchanger.exchange(&mut span, 2).await, Outcome::Success);
    assert_eq!(span.peer_id, 11);
    assert_eq!(span.operation_name_id, 12);
    assert!(span.peer.is_empty());
    assert!(span.operation_name.is_empty());
    assert!(span.is_resolved());

    // exchanged already, nothing is looked up
    let calls = registry.resolve_calls();
    let before = span.clone();
    assert_eq!(exchanger.exchange(&mut span, 2).await, Outcome::Success);
    assert_eq!(span, before);
    assert_eq!(registry.resolve_calls(), calls);

    // the same operation name in another application is another service
    let mut other = util::span("/orders", "");
    assert!(exchanger.exchange(&mut other, 3).await.is_retryable());
    assert_eq!(other.operation_name, "/orders");
    assert_eq!(other.operation_name_id, 0);
    Ok(())
}

#[cfg_attr(feature = "runtime-tokio", tokio::test)]
#[cfg_attr(feature = "runtime-async-std", async_std::test)]
async fn unknown_is_registered() -> anyhow::Result<()> {
    INIT.call_once(env_logger::init);

    let registry = Arc::new(MemoryIdRegistry::new());
    let ids = Arc::new(IdService::new(registry.clone(), &CacheOptions::default()));
    let registrar = Arc::new(register_graph(
        REGISTER_GRAPH_ID,
        ids.clone(),
        StageOptions::default(),
    )?);
    let exchanger = SpanIdExchanger::new(IdLookup::new(ids, Some(registrar.clone())));

    let mut span = span("/orders", "10.0.0.1:3306");
    assert!(exchanger.exchange(&mut span, 2).await.is_retryable());
    // the span is left as it was
    assert_eq!(span.peer, "10.0.0.1:3306");
    assert_eq!(span.peer_id, 0);

    assert!(wait_until(|| registry.len() == 1).await);
    // the peer is exchanged now, the operation name is registered next
    assert!(exchanger.exchange(&mut span, 2).await.is_retryable());
    assert_eq!(span.peer_id, 1);
    assert!(span.peer.is_empty());

    assert!(wait_until(|| registry.len() == 2).await);
    assert_eq!(exchanger.exchange(&mut span, 2).await, Outcome::Success);
    assert_eq!(span.operation_name_id, 2);

    registrar.shutdown().await;
    Ok(())
}

#[cfg_attr(feature = "runtime-tokio", tokio::test)]
#[cfg_attr(feature = "runtime-async-std", async_std::test)]
async fn reference_exchange() -> anyhow::Result<()> {
    INIT.call_once(env_logger::init);

    let registry = Arc::new(MemoryIdRegistry::new());
    registry.insert(IdKey::InstanceApplication { instance_id: 5 }, 2);
    registry.insert(IdKey::service_name(2, "/entry"), 21);
    registry.insert(IdKey::service_name(2, "/parent"), 22);
    registry.insert(IdKey::network_address("10.0.0.2:8080"), 23);
    let ids = Arc::new(IdService::new(registry.clone(), &CacheOptions::default()));
    let registrar = Arc::new(register_graph(
        REGISTER_GRAPH_ID,
        ids.clone(),
        StageOptions::default(),
    )?);
    let exchanger = ReferenceIdExchanger::new(IdLookup::new(ids, Some(registrar.clone())));

    // service names are scoped by the application of the referenced instance, not by the
    // application of the segment
    let mut reference = reference(5, "/entry", "/parent", "10.0.0.2:8080");
    assert_eq!(exchanger.exchange(&mut reference, 9).await, Outcome::Success);
    assert_eq!(reference.entry_service_id, 21);
    assert_eq!(reference.parent_service_id, 22);
    assert_eq!(reference.network_address_id, 23);
    assert!(reference.is_resolved());

    // an unknown instance cannot be registered here
    let mut orphan = util::reference(6, "/entry", "/parent", "");
    assert!(exchanger.exchange(&mut orphan, 9).await.is_retryable());
    apm_collector_runtime::sleep(Duration::from_millis(100)).await;
    assert_eq!(registry.create_calls(), 0);
    assert_eq!(orphan.entry_service_id, 0);

    registrar.shutdown().await;
    Ok(())
}
