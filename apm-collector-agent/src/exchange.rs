use crate::RegisterRequest;
use apm_collector_cache::IdService;
use apm_collector_stream::Graph;
use apm_collector_types::{
    export::async_trait, IdKey, Outcome, SegmentReference, Span, SurrogateId, UNKNOWN_ID,
};
use std::sync::Arc;

#[async_trait]
/// Replaces the textual identifiers of a record with surrogate ids.
///
/// Exchanging is idempotent: a field whose id is set already is left alone, so a record
/// can be exchanged again after a partial failure.
pub trait IdExchanger<T>: Send + Sync {
    async fn exchange(&self, record: &mut T, application_id: SurrogateId) -> Outcome;
}

#[derive(Debug, Clone)]
/// Looks identifiers up. An unknown identifier is submitted for registration, and reported
/// as retryable.
pub struct IdLookup {
    ids: Arc<IdService>,
    registrar: Option<Arc<Graph<RegisterRequest>>>,
}

impl IdLookup {
    pub fn new(ids: Arc<IdService>, registrar: Option<Arc<Graph<RegisterRequest>>>) -> Self {
        Self { ids, registrar }
    }

    pub async fn lookup(&self, key: IdKey) -> Result<SurrogateId, Outcome> {
        match self.ids.resolve(&key).await {
            Ok(Some(id)) => Ok(id),
            Ok(None) => {
                let reason = format!("{key} is not registered yet");
                self.register(key).await;
                Err(Outcome::Retryable(reason))
            }
            Err(e) => Err(Outcome::retryable(e.to_string())),
        }
    }

    async fn register(&self, key: IdKey) {
        // instances are registered by the agents themselves
        if matches!(key, IdKey::InstanceApplication { .. }) {
            return;
        }
        if let Some(registrar) = self.registrar.as_ref() {
            // a full queue drops the request; the next retry submits it again
            let _ = registrar.submit(RegisterRequest { key }).await;
        }
    }

    async fn application_of_instance(&self, instance_id: SurrogateId) -> Result<SurrogateId, Outcome> {
        self.lookup(IdKey::InstanceApplication { instance_id }).await
    }
}

#[derive(Debug, Clone)]
/// Exchanges the peer address and the operation name of a span.
pub struct SpanIdExchanger {
    lookup: IdLookup,
}

impl SpanIdExchanger {
    pub fn new(lookup: IdLookup) -> Self {
        Self { lookup }
    }
}

#[async_trait]
impl IdExchanger<Span> for SpanIdExchanger {
    async fn exchange(&self, span: &mut Span, application_id: SurrogateId) -> Outcome {
        if span.peer_id == UNKNOWN_ID && !span.peer.is_empty() {
            match self.lookup.lookup(IdKey::network_address(&span.peer)).await {
                Ok(id) => {
                    span.peer_id = id;
                    span.peer.clear();
                }
                Err(outcome) => {
                    log::debug!("peer: {} in application: {application_id} exchange failed", span.peer);
                    return outcome;
                }
            }
        }

        if span.operation_name_id == UNKNOWN_ID && !span.operation_name.is_empty() {
            match self
                .lookup
                .lookup(IdKey::service_name(application_id, &span.operation_name))
                .await
            {
                Ok(id) => {
                    span.operation_name_id = id;
                    span.operation_name.clear();
                }
                Err(outcome) => {
                    log::debug!(
                        "service name: {} from application id: {application_id} exchange failed",
                        span.operation_name
                    );
                    return outcome;
                }
            }
        }

        Outcome::Success
    }
}

#[derive(Debug, Clone)]
/// Exchanges the entry service, parent service and network address of a segment reference.
/// Service names are scoped by the application owning the referenced instance.
pub struct ReferenceIdExchanger {
    lookup: IdLookup,
}

impl ReferenceIdExchanger {
    pub fn new(lookup: IdLookup) -> Self {
        Self { lookup }
    }

    async fn service_id(&self, instance_id: SurrogateId, name: &str) -> Result<SurrogateId, Outcome> {
        let application_id = self.lookup.application_of_instance(instance_id).await?;
        self.lookup
            .lookup(IdKey::service_name(application_id, name))
            .await
    }
}

#[async_trait]
impl IdExchanger<SegmentReference> for ReferenceIdExchanger {
    async fn exchange(
        &self,
        reference: &mut SegmentReference,
        application_id: SurrogateId,
    ) -> Outcome {
        if reference.entry_service_id == UNKNOWN_ID && !reference.entry_service_name.is_empty() {
            match self
                .service_id(
                    reference.entry_application_instance_id,
                    &reference.entry_service_name,
                )
                .await
            {
                Ok(id) => {
                    reference.entry_service_id = id;
                    reference.entry_service_name.clear();
                }
                Err(outcome) => {
                    log::debug!(
                        "entry service name: {} from application instance id: {} exchange failed",
                        reference.entry_service_name,
                        reference.entry_application_instance_id
                    );
                    return outcome;
                }
            }
        }

        if reference.parent_service_id == UNKNOWN_ID && !reference.parent_service_name.is_empty() {
            match self
                .service_id(
                    reference.parent_application_instance_id,
                    &reference.parent_service_name,
                )
                .await
            {
                Ok(id) => {
                    reference.parent_service_id = id;
                    reference.parent_service_name.clear();
                }
                Err(outcome) => {
                    log::debug!(
                        "parent service name: {} from application instance id: {} exchange failed",
                        reference.parent_service_name,
                        reference.parent_application_instance_id
                    );
                    return outcome;
                }
            }
        }

        if reference.network_address_id == UNKNOWN_ID && !reference.network_address.is_empty() {
            match self
                .lookup
                .lookup(IdKey::network_address(&reference.network_address))
                .await
            {
                Ok(id) => {
                    reference.network_address_id = id;
                    reference.network_address.clear();
                }
                Err(outcome) => {
                    log::debug!(
                        "network address: {} from application id: {application_id} exchange failed",
                        reference.network_address
                    );
                    return outcome;
                }
            }
        }

        Outcome::Success
    }
}
