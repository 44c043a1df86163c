use crate::define::REGISTER_STAGE;
use apm_collector_cache::IdService;
use apm_collector_stream::{Graph, GraphBuilder, GraphErr, StageOptions, Worker};
use apm_collector_types::{export::async_trait, GraphId, IdKey, Outcome, RecordType, StreamRecord};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
/// Asks for an identifier mapping to be created.
pub struct RegisterRequest {
    pub key: IdKey,
}

impl StreamRecord for RegisterRequest {
    const RECORD_TYPE: RecordType = RecordType::new("register");

    fn record_id(&self) -> String {
        self.key.to_string()
    }
}

/// Creates identifier mappings off the hot path, so that a later exchange succeeds.
pub struct RegisterWorker {
    ids: Arc<IdService>,
}

impl RegisterWorker {
    pub fn new(ids: Arc<IdService>) -> Self {
        Self { ids }
    }
}

#[async_trait]
impl Worker<RegisterRequest> for RegisterWorker {
    async fn process(&mut self, request: &mut RegisterRequest) -> Outcome {
        match self.ids.get_or_create(&request.key).await {
            Ok(_) => Outcome::Success,
            Err(e) => Outcome::retryable(e.to_string()),
        }
    }
}

pub fn register_graph(
    graph_id: GraphId,
    ids: Arc<IdService>,
    options: StageOptions,
) -> Result<Graph<RegisterRequest>, GraphErr> {
    GraphBuilder::new(graph_id)
        .stage(REGISTER_STAGE, "register", RegisterWorker::new(ids), options)
        .build()
}
