use crate::define::{SEGMENT_PERSISTENCE_STAGE, SEGMENT_RECEIVE_STAGE};
use apm_collector_stream::{
    BatchOptions, BatchWorker, Graph, GraphBuilder, GraphErr, Hop, StageOptions, Worker,
};
use apm_collector_types::{export::async_trait, BatchDao, GraphId, Outcome, Segment};
use std::sync::Arc;

#[derive(Debug, Default)]
/// Entry stage of the segment graph. Only segments whose identifiers are all exchanged
/// move on to persistence.
pub struct SegmentReceiver {
    received: u64,
}

impl SegmentReceiver {
    pub fn new() -> Self {
        Default::default()
    }
}

#[async_trait]
impl Worker<Segment> for SegmentReceiver {
    async fn process(&mut self, segment: &mut Segment) -> Outcome {
        if !segment.is_resolved() {
            return Outcome::fatal(format!(
                "Segment {} has unresolved identifiers",
                segment.segment_id
            ));
        }
        self.received += 1;
        log::trace!("Received segment {} ({})", segment.segment_id, self.received);
        Outcome::Success
    }
}

/// `receive -> persist`, the persistence stage draining asynchronously in batches.
pub fn segment_graph(
    graph_id: GraphId,
    dao: Arc<dyn BatchDao<Segment>>,
    stage_options: StageOptions,
    batch_options: BatchOptions,
) -> Result<Graph<Segment>, GraphErr> {
    GraphBuilder::new(graph_id)
        .stage(
            SEGMENT_RECEIVE_STAGE,
            "segment_receive",
            SegmentReceiver::new(),
            stage_options.clone(),
        )
        .stage(
            SEGMENT_PERSISTENCE_STAGE,
            "segment_persistence",
            BatchWorker::<Segment, dyn BatchDao<Segment>>::new(dao, batch_options),
            stage_options,
        )
        .edge(SEGMENT_RECEIVE_STAGE, SEGMENT_PERSISTENCE_STAGE, Hop::Async)
        .build()
}
