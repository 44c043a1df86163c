mod util;
use util::*;

use apm_collector_stream::{GraphBuilder, GraphErr, GraphManager, StageId, StageOptions};
use apm_collector_types::{GraphId, Outcome, RecordType, StreamRecord};
use std::sync::Arc;

static INIT: std::sync::Once = std::sync::Once::new();

const GRAPH: GraphId = GraphId::new(7);
const STAGE: StageId = StageId::new(1);

#[derive(Debug, Clone)]
struct Impostor;

impl StreamRecord for Impostor {
    const RECORD_TYPE: RecordType = RecordType::new("num");

    fn record_id(&self) -> String {
        "impostor".to_owned()
    }
}

struct Sink;

#[apm_collector_types::export::async_trait]
impl apm_collector_stream::Worker<Impostor> for Sink {
    async fn process(&mut self, _: &mut Impostor) -> Outcome {
        Outcome::Success
    }
}

// cargo test --test manager -- --nocapture
#[cfg_attr(feature = "runtime-tokio", tokio::test)]
#[cfg_attr(feature = "runtime-async-std", async_std::test)]
async fn create_if_absent() -> anyhow::Result<()> {
    INIT.call_once(env_logger::init);

    let manager = GraphManager::new();
    let collect = Collect::default();
    let mut builds = 0;
    let first = manager.create_if_absent(GRAPH, || {
        builds += 1;
        GraphBuilder::new(GRAPH)
            .stage(STAGE, "collect", collect.clone(), StageOptions::default())
            .build()
    })?;
    let second = manager.create_if_absent::<Num, _>(GRAPH, || {
        builds += 1;
        Err(GraphErr::Empty)
    })?;
    assert_eq!(builds, 1);
    assert!(Arc::ptr_eq(&first, &second));
    assert!(manager.find::<Num>(GRAPH)?.is_some());
    assert!(manager.find::<Num>(GraphId::new(8))?.is_none());
    assert_eq!(manager.len(), 1);

    // same key, different type
    assert!(matches!(
        manager.find::<Impostor>(GRAPH),
        Err(GraphErr::TypeMismatch { .. })
    ));
    assert!(matches!(
        manager.create_if_absent(GRAPH, || GraphBuilder::new(GRAPH)
            .stage(STAGE, "sink", Sink, StageOptions::default())
            .build()),
        Err(GraphErr::TypeMismatch { .. })
    ));

    assert!(first.submit(Num(5)).await.is_success());
    assert!(wait_until(|| collect.seen() == vec![5]).await);

    manager.shutdown().await;
    assert!(manager.is_empty());
    assert!(first.submit(Num(6)).await.is_retryable());
    Ok(())
}
