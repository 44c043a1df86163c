use crate::{
    AgentErr, AgentStreamProvider, BufferProvider, CacheProvider, SegmentParser, Source,
    StorageProvider, StreamProvider,
};
use apm_collector_buffer::{BufferOptions, BufferWriter};
use apm_collector_cache::{CacheOptions, IdService};
use apm_collector_core::{BootstrapFlow, ModuleProvider};
use apm_collector_stream::{BatchOptions, GraphManager, StageOptions};
use apm_collector_types::{BatchDao, IdRegistry, Outcome, Segment};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorOptions {
    buffer: BufferOptions,
    cache: CacheOptions,
    stage: StageOptions,
    batch: BatchOptions,
}

impl CollectorOptions {
    pub fn buffer(&self) -> &BufferOptions {
        &self.buffer
    }

    pub fn buffer_mut(&mut self) -> &mut BufferOptions {
        &mut self.buffer
    }

    pub fn cache(&self) -> &CacheOptions {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut CacheOptions {
        &mut self.cache
    }

    pub fn stage(&self) -> &StageOptions {
        &self.stage
    }

    pub fn stage_mut(&mut self) -> &mut StageOptions {
        &mut self.stage
    }

    pub fn batch(&self) -> &BatchOptions {
        &self.batch
    }

    pub fn batch_mut(&mut self) -> &mut BatchOptions {
        &mut self.batch
    }
}

/// A running collector: the modules, started in dependency order.
pub struct Collector {
    flow: BootstrapFlow,
    cache: Arc<CacheProvider>,
    stream: Arc<StreamProvider>,
    buffer: Arc<BufferProvider>,
    agent: Arc<AgentStreamProvider>,
}

impl std::fmt::Debug for Collector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collector").field("flow", &self.flow).finish()
    }
}

impl Collector {
    /// Start every module, then replay the buffer in the background.
    pub async fn start(
        options: CollectorOptions,
        registry: Arc<dyn IdRegistry>,
        segment_dao: Arc<dyn BatchDao<Segment>>,
    ) -> Result<Self, AgentErr> {
        let CollectorOptions {
            buffer,
            cache,
            stage,
            batch,
        } = options;
        let storage = Arc::new(StorageProvider::new(registry, segment_dao));
        let cache = Arc::new(CacheProvider::new(storage.clone(), cache));
        let stream = Arc::new(StreamProvider::new());
        let buffer = Arc::new(BufferProvider::new(buffer));
        let agent = Arc::new(AgentStreamProvider::new(
            storage.clone(),
            cache.clone(),
            stream.clone(),
            buffer.clone(),
            stage,
            batch,
        ));

        let providers: Vec<Arc<dyn ModuleProvider>> = vec![
            agent.clone(),
            buffer.clone(),
            stream.clone(),
            cache.clone(),
            storage,
        ];
        let flow = BootstrapFlow::new(providers)?;
        log::info!("Module sequence: {:?}", flow.sequence());
        flow.start().await?;
        flow.notify_after_completed().await?;

        Ok(Self {
            flow,
            cache,
            stream,
            buffer,
            agent,
        })
    }

    /// Provider names, in startup order.
    pub fn sequence(&self) -> Vec<&str> {
        self.flow.sequence()
    }

    pub fn parser(&self) -> Result<Arc<SegmentParser>, AgentErr> {
        self.agent.parser()
    }

    pub fn id_service(&self) -> Result<Arc<IdService>, AgentErr> {
        self.cache.id_service()
    }

    pub fn graph_manager(&self) -> Arc<GraphManager> {
        self.stream.graph_manager()
    }

    pub fn buffer_writer(&self) -> Result<Arc<BufferWriter>, AgentErr> {
        self.buffer.writer()
    }

    /// Receive a serialized segment from an agent.
    pub async fn ingest(&self, bytes: &[u8]) -> Outcome {
        match self.parser() {
            Ok(parser) => parser.parse(bytes, Source::Agent).await,
            Err(e) => Outcome::retryable(e.to_string()),
        }
    }

    /// Stop replaying the buffer, drain the graphs, then close the buffer.
    pub async fn shutdown(&self) -> Result<(), AgentErr> {
        self.agent.stop_reader().await?;
        self.stream.graph_manager().shutdown().await;
        if let Ok(writer) = self.buffer.writer() {
            writer.flush().await?;
            writer.close().await;
        }
        log::info!("Collector stopped");
        Ok(())
    }
}
