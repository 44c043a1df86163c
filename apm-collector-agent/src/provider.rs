use crate::{
    define::{
        AGENT_STREAM_MODULE, BUFFER_MODULE, CACHE_MODULE, REGISTER_GRAPH_ID, SEGMENT_GRAPH_ID,
        STORAGE_MODULE, STREAM_MODULE,
    },
    register_graph, segment_graph, AgentErr, IdLookup, ReferenceIdExchanger, SegmentParser,
    SpanIdExchanger,
};
use apm_collector_buffer::{
    BufferOptions, BufferReader, BufferReaderHandle, BufferWriter, FileCursorStore,
    OffsetTracker, DEFAULT_CURSOR_FILE,
};
use apm_collector_cache::{CacheOptions, IdService};
use apm_collector_core::{BootstrapErr, Module, ModuleProvider};
use apm_collector_stream::{BatchOptions, GraphManager, Overflow, StageOptions};
use apm_collector_types::{export::async_trait, BatchDao, IdRegistry, Segment};
use std::sync::{Arc, Mutex, OnceLock};

/// Hands out a service set up by `start`.
fn started<T: Clone>(cell: &OnceLock<T>, module: &'static str) -> Result<T, AgentErr> {
    cell.get().cloned().ok_or(AgentErr::NotStarted(module))
}

/// Provides the storage collaborators, which are set up by the embedding application.
pub struct StorageProvider {
    registry: Arc<dyn IdRegistry>,
    segment_dao: Arc<dyn BatchDao<Segment>>,
}

impl std::fmt::Debug for StorageProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageProvider").finish()
    }
}

impl StorageProvider {
    pub fn new(registry: Arc<dyn IdRegistry>, segment_dao: Arc<dyn BatchDao<Segment>>) -> Self {
        Self {
            registry,
            segment_dao,
        }
    }

    pub fn registry(&self) -> Arc<dyn IdRegistry> {
        self.registry.clone()
    }

    pub fn segment_dao(&self) -> Arc<dyn BatchDao<Segment>> {
        self.segment_dao.clone()
    }
}

#[async_trait]
impl ModuleProvider for StorageProvider {
    fn name(&self) -> &str {
        "storage"
    }

    fn module(&self) -> &Module {
        &STORAGE_MODULE
    }

    fn provided_services(&self) -> Vec<&'static str> {
        vec!["IdRegistry", "SegmentDao"]
    }

    async fn start(&self) -> Result<(), BootstrapErr> {
        Ok(())
    }
}

#[derive(Debug)]
pub struct CacheProvider {
    storage: Arc<StorageProvider>,
    options: CacheOptions,
    service: OnceLock<Arc<IdService>>,
}

impl CacheProvider {
    pub fn new(storage: Arc<StorageProvider>, options: CacheOptions) -> Self {
        Self {
            storage,
            options,
            service: OnceLock::new(),
        }
    }

    pub fn id_service(&self) -> Result<Arc<IdService>, AgentErr> {
        started(&self.service, CACHE_MODULE.name())
    }
}

#[async_trait]
impl ModuleProvider for CacheProvider {
    fn name(&self) -> &str {
        "cache"
    }

    fn module(&self) -> &Module {
        &CACHE_MODULE
    }

    fn required_modules(&self) -> &[&'static str] {
        &["storage"]
    }

    fn provided_services(&self) -> Vec<&'static str> {
        vec!["IdService"]
    }

    async fn start(&self) -> Result<(), BootstrapErr> {
        let service = IdService::new(self.storage.registry(), &self.options);
        self.service.get_or_init(|| Arc::new(service));
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct StreamProvider {
    manager: Arc<GraphManager>,
}

impl StreamProvider {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn graph_manager(&self) -> Arc<GraphManager> {
        self.manager.clone()
    }
}

#[async_trait]
impl ModuleProvider for StreamProvider {
    fn name(&self) -> &str {
        "stream"
    }

    fn module(&self) -> &Module {
        &STREAM_MODULE
    }

    fn provided_services(&self) -> Vec<&'static str> {
        vec!["GraphManager"]
    }

    async fn start(&self) -> Result<(), BootstrapErr> {
        Ok(())
    }
}

#[derive(Debug)]
/// Opens the segment buffer: loads the cursors, then reopens the data file to append to.
pub struct BufferProvider {
    options: BufferOptions,
    offsets: OnceLock<Arc<OffsetTracker>>,
    writer: OnceLock<Arc<BufferWriter>>,
}

impl BufferProvider {
    pub fn new(options: BufferOptions) -> Self {
        Self {
            options,
            offsets: OnceLock::new(),
            writer: OnceLock::new(),
        }
    }

    pub fn options(&self) -> &BufferOptions {
        &self.options
    }

    pub fn offsets(&self) -> Result<Arc<OffsetTracker>, AgentErr> {
        started(&self.offsets, BUFFER_MODULE.name())
    }

    pub fn writer(&self) -> Result<Arc<BufferWriter>, AgentErr> {
        started(&self.writer, BUFFER_MODULE.name())
    }
}

#[async_trait]
impl ModuleProvider for BufferProvider {
    fn name(&self) -> &str {
        "buffer"
    }

    fn module(&self) -> &Module {
        &BUFFER_MODULE
    }

    fn provided_services(&self) -> Vec<&'static str> {
        vec!["OffsetTracker", "BufferWriter"]
    }

    async fn start(&self) -> Result<(), BootstrapErr> {
        let store = FileCursorStore::new(self.options.buffer_dir().join(DEFAULT_CURSOR_FILE));
        let offsets = Arc::new(OffsetTracker::new(store));
        offsets.initialize().await.map_err(AgentErr::from)?;
        let writer = Arc::new(BufferWriter::new(self.options.clone(), offsets.clone()));
        writer.initialize().await.map_err(AgentErr::from)?;
        self.offsets.get_or_init(|| offsets);
        self.writer.get_or_init(|| writer);
        Ok(())
    }
}

#[derive(Debug)]
/// Wires the segment pipeline: the register graph, the segment graph and the parser. Once
/// every module has started, the buffer reader is spawned to replay buffered segments.
pub struct AgentStreamProvider {
    storage: Arc<StorageProvider>,
    cache: Arc<CacheProvider>,
    stream: Arc<StreamProvider>,
    buffer: Arc<BufferProvider>,
    stage_options: StageOptions,
    batch_options: BatchOptions,
    parser: OnceLock<Arc<SegmentParser>>,
    reader: Mutex<Option<BufferReaderHandle>>,
}

impl AgentStreamProvider {
    pub fn new(
        storage: Arc<StorageProvider>,
        cache: Arc<CacheProvider>,
        stream: Arc<StreamProvider>,
        buffer: Arc<BufferProvider>,
        stage_options: StageOptions,
        batch_options: BatchOptions,
    ) -> Self {
        Self {
            storage,
            cache,
            stream,
            buffer,
            stage_options,
            batch_options,
            parser: OnceLock::new(),
            reader: Mutex::new(None),
        }
    }

    pub fn parser(&self) -> Result<Arc<SegmentParser>, AgentErr> {
        started(&self.parser, AGENT_STREAM_MODULE.name())
    }

    /// Stop replaying the buffer. The tick in progress, if any, completes first.
    pub async fn stop_reader(&self) -> Result<(), AgentErr> {
        let handle = self.reader.lock().ok().and_then(|mut r| r.take());
        if let Some(handle) = handle {
            handle.stop().await?;
        }
        Ok(())
    }

    fn register_options(&self) -> StageOptions {
        let mut options = self.stage_options.clone();
        options.set_overflow(Overflow::Drop).set_max_attempts(3);
        options
    }
}

#[async_trait]
impl ModuleProvider for AgentStreamProvider {
    fn name(&self) -> &str {
        "agent_stream"
    }

    fn module(&self) -> &Module {
        &AGENT_STREAM_MODULE
    }

    fn required_modules(&self) -> &[&'static str] {
        &["storage", "cache", "stream", "buffer"]
    }

    fn provided_services(&self) -> Vec<&'static str> {
        vec!["SegmentParser"]
    }

    async fn start(&self) -> Result<(), BootstrapErr> {
        let ids = self.cache.id_service()?;
        let graphs = self.stream.graph_manager();

        let register = graphs
            .create_if_absent(REGISTER_GRAPH_ID, || {
                register_graph(REGISTER_GRAPH_ID, ids.clone(), self.register_options())
            })
            .map_err(AgentErr::from)?;
        let segments = graphs
            .create_if_absent(SEGMENT_GRAPH_ID, || {
                segment_graph(
                    SEGMENT_GRAPH_ID,
                    self.storage.segment_dao(),
                    self.stage_options.clone(),
                    self.batch_options.clone(),
                )
            })
            .map_err(AgentErr::from)?;

        let lookup = IdLookup::new(ids, Some(register));
        let parser = SegmentParser::new(
            SpanIdExchanger::new(lookup.clone()),
            ReferenceIdExchanger::new(lookup),
            segments,
            self.buffer.writer()?,
        );
        self.parser.get_or_init(|| Arc::new(parser));
        Ok(())
    }

    async fn notify_after_completed(&self) -> Result<(), BootstrapErr> {
        let reader = BufferReader::new(
            self.buffer.options().clone(),
            self.buffer.offsets()?,
            self.parser()?,
        );
        let handle = reader.spawn();
        let previous = match self.reader.lock() {
            Ok(mut slot) => slot.replace(handle),
            Err(_) => None,
        };
        if let Some(previous) = previous {
            previous.stop().await.map_err(AgentErr::from)?;
        }
        Ok(())
    }
}
