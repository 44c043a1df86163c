//! Ids of the graphs and stages, and the modules the collector is made of.

use apm_collector_core::Module;
use apm_collector_stream::StageId;
use apm_collector_types::GraphId;

pub const SEGMENT_GRAPH_ID: GraphId = GraphId::new(200);
pub const REGISTER_GRAPH_ID: GraphId = GraphId::new(300);

pub const SEGMENT_RECEIVE_STAGE: StageId = StageId::new(116);
pub const SEGMENT_PERSISTENCE_STAGE: StageId = StageId::new(117);
pub const REGISTER_STAGE: StageId = StageId::new(118);

pub const STORAGE_MODULE: Module = Module::new("storage", &["IdRegistry", "SegmentDao"]);
pub const CACHE_MODULE: Module = Module::new("cache", &["IdService"]);
pub const STREAM_MODULE: Module = Module::new("stream", &["GraphManager"]);
pub const BUFFER_MODULE: Module = Module::new("buffer", &["OffsetTracker", "BufferWriter"]);
pub const AGENT_STREAM_MODULE: Module = Module::new("agent_stream", &["SegmentParser"]);
