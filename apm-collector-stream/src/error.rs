use crate::StageId;
use apm_collector_types::{CollectorResult, GraphId, RecordType};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphErr {
    #[error("Stage {0} is defined more than once")]
    DuplicateStage(StageId),
    #[error("Stage {0} is not defined")]
    UnknownStage(StageId),
    #[error("Stage {0} is part of a cycle")]
    Cycle(StageId),
    #[error("Graph has no stage")]
    Empty,
    #[error("Graph must have exactly one entry stage, found {0:?}")]
    EntryStage(Vec<StageId>),
    #[error("Graph {graph_id} of {record_type} holds a different type of record")]
    TypeMismatch {
        graph_id: GraphId,
        record_type: RecordType,
    },
}

pub type GraphResult<T> = CollectorResult<T, GraphErr>;
