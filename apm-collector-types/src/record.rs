use std::fmt::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
/// Identifies a worker graph.
pub struct GraphId(u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
/// Names the record type flowing through a worker graph. Together with [`GraphId`] it keys
/// the graph registry, so the same graph id can be reused for different record types.
pub struct RecordType(&'static str);

impl GraphId {
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u32 {
        self.0
    }
}

impl RecordType {
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    pub fn name(&self) -> &'static str {
        self.0
    }
}

impl Display for GraphId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "GraphId({})", self.0)
    }
}

impl Display for RecordType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Common interface of records processed by worker graphs.
pub trait StreamRecord: Clone + Send + Sync + 'static {
    const RECORD_TYPE: RecordType;

    /// A stable id, used to trace the record through the stages.
    fn record_id(&self) -> String;
}
