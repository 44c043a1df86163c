use apm_collector_types::{export::async_trait, Outcome};
use std::fmt::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
/// Identifies a stage within a graph. Stable across restarts.
pub struct StageId(u32);

impl StageId {
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u32 {
        self.0
    }
}

impl Display for StageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// How a record travels along an edge.
pub enum Hop {
    /// The downstream worker is invoked inline, by the upstream stage's task.
    Sync,
    /// The record is enqueued onto the downstream stage's queue.
    Async,
}

#[async_trait]
/// The processing logic of a stage.
///
/// On `Success`, the record, as modified by the worker, is passed on to every downstream
/// stage. On `Retryable`, it is enqueued again onto the stage's own queue, until the stage's
/// `max_attempts` is reached.
pub trait Worker<R>: Send + Sync + 'static {
    async fn process(&mut self, record: &mut R) -> Outcome;

    /// Called when the stage's queue has drained, and once more on shutdown.
    async fn on_idle(&mut self) {}
}
