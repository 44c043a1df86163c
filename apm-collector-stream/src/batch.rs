use crate::{BatchOptions, Worker};
use apm_collector_types::{export::async_trait, BatchDao, Outcome, StreamRecord};
use std::sync::Arc;

/// A sink stage persisting records in batches through a [`BatchDao`].
///
/// A batch is persisted once it is full, or when the stage's queue drains. If persisting
/// fails, the batch is kept and persisted again along with the next one; beyond
/// `max_pending` records, the oldest are dropped.
pub struct BatchWorker<R, D: ?Sized> {
    dao: Arc<D>,
    options: BatchOptions,
    pending: Vec<R>,
}

impl<R, D: ?Sized> std::fmt::Debug for BatchWorker<R, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchWorker")
            .field("options", &self.options)
            .field("pending", &self.pending.len())
            .finish()
    }
}

impl<R: StreamRecord, D: BatchDao<R> + ?Sized> BatchWorker<R, D> {
    pub fn new(dao: Arc<D>, options: BatchOptions) -> Self {
        Self {
            dao,
            options,
            pending: Vec::new(),
        }
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    async fn flush(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        match self.dao.batch_persist(&self.pending).await {
            Ok(()) => {
                log::debug!("Persisted {} {}", self.pending.len(), R::RECORD_TYPE);
                self.pending.clear();
            }
            Err(e) => {
                log::error!(
                    "Failed to persist {} {}: {e}",
                    self.pending.len(),
                    R::RECORD_TYPE
                );
                let max = self.options.max_pending();
                if self.pending.len() > max {
                    let excess = self.pending.len() - max;
                    self.pending.drain(..excess);
                    log::warn!("Dropped the {excess} oldest {}", R::RECORD_TYPE);
                }
            }
        }
    }
}

#[async_trait]
impl<R: StreamRecord, D: BatchDao<R> + ?Sized + 'static> Worker<R> for BatchWorker<R, D> {
    async fn process(&mut self, record: &mut R) -> Outcome {
        self.pending.push(record.clone());
        if self.pending.len() >= self.options.batch_size() {
            self.flush().await;
        }
        Outcome::Success
    }

    async fn on_idle(&mut self) {
        self.flush().await;
    }
}
