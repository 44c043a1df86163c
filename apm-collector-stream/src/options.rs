use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_QUEUE_SIZE: usize = 1024;
pub const DEFAULT_BATCH_SIZE: usize = 512;
pub const DEFAULT_MAX_PENDING: usize = 8192;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
/// What happens when a record is offered to a full queue.
pub enum Overflow {
    /// Wait for room, up to the given duration, then drop the record.
    Block(Duration),
    /// Drop the record right away.
    Drop,
}

impl Default for Overflow {
    fn default() -> Self {
        Self::Block(Duration::from_millis(100))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StageOptions {
    queue_size: usize,
    overflow: Overflow,
    max_attempts: u32,
}

impl Default for StageOptions {
    fn default() -> Self {
        Self {
            queue_size: DEFAULT_QUEUE_SIZE,
            overflow: Overflow::default(),
            max_attempts: 1,
        }
    }
}

impl StageOptions {
    pub fn queue_size(&self) -> usize {
        self.queue_size
    }

    /// Capacity of the stage's queue. At least 1.
    pub fn set_queue_size(&mut self, size: usize) -> &mut Self {
        self.queue_size = size.max(1);
        self
    }

    pub fn overflow(&self) -> Overflow {
        self.overflow
    }

    pub fn set_overflow(&mut self, overflow: Overflow) -> &mut Self {
        self.overflow = overflow;
        self
    }

    /// How many times a record is processed before it is given up, when the worker keeps
    /// answering `Retryable`. 1 means no retry.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn set_max_attempts(&mut self, attempts: u32) -> &mut Self {
        self.max_attempts = attempts.max(1);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchOptions {
    batch_size: usize,
    max_pending: usize,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            max_pending: DEFAULT_MAX_PENDING,
        }
    }
}

impl BatchOptions {
    /// A batch is persisted as soon as it has this many records, or when the queue drains.
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn set_batch_size(&mut self, size: usize) -> &mut Self {
        self.batch_size = size.max(1);
        self
    }

    /// Records kept while the DAO keeps failing. Beyond that, the oldest are dropped.
    pub fn max_pending(&self) -> usize {
        self.max_pending
    }

    pub fn set_max_pending(&mut self, max: usize) -> &mut Self {
        self.max_pending = max;
        self
    }
}
