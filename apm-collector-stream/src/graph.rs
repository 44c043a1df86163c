use crate::{GraphErr, Hop, Overflow, StageId, StageOptions, Worker};
use apm_collector_runtime::{spawn_task, timeout, AsyncMutex, TaskHandle};
use apm_collector_types::{
    export::{
        async_trait,
        futures::{future::BoxFuture, select, FutureExt},
    },
    GraphId, Outcome, StreamRecord,
};
use flume::{bounded, Receiver, Sender, TrySendError};
use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex},
};

struct Envelope<R> {
    record: R,
    attempts: u32,
}

impl<R> Envelope<R> {
    fn new(record: R) -> Self {
        Self {
            record,
            attempts: 0,
        }
    }
}

enum Refused {
    Full,
    Closed,
}

struct StageDef<R> {
    id: StageId,
    name: String,
    options: StageOptions,
    worker: Box<dyn Worker<R>>,
}

/// Declares the stages of a graph and the edges between them.
///
/// ```ignore
/// let graph = GraphBuilder::new(GraphId::new(1))
///     .stage(RECEIVE, "receive", Receiver::new(), StageOptions::default())
///     .stage(PERSIST, "persist", BatchWorker::new(dao, BatchOptions::default()), StageOptions::default())
///     .edge(RECEIVE, PERSIST, Hop::Async)
///     .build()?;
/// ```
pub struct GraphBuilder<R> {
    graph_id: GraphId,
    stages: Vec<StageDef<R>>,
    edges: Vec<(StageId, StageId, Hop)>,
}

impl<R> std::fmt::Debug for GraphBuilder<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphBuilder")
            .field("graph_id", &self.graph_id)
            .field("stages", &self.stages.iter().map(|s| s.id).collect::<Vec<_>>())
            .field("edges", &self.edges)
            .finish()
    }
}

impl<R: StreamRecord> GraphBuilder<R> {
    pub fn new(graph_id: GraphId) -> Self {
        Self {
            graph_id,
            stages: Vec::new(),
            edges: Vec::new(),
        }
    }

    pub fn stage<W: Worker<R>>(
        mut self,
        id: StageId,
        name: &str,
        worker: W,
        options: StageOptions,
    ) -> Self {
        self.stages.push(StageDef {
            id,
            name: name.to_owned(),
            options,
            worker: Box::new(worker),
        });
        self
    }

    pub fn edge(mut self, from: StageId, to: StageId, hop: Hop) -> Self {
        self.edges.push((from, to, hop));
        self
    }

    /// Validate the graph and start one consumer task per stage. The graph must be a DAG
    /// with exactly one entry stage, i.e. one stage without incoming edges.
    pub fn build(self) -> Result<Graph<R>, GraphErr> {
        let Self {
            graph_id,
            stages: defs,
            edges,
        } = self;

        if defs.is_empty() {
            return Err(GraphErr::Empty);
        }
        let mut index = HashMap::new();
        for (i, def) in defs.iter().enumerate() {
            if index.insert(def.id, i).is_some() {
                return Err(GraphErr::DuplicateStage(def.id));
            }
        }

        let mut next: Vec<Vec<(usize, Hop)>> = vec![Vec::new(); defs.len()];
        let mut in_degree = vec![0usize; defs.len()];
        for (from, to, hop) in edges {
            let f = *index.get(&from).ok_or(GraphErr::UnknownStage(from))?;
            let t = *index.get(&to).ok_or(GraphErr::UnknownStage(to))?;
            next[f].push((t, hop));
            in_degree[t] += 1;
        }

        // Kahn's algorithm
        let mut degree = in_degree.clone();
        let mut queue: VecDeque<usize> = (0..defs.len()).filter(|&i| degree[i] == 0).collect();
        let mut visited = 0;
        while let Some(i) = queue.pop_front() {
            visited += 1;
            for &(t, _) in next[i].iter() {
                degree[t] -= 1;
                if degree[t] == 0 {
                    queue.push_back(t);
                }
            }
        }
        if visited < defs.len() {
            let stuck = (0..defs.len()).find(|&i| degree[i] > 0).unwrap_or_default();
            return Err(GraphErr::Cycle(defs[stuck].id));
        }

        let entries: Vec<usize> = (0..defs.len()).filter(|&i| in_degree[i] == 0).collect();
        if entries.len() != 1 {
            return Err(GraphErr::EntryStage(
                entries.iter().map(|&i| defs[i].id).collect(),
            ));
        }
        let entry = entries[0];

        let mut stages = Vec::with_capacity(defs.len());
        let mut receivers = Vec::with_capacity(defs.len());
        for (def, next) in defs.into_iter().zip(next) {
            let (sender, receiver) = bounded(def.options.queue_size());
            receivers.push(receiver);
            stages.push(Stage {
                id: def.id,
                name: def.name,
                options: def.options,
                worker: AsyncMutex::new(def.worker),
                sender,
                next,
            });
        }
        let inner = Arc::new(Inner { graph_id, stages });

        let (stop, stopped) = bounded(1);
        let handles = receivers
            .into_iter()
            .enumerate()
            .map(|(at, receiver)| spawn_task(consume(inner.clone(), at, receiver, stopped.clone())))
            .collect();
        log::debug!("Graph {graph_id} started with {} stages", inner.stages.len());

        Ok(Graph {
            inner,
            entry,
            stop: Mutex::new(Some(stop)),
            handles: Mutex::new(handles),
        })
    }
}

struct Stage<R> {
    id: StageId,
    name: String,
    options: StageOptions,
    worker: AsyncMutex<Box<dyn Worker<R>>>,
    sender: Sender<Envelope<R>>,
    next: Vec<(usize, Hop)>,
}

struct Inner<R> {
    graph_id: GraphId,
    stages: Vec<Stage<R>>,
}

/// A running graph of worker stages. Each stage owns a bounded queue and a single
/// consumer task, so records are processed one at a time, in order, per stage.
pub struct Graph<R> {
    inner: Arc<Inner<R>>,
    entry: usize,
    stop: Mutex<Option<Sender<()>>>,
    handles: Mutex<Vec<TaskHandle<()>>>,
}

impl<R> std::fmt::Debug for Graph<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Graph")
            .field("graph_id", &self.inner.graph_id)
            .field("entry", &self.inner.stages[self.entry].id)
            .finish()
    }
}

impl<R: StreamRecord> Graph<R> {
    pub fn graph_id(&self) -> GraphId {
        self.inner.graph_id
    }

    pub fn entry(&self) -> StageId {
        self.inner.stages[self.entry].id
    }

    pub fn stage_ids(&self) -> Vec<StageId> {
        self.inner.stages.iter().map(|s| s.id).collect()
    }

    /// Number of records waiting in a stage's queue.
    pub fn queue_len(&self, stage: StageId) -> Option<usize> {
        self.inner
            .stages
            .iter()
            .find(|s| s.id == stage)
            .map(|s| s.sender.len())
    }

    /// Offer a record to the entry stage. A full queue is handled by the stage's
    /// [`Overflow`] policy, and reported as `Retryable`; the record is not kept.
    pub async fn submit(&self, record: R) -> Outcome {
        self.inner.stages[self.entry]
            .enqueue(Envelope::new(record))
            .await
    }

    /// Stop every stage. Records being processed complete; records still queued are
    /// dropped. Idle hooks run once more, so that workers can flush.
    pub async fn shutdown(&self) {
        let stop = self.stop.lock().ok().and_then(|mut s| s.take());
        if stop.is_none() {
            return;
        }
        drop(stop);
        let handles: Vec<_> = match self.handles.lock() {
            Ok(mut handles) => handles.drain(..).collect(),
            Err(_) => Vec::new(),
        };
        for handle in handles {
            if handle.await.is_err() {
                log::error!("A stage of graph {} has panicked", self.inner.graph_id);
            }
        }
        log::debug!("Graph {} stopped", self.inner.graph_id);
    }
}

#[async_trait]
/// Type-erased control of a graph.
pub trait GraphControl: Send + Sync {
    fn graph_id(&self) -> GraphId;

    async fn shutdown(&self);
}

#[async_trait]
impl<R: StreamRecord> GraphControl for Graph<R> {
    fn graph_id(&self) -> GraphId {
        Graph::graph_id(self)
    }

    async fn shutdown(&self) {
        Graph::shutdown(self).await
    }
}

impl<R: StreamRecord> Stage<R> {
    async fn enqueue(&self, envelope: Envelope<R>) -> Outcome {
        let res = match self.options.overflow() {
            Overflow::Drop => self.sender.try_send(envelope).map_err(|e| match e {
                TrySendError::Full(_) => Refused::Full,
                TrySendError::Disconnected(_) => Refused::Closed,
            }),
            Overflow::Block(bound) => match timeout(bound, self.sender.send_async(envelope)).await
            {
                Ok(res) => res.map_err(|_| Refused::Closed),
                Err(_) => Err(Refused::Full),
            },
        };
        match res {
            Ok(()) => Outcome::Success,
            Err(Refused::Full) => {
                log::warn!("Stage {} ({}) is full, dropped a record", self.id, self.name);
                Outcome::retryable("queue full")
            }
            Err(Refused::Closed) => {
                log::warn!("Stage {} ({}) has stopped, dropped a record", self.id, self.name);
                Outcome::retryable("stage stopped")
            }
        }
    }

    fn retry(&self, mut envelope: Envelope<R>, reason: String) {
        envelope.attempts += 1;
        if envelope.attempts >= self.options.max_attempts() {
            log::warn!(
                "Stage {} ({}) gave up {} after {} attempts: {reason}",
                self.id,
                self.name,
                envelope.record.record_id(),
                envelope.attempts
            );
            return;
        }
        log::debug!(
            "Stage {} ({}) will retry {}: {reason}",
            self.id,
            self.name,
            envelope.record.record_id()
        );
        if self.sender.try_send(envelope).is_err() {
            log::warn!("Stage {} ({}) is full, dropped a retry", self.id, self.name);
        }
    }
}

impl<R: StreamRecord> Inner<R> {
    fn process(&self, at: usize, mut envelope: Envelope<R>) -> BoxFuture<'_, ()> {
        async move {
            let stage = &self.stages[at];
            let outcome = {
                let mut worker = stage.worker.lock().await;
                worker.process(&mut envelope.record).await
            };
            match outcome {
                Outcome::Success => {
                    for &(next, hop) in stage.next.iter() {
                        let forward = Envelope::new(envelope.record.clone());
                        match hop {
                            Hop::Sync => self.process(next, forward).await,
                            Hop::Async => {
                                // the overflow policy has logged the drop
                                let _ = self.stages[next].enqueue(forward).await;
                            }
                        }
                    }
                }
                Outcome::Retryable(reason) => stage.retry(envelope, reason),
                Outcome::Fatal(reason) => log::error!(
                    "Stage {} ({}) dropped {}: {reason}",
                    stage.id,
                    stage.name,
                    envelope.record.record_id()
                ),
            }
        }
        .boxed()
    }
}

async fn consume<R: StreamRecord>(
    inner: Arc<Inner<R>>,
    at: usize,
    receiver: Receiver<Envelope<R>>,
    stopped: Receiver<()>,
) {
    let stage = &inner.stages[at];
    loop {
        let envelope = select! {
            envelope = receiver.recv_async().fuse() => match envelope {
                Ok(envelope) => envelope,
                Err(_) => break,
            },
            _ = stopped.recv_async().fuse() => break,
        };
        inner.process(at, envelope).await;
        if receiver.is_empty() {
            stage.worker.lock().await.on_idle().await;
        }
    }
    if !receiver.is_empty() {
        log::warn!(
            "Stage {} ({}) stopped with {} records queued",
            stage.id,
            stage.name,
            receiver.len()
        );
    }
    stage.worker.lock().await.on_idle().await;
}
