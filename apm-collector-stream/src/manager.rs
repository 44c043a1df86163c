use crate::{Graph, GraphControl, GraphErr};
use apm_collector_types::{GraphId, RecordType, StreamRecord};
use std::{
    any::Any,
    collections::HashMap,
    sync::{Arc, Mutex},
};

struct Entry {
    graph: Arc<dyn Any + Send + Sync>,
    control: Arc<dyn GraphControl>,
}

#[derive(Default)]
/// Registry of the running graphs, keyed by graph id and record type.
pub struct GraphManager {
    graphs: Mutex<HashMap<(GraphId, RecordType), Entry>>,
}

impl std::fmt::Debug for GraphManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let keys: Vec<(GraphId, RecordType)> = match self.graphs.lock() {
            Ok(graphs) => graphs.keys().copied().collect(),
            Err(_) => Vec::new(),
        };
        f.debug_struct("GraphManager").field("graphs", &keys).finish()
    }
}

impl GraphManager {
    pub fn new() -> Self {
        Default::default()
    }

    /// Return the graph registered under `(graph_id, R::RECORD_TYPE)`, building and
    /// registering it first if there is none.
    pub fn create_if_absent<R, F>(&self, graph_id: GraphId, build: F) -> Result<Arc<Graph<R>>, GraphErr>
    where
        R: StreamRecord,
        F: FnOnce() -> Result<Graph<R>, GraphErr>,
    {
        let key = (graph_id, R::RECORD_TYPE);
        let mut graphs = self.lock();
        if let Some(entry) = graphs.get(&key) {
            return Self::downcast(entry, key);
        }
        let graph = Arc::new(build()?);
        graphs.insert(
            key,
            Entry {
                graph: graph.clone(),
                control: graph.clone(),
            },
        );
        log::info!("Registered graph {graph_id} of {}", R::RECORD_TYPE);
        Ok(graph)
    }

    pub fn find<R: StreamRecord>(&self, graph_id: GraphId) -> Result<Option<Arc<Graph<R>>>, GraphErr> {
        let key = (graph_id, R::RECORD_TYPE);
        match self.lock().get(&key) {
            Some(entry) => Self::downcast(entry, key).map(Some),
            None => Ok(None),
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Shut down and unregister every graph.
    pub async fn shutdown(&self) {
        let entries: Vec<Entry> = self.lock().drain().map(|(_, e)| e).collect();
        for entry in entries {
            entry.control.shutdown().await;
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<(GraphId, RecordType), Entry>> {
        self.graphs.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn downcast<R: StreamRecord>(
        entry: &Entry,
        (graph_id, record_type): (GraphId, RecordType),
    ) -> Result<Arc<Graph<R>>, GraphErr> {
        entry
            .graph
            .clone()
            .downcast::<Graph<R>>()
            .map_err(|_| GraphErr::TypeMismatch {
                graph_id,
                record_type,
            })
    }
}
