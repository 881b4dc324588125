//! Time-bounded cache over the relationship graph document

use crate::storage::{StorageResult, WorldGraphStore};
use crate::world::RelationshipGraph;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Default time-to-live for a cached graph
pub const DEFAULT_GRAPH_TTL: Duration = Duration::from_secs(300);

struct CachedGraph {
    graph: Arc<RelationshipGraph>,
    loaded_at: Instant,
}

/// Lazily loads and caches the relationship graph.
///
/// Writes the engine performs are not tracked: callers invalidate after any
/// change to the underlying document. Two concurrent misses may both load;
/// loading is idempotent, so the later one simply wins.
pub struct RelationshipGraphCache {
    store: Arc<dyn WorldGraphStore>,
    ttl: Duration,
    entry: RwLock<Option<CachedGraph>>,
}

impl RelationshipGraphCache {
    pub fn new(store: Arc<dyn WorldGraphStore>) -> Self {
        Self::with_ttl(store, DEFAULT_GRAPH_TTL)
    }

    pub fn with_ttl(store: Arc<dyn WorldGraphStore>, ttl: Duration) -> Self {
        Self {
            store,
            ttl,
            entry: RwLock::new(None),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Current graph, loading it if absent or expired
    pub async fn get(&self) -> StorageResult<Arc<RelationshipGraph>> {
        {
            let entry = self.entry.read().await;
            if let Some(cached) = entry.as_ref() {
                if cached.loaded_at.elapsed() < self.ttl {
                    tracing::debug!("relationship graph cache hit");
                    return Ok(cached.graph.clone());
                }
            }
        }

        tracing::debug!("relationship graph cache miss, loading");
        let graph = Arc::new(self.store.read_graph().await?);
        *self.entry.write().await = Some(CachedGraph {
            graph: graph.clone(),
            loaded_at: Instant::now(),
        });
        Ok(graph)
    }

    /// Drop the cached graph so the next read reloads it
    pub async fn invalidate(&self) {
        if self.entry.write().await.take().is_some() {
            tracing::debug!("relationship graph cache invalidated");
        }
    }

    /// True if a fresh graph is cached
    pub async fn is_cached(&self) -> bool {
        self.entry
            .read()
            .await
            .as_ref()
            .is_some_and(|c| c.loaded_at.elapsed() < self.ttl)
    }
}
