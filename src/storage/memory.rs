//! In-memory collaborator backend
//!
//! Implements every collaborator contract on concurrent maps. Useful for
//! tests and for embedding the engine without a campaign directory. Reads and
//! writes of selected resources can be made to fail to exercise error paths.

use super::traits::{
    LocationDataLoader, LocationState, ScheduleTracker, StateStore, StorageError, StorageResult,
    WorldGraphStore,
};
use crate::world::{
    Document, EventDefinition, EventStatus, LocationEvents, RelationshipGraph, ResourcePath,
};
use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Key under which the relationship graph is kept
const GRAPH_KEY: &str = "relationships.yaml";

/// In-memory implementation of all four collaborator traits
#[derive(Debug, Default)]
pub struct MemoryStore {
    events: DashMap<String, LocationEvents>,
    states: DashMap<String, Document>,
    schedule: DashMap<String, EventStatus>,
    /// Ledgers, NPC documents and the graph, keyed by logical path
    documents: DashMap<String, Document>,
    failing_writes: DashSet<String>,
    failing_reads: DashSet<String>,
    fail_schedule: AtomicBool,
    graph_reads: AtomicUsize,
    graph_creations: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an event definition at a location
    pub fn add_event(&self, location_id: impl Into<String>, definition: EventDefinition) {
        self.events
            .entry(location_id.into())
            .or_default()
            .upsert(definition);
    }

    /// Seed a location's custom state
    pub fn set_location_state(&self, location_id: impl Into<String>, custom_state: Document) {
        self.states.insert(location_id.into(), custom_state);
    }

    /// Current custom state of a location (empty if unknown)
    pub fn location_state(&self, location_id: &str) -> Document {
        self.states
            .get(location_id)
            .map(|s| s.clone())
            .unwrap_or_default()
    }

    /// Seed a ledger or NPC document
    pub fn set_document(&self, path: &ResourcePath, document: Document) {
        self.documents.insert(path.to_string(), document);
    }

    /// Current content of a ledger or NPC document
    pub fn document(&self, path: &ResourcePath) -> Option<Document> {
        self.documents.get(&path.to_string()).map(|d| d.clone())
    }

    /// Seed the relationship graph
    pub fn set_graph(&self, graph: &RelationshipGraph) -> StorageResult<()> {
        self.documents
            .insert(GRAPH_KEY.to_string(), graph_to_document(graph)?);
        Ok(())
    }

    /// Current relationship graph without touching read counters
    pub fn graph(&self) -> Option<RelationshipGraph> {
        self.documents
            .get(GRAPH_KEY)
            .and_then(|d| serde_json::from_value(serde_json::Value::Object(d.clone())).ok())
    }

    /// Status last recorded for an event
    pub fn event_status(&self, event_id: &str) -> Option<EventStatus> {
        self.schedule.get(event_id).map(|s| *s)
    }

    /// Make every write to `path` fail until cleared
    pub fn fail_writes_to(&self, path: &ResourcePath) {
        self.failing_writes.insert(path.to_string());
    }

    /// Make every read of `path` fail until cleared
    pub fn fail_reads_of(&self, path: &ResourcePath) {
        self.failing_reads.insert(path.to_string());
    }

    /// Make writes to the relationship graph document fail
    pub fn fail_graph_writes(&self) {
        self.failing_writes.insert(GRAPH_KEY.to_string());
    }

    /// Make schedule status updates fail
    pub fn fail_schedule_updates(&self) {
        self.fail_schedule.store(true, Ordering::Relaxed);
    }

    pub fn clear_failures(&self) {
        self.failing_writes.clear();
        self.failing_reads.clear();
        self.fail_schedule.store(false, Ordering::Relaxed);
    }

    /// How many times the graph has been read from this store
    pub fn graph_reads(&self) -> usize {
        self.graph_reads.load(Ordering::Relaxed)
    }

    /// How many times a default graph had to be created
    pub fn graph_creations(&self) -> usize {
        self.graph_creations.load(Ordering::Relaxed)
    }

    fn check_writable(&self, key: &str) -> StorageResult<()> {
        if self.failing_writes.contains(key) {
            return Err(StorageError::WriteRejected(key.to_string()));
        }
        Ok(())
    }
}

fn graph_to_document(graph: &RelationshipGraph) -> StorageResult<Document> {
    match serde_json::to_value(graph)? {
        serde_json::Value::Object(map) => Ok(map),
        _ => Err(StorageError::Malformed {
            path: GRAPH_KEY.to_string(),
            reason: "graph did not serialize to a mapping".to_string(),
        }),
    }
}

#[async_trait]
impl LocationDataLoader for MemoryStore {
    async fn load_event_definition(
        &self,
        event_id: &str,
        location_id: &str,
    ) -> StorageResult<Option<EventDefinition>> {
        Ok(self
            .events
            .get(location_id)
            .and_then(|events| events.find(event_id).cloned()))
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn get_state(&self, location_id: &str) -> StorageResult<LocationState> {
        Ok(LocationState {
            location_id: location_id.to_string(),
            custom_state: self.location_state(location_id),
        })
    }

    async fn update_custom_state(
        &self,
        location_id: &str,
        custom_state: &Document,
    ) -> StorageResult<()> {
        self.check_writable(&ResourcePath::LocationState(location_id.to_string()).to_string())?;
        self.states
            .insert(location_id.to_string(), custom_state.clone());
        Ok(())
    }
}

#[async_trait]
impl ScheduleTracker for MemoryStore {
    async fn update_event_status(&self, event_id: &str, status: EventStatus) -> StorageResult<()> {
        if self.fail_schedule.load(Ordering::Relaxed) {
            return Err(StorageError::WriteRejected(format!("schedule:{}", event_id)));
        }
        self.schedule.insert(event_id.to_string(), status);
        Ok(())
    }
}

#[async_trait]
impl WorldGraphStore for MemoryStore {
    async fn read_graph(&self) -> StorageResult<RelationshipGraph> {
        self.graph_reads.fetch_add(1, Ordering::Relaxed);
        let existing = self.documents.get(GRAPH_KEY).map(|d| d.clone());
        match existing {
            Some(document) => Ok(serde_json::from_value(serde_json::Value::Object(document))?),
            None => {
                let graph = RelationshipGraph::new();
                self.graph_creations.fetch_add(1, Ordering::Relaxed);
                self.documents
                    .insert(GRAPH_KEY.to_string(), graph_to_document(&graph)?);
                Ok(graph)
            }
        }
    }

    async fn write_graph(&self, graph: &RelationshipGraph) -> StorageResult<()> {
        self.check_writable(GRAPH_KEY)?;
        self.documents
            .insert(GRAPH_KEY.to_string(), graph_to_document(graph)?);
        Ok(())
    }

    async fn read_document(&self, path: &ResourcePath) -> StorageResult<Option<Document>> {
        let key = path.to_string();
        if self.failing_reads.contains(&key) {
            return Err(StorageError::ReadRejected(key));
        }
        Ok(self.document(path))
    }

    async fn write_document(&self, path: &ResourcePath, document: &Document) -> StorageResult<()> {
        let key = path.to_string();
        self.check_writable(&key)?;
        self.documents.insert(key, document.clone());
        Ok(())
    }
}
