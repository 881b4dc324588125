//! Collaborator contracts consumed by the engine

use crate::world::{Document, EventDefinition, EventStatus, RelationshipGraph, ResourcePath};
use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Malformed document {path}: {reason}")]
    Malformed { path: String, reason: String },

    #[error("Write rejected for {0}")]
    WriteRejected(String),

    #[error("Read rejected for {0}")]
    ReadRejected(String),

    #[error("Path escapes the campaign directory: {0}")]
    UnsafePath(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// A location's persisted state
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocationState {
    pub location_id: String,
    /// Free-form campaign state merged into by `state_update` effects
    pub custom_state: Document,
}

/// Loads authored event definitions from per-location documents
#[async_trait]
pub trait LocationDataLoader: Send + Sync {
    /// Look up an event definition by `(event_id, location_id)`.
    ///
    /// Returns `Ok(None)` if the location or the event does not exist.
    async fn load_event_definition(
        &self,
        event_id: &str,
        location_id: &str,
    ) -> StorageResult<Option<EventDefinition>>;
}

/// Reads and writes a location's custom state
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Load a location's state. Unknown locations have empty state.
    async fn get_state(&self, location_id: &str) -> StorageResult<LocationState>;

    /// Replace a location's custom state
    async fn update_custom_state(
        &self,
        location_id: &str,
        custom_state: &Document,
    ) -> StorageResult<()>;
}

/// Records the lifecycle status of scheduled events
#[async_trait]
pub trait ScheduleTracker: Send + Sync {
    async fn update_event_status(&self, event_id: &str, status: EventStatus) -> StorageResult<()>;
}

/// Persists the relationship graph and the shared ledgers
///
/// Implementations must be thread-safe (Send + Sync); concurrent propagation
/// runs share one store.
#[async_trait]
pub trait WorldGraphStore: Send + Sync {
    /// Read the relationship graph, creating the default document if none
    /// exists yet.
    async fn read_graph(&self) -> StorageResult<RelationshipGraph>;

    /// Replace the relationship graph document
    async fn write_graph(&self, graph: &RelationshipGraph) -> StorageResult<()>;

    /// Read a ledger or NPC document. Missing documents return `Ok(None)`.
    async fn read_document(&self, path: &ResourcePath) -> StorageResult<Option<Document>>;

    /// Replace a ledger or NPC document
    async fn write_document(&self, path: &ResourcePath, document: &Document) -> StorageResult<()>;
}
