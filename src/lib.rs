//! Barovia: Event Execution and World-State Propagation Engine
//!
//! Applies scripted narrative events to a persistent campaign world and
//! cascades their consequences through a graph of NPCs, quests and factions.
//!
//! # Core Concepts
//!
//! - **Events**: authored definitions whose effects are applied all-or-nothing
//! - **State changes**: world changes (a death, a quest update) that propagate
//! - **Relationship graph**: family, quest and faction edges between entities
//! - **Collaborators**: the four storage contracts the engine runs against
//!
//! # Example
//!
//! ```
//! use barovia::{CampaignApi, EngineConfig, MemoryStore};
//! use std::sync::Arc;
//!
//! let api = CampaignApi::from_store(Arc::new(MemoryStore::new()), &EngineConfig::default());
//! // API is ready for use
//! # let _ = api;
//! ```

pub mod api;
pub mod config;
pub mod event;
pub mod propagation;
pub mod storage;
pub mod world;

pub use api::{CampaignApi, Collaborators, TriggerResult};
pub use config::{ConfigError, EngineConfig};
pub use event::{
    generate_event_narrative, EffectHandler, EffectRegistry, EventExecutor, ExecutionResult,
    NarrativeContext,
};
pub use propagation::{
    AffectedEntityResolver, ApplyResult, PropagationResult, RelationshipGraphCache,
    ResolveResult, UpdateApplier, UpdateGenerator, WorldStatePropagator,
};
pub use storage::{
    Changeset, FileStore, LocationDataLoader, MemoryStore, ScheduleTracker, StateStore,
    StorageError, StorageResult, WorldGraphStore,
};
pub use world::{
    AffectedEntity, ChangeType, Document, EffectSpec, EngineError, EntityType, ErrorType,
    EventDefinition, EventStatus, GameState, PropagationRules, RelationshipGraph, ResourcePath,
    SectionPath, StateChange, StateUpdate, TriggeredEvent,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
