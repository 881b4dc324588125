//! Core world data model

mod change;
pub mod document;
mod entity;
mod error;
mod event;
mod relationship;
mod update;

pub use change::{ChangeType, PropagationRules, StateChange};
pub use document::Document;
pub use entity::{identity_key, AffectedEntity, EntityType, UpdateType};
pub use error::{EffectError, EngineError, EngineResult, ErrorType};
pub use event::{
    EffectSpec, EventDefinition, EventStatus, GameState, LocationEvents, TriggeredEvent,
};
pub use relationship::{
    EdgeBundle, FactionEdge, FamilyEdge, PropagationRecord, QuestEdge, RelationshipGraph,
};
pub use update::{
    is_path_safe, ResourceKind, ResourcePath, SectionPath, StateUpdate, StateUpdateRecord,
    ACTIVE_QUESTS_FILE, WORLD_STATE_FILE,
};
