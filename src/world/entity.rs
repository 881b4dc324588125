//! Affected entities: transient records produced while traversing the graph

use serde::{Deserialize, Serialize};
use std::fmt;

/// What kind of entity a traversal reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Npc,
    Quest,
    Faction,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Npc => "npc",
            EntityType::Quest => "quest",
            EntityType::Faction => "faction",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The kind of state update an affected entity needs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateType {
    EmotionalState,
    Status,
    QuestActivation,
    FactionUpdate,
}

/// One entity discovered during propagation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AffectedEntity {
    pub entity_id: String,
    pub entity_type: EntityType,
    pub relationship_type: String,
    /// Hops from the origin entity (first-order neighbors are level 1)
    pub propagation_level: usize,
    pub update_type: UpdateType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl AffectedEntity {
    /// Identity used by the traversal's visited set: `entity_type:entity_id`
    pub fn identity_key(&self) -> String {
        identity_key(self.entity_type, &self.entity_id)
    }
}

/// Build a visited-set key
pub fn identity_key(entity_type: EntityType, entity_id: &str) -> String {
    format!("{}:{}", entity_type, entity_id)
}
