//! The relationship graph: who is connected to whom, and what depends on them

use super::document::Document;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// A family or ally connection to another NPC
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FamilyEdge {
    #[serde(alias = "npcId")]
    pub npc_id: String,
    /// Relationship label (`daughter`, `friend`, `enemy`, ...)
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub relation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

/// A quest that activates when this entity changes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestEdge {
    #[serde(alias = "questId")]
    pub quest_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

/// Membership in a faction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactionEdge {
    #[serde(alias = "factionId")]
    pub faction_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

/// All outgoing connections of one entity
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeBundle {
    #[serde(default)]
    pub family: Vec<FamilyEdge>,
    #[serde(default)]
    pub dependent_quests: Vec<QuestEdge>,
    #[serde(default)]
    pub factions: Vec<FactionEdge>,
}

impl EdgeBundle {
    pub fn is_empty(&self) -> bool {
        self.family.is_empty() && self.dependent_quests.is_empty() && self.factions.is_empty()
    }
}

/// One completed propagation run, kept for the campaign log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropagationRecord {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub change_type: String,
    pub primary_entity: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_location_id: Option<String>,
    pub updates_applied: usize,
    #[serde(default)]
    pub files_updated: Vec<String>,
}

impl PropagationRecord {
    pub fn new(
        change_type: impl Into<String>,
        primary_entity: impl Into<String>,
        source_location_id: Option<String>,
        updates_applied: usize,
        files_updated: Vec<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            change_type: change_type.into(),
            primary_entity: primary_entity.into(),
            source_location_id,
            updates_applied,
            files_updated,
        }
    }
}

/// The world relationship graph document (`relationships.yaml`)
///
/// A fresh graph serializes to the default structure
/// `{relationships: {}, quests: {}, factions: {}, propagation_history: []}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelationshipGraph {
    #[serde(default)]
    pub relationships: BTreeMap<String, EdgeBundle>,
    /// Quest metadata, opaque to the engine
    #[serde(default)]
    pub quests: Document,
    /// Faction metadata, opaque to the engine
    #[serde(default)]
    pub factions: Document,
    #[serde(default)]
    pub propagation_history: Vec<PropagationRecord>,
}

impl RelationshipGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Outgoing connections of an entity, if it has any entry
    pub fn connections(&self, entity_id: &str) -> Option<&EdgeBundle> {
        self.relationships.get(entity_id)
    }

    /// Add a family/ally edge from `from` to `to`
    pub fn add_family(
        &mut self,
        from: impl Into<String>,
        to: impl Into<String>,
        relation: impl Into<String>,
    ) -> &mut Self {
        self.relationships
            .entry(from.into())
            .or_default()
            .family
            .push(FamilyEdge {
                npc_id: to.into(),
                relation: Some(relation.into()),
                location: None,
            });
        self
    }

    /// Add a family/ally edge whose target lives at a known location
    pub fn add_family_at(
        &mut self,
        from: impl Into<String>,
        to: impl Into<String>,
        relation: impl Into<String>,
        location: impl Into<String>,
    ) -> &mut Self {
        self.relationships
            .entry(from.into())
            .or_default()
            .family
            .push(FamilyEdge {
                npc_id: to.into(),
                relation: Some(relation.into()),
                location: Some(location.into()),
            });
        self
    }

    /// Add a quest that depends on `entity`
    pub fn add_dependent_quest(
        &mut self,
        entity: impl Into<String>,
        quest_id: impl Into<String>,
        trigger: impl Into<String>,
    ) -> &mut Self {
        self.relationships
            .entry(entity.into())
            .or_default()
            .dependent_quests
            .push(QuestEdge {
                quest_id: quest_id.into(),
                trigger: Some(trigger.into()),
                location: None,
            });
        self
    }

    /// Add a faction membership for `entity`
    pub fn add_faction(
        &mut self,
        entity: impl Into<String>,
        faction_id: impl Into<String>,
    ) -> &mut Self {
        self.relationships
            .entry(entity.into())
            .or_default()
            .factions
            .push(FactionEdge {
                faction_id: faction_id.into(),
                location: None,
            });
        self
    }

    /// Append a history record, keeping at most `limit` of the newest ones.
    pub fn record_propagation(&mut self, record: PropagationRecord, limit: usize) {
        self.propagation_history.push(record);
        if self.propagation_history.len() > limit {
            let excess = self.propagation_history.len() - limit;
            self.propagation_history.drain(..excess);
        }
    }

    /// Total number of edges across all entities
    pub fn edge_count(&self) -> usize {
        self.relationships
            .values()
            .map(|b| b.family.len() + b.dependent_quests.len() + b.factions.len())
            .sum()
    }
}
