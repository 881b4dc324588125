//! Turns an affected entity into the state update it needs

use crate::world::{
    AffectedEntity, Document, EntityType, ResourcePath, SectionPath, StateChange, StateUpdate,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// How an NPC feels about a death
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EmotionalState {
    Grieving,
    Saddened,
    Relieved,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GriefLevel {
    High,
    Medium,
    None,
}

impl fmt::Display for EmotionalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl fmt::Display for GriefLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Emotional reaction to a death, by relationship to the deceased
pub fn emotional_response(relationship_type: &str) -> (EmotionalState, GriefLevel) {
    match relationship_type {
        "family" | "daughter" | "son" => (EmotionalState::Grieving, GriefLevel::High),
        "friend" | "ally" => (EmotionalState::Saddened, GriefLevel::Medium),
        "enemy" => (EmotionalState::Relieved, GriefLevel::None),
        _ => (EmotionalState::Neutral, GriefLevel::None),
    }
}

/// Builds type-specific state updates for affected entities
#[derive(Debug, Clone, Copy, Default)]
pub struct UpdateGenerator;

impl UpdateGenerator {
    pub fn new() -> Self {
        Self
    }

    /// The update for one entity, or `None` if this combination of entity
    /// and change needs no write. NPCs whose id cannot name a document inside
    /// the campaign are skipped.
    pub fn generate_state_update(
        &self,
        entity: &AffectedEntity,
        change: &StateChange,
    ) -> Option<StateUpdate> {
        self.generate_at(entity, change, Utc::now())
    }

    fn generate_at(
        &self,
        entity: &AffectedEntity,
        change: &StateChange,
        now: DateTime<Utc>,
    ) -> Option<StateUpdate> {
        let stamp = Value::String(now.to_rfc3339());
        let mut updates = Document::new();

        let (path, section) = match entity.entity_type {
            EntityType::Npc if change.change_type.is_death() => {
                let Some(path) = ResourcePath::npc(entity.entity_id.as_str()) else {
                    tracing::warn!(
                        entity_id = %entity.entity_id,
                        "skipping npc whose id is not a valid document name"
                    );
                    return None;
                };
                let (state, grief) = emotional_response(&entity.relationship_type);
                updates.insert("emotionalState".into(), Value::String(state.to_string()));
                updates.insert("griefLevel".into(), Value::String(grief.to_string()));
                updates.insert(
                    "reason".into(),
                    Value::String(format!("Death of {}", change.primary_entity)),
                );
                (path, SectionPath::key("emotional_state"))
            }
            EntityType::Npc => return None,
            EntityType::Quest => {
                updates.insert("status".into(), Value::String("Active".to_string()));
                updates.insert("activatedAt".into(), stamp);
                updates.insert(
                    "activationReason".into(),
                    Value::String(format!("Triggered by: {}", change.primary_entity)),
                );
                (
                    ResourcePath::ActiveQuests,
                    SectionPath::key(entity.entity_id.as_str()),
                )
            }
            EntityType::Faction => {
                updates.insert(
                    "changeType".into(),
                    Value::String(change.change_type.to_string()),
                );
                updates.insert("updatedAt".into(), stamp);
                (
                    ResourcePath::WorldState,
                    SectionPath::key("factions").child(entity.entity_id.as_str()),
                )
            }
        };

        Some(StateUpdate {
            file_path: path,
            section,
            updates,
            timestamp: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::UpdateType;

    fn npc(relationship: &str) -> AffectedEntity {
        AffectedEntity {
            entity_id: "ireena_kolyana".to_string(),
            entity_type: EntityType::Npc,
            relationship_type: relationship.to_string(),
            propagation_level: 1,
            update_type: UpdateType::EmotionalState,
            location: None,
        }
    }

    #[test]
    fn emotional_mapping_table() {
        assert_eq!(
            emotional_response("daughter"),
            (EmotionalState::Grieving, GriefLevel::High)
        );
        assert_eq!(
            emotional_response("ally"),
            (EmotionalState::Saddened, GriefLevel::Medium)
        );
        assert_eq!(
            emotional_response("enemy"),
            (EmotionalState::Relieved, GriefLevel::None)
        );
        assert_eq!(
            emotional_response("rival"),
            (EmotionalState::Neutral, GriefLevel::None)
        );
    }

    #[test]
    fn death_targets_the_npc_document() {
        let change = StateChange::npc_death("kolyan_indirovich");
        let update = UpdateGenerator::new()
            .generate_state_update(&npc("enemy"), &change)
            .unwrap();

        assert_eq!(update.file_path, ResourcePath::Npc("ireena_kolyana".into()));
        assert_eq!(update.section, "emotional_state");
        assert_eq!(update.updates["emotionalState"], "Relieved");
        assert_eq!(update.updates["griefLevel"], "None");
        assert_eq!(update.updates["reason"], "Death of kolyan_indirovich");
    }

    #[test]
    fn npc_without_death_needs_no_update() {
        let change = StateChange::new("npc_status", "kolyan_indirovich");
        assert!(UpdateGenerator::new()
            .generate_state_update(&npc("son"), &change)
            .is_none());
    }

    #[test]
    fn quest_and_faction_updates_target_ledgers() {
        let change = StateChange::npc_death("kolyan_indirovich");
        let quest = AffectedEntity {
            entity_id: "escort_ireena".into(),
            entity_type: EntityType::Quest,
            update_type: UpdateType::QuestActivation,
            ..npc("dependent_quest")
        };
        let update = UpdateGenerator::new()
            .generate_state_update(&quest, &change)
            .unwrap();
        assert_eq!(update.file_path, ResourcePath::ActiveQuests);
        assert_eq!(update.section, "escort_ireena");
        assert_eq!(update.updates["status"], "Active");
        assert_eq!(
            update.updates["activationReason"],
            "Triggered by: kolyan_indirovich"
        );

        let faction = AffectedEntity {
            entity_id: "village_council".into(),
            entity_type: EntityType::Faction,
            update_type: UpdateType::FactionUpdate,
            ..npc("member")
        };
        let update = UpdateGenerator::new()
            .generate_state_update(&faction, &change)
            .unwrap();
        assert_eq!(update.file_path, ResourcePath::WorldState);
        assert_eq!(update.section, "factions.village_council");
        assert_eq!(update.updates["changeType"], "npc_death");
        assert!(update.updates.contains_key("updatedAt"));
    }

    #[test]
    fn npc_ids_that_escape_the_npc_directory_are_skipped() {
        let change = StateChange::npc_death("kolyan_indirovich");
        let escaping = AffectedEntity {
            entity_id: "../../escaped".into(),
            ..npc("daughter")
        };
        assert!(UpdateGenerator::new()
            .generate_state_update(&escaping, &change)
            .is_none());
    }

    #[test]
    fn dotted_ids_stay_single_section_keys() {
        let change = StateChange::npc_death("kolyan_indirovich");
        let faction = AffectedEntity {
            entity_id: "order.of.the.silver.dragon".into(),
            entity_type: EntityType::Faction,
            update_type: UpdateType::FactionUpdate,
            ..npc("member")
        };
        let update = UpdateGenerator::new()
            .generate_state_update(&faction, &change)
            .unwrap();
        assert_eq!(
            update.section.segments(),
            ["factions", "order.of.the.silver.dragon"]
        );

        let quest = AffectedEntity {
            entity_id: "st.andral".into(),
            entity_type: EntityType::Quest,
            update_type: UpdateType::QuestActivation,
            ..npc("dependent_quest")
        };
        let update = UpdateGenerator::new()
            .generate_state_update(&quest, &change)
            .unwrap();
        assert_eq!(update.section.segments(), ["st.andral"]);
    }
}
