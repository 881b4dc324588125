//! Resolves which entities a world change touches

use super::cache::RelationshipGraphCache;
use crate::world::{AffectedEntity, EntityType, RelationshipGraph, StateChange, UpdateType};
use serde::Serialize;
use std::sync::Arc;

/// Relationship label used when a family edge carries none
pub const DEFAULT_RELATIONSHIP: &str = "family";

/// First-order entities affected by a change
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResolveResult {
    pub success: bool,
    pub entities: Vec<AffectedEntity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub struct AffectedEntityResolver {
    cache: Arc<RelationshipGraphCache>,
}

impl AffectedEntityResolver {
    pub fn new(cache: Arc<RelationshipGraphCache>) -> Self {
        Self { cache }
    }

    /// Entities directly connected to the change's primary entity.
    ///
    /// A graph that cannot be loaded, or has no entry for the entity, yields
    /// an empty successful result.
    pub async fn find_affected_entities(&self, change: &StateChange) -> ResolveResult {
        let entities = match self.cache.get().await {
            Ok(graph) => expand(&graph, &change.primary_entity, change, 1),
            Err(e) => {
                tracing::warn!(
                    primary_entity = %change.primary_entity,
                    error = %e,
                    "relationship graph unavailable, nothing to propagate"
                );
                Vec::new()
            }
        };
        ResolveResult {
            success: true,
            entities,
            error: None,
        }
    }

    /// The cached graph, for callers that traverse it themselves
    pub fn cache(&self) -> &Arc<RelationshipGraphCache> {
        &self.cache
    }
}

/// Expand one entity's edges into affected entities at `level`, honoring
/// the change's propagation rules.
pub fn expand(
    graph: &RelationshipGraph,
    entity_id: &str,
    change: &StateChange,
    level: usize,
) -> Vec<AffectedEntity> {
    let Some(bundle) = graph.connections(entity_id) else {
        return Vec::new();
    };
    let rules = &change.propagation_rules;
    let mut entities = Vec::new();

    if rules.affect_relationships {
        let update_type = if change.change_type.is_death() {
            UpdateType::EmotionalState
        } else {
            UpdateType::Status
        };
        entities.extend(bundle.family.iter().map(|edge| AffectedEntity {
            entity_id: edge.npc_id.clone(),
            entity_type: EntityType::Npc,
            relationship_type: edge
                .relation
                .clone()
                .filter(|r| !r.is_empty())
                .unwrap_or_else(|| DEFAULT_RELATIONSHIP.to_string()),
            propagation_level: level,
            update_type,
            location: edge.location.clone(),
        }));
    }

    if rules.affect_quests {
        entities.extend(bundle.dependent_quests.iter().map(|edge| AffectedEntity {
            entity_id: edge.quest_id.clone(),
            entity_type: EntityType::Quest,
            relationship_type: "dependent_quest".to_string(),
            propagation_level: level,
            update_type: UpdateType::QuestActivation,
            location: edge.location.clone(),
        }));
    }

    if rules.affect_factions {
        entities.extend(bundle.factions.iter().map(|edge| AffectedEntity {
            entity_id: edge.faction_id.clone(),
            entity_type: EntityType::Faction,
            relationship_type: "member".to_string(),
            propagation_level: level,
            update_type: UpdateType::FactionUpdate,
            location: edge.location.clone(),
        }));
    }

    entities.retain(|e| rules.allows_location(e.location.as_deref()));
    entities
}
