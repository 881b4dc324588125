//! Effect handlers and the kind → handler registry
//!
//! A handler turns one effect specification into a mutation of a single
//! staged document. Handlers never perform I/O: the executor loads the
//! target document into its changeset and hands the handler a mutable view.

use crate::world::document::{display_value, path_mut, shallow_merge};
use crate::world::{
    Document, EffectError, EffectSpec, ResourcePath, StateChange, StateUpdateRecord,
    TriggeredEvent, ACTIVE_QUESTS_FILE, WORLD_STATE_FILE,
};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// What a handler sees besides the effect itself
#[derive(Debug, Clone, Copy)]
pub struct EffectContext<'a> {
    pub event: &'a TriggeredEvent,
    pub now: DateTime<Utc>,
}

/// Result of staging one effect
#[derive(Debug, Clone, PartialEq)]
pub struct EffectOutcome {
    /// Short human-readable summary (`npc_status: kolyan_indirovich -> Dead`)
    pub description: String,
    pub record: StateUpdateRecord,
    /// World change this effect implies, for callers that propagate it
    pub world_change: Option<StateChange>,
}

/// Applies one kind of effect.
///
/// Handlers are registered by `kind()`, which must match the effect's
/// `type` tag.
pub trait EffectHandler: Send + Sync {
    fn kind(&self) -> &str;

    /// Which document the effect writes to
    fn target(&self, effect: &EffectSpec, ctx: &EffectContext<'_>)
        -> Result<ResourcePath, EffectError>;

    /// Mutate the staged copy of the target document
    fn apply(
        &self,
        effect: &EffectSpec,
        target: &ResourcePath,
        document: &mut Document,
        ctx: &EffectContext<'_>,
    ) -> Result<EffectOutcome, EffectError>;
}

fn parse_params<T: DeserializeOwned>(effect: &EffectSpec) -> Result<T, EffectError> {
    effect.parse().map_err(|e| EffectError::InvalidPayload {
        kind: effect.kind.clone(),
        message: e.to_string(),
    })
}

fn required(
    effect: &EffectSpec,
    value: Option<String>,
    field: &'static str,
) -> Result<String, EffectError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(EffectError::MissingField {
            kind: effect.kind.clone(),
            field,
        }),
    }
}

/// The mapping under `keys`, each key taken literally
fn entry<'a>(
    document: &'a mut Document,
    target: &ResourcePath,
    keys: &[&str],
) -> Result<&'a mut Document, EffectError> {
    path_mut(document, keys).ok_or_else(|| EffectError::SectionConflict {
        resource: target.to_string(),
        section: keys.join("."),
    })
}

#[derive(Debug, Deserialize)]
struct NpcStatusParams {
    #[serde(default, alias = "npcId")]
    npc_id: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

/// `npc_status`: upsert `npcs.<npc_id>` in the world-state ledger
#[derive(Debug, Default)]
pub struct NpcStatusEffect;

impl EffectHandler for NpcStatusEffect {
    fn kind(&self) -> &str {
        "npc_status"
    }

    fn target(
        &self,
        _effect: &EffectSpec,
        _ctx: &EffectContext<'_>,
    ) -> Result<ResourcePath, EffectError> {
        Ok(ResourcePath::WorldState)
    }

    fn apply(
        &self,
        effect: &EffectSpec,
        target: &ResourcePath,
        document: &mut Document,
        ctx: &EffectContext<'_>,
    ) -> Result<EffectOutcome, EffectError> {
        let params: NpcStatusParams = parse_params(effect)?;
        let npc_id = required(effect, params.npc_id, "npc_id")?;
        let status = required(effect, params.status, "status")?;

        let section = format!("npcs.{}", npc_id);
        let npc = entry(document, target, &["npcs", npc_id.as_str()])?;
        npc.insert("status".to_string(), Value::String(status.clone()));
        npc.insert(
            "last_updated".to_string(),
            Value::String(ctx.now.to_rfc3339()),
        );

        let world_change = status.eq_ignore_ascii_case("dead").then(|| {
            StateChange::npc_death(npc_id.clone()).from_location(ctx.event.location_id.clone())
        });

        Ok(EffectOutcome {
            description: format!("npc_status: {} -> {}", npc_id, status),
            record: StateUpdateRecord::new(WORLD_STATE_FILE, section, format!("status: {}", status)),
            world_change,
        })
    }
}

#[derive(Debug, Deserialize)]
struct StateUpdateParams {
    #[serde(default, alias = "stateChanges")]
    state_changes: Option<Document>,
    #[serde(default, alias = "locationId")]
    location_id: Option<String>,
}

/// `state_update`: shallow-merge `state_changes` into a location's custom
/// state. Targets the event's own location unless `location_id` is given.
#[derive(Debug, Default)]
pub struct StateUpdateEffect;

impl EffectHandler for StateUpdateEffect {
    fn kind(&self) -> &str {
        "state_update"
    }

    fn target(
        &self,
        effect: &EffectSpec,
        ctx: &EffectContext<'_>,
    ) -> Result<ResourcePath, EffectError> {
        let params: StateUpdateParams = parse_params(effect)?;
        let location = params
            .location_id
            .filter(|l| !l.trim().is_empty())
            .unwrap_or_else(|| ctx.event.location_id.clone());
        ResourcePath::location_state(location.clone()).ok_or_else(|| EffectError::InvalidPayload {
            kind: effect.kind.clone(),
            message: format!("'{}' is not a valid location id", location),
        })
    }

    fn apply(
        &self,
        effect: &EffectSpec,
        target: &ResourcePath,
        document: &mut Document,
        _ctx: &EffectContext<'_>,
    ) -> Result<EffectOutcome, EffectError> {
        let params: StateUpdateParams = parse_params(effect)?;
        let changes = params.state_changes.ok_or_else(|| EffectError::MissingField {
            kind: effect.kind.clone(),
            field: "state_changes",
        })?;

        shallow_merge(document, &changes);

        let summary: Vec<String> = changes
            .iter()
            .map(|(k, v)| format!("{}: {}", k, display_value(v)))
            .collect();
        Ok(EffectOutcome {
            description: format!("state_update: {} key(s) at {}", changes.len(), target),
            record: StateUpdateRecord::new(target.to_string(), "custom_state", summary.join(", ")),
            world_change: None,
        })
    }
}

#[derive(Debug, Deserialize)]
struct QuestTriggerParams {
    #[serde(default, alias = "questId")]
    quest_id: Option<String>,
    #[serde(default, alias = "newStatus")]
    new_status: Option<String>,
}

/// `quest_trigger`: upsert a quest's status in the quest ledger
#[derive(Debug, Default)]
pub struct QuestTriggerEffect;

impl EffectHandler for QuestTriggerEffect {
    fn kind(&self) -> &str {
        "quest_trigger"
    }

    fn target(
        &self,
        _effect: &EffectSpec,
        _ctx: &EffectContext<'_>,
    ) -> Result<ResourcePath, EffectError> {
        Ok(ResourcePath::ActiveQuests)
    }

    fn apply(
        &self,
        effect: &EffectSpec,
        target: &ResourcePath,
        document: &mut Document,
        ctx: &EffectContext<'_>,
    ) -> Result<EffectOutcome, EffectError> {
        let params: QuestTriggerParams = parse_params(effect)?;
        let quest_id = required(effect, params.quest_id, "quest_id")?;
        let new_status = required(effect, params.new_status, "new_status")?;

        let is_new = !matches!(document.get(&quest_id), Some(Value::Object(_)));
        let quest = entry(document, target, &[quest_id.as_str()])?;
        quest.insert("status".to_string(), Value::String(new_status.clone()));
        let stamp = if is_new { "activated_at" } else { "updated_at" };
        quest.insert(stamp.to_string(), Value::String(ctx.now.to_rfc3339()));

        Ok(EffectOutcome {
            description: format!("quest_trigger: {} -> {}", quest_id, new_status),
            record: StateUpdateRecord::new(
                ACTIVE_QUESTS_FILE,
                quest_id,
                format!("status: {}", new_status),
            ),
            world_change: None,
        })
    }
}

/// Maps effect kinds to their handlers
#[derive(Clone)]
pub struct EffectRegistry {
    handlers: HashMap<String, Arc<dyn EffectHandler>>,
}

impl EffectRegistry {
    /// Create an empty registry (every effect is skipped)
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Registry with the built-in `npc_status`, `state_update` and
    /// `quest_trigger` handlers
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(NpcStatusEffect));
        registry.register(Arc::new(StateUpdateEffect));
        registry.register(Arc::new(QuestTriggerEffect));
        registry
    }

    /// Register a handler, replacing any previous handler for the same kind
    pub fn register(&mut self, handler: Arc<dyn EffectHandler>) {
        self.handlers.insert(handler.kind().to_string(), handler);
    }

    pub fn get(&self, kind: &str) -> Option<&Arc<dyn EffectHandler>> {
        self.handlers.get(kind)
    }

    /// Registered kinds, sorted
    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }
}

impl Default for EffectRegistry {
    fn default() -> Self {
        Self::with_builtin()
    }
}

impl std::fmt::Debug for EffectRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}
