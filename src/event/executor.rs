//! Event executor: runs one triggered event's effects as a single unit

use super::effects::{EffectContext, EffectRegistry};
use super::narrative::{generate_event_narrative, NarrativeContext};
use crate::storage::{
    Changeset, LocationDataLoader, ScheduleTracker, StateStore, WorldGraphStore,
};
use crate::world::{
    is_path_safe, EffectError, EngineError, EngineResult, ErrorType, EventDefinition,
    EventStatus, GameState, StateChange, StateUpdateRecord, TriggeredEvent,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Default time budget for one event
pub const DEFAULT_EVENT_BUDGET: Duration = Duration::from_millis(500);

/// One effect that was applied
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedEffect {
    /// Position in the definition's effect list
    pub index: usize,
    pub kind: String,
    pub description: String,
}

/// Outcome of executing one event
///
/// `effects_applied` and `state_updates` are only non-empty on success.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub success: bool,
    pub event_id: String,
    pub executed_at: DateTime<Utc>,
    pub effects_applied: Vec<AppliedEffect>,
    pub state_updates: Vec<StateUpdateRecord>,
    pub execution_time_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub narrative: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_type: Option<ErrorType>,
    /// World changes implied by the applied effects (e.g. an NPC death)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub world_changes: Vec<StateChange>,
}

struct Execution {
    effects_applied: Vec<AppliedEffect>,
    state_updates: Vec<StateUpdateRecord>,
    world_changes: Vec<StateChange>,
    narrative: String,
}

/// Loads an event definition and applies its effects all-or-nothing.
///
/// Effects are staged in a [`Changeset`] in declaration order; nothing is
/// written until every effect has staged cleanly, and a failed flush restores
/// the documents already written.
pub struct EventExecutor {
    loader: Arc<dyn LocationDataLoader>,
    state: Arc<dyn StateStore>,
    schedule: Arc<dyn ScheduleTracker>,
    world: Arc<dyn WorldGraphStore>,
    registry: EffectRegistry,
    budget: Duration,
}

impl EventExecutor {
    pub fn new(
        loader: Arc<dyn LocationDataLoader>,
        state: Arc<dyn StateStore>,
        schedule: Arc<dyn ScheduleTracker>,
        world: Arc<dyn WorldGraphStore>,
    ) -> Self {
        Self {
            loader,
            state,
            schedule,
            world,
            registry: EffectRegistry::default(),
            budget: DEFAULT_EVENT_BUDGET,
        }
    }

    pub fn with_registry(mut self, registry: EffectRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_budget(mut self, budget: Duration) -> Self {
        self.budget = budget;
        self
    }

    pub fn registry(&self) -> &EffectRegistry {
        &self.registry
    }

    /// Execute a triggered event. Never returns an error; failures are
    /// reported in the result.
    pub async fn execute(&self, event: &TriggeredEvent, game_state: &GameState) -> ExecutionResult {
        let started = Instant::now();
        let executed_at = Utc::now();
        let outcome = self.run(event, game_state, executed_at).await;
        let elapsed = started.elapsed();

        if elapsed > self.budget {
            tracing::warn!(
                event_id = %event.event_id,
                elapsed_ms = elapsed.as_millis() as u64,
                budget_ms = self.budget.as_millis() as u64,
                "event execution exceeded its time budget"
            );
        }

        let mut result = ExecutionResult {
            success: false,
            event_id: event.event_id.clone(),
            executed_at,
            effects_applied: Vec::new(),
            state_updates: Vec::new(),
            execution_time_ms: elapsed.as_millis() as u64,
            narrative: None,
            error: None,
            error_type: None,
            world_changes: Vec::new(),
        };

        match outcome {
            Ok(execution) => {
                tracing::info!(
                    event_id = %event.event_id,
                    location_id = %event.location_id,
                    effects = execution.effects_applied.len(),
                    elapsed_ms = result.execution_time_ms,
                    "event executed"
                );
                result.success = true;
                result.effects_applied = execution.effects_applied;
                result.state_updates = execution.state_updates;
                result.world_changes = execution.world_changes;
                result.narrative = Some(execution.narrative);
            }
            Err(e) => {
                tracing::warn!(
                    event_id = %event.event_id,
                    location_id = %event.location_id,
                    error_type = %e.error_type(),
                    error = %e,
                    "event execution failed"
                );
                result.error_type = Some(e.error_type());
                result.error = Some(e.to_string());
            }
        }
        result
    }

    async fn run(
        &self,
        event: &TriggeredEvent,
        game_state: &GameState,
        now: DateTime<Utc>,
    ) -> EngineResult<Execution> {
        if event.event_id.trim().is_empty() {
            return Err(EngineError::InvalidInput("event is missing event_id".to_string()));
        }
        if event.location_id.trim().is_empty() {
            return Err(EngineError::InvalidInput(
                "event is missing location_id".to_string(),
            ));
        }
        if !is_path_safe(&event.location_id) {
            return Err(EngineError::InvalidInput(format!(
                "'{}' is not a valid location_id",
                event.location_id
            )));
        }

        let definition = match self.load_definition(event).await {
            Ok(definition) => definition,
            Err(e) => {
                self.mark(&event.event_id, EventStatus::Failed).await;
                return Err(e);
            }
        };

        match self.apply_effects(&definition, event, now).await {
            Ok((effects_applied, state_updates, world_changes)) => {
                self.mark(&event.event_id, EventStatus::Completed).await;
                let ctx = NarrativeContext::for_event(&definition, event, game_state);
                let narrative =
                    generate_event_narrative(&ctx, game_state.player_present(&event.location_id));
                Ok(Execution {
                    effects_applied,
                    state_updates,
                    world_changes,
                    narrative,
                })
            }
            Err(e) => {
                self.mark(&event.event_id, EventStatus::Failed).await;
                Err(e)
            }
        }
    }

    async fn load_definition(&self, event: &TriggeredEvent) -> EngineResult<EventDefinition> {
        let load_error = |reason: String| EngineError::EventDefinitionLoad {
            event_id: event.event_id.clone(),
            location_id: event.location_id.clone(),
            reason,
        };
        match self
            .loader
            .load_event_definition(&event.event_id, &event.location_id)
            .await
        {
            Ok(Some(definition)) => Ok(definition),
            Ok(None) => Err(load_error("event definition not found".to_string())),
            Err(e) => Err(load_error(e.to_string())),
        }
    }

    /// Stage every effect, then flush the changeset
    async fn apply_effects(
        &self,
        definition: &EventDefinition,
        event: &TriggeredEvent,
        now: DateTime<Utc>,
    ) -> EngineResult<(Vec<AppliedEffect>, Vec<StateUpdateRecord>, Vec<StateChange>)> {
        let ctx = EffectContext { event, now };
        let mut changeset = Changeset::new(self.state.clone(), self.world.clone());
        let mut applied = Vec::new();
        let mut records = Vec::new();
        let mut world_changes = Vec::new();

        for (index, effect) in definition.effects.iter().enumerate() {
            let Some(handler) = self.registry.get(&effect.kind) else {
                tracing::warn!(
                    event_id = %definition.event_id,
                    index,
                    kind = %effect.kind,
                    "unknown effect kind, skipping"
                );
                continue;
            };

            let failed = |source: EffectError| EngineError::EffectApplication {
                index,
                kind: effect.kind.clone(),
                source,
            };
            let target = handler.target(effect, &ctx).map_err(failed)?;
            let document = changeset
                .document_mut(&target)
                .await
                .map_err(|e| failed(e.into()))?;
            let outcome = handler
                .apply(effect, &target, document, &ctx)
                .map_err(failed)?;

            tracing::debug!(index, kind = %effect.kind, resource = %target, "effect staged");
            applied.push(AppliedEffect {
                index,
                kind: effect.kind.clone(),
                description: outcome.description,
            });
            records.push(outcome.record);
            world_changes.extend(outcome.world_change);
        }

        changeset.commit().await.map_err(EngineError::EffectCommit)?;
        Ok((applied, records, world_changes))
    }

    /// Record lifecycle status. Failure here does not change the outcome.
    async fn mark(&self, event_id: &str, status: EventStatus) {
        if let Err(e) = self.schedule.update_event_status(event_id, status).await {
            tracing::warn!(
                event_id = %event_id,
                status = %status,
                error = %e,
                "failed to record event status"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use crate::world::{Document, EffectSpec, ResourcePath};
    use serde_json::json;

    fn executor(store: &Arc<MemoryStore>) -> EventExecutor {
        EventExecutor::new(store.clone(), store.clone(), store.clone(), store.clone())
    }

    #[tokio::test]
    async fn missing_ids_are_invalid_input() {
        let store = Arc::new(MemoryStore::new());
        let result = executor(&store)
            .execute(&TriggeredEvent::new("", "vallaki"), &GameState::default())
            .await;
        assert!(!result.success);
        assert_eq!(result.error_type, Some(ErrorType::InvalidInput));

        let result = executor(&store)
            .execute(&TriggeredEvent::new("feast", " "), &GameState::default())
            .await;
        assert_eq!(result.error_type, Some(ErrorType::InvalidInput));
        assert!(store.event_status("feast").is_none());
    }

    #[tokio::test]
    async fn location_outside_the_campaign_is_invalid_input() {
        let store = Arc::new(MemoryStore::new());
        let result = executor(&store)
            .execute(
                &TriggeredEvent::new("feast", "../../etc"),
                &GameState::default(),
            )
            .await;
        assert!(!result.success);
        assert_eq!(result.error_type, Some(ErrorType::InvalidInput));
        assert!(store.event_status("feast").is_none());
    }

    #[tokio::test]
    async fn unknown_definition_marks_event_failed() {
        let store = Arc::new(MemoryStore::new());
        let result = executor(&store)
            .execute(&TriggeredEvent::new("feast", "vallaki"), &GameState::default())
            .await;
        assert!(!result.success);
        assert_eq!(result.error_type, Some(ErrorType::EventDefinitionLoadFailed));
        assert_eq!(store.event_status("feast"), Some(EventStatus::Failed));
    }

    #[tokio::test]
    async fn unknown_effect_kinds_are_skipped() {
        let store = Arc::new(MemoryStore::new());
        store.add_event(
            "vallaki",
            EventDefinition::new("feast", "Feast of St. Andral")
                .with_effect(EffectSpec::new("weather_change").with_field("to", "fog"))
                .with_effect(EffectSpec::quest_trigger("st_andrals_bones", "Active")),
        );

        let result = executor(&store)
            .execute(&TriggeredEvent::new("feast", "vallaki"), &GameState::default())
            .await;
        assert!(result.success, "{:?}", result.error);
        assert_eq!(result.effects_applied.len(), 1);
        assert_eq!(result.effects_applied[0].index, 1);
        assert_eq!(store.event_status("feast"), Some(EventStatus::Completed));
    }

    #[tokio::test]
    async fn commit_failure_restores_earlier_writes() {
        let store = Arc::new(MemoryStore::new());
        let mut prior = Document::new();
        prior.insert("npcs".to_string(), json!({}));
        store.set_document(&ResourcePath::WorldState, prior.clone());
        store.fail_writes_to(&ResourcePath::ActiveQuests);
        store.add_event(
            "vallaki",
            EventDefinition::new("feast", "Feast")
                .with_effect(EffectSpec::npc_status("baron_vallakovich", "Dead"))
                .with_effect(EffectSpec::quest_trigger("st_andrals_bones", "Active")),
        );

        let result = executor(&store)
            .execute(&TriggeredEvent::new("feast", "vallaki"), &GameState::default())
            .await;
        assert!(!result.success);
        assert_eq!(result.error_type, Some(ErrorType::EffectApplicationFailed));
        assert!(result.effects_applied.is_empty());
        assert!(result.world_changes.is_empty());
        assert_eq!(store.document(&ResourcePath::WorldState), Some(prior));
        assert_eq!(store.event_status("feast"), Some(EventStatus::Failed));
    }

    #[tokio::test]
    async fn schedule_failure_does_not_fail_execution() {
        let store = Arc::new(MemoryStore::new());
        store.add_event(
            "vallaki",
            EventDefinition::new("feast", "Feast")
                .with_effect(EffectSpec::quest_trigger("st_andrals_bones", "Active")),
        );
        store.fail_schedule_updates();

        let result = executor(&store)
            .execute(&TriggeredEvent::new("feast", "vallaki"), &GameState::default())
            .await;
        assert!(result.success);
        assert!(store.event_status("feast").is_none());
    }
}
