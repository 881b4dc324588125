//! Breadth-first propagation of a world change through the relationship graph

use super::applier::UpdateApplier;
use super::cache::RelationshipGraphCache;
use super::generator::UpdateGenerator;
use super::resolver::{expand, AffectedEntityResolver};
use crate::storage::{StateStore, WorldGraphStore};
use crate::world::{
    identity_key, AffectedEntity, EngineError, EngineResult, EntityType, ErrorType,
    RelationshipGraph, StateChange, StateUpdate,
};
use serde::Serialize;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Hard cap on traversal depth
pub const MAX_PROPAGATION_DEPTH: usize = 10;

/// Depth above which traversal keeps going but logs a warning
pub const DEPTH_WARNING_THRESHOLD: usize = 5;

/// Default time budget for one propagation run
pub const DEFAULT_PROPAGATION_BUDGET: Duration = Duration::from_millis(1000);

/// Outcome of one propagation run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PropagationResult {
    pub success: bool,
    pub updates_applied: Vec<StateUpdate>,
    /// Deepest level processed (0 if nothing was affected)
    pub propagation_depth: usize,
    /// Distinct entities processed
    pub affected_count: usize,
    pub files_updated: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<ErrorType>,
}

/// What a traversal produced before anything is written
#[derive(Debug, Default)]
struct Traversal {
    updates: Vec<StateUpdate>,
    max_depth: usize,
    visited: usize,
}

/// Cascades a change through the graph and persists the resulting updates.
///
/// The traversal keeps a visited set keyed `entity_type:entity_id`, so it
/// terminates on cyclic graphs; levels past the hard cap are skipped.
/// How far it expands is governed by the change's `max_cascade_levels`
/// (1 = first-order neighbors only); deeper levels reuse the origin's rules.
pub struct WorldStatePropagator {
    resolver: AffectedEntityResolver,
    generator: UpdateGenerator,
    applier: UpdateApplier,
    max_depth: usize,
    warning_threshold: usize,
    budget: Duration,
}

impl WorldStatePropagator {
    pub fn new(
        cache: Arc<RelationshipGraphCache>,
        state: Arc<dyn StateStore>,
        world: Arc<dyn WorldGraphStore>,
    ) -> Self {
        Self {
            resolver: AffectedEntityResolver::new(cache),
            generator: UpdateGenerator::new(),
            applier: UpdateApplier::new(state, world),
            max_depth: MAX_PROPAGATION_DEPTH,
            warning_threshold: DEPTH_WARNING_THRESHOLD,
            budget: DEFAULT_PROPAGATION_BUDGET,
        }
    }

    /// Lower the hard cap and set the warning threshold. The cap never
    /// exceeds [`MAX_PROPAGATION_DEPTH`].
    pub fn with_limits(mut self, max_depth: usize, warning_threshold: usize) -> Self {
        self.max_depth = max_depth.clamp(1, MAX_PROPAGATION_DEPTH);
        self.warning_threshold = warning_threshold;
        self
    }

    pub fn with_budget(mut self, budget: Duration) -> Self {
        self.budget = budget;
        self
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.applier = self.applier.with_history_limit(limit);
        self
    }

    pub fn resolver(&self) -> &AffectedEntityResolver {
        &self.resolver
    }

    /// Propagate a change. Never returns an error; failures are reported in
    /// the result.
    pub async fn propagate_change(&self, change: &StateChange) -> PropagationResult {
        let started = Instant::now();
        let result = match self.run(change).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(
                    primary_entity = %change.primary_entity,
                    change_type = %change.change_type,
                    error = %e,
                    "propagation failed"
                );
                PropagationResult {
                    success: false,
                    error_type: Some(e.error_type()),
                    error: Some(e.to_string()),
                    ..Default::default()
                }
            }
        };

        let elapsed = started.elapsed();
        if elapsed > self.budget {
            tracing::warn!(
                primary_entity = %change.primary_entity,
                elapsed_ms = elapsed.as_millis() as u64,
                budget_ms = self.budget.as_millis() as u64,
                "propagation exceeded its time budget"
            );
        }
        result
    }

    async fn run(&self, change: &StateChange) -> EngineResult<PropagationResult> {
        if change.change_type.is_empty() {
            return Err(EngineError::InvalidInput(
                "state change is missing change_type".to_string(),
            ));
        }
        if change.primary_entity.trim().is_empty() {
            return Err(EngineError::InvalidInput(
                "state change is missing primary_entity".to_string(),
            ));
        }

        let seeds = self.resolver.find_affected_entities(change).await.entities;

        // Re-expansion needs the graph itself; first-order runs do not
        let graph = if change.propagation_rules.max_cascade_levels > 1 {
            self.resolver.cache().get().await.ok()
        } else {
            None
        };
        let traversal = self.traverse(seeds, graph.as_deref(), change);

        let files_updated = self.applier.try_apply(&traversal.updates, change).await?;

        tracing::info!(
            primary_entity = %change.primary_entity,
            change_type = %change.change_type,
            affected = traversal.visited,
            updates = traversal.updates.len(),
            depth = traversal.max_depth,
            "propagation complete"
        );

        Ok(PropagationResult {
            success: true,
            updates_applied: traversal.updates,
            propagation_depth: traversal.max_depth,
            affected_count: traversal.visited,
            files_updated,
            error: None,
            error_type: None,
        })
    }

    /// Breadth-first walk from the seeds, generating one update per entity
    fn traverse(
        &self,
        seeds: Vec<AffectedEntity>,
        graph: Option<&RelationshipGraph>,
        change: &StateChange,
    ) -> Traversal {
        let cascade_levels = change
            .propagation_rules
            .max_cascade_levels
            .clamp(1, self.max_depth);
        let mut visited: HashSet<String> = HashSet::new();
        visited.insert(identity_key(EntityType::Npc, &change.primary_entity));
        let mut queue: VecDeque<AffectedEntity> = seeds.into();
        let mut traversal = Traversal::default();

        while let Some(entity) = queue.pop_front() {
            let key = entity.identity_key();
            if visited.contains(&key) {
                tracing::debug!(entity = %key, "already visited, skipping");
                continue;
            }

            let depth = entity.propagation_level;
            if depth > self.max_depth {
                tracing::warn!(entity = %key, depth, "maximum propagation depth exceeded, skipping");
                continue;
            }
            if depth > self.warning_threshold {
                tracing::warn!(entity = %key, depth, "deep propagation");
            }

            visited.insert(key);
            traversal.visited += 1;
            traversal.max_depth = traversal.max_depth.max(depth);

            if let Some(update) = self.generator.generate_state_update(&entity, change) {
                traversal.updates.push(update);
            }

            if depth < cascade_levels {
                if let Some(graph) = graph {
                    queue.extend(
                        expand(graph, &entity.entity_id, change, depth + 1)
                            .into_iter()
                            .filter(|next| !visited.contains(&next.identity_key())),
                    );
                }
            }
        }

        traversal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStore, StorageError, StorageResult};
    use crate::world::{Document, PropagationRules, ResourcePath};
    use async_trait::async_trait;

    fn propagator(store: &Arc<MemoryStore>) -> WorldStatePropagator {
        let cache = Arc::new(RelationshipGraphCache::new(store.clone()));
        WorldStatePropagator::new(cache, store.clone(), store.clone())
    }

    fn chain(len: usize) -> RelationshipGraph {
        let mut graph = RelationshipGraph::new();
        for i in 0..len {
            graph.add_family(format!("npc_{}", i), format!("npc_{}", i + 1), "friend");
        }
        graph
    }

    #[tokio::test]
    async fn missing_fields_fail_fast_without_writes() {
        let store = Arc::new(MemoryStore::new());
        let result = propagator(&store)
            .propagate_change(&StateChange::npc_death(""))
            .await;
        assert!(!result.success);
        assert_eq!(result.error_type, Some(ErrorType::InvalidInput));

        let result = propagator(&store)
            .propagate_change(&StateChange::new("", "npc_0"))
            .await;
        assert_eq!(result.error_type, Some(ErrorType::InvalidInput));
        assert_eq!(store.graph_reads(), 0);
    }

    #[tokio::test]
    async fn default_rules_stop_at_first_order_neighbors() {
        let store = Arc::new(MemoryStore::new());
        store.set_graph(&chain(5)).unwrap();

        let result = propagator(&store)
            .propagate_change(&StateChange::npc_death("npc_0"))
            .await;
        assert!(result.success, "{:?}", result.error);
        assert_eq!(result.affected_count, 1);
        assert_eq!(result.propagation_depth, 1);
        assert_eq!(result.files_updated, vec!["npcs/npc_1.md"]);
    }

    #[tokio::test]
    async fn cascade_levels_reach_further_but_respect_the_cap() {
        let store = Arc::new(MemoryStore::new());
        store.set_graph(&chain(15)).unwrap();

        let change = StateChange::npc_death("npc_0")
            .with_rules(PropagationRules::default().cascade_levels(3));
        let result = propagator(&store).propagate_change(&change).await;
        assert_eq!(result.affected_count, 3);
        assert_eq!(result.propagation_depth, 3);

        let change = StateChange::npc_death("npc_0")
            .with_rules(PropagationRules::default().cascade_levels(50));
        let result = propagator(&store).propagate_change(&change).await;
        assert_eq!(result.propagation_depth, MAX_PROPAGATION_DEPTH);
        assert_eq!(result.affected_count, MAX_PROPAGATION_DEPTH);
    }

    #[tokio::test]
    async fn configured_depth_cannot_exceed_the_hard_cap() {
        let store = Arc::new(MemoryStore::new());
        store.set_graph(&chain(30)).unwrap();
        let propagator = propagator(&store).with_limits(50, 5);

        let change = StateChange::npc_death("npc_0")
            .with_rules(PropagationRules::default().cascade_levels(50));
        let result = propagator.propagate_change(&change).await;
        assert!(result.success, "{:?}", result.error);
        assert_eq!(result.propagation_depth, MAX_PROPAGATION_DEPTH);
        assert_eq!(result.affected_count, MAX_PROPAGATION_DEPTH);
    }

    #[tokio::test]
    async fn unreadable_target_document_is_unexpected() {
        let store = Arc::new(MemoryStore::new());
        store.set_graph(&chain(2)).unwrap();
        store.fail_reads_of(&ResourcePath::Npc("npc_1".into()));

        let result = propagator(&store)
            .propagate_change(&StateChange::npc_death("npc_0"))
            .await;
        assert!(!result.success);
        assert_eq!(result.error_type, Some(ErrorType::UnexpectedError));
        assert!(result.files_updated.is_empty());
    }

    #[tokio::test]
    async fn cycles_terminate_and_skip_the_origin() {
        let store = Arc::new(MemoryStore::new());
        let mut graph = RelationshipGraph::new();
        graph
            .add_family("a", "b", "friend")
            .add_family("b", "c", "friend")
            .add_family("c", "a", "friend")
            .add_family("c", "b", "enemy");
        store.set_graph(&graph).unwrap();

        let change =
            StateChange::npc_death("a").with_rules(PropagationRules::default().cascade_levels(10));
        let result = propagator(&store).propagate_change(&change).await;
        assert!(result.success);
        assert_eq!(result.affected_count, 2);
        assert_eq!(result.propagation_depth, 2);
    }

    #[tokio::test]
    async fn duplicate_edges_are_processed_once() {
        let store = Arc::new(MemoryStore::new());
        let mut graph = RelationshipGraph::new();
        graph
            .add_family("a", "b", "son")
            .add_family("a", "b", "friend")
            .add_dependent_quest("a", "q", "death")
            .add_dependent_quest("a", "q", "death");
        store.set_graph(&graph).unwrap();

        let result = propagator(&store)
            .propagate_change(&StateChange::npc_death("a"))
            .await;
        assert_eq!(result.affected_count, 2);
        assert_eq!(result.updates_applied.len(), 2);
        // first edge wins
        assert_eq!(result.updates_applied[0].updates["emotionalState"], "Grieving");
    }

    #[tokio::test]
    async fn applier_failure_fails_the_whole_run() {
        let store = Arc::new(MemoryStore::new());
        let mut graph = RelationshipGraph::new();
        graph.add_family("a", "b", "son").add_faction("a", "council");
        store.set_graph(&graph).unwrap();
        store.fail_writes_to(&ResourcePath::WorldState);

        let result = propagator(&store)
            .propagate_change(&StateChange::npc_death("a"))
            .await;
        assert!(!result.success);
        assert_eq!(result.error_type, Some(ErrorType::UpdateApplicationFailed));
        assert!(result.updates_applied.is_empty());
        // restored to its (absent, so empty) snapshot
        assert!(store
            .document(&ResourcePath::Npc("b".into()))
            .unwrap_or_default()
            .is_empty());
    }

    struct BrokenGraphStore;

    #[async_trait]
    impl WorldGraphStore for BrokenGraphStore {
        async fn read_graph(&self) -> StorageResult<RelationshipGraph> {
            Err(StorageError::Malformed {
                path: "relationships.yaml".to_string(),
                reason: "truncated".to_string(),
            })
        }
        async fn write_graph(&self, _graph: &RelationshipGraph) -> StorageResult<()> {
            Ok(())
        }
        async fn read_document(&self, _path: &ResourcePath) -> StorageResult<Option<Document>> {
            Ok(None)
        }
        async fn write_document(&self, _path: &ResourcePath, _doc: &Document) -> StorageResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn unreadable_graph_degrades_to_no_op() {
        let world: Arc<dyn WorldGraphStore> = Arc::new(BrokenGraphStore);
        let cache = Arc::new(RelationshipGraphCache::new(world.clone()));
        let propagator =
            WorldStatePropagator::new(cache, Arc::new(MemoryStore::new()), world.clone());

        let result = propagator
            .propagate_change(&StateChange::npc_death("kolyan_indirovich"))
            .await;
        assert!(result.success);
        assert_eq!(result.affected_count, 0);
        assert_eq!(result.propagation_depth, 0);
    }
}
