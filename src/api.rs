//! Campaign-facing API layer.
//!
//! `CampaignApi` is the single entry point for session code and the CLI. It
//! wires the executor, the propagator and the graph cache over one set of
//! injected collaborators.

use std::sync::Arc;

use serde::Serialize;

use crate::config::EngineConfig;
use crate::event::{EffectRegistry, EventExecutor, ExecutionResult};
use crate::propagation::{
    AffectedEntityResolver, PropagationResult, RelationshipGraphCache, ResolveResult,
    WorldStatePropagator,
};
use crate::storage::{
    FileStore, LocationDataLoader, ScheduleTracker, StateStore, StorageResult, WorldGraphStore,
};
use crate::world::{GameState, RelationshipGraph, StateChange, TriggeredEvent};

/// The four collaborators the engine runs against
#[derive(Clone)]
pub struct Collaborators {
    pub loader: Arc<dyn LocationDataLoader>,
    pub state: Arc<dyn StateStore>,
    pub schedule: Arc<dyn ScheduleTracker>,
    pub world: Arc<dyn WorldGraphStore>,
}

impl Collaborators {
    /// Use one backend for every collaborator
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: LocationDataLoader + StateStore + ScheduleTracker + WorldGraphStore + 'static,
    {
        Self {
            loader: store.clone(),
            state: store.clone(),
            schedule: store.clone(),
            world: store,
        }
    }
}

/// An executed event together with the propagation runs it caused
#[derive(Debug, Clone, Serialize)]
pub struct TriggerResult {
    /// True if the event and every propagation run succeeded
    pub success: bool,
    pub execution: ExecutionResult,
    pub propagations: Vec<PropagationResult>,
}

/// Single entry point for campaign operations.
#[derive(Clone)]
pub struct CampaignApi {
    executor: Arc<EventExecutor>,
    propagator: Arc<WorldStatePropagator>,
    cache: Arc<RelationshipGraphCache>,
    world: Arc<dyn WorldGraphStore>,
}

impl CampaignApi {
    pub fn new(collaborators: Collaborators, config: &EngineConfig) -> Self {
        Self::with_registry(collaborators, config, EffectRegistry::default())
    }

    /// Build the API with a custom set of effect handlers
    pub fn with_registry(
        collaborators: Collaborators,
        config: &EngineConfig,
        registry: EffectRegistry,
    ) -> Self {
        let cache = Arc::new(RelationshipGraphCache::with_ttl(
            collaborators.world.clone(),
            config.graph_cache_ttl(),
        ));
        let executor = EventExecutor::new(
            collaborators.loader,
            collaborators.state.clone(),
            collaborators.schedule,
            collaborators.world.clone(),
        )
        .with_registry(registry)
        .with_budget(config.event_budget());
        let propagator = WorldStatePropagator::new(
            cache.clone(),
            collaborators.state,
            collaborators.world.clone(),
        )
        .with_limits(config.max_depth, config.depth_warning_threshold)
        .with_budget(config.propagation_budget())
        .with_history_limit(config.history_limit);

        Self {
            executor: Arc::new(executor),
            propagator: Arc::new(propagator),
            cache,
            world: collaborators.world,
        }
    }

    /// Run every collaborator on one backend
    pub fn from_store<S>(store: Arc<S>, config: &EngineConfig) -> Self
    where
        S: LocationDataLoader + StateStore + ScheduleTracker + WorldGraphStore + 'static,
    {
        Self::new(Collaborators::from_store(store), config)
    }

    /// Open the campaign directory named by the config
    pub async fn open(config: &EngineConfig) -> StorageResult<Self> {
        let store = FileStore::open(&config.data_dir).await?;
        Ok(Self::from_store(Arc::new(store), config))
    }

    // --- Events ---

    pub async fn execute_event(
        &self,
        event: &TriggeredEvent,
        game_state: &GameState,
    ) -> ExecutionResult {
        self.executor.execute(event, game_state).await
    }

    /// Execute an event, then propagate every world change its effects
    /// imply (e.g. an NPC's death). The graph cache is invalidated once the
    /// runs have recorded their history.
    pub async fn trigger_event(
        &self,
        event: &TriggeredEvent,
        game_state: &GameState,
    ) -> TriggerResult {
        let execution = self.executor.execute(event, game_state).await;
        let mut propagations = Vec::new();

        for change in &execution.world_changes {
            propagations.push(self.propagator.propagate_change(change).await);
        }
        if !propagations.is_empty() {
            self.cache.invalidate().await;
        }

        TriggerResult {
            success: execution.success && propagations.iter().all(|p| p.success),
            execution,
            propagations,
        }
    }

    // --- Propagation ---

    pub async fn propagate_change(&self, change: &StateChange) -> PropagationResult {
        self.propagator.propagate_change(change).await
    }

    pub async fn find_affected_entities(&self, change: &StateChange) -> ResolveResult {
        self.resolver().find_affected_entities(change).await
    }

    fn resolver(&self) -> &AffectedEntityResolver {
        self.propagator.resolver()
    }

    // --- Graph ---

    /// The relationship graph as currently cached
    pub async fn relationship_graph(&self) -> StorageResult<Arc<RelationshipGraph>> {
        self.cache.get().await
    }

    /// Read the graph straight from storage, creating the default document
    /// if none exists
    pub async fn init_graph(&self) -> StorageResult<RelationshipGraph> {
        let graph = self.world.read_graph().await?;
        self.cache.invalidate().await;
        Ok(graph)
    }

    /// Replace the graph document and drop the cached copy
    pub async fn save_graph(&self, graph: &RelationshipGraph) -> StorageResult<()> {
        self.world.write_graph(graph).await?;
        self.cache.invalidate().await;
        Ok(())
    }

    pub async fn invalidate_graph_cache(&self) {
        self.cache.invalidate().await;
    }
}
