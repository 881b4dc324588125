//! World-state propagation
//!
//! A [`StateChange`](crate::world::StateChange) is resolved against the
//! cached relationship graph, each affected entity gets a generated
//! [`StateUpdate`](crate::world::StateUpdate), and the batch is written
//! through the [`UpdateApplier`].

mod applier;
mod cache;
mod generator;
mod propagator;
mod resolver;

pub use applier::{ApplyResult, UpdateApplier, DEFAULT_HISTORY_LIMIT};
pub use cache::{RelationshipGraphCache, DEFAULT_GRAPH_TTL};
pub use generator::{emotional_response, EmotionalState, GriefLevel, UpdateGenerator};
pub use propagator::{
    PropagationResult, WorldStatePropagator, DEFAULT_PROPAGATION_BUDGET,
    DEPTH_WARNING_THRESHOLD, MAX_PROPAGATION_DEPTH,
};
pub use resolver::{expand, AffectedEntityResolver, ResolveResult, DEFAULT_RELATIONSHIP};
