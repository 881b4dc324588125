//! Event execution
//!
//! An [`EventExecutor`] looks up the authored definition for a triggered
//! event, stages each effect through the [`EffectRegistry`], commits the
//! batch, and reports an [`ExecutionResult`] with a narrative.

mod effects;
mod executor;
mod narrative;

pub use effects::{
    EffectContext, EffectHandler, EffectOutcome, EffectRegistry, NpcStatusEffect,
    QuestTriggerEffect, StateUpdateEffect,
};
pub use executor::{AppliedEffect, EventExecutor, ExecutionResult, DEFAULT_EVENT_BUDGET};
pub use narrative::{generate_event_narrative, NarrativeContext};
