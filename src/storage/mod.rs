//! Storage backends for the engine
//!
//! The engine talks to persistence only through the four collaborator traits
//! in [`traits`]. `FileStore` implements them over a campaign directory,
//! `MemoryStore` over concurrent maps. `Changeset` stages writes across both
//! so a batch either lands completely or is restored.

mod changeset;
mod file;
mod memory;
mod traits;

pub use changeset::{Changeset, CommitError};
pub use file::{FileStore, ScheduleEntry};
pub use memory::MemoryStore;
pub use traits::{
    LocationDataLoader, LocationState, ScheduleTracker, StateStore, StorageError, StorageResult,
    WorldGraphStore,
};
