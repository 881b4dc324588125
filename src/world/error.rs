//! Engine error types and the error tags surfaced in result objects

use crate::storage::{CommitError, StorageError};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors raised while staging a single effect
#[derive(Debug, Error)]
pub enum EffectError {
    #[error("effect '{kind}' is missing required field '{field}'")]
    MissingField { kind: String, field: &'static str },

    #[error("effect '{kind}' has an invalid payload: {message}")]
    InvalidPayload { kind: String, message: String },

    #[error("section '{section}' in {resource} is not a mapping")]
    SectionConflict { resource: String, section: String },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Errors that can occur in engine operations
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("failed to load event '{event_id}' at '{location_id}': {reason}")]
    EventDefinitionLoad {
        event_id: String,
        location_id: String,
        reason: String,
    },

    #[error("effect #{index} ({kind}) failed: {source}")]
    EffectApplication {
        index: usize,
        kind: String,
        #[source]
        source: EffectError,
    },

    #[error("failed to persist event effects: {0}")]
    EffectCommit(CommitError),

    #[error("failed to apply state updates: {0}")]
    UpdateApplication(String),

    /// A collaborator failed outside a commit (e.g. a target document
    /// could not be read)
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl EngineError {
    /// The tag reported alongside the error string
    pub fn error_type(&self) -> ErrorType {
        match self {
            EngineError::InvalidInput(_) => ErrorType::InvalidInput,
            EngineError::EventDefinitionLoad { .. } => ErrorType::EventDefinitionLoadFailed,
            EngineError::EffectApplication { .. } | EngineError::EffectCommit(_) => {
                ErrorType::EffectApplicationFailed
            }
            EngineError::UpdateApplication(_) => ErrorType::UpdateApplicationFailed,
            EngineError::Storage(_) => ErrorType::UnexpectedError,
        }
    }
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Error tag carried by result objects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    InvalidInput,
    EventDefinitionLoadFailed,
    EffectApplicationFailed,
    UpdateApplicationFailed,
    UnexpectedError,
}

impl fmt::Display for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorType::InvalidInput => "invalid_input",
            ErrorType::EventDefinitionLoadFailed => "event_definition_load_failed",
            ErrorType::EffectApplicationFailed => "effect_application_failed",
            ErrorType::UpdateApplicationFailed => "update_application_failed",
            ErrorType::UnexpectedError => "unexpected_error",
        };
        f.write_str(s)
    }
}
