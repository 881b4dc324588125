//! Engine configuration
//!
//! Loaded from a YAML file; every key is optional and falls back to the
//! defaults below.
//!
//! ```yaml
//! data_dir: /srv/campaigns/barovia
//! graph_cache_ttl_secs: 300
//! max_depth: 10
//! depth_warning_threshold: 5
//! history_limit: 100
//! event_budget_ms: 500
//! propagation_budget_ms: 1000
//! ```

use crate::event::DEFAULT_EVENT_BUDGET;
use crate::propagation::{
    DEFAULT_GRAPH_TTL, DEFAULT_HISTORY_LIMIT, DEFAULT_PROPAGATION_BUDGET, DEPTH_WARNING_THRESHOLD,
    MAX_PROPAGATION_DEPTH,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Campaign directory used by the file-backed store
    pub data_dir: PathBuf,
    pub graph_cache_ttl_secs: u64,
    /// Hard cap on propagation depth
    pub max_depth: usize,
    pub depth_warning_threshold: usize,
    /// Propagation history entries kept in the graph document
    pub history_limit: usize,
    pub event_budget_ms: u64,
    pub propagation_budget_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            graph_cache_ttl_secs: DEFAULT_GRAPH_TTL.as_secs(),
            max_depth: MAX_PROPAGATION_DEPTH,
            depth_warning_threshold: DEPTH_WARNING_THRESHOLD,
            history_limit: DEFAULT_HISTORY_LIMIT,
            event_budget_ms: DEFAULT_EVENT_BUDGET.as_millis() as u64,
            propagation_budget_ms: DEFAULT_PROPAGATION_BUDGET.as_millis() as u64,
        }
    }
}

/// Default campaign directory (~/.local/share/barovia)
pub fn default_data_dir() -> PathBuf {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_default().join(".local/share"));
    data_dir.join("barovia")
}

impl EngineConfig {
    /// Load and validate a YAML config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&content).map_err(|e| match e {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.display().to_string(),
                source,
            },
            other => other,
        })
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = if content.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(content).map_err(|source| ConfigError::Parse {
                path: "<inline>".to_string(),
                source,
            })?
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_depth == 0 {
            return Err(ConfigError::Invalid("max_depth must be at least 1".into()));
        }
        if self.max_depth > MAX_PROPAGATION_DEPTH {
            return Err(ConfigError::Invalid(format!(
                "max_depth ({}) exceeds the hard cap of {}",
                self.max_depth, MAX_PROPAGATION_DEPTH
            )));
        }
        if self.depth_warning_threshold > self.max_depth {
            return Err(ConfigError::Invalid(format!(
                "depth_warning_threshold ({}) exceeds max_depth ({})",
                self.depth_warning_threshold, self.max_depth
            )));
        }
        if self.history_limit == 0 {
            return Err(ConfigError::Invalid("history_limit must be at least 1".into()));
        }
        Ok(())
    }

    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = data_dir.into();
        self
    }

    pub fn graph_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.graph_cache_ttl_secs)
    }

    pub fn event_budget(&self) -> Duration {
        Duration::from_millis(self.event_budget_ms)
    }

    pub fn propagation_budget(&self) -> Duration {
        Duration::from_millis(self.propagation_budget_ms)
    }
}
