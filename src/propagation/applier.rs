//! Writes a batch of state updates as one unit

use crate::storage::{Changeset, StateStore, WorldGraphStore};
use crate::world::document::{path_mut, shallow_merge};
use crate::world::{EngineError, EngineResult, PropagationRecord, ResourcePath, StateChange, StateUpdate};
use serde::Serialize;
use std::sync::Arc;

/// Default number of propagation history entries kept in the graph
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// Outcome of applying a batch of updates
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ApplyResult {
    pub success: bool,
    /// Resources the batch targeted, in first-seen order
    pub files_updated: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Groups updates by resource, stages them, and commits them together
pub struct UpdateApplier {
    state: Arc<dyn StateStore>,
    world: Arc<dyn WorldGraphStore>,
    history_limit: usize,
}

impl UpdateApplier {
    pub fn new(state: Arc<dyn StateStore>, world: Arc<dyn WorldGraphStore>) -> Self {
        Self {
            state,
            world,
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    /// Apply every update or none of them.
    ///
    /// On success a propagation history entry is recorded on a best-effort
    /// basis.
    pub async fn apply_updates(&self, updates: &[StateUpdate], change: &StateChange) -> ApplyResult {
        match self.try_apply(updates, change).await {
            Ok(files_updated) => ApplyResult {
                success: true,
                files_updated,
                error: None,
            },
            Err(e) => ApplyResult {
                success: false,
                files_updated: Vec::new(),
                error: Some(e.to_string()),
            },
        }
    }

    /// Like [`apply_updates`](Self::apply_updates), keeping the typed error.
    ///
    /// A document that cannot be read is a storage error; a section that is
    /// not a mapping or a failed write is an update application error.
    pub async fn try_apply(
        &self,
        updates: &[StateUpdate],
        change: &StateChange,
    ) -> EngineResult<Vec<String>> {
        if updates.is_empty() {
            return Ok(Vec::new());
        }
        let paths = self.stage_and_commit(updates).await?;
        let files_updated: Vec<String> = paths.iter().map(ToString::to_string).collect();
        self.record_history(change, updates.len(), &files_updated)
            .await;
        Ok(files_updated)
    }

    async fn stage_and_commit(&self, updates: &[StateUpdate]) -> EngineResult<Vec<ResourcePath>> {
        let groups = group_by_resource(updates);
        let mut changeset = Changeset::new(self.state.clone(), self.world.clone());

        for (path, group) in &groups {
            let document = changeset.document_mut(path).await?;
            for update in group {
                let section = path_mut(document, update.section.segments()).ok_or_else(|| {
                    EngineError::UpdateApplication(format!(
                        "section '{}' in {} is not a mapping",
                        update.section, path
                    ))
                })?;
                shallow_merge(section, &update.updates);
            }
            tracing::debug!(resource = %path, updates = group.len(), "updates staged");
        }

        changeset
            .commit()
            .await
            .map_err(|e| EngineError::UpdateApplication(e.to_string()))?;
        Ok(groups.into_iter().map(|(path, _)| path).collect())
    }

    async fn record_history(&self, change: &StateChange, applied: usize, files: &[String]) {
        let record = PropagationRecord::new(
            change.change_type.to_string(),
            change.primary_entity.clone(),
            change.source_location_id.clone(),
            applied,
            files.to_vec(),
        );
        let result = async {
            let mut graph = self.world.read_graph().await?;
            graph.record_propagation(record, self.history_limit);
            self.world.write_graph(&graph).await
        }
        .await;

        if let Err(e) = result {
            tracing::warn!(
                primary_entity = %change.primary_entity,
                error = %e,
                "failed to record propagation history"
            );
        }
    }
}

/// Group updates by target, keeping the order each target was first seen
fn group_by_resource(updates: &[StateUpdate]) -> Vec<(ResourcePath, Vec<&StateUpdate>)> {
    let mut groups: Vec<(ResourcePath, Vec<&StateUpdate>)> = Vec::new();
    for update in updates {
        match groups.iter_mut().find(|(path, _)| path == &update.file_path) {
            Some((_, group)) => group.push(update),
            None => groups.push((update.file_path.clone(), vec![update])),
        }
    }
    groups
}
