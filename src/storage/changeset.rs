//! Staged, all-or-nothing writes across several documents
//!
//! Every document an operation touches is loaded once into the changeset,
//! mutated in memory, and only written when the whole batch has been staged
//! without error. If a write fails part-way through the flush, the documents
//! already written are restored from the snapshots taken at load time.

use super::traits::{StateStore, StorageError, StorageResult, WorldGraphStore};
use crate::world::{Document, ResourcePath};
use std::fmt;
use std::sync::Arc;

/// A document loaded into the changeset
struct StagedDocument {
    path: ResourcePath,
    /// Content as loaded; `None` if the document did not exist
    original: Option<Document>,
    current: Document,
}

impl StagedDocument {
    fn is_dirty(&self) -> bool {
        match &self.original {
            Some(original) => original != &self.current,
            None => !self.current.is_empty(),
        }
    }
}

/// Why a flush failed, and what the rollback managed to undo
#[derive(Debug)]
pub struct CommitError {
    /// Resource whose write failed
    pub failed: ResourcePath,
    pub source: StorageError,
    /// Resources restored to their snapshot
    pub rolled_back: Vec<ResourcePath>,
    /// Resources that could not be restored, with the reason
    pub rollback_failures: Vec<(ResourcePath, String)>,
}

impl CommitError {
    /// True if every written resource was restored
    pub fn fully_rolled_back(&self) -> bool {
        self.rollback_failures.is_empty()
    }
}

impl fmt::Display for CommitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "write to {} failed: {}", self.failed, self.source)?;
        if self.fully_rolled_back() {
            write!(f, "; rolled back {} resource(s)", self.rolled_back.len())
        } else {
            let failed: Vec<String> = self
                .rollback_failures
                .iter()
                .map(|(path, reason)| format!("{} ({})", path, reason))
                .collect();
            write!(f, "; rollback required but failed for {}", failed.join(", "))
        }
    }
}

impl std::error::Error for CommitError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

/// In-memory staging area over the state store and the world graph store
pub struct Changeset {
    state: Arc<dyn StateStore>,
    world: Arc<dyn WorldGraphStore>,
    staged: Vec<StagedDocument>,
}

impl Changeset {
    pub fn new(state: Arc<dyn StateStore>, world: Arc<dyn WorldGraphStore>) -> Self {
        Self {
            state,
            world,
            staged: Vec::new(),
        }
    }

    /// Mutable access to the staged copy of a document, loading it on first
    /// touch. Missing documents stage as empty.
    pub async fn document_mut(&mut self, path: &ResourcePath) -> StorageResult<&mut Document> {
        let index = match self.staged.iter().position(|s| &s.path == path) {
            Some(index) => index,
            None => {
                let original = self.load(path).await?;
                self.staged.push(StagedDocument {
                    path: path.clone(),
                    current: original.clone().unwrap_or_default(),
                    original,
                });
                self.staged.len() - 1
            }
        };
        Ok(&mut self.staged[index].current)
    }

    /// Paths touched so far, in first-touched order
    pub fn paths(&self) -> Vec<&ResourcePath> {
        self.staged.iter().map(|s| &s.path).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.staged.is_empty()
    }

    /// Write every changed document in first-touched order.
    ///
    /// Returns the paths actually written. Unchanged documents are skipped.
    pub async fn commit(self) -> Result<Vec<ResourcePath>, CommitError> {
        let mut written: Vec<&StagedDocument> = Vec::new();

        for staged in self.staged.iter().filter(|s| s.is_dirty()) {
            if let Err(source) = self.write(&staged.path, &staged.current).await {
                tracing::warn!(
                    resource = %staged.path,
                    error = %source,
                    written = written.len(),
                    "write failed, rolling back staged documents"
                );
                let (rolled_back, rollback_failures) = self.rollback(&written).await;
                return Err(CommitError {
                    failed: staged.path.clone(),
                    source,
                    rolled_back,
                    rollback_failures,
                });
            }
            written.push(staged);
        }

        Ok(written.into_iter().map(|s| s.path.clone()).collect())
    }

    /// Restore already-written documents, newest first
    async fn rollback(
        &self,
        written: &[&StagedDocument],
    ) -> (Vec<ResourcePath>, Vec<(ResourcePath, String)>) {
        let mut restored = Vec::new();
        let mut failures = Vec::new();

        for staged in written.iter().rev() {
            let snapshot = staged.original.clone().unwrap_or_default();
            match self.write(&staged.path, &snapshot).await {
                Ok(()) => restored.push(staged.path.clone()),
                Err(e) => {
                    tracing::error!(
                        resource = %staged.path,
                        error = %e,
                        "rollback write failed, document left modified"
                    );
                    failures.push((staged.path.clone(), e.to_string()));
                }
            }
        }

        (restored, failures)
    }

    async fn load(&self, path: &ResourcePath) -> StorageResult<Option<Document>> {
        match path {
            ResourcePath::LocationState(location_id) => {
                let state = self.state.get_state(location_id).await?;
                Ok(Some(state.custom_state))
            }
            _ => self.world.read_document(path).await,
        }
    }

    async fn write(&self, path: &ResourcePath, document: &Document) -> StorageResult<()> {
        match path {
            ResourcePath::LocationState(location_id) => {
                self.state.update_custom_state(location_id, document).await
            }
            _ => self.world.write_document(path, document).await,
        }
    }
}
