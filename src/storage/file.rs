//! File-backed collaborator backend over a campaign directory
//!
//! Layout under the campaign root:
//!
//! ```text
//! relationships.yaml            relationship graph
//! world-state.yaml              shared world-state ledger
//! active-quests.yaml            shared quest ledger
//! schedule.yaml                 event lifecycle status
//! npcs/<npc-id>.md              NPC documents (YAML frontmatter + notes)
//! <location>/Events.yaml        event definitions for a location
//! <location>/State.md           location state (frontmatter `custom_state`)
//! ```
//!
//! Markdown documents keep their body text; only the frontmatter is
//! rewritten. Every write goes to a temporary file first and is renamed into
//! place.

use super::traits::{
    LocationDataLoader, LocationState, ScheduleTracker, StateStore, StorageError, StorageResult,
    WorldGraphStore,
};
use crate::world::{
    is_path_safe, Document, EventDefinition, EventStatus, LocationEvents, RelationshipGraph,
    ResourceKind, ResourcePath,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

const GRAPH_FILE: &str = "relationships.yaml";
const SCHEDULE_FILE: &str = "schedule.yaml";
const EVENTS_FILE: &str = "Events.yaml";
const CUSTOM_STATE_KEY: &str = "custom_state";

/// Status line kept per event in `schedule.yaml`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub status: EventStatus,
    pub updated_at: DateTime<Utc>,
}

/// Collaborator backend that reads and writes a campaign directory
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Open a campaign directory, creating it if needed
    pub async fn open(root: impl AsRef<Path>) -> StorageResult<Self> {
        let root = root.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path of a logical resource.
    ///
    /// Fails with [`StorageError::UnsafePath`] if an embedded id would
    /// resolve outside the campaign root.
    pub fn resource_file(&self, path: &ResourcePath) -> StorageResult<PathBuf> {
        if !path.is_safe() {
            return Err(StorageError::UnsafePath(path.to_string()));
        }
        Ok(self.root.join(path.to_string()))
    }

    fn events_file(&self, location_id: &str) -> StorageResult<PathBuf> {
        if !is_path_safe(location_id) {
            return Err(StorageError::UnsafePath(location_id.to_string()));
        }
        Ok(self.root.join(location_id).join(EVENTS_FILE))
    }

    fn location_state_file(&self, location_id: &str) -> StorageResult<PathBuf> {
        self.resource_file(&ResourcePath::LocationState(location_id.to_string()))
    }

    /// Write a location's event definitions document
    pub async fn save_location_events(
        &self,
        location_id: &str,
        events: &LocationEvents,
    ) -> StorageResult<()> {
        let content = serde_yaml::to_string(events)?;
        write_atomic(&self.events_file(location_id)?, &content).await
    }

    /// Status recorded for every event so far
    pub async fn schedule(&self) -> StorageResult<BTreeMap<String, ScheduleEntry>> {
        let path = self.root.join(SCHEDULE_FILE);
        match read_optional(&path).await? {
            Some(content) if !content.trim().is_empty() => Ok(serde_yaml::from_str(&content)?),
            _ => Ok(BTreeMap::new()),
        }
    }

    /// Read a Markdown resource as (frontmatter, body)
    async fn read_markdown(&self, file: &Path) -> StorageResult<Option<(Document, String)>> {
        let Some(content) = read_optional(file).await? else {
            return Ok(None);
        };
        let (frontmatter, body) = split_frontmatter(&content);
        let document = match frontmatter {
            Some(yaml) => parse_yaml_document(yaml, file)?,
            None => Document::new(),
        };
        Ok(Some((document, body.to_string())))
    }

    async fn write_markdown(&self, file: &Path, document: &Document, body: &str) -> StorageResult<()> {
        let content = render_markdown(document, body)?;
        write_atomic(file, &content).await
    }
}

/// Split `---` delimited YAML frontmatter from a Markdown body.
///
/// Returns `(None, content)` if the content has no frontmatter block.
fn split_frontmatter(content: &str) -> (Option<&str>, &str) {
    let trimmed = content.trim_start();
    let Some(after_open) = trimmed.strip_prefix("---") else {
        return (None, content);
    };
    let Some(end) = after_open.find("\n---") else {
        return (None, content);
    };
    let frontmatter = &after_open[..end];
    let rest = &after_open[end + 4..];
    let body = rest.strip_prefix('\n').unwrap_or(rest);
    (Some(frontmatter), body)
}

fn render_markdown(document: &Document, body: &str) -> StorageResult<String> {
    let yaml = serde_yaml::to_string(document)?;
    Ok(format!("---\n{}---\n{}", yaml, body))
}

fn parse_yaml_document(yaml: &str, file: &Path) -> StorageResult<Document> {
    if yaml.trim().is_empty() {
        return Ok(Document::new());
    }
    match serde_yaml::from_str::<Value>(yaml)? {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Document::new()),
        _ => Err(StorageError::Malformed {
            path: file.display().to_string(),
            reason: "expected a mapping at the top level".to_string(),
        }),
    }
}

async fn read_optional(file: &Path) -> StorageResult<Option<String>> {
    match tokio::fs::read_to_string(file).await {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

async fn write_atomic(file: &Path, content: &str) -> StorageResult<()> {
    if let Some(parent) = file.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let mut tmp = file.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    tokio::fs::write(&tmp, content).await?;
    tokio::fs::rename(&tmp, file).await?;
    Ok(())
}

#[async_trait]
impl LocationDataLoader for FileStore {
    async fn load_event_definition(
        &self,
        event_id: &str,
        location_id: &str,
    ) -> StorageResult<Option<EventDefinition>> {
        let file = self.events_file(location_id)?;
        let Some(content) = read_optional(&file).await? else {
            return Ok(None);
        };
        if content.trim().is_empty() {
            return Ok(None);
        }
        let events: LocationEvents = serde_yaml::from_str(&content)?;
        Ok(events.find(event_id).cloned())
    }
}

#[async_trait]
impl StateStore for FileStore {
    async fn get_state(&self, location_id: &str) -> StorageResult<LocationState> {
        let file = self.location_state_file(location_id)?;
        let custom_state = match self.read_markdown(&file).await? {
            Some((frontmatter, _)) => match frontmatter.get(CUSTOM_STATE_KEY) {
                Some(Value::Object(map)) => map.clone(),
                Some(Value::Null) | None => Document::new(),
                Some(_) => {
                    return Err(StorageError::Malformed {
                        path: file.display().to_string(),
                        reason: format!("'{}' is not a mapping", CUSTOM_STATE_KEY),
                    })
                }
            },
            None => Document::new(),
        };
        Ok(LocationState {
            location_id: location_id.to_string(),
            custom_state,
        })
    }

    async fn update_custom_state(
        &self,
        location_id: &str,
        custom_state: &Document,
    ) -> StorageResult<()> {
        let file = self.location_state_file(location_id)?;
        let (mut frontmatter, body) = self.read_markdown(&file).await?.unwrap_or_default();
        frontmatter.insert(
            CUSTOM_STATE_KEY.to_string(),
            Value::Object(custom_state.clone()),
        );
        self.write_markdown(&file, &frontmatter, &body).await
    }
}

#[async_trait]
impl ScheduleTracker for FileStore {
    async fn update_event_status(&self, event_id: &str, status: EventStatus) -> StorageResult<()> {
        let mut schedule = self.schedule().await?;
        schedule.insert(
            event_id.to_string(),
            ScheduleEntry {
                status,
                updated_at: Utc::now(),
            },
        );
        let content = serde_yaml::to_string(&schedule)?;
        write_atomic(&self.root.join(SCHEDULE_FILE), &content).await
    }
}

#[async_trait]
impl WorldGraphStore for FileStore {
    async fn read_graph(&self) -> StorageResult<RelationshipGraph> {
        let file = self.root.join(GRAPH_FILE);
        match read_optional(&file).await? {
            Some(content) if !content.trim().is_empty() => Ok(serde_yaml::from_str(&content)?),
            _ => {
                let graph = RelationshipGraph::new();
                tracing::info!(path = %file.display(), "creating default relationship graph");
                self.write_graph(&graph).await?;
                Ok(graph)
            }
        }
    }

    async fn write_graph(&self, graph: &RelationshipGraph) -> StorageResult<()> {
        let content = serde_yaml::to_string(graph)?;
        write_atomic(&self.root.join(GRAPH_FILE), &content).await
    }

    async fn read_document(&self, path: &ResourcePath) -> StorageResult<Option<Document>> {
        let file = self.resource_file(path)?;
        match path.kind() {
            ResourceKind::NpcDocument | ResourceKind::LocationState => {
                Ok(self.read_markdown(&file).await?.map(|(document, _)| document))
            }
            ResourceKind::Ledger => {
                match read_optional(&file).await? {
                    Some(content) => Ok(Some(parse_yaml_document(&content, &file)?)),
                    None => Ok(None),
                }
            }
        }
    }

    async fn write_document(&self, path: &ResourcePath, document: &Document) -> StorageResult<()> {
        let file = self.resource_file(path)?;
        match path.kind() {
            ResourceKind::NpcDocument | ResourceKind::LocationState => {
                let body = self
                    .read_markdown(&file)
                    .await?
                    .map(|(_, body)| body)
                    .unwrap_or_default();
                self.write_markdown(&file, document, &body).await
            }
            ResourceKind::Ledger => {
                let content = serde_yaml::to_string(document)?;
                write_atomic(&file, &content).await
            }
        }
    }
}
