//! State updates: the unit handed to persistence

use super::document::Document;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// File name of the shared world-state ledger
pub const WORLD_STATE_FILE: &str = "world-state.yaml";
/// File name of the shared quest ledger
pub const ACTIVE_QUESTS_FILE: &str = "active-quests.yaml";

/// Which backing writer a resource goes through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    /// Shared YAML ledger
    Ledger,
    /// Per-NPC Markdown document
    NpcDocument,
    /// Per-location `State.md` custom state
    LocationState,
}

/// Logical address of a persisted document
///
/// Serializes as the document's path (`world-state.yaml`,
/// `npcs/<npc-id>.md`, `<location>/State.md`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ResourcePath {
    WorldState,
    ActiveQuests,
    Npc(String),
    LocationState(String),
}

/// Whether `id` can name a single file or directory inside the campaign
/// root: non-empty, no path separators, no `..`.
pub fn is_path_safe(id: &str) -> bool {
    !id.trim().is_empty()
        && id != "."
        && !id.contains("..")
        && !id.contains(['/', '\\', '\0'])
}

impl ResourcePath {
    /// An NPC document path, or `None` if the id is not path-safe
    pub fn npc(id: impl Into<String>) -> Option<Self> {
        let id = id.into();
        is_path_safe(&id).then_some(ResourcePath::Npc(id))
    }

    /// A location state path, or `None` if the id is not path-safe
    pub fn location_state(id: impl Into<String>) -> Option<Self> {
        let id = id.into();
        is_path_safe(&id).then_some(ResourcePath::LocationState(id))
    }

    /// False if an embedded id would escape its directory
    pub fn is_safe(&self) -> bool {
        match self {
            ResourcePath::WorldState | ResourcePath::ActiveQuests => true,
            ResourcePath::Npc(id) | ResourcePath::LocationState(id) => is_path_safe(id),
        }
    }

    /// Parse a logical path by its shape
    pub fn parse(path: &str) -> Option<Self> {
        match path {
            WORLD_STATE_FILE => return Some(ResourcePath::WorldState),
            ACTIVE_QUESTS_FILE => return Some(ResourcePath::ActiveQuests),
            _ => {}
        }
        if let Some(location) = path.strip_suffix("/State.md") {
            return ResourcePath::location_state(location);
        }
        path.strip_prefix("npcs/")
            .and_then(|p| p.strip_suffix(".md"))
            .and_then(ResourcePath::npc)
    }

    pub fn kind(&self) -> ResourceKind {
        match self {
            ResourcePath::WorldState | ResourcePath::ActiveQuests => ResourceKind::Ledger,
            ResourcePath::Npc(_) => ResourceKind::NpcDocument,
            ResourcePath::LocationState(_) => ResourceKind::LocationState,
        }
    }
}

impl fmt::Display for ResourcePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourcePath::WorldState => f.write_str(WORLD_STATE_FILE),
            ResourcePath::ActiveQuests => f.write_str(ACTIVE_QUESTS_FILE),
            ResourcePath::Npc(id) => write!(f, "npcs/{}.md", id),
            ResourcePath::LocationState(id) => write!(f, "{}/State.md", id),
        }
    }
}

impl TryFrom<String> for ResourcePath {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        ResourcePath::parse(&s).ok_or_else(|| format!("unrecognized resource path: {}", s))
    }
}

impl From<ResourcePath> for String {
    fn from(path: ResourcePath) -> Self {
        path.to_string()
    }
}

/// Location of a mapping inside a document, as a list of literal keys.
///
/// Displays and serializes dotted (`factions.village_council`). Parsing a
/// string splits on `.`; build it with [`SectionPath::key`] and
/// [`SectionPath::child`] when a key may itself contain dots.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct SectionPath(Vec<String>);

impl SectionPath {
    /// A top-level key, taken literally
    pub fn key(key: impl Into<String>) -> Self {
        Self(vec![key.into()])
    }

    /// A literal key nested under this section
    pub fn child(mut self, key: impl Into<String>) -> Self {
        self.0.push(key.into());
        self
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for SectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("."))
    }
}

impl From<&str> for SectionPath {
    fn from(s: &str) -> Self {
        Self(s.split('.').map(str::to_string).collect())
    }
}

impl From<String> for SectionPath {
    fn from(s: String) -> Self {
        SectionPath::from(s.as_str())
    }
}

impl From<SectionPath> for String {
    fn from(path: SectionPath) -> Self {
        path.to_string()
    }
}

impl PartialEq<&str> for SectionPath {
    fn eq(&self, other: &&str) -> bool {
        self.to_string() == *other
    }
}

/// A pending write: merge `updates` into `section` of the document at `file_path`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateUpdate {
    pub file_path: ResourcePath,
    pub section: SectionPath,
    pub updates: Document,
    pub timestamp: DateTime<Utc>,
}

impl StateUpdate {
    pub fn new(file_path: ResourcePath, section: impl Into<SectionPath>, updates: Document) -> Self {
        Self {
            file_path,
            section: section.into(),
            updates,
            timestamp: Utc::now(),
        }
    }
}

/// Human-readable summary of one write performed by an event effect
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateUpdateRecord {
    pub file: String,
    pub section: String,
    pub change: String,
}

impl StateUpdateRecord {
    pub fn new(
        file: impl Into<String>,
        section: impl Into<String>,
        change: impl Into<String>,
    ) -> Self {
        Self {
            file: file.into(),
            section: section.into(),
            change: change.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_parse_by_shape() {
        assert_eq!(ResourcePath::parse("world-state.yaml"), Some(ResourcePath::WorldState));
        assert_eq!(
            ResourcePath::parse("active-quests.yaml"),
            Some(ResourcePath::ActiveQuests)
        );
        assert_eq!(
            ResourcePath::parse("npcs/ireena_kolyana.md"),
            Some(ResourcePath::Npc("ireena_kolyana".to_string()))
        );
        assert_eq!(
            ResourcePath::parse("village_of_barovia/State.md"),
            Some(ResourcePath::LocationState("village_of_barovia".to_string()))
        );
        assert_eq!(ResourcePath::parse("/State.md"), None);
        assert_eq!(ResourcePath::parse("npcs/a/b.md"), None);
        assert_eq!(ResourcePath::parse("notes.txt"), None);
        assert_eq!(ResourcePath::parse("npcs/../../escaped.md"), None);
        assert_eq!(ResourcePath::parse("../State.md"), None);
    }

    #[test]
    fn ids_that_leave_their_directory_are_rejected() {
        for id in ["", "  ", ".", "..", "../../escaped", "a/b", "a\\b", "..hidden"] {
            assert!(!is_path_safe(id), "{:?} accepted", id);
            assert!(ResourcePath::npc(id).is_none());
            assert!(ResourcePath::location_state(id).is_none());
        }
        assert_eq!(
            ResourcePath::npc("st.andral"),
            Some(ResourcePath::Npc("st.andral".to_string()))
        );
        assert!(!ResourcePath::Npc("../x".into()).is_safe());
        assert!(ResourcePath::WorldState.is_safe());
    }

    #[test]
    fn section_paths_keep_dotted_keys_whole() {
        let section = SectionPath::key("factions").child("order.of.the.silver.dragon");
        assert_eq!(section.segments().len(), 2);
        assert_eq!(section, "factions.order.of.the.silver.dragon");
        assert_eq!(SectionPath::from("npcs.ismark").segments(), ["npcs", "ismark"]);
    }

    #[test]
    fn display_is_the_inverse_of_parse() {
        for path in [
            ResourcePath::WorldState,
            ResourcePath::ActiveQuests,
            ResourcePath::Npc("strahd".to_string()),
            ResourcePath::LocationState("vallaki".to_string()),
        ] {
            assert_eq!(ResourcePath::parse(&path.to_string()), Some(path));
        }
    }

    #[test]
    fn kinds_select_the_backing_writer() {
        assert_eq!(ResourcePath::WorldState.kind(), ResourceKind::Ledger);
        assert_eq!(ResourcePath::Npc("x".into()).kind(), ResourceKind::NpcDocument);
        assert_eq!(
            ResourcePath::LocationState("x".into()).kind(),
            ResourceKind::LocationState
        );
    }

    #[test]
    fn state_update_serializes_path_as_string() {
        let update = StateUpdate::new(ResourcePath::Npc("ismark".into()), "emotional_state", Document::new());
        let value = serde_json::to_value(&update).unwrap();
        assert_eq!(value["file_path"], "npcs/ismark.md");
    }
}
