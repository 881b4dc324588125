//! World-state changes: the trigger that starts a propagation run

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What kind of world change happened
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ChangeType {
    /// An NPC died
    NpcDeath,
    /// An NPC's status changed to something other than dead
    NpcStatus,
    /// A quest changed state
    QuestUpdate,
    /// A faction's standing changed
    FactionUpdate,
    /// A location's custom state changed
    LocationUpdate,
    /// Any other campaign-specific change
    Custom(String),
}

impl ChangeType {
    pub fn as_str(&self) -> &str {
        match self {
            ChangeType::NpcDeath => "npc_death",
            ChangeType::NpcStatus => "npc_status",
            ChangeType::QuestUpdate => "quest_update",
            ChangeType::FactionUpdate => "faction_update",
            ChangeType::LocationUpdate => "location_update",
            ChangeType::Custom(s) => s,
        }
    }

    pub fn is_death(&self) -> bool {
        matches!(self, ChangeType::NpcDeath)
    }

    pub fn is_empty(&self) -> bool {
        self.as_str().trim().is_empty()
    }
}

impl From<&str> for ChangeType {
    fn from(s: &str) -> Self {
        match s {
            "npc_death" | "death" => ChangeType::NpcDeath,
            "npc_status" => ChangeType::NpcStatus,
            "quest_update" => ChangeType::QuestUpdate,
            "faction_update" => ChangeType::FactionUpdate,
            "location_update" => ChangeType::LocationUpdate,
            other => ChangeType::Custom(other.to_string()),
        }
    }
}

impl From<String> for ChangeType {
    fn from(s: String) -> Self {
        ChangeType::from(s.as_str())
    }
}

impl From<ChangeType> for String {
    fn from(change_type: ChangeType) -> Self {
        change_type.as_str().to_string()
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which relationship edges a propagation run may follow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PropagationRules {
    /// Expand family/ally edges
    #[serde(alias = "affectRelationships")]
    pub affect_relationships: bool,
    /// Expand dependent-quest edges
    #[serde(alias = "affectQuests")]
    pub affect_quests: bool,
    /// Expand faction-membership edges
    #[serde(alias = "affectFactions")]
    pub affect_factions: bool,
    /// Allow-list of locations; entities known to sit elsewhere are dropped
    #[serde(alias = "affectedLocations", skip_serializing_if = "Option::is_none")]
    pub affected_locations: Option<Vec<String>>,
    /// How many hops away from the origin the traversal may expand.
    /// `1` processes first-order neighbors only.
    #[serde(alias = "maxCascadeLevels")]
    pub max_cascade_levels: usize,
}

impl Default for PropagationRules {
    fn default() -> Self {
        Self {
            affect_relationships: true,
            affect_quests: true,
            affect_factions: true,
            affected_locations: None,
            max_cascade_levels: 1,
        }
    }
}

impl PropagationRules {
    pub fn relationships(mut self, enabled: bool) -> Self {
        self.affect_relationships = enabled;
        self
    }

    pub fn quests(mut self, enabled: bool) -> Self {
        self.affect_quests = enabled;
        self
    }

    pub fn factions(mut self, enabled: bool) -> Self {
        self.affect_factions = enabled;
        self
    }

    pub fn only_locations<I, S>(mut self, locations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.affected_locations = Some(locations.into_iter().map(Into::into).collect());
        self
    }

    pub fn cascade_levels(mut self, levels: usize) -> Self {
        self.max_cascade_levels = levels;
        self
    }

    /// True if an entity at `location` passes the location allow-list.
    /// Entities with no known location always pass.
    pub fn allows_location(&self, location: Option<&str>) -> bool {
        match (&self.affected_locations, location) {
            (Some(allowed), Some(location)) => allowed.iter().any(|l| l == location),
            _ => true,
        }
    }
}

/// A world change handed to the propagator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateChange {
    #[serde(alias = "changeType")]
    pub change_type: ChangeType,
    #[serde(
        default,
        alias = "sourceLocationId",
        skip_serializing_if = "Option::is_none"
    )]
    pub source_location_id: Option<String>,
    #[serde(alias = "primaryEntity")]
    pub primary_entity: String,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    #[serde(default, alias = "propagationRules")]
    pub propagation_rules: PropagationRules,
}

impl StateChange {
    pub fn new(change_type: impl Into<ChangeType>, primary_entity: impl Into<String>) -> Self {
        Self {
            change_type: change_type.into(),
            source_location_id: None,
            primary_entity: primary_entity.into(),
            timestamp: Utc::now(),
            propagation_rules: PropagationRules::default(),
        }
    }

    /// Shorthand for an NPC death
    pub fn npc_death(npc_id: impl Into<String>) -> Self {
        Self::new(ChangeType::NpcDeath, npc_id)
    }

    pub fn from_location(mut self, location_id: impl Into<String>) -> Self {
        self.source_location_id = Some(location_id.into());
        self
    }

    pub fn with_rules(mut self, rules: PropagationRules) -> Self {
        self.propagation_rules = rules;
        self
    }
}
