//! Event definitions, effects and the events that trigger them

use super::document::Document;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// One declarative mutation instruction inside an event definition.
///
/// The `type` tag selects the handler; every other key is the handler's
/// payload. Payloads are parsed lazily by the handler that owns the kind, so
/// unknown kinds load fine and are skipped at execution time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectSpec {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(flatten)]
    pub fields: Document,
}

impl EffectSpec {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            fields: Document::new(),
        }
    }

    /// Add a payload field
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// `npc_status` effect
    pub fn npc_status(npc_id: impl Into<String>, status: impl Into<String>) -> Self {
        Self::new("npc_status")
            .with_field("npc_id", npc_id.into())
            .with_field("status", status.into())
    }

    /// `state_update` effect merged into the triggering event's location
    pub fn state_update(state_changes: Document) -> Self {
        Self::new("state_update").with_field("state_changes", Value::Object(state_changes))
    }

    /// `quest_trigger` effect
    pub fn quest_trigger(quest_id: impl Into<String>, new_status: impl Into<String>) -> Self {
        Self::new("quest_trigger")
            .with_field("quest_id", quest_id.into())
            .with_field("new_status", new_status.into())
    }

    /// Parse the payload into a handler-specific parameter type.
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(Value::Object(self.fields.clone()))
    }
}

/// The static, authored description of a narrative event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventDefinition {
    #[serde(alias = "eventId")]
    pub event_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Applied strictly in declaration order
    #[serde(default)]
    pub effects: Vec<EffectSpec>,
    #[serde(
        default,
        alias = "narrativeTemplate",
        skip_serializing_if = "Option::is_none"
    )]
    pub narrative_template: Option<String>,
}

impl EventDefinition {
    pub fn new(event_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            event_id: event_id.into(),
            name: name.into(),
            description: None,
            effects: Vec::new(),
            narrative_template: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_effect(mut self, effect: EffectSpec) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn with_narrative_template(mut self, template: impl Into<String>) -> Self {
        self.narrative_template = Some(template.into());
        self
    }
}

/// The per-location events document (`<location>/Events.yaml`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocationEvents {
    #[serde(default)]
    pub events: Vec<EventDefinition>,
}

impl LocationEvents {
    /// Find a definition by id
    pub fn find(&self, event_id: &str) -> Option<&EventDefinition> {
        self.events.iter().find(|e| e.event_id == event_id)
    }

    /// Insert or replace a definition, keeping declaration order
    pub fn upsert(&mut self, definition: EventDefinition) {
        match self
            .events
            .iter_mut()
            .find(|e| e.event_id == definition.event_id)
        {
            Some(existing) => *existing = definition,
            None => self.events.push(definition),
        }
    }
}

/// A scheduled event that has fired and is handed to the executor
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TriggeredEvent {
    #[serde(default, alias = "eventId")]
    pub event_id: String,
    #[serde(default, alias = "locationId")]
    pub location_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
}

impl TriggeredEvent {
    pub fn new(event_id: impl Into<String>, location_id: impl Into<String>) -> Self {
        Self {
            event_id: event_id.into(),
            location_id: location_id.into(),
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn at(mut self, date: impl Into<String>, time: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self.time = Some(time.into());
        self
    }
}

/// The slice of session state the executor needs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_time: Option<String>,
    /// Where the party currently is
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_location: Option<String>,
}

impl GameState {
    pub fn with_player_at(location_id: impl Into<String>) -> Self {
        Self {
            player_location: Some(location_id.into()),
            ..Default::default()
        }
    }

    /// True if the party is at the given location
    pub fn player_present(&self, location_id: &str) -> bool {
        self.player_location.as_deref() == Some(location_id)
    }
}

/// Lifecycle status recorded with the schedule tracker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Pending,
    Completed,
    Failed,
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EventStatus::Pending => "pending",
            EventStatus::Completed => "completed",
            EventStatus::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}
