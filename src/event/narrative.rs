//! Narrative text for executed events
//!
//! Templates use `{{variable}}` placeholders. Only `eventName`, `location`,
//! `date` and `time` are substituted; any other placeholder is left as
//! written. Rendering never fails.

use crate::world::{EventDefinition, GameState, TriggeredEvent};

const UNKNOWN_EVENT: &str = "Unknown Event";
const UNKNOWN_LOCATION: &str = "an unknown location";
const UNKNOWN_DATE: &str = "an unknown date";
const UNKNOWN_TIME: &str = "an unknown time";

/// Everything narrative generation reads about an event
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NarrativeContext {
    pub event_name: Option<String>,
    pub location: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub narrative_template: Option<String>,
    pub description: Option<String>,
}

impl NarrativeContext {
    /// Combine the authored definition with the triggered instance.
    ///
    /// The definition's name wins over the trigger's; the trigger's date and
    /// time win over the session clock.
    pub fn for_event(
        definition: &EventDefinition,
        event: &TriggeredEvent,
        game_state: &GameState,
    ) -> Self {
        Self {
            event_name: non_empty(Some(definition.name.clone())).or_else(|| event.name.clone()),
            location: non_empty(Some(event.location_id.clone())),
            date: event.date.clone().or_else(|| game_state.current_date.clone()),
            time: event.time.clone().or_else(|| game_state.current_time.clone()),
            narrative_template: definition.narrative_template.clone(),
            description: definition.description.clone(),
        }
    }

    fn variable(&self, name: &str) -> Option<&str> {
        let (value, fallback) = match name {
            "eventName" => (&self.event_name, UNKNOWN_EVENT),
            "location" => (&self.location, UNKNOWN_LOCATION),
            "date" => (&self.date, UNKNOWN_DATE),
            "time" => (&self.time, UNKNOWN_TIME),
            _ => return None,
        };
        Some(
            value
                .as_deref()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(fallback),
        )
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Build the narrative shown to the table after an event executes.
pub fn generate_event_narrative(ctx: &NarrativeContext, player_present: bool) -> String {
    let body = match (
        non_empty(ctx.narrative_template.clone()),
        non_empty(ctx.description.clone()),
    ) {
        (Some(template), _) => template,
        (None, Some(description)) => description,
        (None, None) => format!(
            "Event \"{}\" occurred.",
            ctx.variable("eventName").unwrap_or(UNKNOWN_EVENT)
        ),
    };
    let text = render(&body, ctx);

    if player_present {
        format!("You witness the following event:\n\n{}", text)
    } else {
        format!(
            "At {}, the following occurred:\n\n{}",
            ctx.variable("location").unwrap_or(UNKNOWN_LOCATION),
            text
        )
    }
}

/// Substitute known `{{name}}` placeholders
fn render(template: &str, ctx: &NarrativeContext) -> String {
    let mut result = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        result.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            // Unclosed: keep the remainder verbatim
            result.push_str(&rest[start..]);
            return result;
        };
        let name = after[..end].trim();
        match ctx.variable(name) {
            Some(value) => result.push_str(value),
            None => result.push_str(&rest[start..start + 2 + end + 2]),
        }
        rest = &after[end + 2..];
    }

    result.push_str(rest);
    result
}
