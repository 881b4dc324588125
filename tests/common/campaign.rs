//! Campaign fixtures: the Village of Barovia after the burgomaster's death

use barovia::{
    CampaignApi, Document, EffectSpec, EngineConfig, EventDefinition, MemoryStore,
    RelationshipGraph, ResourcePath,
};
use serde_json::{json, Value};
use std::sync::Arc;

pub const VILLAGE: &str = "village_of_barovia";
pub const BURGOMASTER: &str = "kolyan_indirovich";
pub const DEATH_EVENT: &str = "death_of_burgomaster";

/// Convert a JSON object literal into a document
pub fn doc(value: Value) -> Document {
    match value {
        Value::Object(map) => map,
        other => panic!("fixture must be an object, got {}", other),
    }
}

/// `death_of_burgomaster`: a single `npc_status` effect
pub fn death_of_burgomaster() -> EventDefinition {
    EventDefinition::new(DEATH_EVENT, "Death of the Burgomaster")
        .with_description("Kolyan Indirovich succumbs to his wounds.")
        .with_narrative_template(
            "{{eventName}}: the bells of {{location}} toll at {{time}} on {{date}}.",
        )
        .with_effect(EffectSpec::npc_status(BURGOMASTER, "Dead"))
}

/// The burgomaster's household, his quests and his council seat
pub fn burgomaster_graph() -> RelationshipGraph {
    let mut graph = RelationshipGraph::new();
    graph
        .add_family_at(BURGOMASTER, "ireena_kolyana", "daughter", VILLAGE)
        .add_family_at(BURGOMASTER, "ismark_kolyanovich", "son", VILLAGE)
        .add_family_at(BURGOMASTER, "donavich", "friend", VILLAGE)
        .add_family_at(BURGOMASTER, "doru", "enemy", VILLAGE)
        .add_dependent_quest(BURGOMASTER, "bury_the_burgomaster", "death")
        .add_dependent_quest(BURGOMASTER, "escort_ireena", "death")
        .add_faction(BURGOMASTER, "village_council")
        .add_family("ireena_kolyana", "ismark_kolyanovich", "family")
        .add_family("ireena_kolyana", "strahd_von_zarovich", "enemy");
    graph
}

/// Memory store seeded with the event, an empty `npcs` ledger and the graph
pub fn seeded_store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    store.add_event(VILLAGE, death_of_burgomaster());
    store.set_document(&ResourcePath::WorldState, doc(json!({ "npcs": {} })));
    store
        .set_graph(&burgomaster_graph())
        .expect("graph fixture serializes");
    store
}

pub fn api_over(store: &Arc<MemoryStore>) -> CampaignApi {
    CampaignApi::from_store(store.clone(), &EngineConfig::default())
}
