//! Relationship graph generators for traversal tests

use barovia::RelationshipGraph;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const RELATIONS: [&str; 5] = ["family", "friend", "enemy", "ally", "rival"];

/// `origin` with `count` family edges and nothing beyond them
pub fn fan_out(origin: &str, count: usize) -> RelationshipGraph {
    let mut graph = RelationshipGraph::new();
    for i in 0..count {
        graph.add_family(origin, format!("relative_{}", i), "family");
    }
    graph
}

/// Random graph over `nodes` NPCs (`npc_0` ..) that always contains the
/// cycle `npc_0 -> npc_1 -> ... -> npc_0`, plus `extra_edges` random edges,
/// some quests and some factions.
pub fn random_cyclic_graph(seed: u64, nodes: usize, extra_edges: usize) -> RelationshipGraph {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut graph = RelationshipGraph::new();
    let name = |i: usize| format!("npc_{}", i);

    for i in 0..nodes {
        graph.add_family(name(i), name((i + 1) % nodes), "family");
    }
    for _ in 0..extra_edges {
        let from = rng.gen_range(0..nodes);
        let to = rng.gen_range(0..nodes);
        let relation = RELATIONS[rng.gen_range(0..RELATIONS.len())];
        graph.add_family(name(from), name(to), relation);
    }
    for i in 0..nodes / 3 {
        let holder = rng.gen_range(0..nodes);
        graph.add_dependent_quest(name(holder), format!("quest_{}", i), "death");
        graph.add_faction(name(holder), format!("faction_{}", i % 2));
    }
    graph
}
