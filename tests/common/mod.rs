//! Common test utilities for the engine integration suites
//!
//! Shared campaign fixtures and graph generators.

#![allow(dead_code)]
#![allow(unused_imports)]

pub mod campaign;
pub mod graphs;

pub use campaign::{
    api_over, burgomaster_graph, death_of_burgomaster, doc, seeded_store, BURGOMASTER,
    DEATH_EVENT, VILLAGE,
};
pub use graphs::{fan_out, random_cyclic_graph};
