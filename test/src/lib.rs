//! # Fedra Test
//! Integration, scenario, and property tests for the fedra coordination
//! server, plus the shared test helpers they build on.

pub mod helpers;
