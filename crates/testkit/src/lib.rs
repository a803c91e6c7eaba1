#![warn(missing_docs)]
//! Deterministic testing surfaces: golden JSON snapshots and tick-stepped
//! micro-worldtests.

mod micro_worldtest;
mod snapshot;

pub use micro_worldtest::*;
pub use snapshot::*;
