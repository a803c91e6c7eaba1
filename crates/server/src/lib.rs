#![warn(missing_docs)]
//! Authoritative session host.
//!
//! Runs every player's universe transition machine, resolves hit-scan shots
//! against the shooter's authoritative shoot mask, keeps health and score,
//! and replicates universe state to connected clients.

pub mod bot;
pub mod components;
pub mod session;
pub mod shooting;
pub mod systems;
pub mod transition;

pub use session::{ClientId, Session, PLAYER_HALF_EXTENTS};
pub use shooting::{fire_shot, ShotOutcome};
pub use transition::UniverseTransition;
