#![warn(missing_docs)]
//! Core primitives shared across the workspace.

pub mod assignment;
pub mod config;
pub mod cooldown;
pub mod health;
pub mod layers;
pub mod universe;

use serde::{Deserialize, Serialize};

// Re-export commonly used types
pub use assignment::{PickMode, UniverseAssigner};
pub use config::{
    validate_drop_rate, BotConfig, ConfigError, SessionConfig, ShootingConfig, TransitionTiming,
};
pub use cooldown::ShotCooldown;
pub use health::{Health, Score};
pub use layers::{resolve, Layer, LayerMask, UniverseLayerSettings};
pub use universe::{TransitionState, Universe, UniverseState};

/// Slack used when comparing tick-accumulated session time against durations
/// configured as `f32`.
pub const TIME_EPSILON: f64 = 1e-6;

/// Fixed simulation tick counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SimTick(pub u64);

impl SimTick {
    /// First tick in any deterministic timeline.
    pub const ZERO: Self = Self(0);

    /// Advance by `delta` ticks.
    pub fn advance(self, delta: u64) -> Self {
        Self(self.0 + delta)
    }
}

/// Session-wide identifier of a networked player entity.
///
/// Assigned by the authority and stable for the entity's lifetime; never
/// reused within a session.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct EntityId(pub u64);

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}
