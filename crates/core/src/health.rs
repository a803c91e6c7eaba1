//! Authoritative health and kill score counters.

use serde::{Deserialize, Serialize};

/// Hit points of one player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Health {
    current: u32,
    max: u32,
}

impl Health {
    /// Full health with the given maximum.
    pub fn new(max: u32) -> Self {
        Self { current: max, max }
    }

    /// Current hit points.
    pub fn current(&self) -> u32 {
        self.current
    }

    /// Maximum hit points.
    pub fn max(&self) -> u32 {
        self.max
    }

    /// Whether the player is down.
    pub fn is_dead(&self) -> bool {
        self.current == 0
    }

    /// Restore to full, as on (re)spawn.
    pub fn reset(&mut self) {
        self.current = self.max;
    }

    /// Remove one point.
    ///
    /// Returns true only for the hit that takes health from above zero to
    /// zero; hits on an already dead player change nothing and return false.
    pub fn take_damage(&mut self) -> bool {
        if self.current == 0 {
            return false;
        }
        self.current -= 1;
        self.current == 0
    }
}

/// Kill counter with a match-ending target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    kills: u32,
    target: u32,
}

impl Score {
    /// Zero kills toward `target`.
    pub fn new(target: u32) -> Self {
        Self { kills: 0, target }
    }

    /// Kills so far.
    pub fn kills(&self) -> u32 {
        self.kills
    }

    /// Credit one kill. Returns true exactly when this kill reaches the target.
    pub fn credit_kill(&mut self) -> bool {
        self.kills += 1;
        self.kills == self.target
    }
}
