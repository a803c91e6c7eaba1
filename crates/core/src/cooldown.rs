//! Fire-rate limiting.

use crate::TIME_EPSILON;

/// Per-player fire-rate limiter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShotCooldown {
    cooldown: f64,
    last_shot: Option<f64>,
}

impl ShotCooldown {
    /// Limiter allowing one shot per `cooldown` seconds.
    pub fn new(cooldown: f32) -> Self {
        Self {
            cooldown: f64::from(cooldown),
            last_shot: None,
        }
    }

    /// Whether a shot at `now` would be accepted.
    pub fn ready(&self, now: f64) -> bool {
        match self.last_shot {
            None => true,
            Some(last) => now - last + TIME_EPSILON >= self.cooldown,
        }
    }

    /// Accept and record a shot at `now`, or reject it without side effects.
    pub fn try_fire(&mut self, now: f64) -> bool {
        if !self.ready(now) {
            return false;
        }
        self.last_shot = Some(now);
        true
    }
}
