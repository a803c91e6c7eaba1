//! Session tuning knobs.
//!
//! All durations are seconds of unscaled simulation time.

use crate::assignment::PickMode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Invalid configuration value.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// A duration or distance that must be strictly positive was not.
    #[error("{field} must be positive (got {value})")]
    NotPositive {
        /// Offending key.
        field: &'static str,
        /// Value found.
        value: f64,
    },
    /// Swap point must split the transition into two non-empty phases.
    #[error("transition.swap_point must be inside (0, 1) (got {0})")]
    SwapPointOutOfRange(f32),
    /// A counter that must be at least one was zero.
    #[error("{0} must be at least 1")]
    Zero(&'static str),
    /// Link loss probability must be a probability.
    #[error("drop rate must be inside [0, 1) (got {0})")]
    DropRateOutOfRange(f32),
}

/// Timing of one full swap cycle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransitionTiming {
    /// Seconds from entering SwapOut to returning to Normal.
    pub total_duration: f32,
    /// Fraction of `total_duration` at which SwapOut ends.
    pub swap_point: f32,
}

impl Default for TransitionTiming {
    fn default() -> Self {
        Self {
            total_duration: 1.0,
            swap_point: 0.85,
        }
    }
}

impl TransitionTiming {
    /// Seconds spent in SwapOut.
    pub fn swap_out_duration(&self) -> f64 {
        f64::from(self.total_duration) * f64::from(self.swap_point)
    }

    /// Seconds spent in SwapIn.
    pub fn swap_in_duration(&self) -> f64 {
        f64::from(self.total_duration) - self.swap_out_duration()
    }

    /// Check invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("transition.total_duration", f64::from(self.total_duration))?;
        if !(self.swap_point > 0.0 && self.swap_point < 1.0) {
            return Err(ConfigError::SwapPointOutOfRange(self.swap_point));
        }
        Ok(())
    }
}

/// Hit-scan weapon settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShootingConfig {
    /// Minimum seconds between accepted shots.
    pub cooldown: f32,
    /// Ray length.
    pub max_range: f32,
}

impl Default for ShootingConfig {
    fn default() -> Self {
        Self {
            cooldown: 0.3,
            max_range: 50.0,
        }
    }
}

/// Server-controlled player behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    /// Seconds between shots.
    pub fire_interval: f32,
    /// Seconds between swap requests; zero disables swapping.
    pub swap_interval: f32,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            fire_interval: 1.0,
            swap_interval: 0.0,
        }
    }
}

/// Everything a session needs to run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Simulation ticks per second.
    pub tick_rate: u32,
    /// Spawn universe distribution.
    pub pick_mode: PickMode,
    /// Seed for every session RNG.
    pub seed: u64,
    /// Swap cycle timing.
    pub transition: TransitionTiming,
    /// Weapon settings.
    pub shooting: ShootingConfig,
    /// Health on (re)spawn.
    pub max_health: u32,
    /// Kills that end the match.
    pub kill_target: u32,
    /// Seconds a dead player waits before respawning.
    pub respawn_delay: f32,
    /// Ticks between full re-sends of every replicated state.
    pub resync_interval_ticks: u64,
    /// Bot behaviour.
    pub bot: BotConfig,
    /// Positions players spawn at, used in rotation.
    pub spawn_points: Vec<[f32; 3]>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            tick_rate: 60,
            pick_mode: PickMode::RoundRobin,
            seed: 0,
            transition: TransitionTiming::default(),
            shooting: ShootingConfig::default(),
            max_health: 3,
            kill_target: 5,
            respawn_delay: 5.0,
            resync_interval_ticks: 30,
            bot: BotConfig::default(),
            spawn_points: vec![
                [0.0, 0.0, 0.0],
                [10.0, 0.0, 0.0],
                [0.0, 0.0, 10.0],
                [10.0, 0.0, 10.0],
            ],
        }
    }
}

impl SessionConfig {
    /// Seconds per tick.
    pub fn tick_seconds(&self) -> f64 {
        1.0 / f64::from(self.tick_rate.max(1))
    }

    /// Check every field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_rate == 0 {
            return Err(ConfigError::Zero("tick_rate"));
        }
        if self.max_health == 0 {
            return Err(ConfigError::Zero("max_health"));
        }
        if self.kill_target == 0 {
            return Err(ConfigError::Zero("kill_target"));
        }
        if self.resync_interval_ticks == 0 {
            return Err(ConfigError::Zero("resync_interval_ticks"));
        }
        if self.spawn_points.is_empty() {
            return Err(ConfigError::Zero("spawn_points"));
        }
        self.transition.validate()?;
        positive("shooting.cooldown", f64::from(self.shooting.cooldown))?;
        positive("shooting.max_range", f64::from(self.shooting.max_range))?;
        positive("respawn_delay", f64::from(self.respawn_delay))?;
        positive("bot.fire_interval", f64::from(self.bot.fire_interval))?;
        if self.bot.swap_interval < 0.0 {
            return Err(ConfigError::NotPositive {
                field: "bot.swap_interval",
                value: f64::from(self.bot.swap_interval),
            });
        }
        Ok(())
    }
}

/// Validate a link loss probability.
pub fn validate_drop_rate(rate: f32) -> Result<(), ConfigError> {
    if (0.0..1.0).contains(&rate) {
        Ok(())
    } else {
        Err(ConfigError::DropRateOutOfRange(rate))
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::NotPositive { field, value })
    }
}
