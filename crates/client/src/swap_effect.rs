//! Cosmetic swap-effect timers.
//!
//! A driver is started (or restarted) whenever a replica lands on SwapOut or
//! SwapIn and is stepped once per client frame. It never feeds back into the
//! authoritative state. SwapOut runs the effect from 0 to the swap point,
//! SwapIn from the swap point to 1.

use parallel_worlds_core::{TransitionState, TransitionTiming};

/// Resumable per-entity effect timer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwapEffectDriver {
    phase: TransitionState,
    fraction: f32,
    end: f32,
    total_duration: f32,
}

impl SwapEffectDriver {
    /// Driver for `phase` seeded at `progress` through the cycle, or `None`
    /// for `Normal`. Progress is clamped into the phase's share of the cycle,
    /// so a late start still ends where the authority's phase ends.
    pub fn start(phase: TransitionState, timing: TransitionTiming, progress: f32) -> Option<Self> {
        let (begin, end) = match phase {
            TransitionState::Normal => return None,
            TransitionState::SwapOut => (0.0, timing.swap_point),
            TransitionState::SwapIn => (timing.swap_point, 1.0),
        };
        let fraction = if progress.is_finite() {
            progress.clamp(begin, end)
        } else {
            begin
        };
        Some(Self {
            phase,
            fraction,
            end,
            total_duration: timing.total_duration,
        })
    }

    /// Advance by `dt` seconds and return the new cycle fraction.
    pub fn step(&mut self, dt: f32) -> f32 {
        if self.total_duration > 0.0 {
            self.fraction = (self.fraction + dt / self.total_duration).min(self.end);
        } else {
            self.fraction = self.end;
        }
        self.fraction
    }

    /// Phase being animated.
    pub fn phase(&self) -> TransitionState {
        self.phase
    }

    /// Progress over the whole cycle.
    pub fn fraction(&self) -> f32 {
        self.fraction
    }

    /// Whether the phase's share of the cycle has been played.
    pub fn is_finished(&self) -> bool {
        self.fraction >= self.end
    }
}
