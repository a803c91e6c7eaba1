//! Per-player universe transition state machine.
//!
//! Normal -> SwapOut on request, SwapOut -> SwapIn after the swap-out
//! duration (flipping the universe), SwapIn -> Normal after the remainder of
//! the cycle. Timed edges are polled against the session clock.

use parallel_worlds_core::{
    TransitionState, TransitionTiming, Universe, UniverseAssigner, UniverseState, TIME_EPSILON,
};

/// Authoritative transition controller for one player.
#[derive(Debug, Clone, PartialEq)]
pub struct UniverseTransition {
    state: UniverseState,
    phase_started: f64,
    timing: TransitionTiming,
}

impl UniverseTransition {
    /// Controller at `Normal` in `universe`.
    pub fn new(universe: Universe, timing: TransitionTiming) -> Self {
        Self {
            state: UniverseState::spawned(universe),
            phase_started: 0.0,
            timing,
        }
    }

    /// Current state.
    pub fn state(&self) -> UniverseState {
        self.state
    }

    /// Session time at which the current phase began.
    pub fn phase_started(&self) -> f64 {
        self.phase_started
    }

    /// Start a swap cycle. Accepted only from `Normal` with a real universe;
    /// otherwise nothing changes.
    pub fn request_swap(&mut self, now: f64) -> bool {
        if !self.state.is_normal() || !self.state.is_assigned() {
            return false;
        }
        self.state.transition = TransitionState::SwapOut;
        self.phase_started = now;
        true
    }

    /// Take the next timed edge if it is due. At most one edge per call; the
    /// new phase is anchored to the moment the old one was due to end.
    pub fn advance(&mut self, now: f64) -> Option<UniverseState> {
        let elapsed = now - self.phase_started;
        match self.state.transition {
            TransitionState::Normal => None,
            TransitionState::SwapOut => {
                let duration = self.timing.swap_out_duration();
                if elapsed + TIME_EPSILON < duration {
                    return None;
                }
                self.phase_started += duration;
                self.state = UniverseState::new(
                    UniverseAssigner::opposite(self.state.universe),
                    TransitionState::SwapIn,
                );
                Some(self.state)
            }
            TransitionState::SwapIn => {
                let duration = self.timing.swap_in_duration();
                if elapsed + TIME_EPSILON < duration {
                    return None;
                }
                self.phase_started += duration;
                self.state.transition = TransitionState::Normal;
                Some(self.state)
            }
        }
    }

    /// Drop any in-flight cycle and restart at `Normal` in `universe`.
    pub fn reset(&mut self, universe: Universe, now: f64) {
        self.state = UniverseState::spawned(universe);
        self.phase_started = now;
    }

    /// Progress through the whole cycle in `[0, 1]`; 0 when `Normal`.
    pub fn elapsed_fraction(&self, now: f64) -> f32 {
        let total = f64::from(self.timing.total_duration);
        let into_phase = (now - self.phase_started).max(0.0);
        let fraction = match self.state.transition {
            TransitionState::Normal => 0.0,
            TransitionState::SwapOut => into_phase / total,
            TransitionState::SwapIn => f64::from(self.timing.swap_point) + into_phase / total,
        };
        fraction.clamp(0.0, 1.0) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn machine() -> UniverseTransition {
        UniverseTransition::new(Universe::A, TransitionTiming::default())
    }

    #[test]
    fn second_request_while_swapping_is_ignored() {
        let mut m = machine();
        assert!(m.request_swap(0.0));
        assert_eq!(
            m.state(),
            UniverseState::new(Universe::A, TransitionState::SwapOut)
        );
        assert!(!m.request_swap(0.1));
        assert_eq!(
            m.state(),
            UniverseState::new(Universe::A, TransitionState::SwapOut)
        );
    }

    #[test]
    fn full_cycle_lands_in_opposite_universe() {
        let mut m = machine();
        m.request_swap(0.0);
        assert_eq!(m.advance(0.5), None);
        assert_eq!(
            m.advance(0.85),
            Some(UniverseState::new(Universe::B, TransitionState::SwapIn))
        );
        assert_eq!(m.advance(0.9), None);
        assert_eq!(m.advance(1.0), Some(UniverseState::spawned(Universe::B)));
        assert_eq!(m.advance(5.0), None);
    }

    #[test]
    fn one_edge_per_poll_even_when_late() {
        let mut m = machine();
        m.request_swap(0.0);
        let first = m.advance(10.0).unwrap();
        assert_eq!(first.transition, TransitionState::SwapIn);
        assert!((m.phase_started() - 0.85).abs() < 1e-6);
        let second = m.advance(10.0).unwrap();
        assert_eq!(second, UniverseState::spawned(Universe::B));
    }

    #[test]
    fn unassigned_player_cannot_swap() {
        let mut m = UniverseTransition::new(Universe::Undefined, TransitionTiming::default());
        assert!(!m.request_swap(0.0));
    }

    #[test]
    fn elapsed_fraction_tracks_cycle() {
        let mut m = machine();
        assert_eq!(m.elapsed_fraction(3.0), 0.0);
        m.request_swap(1.0);
        assert!((m.elapsed_fraction(1.5) - 0.5).abs() < 1e-6);
        m.advance(1.85);
        assert!((m.elapsed_fraction(1.9) - 0.9).abs() < 1e-5);
    }

    #[test]
    fn reset_cancels_in_flight_cycle() {
        let mut m = machine();
        m.request_swap(0.0);
        m.reset(Universe::B, 0.2);
        assert_eq!(m.state(), UniverseState::spawned(Universe::B));
        assert!(m.request_swap(0.3));
    }

    proptest! {
        /// Stepping at any fixed tick rate returns to Normal in the other
        /// universe after about one total duration.
        #[test]
        fn fixed_tick_cycle_completes(tick_rate in 10u32..240, start in 0u64..1000) {
            let dt = 1.0 / f64::from(tick_rate);
            let mut m = machine();
            let mut tick = start;
            m.request_swap(tick as f64 * dt);
            let mut edges = Vec::new();
            for _ in 0..(tick_rate * 2) {
                tick += 1;
                if let Some(state) = m.advance(tick as f64 * dt) {
                    edges.push(state);
                }
            }
            prop_assert_eq!(
                edges,
                vec![
                    UniverseState::new(Universe::B, TransitionState::SwapIn),
                    UniverseState::spawned(Universe::B),
                ]
            );
        }
    }
}
