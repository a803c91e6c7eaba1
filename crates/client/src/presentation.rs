//! Collaborators a client view pushes derived state to.
//!
//! Rendering, audio and UI live outside this crate; they implement
//! [`Presentation`] and receive only what they need to draw.

use parallel_worlds_core::{EntityId, Layer, TransitionState, UniverseLayerSettings};

/// Sink for everything a client view derives. Every method defaults to a
/// no-op so implementors pick what they care about.
pub trait Presentation {
    /// A player's layer settings for this observer changed: set the camera
    /// culling mask, the shoot mask, and the render layer of the player's
    /// visual hierarchy.
    fn universe_settings_changed(&mut self, _entity: EntityId, _settings: UniverseLayerSettings) {}

    /// Swap effect progress for a player, `fraction` over the whole cycle.
    fn swap_effect_progress(&mut self, _entity: EntityId, _phase: TransitionState, _fraction: f32) {
    }

    /// A player's swap effect reached the end of its phase or was cleared.
    fn swap_effect_finished(&mut self, _entity: EntityId) {}

    /// A shot was fired. `layer` is the shooter's render layer for this
    /// observer, used for the impact effect.
    fn shot_effect(
        &mut self,
        _shooter: EntityId,
        _hit: bool,
        _point: [f32; 3],
        _layer: Option<Layer>,
    ) {
    }

    /// A player lost health.
    fn damaged(&mut self, _entity: EntityId, _health: u32, _died: bool) {}

    /// A player respawned.
    fn respawned(&mut self, _entity: EntityId, _health: u32) {}

    /// A player's kill count changed.
    fn score_changed(&mut self, _entity: EntityId, _kills: u32) {}

    /// The match ended.
    fn game_over(&mut self, _winner: EntityId) {}
}

/// Presentation that ignores everything (headless clients).
#[derive(Debug, Default, Clone, Copy)]
pub struct NullPresentation;

impl Presentation for NullPresentation {}

/// One recorded presentation call.
#[derive(Debug, Clone, PartialEq)]
pub enum PresentationCall {
    /// [`Presentation::universe_settings_changed`].
    Settings(EntityId, UniverseLayerSettings),
    /// [`Presentation::swap_effect_progress`].
    SwapProgress(EntityId, TransitionState, f32),
    /// [`Presentation::swap_effect_finished`].
    SwapFinished(EntityId),
    /// [`Presentation::shot_effect`].
    Shot {
        /// Player that fired.
        shooter: EntityId,
        /// Whether the ray struck anything.
        hit: bool,
        /// Shooter's render layer for this observer.
        layer: Option<Layer>,
    },
    /// [`Presentation::damaged`].
    Damaged(EntityId, u32, bool),
    /// [`Presentation::respawned`].
    Respawned(EntityId, u32),
    /// [`Presentation::score_changed`].
    Score(EntityId, u32),
    /// [`Presentation::game_over`].
    GameOver(EntityId),
}

/// Presentation that records every call, for tests and debugging.
#[derive(Debug, Default, Clone)]
pub struct RecordingPresentation {
    /// Calls in arrival order.
    pub calls: Vec<PresentationCall>,
}

impl RecordingPresentation {
    /// Settings pushed for `entity`, oldest first.
    pub fn settings_for(&self, entity: EntityId) -> Vec<UniverseLayerSettings> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                PresentationCall::Settings(e, settings) if *e == entity => Some(*settings),
                _ => None,
            })
            .collect()
    }
}

impl Presentation for RecordingPresentation {
    fn universe_settings_changed(&mut self, entity: EntityId, settings: UniverseLayerSettings) {
        self.calls.push(PresentationCall::Settings(entity, settings));
    }

    fn swap_effect_progress(&mut self, entity: EntityId, phase: TransitionState, fraction: f32) {
        self.calls
            .push(PresentationCall::SwapProgress(entity, phase, fraction));
    }

    fn swap_effect_finished(&mut self, entity: EntityId) {
        self.calls.push(PresentationCall::SwapFinished(entity));
    }

    fn shot_effect(
        &mut self,
        shooter: EntityId,
        hit: bool,
        _point: [f32; 3],
        layer: Option<Layer>,
    ) {
        self.calls.push(PresentationCall::Shot {
            shooter,
            hit,
            layer,
        });
    }

    fn damaged(&mut self, entity: EntityId, health: u32, died: bool) {
        self.calls.push(PresentationCall::Damaged(entity, health, died));
    }

    fn respawned(&mut self, entity: EntityId, health: u32) {
        self.calls.push(PresentationCall::Respawned(entity, health));
    }

    fn score_changed(&mut self, entity: EntityId, kills: u32) {
        self.calls.push(PresentationCall::Score(entity, kills));
    }

    fn game_over(&mut self, winner: EntityId) {
        self.calls.push(PresentationCall::GameOver(winner));
    }
}
