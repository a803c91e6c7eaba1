//! Observer-side view of a session.
//!
//! Holds a read-only replica of every player's universe state, resolves each
//! player's layer settings against the locally controlled player, and drives
//! the cosmetic swap effects. Nothing here writes authoritative state; the
//! view only sends swap and fire requests for its own player.

use crate::presentation::Presentation;
use crate::swap_effect::SwapEffectDriver;
use crate::viewer_bus::{ViewerBus, ViewerChanged, ViewerSubscription};
use anyhow::Result;
use glam::Vec3;
use parallel_worlds_core::{
    resolve, EntityId, SessionConfig, ShotCooldown, TransitionTiming, UniverseLayerSettings,
    UniverseState,
};
use parallel_worlds_net::{
    ClientConnection, ClientMessage, FireRequest, Replica, ServerMessage, StateUpdate,
};
use std::collections::BTreeMap;
use tracing::{debug, info, trace, warn};

/// What this client knows about one player.
#[derive(Debug)]
pub struct PlayerReplica {
    universe: Replica<UniverseState>,
    settings: Option<UniverseLayerSettings>,
    effect: Option<SwapEffectDriver>,
    viewer: ViewerSubscription,
    health: u32,
    kills: u32,
    alive: bool,
}

impl PlayerReplica {
    /// Replicated universe state, once received.
    pub fn state(&self) -> Option<UniverseState> {
        self.universe.get().copied()
    }

    /// Layer settings as this observer resolves them.
    pub fn settings(&self) -> Option<UniverseLayerSettings> {
        self.settings
    }

    /// Running swap effect.
    pub fn effect(&self) -> Option<&SwapEffectDriver> {
        self.effect.as_ref()
    }

    /// Last known health.
    pub fn health(&self) -> u32 {
        self.health
    }

    /// Last known kill count.
    pub fn kills(&self) -> u32 {
        self.kills
    }

    /// Whether the player is alive as far as this client knows.
    pub fn is_alive(&self) -> bool {
        self.alive
    }
}

/// Client-side session view.
pub struct ClientView<P: Presentation> {
    connection: ClientConnection,
    presentation: P,
    timing: TransitionTiming,
    cooldown: ShotCooldown,
    bus: ViewerBus,
    local: Option<EntityId>,
    players: BTreeMap<EntityId, PlayerReplica>,
    winner: Option<EntityId>,
    rejected: Option<String>,
    clock: f64,
}

impl<P: Presentation> ClientView<P> {
    /// View over an already-connected client link.
    pub fn new(connection: ClientConnection, config: &SessionConfig, presentation: P) -> Self {
        Self {
            connection,
            presentation,
            timing: config.transition,
            cooldown: ShotCooldown::new(config.shooting.cooldown),
            bus: ViewerBus::new(),
            local: None,
            players: BTreeMap::new(),
            winner: None,
            rejected: None,
            clock: 0.0,
        }
    }

    /// Process every queued server message. Returns how many were handled.
    pub fn poll(&mut self) -> usize {
        let mut handled = 0;
        while let Some(msg) = self.connection.try_recv() {
            self.handle(msg);
            handled += 1;
        }
        handled
    }

    /// Advance local time by `dt` seconds and step swap effects.
    pub fn update(&mut self, dt: f32) {
        self.clock += f64::from(dt);
        for (entity, player) in self.players.iter_mut() {
            let Some(effect) = player.effect.as_mut() else {
                continue;
            };
            let fraction = effect.step(dt);
            self.presentation
                .swap_effect_progress(*entity, effect.phase(), fraction);
            if effect.is_finished() {
                player.effect = None;
                self.presentation.swap_effect_finished(*entity);
            }
        }
    }

    /// Ask the server to swap the local player. Refused locally (returns
    /// `false`) unless the local replica is alive, `Normal` and the match is
    /// still on.
    pub fn request_swap(&mut self) -> Result<bool> {
        let Some(player) = self.local.and_then(|id| self.players.get(&id)) else {
            return Ok(false);
        };
        let normal = player.state().map(|s| s.is_normal()).unwrap_or(false);
        if !normal || !player.alive || self.winner.is_some() {
            trace!("swap request refused locally");
            return Ok(false);
        }
        self.connection.send(&ClientMessage::RequestSwap)?;
        Ok(true)
    }

    /// Ask the server to fire. Refused locally (returns `false`) during the
    /// local cooldown, while dead, or after the match ended.
    pub fn fire(&mut self, origin: Vec3, direction: Vec3) -> Result<bool> {
        let alive = self
            .local
            .and_then(|id| self.players.get(&id))
            .map(|p| p.alive)
            .unwrap_or(false);
        if !alive || self.winner.is_some() || !self.cooldown.try_fire(self.clock) {
            trace!("fire request refused locally");
            return Ok(false);
        }
        self.connection.send(&ClientMessage::Fire(FireRequest {
            origin: origin.to_array(),
            direction: direction.to_array(),
        }))?;
        Ok(true)
    }

    /// Tell the server this client is leaving.
    pub fn disconnect(&mut self, reason: &str) -> Result<()> {
        self.connection.send(&ClientMessage::Disconnect {
            reason: reason.to_string(),
        })
    }

    /// Player this client controls, once the handshake completed.
    pub fn local_player(&self) -> Option<EntityId> {
        self.local
    }

    /// Local player's replicated state.
    pub fn local_state(&self) -> Option<UniverseState> {
        self.local.and_then(|id| self.state_of(id))
    }

    /// Replica of a player.
    pub fn player(&self, entity: EntityId) -> Option<&PlayerReplica> {
        self.players.get(&entity)
    }

    /// Replicated universe state of a player.
    pub fn state_of(&self, entity: EntityId) -> Option<UniverseState> {
        self.players.get(&entity).and_then(PlayerReplica::state)
    }

    /// Resolved layer settings of a player for this observer.
    pub fn settings_of(&self, entity: EntityId) -> Option<UniverseLayerSettings> {
        self.players.get(&entity).and_then(|p| p.settings)
    }

    /// Known players in ascending order.
    pub fn player_ids(&self) -> Vec<EntityId> {
        self.players.keys().copied().collect()
    }

    /// Winner, once the server announced game over.
    pub fn winner(&self) -> Option<EntityId> {
        self.winner
    }

    /// Reason the server refused the handshake.
    pub fn rejection(&self) -> Option<&str> {
        self.rejected.as_deref()
    }

    /// Presentation collaborator.
    pub fn presentation(&self) -> &P {
        &self.presentation
    }

    /// Mutable presentation collaborator.
    pub fn presentation_mut(&mut self) -> &mut P {
        &mut self.presentation
    }

    /// Live local-viewer subscriptions (one per known player).
    pub fn viewer_subscriptions(&self) -> usize {
        self.bus.subscriber_count()
    }

    fn handle(&mut self, msg: ServerMessage) {
        match msg {
            ServerMessage::HandshakeResponse {
                accepted: true,
                player_entity_id,
                ..
            } => {
                info!(entity = ?player_entity_id, "joined session");
                self.local = player_entity_id;
            }
            ServerMessage::HandshakeResponse { reason, .. } => {
                warn!("Handshake rejected: {}", reason.as_deref().unwrap_or("no reason"));
                self.rejected = Some(reason.unwrap_or_default());
            }
            ServerMessage::PlayerSpawned { update, health } => {
                self.players
                    .entry(update.entity)
                    .or_insert_with(|| PlayerReplica {
                        universe: Replica::new(),
                        settings: None,
                        effect: None,
                        viewer: self.bus.subscribe(update.entity),
                        health,
                        kills: 0,
                        alive: health > 0,
                    });
                self.apply_state(update);
            }
            ServerMessage::PlayerDespawned { entity } => {
                if self.players.remove(&entity).is_some() {
                    debug!(%entity, "replica dropped");
                }
                if self.local == Some(entity) {
                    self.local = None;
                }
            }
            ServerMessage::UniverseState(update) => self.apply_state(update),
            ServerMessage::ShotEffect {
                shooter,
                hit,
                point,
            } => {
                let layer = self.settings_of(shooter).map(|s| s.render_layer);
                self.presentation.shot_effect(shooter, hit, point, layer);
            }
            ServerMessage::Damaged {
                entity,
                health,
                died,
            } => {
                if let Some(player) = self.players.get_mut(&entity) {
                    player.health = health;
                    if died {
                        player.alive = false;
                    }
                }
                self.presentation.damaged(entity, health, died);
            }
            ServerMessage::Respawned { entity, health } => {
                if let Some(player) = self.players.get_mut(&entity) {
                    player.health = health;
                    player.alive = true;
                }
                self.presentation.respawned(entity, health);
            }
            ServerMessage::ScoreChanged { entity, kills } => {
                if let Some(player) = self.players.get_mut(&entity) {
                    player.kills = kills;
                }
                self.presentation.score_changed(entity, kills);
            }
            ServerMessage::GameOver { winner } => {
                info!(%winner, "game over");
                self.winner = Some(winner);
                self.presentation.game_over(winner);
            }
            ServerMessage::Disconnect { reason } => {
                info!("Server disconnected: {}", reason);
            }
        }
    }

    /// Apply one replicated write and run the change reaction: restart the
    /// swap effect, re-resolve this player's settings, and when the player is
    /// the local viewer, notify every other replica.
    fn apply_state(&mut self, update: StateUpdate) {
        let Some(player) = self.players.get_mut(&update.entity) else {
            trace!(entity = %update.entity, "state for unknown player ignored");
            return;
        };
        let Some(change) = player.universe.apply(update.seq, update.state) else {
            return;
        };
        trace!(
            entity = %update.entity,
            state = %change.current,
            seq = change.seq,
            "replica changed"
        );

        let had_effect = player.effect.is_some();
        player.effect =
            SwapEffectDriver::start(change.current.transition, self.timing, update.progress);
        if had_effect && player.effect.is_none() {
            self.presentation.swap_effect_finished(update.entity);
        }

        self.refresh(update.entity);

        if Some(update.entity) == self.local {
            self.bus.publish(ViewerChanged {
                viewer: update.entity,
                state: change.current,
            });
            self.refresh_for_viewer();
        }
    }

    /// Re-resolve every replica whose viewer subscription has news.
    fn refresh_for_viewer(&mut self) {
        let pending: Vec<EntityId> = self
            .players
            .iter_mut()
            .filter_map(|(entity, player)| player.viewer.drain().map(|_| *entity))
            .collect();
        for entity in pending {
            self.refresh(entity);
        }
    }

    /// Resolve `entity` against the local viewer and push the result if it
    /// changed.
    fn refresh(&mut self, entity: EntityId) {
        let viewer = self.local_state();
        let Some(player) = self.players.get_mut(&entity) else {
            return;
        };
        let Some(subject) = player.state() else {
            return;
        };
        let Some(settings) = resolve(subject, viewer) else {
            return;
        };
        if player.settings == Some(settings) {
            return;
        }
        player.settings = Some(settings);
        self.presentation.universe_settings_changed(entity, settings);
    }
}
