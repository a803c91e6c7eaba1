//! ECS components and resources of an authoritative session.

use crate::transition::UniverseTransition;
use bevy_ecs::prelude::{Component, Resource};
use glam::Vec3;
use parallel_worlds_core::{
    EntityId, Health, Score, SessionConfig, ShotCooldown, SimTick, UniverseAssigner,
    UniverseState,
};
use parallel_worlds_net::{ReplicatedValue, ServerMessage, SessionEvent};

/// Network identity of a player.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerId(pub EntityId);

/// Universe membership: the authoritative machine and the replicated value
/// observers read.
#[derive(Component, Debug, Clone)]
pub struct PlayerUniverse {
    /// Authoritative state machine.
    pub machine: UniverseTransition,
    /// Value fanned out to observers.
    pub replicated: ReplicatedValue<UniverseState>,
}

impl PlayerUniverse {
    /// Membership for a freshly spawned player.
    pub fn new(machine: UniverseTransition) -> Self {
        let replicated = ReplicatedValue::new(machine.state());
        Self {
            machine,
            replicated,
        }
    }

    /// Current authoritative state.
    pub fn state(&self) -> UniverseState {
        self.machine.state()
    }

    /// Copy the machine's state into the replicated value. Returns whether
    /// it was an effective write.
    pub fn publish(&mut self) -> bool {
        self.replicated.set(self.machine.state())
    }
}

/// Health and kill count.
#[derive(Component, Debug, Clone, Copy)]
pub struct Vitals {
    /// Remaining health.
    pub health: Health,
    /// Kills credited; survives respawns.
    pub score: Score,
}

/// Fire-rate limiter.
#[derive(Component, Debug, Clone, Copy)]
pub struct Weapon(pub ShotCooldown);

/// Position and aim.
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    /// Body center.
    pub position: Vec3,
    /// Unit aim direction.
    pub facing: Vec3,
}

/// Present while a player is dead.
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct Dead {
    /// Session time at which the player comes back.
    pub respawn_at: f64,
}

/// Server-controlled player.
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct Bot {
    /// Session time of the next shot attempt.
    pub next_fire: f64,
    /// Session time of the next swap request, when swapping is enabled.
    pub next_swap: Option<f64>,
}

/// Session clock, advanced once per tick.
#[derive(Resource, Debug, Clone, Copy, PartialEq)]
pub struct SessionClock {
    /// Current tick.
    pub tick: SimTick,
    /// Seconds per tick.
    pub tick_seconds: f64,
}

impl SessionClock {
    /// Session time at the current tick.
    pub fn now(&self) -> f64 {
        self.tick.0 as f64 * self.tick_seconds
    }
}

/// Session settings visible to systems.
#[derive(Resource, Debug, Clone)]
pub struct Rules(pub SessionConfig);

/// The session's universe assignment service.
#[derive(Resource, Debug, Clone)]
pub struct Assigner(pub UniverseAssigner);

/// Rotating spawn positions.
#[derive(Resource, Debug, Clone)]
pub struct SpawnPoints {
    points: Vec<Vec3>,
    next: usize,
}

impl SpawnPoints {
    /// Rotation over `points`; an empty list spawns at the origin.
    pub fn new(points: &[[f32; 3]]) -> Self {
        Self {
            points: points.iter().copied().map(Vec3::from_array).collect(),
            next: 0,
        }
    }

    /// Next position in the rotation.
    pub fn next_point(&mut self) -> Vec3 {
        if self.points.is_empty() {
            return Vec3::ZERO;
        }
        let point = self.points[self.next % self.points.len()];
        self.next = (self.next + 1) % self.points.len();
        point
    }
}

/// What an input source asked a player to do.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IntentKind {
    /// Start a swap cycle.
    Swap,
    /// Fire along a ray.
    Fire {
        /// Muzzle position.
        origin: Vec3,
        /// Aim direction.
        direction: Vec3,
    },
}

/// One queued request against a player.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Intent {
    /// Player the request acts on.
    pub entity: EntityId,
    /// Requested action.
    pub kind: IntentKind,
}

/// Requests gathered this tick from clients and bots, resolved in order.
#[derive(Resource, Debug, Default, Clone)]
pub struct Intents(pub Vec<Intent>);

/// Broadcasts and log entries produced by systems this tick.
#[derive(Resource, Debug, Default, Clone)]
pub struct Outbox {
    /// Messages for every connected client.
    pub messages: Vec<ServerMessage>,
    /// Session log entries.
    pub events: Vec<SessionEvent>,
}
