//! Authoritative game session.
//!
//! Owns the ECS world, the collision world and every client connection.
//! One call to [`Session::tick`] runs, in order: inbound client messages,
//! the session schedule (bots, timed transition edges, respawns), collider
//! layer sync, queued swap/fire intents, replication, event broadcast.

use crate::bot::drive_bots;
use crate::components::{
    Assigner, Bot, Dead, Intent, IntentKind, Intents, Outbox, PlayerId, PlayerUniverse, Pose,
    Rules, SessionClock, SpawnPoints, Vitals, Weapon,
};
use crate::shooting::fire_shot;
use crate::systems::{advance_transitions, respawn_dead};
use crate::transition::UniverseTransition;
use anyhow::{Context, Result};
use bevy_ecs::prelude::{Entity, World};
use bevy_ecs::schedule::{IntoSystemConfigs, Schedules};
use glam::Vec3;
use parallel_worlds_core::{
    resolve, EntityId, Health, Layer, LayerMask, Score, SessionConfig, ShotCooldown, SimTick,
    UniverseAssigner, UniverseState,
};
use parallel_worlds_ecs::{build_session_schedule, run_tick, SessionSchedule, SimSet};
use parallel_worlds_net::{
    ClientMessage, EventLogger, LinkEndpoint, ReplicatedPlayer, ReplicationTracker,
    ServerConnection, ServerMessage, SessionEvent, StateUpdate,
};
use parallel_worlds_physics::{Aabb, Collider, CollisionWorld};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info, instrument, trace, warn};

/// Half extents of a player's collision box.
pub const PLAYER_HALF_EXTENTS: Vec3 = Vec3::new(0.4, 0.9, 0.4);

/// Session-local identifier of a client connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClientId(pub u64);

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "client-{}", self.0)
    }
}

/// Client state tracked by the session.
#[derive(Debug)]
struct ConnectedClient {
    connection: ServerConnection,
    tracker: ReplicationTracker,
}

/// Authoritative session.
pub struct Session {
    world: World,
    schedules: Schedules,
    collisions: CollisionWorld,
    /// Network id to ECS entity. BTreeMap keeps iteration deterministic.
    players: BTreeMap<EntityId, Entity>,
    clients: BTreeMap<ClientId, ConnectedClient>,
    next_entity_id: u64,
    next_client_id: u64,
    winner: Option<EntityId>,
    outgoing: Vec<ServerMessage>,
    tick_events: Vec<SessionEvent>,
    last_tick_events: Vec<SessionEvent>,
    event_logger: Option<EventLogger>,
}

impl Session {
    /// Create a session after validating `config`.
    pub fn new(config: SessionConfig) -> Result<Self> {
        config.validate().context("Invalid session config")?;

        let mut world = World::default();
        world.insert_resource(SessionClock {
            tick: SimTick::ZERO,
            tick_seconds: config.tick_seconds(),
        });
        world.insert_resource(Assigner(UniverseAssigner::new(config.pick_mode, config.seed)));
        world.insert_resource(SpawnPoints::new(&config.spawn_points));
        world.insert_resource(Intents::default());
        world.insert_resource(Outbox::default());
        world.insert_resource(Rules(config));

        let mut schedules = build_session_schedule();
        if let Some(schedule) = schedules.get_mut(SessionSchedule) {
            schedule.add_systems((
                drive_bots.in_set(SimSet::Intake),
                advance_transitions.in_set(SimSet::Transitions),
                respawn_dead.in_set(SimSet::Lifecycle),
            ));
        }

        Ok(Self {
            world,
            schedules,
            collisions: CollisionWorld::new(),
            players: BTreeMap::new(),
            clients: BTreeMap::new(),
            next_entity_id: 1,
            next_client_id: 1,
            winner: None,
            outgoing: Vec::new(),
            tick_events: Vec::new(),
            last_tick_events: Vec::new(),
            event_logger: None,
        })
    }

    /// Write every session event to a JSONL file at `path`.
    pub fn enable_event_log(&mut self, path: impl AsRef<Path>) -> Result<()> {
        self.event_logger = Some(EventLogger::create(path.as_ref())?);
        info!("Session event log enabled at {:?}", path.as_ref());
        Ok(())
    }

    /// Add static level geometry.
    pub fn add_geometry(&mut self, collider: Collider) {
        self.collisions.add_geometry(collider);
    }

    /// Register a new client link. The client gets a player once its
    /// handshake arrives.
    pub fn connect(&mut self, link: LinkEndpoint) -> ClientId {
        let id = ClientId(self.next_client_id);
        self.next_client_id += 1;
        debug!(client = %id, "client link registered");
        self.clients.insert(
            id,
            ConnectedClient {
                connection: ServerConnection::new(link),
                tracker: ReplicationTracker::new(),
            },
        );
        id
    }

    /// Spawn a server-controlled player.
    pub fn spawn_bot(&mut self) -> EntityId {
        self.spawn_player(true)
    }

    /// Spawn a player driven only through [`queue_swap`](Self::queue_swap)
    /// and [`queue_fire`](Self::queue_fire).
    pub fn spawn_local_player(&mut self) -> EntityId {
        self.spawn_player(false)
    }

    /// Remove a player from the session.
    pub fn despawn_player(&mut self, id: EntityId) -> bool {
        let Some(entity) = self.players.remove(&id) else {
            return false;
        };
        self.world.despawn(entity);
        self.collisions.remove_body(id);
        info!(entity = %id, "player despawned");
        self.tick_events.push(SessionEvent::Despawned {
            tick: self.current_tick().0,
            entity: id,
        });
        true
    }

    /// Queue a swap request for `id`, resolved during the next tick.
    pub fn queue_swap(&mut self, id: EntityId) {
        self.world.resource_mut::<Intents>().0.push(Intent {
            entity: id,
            kind: IntentKind::Swap,
        });
    }

    /// Queue a shot for `id`, resolved during the next tick.
    pub fn queue_fire(&mut self, id: EntityId, origin: Vec3, direction: Vec3) {
        self.world.resource_mut::<Intents>().0.push(Intent {
            entity: id,
            kind: IntentKind::Fire { origin, direction },
        });
    }

    /// Place a player and set its aim.
    pub fn set_pose(&mut self, id: EntityId, position: Vec3, facing: Vec3) -> bool {
        let Some(mut pose) = self.component_mut::<Pose>(id) else {
            return false;
        };
        pose.position = position;
        pose.facing = facing.try_normalize().unwrap_or(Vec3::X);
        true
    }

    /// Run a single simulation tick.
    #[instrument(skip(self), fields(tick = self.current_tick().0, clients = self.clients.len()))]
    pub fn tick(&mut self) -> Result<()> {
        trace!("Running session tick");
        let tick = self.current_tick();

        self.drain_inbound();

        run_tick(&mut self.world, &mut self.schedules, tick);
        {
            let mut outbox = self.world.resource_mut::<Outbox>();
            let messages = std::mem::take(&mut outbox.messages);
            let events = std::mem::take(&mut outbox.events);
            self.outgoing.extend(messages);
            self.tick_events.extend(events);
        }

        self.sync_colliders();
        self.resolve_intents();
        self.replicate(tick);
        self.broadcast();
        self.flush_events()?;

        self.world.resource_mut::<SessionClock>().tick = tick.advance(1);
        Ok(())
    }

    /// Current tick (the next one to run).
    pub fn current_tick(&self) -> SimTick {
        self.world.resource::<SessionClock>().tick
    }

    /// Session time in seconds at the current tick.
    pub fn now(&self) -> f64 {
        self.world.resource::<SessionClock>().now()
    }

    /// Session settings.
    pub fn config(&self) -> &SessionConfig {
        &self.world.resource::<Rules>().0
    }

    /// Authoritative universe state of a player.
    pub fn player_state(&self, id: EntityId) -> Option<UniverseState> {
        self.component::<PlayerUniverse>(id).map(PlayerUniverse::state)
    }

    /// Current health of a player.
    pub fn health(&self, id: EntityId) -> Option<u32> {
        self.component::<Vitals>(id).map(|v| v.health.current())
    }

    /// Kills credited to a player.
    pub fn kills(&self, id: EntityId) -> Option<u32> {
        self.component::<Vitals>(id).map(|v| v.score.kills())
    }

    /// Whether a player is waiting to respawn.
    pub fn is_dead(&self, id: EntityId) -> bool {
        self.component::<Dead>(id).is_some()
    }

    /// Position of a player.
    pub fn position(&self, id: EntityId) -> Option<Vec3> {
        self.component::<Pose>(id).map(|p| p.position)
    }

    /// Layer of a player's collider, if it has one.
    pub fn body_layer(&self, id: EntityId) -> Option<Layer> {
        self.collisions.body(id).map(|c| c.layer)
    }

    /// Winner, once the match is over.
    pub fn winner(&self) -> Option<EntityId> {
        self.winner
    }

    /// All live player ids in ascending order.
    pub fn player_ids(&self) -> Vec<EntityId> {
        self.players.keys().copied().collect()
    }

    /// Number of players.
    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    /// Number of connected clients (including ones still handshaking).
    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    /// Player controlled by a client, once its handshake was accepted.
    pub fn client_player(&self, client: ClientId) -> Option<EntityId> {
        self.clients
            .get(&client)
            .and_then(|c| c.connection.player())
    }

    /// Total unreliable frames dropped on the way to clients.
    pub fn frames_dropped(&self) -> u64 {
        self.clients
            .values()
            .map(|c| c.connection.stats().frames_dropped)
            .sum()
    }

    /// Events produced by the last completed tick.
    pub fn last_tick_events(&self) -> &[SessionEvent] {
        &self.last_tick_events
    }

    fn spawn_player(&mut self, bot: bool) -> EntityId {
        let id = EntityId(self.next_entity_id);
        self.next_entity_id += 1;

        let now = self.now();
        let tick = self.current_tick();
        let config = self.config().clone();
        let universe = self.world.resource_mut::<Assigner>().0.spawn_universe();
        let position = self.world.resource_mut::<SpawnPoints>().next_point();
        let facing = (arena_center(&config) - position)
            .try_normalize()
            .unwrap_or(Vec3::X);

        let mut entity = self.world.spawn((
            PlayerId(id),
            PlayerUniverse::new(UniverseTransition::new(universe, config.transition)),
            Vitals {
                health: Health::new(config.max_health),
                score: Score::new(config.kill_target),
            },
            Weapon(ShotCooldown::new(config.shooting.cooldown)),
            Pose { position, facing },
        ));
        if bot {
            entity.insert(Bot::new(
                now,
                config.bot.fire_interval,
                config.bot.swap_interval,
            ));
        }
        self.players.insert(id, entity.id());

        info!(entity = %id, universe = universe.as_str(), bot, "player spawned");
        self.tick_events.push(SessionEvent::PlayerSpawned {
            tick: tick.0,
            entity: id,
            universe,
            bot,
        });
        id
    }

    fn drain_inbound(&mut self) {
        let mut intents = Vec::new();
        let mut joined = Vec::new();
        let mut gone = Vec::new();

        for (client_id, client) in self.clients.iter_mut() {
            while let Some(msg) = client.connection.try_recv() {
                match (client.connection.player(), msg) {
                    (
                        None,
                        ClientMessage::Handshake {
                            version,
                            schema_hash,
                        },
                    ) => match client.connection.check_handshake(version, schema_hash) {
                        Ok(()) => joined.push(*client_id),
                        Err(reason) => {
                            if let Err(e) = client.connection.reject(&reason) {
                                warn!("Failed to send handshake rejection: {:#}", e);
                            }
                            gone.push(*client_id);
                        }
                    },
                    (None, msg) => {
                        debug!(client = %client_id, ?msg, "message before handshake ignored");
                    }
                    (Some(_), ClientMessage::Handshake { .. }) => {
                        trace!(client = %client_id, "repeated handshake ignored");
                    }
                    (Some(entity), ClientMessage::RequestSwap) => intents.push(Intent {
                        entity,
                        kind: IntentKind::Swap,
                    }),
                    (Some(entity), ClientMessage::Fire(request)) => intents.push(Intent {
                        entity,
                        kind: IntentKind::Fire {
                            origin: Vec3::from_array(request.origin),
                            direction: Vec3::from_array(request.direction),
                        },
                    }),
                    (Some(_), ClientMessage::Disconnect { reason }) => {
                        info!(client = %client_id, %reason, "client disconnected");
                        gone.push(*client_id);
                    }
                }
            }
            if client.connection.is_closed() && !gone.contains(client_id) {
                info!(client = %client_id, "client link closed");
                gone.push(*client_id);
            }
        }

        self.world.resource_mut::<Intents>().0.extend(intents);

        for client_id in joined {
            let entity = self.spawn_player(false);
            if let Some(client) = self.clients.get_mut(&client_id) {
                if let Err(e) = client.connection.accept(entity) {
                    warn!("Failed to send handshake response: {:#}", e);
                }
            }
        }

        for client_id in gone {
            if let Some(client) = self.clients.remove(&client_id) {
                if let Some(entity) = client.connection.player() {
                    self.despawn_player(entity);
                }
            }
        }
    }

    /// Place every live player's collider on its home layer. The authority
    /// has no viewer, so colliders never take an echo layer.
    fn sync_colliders(&mut self) {
        let mut query = self
            .world
            .query::<(&PlayerId, &PlayerUniverse, &Pose, Option<&Dead>)>();
        for (id, membership, pose, dead) in query.iter(&self.world) {
            let settings = resolve(membership.state(), None);
            match (dead, settings) {
                (None, Some(settings)) => self.collisions.set_body(
                    id.0,
                    Collider {
                        bounds: Aabb::around(pose.position, PLAYER_HALF_EXTENTS),
                        layer: settings.render_layer,
                    },
                ),
                _ => {
                    self.collisions.remove_body(id.0);
                }
            }
        }
    }

    fn resolve_intents(&mut self) {
        let intents = std::mem::take(&mut self.world.resource_mut::<Intents>().0);
        for intent in intents {
            if let Some(winner) = self.winner {
                trace!(entity = %intent.entity, %winner, "intent after game over ignored");
                continue;
            }
            match intent.kind {
                IntentKind::Swap => {
                    self.apply_swap(intent.entity);
                }
                IntentKind::Fire { origin, direction } => {
                    self.apply_fire(intent.entity, origin, direction);
                }
            }
        }
    }

    fn apply_swap(&mut self, id: EntityId) -> bool {
        let now = self.now();
        let tick = self.current_tick().0;
        if self.is_dead(id) {
            trace!(entity = %id, "swap from dead player ignored");
            return false;
        }
        let Some(mut membership) = self.component_mut::<PlayerUniverse>(id) else {
            return false;
        };
        if !membership.machine.request_swap(now) {
            trace!(entity = %id, state = %membership.state(), "swap rejected while swapping");
            return false;
        }
        membership.publish();
        let state = membership.state();

        debug!(entity = %id, tick, "swap accepted");
        self.tick_events
            .push(SessionEvent::SwapAccepted { tick, entity: id });
        self.tick_events.push(SessionEvent::StateChanged {
            tick,
            entity: id,
            state,
        });
        true
    }

    fn apply_fire(&mut self, shooter: EntityId, origin: Vec3, direction: Vec3) {
        let now = self.now();
        let tick = self.current_tick().0;
        let max_range = self.config().shooting.max_range;
        if self.is_dead(shooter) {
            trace!(entity = %shooter, "fire from dead player ignored");
            return;
        }
        let Some(universe) = self.player_state(shooter).map(|s| s.universe) else {
            return;
        };
        let Some(mut weapon) = self.component_mut::<Weapon>(shooter) else {
            return;
        };
        if !weapon.0.try_fire(now) {
            trace!(entity = %shooter, "fire during cooldown ignored");
            return;
        }

        let mask = LayerMask::shoot(universe);
        let outcome = fire_shot(&self.collisions, shooter, origin, direction, mask, max_range);
        debug!(entity = %shooter, hit = outcome.hit, target = ?outcome.target, "shot resolved");

        self.outgoing.push(ServerMessage::ShotEffect {
            shooter,
            hit: outcome.hit,
            point: outcome.point.to_array(),
        });
        self.tick_events.push(SessionEvent::ShotFired {
            tick,
            shooter,
            target: outcome.target,
        });

        if let Some(target) = outcome.target {
            self.apply_damage(shooter, target);
        }
    }

    fn apply_damage(&mut self, shooter: EntityId, target: EntityId) {
        let now = self.now();
        let tick = self.current_tick().0;
        let respawn_delay = f64::from(self.config().respawn_delay);
        if self.is_dead(target) {
            return;
        }
        let Some(mut vitals) = self.component_mut::<Vitals>(target) else {
            return;
        };
        let died = vitals.health.take_damage();
        let health = vitals.health.current();
        self.outgoing.push(ServerMessage::Damaged {
            entity: target,
            health,
            died,
        });
        if !died {
            return;
        }

        if let Some(&entity) = self.players.get(&target) {
            self.world.entity_mut(entity).insert(Dead {
                respawn_at: now + respawn_delay,
            });
        }
        self.collisions.remove_body(target);
        info!(%shooter, victim = %target, tick, "player killed");
        self.tick_events.push(SessionEvent::Kill {
            tick,
            shooter,
            victim: target,
        });

        if shooter == target {
            return;
        }
        let Some(mut vitals) = self.component_mut::<Vitals>(shooter) else {
            return;
        };
        let reached_target = vitals.score.credit_kill();
        let kills = vitals.score.kills();
        self.outgoing.push(ServerMessage::ScoreChanged {
            entity: shooter,
            kills,
        });
        if reached_target {
            info!(winner = %shooter, kills, tick, "game over");
            self.winner = Some(shooter);
            self.outgoing.push(ServerMessage::GameOver { winner: shooter });
            self.tick_events.push(SessionEvent::GameOver {
                tick,
                winner: shooter,
            });
        }
    }

    fn replicate(&mut self, tick: SimTick) {
        let resync = tick.0 % self.config().resync_interval_ticks == 0;
        let now = self.now();

        let mut query = self
            .world
            .query::<(&PlayerId, &mut PlayerUniverse, &Vitals)>();
        let mut players = BTreeMap::new();
        for (id, mut membership, vitals) in query.iter_mut(&mut self.world) {
            if membership.replicated.take_dirty() {
                trace!(entity = %id.0, seq = membership.replicated.seq(), "replicating write");
            }
            players.insert(
                id.0,
                ReplicatedPlayer {
                    update: StateUpdate {
                        entity: id.0,
                        seq: membership.replicated.seq(),
                        state: *membership.replicated.get(),
                        progress: membership.machine.elapsed_fraction(now),
                    },
                    health: vitals.health.current(),
                },
            );
        }

        for (client_id, client) in self.clients.iter_mut() {
            if !client.connection.is_established() {
                continue;
            }
            for msg in client.tracker.generate(&players, resync) {
                if let Err(e) = client.connection.send(&msg) {
                    warn!(client = %client_id, "Failed to send replication update: {:#}", e);
                }
            }
        }
    }

    fn broadcast(&mut self) {
        let messages = std::mem::take(&mut self.outgoing);
        for (client_id, client) in self.clients.iter_mut() {
            if !client.connection.is_established() {
                continue;
            }
            for msg in &messages {
                if let Err(e) = client.connection.send(msg) {
                    warn!(client = %client_id, "Failed to broadcast: {:#}", e);
                }
            }
        }
    }

    fn flush_events(&mut self) -> Result<()> {
        let events = std::mem::take(&mut self.tick_events);
        if let Some(logger) = &mut self.event_logger {
            for event in &events {
                logger.log(event).context("Failed to write session event")?;
            }
            logger.flush()?;
        }
        self.last_tick_events = events;
        Ok(())
    }

    fn component<T: bevy_ecs::component::Component>(&self, id: EntityId) -> Option<&T> {
        let entity = *self.players.get(&id)?;
        self.world.get::<T>(entity)
    }

    fn component_mut<T: bevy_ecs::component::Component>(
        &mut self,
        id: EntityId,
    ) -> Option<bevy_ecs::world::Mut<'_, T>> {
        let entity = *self.players.get(&id)?;
        self.world.get_mut::<T>(entity)
    }
}

/// Mean of the spawn points; players spawn facing it.
fn arena_center(config: &SessionConfig) -> Vec3 {
    if config.spawn_points.is_empty() {
        return Vec3::ZERO;
    }
    let sum: Vec3 = config
        .spawn_points
        .iter()
        .copied()
        .map(Vec3::from_array)
        .sum();
    sum / config.spawn_points.len() as f32
}
