//! Per-tick session systems: timed transition edges and respawns.

use crate::components::{
    Assigner, Dead, Outbox, PlayerId, PlayerUniverse, Pose, SessionClock, SpawnPoints, Vitals,
};
use bevy_ecs::prelude::{Commands, Entity, Query, Res, ResMut};
use parallel_worlds_core::TIME_EPSILON;
use parallel_worlds_net::{ServerMessage, SessionEvent};
use tracing::{debug, info};

/// Take every due timed edge and publish the new state.
pub fn advance_transitions(
    clock: Res<SessionClock>,
    mut outbox: ResMut<Outbox>,
    mut players: Query<(&PlayerId, &mut PlayerUniverse)>,
) {
    let now = clock.now();
    for (id, mut membership) in players.iter_mut() {
        let Some(state) = membership.machine.advance(now) else {
            continue;
        };
        if membership.publish() {
            debug!(entity = %id.0, tick = clock.tick.0, %state, "transition phase advanced");
            outbox.events.push(SessionEvent::StateChanged {
                tick: clock.tick.0,
                entity: id.0,
                state,
            });
        }
    }
}

/// Bring back dead players whose delay has elapsed: full health, next spawn
/// point, freshly assigned universe.
pub fn respawn_dead(
    mut commands: Commands,
    clock: Res<SessionClock>,
    mut assigner: ResMut<Assigner>,
    mut spawn_points: ResMut<SpawnPoints>,
    mut outbox: ResMut<Outbox>,
    mut players: Query<(
        Entity,
        &PlayerId,
        &Dead,
        &mut PlayerUniverse,
        &mut Vitals,
        &mut Pose,
    )>,
) {
    let now = clock.now();
    for (entity, id, dead, mut membership, mut vitals, mut pose) in players.iter_mut() {
        if now + TIME_EPSILON < dead.respawn_at {
            continue;
        }
        let universe = assigner.0.spawn_universe();
        membership.machine.reset(universe, now);
        if membership.publish() {
            outbox.events.push(SessionEvent::StateChanged {
                tick: clock.tick.0,
                entity: id.0,
                state: membership.state(),
            });
        }
        vitals.health.reset();
        pose.position = spawn_points.next_point();
        commands.entity(entity).remove::<Dead>();

        info!(
            entity = %id.0,
            tick = clock.tick.0,
            universe = universe.as_str(),
            "player respawned"
        );
        outbox.messages.push(ServerMessage::Respawned {
            entity: id.0,
            health: vitals.health.current(),
        });
        outbox.events.push(SessionEvent::Respawned {
            tick: clock.tick.0,
            entity: id.0,
            universe,
        });
    }
}
