//! Death, respawn, scoring and game over.

use glam::Vec3;
use parallel_worlds_core::{
    EntityId, Layer, SessionConfig, TransitionState, Universe, UniverseState,
};
use parallel_worlds_net::{load_events, SessionEvent};
use parallel_worlds_server::Session;

fn config() -> SessionConfig {
    SessionConfig {
        tick_rate: 20,
        max_health: 1,
        kill_target: 2,
        respawn_delay: 0.5,
        spawn_points: vec![
            [0.0, 0.0, 0.0],
            [10.0, 0.0, 0.0],
            [0.0, 0.0, 30.0],
            [20.0, 0.0, 0.0],
        ],
        ..SessionConfig::default()
    }
}

struct Arena {
    session: Session,
    hunter: EntityId,
    b_player: EntityId,
    victim: EntityId,
}

/// Hunter (A) at the origin, a B player at x=10, and an A victim moved onto
/// the firing line at x=5.
fn arena() -> Arena {
    let mut session = Session::new(config()).unwrap();
    let hunter = session.spawn_local_player();
    let b_player = session.spawn_local_player();
    let victim = session.spawn_local_player();
    assert!(session.set_pose(victim, Vec3::new(5.0, 0.0, 0.0), Vec3::NEG_X));
    Arena {
        session,
        hunter,
        b_player,
        victim,
    }
}

fn count(session: &Session, pred: impl Fn(&SessionEvent) -> bool) -> usize {
    session.last_tick_events().iter().filter(|e| pred(e)).count()
}

#[test]
fn killed_player_loses_collider_and_input() {
    let Arena {
        mut session,
        hunter,
        victim,
        ..
    } = arena();
    session.queue_fire(hunter, Vec3::ZERO, Vec3::X);
    session.tick().unwrap();

    assert!(session.is_dead(victim));
    assert_eq!(session.health(victim), Some(0));
    assert_eq!(session.body_layer(victim), None);
    assert_eq!(session.kills(hunter), Some(1));
    assert_eq!(
        count(&session, |e| matches!(e, SessionEvent::Kill { .. })),
        1
    );

    session.queue_swap(victim);
    session.queue_fire(victim, Vec3::new(5.0, 0.0, 0.0), Vec3::NEG_X);
    session.tick().unwrap();
    assert_eq!(
        session.player_state(victim).unwrap().transition,
        TransitionState::Normal
    );
    assert_eq!(
        count(&session, |e| matches!(
            e,
            SessionEvent::SwapAccepted { .. } | SessionEvent::ShotFired { .. }
        )),
        0
    );
    assert_eq!(session.health(hunter), Some(1));
}

#[test]
fn dead_player_respawns_after_delay() {
    let Arena {
        mut session,
        hunter,
        victim,
        ..
    } = arena();
    session.queue_fire(hunter, Vec3::ZERO, Vec3::X);
    session.tick().unwrap();
    assert!(session.is_dead(victim));

    // Killed at t=0.0; back at t=0.5, i.e. ten ticks at 20 Hz.
    for _ in 1..10 {
        session.tick().unwrap();
        assert!(session.is_dead(victim));
    }
    session.tick().unwrap();
    assert!(!session.is_dead(victim));
    assert_eq!(
        count(&session, |e| matches!(e, SessionEvent::Respawned { .. })),
        1
    );

    assert_eq!(session.health(victim), Some(1));
    assert_eq!(session.position(victim), Some(Vec3::new(20.0, 0.0, 0.0)));
    // Fourth round-robin pick.
    let state = session.player_state(victim).unwrap();
    assert_eq!(state.universe, Universe::B);
    assert!(state.is_normal());
    assert_eq!(session.body_layer(victim), Some(Layer::UniverseB));
    assert_eq!(session.kills(hunter), Some(1));
}

#[test]
fn reaching_kill_target_ends_match() {
    let Arena {
        mut session,
        hunter,
        b_player,
        victim,
    } = arena();
    session.queue_fire(hunter, Vec3::ZERO, Vec3::X);
    session.tick().unwrap();
    assert_eq!(session.winner(), None);

    // Cross into B to reach the B player.
    session.queue_swap(hunter);
    let mut guard = 0;
    while session.player_state(hunter) != Some(UniverseState::spawned(Universe::B)) {
        session.tick().unwrap();
        guard += 1;
        assert!(guard < 60, "swap never completed");
    }

    session.queue_fire(hunter, Vec3::ZERO, Vec3::X);
    session.tick().unwrap();
    assert!(session.is_dead(b_player));
    assert_eq!(session.kills(hunter), Some(2));
    assert_eq!(session.winner(), Some(hunter));
    assert_eq!(
        count(&session, |e| matches!(e, SessionEvent::GameOver { .. })),
        1
    );

    // Everything after game over is ignored.
    assert!(!session.is_dead(victim));
    session.queue_swap(victim);
    session.queue_fire(victim, Vec3::new(20.0, 0.0, 0.0), Vec3::NEG_X);
    session.tick().unwrap();
    assert!(session.player_state(victim).unwrap().is_normal());
    assert_eq!(session.health(hunter), Some(1));
    assert_eq!(
        count(&session, |e| matches!(e, SessionEvent::GameOver { .. })),
        0
    );
}

#[test]
fn event_log_records_lifecycle() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("events.jsonl");
    let Arena {
        mut session,
        hunter,
        victim,
        ..
    } = arena();
    session.enable_event_log(&path).unwrap();

    session.queue_fire(hunter, Vec3::ZERO, Vec3::X);
    for _ in 0..12 {
        session.tick().unwrap();
    }
    assert!(session.despawn_player(victim));
    session.tick().unwrap();

    let events = load_events(&path).unwrap();
    let spawned = events
        .iter()
        .filter(|e| matches!(e, SessionEvent::PlayerSpawned { bot: false, .. }))
        .count();
    assert_eq!(spawned, 3);
    assert!(events.contains(&SessionEvent::ShotFired {
        tick: 0,
        shooter: hunter,
        target: Some(victim),
    }));
    assert!(events.contains(&SessionEvent::Kill {
        tick: 0,
        shooter: hunter,
        victim,
    }));
    assert!(events.contains(&SessionEvent::Respawned {
        tick: 10,
        entity: victim,
        universe: Universe::B,
    }));
    assert!(events
        .iter()
        .any(|e| matches!(e, SessionEvent::Despawned { entity, .. } if *entity == victim)));

    let ticks: Vec<u64> = events.iter().map(SessionEvent::tick).collect();
    assert!(ticks.windows(2).all(|w| w[0] <= w[1]));
}
