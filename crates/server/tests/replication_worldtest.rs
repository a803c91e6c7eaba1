//! Sessions driven through real client links and observer views.

use glam::Vec3;
use parallel_worlds_client::{ClientView, PresentationCall, RecordingPresentation};
use parallel_worlds_core::{
    EntityId, Layer, SessionConfig, TransitionState, Universe, UniverseState,
};
use parallel_worlds_net::{
    compute_schema_hash, link_pair, ClientConnection, ClientMessage, LinkConfig,
    PROTOCOL_VERSION,
};
use parallel_worlds_server::{ClientId, Session};

fn config() -> SessionConfig {
    SessionConfig {
        tick_rate: 20,
        resync_interval_ticks: 10,
        ..SessionConfig::default()
    }
}

fn join(
    session: &mut Session,
    link: LinkConfig,
) -> (ClientId, ClientView<RecordingPresentation>) {
    let (client_end, server_end) = link_pair(link);
    let id = session.connect(server_end);
    let connection = ClientConnection::connect(client_end).unwrap();
    let view = ClientView::new(
        connection,
        session.config(),
        RecordingPresentation::default(),
    );
    (id, view)
}

fn step(session: &mut Session, views: &mut [&mut ClientView<RecordingPresentation>]) {
    session.tick().unwrap();
    for view in views.iter_mut() {
        view.poll();
        view.update(session.config().tick_seconds() as f32);
    }
}

#[test]
fn handshake_spawns_owned_player() {
    let mut session = Session::new(config()).unwrap();
    let (client, mut view) = join(&mut session, LinkConfig::LOSSLESS);
    assert_eq!(session.player_count(), 0);

    step(&mut session, &mut [&mut view]);

    let owned = session.client_player(client).unwrap();
    assert_eq!(view.local_player(), Some(owned));
    assert_eq!(view.local_state(), session.player_state(owned));
    assert_eq!(
        view.settings_of(owned).unwrap().render_layer,
        Layer::UniverseA
    );
}

#[test]
fn mismatched_handshake_is_rejected() {
    let mut session = Session::new(config()).unwrap();
    let (client_end, server_end) = link_pair(LinkConfig::LOSSLESS);
    session.connect(server_end);
    let mut connection = ClientConnection::raw(client_end);
    connection
        .send(&ClientMessage::Handshake {
            version: PROTOCOL_VERSION + 1,
            schema_hash: compute_schema_hash(),
        })
        .unwrap();
    let mut view = ClientView::new(connection, session.config(), RecordingPresentation::default());

    step(&mut session, &mut [&mut view]);

    assert!(view.rejection().is_some());
    assert_eq!(view.local_player(), None);
    assert_eq!(session.client_count(), 0);
    assert_eq!(session.player_count(), 0);
}

#[test]
fn late_joiner_sees_swap_in_flight() {
    let mut session = Session::new(config()).unwrap();
    let early = session.spawn_local_player();
    session.queue_swap(early);
    session.tick().unwrap();

    let (_, mut view) = join(&mut session, LinkConfig::LOSSLESS);
    step(&mut session, &mut [&mut view]);

    let swap_out = UniverseState::new(Universe::A, TransitionState::SwapOut);
    assert_eq!(view.state_of(early), Some(swap_out));
    // The late joiner owns a B player, so the A player mid-swap is bent into
    // B's echo layer for it.
    assert_eq!(view.local_state().unwrap().universe, Universe::B);
    assert_eq!(
        view.settings_of(early).unwrap().render_layer,
        Layer::UniverseBCollisionA
    );
    assert!(view.player(early).unwrap().effect().is_some());
}

#[test]
fn late_joiner_effect_resumes_at_authoritative_progress() {
    let mut session = Session::new(config()).unwrap();
    let early = session.spawn_local_player();
    session.queue_swap(early);
    // Accepted at t=0; eleven ticks at 20 Hz put the cycle halfway.
    for _ in 0..11 {
        session.tick().unwrap();
    }

    let (_, mut view) = join(&mut session, LinkConfig::LOSSLESS);
    step(&mut session, &mut [&mut view]);

    assert_eq!(
        session.player_state(early),
        Some(UniverseState::new(Universe::A, TransitionState::SwapOut))
    );
    // Sent at t=0.55, then stepped by one frame.
    let effect = *view.player(early).unwrap().effect().unwrap();
    assert_eq!(effect.phase(), TransitionState::SwapOut);
    assert!((effect.fraction() - 0.6).abs() < 1e-4, "{}", effect.fraction());
    assert!(!effect.is_finished());
}

#[test]
fn render_layer_is_resolved_per_observer() {
    let mut session = Session::new(config()).unwrap();
    let subject = session.spawn_local_player();
    let (_, mut in_b) = join(&mut session, LinkConfig::LOSSLESS);
    let (_, mut in_a) = join(&mut session, LinkConfig::LOSSLESS);
    step(&mut session, &mut [&mut in_b, &mut in_a]);
    assert_eq!(in_b.local_state().unwrap().universe, Universe::B);
    assert_eq!(in_a.local_state().unwrap().universe, Universe::A);

    session.queue_swap(subject);
    step(&mut session, &mut [&mut in_b, &mut in_a]);

    let from_b = in_b.settings_of(subject).unwrap();
    let from_a = in_a.settings_of(subject).unwrap();
    assert_eq!(from_b.render_layer, Layer::UniverseBCollisionA);
    assert_eq!(from_a.render_layer, Layer::UniverseA);
    assert_eq!(from_b.shoot_mask, from_a.shoot_mask);
}

#[test]
fn swap_request_only_moves_own_player() {
    let mut session = Session::new(config()).unwrap();
    let bystander = session.spawn_local_player();
    let (client, mut view) = join(&mut session, LinkConfig::LOSSLESS);
    step(&mut session, &mut [&mut view]);
    let owned = session.client_player(client).unwrap();

    assert!(view.request_swap().unwrap());
    step(&mut session, &mut [&mut view]);

    assert_eq!(
        session.player_state(owned).unwrap().transition,
        TransitionState::SwapOut
    );
    assert!(session.player_state(bystander).unwrap().is_normal());
    assert_eq!(view.local_state(), session.player_state(owned));
    // Gated locally until the cycle completes.
    assert!(!view.request_swap().unwrap());
}

#[test]
fn client_kill_reaches_every_view() {
    let mut session = Session::new(SessionConfig {
        max_health: 1,
        kill_target: 1,
        spawn_points: vec![[0.0, 0.0, 0.0], [0.0, 0.0, 30.0], [10.0, 0.0, 0.0]],
        ..config()
    })
    .unwrap();
    let target = session.spawn_local_player();
    session.spawn_local_player();
    let (client, mut view) = join(&mut session, LinkConfig::LOSSLESS);
    step(&mut session, &mut [&mut view]);
    let shooter = session.client_player(client).unwrap();
    assert_eq!(session.player_state(shooter).unwrap().universe, Universe::A);

    assert!(view.fire(Vec3::new(10.0, 0.0, 0.0), Vec3::NEG_X).unwrap());
    step(&mut session, &mut [&mut view]);

    assert_eq!(session.winner(), Some(shooter));
    assert_eq!(view.winner(), Some(shooter));
    let calls = &view.presentation().calls;
    assert!(calls.contains(&PresentationCall::Shot {
        shooter,
        hit: true,
        layer: Some(Layer::UniverseA),
    }));
    assert!(calls.contains(&PresentationCall::Damaged(target, 0, true)));
    assert!(calls.contains(&PresentationCall::Score(shooter, 1)));
    assert!(calls.contains(&PresentationCall::GameOver(shooter)));
    assert!(!view.player(target).unwrap().is_alive());
    assert!(!view.request_swap().unwrap());
}

#[test]
fn lossy_replication_converges_after_resync() {
    let mut session = Session::new(config()).unwrap();
    let players: Vec<EntityId> = (0..4).map(|_| session.spawn_local_player()).collect();
    let (_, mut lossy) = join(
        &mut session,
        LinkConfig {
            drop_rate: 0.4,
            seed: 7,
        },
    );
    let (_, mut clean) = join(&mut session, LinkConfig::LOSSLESS);

    for tick in 0..200u64 {
        for (i, player) in players.iter().enumerate() {
            if tick % (17 + 6 * i as u64) == 3 {
                session.queue_swap(*player);
            }
        }
        step(&mut session, &mut [&mut lossy, &mut clean]);
    }
    // Quiet period: no new writes, only resyncs.
    for _ in 0..300 {
        step(&mut session, &mut [&mut lossy, &mut clean]);
    }

    assert!(session.frames_dropped() > 0);
    for id in session.player_ids() {
        let authoritative = session.player_state(id);
        assert_eq!(lossy.state_of(id), authoritative, "lossy view of {id}");
        assert_eq!(clean.state_of(id), authoritative, "clean view of {id}");
    }
}
