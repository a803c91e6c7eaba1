use anyhow::{Context, Result};
use parallel_worlds_client::{ClientView, NullPresentation};
use parallel_worlds_core::{EntityId, SessionConfig};
use parallel_worlds_net::{link_pair, ClientConnection, LinkConfig};
use parallel_worlds_server::Session;
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

/// Per-tick chance that a simulated client asks to swap.
const SWAP_CHANCE: f64 = 0.01;
/// Per-tick chance that a simulated client pulls the trigger.
const FIRE_CHANCE: f64 = 0.2;

pub struct HeadlessOptions {
    pub config: SessionConfig,
    pub max_ticks: u64,
    pub bots: usize,
    pub clients: usize,
    pub drop_rate: f32,
    pub event_log: Option<PathBuf>,
    pub realtime: bool,
}

#[derive(Debug)]
pub struct RunSummary {
    pub ticks: u64,
    pub winner: Option<EntityId>,
    pub scoreboard: Vec<(EntityId, u32)>,
    pub frames_dropped: u64,
    pub clients_saw_winner: usize,
}

/// A client driven by random input through its own view.
struct SimulatedClient {
    view: ClientView<NullPresentation>,
    rng: StdRng,
}

impl SimulatedClient {
    /// Positions are not replicated, so the simulated client reads them from
    /// the session when aiming.
    fn act(&mut self, session: &Session) -> Result<()> {
        let Some(me) = self.view.local_player() else {
            return Ok(());
        };
        if self.rng.gen_bool(SWAP_CHANCE) && self.view.request_swap()? {
            debug!(entity = %me, "simulated client requested swap");
        }
        if !self.rng.gen_bool(FIRE_CHANCE) {
            return Ok(());
        }

        let targets: Vec<EntityId> = self
            .view
            .player_ids()
            .into_iter()
            .filter(|id| *id != me)
            .filter(|id| self.view.player(*id).is_some_and(|p| p.is_alive()))
            .collect();
        if targets.is_empty() {
            return Ok(());
        }
        let target = targets[self.rng.gen_range(0..targets.len())];
        let (Some(origin), Some(aim)) = (session.position(me), session.position(target)) else {
            return Ok(());
        };
        let direction = aim - origin;
        if direction.length_squared() <= f32::EPSILON {
            return Ok(());
        }
        self.view.fire(origin, direction)?;
        Ok(())
    }
}

/// Run a session to game over or `max_ticks` on a tokio runtime.
pub fn run(options: HeadlessOptions) -> Result<RunSummary> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?;
    runtime.block_on(run_session(options))
}

async fn run_session(options: HeadlessOptions) -> Result<RunSummary> {
    let config = options.config;
    let mut session = Session::new(config.clone())?;
    if let Some(path) = &options.event_log {
        session.enable_event_log(path)?;
    }

    for _ in 0..options.bots {
        session.spawn_bot();
    }

    let mut clients = Vec::with_capacity(options.clients);
    for i in 0..options.clients {
        let (client_end, server_end) = link_pair(LinkConfig {
            drop_rate: options.drop_rate,
            seed: config.seed.wrapping_add(i as u64),
        });
        session.connect(server_end);
        let connection = ClientConnection::connect(client_end)?;
        clients.push(SimulatedClient {
            view: ClientView::new(connection, &config, NullPresentation),
            rng: StdRng::seed_from_u64(config.seed ^ (0x5eed_0000 + i as u64)),
        });
    }

    let tick_seconds = config.tick_seconds();
    let mut interval = tokio::time::interval(Duration::from_secs_f64(tick_seconds));
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!(
        bots = options.bots,
        clients = options.clients,
        max_ticks = options.max_ticks,
        "Headless session starting"
    );

    let mut ticks = 0;
    while ticks < options.max_ticks {
        if options.realtime {
            interval.tick().await;
        } else {
            tokio::task::yield_now().await;
        }

        session.tick()?;
        ticks += 1;

        for client in clients.iter_mut() {
            client.view.poll();
            client.view.update(tick_seconds as f32);
            client.act(&session)?;
        }

        if session.winner().is_some() {
            break;
        }
    }

    for client in clients.iter_mut() {
        client.view.disconnect("runner finished")?;
    }
    session.tick()?;

    let clients_saw_winner = clients
        .iter()
        .filter(|c| c.view.winner().is_some() && c.view.winner() == session.winner())
        .count();
    let scoreboard = session
        .player_ids()
        .into_iter()
        .filter_map(|id| session.kills(id).map(|kills| (id, kills)))
        .collect();

    Ok(RunSummary {
        ticks,
        winner: session.winner(),
        scoreboard,
        frames_dropped: session.frames_dropped(),
        clients_saw_winner,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(config: SessionConfig, bots: usize, clients: usize) -> HeadlessOptions {
        HeadlessOptions {
            config: SessionConfig {
                tick_rate: 20,
                ..config
            },
            max_ticks: 2_000,
            bots,
            clients,
            drop_rate: 0.0,
            event_log: None,
            realtime: false,
        }
    }

    #[test]
    fn bots_in_a_line_finish_a_match() {
        // Centre is the middle point: the outer A bots face each other
        // through the B bot between them.
        let config = SessionConfig {
            kill_target: 1,
            max_health: 1,
            spawn_points: vec![[0.0, 0.0, 0.0], [10.0, 0.0, 0.0], [20.0, 0.0, 0.0]],
            ..SessionConfig::default()
        };
        let summary = run(options(config, 3, 0)).unwrap();
        assert!(summary.winner.is_some());
        assert!(summary.ticks < 2_000);
        assert_eq!(
            summary
                .scoreboard
                .iter()
                .filter(|(_, kills)| *kills == 1)
                .count(),
            1
        );
    }

    #[test]
    fn clients_leave_at_the_end() {
        let summary = run(HeadlessOptions {
            max_ticks: 30,
            ..options(SessionConfig::default(), 0, 2)
        })
        .unwrap();
        assert_eq!(summary.ticks, 30);
        assert!(summary.scoreboard.is_empty());
    }
}
