//! parallel-worlds - headless runner for a two-universe shooter session
//!
//! Runs an authoritative session with bots and simulated clients over
//! in-process links, then prints the scoreboard.

mod config;
mod headless;

use anyhow::{Context, Result};
use headless::HeadlessOptions;
use parallel_worlds_core::validate_drop_rate;
use std::{env, path::PathBuf};
use tracing::info;

/// Ticks run when `--max-ticks` is not given (one minute at 60 Hz).
const DEFAULT_MAX_TICKS: u64 = 3_600;

fn main() -> Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();
    let verbose = args.iter().any(|a| a == "--verbose");

    // WARN by default (RUST_LOG overrides); --verbose raises the workspace crates to INFO.
    let default_filter = if verbose {
        "warn,parallel_worlds=info"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .init();

    info!("Starting parallel-worlds v{}", env!("CARGO_PKG_VERSION"));

    let cli = CliOptions::parse(args.into_iter());
    let mut session_config = config::load_session_config(cli.config.as_deref());
    if let Some(seed) = cli.seed {
        session_config.seed = seed;
    }
    session_config
        .validate()
        .context("Invalid session configuration")?;
    validate_drop_rate(cli.drop_rate).context("Invalid --drop-rate")?;

    let summary = headless::run(HeadlessOptions {
        config: session_config,
        max_ticks: cli.max_ticks.unwrap_or(DEFAULT_MAX_TICKS),
        bots: cli.bots,
        clients: cli.clients,
        drop_rate: cli.drop_rate,
        event_log: cli.event_log,
        realtime: cli.realtime,
    })?;

    info!(
        ticks = summary.ticks,
        frames_dropped = summary.frames_dropped,
        clients_saw_winner = summary.clients_saw_winner,
        "Session finished"
    );
    match summary.winner {
        Some(winner) => println!("winner {winner} after {} ticks", summary.ticks),
        None => println!("no winner after {} ticks", summary.ticks),
    }
    for (entity, kills) in &summary.scoreboard {
        println!("{entity} kills={kills}");
    }
    Ok(())
}

#[derive(Debug, Default)]
struct CliOptions {
    config: Option<PathBuf>,
    max_ticks: Option<u64>,
    bots: usize,
    clients: usize,
    seed: Option<u64>,
    drop_rate: f32,
    event_log: Option<PathBuf>,
    realtime: bool,
}

impl CliOptions {
    fn parse<I: Iterator<Item = String>>(mut args: I) -> Self {
        let mut opts = CliOptions {
            bots: 2,
            ..CliOptions::default()
        };

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" => {
                    if let Some(path) = args.next() {
                        opts.config = Some(PathBuf::from(path));
                    } else {
                        tracing::error!("--config requires a file path");
                    }
                }
                "--event-log" => {
                    if let Some(path) = args.next() {
                        opts.event_log = Some(PathBuf::from(path));
                    } else {
                        tracing::error!("--event-log requires a file path");
                    }
                }
                "--max-ticks" => {
                    if let Some(value) = parse_value(&mut args, "--max-ticks") {
                        opts.max_ticks = Some(value);
                    }
                }
                "--bots" => {
                    if let Some(value) = parse_value(&mut args, "--bots") {
                        opts.bots = value;
                    }
                }
                "--clients" => {
                    if let Some(value) = parse_value(&mut args, "--clients") {
                        opts.clients = value;
                    }
                }
                "--seed" => {
                    if let Some(value) = parse_value(&mut args, "--seed") {
                        opts.seed = Some(value);
                    }
                }
                "--drop-rate" => {
                    if let Some(value) = parse_value(&mut args, "--drop-rate") {
                        opts.drop_rate = value;
                    }
                }
                "--realtime" => opts.realtime = true,
                "--verbose" => {}
                other => tracing::warn!(arg = other, "Ignoring unknown argument"),
            }
        }

        opts
    }
}

fn parse_value<T, I>(args: &mut I, flag: &str) -> Option<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    I: Iterator<Item = String>,
{
    let Some(raw) = args.next() else {
        tracing::error!("{flag} requires a value");
        return None;
    };
    match raw.parse::<T>() {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::error!(%err, value = %raw, "{flag} has an invalid value");
            None
        }
    }
}
