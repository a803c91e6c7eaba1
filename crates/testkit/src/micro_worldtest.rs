//! Tick-stepped golden tests.
//!
//! A micro-worldtest steps a small deterministic simulation a fixed number
//! of ticks, captures a snapshot after every step, and compares the whole
//! timeline against a golden JSON file (rewritten instead when
//! `PW_UPDATE_SNAPSHOTS=1`).

use crate::snapshot::assert_json_snapshot;
use anyhow::Result;
use parallel_worlds_core::SimTick;
use serde::Serialize;
use std::path::PathBuf;

/// Configuration for a micro-worldtest.
#[derive(Debug, Clone)]
pub struct MicroWorldtestConfig {
    /// Name written into the report.
    pub name: String,
    /// Steps to run; the report holds `ticks + 1` frames.
    pub ticks: u64,
    /// Golden JSON file.
    pub snapshot_path: PathBuf,
}

impl MicroWorldtestConfig {
    /// Config whose golden file lives at `<crate_dir>/tests/snapshots/<name>.json`.
    pub fn in_crate(crate_dir: &str, name: &str, ticks: u64) -> Self {
        Self {
            name: name.to_string(),
            ticks,
            snapshot_path: PathBuf::from(crate_dir)
                .join("tests/snapshots")
                .join(format!("{name}.json")),
        }
    }
}

/// Snapshot captured after a step.
#[derive(Debug, Clone, Serialize)]
pub struct MicroWorldtestFrame<S> {
    /// Tick number.
    pub tick: u64,
    /// Snapshot payload.
    pub snapshot: S,
}

#[derive(Debug, Clone, Serialize)]
struct MicroWorldtestReport<S> {
    name: String,
    frames: Vec<MicroWorldtestFrame<S>>,
}

/// Run a micro-worldtest and assert (or update) its golden file.
///
/// Frame 0 is the initial state; `step` is then called with the tick being
/// left and the snapshot taken with the tick being entered.
pub fn run_micro_worldtest<State, Snapshot, StepFn, SnapFn>(
    config: MicroWorldtestConfig,
    mut state: State,
    mut step: StepFn,
    mut snapshot: SnapFn,
) -> Result<()>
where
    Snapshot: Serialize,
    StepFn: FnMut(SimTick, &mut State),
    SnapFn: FnMut(SimTick, &State) -> Snapshot,
{
    let mut frames = Vec::with_capacity(config.ticks as usize + 1);

    let mut tick = SimTick::ZERO;
    frames.push(MicroWorldtestFrame {
        tick: tick.0,
        snapshot: snapshot(tick, &state),
    });

    for _ in 0..config.ticks {
        step(tick, &mut state);
        tick = tick.advance(1);
        frames.push(MicroWorldtestFrame {
            tick: tick.0,
            snapshot: snapshot(tick, &state),
        });
    }

    let report = MicroWorldtestReport {
        name: config.name,
        frames,
    };
    assert_json_snapshot(config.snapshot_path, &report)
}
