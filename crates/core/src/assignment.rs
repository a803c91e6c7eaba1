//! Spawn-time universe assignment.

use crate::universe::Universe;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// How spawning players are distributed across universes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PickMode {
    /// Independent fair coin per spawn.
    Random,
    /// A, B, A, B, ... across the session.
    #[default]
    RoundRobin,
}

/// Session-owned universe assignment service.
///
/// One instance per session, handed to whatever spawns players.
#[derive(Debug, Clone)]
pub struct UniverseAssigner {
    mode: PickMode,
    last: Universe,
    rng: StdRng,
}

impl UniverseAssigner {
    /// Create an assigner. `seed` only matters in [`PickMode::Random`].
    pub fn new(mode: PickMode, seed: u64) -> Self {
        Self {
            mode,
            last: Universe::Undefined,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Universe for the next spawning player. Never [`Universe::Undefined`].
    pub fn spawn_universe(&mut self) -> Universe {
        let universe = match self.mode {
            PickMode::Random => {
                if self.rng.gen_bool(0.5) {
                    Universe::A
                } else {
                    Universe::B
                }
            }
            PickMode::RoundRobin => match self.last {
                Universe::A => Universe::B,
                Universe::B | Universe::Undefined => Universe::A,
            },
        };
        self.last = universe;
        universe
    }

    /// The universe a swap from `universe` lands in.
    pub fn opposite(universe: Universe) -> Universe {
        universe.opposite()
    }
}
