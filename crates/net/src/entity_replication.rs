//! Per-client replication of player universe state.
//!
//! Each client gets its own tracker remembering which players it has been
//! told about and which write of each it was last sent. Spawns and despawns
//! go out on reliable channels; state writes go out on the lossy replication
//! channel and are re-sent in full on resync passes.

use crate::protocol::{ServerMessage, StateUpdate};
use parallel_worlds_core::EntityId;
use std::collections::BTreeMap;

/// Snapshot of one player as the replication pass sees it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReplicatedPlayer {
    /// Latest authoritative write.
    pub update: StateUpdate,
    /// Current health, sent with the spawn.
    pub health: u32,
}

/// Tracks what one client has been sent.
/// Uses BTreeMap for deterministic iteration order.
#[derive(Debug, Default, Clone)]
pub struct ReplicationTracker {
    /// Last sequence number sent per known player.
    sent: BTreeMap<EntityId, u32>,
}

impl ReplicationTracker {
    /// Tracker for a client that knows nothing yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages that bring this client up to date with `players`.
    ///
    /// Unknown players produce `PlayerSpawned` with their current state,
    /// players with a newer write (or every player, when `resync` is set)
    /// produce `UniverseState`, and players that are gone produce
    /// `PlayerDespawned`.
    pub fn generate(
        &mut self,
        players: &BTreeMap<EntityId, ReplicatedPlayer>,
        resync: bool,
    ) -> Vec<ServerMessage> {
        let mut messages = Vec::new();

        for (entity, player) in players {
            match self.sent.get_mut(entity) {
                None => {
                    messages.push(ServerMessage::PlayerSpawned {
                        update: player.update,
                        health: player.health,
                    });
                    self.sent.insert(*entity, player.update.seq);
                }
                Some(seq) => {
                    if *seq != player.update.seq || resync {
                        messages.push(ServerMessage::UniverseState(player.update));
                        *seq = player.update.seq;
                    }
                }
            }
        }

        let gone: Vec<EntityId> = self
            .sent
            .keys()
            .filter(|entity| !players.contains_key(entity))
            .copied()
            .collect();
        for entity in gone {
            self.sent.remove(&entity);
            messages.push(ServerMessage::PlayerDespawned { entity });
        }

        messages
    }

    /// Number of players this client knows about.
    pub fn tracked_count(&self) -> usize {
        self.sent.len()
    }
}
