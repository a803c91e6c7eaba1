//! Protocol message definitions for client-server communication.
//!
//! All messages use postcard serialization for compact binary encoding.

use crate::channel::ChannelType;
use parallel_worlds_core::{EntityId, UniverseState};
use serde::{Deserialize, Serialize};

/// Protocol version for compatibility checking.
pub const PROTOCOL_VERSION: u16 = 1;

/// Protocol magic bytes to identify the parallel-worlds protocol.
pub const PROTOCOL_MAGIC: &[u8; 10] = b"PWLD\x00\x01\x00\x00\x00\x00";

/// Maximum length of a handshake rejection or disconnect reason.
pub const MAX_REASON_LEN: usize = 256;

/// Maximum magnitude of any coordinate in a fire request.
pub const MAX_COORDINATE: f32 = 1.0e6;

/// Messages sent from client to server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum ClientMessage {
    /// Handshake request with protocol version and schema hash.
    Handshake {
        /// Protocol version.
        version: u16,
        /// Schema hash for compatibility.
        schema_hash: u64,
    },

    /// Ask to swap the controlled player to the other universe.
    RequestSwap,

    /// Fire the controlled player's weapon.
    Fire(FireRequest),

    /// Client disconnect notification.
    Disconnect {
        /// Reason for disconnect.
        reason: String,
    },
}

impl ClientMessage {
    /// Verify message limits and validity.
    ///
    /// This should be called on all received messages before they reach the
    /// simulation.
    pub fn verify(&self) -> Result<(), &'static str> {
        match self {
            ClientMessage::Fire(request) => request.verify(),
            ClientMessage::Disconnect { reason } => {
                if reason.len() > MAX_REASON_LEN {
                    return Err("Disconnect reason too long");
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Channel this message travels on.
    pub fn channel(&self) -> ChannelType {
        match self {
            ClientMessage::Handshake { .. } | ClientMessage::Disconnect { .. } => {
                ChannelType::Control
            }
            ClientMessage::RequestSwap | ClientMessage::Fire(_) => ChannelType::Events,
        }
    }
}

/// Ray a client wants to fire along, in world space.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct FireRequest {
    /// Muzzle position.
    pub origin: [f32; 3],
    /// Aim direction (any non-zero length).
    pub direction: [f32; 3],
}

impl FireRequest {
    /// Reject non-finite or absurd coordinates and zero directions.
    pub fn verify(&self) -> Result<(), &'static str> {
        let in_range = |v: &[f32; 3]| v.iter().all(|c| c.is_finite() && c.abs() <= MAX_COORDINATE);
        if !in_range(&self.origin) {
            return Err("Fire origin out of range");
        }
        if !in_range(&self.direction) {
            return Err("Fire direction out of range");
        }
        if self.direction.iter().all(|c| *c == 0.0) {
            return Err("Fire direction is zero");
        }
        Ok(())
    }
}

/// One replicated write of a player's universe state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct StateUpdate {
    /// Player the state belongs to.
    pub entity: EntityId,
    /// Authority write sequence; later writes carry larger numbers.
    pub seq: u32,
    /// State after the write.
    pub state: UniverseState,
    /// Progress through the swap cycle when this update was sent; 0 when
    /// `Normal`.
    pub progress: f32,
}

impl StateUpdate {
    /// Reject progress outside `[0, 1]` (including NaN).
    pub fn verify(&self) -> Result<(), &'static str> {
        if !(0.0..=1.0).contains(&self.progress) {
            return Err("Swap progress out of range");
        }
        Ok(())
    }
}

/// Messages sent from server to client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum ServerMessage {
    /// Handshake response accepting or rejecting connection.
    HandshakeResponse {
        /// Whether handshake was accepted.
        accepted: bool,
        /// Reason for rejection (if not accepted).
        reason: Option<String>,
        /// Entity the client now controls.
        player_entity_id: Option<EntityId>,
    },

    /// A player became known to this client (join, or already present when
    /// the client joined).
    PlayerSpawned {
        /// Current replicated state.
        update: StateUpdate,
        /// Current health.
        health: u32,
    },

    /// A player left the session.
    PlayerDespawned {
        /// Player that left.
        entity: EntityId,
    },

    /// Replicated universe state write.
    UniverseState(StateUpdate),

    /// A shot was fired; play effects whether or not it hit.
    ShotEffect {
        /// Player that fired.
        shooter: EntityId,
        /// Whether the ray struck anything.
        hit: bool,
        /// Impact point (meaningful only when `hit`).
        point: [f32; 3],
    },

    /// A player lost health.
    Damaged {
        /// Player that was hit.
        entity: EntityId,
        /// Health after the hit.
        health: u32,
        /// Whether this hit killed the player.
        died: bool,
    },

    /// A dead player is back with full health.
    Respawned {
        /// Player that respawned.
        entity: EntityId,
        /// Health after respawn.
        health: u32,
    },

    /// A player's kill count changed.
    ScoreChanged {
        /// Player credited.
        entity: EntityId,
        /// Kills so far.
        kills: u32,
    },

    /// The match ended.
    GameOver {
        /// Player that reached the kill target.
        winner: EntityId,
    },

    /// Server disconnect notification.
    Disconnect {
        /// Reason for disconnect.
        reason: String,
    },
}

impl ServerMessage {
    /// Verify message limits and validity.
    pub fn verify(&self) -> Result<(), &'static str> {
        match self {
            ServerMessage::HandshakeResponse {
                reason: Some(r), ..
            } => {
                if r.len() > MAX_REASON_LEN {
                    return Err("Handshake rejection reason too long");
                }
            }
            ServerMessage::Disconnect { reason } => {
                if reason.len() > MAX_REASON_LEN {
                    return Err("Disconnect reason too long");
                }
            }
            ServerMessage::PlayerSpawned { update, .. } | ServerMessage::UniverseState(update) => {
                update.verify()?
            }
            _ => {}
        }
        Ok(())
    }

    /// Channel this message travels on.
    ///
    /// Universe state writes are replicated state, not events: a newer write
    /// supersedes an older one, so they may be dropped and later resent.
    pub fn channel(&self) -> ChannelType {
        match self {
            ServerMessage::UniverseState(_) => ChannelType::Replication,
            ServerMessage::HandshakeResponse { .. } | ServerMessage::Disconnect { .. } => {
                ChannelType::Control
            }
            _ => ChannelType::Events,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parallel_worlds_core::{TransitionState, Universe};

    #[test]
    fn zero_direction_fails_verification() {
        let msg = ClientMessage::Fire(FireRequest {
            origin: [0.0; 3],
            direction: [0.0; 3],
        });
        assert_eq!(msg.verify(), Err("Fire direction is zero"));
    }

    #[test]
    fn nan_origin_fails_verification() {
        let request = FireRequest {
            origin: [f32::NAN, 0.0, 0.0],
            direction: [1.0, 0.0, 0.0],
        };
        assert!(request.verify().is_err());
    }

    #[test]
    fn long_reason_fails_verification() {
        let msg = ClientMessage::Disconnect {
            reason: "x".repeat(MAX_REASON_LEN + 1),
        };
        assert!(msg.verify().is_err());
    }

    #[test]
    fn state_writes_use_replication_channel() {
        let update = StateUpdate {
            entity: EntityId(1),
            seq: 3,
            state: UniverseState::spawned(Universe::A),
            progress: 0.0,
        };
        assert_eq!(
            ServerMessage::UniverseState(update).channel(),
            ChannelType::Replication
        );
        assert_eq!(
            ServerMessage::PlayerSpawned { update, health: 3 }.channel(),
            ChannelType::Events
        );
        assert!(ChannelType::Events.is_reliable());
        assert!(!ChannelType::Replication.is_reliable());
    }

    #[test]
    fn out_of_range_progress_fails_verification() {
        let mut update = StateUpdate {
            entity: EntityId(1),
            seq: 2,
            state: UniverseState::new(Universe::A, TransitionState::SwapOut),
            progress: 0.4,
        };
        assert!(ServerMessage::UniverseState(update).verify().is_ok());
        update.progress = f32::NAN;
        assert!(ServerMessage::UniverseState(update).verify().is_err());
        update.progress = 1.5;
        assert!(ServerMessage::PlayerSpawned { update, health: 3 }.verify().is_err());
    }
}
