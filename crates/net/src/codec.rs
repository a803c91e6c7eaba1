//! Message encoding and decoding with framing.
//!
//! Frame format: `[length: u32][message_type: u8][payload][crc32: u32]`, where
//! `length` counts everything after itself and the checksum covers the type
//! tag and payload.

use crate::protocol::{ClientMessage, ServerMessage, PROTOCOL_MAGIC, PROTOCOL_VERSION};
use anyhow::{Context, Result};
use blake3::Hash;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Bytes before the payload: length prefix plus type tag.
const HEADER_LEN: usize = 5;

/// Bytes after the payload.
const TRAILER_LEN: usize = 4;

/// Compute schema hash from protocol definitions.
///
/// This hash is used to ensure client and server have compatible protocol versions.
pub fn compute_schema_hash() -> u64 {
    let mut hasher = blake3::Hasher::new();

    hasher.update(&PROTOCOL_VERSION.to_le_bytes());
    hasher.update(PROTOCOL_MAGIC);

    // Include message type names (deterministic)
    hasher.update(b"ClientMessage");
    hasher.update(b"ServerMessage");
    hasher.update(b"FireRequest");
    hasher.update(b"StateUpdate");
    hasher.update(b"UniverseState");

    let hash: Hash = hasher.finalize();
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&hash.as_bytes()[0..8]);
    u64::from_le_bytes(prefix)
}

/// Encode a client message with length prefix and checksum.
pub fn encode_client_message(msg: &ClientMessage) -> Result<Vec<u8>> {
    let payload = postcard::to_allocvec(msg).context("Failed to serialize client message")?;
    Ok(frame(client_message_type_tag(msg), &payload))
}

/// Encode a server message with length prefix and checksum.
pub fn encode_server_message(msg: &ServerMessage) -> Result<Vec<u8>> {
    let payload = postcard::to_allocvec(msg).context("Failed to serialize server message")?;
    Ok(frame(server_message_type_tag(msg), &payload))
}

/// Decode a client message from frame data.
pub fn decode_client_message(data: &[u8]) -> Result<ClientMessage> {
    decode(data).context("Failed to decode client message")
}

/// Decode a server message from frame data.
pub fn decode_server_message(data: &[u8]) -> Result<ServerMessage> {
    decode(data).context("Failed to decode server message")
}

fn frame(tag: u8, payload: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(HEADER_LEN + payload.len() + TRAILER_LEN);

    // Length (excluding length field itself)
    let length = (1 + payload.len() + TRAILER_LEN) as u32;
    frame.extend_from_slice(&length.to_le_bytes());
    frame.push(tag);
    frame.extend_from_slice(payload);

    let crc = crc32fast::hash(&frame[4..]);
    frame.extend_from_slice(&crc.to_le_bytes());
    frame
}

fn decode<T: Serialize + DeserializeOwned>(data: &[u8]) -> Result<T> {
    if data.len() < HEADER_LEN + TRAILER_LEN {
        anyhow::bail!(
            "Frame too short: {} bytes (minimum {})",
            data.len(),
            HEADER_LEN + TRAILER_LEN
        );
    }

    let length = u32::from_le_bytes([data[0], data[1], data[2], data[3]]) as usize;
    if length < 1 + TRAILER_LEN {
        anyhow::bail!("Frame length {} too small", length);
    }
    let end = 4usize
        .checked_add(length)
        .filter(|end| *end <= data.len())
        .ok_or_else(|| {
            anyhow::anyhow!(
                "Incomplete frame: expected {} bytes, got {}",
                4 + length,
                data.len()
            )
        })?;

    let body = &data[4..end - TRAILER_LEN];
    let mut crc_bytes = [0u8; 4];
    crc_bytes.copy_from_slice(&data[end - TRAILER_LEN..end]);
    let expected = u32::from_le_bytes(crc_bytes);
    let actual = crc32fast::hash(body);
    if expected != actual {
        anyhow::bail!(
            "Checksum mismatch: expected {:08x}, got {:08x}",
            expected,
            actual
        );
    }

    // Skip message type tag (body[0])
    let payload = &body[1..];
    let msg = postcard::from_bytes(payload).context("Failed to deserialize payload")?;
    Ok(msg)
}

/// Get message type tag for client messages.
fn client_message_type_tag(msg: &ClientMessage) -> u8 {
    match msg {
        ClientMessage::Handshake { .. } => 0,
        ClientMessage::RequestSwap => 1,
        ClientMessage::Fire(_) => 2,
        ClientMessage::Disconnect { .. } => 3,
    }
}

/// Get message type tag for server messages.
fn server_message_type_tag(msg: &ServerMessage) -> u8 {
    match msg {
        ServerMessage::HandshakeResponse { .. } => 0,
        ServerMessage::PlayerSpawned { .. } => 1,
        ServerMessage::PlayerDespawned { .. } => 2,
        ServerMessage::UniverseState(_) => 3,
        ServerMessage::ShotEffect { .. } => 4,
        ServerMessage::Damaged { .. } => 5,
        ServerMessage::Respawned { .. } => 6,
        ServerMessage::ScoreChanged { .. } => 7,
        ServerMessage::GameOver { .. } => 8,
        ServerMessage::Disconnect { .. } => 9,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{FireRequest, StateUpdate};
    use parallel_worlds_core::{EntityId, TransitionState, Universe, UniverseState};

    #[test]
    fn test_schema_hash_deterministic() {
        assert_eq!(compute_schema_hash(), compute_schema_hash());
        assert_ne!(compute_schema_hash(), 0);
    }

    #[test]
    fn test_encode_decode_fire() {
        let msg = ClientMessage::Fire(FireRequest {
            origin: [1.0, 2.0, 3.0],
            direction: [0.0, 0.0, 1.0],
        });

        let encoded = encode_client_message(&msg).expect("Failed to encode");
        let decoded = decode_client_message(&encoded).expect("Failed to decode");

        assert_eq!(msg, decoded);
    }

    #[test]
    fn test_encode_decode_state_update() {
        let msg = ServerMessage::UniverseState(StateUpdate {
            entity: EntityId(9),
            seq: 4,
            state: UniverseState::new(Universe::B, TransitionState::SwapIn),
            progress: 0.9,
        });

        let encoded = encode_server_message(&msg).expect("Failed to encode");
        let decoded = decode_server_message(&encoded).expect("Failed to decode");

        assert_eq!(msg, decoded);
    }

    #[test]
    fn test_corrupted_payload_rejected() {
        let msg = ServerMessage::GameOver {
            winner: EntityId(3),
        };
        let mut encoded = encode_server_message(&msg).expect("Failed to encode");
        encoded[HEADER_LEN] ^= 0xFF;
        assert!(decode_server_message(&encoded).is_err());
    }

    #[test]
    fn test_decode_incomplete_frame() {
        let data = vec![10, 0, 0, 0, 1, 0, 0, 0, 0]; // Length says 10 bytes, only 5 follow
        assert!(decode_client_message(&data).is_err());
    }

    #[test]
    fn test_decode_too_short() {
        let data = vec![1, 2, 3];
        assert!(decode_client_message(&data).is_err());
    }
}
