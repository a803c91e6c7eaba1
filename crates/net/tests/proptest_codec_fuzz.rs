//! Fuzz-style property tests for network codec
//!
//! These tests validate that message decoders handle arbitrary
//! network input gracefully without crashing.

use parallel_worlds_core::{EntityId, TransitionState, Universe, UniverseState};
use parallel_worlds_net::{
    decode_client_message, decode_server_message, encode_client_message, encode_server_message,
    ClientMessage, ServerMessage, StateUpdate, PROTOCOL_VERSION,
};
use proptest::prelude::*;

fn universe_state() -> impl Strategy<Value = UniverseState> {
    (
        prop_oneof![
            Just(Universe::Undefined),
            Just(Universe::A),
            Just(Universe::B)
        ],
        prop_oneof![
            Just(TransitionState::Normal),
            Just(TransitionState::SwapOut),
            Just(TransitionState::SwapIn)
        ],
    )
        .prop_map(|(universe, transition)| UniverseState::new(universe, transition))
}

proptest! {
    /// Property: Arbitrary bytes don't crash client decoder
    #[test]
    fn arbitrary_bytes_dont_crash_client(
        random_bytes in prop::collection::vec(any::<u8>(), 0..2000),
    ) {
        let _result = decode_client_message(&random_bytes);
        // No panic = success
    }

    /// Property: Arbitrary bytes don't crash server decoder
    #[test]
    fn arbitrary_bytes_dont_crash_server(
        random_bytes in prop::collection::vec(any::<u8>(), 0..2000),
    ) {
        let _result = decode_server_message(&random_bytes);
        // No panic = success
    }

    /// Property: State writes survive the wire unchanged
    #[test]
    fn state_update_survives_wire(
        entity in any::<u64>(),
        seq in any::<u32>(),
        state in universe_state(),
        progress in 0.0f32..=1.0,
    ) {
        let msg = ServerMessage::UniverseState(StateUpdate {
            entity: EntityId(entity),
            seq,
            state,
            progress,
        });

        let encoded = encode_server_message(&msg).unwrap();
        let decoded = decode_server_message(&encoded).unwrap();

        prop_assert_eq!(msg, decoded);
    }

    /// Property: Truncated frames are rejected
    #[test]
    fn truncated_frames_rejected(
        truncate_at in 0usize..50,
    ) {
        let msg = ClientMessage::Handshake {
            version: PROTOCOL_VERSION,
            schema_hash: 0x12345678,
        };

        let mut encoded = encode_client_message(&msg).unwrap();

        if truncate_at < encoded.len() {
            encoded.truncate(truncate_at);
            prop_assert!(decode_client_message(&encoded).is_err());
        }
    }

    /// Property: Oversized length prefix handled
    #[test]
    fn oversized_length_handled(
        claimed_length in 100u32..u32::MAX,
    ) {
        let mut frame = Vec::new();
        frame.extend_from_slice(&claimed_length.to_le_bytes());
        frame.push(0);
        frame.extend_from_slice(&[0, 1, 2, 3, 4]);

        prop_assert!(decode_client_message(&frame).is_err());
    }

    /// Property: Single bit flips never panic and never decode into a
    /// different server message
    #[test]
    fn corrupted_payload_handled(
        flip_pos in 0usize..30,
        flip_bit in 0u8..8,
    ) {
        let msg = ServerMessage::Damaged {
            entity: EntityId(0xDEADBEEF),
            health: 2,
            died: false,
        };

        let mut encoded = encode_server_message(&msg).unwrap();

        if flip_pos + 4 < encoded.len() {
            encoded[flip_pos + 4] ^= 1 << flip_bit;
            if let Ok(decoded) = decode_server_message(&encoded) {
                prop_assert_eq!(decoded, msg);
            }
        }
    }
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn empty_frame_fails() {
        assert!(decode_client_message(&[]).is_err());
        assert!(decode_server_message(&[]).is_err());
    }

    #[test]
    fn too_short_fails() {
        assert!(decode_client_message(&[1, 2, 3]).is_err());
    }

    #[test]
    fn valid_roundtrip() {
        let msg = ClientMessage::Handshake {
            version: 1,
            schema_hash: 0x123,
        };

        let encoded = encode_client_message(&msg).unwrap();
        let decoded = decode_client_message(&encoded).unwrap();

        assert_eq!(msg, decoded);
    }
}
