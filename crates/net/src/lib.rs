#![warn(missing_docs)]
//! Networking abstractions shared by the client/server.
//!
//! Replicated values, the wire protocol and its framed codec, per-client
//! replication tracking, and an in-process link with channel kinds.

mod channel;
mod codec;
mod connection;
mod entity_replication;
mod protocol;
mod replay;
mod replicated;

pub use channel::{link_pair, ChannelType, Frame, LinkConfig, LinkEndpoint, LinkStats};
pub use codec::{
    compute_schema_hash, decode_client_message, decode_server_message, encode_client_message,
    encode_server_message,
};
pub use connection::{ClientConnection, ServerConnection};
pub use entity_replication::{ReplicatedPlayer, ReplicationTracker};
pub use protocol::{
    ClientMessage, FireRequest, ServerMessage, StateUpdate, MAX_COORDINATE, MAX_REASON_LEN,
    PROTOCOL_MAGIC, PROTOCOL_VERSION,
};
pub use replay::{load_events, EventLogger, SessionEvent};
pub use replicated::{Change, Replica, ReplicatedValue};
