//! Typed connection wrappers over a link endpoint.
//!
//! The server side validates the handshake before any gameplay message is
//! accepted; the client side sends its handshake on connect.

use crate::channel::LinkEndpoint;
use crate::codec::{
    compute_schema_hash, decode_client_message, decode_server_message, encode_client_message,
    encode_server_message,
};
use crate::protocol::{ClientMessage, ServerMessage, PROTOCOL_VERSION};
use anyhow::{Context, Result};
use parallel_worlds_core::EntityId;
use tracing::{debug, info, trace, warn};

/// Client-side connection.
#[derive(Debug)]
pub struct ClientConnection {
    link: LinkEndpoint,
}

impl ClientConnection {
    /// Wrap a link endpoint and send the handshake request.
    pub fn connect(link: LinkEndpoint) -> Result<Self> {
        let mut connection = Self { link };
        info!("Starting handshake with server");
        connection
            .send(&ClientMessage::Handshake {
                version: PROTOCOL_VERSION,
                schema_hash: compute_schema_hash(),
            })
            .context("Failed to send handshake")?;
        Ok(connection)
    }

    /// Wrap a link endpoint without handshaking (for tests of rejection).
    pub fn raw(link: LinkEndpoint) -> Self {
        Self { link }
    }

    /// Send a message on its channel.
    pub fn send(&mut self, msg: &ClientMessage) -> Result<()> {
        let bytes = encode_client_message(msg)?;
        trace!("Sending {:?} ({} bytes)", msg.channel(), bytes.len());
        self.link.send(msg.channel(), bytes)
    }

    /// Next decoded server message, if one is queued.
    ///
    /// Frames that fail to decode or verify are logged and skipped.
    pub fn try_recv(&mut self) -> Option<ServerMessage> {
        while let Some(frame) = self.link.try_recv() {
            match decode_server_message(&frame.bytes) {
                Ok(msg) => match msg.verify() {
                    Ok(()) => return Some(msg),
                    Err(reason) => warn!("Dropping invalid server message: {}", reason),
                },
                Err(e) => warn!("Dropping undecodable server frame: {:#}", e),
            }
        }
        None
    }

    /// Wait for the next decoded server message.
    pub async fn recv(&mut self) -> Result<ServerMessage> {
        loop {
            let frame = self.link.recv().await.context("Server link closed")?;
            match decode_server_message(&frame.bytes) {
                Ok(msg) => {
                    if let Err(reason) = msg.verify() {
                        warn!("Dropping invalid server message: {}", reason);
                        continue;
                    }
                    return Ok(msg);
                }
                Err(e) => warn!("Dropping undecodable server frame: {:#}", e),
            }
        }
    }

    /// Whether the server endpoint is gone.
    pub fn is_closed(&self) -> bool {
        self.link.is_closed()
    }
}

/// Server-side connection to one client.
#[derive(Debug)]
pub struct ServerConnection {
    link: LinkEndpoint,
    schema_hash: u64,
    player: Option<EntityId>,
}

impl ServerConnection {
    /// Wrap a link endpoint awaiting a handshake.
    pub fn new(link: LinkEndpoint) -> Self {
        Self {
            link,
            schema_hash: compute_schema_hash(),
            player: None,
        }
    }

    /// Entity this client controls, once the handshake was accepted.
    pub fn player(&self) -> Option<EntityId> {
        self.player
    }

    /// Whether the handshake completed.
    pub fn is_established(&self) -> bool {
        self.player.is_some()
    }

    /// Validate a handshake request.
    ///
    /// On failure the returned message is the reason sent back to the client.
    pub fn check_handshake(&self, version: u16, schema_hash: u64) -> Result<(), String> {
        debug!(
            "Received handshake: version={}, schema_hash={:016x}",
            version, schema_hash
        );
        if version != PROTOCOL_VERSION {
            warn!(
                "Protocol version mismatch: client={}, server={}",
                version, PROTOCOL_VERSION
            );
            return Err(format!(
                "Protocol version mismatch: server uses v{}",
                PROTOCOL_VERSION
            ));
        }
        if schema_hash != self.schema_hash {
            warn!(
                "Schema hash mismatch: client={:016x}, server={:016x}",
                schema_hash, self.schema_hash
            );
            return Err("Schema mismatch: incompatible client version".to_string());
        }
        Ok(())
    }

    /// Accept the handshake and bind the client to its player entity.
    pub fn accept(&mut self, entity: EntityId) -> Result<()> {
        self.player = Some(entity);
        info!(%entity, "Handshake accepted");
        self.send(&ServerMessage::HandshakeResponse {
            accepted: true,
            reason: None,
            player_entity_id: Some(entity),
        })
    }

    /// Reject the handshake with a reason.
    pub fn reject(&mut self, reason: &str) -> Result<()> {
        self.send(&ServerMessage::HandshakeResponse {
            accepted: false,
            reason: Some(reason.to_string()),
            player_entity_id: None,
        })
    }

    /// Send a message on its channel.
    pub fn send(&mut self, msg: &ServerMessage) -> Result<()> {
        let bytes = encode_server_message(msg)?;
        self.link.send(msg.channel(), bytes)
    }

    /// Next decoded and verified client message, if one is queued.
    pub fn try_recv(&mut self) -> Option<ClientMessage> {
        while let Some(frame) = self.link.try_recv() {
            match decode_client_message(&frame.bytes) {
                Ok(msg) => match msg.verify() {
                    Ok(()) => return Some(msg),
                    Err(reason) => debug!("Dropping invalid client message: {}", reason),
                },
                Err(e) => debug!("Dropping undecodable client frame: {:#}", e),
            }
        }
        None
    }

    /// Whether the client endpoint is gone.
    pub fn is_closed(&self) -> bool {
        self.link.is_closed()
    }

    /// Outgoing traffic counters.
    pub fn stats(&self) -> crate::channel::LinkStats {
        self.link.stats()
    }
}
