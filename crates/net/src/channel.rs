//! Channel kinds and the in-process link that carries framed messages.
//!
//! A link is a pair of endpoints over tokio unbounded channels. Frames on
//! unreliable channels may be dropped with a configured probability so
//! replication can be exercised under loss.

use anyhow::{Context, Result};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver, UnboundedSender};
use tracing::trace;

/// Channel type identifier for message routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ChannelType {
    /// Handshake and disconnect (reliable, ordered).
    Control = 0,
    /// Replicated state writes (unreliable, ordered).
    Replication = 1,
    /// Requests and gameplay notifications (reliable, ordered).
    Events = 2,
}

impl ChannelType {
    /// Check if this channel type should use reliable delivery.
    pub fn is_reliable(&self) -> bool {
        matches!(self, ChannelType::Control | ChannelType::Events)
    }

    /// Check if this channel type should use unreliable delivery.
    pub fn is_unreliable(&self) -> bool {
        !self.is_reliable()
    }
}

impl TryFrom<u8> for ChannelType {
    type Error = anyhow::Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(ChannelType::Control),
            1 => Ok(ChannelType::Replication),
            2 => Ok(ChannelType::Events),
            _ => Err(anyhow::anyhow!("Invalid channel type: {}", value)),
        }
    }
}

/// One framed message in flight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Channel the frame was sent on.
    pub channel: ChannelType,
    /// Encoded message.
    pub bytes: Vec<u8>,
}

/// Loss settings for one link.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinkConfig {
    /// Probability in `[0, 1)` that an unreliable frame is dropped.
    pub drop_rate: f32,
    /// Seed for the loss RNG.
    pub seed: u64,
}

impl LinkConfig {
    /// Link that never drops.
    pub const LOSSLESS: Self = Self {
        drop_rate: 0.0,
        seed: 0,
    };
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self::LOSSLESS
    }
}

/// Counters for one endpoint's outgoing traffic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkStats {
    /// Frames handed to the peer.
    pub frames_sent: u64,
    /// Unreliable frames discarded by simulated loss.
    pub frames_dropped: u64,
    /// Bytes handed to the peer.
    pub bytes_sent: u64,
}

/// One side of a bidirectional link.
#[derive(Debug)]
pub struct LinkEndpoint {
    tx: UnboundedSender<Frame>,
    rx: UnboundedReceiver<Frame>,
    rng: StdRng,
    drop_rate: f32,
    stats: LinkStats,
}

/// Create a connected pair of endpoints.
///
/// Both directions share the loss settings; each side gets its own RNG
/// stream so the two directions are independent.
pub fn link_pair(config: LinkConfig) -> (LinkEndpoint, LinkEndpoint) {
    let (a_tx, b_rx) = mpsc::unbounded_channel();
    let (b_tx, a_rx) = mpsc::unbounded_channel();
    let a = LinkEndpoint::new(a_tx, a_rx, config, config.seed);
    let b = LinkEndpoint::new(b_tx, b_rx, config, config.seed.wrapping_add(1));
    (a, b)
}

impl LinkEndpoint {
    fn new(
        tx: UnboundedSender<Frame>,
        rx: UnboundedReceiver<Frame>,
        config: LinkConfig,
        seed: u64,
    ) -> Self {
        Self {
            tx,
            rx,
            rng: StdRng::seed_from_u64(seed),
            drop_rate: config.drop_rate.clamp(0.0, 1.0),
            stats: LinkStats::default(),
        }
    }

    /// Send a frame. Unreliable frames may be silently dropped.
    ///
    /// Fails only when the peer endpoint has been dropped.
    pub fn send(&mut self, channel: ChannelType, bytes: Vec<u8>) -> Result<()> {
        if channel.is_unreliable()
            && self.drop_rate > 0.0
            && self.rng.gen::<f32>() < self.drop_rate
        {
            trace!("Dropped {} bytes on {:?}", bytes.len(), channel);
            self.stats.frames_dropped += 1;
            return Ok(());
        }

        let len = bytes.len() as u64;
        self.tx
            .send(Frame { channel, bytes })
            .ok()
            .context("Peer endpoint closed")?;
        self.stats.frames_sent += 1;
        self.stats.bytes_sent += len;
        Ok(())
    }

    /// Take the next queued frame without waiting.
    ///
    /// Returns `None` when nothing is queued or the peer is gone.
    pub fn try_recv(&mut self) -> Option<Frame> {
        match self.rx.try_recv() {
            Ok(frame) => Some(frame),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Wait for the next frame. Returns `None` once the peer is gone and the
    /// queue is drained.
    pub async fn recv(&mut self) -> Option<Frame> {
        self.rx.recv().await
    }

    /// Whether the peer endpoint has been dropped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Outgoing traffic counters.
    pub fn stats(&self) -> LinkStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_type_roundtrips_through_u8() {
        for channel in [
            ChannelType::Control,
            ChannelType::Replication,
            ChannelType::Events,
        ] {
            assert_eq!(ChannelType::try_from(channel as u8).unwrap(), channel);
        }
        assert!(ChannelType::try_from(3).is_err());
    }

    #[tokio::test]
    async fn lossless_link_delivers_in_order() {
        let (mut a, mut b) = link_pair(LinkConfig::LOSSLESS);
        a.send(ChannelType::Events, vec![1]).unwrap();
        a.send(ChannelType::Replication, vec![2]).unwrap();
        a.send(ChannelType::Control, vec![3]).unwrap();

        let mut received = Vec::new();
        for _ in 0..3 {
            received.push(b.recv().await.unwrap().bytes[0]);
        }
        assert_eq!(received, vec![1, 2, 3]);
        assert!(b.try_recv().is_none());
        assert_eq!(a.stats().frames_sent, 3);
    }

    #[tokio::test]
    async fn lossy_link_only_drops_unreliable_frames() {
        let (mut a, mut b) = link_pair(LinkConfig {
            drop_rate: 0.5,
            seed: 7,
        });
        for i in 0..200u8 {
            a.send(ChannelType::Replication, vec![i]).unwrap();
            a.send(ChannelType::Events, vec![i]).unwrap();
        }

        let mut events = 0;
        let mut replication = 0;
        while let Some(frame) = b.try_recv() {
            match frame.channel {
                ChannelType::Events => events += 1,
                ChannelType::Replication => replication += 1,
                ChannelType::Control => {}
            }
        }
        assert_eq!(events, 200);
        assert!(replication > 0 && replication < 200);
        assert_eq!(a.stats().frames_dropped, 200 - replication);
    }

    #[tokio::test]
    async fn send_fails_after_peer_drops() {
        let (mut a, b) = link_pair(LinkConfig::LOSSLESS);
        drop(b);
        assert!(a.is_closed());
        assert!(a.send(ChannelType::Events, vec![0]).is_err());
    }
}
