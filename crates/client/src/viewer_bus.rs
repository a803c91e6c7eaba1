//! Local-viewer change notifications.
//!
//! Layer resolution depends on the locally controlled player's state, so
//! when that state changes every other replica must re-resolve. Each replica
//! holds its own subscription; dropping the replica drops the subscription.

use parallel_worlds_core::{EntityId, UniverseState};
use tokio::sync::broadcast::{self, error::TryRecvError, Receiver, Sender};
use tracing::trace;

/// Capacity of the notification ring. A subscriber that falls further behind
/// sees a lag marker, which still means "re-resolve".
const BUS_CAPACITY: usize = 16;

/// The local viewer's new state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewerChanged {
    /// Locally controlled player.
    pub viewer: EntityId,
    /// Its state after the change.
    pub state: UniverseState,
}

/// Session-scoped publisher of local-viewer changes.
#[derive(Debug, Clone)]
pub struct ViewerBus {
    sender: Sender<ViewerChanged>,
}

impl Default for ViewerBus {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewerBus {
    /// Bus with no subscribers.
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(BUS_CAPACITY);
        Self { sender }
    }

    /// Subscribe on behalf of `entity`.
    pub fn subscribe(&self, entity: EntityId) -> ViewerSubscription {
        ViewerSubscription {
            entity,
            receiver: self.sender.subscribe(),
        }
    }

    /// Notify every subscriber. Returns how many were reached.
    pub fn publish(&self, change: ViewerChanged) -> usize {
        self.sender.send(change).unwrap_or(0)
    }

    /// Live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// One replica's subscription.
#[derive(Debug)]
pub struct ViewerSubscription {
    entity: EntityId,
    receiver: Receiver<ViewerChanged>,
}

impl ViewerSubscription {
    /// Drain pending notifications. Returns the latest viewer state, or
    /// `Some(None)` when notifications were lost and the caller should
    /// re-read the viewer itself; `None` when nothing arrived.
    pub fn drain(&mut self) -> Option<Option<UniverseState>> {
        let mut latest = None;
        loop {
            match self.receiver.try_recv() {
                Ok(change) => latest = Some(Some(change.state)),
                Err(TryRecvError::Lagged(skipped)) => {
                    trace!(entity = %self.entity, skipped, "viewer notifications lagged");
                    latest = Some(None);
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return latest,
            }
        }
    }
}
