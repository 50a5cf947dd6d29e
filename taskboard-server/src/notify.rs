//! Live update fan-out.
//!
//! Services report committed changes through the [`Notifier`] trait. The
//! production notifier is [`BroadcastHub`], a registry of connected
//! WebSocket observers: every notification is encoded once and offered to
//! each observer's outbound slot. The slot holds at most one pending frame;
//! a hint arriving while one is already pending is coalesced into it.
//! Delivery is best-effort; there is no acknowledgment and no replay for
//! observers that connect later.

use std::collections::HashMap;

use axum::extract::ws::Message;
use parking_lot::RwLock;
use taskboard_proto::event::{self, ServerEvent};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use uuid::Uuid;

/// Frames an observer may have pending before further hints are coalesced.
const OUTBOUND_CAPACITY: usize = 1;

/// Post-commit hook invoked after a successful task mutation.
///
/// Implementations must not block; the caller is inside a request handler.
pub trait Notifier: Send + Sync {
    /// Publishes `event` to every current observer.
    fn notify(&self, event: &ServerEvent);
}

/// Registry key of a connected observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(Uuid);

impl SubscriberId {
    /// Creates a new time-ordered subscriber identifier (UUID v7).
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Process-wide registry of connected observers.
#[derive(Debug, Default)]
pub struct BroadcastHub {
    subscribers: RwLock<HashMap<SubscriberId, mpsc::Sender<Message>>>,
}

impl BroadcastHub {
    /// Creates a hub with no observers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new observer and returns its id and outbound frame slot.
    ///
    /// The receiver yields `None` once the hub drops the observer (see
    /// [`BroadcastHub::close_all`]).
    pub fn subscribe(&self) -> (SubscriberId, mpsc::Receiver<Message>) {
        let (tx, rx) = mpsc::channel(OUTBOUND_CAPACITY);
        let id = SubscriberId::new();
        self.subscribers.write().insert(id, tx);
        tracing::debug!(subscriber = %id, "observer subscribed");
        (id, rx)
    }

    /// Removes an observer. Returns `true` if it was registered.
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        let removed = self.subscribers.write().remove(&id).is_some();
        if removed {
            tracing::debug!(subscriber = %id, "observer unsubscribed");
        }
        removed
    }

    /// Number of currently registered observers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }

    /// Drops every observer and returns how many there were.
    ///
    /// Each connection's writer sees its slot close, sends a Close frame, and
    /// the client side sees the disconnect. Used on graceful shutdown.
    pub fn close_all(&self) -> usize {
        let dropped: Vec<SubscriberId> = self
            .subscribers
            .write()
            .drain()
            .map(|(id, _)| id)
            .collect();
        for id in &dropped {
            tracing::debug!(subscriber = %id, "closing observer");
        }
        dropped.len()
    }

    /// Sends `frame` to every observer, pruning the ones whose connection has
    /// gone away. Returns the number of observers reached.
    fn fan_out(&self, frame: &Message) -> usize {
        let dead: Vec<SubscriberId> = {
            let subscribers = self.subscribers.read();
            subscribers
                .iter()
                .filter(|(_, sender)| {
                    // A full slot already holds a pending hint for this observer.
                    matches!(
                        sender.try_send(frame.clone()),
                        Err(TrySendError::Closed(_))
                    )
                })
                .map(|(id, _)| *id)
                .collect()
        };

        if !dead.is_empty() {
            let mut subscribers = self.subscribers.write();
            for id in &dead {
                subscribers.remove(id);
            }
            tracing::debug!(pruned = dead.len(), "pruned disconnected observers");
        }

        self.subscriber_count()
    }
}

impl Notifier for BroadcastHub {
    fn notify(&self, event: &ServerEvent) {
        let text = match event::encode(event) {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(error = %e, "failed to encode broadcast event");
                return;
            }
        };
        let reached = self.fan_out(&Message::Text(text.into()));
        tracing::debug!(event = ?event, observers = reached, "broadcast sent");
    }
}
