#![forbid(unsafe_code)]

//! Registry of live client channels.
//!
//! The orchestrator never owns a client connection. It looks the owner up by
//! id at emission time and silently drops the event when the client is gone.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::debug;

use crate::progress::ServerMessage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn from_raw(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

#[derive(Clone, Default)]
pub struct ChannelRegistry {
    inner: Arc<RegistryInner>,
}

#[derive(Default)]
struct RegistryInner {
    senders: RwLock<HashMap<ConnectionId, UnboundedSender<ServerMessage>>>,
    counter: AtomicU64,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a connection id and the receiving half its writer task drains.
    pub fn register(&self) -> (ConnectionId, UnboundedReceiver<ServerMessage>) {
        let id = ConnectionId(self.inner.counter.fetch_add(1, Ordering::Relaxed) + 1);
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner.senders.write().insert(id, tx);
        (id, rx)
    }

    pub fn unregister(&self, id: ConnectionId) {
        self.inner.senders.write().remove(&id);
    }

    pub fn is_connected(&self, id: ConnectionId) -> bool {
        self.inner
            .senders
            .read()
            .get(&id)
            .is_some_and(|sender| !sender.is_closed())
    }

    /// Delivers `message` if the connection is still around. Returns whether
    /// it was handed to a live channel.
    pub fn send(&self, id: ConnectionId, message: ServerMessage) -> bool {
        let sender = self.inner.senders.read().get(&id).cloned();
        let Some(sender) = sender else {
            debug!(connection = %id, ?message, "no channel for connection, dropping event");
            return false;
        };
        if sender.send(message).is_err() {
            debug!(connection = %id, "channel closed, dropping event");
            return false;
        }
        true
    }
}
