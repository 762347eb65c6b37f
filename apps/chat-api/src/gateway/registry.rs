//! Registry of live gateway connections and their outbound queues.

use std::sync::Arc;
use std::time::Instant;

use chat_common::{ChannelId, ConnectionId, Message};
use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use super::membership::MembershipIndex;

/// Receiving half of a connection's outbound queue, drained by its socket task.
pub type Outbound = mpsc::Receiver<Arc<Message>>;

/// Result of handing one message to one connection's queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Queued,
    /// The queue is at capacity; the consumer is too slow.
    Full,
    /// The receiving side is gone.
    Closed,
    /// No such connection is registered.
    Unknown,
}

struct ConnectionEntry {
    outbound: mpsc::Sender<Arc<Message>>,
    connected_at: Instant,
}

/// Shared registry of all live connections.
///
/// Uses `DashMap` for shard-level concurrency. The channel a connection is
/// subscribed to is owned by the [`MembershipIndex`]; the registry only asks.
pub struct ConnectionRegistry {
    connections: DashMap<ConnectionId, ConnectionEntry>,
    index: Arc<MembershipIndex>,
    queue_capacity: usize,
}

impl ConnectionRegistry {
    pub fn new(index: Arc<MembershipIndex>, queue_capacity: usize) -> Self {
        Self {
            connections: DashMap::new(),
            index,
            queue_capacity: queue_capacity.max(1),
        }
    }

    /// Track a new, unsubscribed connection.
    pub fn register(&self) -> (ConnectionId, Outbound) {
        let id = ConnectionId::generate();
        let (tx, rx) = mpsc::channel(self.queue_capacity);
        self.connections.insert(
            id.clone(),
            ConnectionEntry {
                outbound: tx,
                connected_at: Instant::now(),
            },
        );
        (id, rx)
    }

    /// Forget a connection and drop its channel membership.
    ///
    /// Unknown ids are a no-op. Returns whether the connection was tracked.
    pub fn deregister(&self, connection_id: &ConnectionId) -> bool {
        self.index.unsubscribe(connection_id);
        match self.connections.remove(connection_id) {
            Some((_, entry)) => {
                tracing::debug!(
                    connection_id = %connection_id,
                    connected_for_ms = entry.connected_at.elapsed().as_millis() as u64,
                    "connection deregistered"
                );
                true
            }
            None => false,
        }
    }

    pub fn current_channel(&self, connection_id: &ConnectionId) -> Option<ChannelId> {
        if !self.connections.contains_key(connection_id) {
            return None;
        }
        self.index.channel_of(connection_id)
    }

    pub fn contains(&self, connection_id: &ConnectionId) -> bool {
        self.connections.contains_key(connection_id)
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Enqueue a message without waiting.
    pub fn try_deliver(&self, connection_id: &ConnectionId, message: Arc<Message>) -> Delivery {
        let Some(entry) = self.connections.get(connection_id) else {
            return Delivery::Unknown;
        };
        match entry.outbound.try_send(message) {
            Ok(()) => Delivery::Queued,
            Err(TrySendError::Full(_)) => Delivery::Full,
            Err(TrySendError::Closed(_)) => Delivery::Closed,
        }
    }
}
