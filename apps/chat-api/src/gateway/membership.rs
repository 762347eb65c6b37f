//! Channel membership index: which connections are currently viewing which
//! channel.
//!
//! A connection is a member of at most one channel. Both directions of the
//! relationship live behind one `parking_lot::Mutex`, so a channel switch is
//! a single step for every observer, and a fan-out that runs under the same
//! lock sees either the old or the new membership, never a mix.

use std::collections::{HashMap, HashSet};

use chat_common::{ChannelId, ConnectionId};
use parking_lot::Mutex;

#[derive(Default)]
struct IndexState {
    /// channel → members. Channels with no members have no entry.
    channels: HashMap<ChannelId, HashSet<ConnectionId>>,
    /// connection → the one channel it is subscribed to.
    subscriptions: HashMap<ConnectionId, ChannelId>,
}

impl IndexState {
    /// Remove a connection from its channel, reclaiming the set if it empties.
    fn detach(&mut self, connection_id: &ConnectionId) -> Option<ChannelId> {
        let previous = self.subscriptions.remove(connection_id)?;
        if let Some(members) = self.channels.get_mut(&previous) {
            members.remove(connection_id);
            if members.is_empty() {
                self.channels.remove(&previous);
            }
        }
        Some(previous)
    }
}

/// Shared index of channel memberships.
pub struct MembershipIndex {
    inner: Mutex<IndexState>,
}

impl MembershipIndex {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(IndexState::default()),
        }
    }

    /// Move a connection into `channel_id`, leaving whatever channel it was in.
    ///
    /// Returns the channel the connection was previously subscribed to.
    /// Subscribing to the current channel again changes nothing.
    pub fn subscribe(&self, connection_id: &ConnectionId, channel_id: &ChannelId) -> Option<ChannelId> {
        let mut state = self.inner.lock();

        if state.subscriptions.get(connection_id) == Some(channel_id) {
            return Some(channel_id.clone());
        }

        let previous = state.detach(connection_id);
        state
            .channels
            .entry(channel_id.clone())
            .or_default()
            .insert(connection_id.clone());
        state
            .subscriptions
            .insert(connection_id.clone(), channel_id.clone());

        previous
    }

    /// Remove a connection from its channel, if any. Idempotent.
    pub fn unsubscribe(&self, connection_id: &ConnectionId) -> Option<ChannelId> {
        self.inner.lock().detach(connection_id)
    }

    /// The channel a connection is subscribed to.
    pub fn channel_of(&self, connection_id: &ConnectionId) -> Option<ChannelId> {
        self.inner.lock().subscriptions.get(connection_id).cloned()
    }

    /// Point-in-time copy of a channel's members. Empty for unknown channels.
    pub fn members_of(&self, channel_id: &ChannelId) -> HashSet<ConnectionId> {
        self.inner
            .lock()
            .channels
            .get(channel_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Run `f` over a channel's members while holding the index lock.
    ///
    /// No subscribe or unsubscribe can interleave with `f`, and calls for the
    /// same channel run one after another. `f` must not block or call back
    /// into the index.
    pub fn with_members<R>(&self, channel_id: &ChannelId, f: impl FnOnce(&HashSet<ConnectionId>) -> R) -> R {
        let state = self.inner.lock();
        match state.channels.get(channel_id) {
            Some(members) => f(members),
            None => f(&HashSet::new()),
        }
    }

    /// Number of channels with at least one member.
    pub fn channel_count(&self) -> usize {
        self.inner.lock().channels.len()
    }
}

impl Default for MembershipIndex {
    fn default() -> Self {
        Self::new()
    }
}
