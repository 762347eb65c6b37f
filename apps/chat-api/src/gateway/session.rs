//! Per-connection session controller.
//!
//! A session is `Unsubscribed` when the socket opens and becomes
//! `Subscribed(channel)` on its first successful join. Joining another
//! channel is a single move in the membership index. Dropping the session
//! (or calling [`GatewaySession::disconnect`]) leaves the channel and
//! deregisters the connection.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chat_common::{ChannelId, ConnectionId, Message};
use serde_json::Value;

use super::membership::MembershipIndex;
use super::registry::ConnectionRegistry;

/// Longest channel id accepted on join, in bytes.
pub const MAX_CHANNEL_ID_LEN: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Unsubscribed,
    Subscribed(ChannelId),
}

/// Why a join request was refused. The session keeps its prior state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinError {
    MissingChannelId,
    InvalidChannelId(&'static str),
}

impl JoinError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingChannelId => "MISSING_CHANNEL_ID",
            Self::InvalidChannelId(_) => "INVALID_CHANNEL_ID",
        }
    }
}

impl fmt::Display for JoinError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingChannelId => f.write_str("channel_id is required"),
            Self::InvalidChannelId(reason) => write!(f, "invalid channel_id: {reason}"),
        }
    }
}

impl std::error::Error for JoinError {}

/// Result of a successful join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinOutcome {
    pub channel_id: ChannelId,
    pub previous: Option<ChannelId>,
}

/// Check a join payload's `channel_id` field.
pub fn parse_channel_id(raw: Option<&Value>) -> Result<ChannelId, JoinError> {
    let s = match raw {
        None | Some(Value::Null) => return Err(JoinError::MissingChannelId),
        Some(Value::String(s)) => s,
        Some(_) => return Err(JoinError::InvalidChannelId("must be a string")),
    };

    if s.trim().is_empty() {
        return Err(JoinError::MissingChannelId);
    }
    if s.len() > MAX_CHANNEL_ID_LEN {
        return Err(JoinError::InvalidChannelId("too long"));
    }
    if s.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(JoinError::InvalidChannelId("contains whitespace or control characters"));
    }

    Ok(ChannelId::new(s.as_str()))
}

/// State for a single gateway connection.
pub struct GatewaySession {
    connection_id: ConnectionId,
    state: SessionState,
    /// Monotonically increasing sequence number for dispatch events.
    seq: AtomicU64,
    index: Arc<MembershipIndex>,
    registry: Arc<ConnectionRegistry>,
    closed: bool,
}

impl GatewaySession {
    pub fn new(
        connection_id: ConnectionId,
        index: Arc<MembershipIndex>,
        registry: Arc<ConnectionRegistry>,
    ) -> Self {
        Self {
            connection_id,
            state: SessionState::Unsubscribed,
            seq: AtomicU64::new(0),
            index,
            registry,
            closed: false,
        }
    }

    pub fn connection_id(&self) -> &ConnectionId {
        &self.connection_id
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn current_channel(&self) -> Option<&ChannelId> {
        match &self.state {
            SessionState::Subscribed(channel_id) => Some(channel_id),
            SessionState::Unsubscribed => None,
        }
    }

    /// Get the next sequence number for a dispatch event.
    pub fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Handle a JOIN payload (`{"channel_id": "..."}`).
    pub fn handle_join(&mut self, payload: &Value) -> Result<JoinOutcome, JoinError> {
        let channel_id = parse_channel_id(payload.get("channel_id"))?;
        Ok(self.join(channel_id))
    }

    /// Move this connection to `channel_id`. `previous` is the channel that
    /// was left, if any; rejoining the current channel leaves nothing.
    pub fn join(&mut self, channel_id: ChannelId) -> JoinOutcome {
        let previous = self
            .index
            .subscribe(&self.connection_id, &channel_id)
            .filter(|p| *p != channel_id);
        self.state = SessionState::Subscribed(channel_id.clone());
        JoinOutcome {
            channel_id,
            previous,
        }
    }

    /// Whether a queued message still belongs to the channel being viewed.
    ///
    /// Messages enqueued just before a channel switch are still in the
    /// outbound queue afterwards; they are not shown in the new channel.
    pub fn should_deliver(&self, message: &Message) -> bool {
        self.current_channel() == Some(&message.channel_id)
    }

    /// Leave the current channel and deregister the connection.
    pub fn disconnect(mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.index.unsubscribe(&self.connection_id);
        self.registry.deregister(&self.connection_id);
        self.state = SessionState::Unsubscribed;
    }
}

impl Drop for GatewaySession {
    fn drop(&mut self) {
        self.teardown();
    }
}
