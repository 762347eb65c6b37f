use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chat_common::id::{prefix, prefixed_ulid};
use chat_common::{ChannelId, Message, SnowflakeGenerator};
use chrono::Utc;
use parking_lot::Mutex;

use crate::models::channel::Channel;
use crate::models::server::Server;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    ServerNotFound,
    ChannelNotFound,
    /// The backing store could not serve the request.
    Unavailable(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ServerNotFound => f.write_str("Server not found"),
            Self::ChannelNotFound => f.write_str("Channel not found"),
            Self::Unavailable(reason) => write!(f, "store unavailable: {reason}"),
        }
    }
}

impl std::error::Error for StoreError {}

/// Servers, channels and messages as the HTTP routes see them.
///
/// An in-memory map backs it for now; a database-backed implementation only
/// has to honour the same ordering rules.
#[async_trait]
pub trait ChatStore: Send + Sync {
    async fn list_servers(&self) -> Result<Vec<Server>, StoreError>;
    /// Channels of a server, ordered by name descending.
    async fn list_channels(&self, server_id: &str) -> Result<Vec<Channel>, StoreError>;
    /// Messages of a channel in posting order.
    async fn list_messages(&self, channel_id: &ChannelId) -> Result<Vec<Message>, StoreError>;
    async fn create_message(
        &self,
        channel_id: &ChannelId,
        content: &str,
        author_name: &str,
    ) -> Result<Message, StoreError>;
}

// ---------------------------------------------------------------------------
// In-memory implementation
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Tables {
    servers: Vec<Server>,
    channels: Vec<Channel>,
    messages: HashMap<ChannelId, Vec<Message>>,
}

pub struct MemoryStore {
    data: Mutex<Tables>,
    snowflake: Arc<SnowflakeGenerator>,
}

impl MemoryStore {
    pub fn new(snowflake: Arc<SnowflakeGenerator>) -> Self {
        Self {
            data: Mutex::new(Tables::default()),
            snowflake,
        }
    }

    /// One server, "Home", with `general` and `random` channels.
    pub fn with_demo_data(snowflake: Arc<SnowflakeGenerator>) -> Self {
        let store = Self::new(snowflake);
        let home = store.add_server("Home");
        for name in ["general", "random"] {
            // The server was just created, so this cannot miss.
            let _ = store.add_channel(&home.id, name);
        }
        store
    }

    pub fn add_server(&self, name: &str) -> Server {
        let server = Server {
            id: prefixed_ulid(prefix::SERVER),
            name: name.to_string(),
        };
        self.data.lock().servers.push(server.clone());
        server
    }

    pub fn add_channel(&self, server_id: &str, name: &str) -> Result<Channel, StoreError> {
        let mut data = self.data.lock();
        if !data.servers.iter().any(|s| s.id == server_id) {
            return Err(StoreError::ServerNotFound);
        }
        let channel = Channel {
            id: ChannelId::generate(),
            server_id: server_id.to_string(),
            name: name.to_string(),
        };
        data.channels.push(channel.clone());
        Ok(channel)
    }
}

#[async_trait]
impl ChatStore for MemoryStore {
    async fn list_servers(&self) -> Result<Vec<Server>, StoreError> {
        Ok(self.data.lock().servers.clone())
    }

    async fn list_channels(&self, server_id: &str) -> Result<Vec<Channel>, StoreError> {
        let data = self.data.lock();
        if !data.servers.iter().any(|s| s.id == server_id) {
            return Err(StoreError::ServerNotFound);
        }
        let mut channels: Vec<Channel> = data
            .channels
            .iter()
            .filter(|c| c.server_id == server_id)
            .cloned()
            .collect();
        channels.sort_by(|a, b| b.name.cmp(&a.name));
        Ok(channels)
    }

    async fn list_messages(&self, channel_id: &ChannelId) -> Result<Vec<Message>, StoreError> {
        let data = self.data.lock();
        if !data.channels.iter().any(|c| c.id == *channel_id) {
            return Err(StoreError::ChannelNotFound);
        }
        Ok(data.messages.get(channel_id).cloned().unwrap_or_default())
    }

    async fn create_message(
        &self,
        channel_id: &ChannelId,
        content: &str,
        author_name: &str,
    ) -> Result<Message, StoreError> {
        let mut data = self.data.lock();
        if !data.channels.iter().any(|c| c.id == *channel_id) {
            return Err(StoreError::ChannelNotFound);
        }
        let message = Message {
            id: self.snowflake.generate(),
            channel_id: channel_id.clone(),
            author_name: author_name.to_string(),
            content: content.to_string(),
            posted_date: Utc::now(),
        };
        data.messages
            .entry(channel_id.clone())
            .or_default()
            .push(message.clone());
        Ok(message)
    }
}
