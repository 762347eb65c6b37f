pub mod id;
pub mod message;
pub mod snowflake;

pub use id::{ChannelId, ConnectionId, PrefixedId};
pub use message::Message;
pub use snowflake::SnowflakeGenerator;
