//! The message record produced by the write path and fanned out to clients.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::ChannelId;

/// An immutable chat message. Serialized with camelCase keys, the shape
/// clients already render: `{id, channelId, authorName, content, postedDate}`.
///
/// The snowflake `id` goes over the wire as a string so JavaScript clients
/// keep all 64 bits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    #[serde(with = "i64_as_string")]
    pub id: i64,
    pub channel_id: ChannelId,
    pub author_name: String,
    pub content: String,
    pub posted_date: DateTime<Utc>,
}

mod i64_as_string {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(val: &i64, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&val.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Str(String),
            Num(i64),
        }

        match Raw::deserialize(d)? {
            Raw::Str(s) => s.parse().map_err(de::Error::custom),
            Raw::Num(n) => Ok(n),
        }
    }
}
