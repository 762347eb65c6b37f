use chat_common::ChannelId;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Channel {
    #[schema(value_type = String)]
    pub id: ChannelId,
    pub server_id: String,
    pub name: String,
}
