use chrono::{DateTime, Utc};
use utoipa::ToSchema;

/// OpenAPI description of [`chat_common::Message`], which lives in a crate
/// without schema derives. Keep the two in step.
#[allow(dead_code)]
#[derive(ToSchema)]
#[schema(as = Message, rename_all = "camelCase")]
pub struct MessageSchema {
    /// 64-bit snowflake ID sent as a decimal string (`"id": "1"`), never a
    /// JSON number, so JavaScript clients keep full precision. Requests may
    /// send either form.
    #[schema(example = "1")]
    pub id: String,
    pub channel_id: String,
    pub author_name: String,
    pub content: String,
    pub posted_date: DateTime<Utc>,
}
