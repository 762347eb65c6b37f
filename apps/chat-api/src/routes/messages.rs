//! Message endpoints. Creating a message hands it to the gateway for fan-out.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chat_common::{ChannelId, Message};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::error::{ApiError, ApiErrorBody, FieldError};
use crate::AppState;

/// Upper bound on message length, in characters.
pub const MAX_CONTENT_CHARS: usize = 56;

pub fn router() -> Router<AppState> {
    Router::new().route("/messages", get(list_messages).post(create_message))
}

// ---------------------------------------------------------------------------
// GET /api/messages?channelId=
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(rename_all = "camelCase")]
pub struct ListMessagesParams {
    /// Channel whose messages to list.
    pub channel_id: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/messages",
    tag = "Messages",
    params(ListMessagesParams),
    responses(
        (status = 200, description = "Messages in posting order", body = Vec<crate::models::message::MessageSchema>),
        (status = 400, description = "Missing channelId", body = ApiErrorBody),
        (status = 404, description = "Channel not found", body = ApiErrorBody),
    ),
)]
pub async fn list_messages(
    State(state): State<AppState>,
    Query(params): Query<ListMessagesParams>,
) -> Result<Json<Vec<Message>>, ApiError> {
    let channel_id = params
        .channel_id
        .filter(|s| !s.trim().is_empty())
        .map(ChannelId::from)
        .ok_or_else(|| ApiError::bad_request("Missing channelId"))?;

    let messages = state.store.list_messages(&channel_id).await?;
    Ok(Json(messages))
}

// ---------------------------------------------------------------------------
// POST /api/messages
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateMessageRequest {
    pub content: Option<String>,
    pub channel_id: Option<String>,
    pub author_name: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/messages",
    tag = "Messages",
    request_body = CreateMessageRequest,
    responses(
        (status = 201, description = "Message created and pushed to channel members", body = crate::models::message::MessageSchema),
        (status = 400, description = "Validation failed", body = ApiErrorBody),
        (status = 404, description = "Channel not found", body = ApiErrorBody),
    ),
)]
pub async fn create_message(
    State(state): State<AppState>,
    Json(body): Json<CreateMessageRequest>,
) -> Result<(StatusCode, Json<Message>), ApiError> {
    let content = body.content.as_deref().map(str::trim).unwrap_or("");
    let channel_id = body.channel_id.as_deref().map(str::trim).unwrap_or("");
    let author_name = body.author_name.as_deref().map(str::trim).unwrap_or("");

    let mut errors = Vec::new();
    if content.is_empty() {
        errors.push(FieldError::new("content", "Message cannot be empty"));
    } else if content.chars().count() > MAX_CONTENT_CHARS {
        errors.push(FieldError::new(
            "content",
            &format!("Message must be at most {MAX_CONTENT_CHARS} characters"),
        ));
    }
    if channel_id.is_empty() {
        errors.push(FieldError::new("channelId", "Channel is required"));
    }
    if author_name.is_empty() {
        errors.push(FieldError::new("authorName", "Author name is required"));
    }
    if !errors.is_empty() {
        return Err(ApiError::validation(errors));
    }

    let channel_id = ChannelId::from(channel_id);
    let message = state
        .store
        .create_message(&channel_id, content, author_name)
        .await?;

    let report = state.hub.ingest().notify_message_created(message.clone());
    tracing::info!(
        message_id = message.id,
        channel_id = %message.channel_id,
        recipients = report.recipients,
        dropped = report.dropped,
        "message created"
    );

    Ok((StatusCode::CREATED, Json(message)))
}
