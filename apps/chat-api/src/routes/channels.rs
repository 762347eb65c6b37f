//! Server and channel listing endpoints.

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::error::{ApiError, ApiErrorBody};
use crate::models::channel::Channel;
use crate::models::server::Server;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/servers", get(list_servers))
        .route("/channels", get(list_channels))
}

// ---------------------------------------------------------------------------
// GET /api/servers
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/api/servers",
    tag = "Channels",
    responses(
        (status = 200, description = "All servers", body = Vec<Server>),
    ),
)]
pub async fn list_servers(State(state): State<AppState>) -> Result<Json<Vec<Server>>, ApiError> {
    let servers = state.store.list_servers().await?;
    Ok(Json(servers))
}

// ---------------------------------------------------------------------------
// GET /api/channels?serverId=
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(rename_all = "camelCase")]
pub struct ListChannelsParams {
    /// Server whose channels to list.
    pub server_id: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/channels",
    tag = "Channels",
    params(ListChannelsParams),
    responses(
        (status = 200, description = "Channels ordered by name descending", body = Vec<Channel>),
        (status = 400, description = "Missing serverId", body = ApiErrorBody),
        (status = 404, description = "Server not found", body = ApiErrorBody),
    ),
)]
pub async fn list_channels(
    State(state): State<AppState>,
    Query(params): Query<ListChannelsParams>,
) -> Result<Json<Vec<Channel>>, ApiError> {
    let server_id = params
        .server_id
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("Missing serverId"))?;

    let channels = state.store.list_channels(&server_id).await?;
    Ok(Json(channels))
}
