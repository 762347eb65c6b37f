pub mod channels;
pub mod health;
pub mod messages;

use axum::Router;
use utoipa::OpenApi;

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(crate::gateway::server::router())
        .nest(
            "/api",
            channels::router().merge(messages::router()),
        )
}

#[derive(OpenApi)]
#[openapi(
    paths(
        // Health
        health::health,
        // Channels
        channels::list_servers,
        channels::list_channels,
        // Messages
        messages::list_messages,
        messages::create_message,
    ),
    components(
        schemas(
            // Error types
            crate::error::ApiErrorBody,
            crate::error::ApiErrorDetail,
            crate::error::FieldError,
            // Models
            crate::models::server::Server,
            crate::models::channel::Channel,
            crate::models::message::MessageSchema,
            // Route request/response types
            health::HealthResponse,
            messages::CreateMessageRequest,
        )
    ),
    tags(
        (name = "Health", description = "Health check"),
        (name = "Channels", description = "Servers and channels"),
        (name = "Messages", description = "Messaging"),
    )
)]
pub struct ApiDoc;
