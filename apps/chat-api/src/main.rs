use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use chat_api::config::Config;
use chat_api::db::store::{ChatStore, MemoryStore};
use chat_api::gateway::Hub;
use chat_api::AppState;
use chat_common::SnowflakeGenerator;

#[tokio::main]
async fn main() {
    // Load .env file (silently skip if missing; env vars may be set externally)
    if dotenvy::dotenv().is_err() {
        let env_path = Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
        let _ = dotenvy::from_path(env_path);
    }

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    let port = config.port;

    let snowflake = Arc::new(SnowflakeGenerator::new(0));
    let store: Arc<dyn ChatStore> = if config.seed_demo_data {
        Arc::new(MemoryStore::with_demo_data(snowflake))
    } else {
        Arc::new(MemoryStore::new(snowflake))
    };

    let hub = Arc::new(Hub::new(config.outbound_queue_capacity));

    tracing::info!(
        outbound_queue_capacity = config.outbound_queue_capacity,
        heartbeat_interval_ms = config.heartbeat_interval_ms,
        seed_demo_data = config.seed_demo_data,
        "chat-api configured"
    );

    let state = AppState {
        store,
        config: Arc::new(config),
        hub,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .merge(chat_api::routes::router())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!(%addr, %err, "failed to bind");
            std::process::exit(1);
        }
    };
    tracing::info!(%addr, "chat-api listening");

    if let Err(err) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(%err, "server error");
        std::process::exit(1);
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
