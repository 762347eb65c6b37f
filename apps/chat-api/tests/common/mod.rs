#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;

use chat_api::config::Config;
use chat_api::db::store::MemoryStore;
use chat_api::gateway::Hub;
use chat_api::models::channel::Channel;
use chat_api::models::server::Server;
use chat_api::AppState;
use chat_common::SnowflakeGenerator;

/// Seeded fixtures: one server with `general` and `random`.
pub struct Fixture {
    pub server: Server,
    pub general: Channel,
    pub random: Channel,
}

/// Build a test AppState over a fresh in-memory store.
pub fn test_state_with(config: Config) -> (AppState, Fixture) {
    let store = MemoryStore::new(Arc::new(SnowflakeGenerator::new(0)));
    let server = store.add_server("Home");
    let general = store.add_channel(&server.id, "general").expect("seed general");
    let random = store.add_channel(&server.id, "random").expect("seed random");

    let state = AppState {
        store: Arc::new(store),
        hub: Arc::new(Hub::new(config.outbound_queue_capacity)),
        config: Arc::new(config),
    };

    (
        state,
        Fixture {
            server,
            general,
            random,
        },
    )
}

pub fn test_state() -> (AppState, Fixture) {
    test_state_with(Config {
        seed_demo_data: false,
        ..Config::default()
    })
}

/// Build the full application router wired to the test state.
pub fn test_app() -> (Router, AppState, Fixture) {
    let (state, fixture) = test_state();
    let app = chat_api::routes::router().with_state(state.clone());
    (app, state, fixture)
}

/// Start an actual TCP server for WebSocket testing. The server runs in the
/// background for the rest of the test.
pub async fn start_server_with(config: Config) -> (SocketAddr, AppState, Fixture) {
    let (state, fixture) = test_state_with(config);
    let app = chat_api::routes::router().with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (addr, state, fixture)
}

pub async fn start_server() -> (SocketAddr, AppState, Fixture) {
    start_server_with(Config {
        seed_demo_data: false,
        ..Config::default()
    })
    .await
}
