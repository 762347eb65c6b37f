//! WebSocket upgrade handler and per-connection event loop.

use std::time::Duration;

use axum::extract::ws::{CloseFrame, Message as WsMessage, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::time;

use crate::config::MAX_HEARTBEAT_INTERVAL_MS;
use crate::AppState;

use super::events::{
    ClientMessage, EventName, GatewayMessage, HeartbeatPayload, OP_HEARTBEAT, OP_JOIN,
};
use super::registry::Outbound;
use super::session::GatewaySession;

/// Close codes (4000-range for application-level).
const CLOSE_UNKNOWN_ERROR: u16 = 4000;
const CLOSE_UNKNOWN_OPCODE: u16 = 4001;
const CLOSE_SESSION_TIMEOUT: u16 = 4009;

type WsSink = SplitSink<WebSocket, WsMessage>;
type WsStream = SplitStream<WebSocket>;

pub fn router() -> Router<AppState> {
    Router::new().route("/gateway", get(ws_upgrade))
}

async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_connection(socket, state))
}

async fn handle_connection(socket: WebSocket, state: AppState) {
    let (mut ws_tx, ws_rx) = socket.split();
    let (mut session, outbound) = state.hub.connect();
    let heartbeat_interval_ms = state.config.heartbeat_interval_ms;

    tracing::info!(
        connection_id = %session.connection_id(),
        connections = state.hub.registry().len(),
        "gateway connection opened"
    );

    let hello = GatewayMessage::dispatch(
        EventName::HELLO,
        session.next_seq(),
        serde_json::json!({
            "connection_id": session.connection_id(),
            "heartbeat_interval": heartbeat_interval_ms,
        }),
    );

    if send_message(&mut ws_tx, &hello).await.is_ok() {
        run_session(&mut session, ws_tx, ws_rx, outbound, heartbeat_interval_ms).await;
    }

    let connection_id = session.connection_id().clone();
    let last_channel = session.current_channel().cloned();
    session.disconnect();

    tracing::info!(
        connection_id = %connection_id,
        channel_id = ?last_channel,
        "gateway connection closed"
    );
}

/// Main event loop: read client requests, drain the outbound queue, enforce heartbeat.
async fn run_session(
    session: &mut GatewaySession,
    mut ws_tx: WsSink,
    mut ws_rx: WsStream,
    mut outbound: Outbound,
    heartbeat_interval_ms: u64,
) {
    let mut heartbeat_timer = time::interval(heartbeat_deadline(heartbeat_interval_ms));
    heartbeat_timer.tick().await; // First tick fires immediately; skip it.
    let mut got_heartbeat = true;

    loop {
        tokio::select! {
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(WsMessage::Text(text))) => {
                        let client_msg: ClientMessage = match serde_json::from_str(&text) {
                            Ok(m) => m,
                            Err(_) => {
                                let _ = send_close(&mut ws_tx, CLOSE_UNKNOWN_ERROR, "Invalid JSON").await;
                                break;
                            }
                        };

                        let reply = match client_msg.opcode() {
                            Some(OP_HEARTBEAT) => {
                                got_heartbeat = true;
                                let payload: HeartbeatPayload =
                                    serde_json::from_value(client_msg.d).unwrap_or_default();
                                GatewayMessage::heartbeat_ack(payload.seq)
                            }
                            Some(OP_JOIN) => join_reply(session, &client_msg.d),
                            _ => {
                                let _ = send_close(&mut ws_tx, CLOSE_UNKNOWN_OPCODE, "Unknown opcode").await;
                                break;
                            }
                        };

                        if send_message(&mut ws_tx, &reply).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(WsMessage::Close(_))) | None => break,
                    Some(Err(e)) => {
                        tracing::debug!(?e, connection_id = %session.connection_id(), "ws read error");
                        break;
                    }
                    Some(Ok(_)) => continue,
                }
            }

            queued = outbound.recv() => {
                let Some(message) = queued else {
                    break;
                };

                if !session.should_deliver(&message) {
                    tracing::debug!(
                        connection_id = %session.connection_id(),
                        message_id = message.id,
                        channel_id = %message.channel_id,
                        "skipping message queued before channel switch"
                    );
                    continue;
                }

                let data = serde_json::to_value(message.as_ref()).unwrap_or_default();
                let msg = GatewayMessage::dispatch(EventName::MESSAGE_CREATE, session.next_seq(), data);
                if send_message(&mut ws_tx, &msg).await.is_err() {
                    break;
                }
            }

            _ = heartbeat_timer.tick() => {
                if !got_heartbeat {
                    tracing::debug!(
                        connection_id = %session.connection_id(),
                        "heartbeat timeout, closing connection"
                    );
                    let _ = send_close(&mut ws_tx, CLOSE_SESSION_TIMEOUT, "Heartbeat timeout").await;
                    break;
                }
                got_heartbeat = false;
            }
        }
    }
}

/// How long a client may go without heartbeating: 1.5× the advertised interval.
fn heartbeat_deadline(heartbeat_interval_ms: u64) -> Duration {
    let interval = heartbeat_interval_ms.min(MAX_HEARTBEAT_INTERVAL_MS);
    Duration::from_millis((interval.saturating_mul(3) / 2).max(1))
}

/// Apply a JOIN request and build the dispatch that answers it.
fn join_reply(session: &mut GatewaySession, payload: &serde_json::Value) -> GatewayMessage {
    match session.handle_join(payload) {
        Ok(outcome) => {
            tracing::info!(
                connection_id = %session.connection_id(),
                channel_id = %outcome.channel_id,
                previous = ?outcome.previous,
                "connection joined channel"
            );
            GatewayMessage::dispatch(
                EventName::CHANNEL_JOINED,
                session.next_seq(),
                serde_json::json!({
                    "channel_id": outcome.channel_id,
                    "previous": outcome.previous,
                }),
            )
        }
        Err(err) => {
            tracing::debug!(
                connection_id = %session.connection_id(),
                error = %err,
                "join rejected"
            );
            GatewayMessage::dispatch(
                EventName::JOIN_REJECTED,
                session.next_seq(),
                serde_json::json!({
                    "code": err.code(),
                    "reason": err.to_string(),
                    "current": session.current_channel(),
                }),
            )
        }
    }
}

async fn send_message(ws_tx: &mut WsSink, msg: &GatewayMessage) -> Result<(), axum::Error> {
    ws_tx.send(WsMessage::Text(msg.to_json().into())).await
}

/// Send a WebSocket close frame with a code and reason.
async fn send_close(ws_tx: &mut WsSink, code: u16, reason: &str) -> Result<(), axum::Error> {
    let close_msg = WsMessage::Close(Some(CloseFrame {
        code,
        reason: reason.to_string().into(),
    }));
    ws_tx.send(close_msg).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heartbeat_deadline_is_one_and_a_half_intervals() {
        assert_eq!(heartbeat_deadline(41_250), Duration::from_millis(61_875));
        assert_eq!(heartbeat_deadline(0), Duration::from_millis(1));
    }

    #[test]
    fn heartbeat_deadline_does_not_overflow() {
        let capped = heartbeat_deadline(MAX_HEARTBEAT_INTERVAL_MS);
        assert_eq!(heartbeat_deadline(u64::MAX / 2), capped);
        assert_eq!(heartbeat_deadline(u64::MAX), capped);
        assert_eq!(capped, Duration::from_millis(5_400_000));
    }
}
