//! The inverted CLI-facing WebSocket. A `claude_sdk_url` child dials back
//! into this endpoint after the launcher spawns it, declaring its session
//! id via the `session_id` query param. If that id matches a pending
//! [`SocketRegistry`] registration the connection is handed over to the
//! waiting launcher; otherwise it's closed immediately.
//!
//! Frames are NDJSON in both directions, so the wire format here is plain
//! `Message::Text` lines — the adapter layer owns interpreting
//! `control_request`/`control_response` and user-message framing.

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;

use crate::socket_registry::DeliveredSocket;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CliSocketQuery {
    pub session_id: String,
}

pub async fn cli_socket(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(query): Query<CliSocketQuery>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, query.session_id))
        .into_response()
}

async fn handle_socket(socket: WebSocket, state: AppState, session_id: String) {
    let (mut ws_sink, mut ws_stream) = socket.split();

    let (to_adapter_tx, to_adapter_rx) = mpsc::channel::<String>(64);
    let (from_adapter_tx, mut from_adapter_rx) = mpsc::channel::<String>(64);

    let delivered = DeliveredSocket {
        outbound: from_adapter_tx,
        inbound: to_adapter_rx,
    };

    if !state.sockets.deliver_socket(&session_id, delivered) {
        tracing::warn!(session_id = %session_id, "cli dialed back with no matching registration");
        let _ = ws_sink.send(Message::Close(None)).await;
        return;
    }

    tracing::info!(session_id = %session_id, "cli backend connected");

    let writer = tokio::spawn(async move {
        while let Some(line) = from_adapter_rx.recv().await {
            if ws_sink.send(Message::Text(line)).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(msg)) = ws_stream.next().await {
        match msg {
            Message::Text(text) => {
                if to_adapter_tx.send(text).await.is_err() {
                    break;
                }
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    writer.abort();
    tracing::info!(session_id = %session_id, "cli backend disconnected");
}
