//! The consumer-facing WebSocket. Query params carry the session id and an
//! optional auth token; frames are JSON objects with a top-level `type`
//! discriminating what the consumer wants to do. Every frame that mutates
//! session state is translated into an [`InboundCommand`] and handed to the
//! runtime, which serializes it against concurrently arriving backend
//! messages.

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;

use ab_domain::message::{ContentBlock, MessageRole, PermissionDecision, UnifiedMessage};
use ab_runtime::{InboundCommand, SessionRuntime};
use ab_runtime::slash::{self, DispatchOutcome};

use crate::auth::token_matches_hash;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ConsumerQuery {
    pub session_id: String,
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ConsumerFrame {
    UserMessage { text: String },
    QueueMessage { text: String },
    UpdateQueuedMessage { message_id: String, text: String },
    CancelQueuedMessage { message_id: String },
    SlashCommand { request_id: String, command: String },
    PermissionResponse { request_id: String, decision: PermissionDecision },
    Interrupt,
    ConfigurationChange { model: Option<String>, permission_mode: Option<String> },
}

pub async fn consumer_socket(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(query): Query<ConsumerQuery>,
) -> impl IntoResponse {
    if let Some(expected) = &state.api_token_hash {
        let provided = query.token.as_deref().unwrap_or("");
        if !token_matches_hash(provided, expected) {
            return (StatusCode::UNAUTHORIZED, "invalid or missing consumer token").into_response();
        }
    }

    if !state.repo.contains(&query.session_id) {
        return (StatusCode::NOT_FOUND, "unknown session").into_response();
    }

    ws.on_upgrade(move |socket| handle_socket(socket, state, query.session_id))
        .into_response()
}

async fn handle_socket(socket: WebSocket, state: AppState, session_id: String) {
    let (mut ws_sink, mut ws_stream) = socket.split();
    let consumer_id = uuid::Uuid::new_v4().to_string();

    let (tx, mut rx) = mpsc::channel::<UnifiedMessage>(64);
    if let Err(e) = state.runtime.attach_consumer(&session_id, consumer_id.clone(), tx).await {
        tracing::warn!(session_id = %session_id, error = %e, "failed to attach consumer");
        let _ = ws_sink.send(Message::Close(None)).await;
        return;
    }

    let writer = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let Ok(json) = serde_json::to_string(&msg) else { continue };
            if ws_sink.send(Message::Text(json)).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(msg)) = ws_stream.next().await {
        match msg {
            Message::Text(text) => {
                match serde_json::from_str::<ConsumerFrame>(&text) {
                    Ok(frame) => handle_frame(&state, &session_id, &consumer_id, frame).await,
                    Err(e) => tracing::debug!(session_id = %session_id, error = %e, "ignoring unparseable consumer frame"),
                }
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    writer.abort();
    state.runtime.detach_consumer(&session_id, &consumer_id).await;
}

async fn handle_frame(state: &AppState, session_id: &str, consumer_id: &str, frame: ConsumerFrame) {
    let runtime: &SessionRuntime = &state.runtime;
    let result = match frame {
        ConsumerFrame::UserMessage { text } | ConsumerFrame::QueueMessage { text } => {
            let message = UnifiedMessage::new(
                ab_domain::message::MessageKind::Text,
                MessageRole::User,
                vec![ContentBlock::Text { text }],
            );
            runtime
                .ingest_inbound(session_id, InboundCommand::Send { author_id: consumer_id.to_string(), message })
                .await
        }
        ConsumerFrame::UpdateQueuedMessage { message_id, text } => {
            runtime
                .ingest_inbound(
                    session_id,
                    InboundCommand::UpdateQueued { author_id: consumer_id.to_string(), message_id, text },
                )
                .await
        }
        ConsumerFrame::CancelQueuedMessage { message_id } => {
            runtime
                .ingest_inbound(
                    session_id,
                    InboundCommand::CancelQueued { author_id: consumer_id.to_string(), message_id },
                )
                .await
        }
        ConsumerFrame::Interrupt => runtime.ingest_inbound(session_id, InboundCommand::Interrupt).await,
        ConsumerFrame::PermissionResponse { request_id, decision } => {
            runtime
                .ingest_inbound(session_id, InboundCommand::ResolvePermission { request_id, decision })
                .await
        }
        ConsumerFrame::SlashCommand { request_id, command } => {
            handle_slash_command(state, session_id, consumer_id, &request_id, &command).await
        }
        ConsumerFrame::ConfigurationChange { model, permission_mode } => {
            state.repo.with_session(session_id, |s| {
                if let Some(model) = model {
                    s.model = Some(model);
                }
                if let Some(mode) = permission_mode {
                    s.permission_mode = mode;
                }
            });
            state.repo.persist_by_id(session_id);
            Ok(())
        }
    };

    if let Err(e) = result {
        tracing::debug!(session_id = %session_id, error = %e, "consumer command failed");
    }
}

/// No adapter in this broker advertises native slash-command handling yet,
/// so the chain only ever resolves locally or falls through to passthrough.
async fn handle_slash_command(
    state: &AppState,
    session_id: &str,
    consumer_id: &str,
    request_id: &str,
    command: &str,
) -> ab_domain::error::Result<()> {
    match slash::dispatch(request_id, command, false) {
        DispatchOutcome::Resolved(msg) => state.runtime.receive_from_backend(session_id, msg).await,
        DispatchOutcome::Passthrough { request_id, command } | DispatchOutcome::ForwardToAdapter { request_id, command } => {
            let mut message = UnifiedMessage::new(
                ab_domain::message::MessageKind::Text,
                MessageRole::User,
                vec![ContentBlock::Text { text: command }],
            );
            message.metadata.insert("request_id".into(), serde_json::json!(request_id));
            state
                .runtime
                .ingest_inbound(session_id, InboundCommand::Send { author_id: consumer_id.to_string(), message })
                .await
        }
    }
}
