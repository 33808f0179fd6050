//! The thin HTTP admin surface: session CRUD, health, and Prometheus
//! metrics. Session-mutating and session-listing endpoints require
//! [`AdminGuard`]; `/health` and `/metrics` are public, matching the
//! teacher's "probes are public, everything else needs a token" split.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use ab_domain::capability::AdapterKind;
use ab_domain::error::Error;
use ab_domain::message::SessionState;

use super::guard::AdminGuard;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    pub cwd: String,
    #[serde(default)]
    pub model: Option<String>,
    pub adapter_name: String,
}

pub async fn list_sessions(_guard: AdminGuard, State(state): State<AppState>) -> Json<Vec<ab_sessions::SessionInfo>> {
    Json(state.repo.list_info())
}

pub async fn create_session(
    _guard: AdminGuard,
    State(state): State<AppState>,
    Json(req): Json<CreateSessionRequest>,
) -> impl IntoResponse {
    let kind = match req.adapter_name.as_str() {
        "claude_sdk_url" => AdapterKind::ClaudeSdkUrl,
        "claude_agent_sdk" => AdapterKind::ClaudeAgentSdk,
        "acp" => AdapterKind::Acp,
        "gemini" => AdapterKind::Gemini,
        "opencode" => AdapterKind::Opencode,
        other => return (StatusCode::BAD_REQUEST, format!("unknown adapter_name {other}")).into_response(),
    };

    let session_id = uuid::Uuid::new_v4().to_string();
    let history_capacity = state.config.sessions.history_capacity;

    let result = match kind {
        AdapterKind::ClaudeSdkUrl => state.launcher.launch(&session_id, &req.cwd, history_capacity).await,
        AdapterKind::Acp | AdapterKind::Gemini | AdapterKind::ClaudeAgentSdk => {
            spawn_stdio_session(&state, &session_id, &req.cwd, kind, history_capacity).await
        }
        AdapterKind::Opencode => spawn_opencode_session(&state, &session_id, &req.cwd, history_capacity).await,
    };

    match result {
        Ok(()) => (StatusCode::CREATED, Json(serde_json::json!({ "id": session_id }))).into_response(),
        Err(e) => {
            state.repo.remove(&session_id);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

async fn spawn_stdio_session(
    state: &AppState,
    session_id: &str,
    cwd: &str,
    kind: AdapterKind,
    history_capacity: usize,
) -> ab_domain::error::Result<()> {
    let entry = state.config.adapters.for_kind(kind.as_str());
    let template = state
        .config
        .launcher
        .command_templates
        .get(kind.as_str())
        .ok_or_else(|| Error::Config(format!("launcher.command_templates has no entry for {}", kind.as_str())))?;

    state.repo.insert(ab_sessions::Session::new(session_id.to_string(), cwd.to_string(), kind, history_capacity));
    let adapter = ab_adapters::registry::spawn_stdio(kind, template, entry.max_skip_lines)?;
    state.runtime.attach_adapter(session_id, adapter).await
}

async fn spawn_opencode_session(
    state: &AppState,
    session_id: &str,
    cwd: &str,
    history_capacity: usize,
) -> ab_domain::error::Result<()> {
    let entry = state.config.adapters.for_kind(AdapterKind::Opencode.as_str());
    let base_url = state
        .config
        .launcher
        .command_templates
        .get(AdapterKind::Opencode.as_str())
        .and_then(|v| v.first())
        .ok_or_else(|| Error::Config("launcher.command_templates has no base URL entry for opencode".into()))?;

    state.repo.insert(ab_sessions::Session::new(
        session_id.to_string(),
        cwd.to_string(),
        AdapterKind::Opencode,
        history_capacity,
    ));
    let adapter = ab_adapters::registry::connect_opencode(
        state.http.clone(),
        base_url.clone(),
        session_id.to_string(),
        entry.sse_buffer_cap_bytes,
    )
    .await?;
    state.runtime.attach_adapter(session_id, adapter).await
}

pub async fn get_session(_guard: AdminGuard, State(state): State<AppState>, Path(id): Path<String>) -> impl IntoResponse {
    match state.repo.get_info(&id) {
        Some(info) => Json(info).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

pub async fn process_log(_guard: AdminGuard, State(state): State<AppState>, Path(id): Path<String>) -> impl IntoResponse {
    if !state.repo.contains(&id) {
        return StatusCode::NOT_FOUND.into_response();
    }
    Json(state.runtime.process_log_snapshot(&id)).into_response()
}

pub async fn delete_session(_guard: AdminGuard, State(state): State<AppState>, Path(id): Path<String>) -> impl IntoResponse {
    match state.runtime.close(&id).await {
        Ok(()) => {
            state.launcher.release(&id);
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_seconds": (chrono::Utc::now() - state.started_at).num_seconds(),
        "sessions": state.repo.list_info().len(),
    }))
}

pub async fn metrics(State(state): State<AppState>) -> String {
    let infos = state.repo.list_info();
    let total = infos.len();
    let active = infos.iter().filter(|i| i.state == SessionState::Active).count();
    let starting = infos.iter().filter(|i| i.state == SessionState::Starting).count();
    let degraded = infos.iter().filter(|i| i.state == SessionState::Degraded).count();
    format!(
        "# HELP agentbroker_sessions_total Total known sessions.\n\
         # TYPE agentbroker_sessions_total gauge\n\
         agentbroker_sessions_total {total}\n\
         # HELP agentbroker_sessions_active Sessions currently active.\n\
         # TYPE agentbroker_sessions_active gauge\n\
         agentbroker_sessions_active {active}\n\
         # HELP agentbroker_sessions_starting Sessions waiting on a backend connection.\n\
         # TYPE agentbroker_sessions_starting gauge\n\
         agentbroker_sessions_starting {starting}\n\
         # HELP agentbroker_sessions_degraded Sessions in a degraded state.\n\
         # TYPE agentbroker_sessions_degraded gauge\n\
         agentbroker_sessions_degraded {degraded}\n\
         # HELP agentbroker_launcher_slots_in_use Launcher-owned process slots currently occupied.\n\
         # TYPE agentbroker_launcher_slots_in_use gauge\n\
         agentbroker_launcher_slots_in_use {}\n",
        state.launcher.occupied_slots(),
    )
}
