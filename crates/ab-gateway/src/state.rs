//! Shared state threaded through every axum handler.

use std::sync::Arc;

use ab_domain::config::Config;
use ab_runtime::{DomainEventBus, SessionRuntime};
use ab_sessions::SessionRepository;

use crate::launcher::Launcher;
use crate::socket_registry::SocketRegistry;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub repo: Arc<SessionRepository>,
    pub runtime: Arc<SessionRuntime>,
    pub event_bus: Arc<DomainEventBus>,
    pub sockets: Arc<SocketRegistry>,
    pub launcher: Arc<Launcher>,
    pub http: reqwest::Client,
    pub admin_token_hash: Option<Arc<Vec<u8>>>,
    pub api_token_hash: Option<Arc<Vec<u8>>>,
    pub started_at: chrono::DateTime<chrono::Utc>,
}
