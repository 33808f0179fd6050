pub mod guard;
pub mod handlers;

use axum::routing::get;
use axum::Router;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/sessions", get(handlers::list_sessions).post(handlers::create_session))
        .route(
            "/api/sessions/:id",
            get(handlers::get_session).delete(handlers::delete_session),
        )
        .route("/api/sessions/:id/process-log", get(handlers::process_log))
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
}
