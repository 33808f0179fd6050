pub mod cli_socket;
pub mod consumer;

use axum::routing::get;
use axum::Router;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/backend/cli", get(cli_socket::cli_socket))
        .route("/ws", get(consumer::consumer_socket))
}
