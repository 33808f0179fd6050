//! Admin auth guard — `AdminGuard` axum extractor. Handlers opt in by
//! adding `_guard: AdminGuard` to their parameter list instead of repeating
//! a manual token check in each one.

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::Json;

use crate::auth::token_matches_hash;
use crate::state::AppState;

/// If no admin token is configured (dev mode), every request passes.
pub struct AdminGuard;

#[async_trait]
impl FromRequestParts<AppState> for AdminGuard {
    type Rejection = (StatusCode, Json<serde_json::Value>);

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Some(expected) = &state.admin_token_hash else {
            return Ok(AdminGuard);
        };

        let provided = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .unwrap_or("");

        if !token_matches_hash(provided, expected) {
            return Err((
                StatusCode::UNAUTHORIZED,
                Json(serde_json::json!({ "error": "invalid or missing admin token" })),
            ));
        }
        Ok(AdminGuard)
    }
}
