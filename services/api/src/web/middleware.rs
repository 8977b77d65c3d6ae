//! services/api/src/web/middleware.rs
//!
//! Authentication middleware for protecting routes.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::debug;

use crate::auth::tokens::verify_access_token;
use crate::error::ApiError;
use crate::web::state::AppState;

/// Middleware that validates the bearer access token and extracts the user_id.
///
/// If valid, inserts the user_id into request extensions for handlers to use.
/// If invalid or missing, returns 401 Unauthorized.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::Unauthorized("Missing bearer token".to_string()))?;

    let claims = verify_access_token(token, state.auth.jwt_settings()).map_err(|e| {
        debug!("Rejected access token: {}", e);
        ApiError::Unauthorized("Invalid or expired access token".to_string())
    })?;

    let user_id = claims
        .user_id()
        .ok_or_else(|| ApiError::Unauthorized("Invalid or expired access token".to_string()))?;

    req.extensions_mut().insert(user_id);
    Ok(next.run(req).await)
}
