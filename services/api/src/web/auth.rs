//! services/api/src/web/auth.rs
//!
//! Authentication endpoints for registration, login, and refresh-token rotation.

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::Duration;
use std::sync::Arc;
use tracing::info;
use validator::Validate;

use crate::auth::tokens::REFRESH_TOKEN_LIFETIME_DAYS;
use crate::auth::{AuthError, TokenPair};
use crate::config::Environment;
use crate::error::{ApiError, ErrorBody};
use crate::web::dto::{LoginRequest, MessageResponse, RegisterRequest, TokenResponse};
use crate::web::extract::AppJson;
use crate::web::state::AppState;

pub const REFRESH_COOKIE: &str = "refreshToken";

/// Builds the `Set-Cookie` value carrying the refresh token.
///
/// Cross-site frontends in production need `SameSite=None`.
pub fn refresh_cookie(token: &str, environment: Environment) -> String {
    let same_site = match environment {
        Environment::Development => "Strict",
        Environment::Production => "None",
    };
    format!(
        "{}={}; HttpOnly; Secure; SameSite={}; Path=/; Max-Age={}",
        REFRESH_COOKIE,
        token,
        same_site,
        Duration::days(REFRESH_TOKEN_LIFETIME_DAYS).num_seconds()
    )
}

/// Reads the refresh token out of the request's `Cookie` header.
pub fn refresh_token_from(headers: &HeaderMap) -> Option<String> {
    let prefix = format!("{}=", REFRESH_COOKIE);
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .find_map(|c| c.trim().strip_prefix(prefix.as_str()).map(str::to_string))
        .filter(|token| !token.is_empty())
}

fn token_response(pair: TokenPair, environment: Environment) -> impl IntoResponse {
    let cookie = refresh_cookie(&pair.refresh_token, environment);
    (
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(TokenResponse {
            token: pair.access_token,
            expires_in: pair.expires_in,
        }),
    )
}

/// POST /api/auth/register - Create a new user account
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "User registered", body = MessageResponse),
        (status = 400, description = "Invalid request or weak password", body = ErrorBody),
        (status = 409, description = "Email or username already taken", body = ErrorBody)
    ),
    tag = "Auth",
    security(())
)]
pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<RegisterRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    req.validate()?;
    let user = state
        .auth
        .register(&req.email, &req.user_name, &req.password, &req.confirm_password)
        .await?;
    info!("Registered user {}", user.user_id);
    Ok(Json(MessageResponse::new("User registered successfully")))
}

/// POST /api/auth/login - Login with an existing account
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful; refresh token set as cookie", body = TokenResponse),
        (status = 401, description = "Invalid credentials", body = ErrorBody)
    ),
    tag = "Auth",
    security(())
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()?;
    let pair = match state.auth.login(&req.email, &req.password).await {
        Ok(pair) => pair,
        // Unknown emails are a failed login, not a missing resource.
        Err(AuthError::UserNotFound) => {
            return Err(ApiError::Unauthorized(AuthError::UserNotFound.to_string()))
        }
        Err(err) => return Err(err.into()),
    };
    Ok(token_response(pair, state.config.environment))
}

/// POST /api/auth/refresh - Rotate the refresh token held in the cookie
#[utoipa::path(
    post,
    path = "/api/auth/refresh",
    responses(
        (status = 200, description = "New token pair; refresh token re-set as cookie", body = TokenResponse),
        (status = 401, description = "Missing, unknown or expired refresh token", body = ErrorBody)
    ),
    tag = "Auth",
    security(())
)]
pub async fn refresh_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let token = refresh_token_from(&headers)
        .ok_or_else(|| ApiError::Unauthorized("Refresh token missing".to_string()))?;
    let pair = state.auth.refresh(&token).await?;
    Ok(token_response(pair, state.config.environment))
}
