//! services/api/src/web/guest.rs
//!
//! Anonymous chat endpoints. Everything here acts as the configured guest
//! user; writes must name that user in the body.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chat_core::domain::Identity;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::error::{ApiError, ErrorBody};
use crate::web::chat::SESSION_NOT_FOUND;
use crate::web::dto::{
    ChatMessageResponse, ChatSessionResponse, CreateSessionRequest, MessageResponse,
    SendMessageRequest,
};
use crate::web::extract::AppJson;
use crate::web::state::AppState;

/// Accepts the request only if `user_id` parses to the guest user's id.
fn guest_identity(state: &AppState, user_id: Option<&str>) -> Result<Identity, ApiError> {
    match user_id.and_then(|raw| Uuid::parse_str(raw.trim()).ok()) {
        Some(id) if state.chat.is_guest_id(id) => Ok(Identity::Guest),
        _ => Err(ApiError::Unauthorized("Invalid guest userId".to_string())),
    }
}

/// POST /api/chat/guest/sessions
#[utoipa::path(
    post,
    path = "/api/chat/guest/sessions",
    request_body = CreateSessionRequest,
    responses(
        (status = 201, description = "Guest session created", body = ChatSessionResponse),
        (status = 401, description = "userId is not the guest user", body = ErrorBody)
    ),
    tag = "Guest",
    security(())
)]
pub async fn create_guest_session_handler(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<CreateSessionRequest>,
) -> Result<(StatusCode, Json<ChatSessionResponse>), ApiError> {
    let identity = guest_identity(&state, req.user_id.as_deref())?;
    req.validate()?;
    let session = state
        .chat
        .create_session(identity, req.title.as_deref())
        .await?;
    Ok((StatusCode::CREATED, Json(session.into())))
}

/// GET /api/chat/guest/sessions/{id}/messages
#[utoipa::path(
    get,
    path = "/api/chat/guest/sessions/{id}/messages",
    params(("id" = Uuid, Path, description = "Session id")),
    responses(
        (status = 200, description = "Messages, oldest first", body = [ChatMessageResponse]),
        (status = 404, description = "Not a guest session", body = ErrorBody)
    ),
    tag = "Guest",
    security(())
)]
pub async fn list_guest_messages_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<ChatMessageResponse>>, ApiError> {
    let messages = state.chat.list_messages(Identity::Guest, id).await?;
    Ok(Json(messages.into_iter().map(Into::into).collect()))
}

/// POST /api/chat/guest/sessions/{id}/messages
#[utoipa::path(
    post,
    path = "/api/chat/guest/sessions/{id}/messages",
    params(("id" = Uuid, Path, description = "Session id")),
    request_body = SendMessageRequest,
    responses(
        (status = 200, description = "The assistant reply", body = ChatMessageResponse),
        (status = 401, description = "userId is not the guest user", body = ErrorBody),
        (status = 404, description = "Not a guest session", body = ErrorBody)
    ),
    tag = "Guest",
    security(())
)]
pub async fn send_guest_message_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    AppJson(req): AppJson<SendMessageRequest>,
) -> Result<Json<ChatMessageResponse>, ApiError> {
    let identity = guest_identity(&state, req.user_id.as_deref())?;
    req.validate()?;
    let turn = state.chat.send_message(identity, id, &req.content).await?;
    Ok(Json(turn.reply.into()))
}

/// POST /api/chat/guest/sessions/delete/{id}
#[utoipa::path(
    post,
    path = "/api/chat/guest/sessions/delete/{id}",
    params(("id" = Uuid, Path, description = "Session id")),
    responses(
        (status = 200, description = "Session and its messages deleted", body = MessageResponse),
        (status = 404, description = "Not a guest session", body = ErrorBody)
    ),
    tag = "Guest",
    security(())
)]
pub async fn delete_guest_session_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    let deleted = state.chat.delete_sessions(Identity::Guest, &[id]).await?;
    if deleted == 0 {
        return Err(ApiError::NotFound(SESSION_NOT_FOUND.to_string()));
    }
    Ok(Json(MessageResponse::new(
        "Session and its messages deleted successfully",
    )))
}
