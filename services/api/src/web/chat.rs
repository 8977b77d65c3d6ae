//! services/api/src/web/chat.rs
//!
//! Chat session and message endpoints for registered users, plus the
//! unauthenticated sample generation endpoint.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chat_core::domain::Identity;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::error::{ApiError, ErrorBody};
use crate::web::dto::{
    ChatMessageResponse, ChatSessionResponse, CreateSessionRequest, MessageResponse,
    SampleResponse, SendMessageRequest,
};
use crate::web::extract::AppJson;
use crate::web::state::AppState;

pub(crate) const SESSION_NOT_FOUND: &str =
    "Session not found or you do not have permission to delete it";

/// GET /api/chat/sessions
#[utoipa::path(
    get,
    path = "/api/chat/sessions",
    responses(
        (status = 200, description = "Sessions of the caller, newest first", body = [ChatSessionResponse]),
        (status = 401, description = "Missing or invalid access token", body = ErrorBody)
    ),
    tag = "Chat"
)]
pub async fn list_sessions_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<Json<Vec<ChatSessionResponse>>, ApiError> {
    let sessions = state
        .chat
        .list_sessions(Identity::Registered(user_id))
        .await?;
    Ok(Json(sessions.into_iter().map(Into::into).collect()))
}

/// POST /api/chat/sessions
#[utoipa::path(
    post,
    path = "/api/chat/sessions",
    request_body = CreateSessionRequest,
    responses(
        (status = 201, description = "Session created", body = ChatSessionResponse),
        (status = 400, description = "Invalid request", body = ErrorBody)
    ),
    tag = "Chat"
)]
pub async fn create_session_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    AppJson(req): AppJson<CreateSessionRequest>,
) -> Result<(StatusCode, Json<ChatSessionResponse>), ApiError> {
    req.validate()?;
    let session = state
        .chat
        .create_session(Identity::Registered(user_id), req.title.as_deref())
        .await?;
    Ok((StatusCode::CREATED, Json(session.into())))
}

/// DELETE /api/chat/sessions/{id}
#[utoipa::path(
    delete,
    path = "/api/chat/sessions/{id}",
    params(("id" = Uuid, Path, description = "Session id")),
    responses(
        (status = 200, description = "Session and its messages deleted", body = MessageResponse),
        (status = 404, description = "Session not found or not owned", body = ErrorBody)
    ),
    tag = "Chat"
)]
pub async fn delete_session_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    let deleted = state
        .chat
        .delete_sessions(Identity::Registered(user_id), &[id])
        .await?;
    if deleted == 0 {
        return Err(ApiError::NotFound(SESSION_NOT_FOUND.to_string()));
    }
    Ok(Json(MessageResponse::new(
        "Session and its messages deleted successfully",
    )))
}

/// DELETE /api/chat/sessions
///
/// Ids the caller does not own are skipped silently.
#[utoipa::path(
    delete,
    path = "/api/chat/sessions",
    request_body = Vec<Uuid>,
    responses(
        (status = 200, description = "Owned sessions deleted", body = MessageResponse),
        (status = 404, description = "None of the ids matched an owned session", body = ErrorBody)
    ),
    tag = "Chat"
)]
pub async fn delete_sessions_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    AppJson(ids): AppJson<Vec<Uuid>>,
) -> Result<Json<MessageResponse>, ApiError> {
    let deleted = state
        .chat
        .delete_sessions(Identity::Registered(user_id), &ids)
        .await?;
    if deleted == 0 {
        return Err(ApiError::NotFound(
            "No sessions found or you do not have permission to delete them".to_string(),
        ));
    }
    Ok(Json(MessageResponse::new(format!(
        "{} session(s) and their messages deleted successfully",
        deleted
    ))))
}

/// GET /api/chat/sessions/{id}/messages
#[utoipa::path(
    get,
    path = "/api/chat/sessions/{id}/messages",
    params(("id" = Uuid, Path, description = "Session id")),
    responses(
        (status = 200, description = "Messages, oldest first", body = [ChatMessageResponse]),
        (status = 404, description = "Session not found or not owned", body = ErrorBody)
    ),
    tag = "Chat"
)]
pub async fn list_messages_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<ChatMessageResponse>>, ApiError> {
    let messages = state
        .chat
        .list_messages(Identity::Registered(user_id), id)
        .await?;
    Ok(Json(messages.into_iter().map(Into::into).collect()))
}

/// POST /api/chat/sessions/{id}/messages
///
/// Stores the user's line and the assistant reply; responds with the reply.
#[utoipa::path(
    post,
    path = "/api/chat/sessions/{id}/messages",
    params(("id" = Uuid, Path, description = "Session id")),
    request_body = SendMessageRequest,
    responses(
        (status = 200, description = "The assistant reply", body = ChatMessageResponse),
        (status = 400, description = "Invalid request", body = ErrorBody),
        (status = 404, description = "Session not found or not owned", body = ErrorBody)
    ),
    tag = "Chat"
)]
pub async fn send_message_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(id): Path<Uuid>,
    AppJson(req): AppJson<SendMessageRequest>,
) -> Result<Json<ChatMessageResponse>, ApiError> {
    req.validate()?;
    let turn = state
        .chat
        .send_message(Identity::Registered(user_id), id, &req.content)
        .await?;
    Ok(Json(turn.reply.into()))
}

/// POST /api/chat/generate-sample
///
/// The body is a bare JSON string. Nothing is stored.
#[utoipa::path(
    post,
    path = "/api/chat/generate-sample",
    request_body = String,
    responses(
        (status = 200, description = "Generated text or a fallback message", body = SampleResponse)
    ),
    tag = "Chat",
    security(())
)]
pub async fn generate_sample_handler(
    State(state): State<Arc<AppState>>,
    AppJson(prompt): AppJson<String>,
) -> Result<Json<SampleResponse>, ApiError> {
    info!("Generating sample response");
    Ok(Json(SampleResponse {
        response: state.chat.generate_sample(&prompt).await,
    }))
}
