//! services/api/src/web/user.rs
//!
//! Account endpoints for the authenticated caller.

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::auth::AuthError;
use crate::error::{ApiError, ErrorBody};
use crate::web::dto::{
    ChangePasswordRequest, MessageResponse, ProfileResponse, SuccessResponse,
    UpdateProfileRequest, UpdateProfileResponse,
};
use crate::web::extract::AppJson;
use crate::web::state::AppState;

/// GET /api/user/profile
#[utoipa::path(
    get,
    path = "/api/user/profile",
    responses(
        (status = 200, description = "Profile of the caller", body = ProfileResponse),
        (status = 401, description = "Missing or invalid access token", body = ErrorBody),
        (status = 404, description = "User no longer exists", body = ErrorBody)
    ),
    tag = "User"
)]
pub async fn get_profile_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let user = state.auth.get_profile(user_id).await?;
    Ok(Json(user.into()))
}

/// PUT /api/user/profile
#[utoipa::path(
    put,
    path = "/api/user/profile",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = UpdateProfileResponse),
        (status = 400, description = "Invalid request", body = ErrorBody),
        (status = 409, description = "Username or email taken", body = ErrorBody)
    ),
    tag = "User"
)]
pub async fn update_profile_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    AppJson(req): AppJson<UpdateProfileRequest>,
) -> Result<Json<UpdateProfileResponse>, ApiError> {
    req.validate()?;
    let user = state
        .auth
        .update_profile(user_id, &req.user_name, &req.email)
        .await?;
    Ok(Json(UpdateProfileResponse {
        success: true,
        user_name: user.username,
        email: user.email,
    }))
}

/// PUT /api/user/change-password
#[utoipa::path(
    put,
    path = "/api/user/change-password",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = SuccessResponse),
        (status = 400, description = "Mismatch, wrong current password or weak password", body = ErrorBody)
    ),
    tag = "User"
)]
pub async fn change_password_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    AppJson(req): AppJson<ChangePasswordRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    req.validate()?;
    state
        .auth
        .change_password(
            user_id,
            &req.current_password,
            &req.new_password,
            &req.confirm_new_password,
        )
        .await?;
    Ok(Json(SuccessResponse {
        success: true,
        message: "Password changed successfully".to_string(),
    }))
}

/// DELETE /api/user/delete/{id}
///
/// Only the caller's own account can be deleted; any other id is reported as
/// not found.
#[utoipa::path(
    delete,
    path = "/api/user/delete/{id}",
    params(("id" = Uuid, Path, description = "Id of the caller's own account")),
    responses(
        (status = 200, description = "User deleted", body = MessageResponse),
        (status = 404, description = "User not found", body = ErrorBody)
    ),
    tag = "User"
)]
pub async fn delete_user_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Uuid>,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    if id != caller {
        return Err(AuthError::UserNotFound.into());
    }
    state.auth.delete_user(id).await?;
    Ok(Json(MessageResponse::new("User deleted successfully")))
}
