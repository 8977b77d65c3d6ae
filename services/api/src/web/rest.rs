//! services/api/src/web/rest.rs
//!
//! The health endpoint and the master definition for the OpenAPI specification.

use axum::Json;
use utoipa::{
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
    Modify, OpenApi,
};

use crate::error::ErrorBody;
use crate::web::{auth, chat, dto, guest, user};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        health_handler,
        auth::register_handler,
        auth::login_handler,
        auth::refresh_handler,
        user::get_profile_handler,
        user::update_profile_handler,
        user::change_password_handler,
        user::delete_user_handler,
        chat::list_sessions_handler,
        chat::create_session_handler,
        chat::delete_session_handler,
        chat::delete_sessions_handler,
        chat::list_messages_handler,
        chat::send_message_handler,
        chat::generate_sample_handler,
        guest::create_guest_session_handler,
        guest::list_guest_messages_handler,
        guest::send_guest_message_handler,
        guest::delete_guest_session_handler,
    ),
    components(
        schemas(
            ErrorBody,
            dto::RegisterRequest,
            dto::LoginRequest,
            dto::TokenResponse,
            dto::MessageResponse,
            dto::ProfileResponse,
            dto::UpdateProfileRequest,
            dto::UpdateProfileResponse,
            dto::ChangePasswordRequest,
            dto::SuccessResponse,
            dto::ChatSessionResponse,
            dto::ChatMessageResponse,
            dto::CreateSessionRequest,
            dto::SendMessageRequest,
            dto::SampleResponse,
            dto::HealthResponse,
        )
    ),
    modifiers(&SecuritySchemes),
    tags(
        (name = "Auth", description = "Registration, login and token refresh."),
        (name = "User", description = "Profile and account management."),
        (name = "Chat", description = "Chat sessions and messages of registered users."),
        (name = "Guest", description = "Anonymous chat as the shared guest user.")
    ),
    security(("Bearer" = []))
)]
pub struct ApiDoc;

struct SecuritySchemes;

impl Modify for SecuritySchemes {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_default();

        let mut bearer = Http::new(HttpAuthScheme::Bearer);
        bearer.bearer_format = Some("JWT".to_string());
        bearer.description = Some("JWT Authorization header using the Bearer scheme".to_string());

        components.add_security_scheme("Bearer", SecurityScheme::Http(bearer));
    }
}

//=========================================================================================
// Health
//=========================================================================================

/// GET /health
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up", body = dto::HealthResponse)),
    tag = "Health",
    security(())
)]
pub async fn health_handler() -> Json<dto::HealthResponse> {
    Json(dto::HealthResponse {
        status: "Healthy".to_string(),
    })
}
