pub mod auth;
pub mod chat;
pub mod dto;
pub mod extract;
pub mod guest;
pub mod middleware;
pub mod rest;
pub mod state;
pub mod user;

pub use middleware::require_auth;
pub use state::AppState;

use std::any::Any;
use std::sync::Arc;

use axum::{
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method, StatusCode,
    },
    middleware as axum_middleware,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, warn};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::Config;
use crate::error::ErrorBody;

/// Builds the complete HTTP application over the given state.
pub fn router(state: Arc<AppState>) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(rest::health_handler))
        .route("/api/auth/register", post(auth::register_handler))
        .route("/api/auth/login", post(auth::login_handler))
        .route("/api/auth/refresh", post(auth::refresh_handler))
        .route(
            "/api/chat/guest/sessions",
            post(guest::create_guest_session_handler),
        )
        .route(
            "/api/chat/guest/sessions/{id}/messages",
            get(guest::list_guest_messages_handler).post(guest::send_guest_message_handler),
        )
        .route(
            "/api/chat/guest/sessions/delete/{id}",
            post(guest::delete_guest_session_handler),
        )
        .route(
            "/api/chat/generate-sample",
            post(chat::generate_sample_handler),
        );

    // Protected routes (bearer token required)
    let protected_routes = Router::new()
        .route(
            "/api/user/profile",
            get(user::get_profile_handler).put(user::update_profile_handler),
        )
        .route(
            "/api/user/change-password",
            put(user::change_password_handler),
        )
        .route("/api/user/delete/{id}", delete(user::delete_user_handler))
        .route(
            "/api/chat/sessions",
            get(chat::list_sessions_handler)
                .post(chat::create_session_handler)
                .delete(chat::delete_sessions_handler),
        )
        .route(
            "/api/chat/sessions/{id}",
            delete(chat::delete_session_handler),
        )
        .route(
            "/api/chat/sessions/{id}/messages",
            get(chat::list_messages_handler).post(chat::send_message_handler),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            require_auth,
        ));

    let mut app = Router::new().merge(public_routes).merge(protected_routes);
    if state.config.swagger_enabled() {
        app = app.merge(
            SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", rest::ApiDoc::openapi()),
        );
    }

    app.layer(CatchPanicLayer::custom(panic_response))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state.config))
        .with_state(state)
}

fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT])
}

/// Renders a handler panic as the generic 500 body.
fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else {
        "unknown panic payload"
    };
    error!("An unexpected error occurred: {}", detail);
    (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorBody::internal())).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn panics_render_generic_error_body() {
        let response = panic_response(Box::new("kaboom"));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        let json: serde_json::Value = serde_json::from_slice(&bytes).expect("json");
        assert_eq!(json["statusCode"], 500);
        assert_eq!(json["message"], "Internal Server Error");
    }
}
