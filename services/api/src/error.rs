//! services/api/src/error.rs
//!
//! Defines the primary error type for the entire API service and how each
//! variant is rendered as an HTTP response.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chat_core::ports::PortError;
use serde::Serialize;
use utoipa::ToSchema;

use crate::auth::AuthError;
use crate::config::ConfigError;

const INTERNAL_MESSAGE: &str = "Internal Server Error";

/// JSON body of every error response.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub status_code: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
}

impl ErrorBody {
    pub fn internal() -> Self {
        Self {
            status_code: StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
            message: INTERNAL_MESSAGE.to_string(),
            errors: None,
        }
    }
}

/// The primary error type for the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error that propagated up from one of the core service ports.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    /// An account operation was refused.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Represents an error from the underlying database library.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A request body failed field validation.
    #[error("Validation failed")]
    Validation(#[from] validator::ValidationErrors),

    /// The body was not JSON of the expected shape.
    #[error("Invalid request body: {0}")]
    InvalidBody(#[from] JsonRejection),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Unauthorized(String),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

impl ApiError {
    fn status_and_body(self) -> (StatusCode, String, Option<Vec<String>>) {
        match self {
            ApiError::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                "Validation failed".to_string(),
                Some(validation_messages(&errors)),
            ),
            ApiError::InvalidBody(rejection) => (
                StatusCode::BAD_REQUEST,
                "Invalid request body".to_string(),
                Some(vec![rejection.body_text()]),
            ),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, None),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg, None),
            ApiError::Auth(err) => auth_status(err),
            ApiError::Port(err) => port_status(err),
            other => internal(&other),
        }
    }
}

fn internal(err: &dyn std::fmt::Display) -> (StatusCode, String, Option<Vec<String>>) {
    tracing::error!("Internal server error: {}", err);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        INTERNAL_MESSAGE.to_string(),
        None,
    )
}

fn port_status(err: PortError) -> (StatusCode, String, Option<Vec<String>>) {
    match err {
        PortError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, None),
        PortError::Conflict(what) => (StatusCode::CONFLICT, format!("Conflict: {}", what), None),
        PortError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string(), None),
        PortError::Unexpected(_) => internal(&err),
    }
}

fn auth_status(err: AuthError) -> (StatusCode, String, Option<Vec<String>>) {
    let status = match err {
        AuthError::Port(port) => return port_status(port),
        AuthError::Hashing(_) | AuthError::Token(_) => return internal(&err),
        AuthError::EmailAlreadyRegistered | AuthError::UsernameTaken | AuthError::EmailTaken => {
            StatusCode::CONFLICT
        }
        AuthError::PasswordMismatch
        | AuthError::WeakPassword(_)
        | AuthError::CurrentPasswordIncorrect => StatusCode::BAD_REQUEST,
        AuthError::UserNotFound => StatusCode::NOT_FOUND,
        AuthError::InvalidCredentials | AuthError::InvalidOrExpiredRefreshToken => {
            StatusCode::UNAUTHORIZED
        }
    };
    let message = err.to_string();
    let errors = match err {
        AuthError::WeakPassword(reasons) => reasons,
        _ => vec![message.clone()],
    };
    (status, message, Some(errors))
}

fn validation_messages(errors: &validator::ValidationErrors) -> Vec<String> {
    let mut messages: Vec<String> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| match &e.message {
                Some(message) => format!("{}: {}", field, message),
                None => format!("{}: {}", field, e.code),
            })
        })
        .collect();
    messages.sort();
    messages
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, errors) = self.status_and_body();
        let body = Json(ErrorBody {
            status_code: status.as_u16(),
            message,
            errors,
        });
        (status, body).into_response()
    }
}
