//! services/api/src/web/dto.rs
//!
//! Request and response payloads of the REST API. Field names are camelCase on
//! the wire.

use chat_core::domain::{ChatSession, Message, User};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

//=========================================================================================
// Auth
//=========================================================================================

#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(email(message = "The Email field is not a valid e-mail address."))]
    pub email: String,
    #[serde(alias = "username")]
    #[validate(length(min = 3, max = 50))]
    pub user_name: String,
    #[validate(length(min = 8, max = 100))]
    pub password: String,
    #[serde(default)]
    pub confirm_password: String,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[validate(email(message = "The Email field is not a valid e-mail address."))]
    pub email: String,
    #[validate(length(min = 1, message = "The Password field is required."))]
    pub password: String,
}

/// Returned by login and refresh; the refresh token travels in a cookie.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub token: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

//=========================================================================================
// User
//=========================================================================================

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub user_id: Uuid,
    pub email: String,
    pub user_name: String,
}

impl From<User> for ProfileResponse {
    fn from(user: User) -> Self {
        Self {
            user_id: user.user_id,
            email: user.email,
            user_name: user.username,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    #[serde(alias = "username")]
    #[validate(length(min = 3, max = 50))]
    pub user_name: String,
    #[validate(email(message = "The Email field is not a valid e-mail address."))]
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileResponse {
    pub success: bool,
    pub user_name: String,
    pub email: String,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    #[validate(length(min = 8, max = 100))]
    pub new_password: String,
    #[serde(default)]
    pub confirm_new_password: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SuccessResponse {
    pub success: bool,
    pub message: String,
}

//=========================================================================================
// Chat
//=========================================================================================

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChatSessionResponse {
    pub id: Uuid,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

impl From<ChatSession> for ChatSessionResponse {
    fn from(session: ChatSession) -> Self {
        Self {
            id: session.id,
            title: session.title,
            created_at: session.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessageResponse {
    pub id: Uuid,
    pub content: String,
    pub is_user_message: bool,
    pub timestamp: DateTime<Utc>,
}

impl From<Message> for ChatMessageResponse {
    fn from(message: Message) -> Self {
        Self {
            id: message.id,
            content: message.content,
            is_user_message: message.is_user_message,
            timestamp: message.timestamp,
        }
    }
}

/// `userId` is only read on the guest route, where it must name the guest user.
#[derive(Debug, Default, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    #[validate(length(max = 100))]
    pub title: Option<String>,
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    #[validate(length(min = 1, max = 1000))]
    pub content: String,
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SampleResponse {
    pub response: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}
