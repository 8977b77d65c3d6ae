//! crates/chat_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases or APIs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{ChatSession, Message, NewMessage, NewUser, User, UserCredentials};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    /// A uniqueness constraint was violated.
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

/// Failures reported by the external text generator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    #[error("rate limited by the text generation provider")]
    RateLimited,
    #[error("text generation provider unavailable")]
    Unavailable,
    #[error("text generation failed: {0}")]
    Other(String),
}

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Persistence of user records and their refresh-token slot.
///
/// Email and username lookups are case-insensitive.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Fails with [`PortError::Conflict`] when the email or username is taken.
    async fn create_user(&self, new_user: NewUser) -> PortResult<User>;

    async fn find_by_id(&self, user_id: Uuid) -> PortResult<Option<UserCredentials>>;

    async fn find_by_email(&self, email: &str) -> PortResult<Option<UserCredentials>>;

    async fn find_by_username(&self, username: &str) -> PortResult<Option<UserCredentials>>;

    async fn find_by_refresh_token(&self, token_hash: &str)
        -> PortResult<Option<UserCredentials>>;

    /// Unconditionally overwrites the refresh slot (login).
    async fn store_refresh_token(
        &self,
        user_id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()>;

    /// Replaces the refresh slot only if it still holds `current_hash`.
    ///
    /// Returns `false` when another rotation got there first.
    async fn rotate_refresh_token(
        &self,
        user_id: Uuid,
        current_hash: &str,
        new_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> PortResult<bool>;

    async fn update_profile(&self, user_id: Uuid, username: &str, email: &str)
        -> PortResult<User>;

    async fn update_password_hash(&self, user_id: Uuid, hashed_password: &str) -> PortResult<()>;

    /// Removes the user together with their sessions and messages.
    /// Returns `false` if no such user existed.
    async fn delete_user(&self, user_id: Uuid) -> PortResult<bool>;
}

/// Owner-scoped persistence of chat sessions and messages.
#[async_trait]
pub trait ChatRepository: Send + Sync {
    /// Sessions of `owner`, newest first.
    async fn list_sessions(&self, owner: Uuid) -> PortResult<Vec<ChatSession>>;

    async fn create_session(&self, owner: Uuid, title: &str) -> PortResult<ChatSession>;

    /// Deletes the subset of `session_ids` owned by `owner` (messages cascade).
    /// Returns how many sessions were removed.
    async fn delete_sessions(&self, session_ids: &[Uuid], owner: Uuid) -> PortResult<u64>;

    async fn session_owned_by(&self, session_id: Uuid, owner: Uuid) -> PortResult<bool>;

    /// Messages of a session owned by `owner`, oldest first.
    async fn list_messages(&self, session_id: Uuid, owner: Uuid) -> PortResult<Vec<Message>>;

    /// Inserts a message, failing with [`PortError::NotFound`] unless the
    /// session belongs to `owner`.
    async fn add_message(&self, owner: Uuid, message: NewMessage) -> PortResult<Message>;
}

#[async_trait]
pub trait TextGenerationService: Send + Sync {
    /// Produces a reply for a single prompt.
    async fn generate_reply(&self, prompt: &str) -> Result<String, GenerationError>;
}
