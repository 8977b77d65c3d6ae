//! crates/chat_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Title given to a chat session when the caller does not supply one.
pub const DEFAULT_SESSION_TITLE: &str = "New Chat";

/// Represents a user - used throughout app
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub user_id: Uuid,
    pub email: String,
    pub username: String,
}

// Only used internally for login/refresh - contains sensitive data
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user_id: Uuid,
    pub email: String,
    pub username: String,
    pub hashed_password: String,
    /// Digest of the refresh token currently held by this user, if any.
    pub refresh_token_hash: Option<String>,
    pub refresh_token_expires_at: Option<DateTime<Utc>>,
}

impl UserCredentials {
    pub fn to_user(&self) -> User {
        User {
            user_id: self.user_id,
            email: self.email.clone(),
            username: self.username.clone(),
        }
    }

    /// True when the stored refresh token exists and its expiry is still ahead of `now`.
    pub fn refresh_token_valid_at(&self, now: DateTime<Utc>) -> bool {
        matches!(self.refresh_token_expires_at, Some(expires_at) if expires_at > now)
    }
}

/// Input for creating a user row.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub hashed_password: String,
}

/// Who is acting on chat data.
///
/// Guest traffic is attributed to one configured user id; that id is resolved
/// by [`crate::chat::ChatOrchestrator`] and never compared against elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Identity {
    Registered(Uuid),
    Guest,
}

/// A conversation owned by exactly one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatSession {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

/// A single chat line, authored either by the human or by the assistant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: Uuid,
    pub session_id: Uuid,
    pub content: String,
    pub is_user_message: bool,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewMessage {
    pub session_id: Uuid,
    pub content: String,
    pub is_user_message: bool,
    pub timestamp: DateTime<Utc>,
}

/// How the assistant reply of a turn was obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyOutcome {
    Generated,
    /// The generator failed and a canned reply was stored instead.
    Degraded,
}

/// Both rows written by one chat turn.
#[derive(Debug, Clone)]
pub struct ChatTurn {
    pub user_message: Message,
    pub reply: Message,
    pub outcome: ReplyOutcome,
}
