//! services/api/src/auth/mod.rs
//!
//! The token service: registration, login, refresh-token rotation and the
//! account operations that sit next to them.

pub mod password;
pub mod service;
pub mod tokens;

pub use service::{AuthService, TokenPair};

use chat_core::ports::PortError;

/// Every way an account operation can fail.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Email is already registered")]
    EmailAlreadyRegistered,
    #[error("Passwords do not match")]
    PasswordMismatch,
    #[error("Password does not meet the requirements")]
    WeakPassword(Vec<String>),
    #[error("User not found")]
    UserNotFound,
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Invalid or expired refresh token")]
    InvalidOrExpiredRefreshToken,
    #[error("Username is already taken")]
    UsernameTaken,
    #[error("Email is already taken")]
    EmailTaken,
    #[error("Current password is incorrect")]
    CurrentPasswordIncorrect,
    #[error("Failed to hash password: {0}")]
    Hashing(String),
    #[error("Failed to sign token: {0}")]
    Token(String),
    #[error(transparent)]
    Port(#[from] PortError),
}
