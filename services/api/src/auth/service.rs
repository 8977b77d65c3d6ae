//! services/api/src/auth/service.rs
//!
//! `AuthService` owns the credential rules. It only talks to storage through
//! the `UserRepository` port.

use std::sync::Arc;

use chat_core::domain::{NewUser, User};
use chat_core::ports::{PortError, UserRepository};
use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::{password, tokens, AuthError};
use crate::config::JwtSettings;

/// A freshly issued access/refresh pair.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    pub refresh_expires_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    jwt: JwtSettings,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserRepository>, jwt: JwtSettings) -> Self {
        Self { users, jwt }
    }

    pub fn jwt_settings(&self) -> &JwtSettings {
        &self.jwt
    }

    /// Creates an account. Registration never logs the user in.
    pub async fn register(
        &self,
        email: &str,
        username: &str,
        password: &str,
        confirm_password: &str,
    ) -> Result<User, AuthError> {
        if self.users.find_by_email(email).await?.is_some() {
            return Err(AuthError::EmailAlreadyRegistered);
        }
        if password != confirm_password {
            return Err(AuthError::PasswordMismatch);
        }
        if self.users.find_by_username(username).await?.is_some() {
            return Err(AuthError::UsernameTaken);
        }
        let problems = password::policy_violations(password);
        if !problems.is_empty() {
            return Err(AuthError::WeakPassword(problems));
        }

        let hashed_password = password::hash_password(password)?;
        let user = self
            .users
            .create_user(NewUser {
                email: email.to_string(),
                username: username.to_string(),
                hashed_password,
            })
            .await
            .map_err(|e| match e {
                // Lost a race with a concurrent registration.
                PortError::Conflict(what) if what.contains("username") => AuthError::UsernameTaken,
                PortError::Conflict(_) => AuthError::EmailAlreadyRegistered,
                other => AuthError::Port(other),
            })?;
        info!("Registered user {}", user.user_id);
        Ok(user)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<TokenPair, AuthError> {
        let credentials = self
            .users
            .find_by_email(email)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        if !password::verify_password(password, &credentials.hashed_password) {
            warn!("Failed login for user {}", credentials.user_id);
            return Err(AuthError::InvalidCredentials);
        }

        let pair = self.issue_pair(credentials.user_id, &credentials.email)?;
        self.users
            .store_refresh_token(
                credentials.user_id,
                &tokens::refresh_token_digest(&pair.refresh_token),
                pair.refresh_expires_at,
            )
            .await?;
        info!("User {} logged in", credentials.user_id);
        Ok(pair)
    }

    /// Exchanges a refresh token for a new pair. The presented token is spent.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        let current_hash = tokens::refresh_token_digest(refresh_token);
        let credentials = self
            .users
            .find_by_refresh_token(&current_hash)
            .await?
            .ok_or(AuthError::InvalidOrExpiredRefreshToken)?;

        if !credentials.refresh_token_valid_at(Utc::now()) {
            return Err(AuthError::InvalidOrExpiredRefreshToken);
        }

        let pair = self.issue_pair(credentials.user_id, &credentials.email)?;
        let rotated = self
            .users
            .rotate_refresh_token(
                credentials.user_id,
                &current_hash,
                &tokens::refresh_token_digest(&pair.refresh_token),
                pair.refresh_expires_at,
            )
            .await?;
        if !rotated {
            warn!(
                "Refresh token for user {} was rotated concurrently",
                credentials.user_id
            );
            return Err(AuthError::InvalidOrExpiredRefreshToken);
        }
        Ok(pair)
    }

    pub async fn get_profile(&self, user_id: Uuid) -> Result<User, AuthError> {
        self.users
            .find_by_id(user_id)
            .await?
            .map(|credentials| credentials.to_user())
            .ok_or(AuthError::UserNotFound)
    }

    pub async fn update_profile(
        &self,
        user_id: Uuid,
        username: &str,
        email: &str,
    ) -> Result<User, AuthError> {
        let current = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        let username_changed = !current.username.eq_ignore_ascii_case(username);
        let email_changed = !current.email.eq_ignore_ascii_case(email);

        if username_changed {
            if let Some(other) = self.users.find_by_username(username).await? {
                if other.user_id != user_id {
                    return Err(AuthError::UsernameTaken);
                }
            }
        }
        if email_changed {
            if let Some(other) = self.users.find_by_email(email).await? {
                if other.user_id != user_id {
                    return Err(AuthError::EmailTaken);
                }
            }
        }
        if !username_changed && !email_changed {
            return Ok(current.to_user());
        }

        let username = if username_changed { username } else { current.username.as_str() };
        let email = if email_changed { email } else { current.email.as_str() };
        let updated = self
            .users
            .update_profile(user_id, username, email)
            .await
            .map_err(|e| match e {
                PortError::Conflict(what) if what.contains("email") => AuthError::EmailTaken,
                PortError::Conflict(_) => AuthError::UsernameTaken,
                PortError::NotFound(_) => AuthError::UserNotFound,
                other => AuthError::Port(other),
            })?;
        info!("Updated profile of user {}", user_id);
        Ok(updated)
    }

    pub async fn change_password(
        &self,
        user_id: Uuid,
        current_password: &str,
        new_password: &str,
        confirm_new_password: &str,
    ) -> Result<User, AuthError> {
        let credentials = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        if new_password != confirm_new_password {
            return Err(AuthError::PasswordMismatch);
        }
        if !password::verify_password(current_password, &credentials.hashed_password) {
            return Err(AuthError::CurrentPasswordIncorrect);
        }
        let problems = password::policy_violations(new_password);
        if !problems.is_empty() {
            return Err(AuthError::WeakPassword(problems));
        }

        let hashed = password::hash_password(new_password)?;
        self.users.update_password_hash(user_id, &hashed).await?;
        info!("Changed password of user {}", user_id);
        Ok(credentials.to_user())
    }

    pub async fn delete_user(&self, user_id: Uuid) -> Result<(), AuthError> {
        if self.users.delete_user(user_id).await? {
            info!("Deleted user {}", user_id);
            Ok(())
        } else {
            Err(AuthError::UserNotFound)
        }
    }

    fn issue_pair(&self, user_id: Uuid, email: &str) -> Result<TokenPair, AuthError> {
        Ok(TokenPair {
            access_token: tokens::create_access_token(user_id, email, &self.jwt)?,
            refresh_token: tokens::generate_refresh_token(),
            expires_in: i64::from(self.jwt.expire_hours) * 3600,
            refresh_expires_at: Utc::now() + Duration::days(tokens::REFRESH_TOKEN_LIFETIME_DAYS),
        })
    }
}
