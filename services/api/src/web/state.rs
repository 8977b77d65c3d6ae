//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::auth::{AuthError, AuthService};
use crate::config::{Config, ConfigError};
use crate::error::ApiError;
use chat_core::chat::ChatOrchestrator;
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub auth: AuthService,
    pub chat: ChatOrchestrator,
    pub config: Arc<Config>,
}

impl AppState {
    /// Fails unless `GUEST_USER_ID` names an existing user row. Migrations
    /// only seed the default id, so any other value must be provisioned by hand.
    pub async fn check_guest_user(&self) -> Result<(), ApiError> {
        match self.auth.get_profile(self.config.guest_user_id).await {
            Ok(_) => Ok(()),
            Err(AuthError::UserNotFound) => Err(ConfigError::InvalidValue(
                "GUEST_USER_ID".to_string(),
                format!("no user with id {} exists", self.config.guest_user_id),
            )
            .into()),
            Err(e) => Err(e.into()),
        }
    }
}
