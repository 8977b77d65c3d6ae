//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use tracing::Level;
use uuid::Uuid;

/// The fixed id of the seeded guest account (see `migrations/0002_seed_guest_user.sql`).
pub const DEFAULT_GUEST_USER_ID: &str = "f6de90d5-4490-46e2-82d4-cae4df7a9eaf";
pub const DEFAULT_LLM_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/openai";

const MIN_JWT_KEY_BYTES: usize = 32;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Deployment flavour; controls cookie `SameSite` and Swagger exposure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

/// Settings used to sign and validate access tokens.
#[derive(Clone)]
pub struct JwtSettings {
    pub key: String,
    pub issuer: String,
    pub audience: String,
    pub expire_hours: u32,
}

impl std::fmt::Debug for JwtSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtSettings")
            .field("key", &"<redacted>")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("expire_hours", &self.expire_hours)
            .finish()
    }
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub log_level: Level,
    pub environment: Environment,
    pub jwt: JwtSettings,
    pub guest_user_id: Uuid,
    pub gemini_api_key: Option<String>,
    pub llm_api_base: String,
    pub chat_model: String,
    pub allowed_origins: Vec<String>,
    pub enable_swagger: bool,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(var: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // --- Load Server and Database Settings ---
        let bind_address_str = var("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let database_url =
            var("DATABASE_URL").ok_or_else(|| ConfigError::MissingVar("DATABASE_URL".to_string()))?;

        let log_level_str = var("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let environment = match var("APP_ENV")
            .unwrap_or_else(|| "development".to_string())
            .to_lowercase()
            .as_str()
        {
            "development" | "dev" => Environment::Development,
            "production" | "prod" => Environment::Production,
            other => {
                return Err(ConfigError::InvalidValue(
                    "APP_ENV".to_string(),
                    format!("'{}' is not one of development, production", other),
                ))
            }
        };

        // --- Load Token Settings ---
        let jwt_key = var("JWT_KEY").ok_or_else(|| ConfigError::MissingVar("JWT_KEY".to_string()))?;
        if jwt_key.len() < MIN_JWT_KEY_BYTES {
            return Err(ConfigError::InvalidValue(
                "JWT_KEY".to_string(),
                format!("must be at least {} bytes long", MIN_JWT_KEY_BYTES),
            ));
        }
        let expire_hours = match var("JWT_EXPIRE_HOURS") {
            Some(raw) => raw
                .parse::<u32>()
                .ok()
                .filter(|hours| *hours > 0)
                .ok_or_else(|| {
                    ConfigError::InvalidValue(
                        "JWT_EXPIRE_HOURS".to_string(),
                        format!("'{}' is not a positive number of hours", raw),
                    )
                })?,
            None => 1,
        };
        let jwt = JwtSettings {
            key: jwt_key,
            issuer: var("JWT_ISSUER").unwrap_or_else(|| "chat-api".to_string()),
            audience: var("JWT_AUDIENCE").unwrap_or_else(|| "chat-frontend".to_string()),
            expire_hours,
        };

        let guest_str = var("GUEST_USER_ID").unwrap_or_else(|| DEFAULT_GUEST_USER_ID.to_string());
        let guest_user_id = Uuid::parse_str(&guest_str)
            .map_err(|e| ConfigError::InvalidValue("GUEST_USER_ID".to_string(), e.to_string()))?;

        // --- Load API Keys (as optional) ---
        let gemini_api_key = var("GEMINI_API_KEY");

        // --- Load Adapter-specific Settings ---
        let llm_api_base = var("GEMINI_API_BASE").unwrap_or_else(|| DEFAULT_LLM_API_BASE.to_string());
        let chat_model = var("CHAT_MODEL").unwrap_or_else(|| "gemini-1.5-flash-latest".to_string());

        let allowed_origins = var("ALLOWED_ORIGINS")
            .unwrap_or_else(|| "http://localhost:5173,http://localhost".to_string())
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect();

        let enable_swagger = var("ENABLE_SWAGGER")
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            environment,
            jwt,
            guest_user_id,
            gemini_api_key,
            llm_api_base,
            chat_model,
            allowed_origins,
            enable_swagger,
        })
    }

    pub fn swagger_enabled(&self) -> bool {
        self.enable_swagger || self.environment == Environment::Development
    }
}
