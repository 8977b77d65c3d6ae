//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `UserRepository` and `ChatRepository` ports from the `core` crate. It
//! handles all interactions with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chat_core::domain::{ChatSession, Message, NewMessage, NewUser, User, UserCredentials};
use chat_core::ports::{ChatRepository, PortError, PortResult, UserRepository};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the repository ports.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

/// Maps unique-index violations on the users table to `Conflict`, naming the column.
fn user_write_error(e: sqlx::Error) -> PortError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() {
            let field = match db_err.constraint() {
                Some(name) if name.contains("username") => "username",
                Some(name) if name.contains("email") => "email",
                _ => "user",
            };
            return PortError::Conflict(field.to_string());
        }
    }
    unexpected(e)
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

const USER_COLUMNS: &str =
    "id, email, username, password_hash, refresh_token_hash, refresh_token_expires_at";

#[derive(FromRow)]
struct UserRecord {
    id: Uuid,
    email: String,
    username: String,
    password_hash: String,
    refresh_token_hash: Option<String>,
    refresh_token_expires_at: Option<DateTime<Utc>>,
}
impl UserRecord {
    fn to_credentials(self) -> UserCredentials {
        UserCredentials {
            user_id: self.id,
            email: self.email,
            username: self.username,
            hashed_password: self.password_hash,
            refresh_token_hash: self.refresh_token_hash,
            refresh_token_expires_at: self.refresh_token_expires_at,
        }
    }

    fn to_domain(self) -> User {
        User {
            user_id: self.id,
            email: self.email,
            username: self.username,
        }
    }
}

#[derive(FromRow)]
struct SessionRecord {
    id: Uuid,
    user_id: Uuid,
    title: String,
    created_at: DateTime<Utc>,
}
impl SessionRecord {
    fn to_domain(self) -> ChatSession {
        ChatSession {
            id: self.id,
            user_id: self.user_id,
            title: self.title,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct MessageRecord {
    id: Uuid,
    session_id: Uuid,
    content: String,
    is_user_message: bool,
    created_at: DateTime<Utc>,
}
impl MessageRecord {
    fn to_domain(self) -> Message {
        Message {
            id: self.id,
            session_id: self.session_id,
            content: self.content,
            is_user_message: self.is_user_message,
            timestamp: self.created_at,
        }
    }
}

//=========================================================================================
// `UserRepository` Trait Implementation
//=========================================================================================

impl DbAdapter {
    async fn find_user_where(
        &self,
        predicate: &str,
        value: &str,
    ) -> PortResult<Option<UserCredentials>> {
        let sql = format!("SELECT {} FROM users WHERE {}", USER_COLUMNS, predicate);
        let record = sqlx::query_as::<_, UserRecord>(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(record.map(UserRecord::to_credentials))
    }
}

#[async_trait]
impl UserRepository for DbAdapter {
    async fn create_user(&self, new_user: NewUser) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "INSERT INTO users (id, email, username, password_hash) VALUES ($1, $2, $3, $4) RETURNING {}",
            USER_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(&new_user.email)
        .bind(&new_user.username)
        .bind(&new_user.hashed_password)
        .fetch_one(&self.pool)
        .await
        .map_err(user_write_error)?;
        Ok(record.to_domain())
    }

    async fn find_by_id(&self, user_id: Uuid) -> PortResult<Option<UserCredentials>> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.map(UserRecord::to_credentials))
    }

    async fn find_by_email(&self, email: &str) -> PortResult<Option<UserCredentials>> {
        self.find_user_where("LOWER(email) = LOWER($1)", email).await
    }

    async fn find_by_username(&self, username: &str) -> PortResult<Option<UserCredentials>> {
        self.find_user_where("LOWER(username) = LOWER($1)", username)
            .await
    }

    async fn find_by_refresh_token(
        &self,
        token_hash: &str,
    ) -> PortResult<Option<UserCredentials>> {
        self.find_user_where("refresh_token_hash = $1", token_hash)
            .await
    }

    async fn store_refresh_token(
        &self,
        user_id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        let result = sqlx::query(
            "UPDATE users SET refresh_token_hash = $2, refresh_token_expires_at = $3 WHERE id = $1",
        )
        .bind(user_id)
        .bind(token_hash)
        .bind(expires_at)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;

        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("User {} not found", user_id)));
        }
        Ok(())
    }

    async fn rotate_refresh_token(
        &self,
        user_id: Uuid,
        current_hash: &str,
        new_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> PortResult<bool> {
        let result = sqlx::query(
            "UPDATE users SET refresh_token_hash = $3, refresh_token_expires_at = $4 \
             WHERE id = $1 AND refresh_token_hash = $2",
        )
        .bind(user_id)
        .bind(current_hash)
        .bind(new_hash)
        .bind(expires_at)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(result.rows_affected() == 1)
    }

    async fn update_profile(
        &self,
        user_id: Uuid,
        username: &str,
        email: &str,
    ) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "UPDATE users SET username = $2, email = $3 WHERE id = $1 RETURNING {}",
            USER_COLUMNS
        ))
        .bind(user_id)
        .bind(username)
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(user_write_error)?;

        record
            .map(UserRecord::to_domain)
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))
    }

    async fn update_password_hash(&self, user_id: Uuid, hashed_password: &str) -> PortResult<()> {
        let result = sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
            .bind(user_id)
            .bind(hashed_password)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;

        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("User {} not found", user_id)));
        }
        Ok(())
    }

    async fn delete_user(&self, user_id: Uuid) -> PortResult<bool> {
        // Sessions and messages go with the user through ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(result.rows_affected() > 0)
    }
}

//=========================================================================================
// `ChatRepository` Trait Implementation
//=========================================================================================

#[async_trait]
impl ChatRepository for DbAdapter {
    async fn list_sessions(&self, owner: Uuid) -> PortResult<Vec<ChatSession>> {
        let records = sqlx::query_as::<_, SessionRecord>(
            "SELECT id, user_id, title, created_at FROM chat_sessions \
             WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(owner)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(SessionRecord::to_domain).collect())
    }

    async fn create_session(&self, owner: Uuid, title: &str) -> PortResult<ChatSession> {
        let record = sqlx::query_as::<_, SessionRecord>(
            "INSERT INTO chat_sessions (id, user_id, title, created_at) VALUES ($1, $2, $3, $4) \
             RETURNING id, user_id, title, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(owner)
        .bind(title)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
                PortError::NotFound(format!("User {} not found", owner))
            }
            _ => unexpected(e),
        })?;
        Ok(record.to_domain())
    }

    async fn delete_sessions(&self, session_ids: &[Uuid], owner: Uuid) -> PortResult<u64> {
        let result = sqlx::query("DELETE FROM chat_sessions WHERE id = ANY($1) AND user_id = $2")
            .bind(session_ids)
            .bind(owner)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(result.rows_affected())
    }

    async fn session_owned_by(&self, session_id: Uuid, owner: Uuid) -> PortResult<bool> {
        let owned: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM chat_sessions WHERE id = $1 AND user_id = $2)",
        )
        .bind(session_id)
        .bind(owner)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(owned)
    }

    async fn list_messages(&self, session_id: Uuid, owner: Uuid) -> PortResult<Vec<Message>> {
        let records = sqlx::query_as::<_, MessageRecord>(
            "SELECT m.id, m.session_id, m.content, m.is_user_message, m.created_at \
             FROM messages m JOIN chat_sessions s ON s.id = m.session_id \
             WHERE m.session_id = $1 AND s.user_id = $2 \
             ORDER BY m.created_at ASC",
        )
        .bind(session_id)
        .bind(owner)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(MessageRecord::to_domain).collect())
    }

    async fn add_message(&self, owner: Uuid, message: NewMessage) -> PortResult<Message> {
        // The ownership check and the insert are one statement, so a session
        // deleted in between simply yields no row.
        let record = sqlx::query_as::<_, MessageRecord>(
            "INSERT INTO messages (id, session_id, content, is_user_message, created_at) \
             SELECT $1::uuid, $2::uuid, $3::text, $4::boolean, $5::timestamptz \
             WHERE EXISTS (SELECT 1 FROM chat_sessions WHERE id = $2 AND user_id = $6) \
             RETURNING id, session_id, content, is_user_message, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(message.session_id)
        .bind(&message.content)
        .bind(message.is_user_message)
        .bind(message.timestamp)
        .bind(owner)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;

        record.map(MessageRecord::to_domain).ok_or_else(|| {
            PortError::NotFound(format!("Chat session {} not found", message.session_id))
        })
    }
}
