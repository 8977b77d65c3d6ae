//! In-memory implementations of the ports, used by unit and integration tests.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex, MutexGuard,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{ChatSession, Message, NewMessage, NewUser, User, UserCredentials};
use crate::ports::{
    ChatRepository, GenerationError, PortError, PortResult, TextGenerationService, UserRepository,
};

#[derive(Default)]
struct Tables {
    users: Vec<UserCredentials>,
    // (insertion sequence, row)
    sessions: Vec<(u64, ChatSession)>,
    messages: Vec<(u64, Message)>,
    next_seq: u64,
}

impl Tables {
    fn seq(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }

    fn owns(&self, session_id: Uuid, owner: Uuid) -> bool {
        self.sessions
            .iter()
            .any(|(_, s)| s.id == session_id && s.user_id == owner)
    }

    fn drop_sessions(&mut self, doomed: &[Uuid]) {
        self.sessions.retain(|(_, s)| !doomed.contains(&s.id));
        self.messages.retain(|(_, m)| !doomed.contains(&m.session_id));
    }
}

/// Users, sessions and messages kept in one mutex, with the same cascade and
/// compare-and-swap rules as the Postgres adapter.
#[derive(Default)]
pub struct InMemoryStore {
    tables: Mutex<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store with the guest user row already present.
    pub fn with_guest(guest_user_id: Uuid) -> Self {
        let store = Self::new();
        store.lock().users.push(UserCredentials {
            user_id: guest_user_id,
            email: "guest@chatapp.com".to_string(),
            username: "guest@chatapp.com".to_string(),
            hashed_password: "!".to_string(),
            refresh_token_hash: None,
            refresh_token_expires_at: None,
        });
        store
    }

    /// Inserts a user with an unusable password and returns its id.
    pub fn insert_user(&self, email: &str, username: &str) -> Uuid {
        let user_id = Uuid::new_v4();
        self.lock().users.push(UserCredentials {
            user_id,
            email: email.to_string(),
            username: username.to_string(),
            hashed_password: "!".to_string(),
            refresh_token_hash: None,
            refresh_token_expires_at: None,
        });
        user_id
    }

    pub fn credentials(&self, user_id: Uuid) -> Option<UserCredentials> {
        self.lock()
            .users
            .iter()
            .find(|u| u.user_id == user_id)
            .cloned()
    }

    pub fn user_count(&self) -> usize {
        self.lock().users.len()
    }

    pub fn message_count(&self, session_id: Uuid) -> usize {
        self.lock()
            .messages
            .iter()
            .filter(|(_, m)| m.session_id == session_id)
            .count()
    }

    pub fn session_count(&self) -> usize {
        self.lock().sessions.len()
    }

    /// Overrides the stored refresh expiry, e.g. to simulate an expired token.
    pub fn set_refresh_expiry(&self, user_id: Uuid, expires_at: DateTime<Utc>) {
        if let Some(user) = self.lock().users.iter_mut().find(|u| u.user_id == user_id) {
            user.refresh_token_expires_at = Some(expires_at);
        }
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn same(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn create_user(&self, new_user: NewUser) -> PortResult<User> {
        let mut tables = self.lock();
        if tables.users.iter().any(|u| same(&u.email, &new_user.email)) {
            return Err(PortError::Conflict("email".to_string()));
        }
        if tables
            .users
            .iter()
            .any(|u| same(&u.username, &new_user.username))
        {
            return Err(PortError::Conflict("username".to_string()));
        }
        let credentials = UserCredentials {
            user_id: Uuid::new_v4(),
            email: new_user.email,
            username: new_user.username,
            hashed_password: new_user.hashed_password,
            refresh_token_hash: None,
            refresh_token_expires_at: None,
        };
        let user = credentials.to_user();
        tables.users.push(credentials);
        Ok(user)
    }

    async fn find_by_id(&self, user_id: Uuid) -> PortResult<Option<UserCredentials>> {
        Ok(self.credentials(user_id))
    }

    async fn find_by_email(&self, email: &str) -> PortResult<Option<UserCredentials>> {
        Ok(self
            .lock()
            .users
            .iter()
            .find(|u| same(&u.email, email))
            .cloned())
    }

    async fn find_by_username(&self, username: &str) -> PortResult<Option<UserCredentials>> {
        Ok(self
            .lock()
            .users
            .iter()
            .find(|u| same(&u.username, username))
            .cloned())
    }

    async fn find_by_refresh_token(
        &self,
        token_hash: &str,
    ) -> PortResult<Option<UserCredentials>> {
        Ok(self
            .lock()
            .users
            .iter()
            .find(|u| u.refresh_token_hash.as_deref() == Some(token_hash))
            .cloned())
    }

    async fn store_refresh_token(
        &self,
        user_id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        let mut tables = self.lock();
        let user = tables
            .users
            .iter_mut()
            .find(|u| u.user_id == user_id)
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))?;
        user.refresh_token_hash = Some(token_hash.to_string());
        user.refresh_token_expires_at = Some(expires_at);
        Ok(())
    }

    async fn rotate_refresh_token(
        &self,
        user_id: Uuid,
        current_hash: &str,
        new_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> PortResult<bool> {
        let mut tables = self.lock();
        match tables.users.iter_mut().find(|u| {
            u.user_id == user_id && u.refresh_token_hash.as_deref() == Some(current_hash)
        }) {
            Some(user) => {
                user.refresh_token_hash = Some(new_hash.to_string());
                user.refresh_token_expires_at = Some(expires_at);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn update_profile(
        &self,
        user_id: Uuid,
        username: &str,
        email: &str,
    ) -> PortResult<User> {
        let mut tables = self.lock();
        let clash = tables.users.iter().any(|u| {
            u.user_id != user_id && (same(&u.username, username) || same(&u.email, email))
        });
        if clash {
            return Err(PortError::Conflict("username or email".to_string()));
        }
        let user = tables
            .users
            .iter_mut()
            .find(|u| u.user_id == user_id)
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))?;
        user.username = username.to_string();
        user.email = email.to_string();
        Ok(user.to_user())
    }

    async fn update_password_hash(&self, user_id: Uuid, hashed_password: &str) -> PortResult<()> {
        let mut tables = self.lock();
        let user = tables
            .users
            .iter_mut()
            .find(|u| u.user_id == user_id)
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))?;
        user.hashed_password = hashed_password.to_string();
        Ok(())
    }

    async fn delete_user(&self, user_id: Uuid) -> PortResult<bool> {
        let mut tables = self.lock();
        let before = tables.users.len();
        tables.users.retain(|u| u.user_id != user_id);
        if tables.users.len() == before {
            return Ok(false);
        }
        let owned: Vec<Uuid> = tables
            .sessions
            .iter()
            .filter(|(_, s)| s.user_id == user_id)
            .map(|(_, s)| s.id)
            .collect();
        tables.drop_sessions(&owned);
        Ok(true)
    }
}

#[async_trait]
impl ChatRepository for InMemoryStore {
    async fn list_sessions(&self, owner: Uuid) -> PortResult<Vec<ChatSession>> {
        let tables = self.lock();
        let mut rows: Vec<&(u64, ChatSession)> = tables
            .sessions
            .iter()
            .filter(|(_, s)| s.user_id == owner)
            .collect();
        rows.sort_by(|(a_seq, a), (b_seq, b)| {
            b.created_at.cmp(&a.created_at).then(b_seq.cmp(a_seq))
        });
        Ok(rows.into_iter().map(|(_, s)| s.clone()).collect())
    }

    async fn create_session(&self, owner: Uuid, title: &str) -> PortResult<ChatSession> {
        let mut tables = self.lock();
        if !tables.users.iter().any(|u| u.user_id == owner) {
            return Err(PortError::NotFound(format!("User {} not found", owner)));
        }
        let session = ChatSession {
            id: Uuid::new_v4(),
            user_id: owner,
            title: title.to_string(),
            created_at: Utc::now(),
        };
        let seq = tables.seq();
        tables.sessions.push((seq, session.clone()));
        Ok(session)
    }

    async fn delete_sessions(&self, session_ids: &[Uuid], owner: Uuid) -> PortResult<u64> {
        let mut tables = self.lock();
        let doomed: Vec<Uuid> = tables
            .sessions
            .iter()
            .filter(|(_, s)| s.user_id == owner && session_ids.contains(&s.id))
            .map(|(_, s)| s.id)
            .collect();
        tables.drop_sessions(&doomed);
        Ok(doomed.len() as u64)
    }

    async fn session_owned_by(&self, session_id: Uuid, owner: Uuid) -> PortResult<bool> {
        Ok(self.lock().owns(session_id, owner))
    }

    async fn list_messages(&self, session_id: Uuid, owner: Uuid) -> PortResult<Vec<Message>> {
        let tables = self.lock();
        if !tables.owns(session_id, owner) {
            return Ok(Vec::new());
        }
        let mut rows: Vec<&(u64, Message)> = tables
            .messages
            .iter()
            .filter(|(_, m)| m.session_id == session_id)
            .collect();
        rows.sort_by(|(a_seq, a), (b_seq, b)| {
            a.timestamp.cmp(&b.timestamp).then(a_seq.cmp(b_seq))
        });
        Ok(rows.into_iter().map(|(_, m)| m.clone()).collect())
    }

    async fn add_message(&self, owner: Uuid, message: NewMessage) -> PortResult<Message> {
        let mut tables = self.lock();
        if !tables.owns(message.session_id, owner) {
            return Err(PortError::NotFound(format!(
                "Chat session {} not found",
                message.session_id
            )));
        }
        let stored = Message {
            id: Uuid::new_v4(),
            session_id: message.session_id,
            content: message.content,
            is_user_message: message.is_user_message,
            timestamp: message.timestamp,
        };
        let seq = tables.seq();
        tables.messages.push((seq, stored.clone()));
        Ok(stored)
    }
}

/// A text generator that always gives the same answer and counts its calls.
#[derive(Clone)]
pub struct ScriptedTextGenerator {
    answer: Result<String, GenerationError>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedTextGenerator {
    pub fn replying(text: &str) -> Self {
        Self {
            answer: Ok(text.to_string()),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing(error: GenerationError) -> Self {
        Self {
            answer: Err(error),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextGenerationService for ScriptedTextGenerator {
    async fn generate_reply(&self, _prompt: &str) -> Result<String, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.answer.clone()
    }
}
