//! crates/chat_core/src/chat.rs
//!
//! The chat orchestrator: owner-scoped session/message operations and the
//! single-turn flow that stores a user line, asks the text generator for a
//! reply and stores that reply.

use std::sync::Arc;

use chrono::{DateTime, Duration, SubsecRound, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::{
    ChatSession, ChatTurn, Identity, Message, NewMessage, ReplyOutcome, DEFAULT_SESSION_TITLE,
};
use crate::ports::{ChatRepository, GenerationError, PortError, PortResult, TextGenerationService};

pub const RATE_LIMITED_REPLY: &str = "Rate limit reached. Please wait and try again later.";
pub const UNAVAILABLE_REPLY: &str = "Service is temporarily unavailable. Please try again later.";
pub const TROUBLE_REPLY: &str = "I'm having trouble responding right now. Please try again later.";
pub const EMPTY_REPLY: &str = "No response generated.";

/// Turns a generator result into the text that gets stored as the assistant message.
pub fn reply_text(result: Result<String, GenerationError>) -> (String, ReplyOutcome) {
    match result {
        Ok(text) if text.trim().is_empty() => (EMPTY_REPLY.to_string(), ReplyOutcome::Generated),
        Ok(text) => (text, ReplyOutcome::Generated),
        Err(GenerationError::RateLimited) => {
            warn!("Text generation rate limit reached.");
            (RATE_LIMITED_REPLY.to_string(), ReplyOutcome::Degraded)
        }
        Err(GenerationError::Unavailable) => {
            warn!("Text generation service unavailable.");
            (UNAVAILABLE_REPLY.to_string(), ReplyOutcome::Degraded)
        }
        Err(GenerationError::Other(reason)) => {
            tracing::error!("Error calling text generation service: {}", reason);
            (TROUBLE_REPLY.to_string(), ReplyOutcome::Degraded)
        }
    }
}

#[derive(Clone)]
pub struct ChatOrchestrator {
    chats: Arc<dyn ChatRepository>,
    generator: Arc<dyn TextGenerationService>,
    guest_user_id: Uuid,
}

impl ChatOrchestrator {
    pub fn new(
        chats: Arc<dyn ChatRepository>,
        generator: Arc<dyn TextGenerationService>,
        guest_user_id: Uuid,
    ) -> Self {
        Self {
            chats,
            generator,
            guest_user_id,
        }
    }

    /// The user id that owns data created by `identity`.
    pub fn owner_of(&self, identity: Identity) -> Uuid {
        match identity {
            Identity::Registered(user_id) => user_id,
            Identity::Guest => self.guest_user_id,
        }
    }

    /// True if `candidate` names the configured guest user.
    pub fn is_guest_id(&self, candidate: Uuid) -> bool {
        candidate == self.guest_user_id
    }

    pub async fn list_sessions(&self, identity: Identity) -> PortResult<Vec<ChatSession>> {
        self.chats.list_sessions(self.owner_of(identity)).await
    }

    pub async fn create_session(
        &self,
        identity: Identity,
        title: Option<&str>,
    ) -> PortResult<ChatSession> {
        let title = title
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(DEFAULT_SESSION_TITLE);
        let session = self
            .chats
            .create_session(self.owner_of(identity), title)
            .await?;
        info!("Created chat session {} for {:?}", session.id, identity);
        Ok(session)
    }

    /// Deletes the owned subset of `session_ids`; zero means nothing matched.
    pub async fn delete_sessions(&self, identity: Identity, session_ids: &[Uuid]) -> PortResult<u64> {
        if session_ids.is_empty() {
            return Ok(0);
        }
        let deleted = self
            .chats
            .delete_sessions(session_ids, self.owner_of(identity))
            .await?;
        info!("Deleted {} chat session(s) for {:?}", deleted, identity);
        Ok(deleted)
    }

    /// Messages of an owned session, oldest first.
    pub async fn list_messages(&self, identity: Identity, session_id: Uuid) -> PortResult<Vec<Message>> {
        let owner = self.owner_of(identity);
        self.ensure_owned(session_id, owner).await?;
        self.chats.list_messages(session_id, owner).await
    }

    pub async fn add_user_message(
        &self,
        identity: Identity,
        session_id: Uuid,
        content: &str,
    ) -> PortResult<Message> {
        self.insert(identity, session_id, content, true, stored_now())
            .await
    }

    pub async fn add_bot_response(
        &self,
        identity: Identity,
        session_id: Uuid,
        content: &str,
    ) -> PortResult<Message> {
        self.insert(identity, session_id, content, false, stored_now())
            .await
    }

    /// Runs one chat turn.
    ///
    /// The user message is durable before the generator is called. Generator
    /// failures become a canned assistant message, so a turn on an owned
    /// session always stores exactly two rows.
    pub async fn send_message(
        &self,
        identity: Identity,
        session_id: Uuid,
        content: &str,
    ) -> PortResult<ChatTurn> {
        let owner = self.owner_of(identity);
        self.ensure_owned(session_id, owner).await?;

        let user_message = self.add_user_message(identity, session_id, content).await?;

        let (reply_content, outcome) = reply_text(self.generator.generate_reply(content).await);

        // Keep the reply strictly after the user line even on coarse clocks.
        let reply_at = later_than(user_message.timestamp, stored_now());
        let reply = self
            .insert(identity, session_id, &reply_content, false, reply_at)
            .await?;

        Ok(ChatTurn {
            user_message,
            reply,
            outcome,
        })
    }

    /// One-off generation that is not stored anywhere.
    pub async fn generate_sample(&self, prompt: &str) -> String {
        reply_text(self.generator.generate_reply(prompt).await).0
    }

    async fn ensure_owned(&self, session_id: Uuid, owner: Uuid) -> PortResult<()> {
        if self.chats.session_owned_by(session_id, owner).await? {
            Ok(())
        } else {
            Err(PortError::NotFound(format!("Chat session {} not found", session_id)))
        }
    }

    async fn insert(
        &self,
        identity: Identity,
        session_id: Uuid,
        content: &str,
        is_user_message: bool,
        timestamp: DateTime<Utc>,
    ) -> PortResult<Message> {
        self.chats
            .add_message(
                self.owner_of(identity),
                NewMessage {
                    session_id,
                    content: content.to_string(),
                    is_user_message,
                    timestamp,
                },
            )
            .await
    }
}

/// Current time at the microsecond precision Postgres keeps for `timestamptz`.
fn stored_now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

fn later_than(previous: DateTime<Utc>, candidate: DateTime<Utc>) -> DateTime<Utc> {
    let previous = previous.trunc_subsecs(6);
    let candidate = candidate.trunc_subsecs(6);
    if candidate > previous {
        candidate
    } else {
        previous + Duration::microseconds(1)
    }
}
