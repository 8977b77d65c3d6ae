pub mod chat;
pub mod domain;
pub mod ports;
#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use chat::ChatOrchestrator;
pub use domain::{
    ChatSession, ChatTurn, Identity, Message, NewMessage, NewUser, ReplyOutcome, User,
    UserCredentials,
};
pub use ports::{
    ChatRepository, GenerationError, PortError, PortResult, TextGenerationService,
    UserRepository,
};
