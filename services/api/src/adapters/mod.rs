pub mod db;
pub mod gemini;

pub use db::DbAdapter;
pub use gemini::GeminiChatAdapter;
