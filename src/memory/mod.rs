//! Session Memory
//!
//! Conversation history and per-session state persisted to disk,
//! so a session can be resumed across processes.

pub mod session;
pub mod store;

pub use session::{validate_session_id, SessionState, SessionStore};
pub use store::{ConversationHistory, ConversationMessage, MessageRole};
