//! Error types for the document assistant

use thiserror::Error;

/// Result type alias for assistant operations
pub type Result<T> = std::result::Result<T, AssistantError>;

#[derive(Error, Debug)]
pub enum AssistantError {

    // =============================
    // Tooling Errors
    // =============================

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Invalid tool input: {0}")]
    InvalidToolInput(String),

    // =============================
    // Session Errors
    // =============================

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Invalid session id: {0}")]
    InvalidSessionId(String),

    #[error("Session persistence error: {0}")]
    SessionError(String),

    #[error("Configuration error: {0}")]
    Config(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// A metadata value that cannot be read as a number.
///
/// Raised per record while deriving amounts and always swallowed there;
/// the field is then treated as absent.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("cannot convert metadata value {value:?} to a number")]
pub struct ConversionError {
    pub value: String,
}
