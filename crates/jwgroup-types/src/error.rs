//! Error types for the shared types layer.
//!
//! Each crate in the workspace defines its own error enum. A `TypesError`
//! always means a backend row did not have the shape we expected; it never
//! means the network failed.

/// Errors that can occur while decoding backend rows.
#[derive(Debug, thiserror::Error)]
pub enum TypesError {
    /// The payload was not valid JSON, or not the JSON type we asked for.
    ///
    /// The inner `serde_json::Error` is kept so the log line shows the
    /// exact line/column serde gave up at.
    #[error("decode failed: {0}")]
    Decode(#[from] serde_json::Error),

    /// The JSON parsed, but a row is missing a required column or carries
    /// a value of the wrong type (e.g. a string in the position column).
    #[error("invalid row: {0}")]
    InvalidRow(String),
}

/// A failure reported by the hosted backend or the network in front of it.
///
/// Collaborator traits (auth, role store, order store) all fail with this
/// one type. It says nothing about *which* operation failed;
/// the caller knows that and decides whether to retry, roll back, or map
/// it to a user-facing message.
///
/// `code` is the provider's machine-readable error code when it sends one
/// (e.g. `"invalid_credentials"`); `message` is the raw text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("backend error: {message}")]
pub struct BackendError {
    pub code: Option<String>,
    pub message: String,
}

impl BackendError {
    /// An error with a message and no code.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }

    /// An error with both a provider code and a message.
    pub fn with_code(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            message: message.into(),
        }
    }
}
