//! Error types for the session layer.

use jwgroup_types::BackendError;

/// Errors returned to the UI from sign-in and sign-up.
///
/// The `#[error]` text of each known variant is the fixed, human-readable
/// message shown to the user. Raw backend strings only ever surface
/// through [`AuthError::Unknown`], and even then [`AuthError::user_message`]
/// hides them.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// Wrong email/password pair, or an empty field caught before the
    /// backend was called.
    #[error("invalid email or password")]
    InvalidCredentials,

    /// Sign-up with an email that already has an account.
    #[error("an account with this email already exists")]
    AlreadyRegistered,

    /// Anything else the backend reported. Carries the raw message for
    /// logs.
    #[error("authentication failed: {0}")]
    Unknown(String),
}

/// Provider error codes that mean "wrong credentials".
const INVALID_CREDENTIAL_CODES: &[&str] = &["invalid_credentials", "invalid_grant"];

/// Provider error codes that mean "email already taken".
const ALREADY_REGISTERED_CODES: &[&str] = &["user_already_exists", "email_exists"];

impl AuthError {
    /// Maps a backend failure onto the taxonomy.
    ///
    /// The provider's error code wins when present. Older provider
    /// versions only send a message, so the well-known message texts are
    /// matched as a fallback (case-insensitive).
    pub fn from_backend(err: &BackendError) -> Self {
        if let Some(code) = err.code.as_deref() {
            if INVALID_CREDENTIAL_CODES.contains(&code) {
                return Self::InvalidCredentials;
            }
            if ALREADY_REGISTERED_CODES.contains(&code) {
                return Self::AlreadyRegistered;
            }
        }

        let message = err.message.to_lowercase();
        if message.contains("invalid login credentials") {
            Self::InvalidCredentials
        } else if message.contains("already registered") {
            Self::AlreadyRegistered
        } else {
            Self::Unknown(err.message.clone())
        }
    }

    /// The message to show in the UI. Never contains backend text.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::InvalidCredentials => "Invalid email or password.",
            Self::AlreadyRegistered => "An account with this email already exists.",
            Self::Unknown(_) => "Something went wrong. Please try again.",
        }
    }
}

/// Errors from talking to the session manager itself.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The manager's actor task has stopped (shut down or panicked), so
    /// no further identity updates will arrive.
    #[error("session manager is not running")]
    Stopped,
}
