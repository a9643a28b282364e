//! Unified error type for the admin console core.

use std::path::PathBuf;

use jwgroup_ordering::OrderingError;
use jwgroup_session::{AuthError, SessionError};
use jwgroup_types::TypesError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each wrapping variant generates the `From`
/// impl, so `?` converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum ConsoleError {
    /// Sign-in or sign-up was rejected.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// The session actor is gone.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Loading or reordering a collection failed.
    #[error(transparent)]
    Ordering(#[from] OrderingError),

    /// A backend row could not be decoded.
    #[error(transparent)]
    Types(#[from] TypesError),

    /// An admin-only operation was attempted without admin access.
    #[error("admin access required")]
    AccessDenied,

    /// The config file could not be read.
    #[error("failed to read config file {path}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The config JSON is malformed.
    #[error("invalid console config: {0}")]
    ConfigParse(#[from] serde_json::Error),
}
