//! Session types: what the UI sees, and how the manager is configured.

use std::fmt;
use std::time::Duration;

use jwgroup_retry::RetryPolicy;
use jwgroup_types::SubjectId;
use serde::Deserialize;
use serde_json::{Map, Value};

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Configuration for session behavior.
///
/// Sensible defaults are provided; `#[serde(default)]` lets a JSON config
/// override just the fields it cares about.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// How long (in milliseconds) the console may stay in a loading state
    /// after start-up before a ready state is forced.
    ///
    /// Default: 10 000 ms.
    pub bootstrap_timeout_ms: u64,

    /// The role name that grants admin access.
    ///
    /// Default: `"admin"`.
    pub admin_role: String,

    /// Retry schedule for role lookups that fail with a transport error.
    ///
    /// Default: 3 retries, 1 s initial delay, ×1.5 per retry.
    pub role_lookup: RetryPolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            bootstrap_timeout_ms: 10_000,
            admin_role: "admin".to_string(),
            role_lookup: RetryPolicy::default(),
        }
    }
}

impl SessionConfig {
    /// The bootstrap timeout as a `Duration`.
    pub fn bootstrap_timeout(&self) -> Duration {
        Duration::from_millis(self.bootstrap_timeout_ms)
    }
}

// ---------------------------------------------------------------------------
// SessionPhase
// ---------------------------------------------------------------------------

/// Where the session manager is in resolving the current identity.
///
/// | from            | trigger                         | to                   |
/// |-----------------|---------------------------------|----------------------|
/// | Bootstrapping   | initial fetch: subject          | Resolving            |
/// | Bootstrapping   | initial fetch: none             | ReadyAnonymous       |
/// | Bootstrapping   | bootstrap timeout               | ReadyAnonymous       |
/// | any (fetched)   | live event: new subject         | Resolving            |
/// | any (fetched)   | live event: signed out          | ReadyAnonymous       |
/// | Resolving       | lookup finished (any outcome)   | ReadyAuthenticated   |
/// | Resolving       | bootstrap timeout               | ReadyAuthenticated   |
///
/// The two `Ready*` states are terminal for a given session; a new
/// subject re-enters `Resolving`, a sign-out goes straight to
/// `ReadyAnonymous`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Neither the initial fetch nor the timeout has completed.
    Bootstrapping,
    /// A subject is known and its role lookup is in flight.
    Resolving,
    /// A subject is known and its admin flag is final.
    ReadyAuthenticated,
    /// Nobody is signed in.
    ReadyAnonymous,
}

impl SessionPhase {
    /// Returns `true` for the two `Ready*` states.
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::ReadyAuthenticated | Self::ReadyAnonymous)
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bootstrapping => write!(f, "Bootstrapping"),
            Self::Resolving => write!(f, "Resolving"),
            Self::ReadyAuthenticated => write!(f, "ReadyAuthenticated"),
            Self::ReadyAnonymous => write!(f, "ReadyAnonymous"),
        }
    }
}

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// The UI-facing view of the current principal.
///
/// `is_admin` is only meaningful once `ready` is `true`; before that it is
/// always `false`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub subject: Option<SubjectId>,
    pub is_admin: bool,
    pub ready: bool,
    pub phase: SessionPhase,
}

impl Identity {
    /// The identity before anything is known.
    pub fn bootstrapping() -> Self {
        Self {
            subject: None,
            is_admin: false,
            ready: false,
            phase: SessionPhase::Bootstrapping,
        }
    }

    /// Returns `true` if somebody is signed in.
    pub fn is_authenticated(&self) -> bool {
        self.subject.is_some()
    }
}

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// Email/password pair for sign-in.
///
/// `Debug` is implemented by hand so passwords never end up in logs.
#[derive(Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    /// `true` if either field is blank. Such credentials are rejected
    /// before the backend is called.
    pub fn is_blank(&self) -> bool {
        self.email.trim().is_empty() || self.password.is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Everything the sign-up form collects.
#[derive(Debug, Clone)]
pub struct SignUpRequest {
    pub credentials: Credentials,
    /// Stored as `full_name` in the provider's user metadata.
    pub full_name: Option<String>,
}

impl SignUpRequest {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            full_name: None,
        }
    }

    pub fn with_full_name(mut self, name: impl Into<String>) -> Self {
        self.full_name = Some(name.into());
        self
    }

    /// The user metadata object sent with the sign-up call.
    pub fn metadata(&self) -> Value {
        let mut map = Map::new();
        if let Some(name) = &self.full_name {
            map.insert("full_name".to_string(), Value::String(name.clone()));
        }
        Value::Object(map)
    }
}
