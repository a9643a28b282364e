//! Core types shared by the session and ordering layers.
//!
//! Everything here mirrors something the hosted backend hands us: a user
//! id, a session, an auth change event, a role row. The types are plain
//! data with serde derives so test doubles and demo backends can build them
//! from JSON fixtures.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use std::fmt;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// The unique identifier of an authenticated principal.
///
/// The auth provider hands out opaque strings (UUIDs in practice). We wrap
/// the string in a newtype so a `SubjectId` can never be passed where an
/// [`ItemId`] is expected, even though both are strings underneath.
///
/// `#[serde(transparent)]` serializes this as the bare string, so a
/// `SubjectId("u1")` is just `"u1"` in JSON.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubjectId(pub String);

impl SubjectId {
    /// Returns the raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SubjectId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Display lets us use `%subject` in tracing fields.
impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The primary key of a row in an ordered admin table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub String);

impl ItemId {
    /// Returns the raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ItemId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Sessions and auth events
// ---------------------------------------------------------------------------

/// A live session as reported by the auth provider.
///
/// Only `subject` matters to the coordination logic. The token and expiry
/// are carried along so a `TokenRefreshed` event can replace them without
/// restarting the role lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    /// Who this session belongs to.
    pub subject: SubjectId,

    /// The email the user signed in with, if the provider reports it.
    #[serde(default)]
    pub email: Option<String>,

    /// Bearer token for backend calls. Opaque to us.
    pub access_token: String,

    /// Expiry as seconds since the Unix epoch, if known.
    #[serde(default)]
    pub expires_at: Option<u64>,
}

impl AuthSession {
    /// Builds a session with just a subject and token. Handy in tests and
    /// in-memory backends.
    pub fn new(subject: impl Into<SubjectId>, access_token: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            email: None,
            access_token: access_token.into(),
            expires_at: None,
        }
    }
}

/// The kind of change reported on the auth provider's change stream.
///
/// The JSON names match what hosted auth providers emit
/// (`"SIGNED_IN"`, `"TOKEN_REFRESHED"`, ...), so fixtures can be pasted
/// straight from provider logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthEvent {
    /// Emitted once on subscribe with whatever session the provider
    /// already had. The session layer skips it: the explicit initial fetch
    /// owns the first state.
    #[serde(rename = "INITIAL_SESSION")]
    Initial,

    /// A user signed in (or a session was restored in another tab).
    SignedIn,

    /// The session ended, either by request or by expiry.
    SignedOut,

    /// The access token was renewed. Same subject, new token.
    TokenRefreshed,
}

impl fmt::Display for AuthEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Initial => write!(f, "INITIAL_SESSION"),
            Self::SignedIn => write!(f, "SIGNED_IN"),
            Self::SignedOut => write!(f, "SIGNED_OUT"),
            Self::TokenRefreshed => write!(f, "TOKEN_REFRESHED"),
        }
    }
}

/// One item on the auth change stream: the event plus the session the
/// provider attached to it (`None` for sign-out).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthChange {
    pub event: AuthEvent,
    pub session: Option<AuthSession>,
}

impl AuthChange {
    /// Shorthand for a `SignedIn` change carrying `session`.
    pub fn signed_in(session: AuthSession) -> Self {
        Self {
            event: AuthEvent::SignedIn,
            session: Some(session),
        }
    }

    /// Shorthand for a `SignedOut` change.
    pub fn signed_out() -> Self {
        Self {
            event: AuthEvent::SignedOut,
            session: None,
        }
    }

    /// The subject this change refers to, if any.
    pub fn subject(&self) -> Option<&SubjectId> {
        self.session.as_ref().map(|s| &s.subject)
    }
}

/// A row of the role table: `(user_id, role)`.
///
/// The admin flag is derived from the existence of a row with
/// `role == "admin"` for the subject; it is never a column on the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleRecord {
    pub user_id: SubjectId,
    pub role: String,
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

/// The flavour of a user-facing toast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeKind {
    Success,
    Error,
}

impl fmt::Display for NoticeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Error => write!(f, "error"),
        }
    }
}

// ---------------------------------------------------------------------------
// Ordered rows
// ---------------------------------------------------------------------------

/// An admin-editable row with a persisted position column (an executive,
/// a project, a timeline event).
///
/// `position` is pulled out of the row so the ordering logic can work on
/// it directly; every other column stays in `fields` untouched. The name
/// of the position column is table configuration, which is why this type
/// has no serde derive: see [`OrderedItem::from_row`] and
/// [`OrderedItem::to_row`].
#[derive(Debug, Clone, PartialEq)]
pub struct OrderedItem {
    pub id: ItemId,
    pub position: i64,
    pub fields: Map<String, Value>,
}

impl OrderedItem {
    /// Builds an item with no domain fields.
    pub fn new(id: impl Into<ItemId>, position: i64) -> Self {
        Self {
            id: id.into(),
            position,
            fields: Map::new(),
        }
    }

    /// Builder-style setter for a domain field.
    pub fn with_field(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(name.to_string(), value.into());
        self
    }

    /// Returns a domain field by column name.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Converts back into a flat JSON row with `id` and the position column
    /// alongside the domain fields.
    pub fn to_row(&self, position_field: &str) -> Value {
        let mut row = self.fields.clone();
        row.insert("id".to_string(), Value::String(self.id.0.clone()));
        row.insert(position_field.to_string(), Value::from(self.position));
        Value::Object(row)
    }
}

impl From<String> for ItemId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<String> for SubjectId {
    fn from(value: String) -> Self {
        Self(value)
    }
}
