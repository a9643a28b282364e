//! Shared types for the JW Group admin console.
//!
//! This crate is the vocabulary every other crate speaks:
//!
//! - **Identity** ([`SubjectId`], [`AuthSession`]) — who is signed in,
//!   as reported by the hosted auth provider.
//! - **Auth events** ([`AuthEvent`], [`AuthChange`]) — the live change
//!   stream the session layer reconciles with its initial fetch.
//! - **Roles** ([`RoleRecord`]) — rows of the role table used to derive
//!   the admin flag.
//! - **Ordered rows** ([`OrderedItem`], [`decode_rows`]) — admin-editable
//!   entities that carry a persisted position column.
//! - **Errors** ([`TypesError`], [`BackendError`]) — malformed rows, and
//!   the single failure type every backend collaborator reports.
//!
//! # Architecture
//!
//! ```text
//! jwgroup (facade)  ← context object handed to the UI layer
//!     ↕
//! jwgroup-session / jwgroup-ordering  ← coordination logic
//!     ↕
//! jwgroup-types (this crate)  ← identifiers, events, rows
//! ```

mod error;
mod rows;
mod types;

pub use error::{BackendError, TypesError};
pub use rows::{decode_rows, sort_by_position};
pub use types::{
    AuthChange, AuthEvent, AuthSession, ItemId, NoticeKind, OrderedItem,
    RoleRecord, SubjectId,
};
