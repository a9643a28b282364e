//! Session management for the JW Group admin console.
//!
//! This crate answers one question for the UI layer: *who is signed in,
//! and are they an admin?* It reconciles two asynchronous sources of
//! truth from the hosted auth provider:
//!
//! 1. **Initial fetch** — the session the provider already holds when the
//!    console starts ([`AuthProvider::current_session`]).
//! 2. **Change stream** — live sign-in / sign-out / token-refresh events
//!    ([`AuthProvider::subscribe`]).
//!
//! and derives the admin flag from a role lookup ([`RoleStore`]) that is
//! retried with backoff on transport failures.
//!
//! # How it fits in the stack
//!
//! ```text
//! UI layer (above)  ← reads Identity { subject, is_admin, ready }
//!     ↕
//! Session layer (this crate)  ← SessionManager actor + state machine
//!     ↕
//! Auth provider / role table (below)  ← hosted backend, behind traits
//! ```
//!
//! The consumer is never left loading forever: a global bootstrap timeout
//! forces a ready state if the backend never answers.

#![allow(async_fn_in_trait)]

mod auth;
mod error;
mod lookup;
mod machine;
mod manager;
mod session;

pub use auth::{AuthProvider, RoleStore};
pub use error::{AuthError, SessionError};
pub use lookup::{RoleOutcome, lookup_role};
pub use manager::SessionManager;
pub use session::{Credentials, Identity, SessionConfig, SessionPhase, SignUpRequest};
