//! Collaborator traits for the hosted auth provider and the role table.
//!
//! The console doesn't implement authentication itself; a hosted
//! backend-as-a-service does. This module defines the two seams the
//! session layer needs from it, so the real SDK client, an in-memory
//! backend, and test doubles are interchangeable.
//!
//! # Trait bounds
//!
//! - `Send + Sync + 'static` → the implementation is shared (behind an
//!   `Arc`) with the session actor and the role-lookup tasks it spawns.
//! - Every async method returns `impl Future + Send` so those tasks can
//!   run on any runtime worker thread. Implementors can simply write
//!   `async fn`.

use std::future::Future;

use jwgroup_types::{AuthChange, AuthSession, BackendError, RoleRecord, SubjectId};
use serde_json::Value;
use tokio::sync::mpsc;

/// The hosted auth provider.
///
/// # Example
///
/// ```rust
/// use jwgroup_session::AuthProvider;
/// use jwgroup_types::{AuthChange, AuthSession, BackendError};
/// use serde_json::Value;
/// use tokio::sync::mpsc;
///
/// /// Nobody is ever signed in. Useful for rendering the public site.
/// struct Anonymous;
///
/// impl AuthProvider for Anonymous {
///     async fn current_session(&self) -> Result<Option<AuthSession>, BackendError> {
///         Ok(None)
///     }
///
///     fn subscribe(&self) -> mpsc::UnboundedReceiver<AuthChange> {
///         // Dropping the sender closes the stream immediately.
///         mpsc::unbounded_channel().1
///     }
///
///     async fn sign_in_with_password(
///         &self,
///         _email: &str,
///         _password: &str,
///     ) -> Result<AuthSession, BackendError> {
///         Err(BackendError::with_code("invalid_credentials", "no accounts"))
///     }
///
///     async fn sign_up(
///         &self,
///         _email: &str,
///         _password: &str,
///         _metadata: &Value,
///     ) -> Result<(), BackendError> {
///         Err(BackendError::new("sign-up disabled"))
///     }
///
///     async fn sign_out(&self) -> Result<(), BackendError> {
///         Ok(())
///     }
/// }
/// ```
pub trait AuthProvider: Send + Sync + 'static {
    /// Returns the session the provider currently holds, if any.
    ///
    /// Called exactly once, when the session manager starts. An `Err` is
    /// treated as "no session".
    fn current_session(
        &self,
    ) -> impl Future<Output = Result<Option<AuthSession>, BackendError>> + Send;

    /// Subscribes to the provider's change stream.
    ///
    /// The returned receiver is the subscription handle: dropping it
    /// unsubscribes. The provider may emit an
    /// [`Initial`](jwgroup_types::AuthEvent::Initial) event first; the
    /// session layer ignores it.
    fn subscribe(&self) -> mpsc::UnboundedReceiver<AuthChange>;

    /// Email/password sign-in. On success the provider also emits a
    /// `SignedIn` change.
    fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = Result<AuthSession, BackendError>> + Send;

    /// Creates an account. `metadata` is stored on the user record by the
    /// provider (display name, etc.).
    fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: &Value,
    ) -> impl Future<Output = Result<(), BackendError>> + Send;

    /// Invalidates the current session. On success the provider emits a
    /// `SignedOut` change.
    fn sign_out(&self) -> impl Future<Output = Result<(), BackendError>> + Send;
}

/// Read access to the role table.
pub trait RoleStore: Send + Sync + 'static {
    /// Looks up the single row matching `(subject, role)`.
    ///
    /// # Returns
    /// - `Ok(Some(record))` — the subject has the role
    /// - `Ok(None)` — the subject definitely does not have the role. This
    ///   is a valid answer, not a failure, and is never retried.
    /// - `Err(_)` — the lookup itself failed (network, backend down)
    fn find_role(
        &self,
        subject: &SubjectId,
        role: &str,
    ) -> impl Future<Output = Result<Option<RoleRecord>, BackendError>> + Send;
}
