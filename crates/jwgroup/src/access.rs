//! Admin route guard.
//!
//! Protected admin pages render one of three things: a spinner while the
//! session resolves, the page for admins, or a redirect for everyone else.
//! [`AdminGate`] computes which, from the published [`Identity`].

use jwgroup_session::Identity;
use tokio::sync::watch;

/// What a protected admin route should render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// The session is still resolving. Show a loading state.
    Loading,
    /// Signed in with the admin role.
    Granted,
    /// Anonymous, or signed in without the admin role.
    Denied,
}

/// Watches the session identity and answers [`Access`] questions.
#[derive(Debug, Clone)]
pub struct AdminGate {
    identity: watch::Receiver<Identity>,
}

impl AdminGate {
    pub fn new(identity: watch::Receiver<Identity>) -> Self {
        Self { identity }
    }

    /// Maps an identity to an access decision.
    pub fn check(identity: &Identity) -> Access {
        if !identity.ready {
            Access::Loading
        } else if identity.is_admin && identity.is_authenticated() {
            Access::Granted
        } else {
            Access::Denied
        }
    }

    /// The decision for the identity as of right now.
    pub fn current(&self) -> Access {
        Self::check(&self.identity.borrow())
    }

    /// Waits until the identity is ready and returns the decision.
    ///
    /// If the session actor has stopped, returns the decision for the last
    /// published identity (which may still be `Loading`).
    pub async fn wait(&self) -> Access {
        let mut rx = self.identity.clone();
        if rx.wait_for(|identity| identity.ready).await.is_err() {
            tracing::debug!("session stopped before the identity was ready");
        }
        Self::check(&rx.borrow())
    }
}
