//! Role lookup: derive the admin flag for one subject.
//!
//! A lookup is one retry sequence against the [`RoleStore`]. It has three
//! possible endings and the distinction matters:
//!
//! - a matching row → authorized
//! - no matching row → *not* authorized, a definitive answer, no retry
//! - the query keeps failing → budget exhausted, treated as not authorized
//!
//! Only the third one is an error, and even then it is logged here rather
//! than returned: the UI gets a safe default instead of a failure.

use jwgroup_retry::{RetryPolicy, retry};
use jwgroup_types::{BackendError, SubjectId};

use crate::RoleStore;

/// How a role lookup ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleOutcome {
    /// The subject has the role.
    Authorized,
    /// The store answered and the subject does not have the role.
    NotAuthorized,
    /// Every attempt failed with a transport error.
    Exhausted { attempts: u32, error: BackendError },
}

impl RoleOutcome {
    /// The admin flag this outcome resolves to. Exhaustion is `false`.
    pub fn is_admin(&self) -> bool {
        matches!(self, Self::Authorized)
    }
}

/// Runs one lookup sequence for `(subject, role)` under `policy`.
pub async fn lookup_role<R: RoleStore>(
    store: &R,
    subject: &SubjectId,
    role: &str,
    policy: &RetryPolicy,
) -> RoleOutcome {
    let what = format!("role lookup for {subject}");
    let result = retry(policy, what, move || store.find_role(subject, role)).await;

    match result {
        Ok(Some(_)) => {
            tracing::debug!(%subject, role, "role found");
            RoleOutcome::Authorized
        }
        Ok(None) => {
            tracing::debug!(%subject, role, "role not found");
            RoleOutcome::NotAuthorized
        }
        Err(err) => {
            let attempts = err.attempts();
            let error = err.into_source();
            tracing::error!(
                %subject,
                role,
                attempts,
                error = %error,
                "role lookup exhausted retries, treating as not authorized"
            );
            RoleOutcome::Exhausted { attempts, error }
        }
    }
}
