//! The session state machine, free of I/O.
//!
//! [`SessionMachine`] holds the current phase, session and admin flag, and
//! applies one input at a time: the initial fetch result, a live auth
//! change, a finished role lookup, the bootstrap timeout, or a local
//! sign-out request. When an input requires a role lookup it returns an
//! [`Effect`]; the actor in `manager.rs` performs it and feeds the result
//! back in.
//!
//! # Generations
//!
//! Every time the tracked subject changes (or is dropped), `generation` is
//! bumped. A lookup is started *for* a generation and its result is only
//! applied if the generation still matches. That is the whole stale-result
//! rule: no cancellation, late answers for a superseded subject are
//! ignored.

use jwgroup_types::{AuthChange, AuthEvent, AuthSession, SubjectId};

use crate::{Identity, RoleOutcome, SessionPhase};

/// Work the machine asks its driver to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Effect {
    /// Run a role lookup for `subject` and report back with `generation`.
    StartLookup { generation: u64, subject: SubjectId },
}

#[derive(Debug)]
pub(crate) struct SessionMachine {
    phase: SessionPhase,
    session: Option<AuthSession>,
    is_admin: bool,
    generation: u64,
    /// A lookup for the current generation has not reported yet.
    lookup_pending: bool,
    /// The initial fetch has been applied, or the timeout gave up on it.
    bootstrapped: bool,
    /// Latest live change seen before bootstrap finished.
    deferred: Option<AuthChange>,
    /// A local sign-out dropped the admin flag; the provider has not
    /// confirmed yet.
    signing_out: bool,
}

impl SessionMachine {
    pub(crate) fn new() -> Self {
        Self {
            phase: SessionPhase::Bootstrapping,
            session: None,
            is_admin: false,
            generation: 0,
            lookup_pending: false,
            bootstrapped: false,
            deferred: None,
            signing_out: false,
        }
    }

    pub(crate) fn identity(&self) -> Identity {
        Identity {
            subject: self.session.as_ref().map(|s| s.subject.clone()),
            is_admin: self.is_admin,
            ready: self.phase.is_ready(),
            phase: self.phase,
        }
    }

    pub(crate) fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub(crate) fn is_bootstrapped(&self) -> bool {
        self.bootstrapped
    }

    // -- Inputs -----------------------------------------------------------

    /// The explicit initial fetch finished. `None` covers both "no
    /// session" and a failed fetch.
    pub(crate) fn on_initial_fetch(&mut self, session: Option<AuthSession>) -> Vec<Effect> {
        if self.bootstrapped {
            tracing::debug!("initial fetch arrived after bootstrap ended, ignoring");
            return Vec::new();
        }
        self.bootstrapped = true;

        let deferred = self.deferred.take();
        // A sign-out seen during the fetch supersedes whatever it returned.
        let session = match &deferred {
            Some(change) if change.event == AuthEvent::SignedOut => None,
            _ => session,
        };
        let mut effects: Vec<Effect> = self.adopt(session).into_iter().collect();
        if let Some(change) = deferred {
            tracing::debug!(event = %change.event, "replaying change deferred during bootstrap");
            effects.extend(self.on_auth_change(change));
        }
        effects
    }

    /// A change arrived on the provider's stream.
    pub(crate) fn on_auth_change(&mut self, change: AuthChange) -> Option<Effect> {
        match change.event {
            // The explicit fetch owns the initial state.
            AuthEvent::Initial => None,
            _ if !self.bootstrapped => {
                self.deferred = Some(change);
                None
            }
            AuthEvent::SignedOut => {
                self.become_anonymous();
                None
            }
            AuthEvent::TokenRefreshed if self.signing_out => {
                // A refresh racing a local sign-out must not restore admin.
                if let Some(session) = change.session {
                    if self.session.as_ref().map(|s| &s.subject) == Some(&session.subject) {
                        self.session = Some(session);
                    }
                }
                None
            }
            AuthEvent::SignedIn | AuthEvent::TokenRefreshed => match change.session {
                Some(session) => self.adopt(Some(session)),
                None => {
                    tracing::warn!(event = %change.event, "change without a session, ignoring");
                    None
                }
            },
        }
    }

    /// A role lookup started for `generation` finished. Returns `false`
    /// if the result was stale and discarded.
    pub(crate) fn on_lookup_complete(&mut self, generation: u64, outcome: &RoleOutcome) -> bool {
        if generation != self.generation || !self.lookup_pending {
            return false;
        }
        self.lookup_pending = false;
        self.is_admin = outcome.is_admin();
        self.phase = SessionPhase::ReadyAuthenticated;
        true
    }

    /// The bootstrap timeout fired. Forces a ready state if we are still
    /// loading; a no-op otherwise.
    pub(crate) fn on_timeout(&mut self) -> Vec<Effect> {
        match self.phase {
            SessionPhase::Bootstrapping => {
                // Give up on the initial fetch; live events own the state
                // from here on.
                self.bootstrapped = true;
                self.phase = SessionPhase::ReadyAnonymous;
                let effects: Vec<Effect> = self
                    .deferred
                    .take()
                    .and_then(|change| self.on_auth_change(change))
                    .into_iter()
                    .collect();
                // The timer is spent; a replayed sign-in is ready without
                // admin until its lookup reports.
                if self.phase == SessionPhase::Resolving {
                    self.phase = SessionPhase::ReadyAuthenticated;
                }
                effects
            }
            SessionPhase::Resolving => {
                // Subject known, role unknown: authenticated without admin
                // until the lookup (still pending) reports.
                self.phase = SessionPhase::ReadyAuthenticated;
                Vec::new()
            }
            SessionPhase::ReadyAuthenticated | SessionPhase::ReadyAnonymous => Vec::new(),
        }
    }

    /// The UI asked to sign out. The admin flag drops right away and any
    /// in-flight lookup is abandoned; the subject stays until the
    /// provider confirms with `SignedOut`.
    pub(crate) fn on_sign_out_requested(&mut self) {
        self.is_admin = false;
        self.signing_out = self.session.is_some();
        if self.lookup_pending {
            self.generation += 1;
            self.lookup_pending = false;
        }
        if self.phase == SessionPhase::Resolving {
            self.phase = SessionPhase::ReadyAuthenticated;
        }
    }

    // -- Transitions ------------------------------------------------------

    fn adopt(&mut self, session: Option<AuthSession>) -> Option<Effect> {
        let Some(session) = session else {
            self.become_anonymous();
            return None;
        };

        // After a local sign-out the old result is gone, so even the same
        // subject needs a fresh lookup.
        let same_subject = !self.signing_out
            && self
                .session
                .as_ref()
                .is_some_and(|current| current.subject == session.subject);
        if same_subject {
            // Token refresh or repeated sign-in: keep the lookup (or its
            // result) and just take the newer session.
            self.session = Some(session);
            return None;
        }

        self.generation += 1;
        self.lookup_pending = true;
        self.is_admin = false;
        self.signing_out = false;
        self.phase = SessionPhase::Resolving;
        let subject = session.subject.clone();
        self.session = Some(session);
        tracing::debug!(%subject, generation = self.generation, "resolving new subject");

        Some(Effect::StartLookup {
            generation: self.generation,
            subject,
        })
    }

    fn become_anonymous(&mut self) {
        if self.lookup_pending {
            self.generation += 1;
        }
        self.lookup_pending = false;
        self.signing_out = false;
        self.session = None;
        self.is_admin = false;
        self.phase = SessionPhase::ReadyAnonymous;
    }
}
