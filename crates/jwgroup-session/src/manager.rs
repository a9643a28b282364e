//! The session manager: an actor that owns the current identity.
//!
//! The state lives in a single Tokio task (the actor). Everything else
//! talks to it by message:
//!
//! ```text
//!  auth provider ──changes──▶ ┐
//!  initial fetch ──result───▶ │
//!  lookup tasks ──outcome───▶ ├─▶ SessionActor ──watch──▶ Identity (UI)
//!  SessionManager ──command─▶ │
//!  bootstrap timer ─────────▶ ┘
//! ```
//!
//! The identity is published through a `tokio::sync::watch` channel, so
//! readers always see the latest value without locking and can await
//! changes.
//!
//! # Stale results
//!
//! Role lookups run in their own spawned tasks and report back tagged
//! with the generation they were started for. The state machine drops any
//! result whose generation is no longer current; in-flight network calls
//! are never cancelled, only ignored.

use std::sync::Arc;

use jwgroup_types::{AuthSession, BackendError, SubjectId};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use crate::machine::{Effect, SessionMachine};
use crate::{
    AuthError, AuthProvider, Credentials, Identity, RoleOutcome, RoleStore, SessionConfig,
    SessionError, SignUpRequest, lookup_role,
};

/// Command channel size. Commands are rare (sign-out, shutdown).
const COMMAND_CHANNEL_SIZE: usize = 8;

/// Commands sent to the session actor.
///
/// The `oneshot::Sender` is a reply channel: the caller waits on it to
/// know the command has been applied.
enum SessionCommand {
    /// Drop the admin flag now, before the backend is asked to sign out.
    SignOutRequested { reply: oneshot::Sender<()> },

    /// Stop the actor.
    Shutdown,
}

/// Handle to the running session actor.
///
/// This is the context object handed to the UI layer. It is cheap to
/// clone: an `Arc` to the provider plus channel handles.
pub struct SessionManager<A: AuthProvider> {
    auth: Arc<A>,
    commands: mpsc::Sender<SessionCommand>,
    identity: watch::Receiver<Identity>,
}

impl<A: AuthProvider> Clone for SessionManager<A> {
    fn clone(&self) -> Self {
        Self {
            auth: Arc::clone(&self.auth),
            commands: self.commands.clone(),
            identity: self.identity.clone(),
        }
    }
}

impl<A: AuthProvider> SessionManager<A> {
    /// Spawns the session actor and returns a handle to it.
    ///
    /// Must be called from inside a Tokio runtime. The actor subscribes to
    /// the provider's change stream *before* issuing the initial fetch, so
    /// no change can fall between the two.
    pub fn start<R: RoleStore>(auth: A, roles: R, config: SessionConfig) -> Self {
        Self::start_shared(Arc::new(auth), Arc::new(roles), config)
    }

    /// Like [`start`](Self::start), for collaborators that are already
    /// shared with other parts of the console.
    pub fn start_shared<R: RoleStore>(auth: Arc<A>, roles: Arc<R>, config: SessionConfig) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_CHANNEL_SIZE);
        let (identity_tx, identity_rx) = watch::channel(Identity::bootstrapping());

        let actor = SessionActor {
            auth: Arc::clone(&auth),
            roles,
            config,
            machine: SessionMachine::new(),
            identity: identity_tx,
        };
        tokio::spawn(actor.run(cmd_rx));

        Self {
            auth,
            commands: cmd_tx,
            identity: identity_rx,
        }
    }

    /// The identity as of right now. Never blocks.
    pub fn current_identity(&self) -> Identity {
        self.identity.borrow().clone()
    }

    /// A receiver that observes every identity change.
    pub fn subscribe(&self) -> watch::Receiver<Identity> {
        self.identity.clone()
    }

    /// Waits until the identity is ready (role resolved, anonymous, or
    /// forced by the bootstrap timeout) and returns it.
    ///
    /// # Errors
    /// [`SessionError::Stopped`] if the actor stopped before becoming ready.
    pub async fn wait_until_ready(&self) -> Result<Identity, SessionError> {
        let mut rx = self.identity.clone();
        let identity = rx
            .wait_for(|identity| identity.ready)
            .await
            .map_err(|_| SessionError::Stopped)?;
        Ok(identity.clone())
    }

    /// Signs in with email and password.
    ///
    /// On success the provider emits `SignedIn`, which the actor turns
    /// into a role lookup; this method does not wait for that. Await
    /// [`wait_until_ready`](Self::wait_until_ready) or watch
    /// [`subscribe`](Self::subscribe) for the resolved identity.
    ///
    /// # Errors
    /// - [`AuthError::InvalidCredentials`] — wrong pair, or a blank field
    /// - [`AuthError::Unknown`] — anything else the backend reported
    pub async fn sign_in(&self, credentials: &Credentials) -> Result<(), AuthError> {
        if credentials.is_blank() {
            return Err(AuthError::InvalidCredentials);
        }

        match self
            .auth
            .sign_in_with_password(credentials.email.trim(), &credentials.password)
            .await
        {
            Ok(session) => {
                tracing::info!(subject = %session.subject, "signed in");
                Ok(())
            }
            Err(err) => Err(auth_failure("sign-in", &err)),
        }
    }

    /// Creates an account.
    ///
    /// # Errors
    /// - [`AuthError::InvalidCredentials`] — blank email or password
    /// - [`AuthError::AlreadyRegistered`] — the email already has an account
    /// - [`AuthError::Unknown`] — anything else the backend reported
    pub async fn sign_up(&self, request: &SignUpRequest) -> Result<(), AuthError> {
        let credentials = &request.credentials;
        if credentials.is_blank() {
            return Err(AuthError::InvalidCredentials);
        }

        self.auth
            .sign_up(
                credentials.email.trim(),
                &credentials.password,
                &request.metadata(),
            )
            .await
            .map_err(|err| auth_failure("sign-up", &err))?;

        tracing::info!(email = %credentials.email.trim(), "account created");
        Ok(())
    }

    /// Signs out.
    ///
    /// The admin flag is cleared first, so admin-only UI disappears
    /// immediately; then the backend is asked to invalidate the session.
    /// A backend failure is logged, not returned.
    pub async fn sign_out(&self) {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self
            .commands
            .send(SessionCommand::SignOutRequested { reply: reply_tx })
            .await
            .is_ok()
        {
            let _ = reply_rx.await;
        }

        if let Err(err) = self.auth.sign_out().await {
            tracing::warn!(error = %err, "backend sign-out failed");
        }
    }

    /// Stops the actor. Identity receivers keep the last published value.
    pub async fn shutdown(&self) {
        let _ = self.commands.send(SessionCommand::Shutdown).await;
    }
}

/// Maps and logs a sign-in/sign-up failure.
fn auth_failure(action: &str, err: &BackendError) -> AuthError {
    let mapped = AuthError::from_backend(err);
    match &mapped {
        AuthError::Unknown(_) => {
            tracing::warn!(action, error = %err, "auth request failed");
        }
        known => {
            tracing::info!(action, reason = %known, "auth request rejected");
        }
    }
    mapped
}

// ---------------------------------------------------------------------------
// Actor
// ---------------------------------------------------------------------------

/// The internal session actor state. Runs inside a Tokio task.
struct SessionActor<A: AuthProvider, R: RoleStore> {
    auth: Arc<A>,
    roles: Arc<R>,
    config: SessionConfig,
    machine: SessionMachine,
    identity: watch::Sender<Identity>,
}

impl<A: AuthProvider, R: RoleStore> SessionActor<A, R> {
    /// Runs the actor loop until shutdown or until every handle is gone.
    async fn run(mut self, mut commands: mpsc::Receiver<SessionCommand>) {
        tracing::debug!("session actor started");

        let mut changes = self.auth.subscribe();
        let mut changes_open = true;

        let auth = Arc::clone(&self.auth);
        let mut initial: JoinHandle<Result<Option<AuthSession>, BackendError>> =
            tokio::spawn(async move { auth.current_session().await });
        let mut fetch_done = false;

        let (lookup_tx, mut lookup_rx) = mpsc::unbounded_channel::<(u64, RoleOutcome)>();

        let deadline = tokio::time::sleep(self.config.bootstrap_timeout());
        tokio::pin!(deadline);
        let mut timer_armed = true;

        loop {
            tokio::select! {
                joined = &mut initial, if !fetch_done => {
                    fetch_done = true;
                    let session = match joined {
                        Ok(Ok(session)) => session,
                        Ok(Err(err)) => {
                            tracing::warn!(error = %err, "initial session fetch failed");
                            None
                        }
                        Err(err) => {
                            tracing::error!(error = %err, "initial session fetch task died");
                            None
                        }
                    };
                    let effects = self.machine.on_initial_fetch(session);
                    self.perform(effects, &lookup_tx);
                }

                change = changes.recv(), if changes_open => match change {
                    Some(change) => {
                        tracing::debug!(event = %change.event, "auth change");
                        let effect = self.machine.on_auth_change(change);
                        self.perform(effect, &lookup_tx);
                    }
                    None => {
                        tracing::debug!("auth change stream closed");
                        changes_open = false;
                    }
                },

                Some((generation, outcome)) = lookup_rx.recv() => {
                    if !self.machine.on_lookup_complete(generation, &outcome) {
                        tracing::debug!(generation, "discarding stale role lookup result");
                    }
                }

                () = &mut deadline, if timer_armed => {
                    timer_armed = false;
                    if !self.machine.phase().is_ready() {
                        tracing::warn!(
                            phase = %self.machine.phase(),
                            timeout_ms = self.config.bootstrap_timeout_ms,
                            "session bootstrap timed out, forcing ready state"
                        );
                    }
                    let effects = self.machine.on_timeout();
                    self.perform(effects, &lookup_tx);
                }

                cmd = commands.recv() => match cmd {
                    Some(SessionCommand::SignOutRequested { reply }) => {
                        self.machine.on_sign_out_requested();
                        self.publish();
                        let _ = reply.send(());
                    }
                    Some(SessionCommand::Shutdown) | None => break,
                },
            }

            // The timeout only guards the bootstrap phase.
            if timer_armed && self.machine.is_bootstrapped() && self.machine.phase().is_ready() {
                timer_armed = false;
            }
            self.publish();
        }

        if !fetch_done {
            initial.abort();
        }
        tracing::debug!("session actor stopped");
    }

    /// Spawns a lookup task for each effect.
    fn perform(
        &self,
        effects: impl IntoIterator<Item = Effect>,
        lookup_tx: &mpsc::UnboundedSender<(u64, RoleOutcome)>,
    ) {
        for effect in effects {
            match effect {
                Effect::StartLookup {
                    generation,
                    subject,
                } => self.spawn_lookup(generation, subject, lookup_tx.clone()),
            }
        }
    }

    fn spawn_lookup(
        &self,
        generation: u64,
        subject: SubjectId,
        reply: mpsc::UnboundedSender<(u64, RoleOutcome)>,
    ) {
        let roles = Arc::clone(&self.roles);
        let role = self.config.admin_role.clone();
        let policy = self.config.role_lookup.clone();
        tokio::spawn(async move {
            let outcome = lookup_role(roles.as_ref(), &subject, &role, &policy).await;
            // The actor may be gone; nobody is left to care.
            let _ = reply.send((generation, outcome));
        });
    }

    /// Publishes the machine's identity if it changed.
    fn publish(&self) {
        let next = self.machine.identity();
        self.identity.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                tracing::debug!(
                    phase = %next.phase,
                    subject = ?next.subject,
                    is_admin = next.is_admin,
                    "identity changed"
                );
                *current = next;
                true
            }
        });
    }
}
