//! Integration tests for the session manager using mock collaborators.
//!
//! All tests run with paused Tokio time: sleeps inside the mocks, the
//! retry backoff, and the bootstrap timeout advance instantly and
//! deterministically.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use jwgroup_session::{
    AuthError, AuthProvider, Credentials, Identity, RoleStore, SessionConfig, SessionManager,
    SessionPhase, SignUpRequest,
};
use jwgroup_types::{
    AuthChange, AuthEvent, AuthSession, BackendError, RoleRecord, SubjectId,
};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;

// =========================================================================
// Mock auth provider
// =========================================================================

/// How the mock answers the one-off initial fetch.
enum InitialFetch {
    Ready(Option<AuthSession>),
    /// Waits until the test releases it.
    Gated(oneshot::Receiver<Option<AuthSession>>),
    /// Never answers.
    Hang,
    Fail,
}

struct MockAuth {
    initial: Mutex<Option<InitialFetch>>,
    /// Change stream. Created up front so events emitted before the actor
    /// subscribes are buffered, like a provider replaying its last event.
    tx: mpsc::UnboundedSender<AuthChange>,
    rx: Mutex<Option<mpsc::UnboundedReceiver<AuthChange>>>,
    /// email → (password, subject)
    accounts: Mutex<HashMap<String, (String, String)>>,
    sign_up_metadata: Mutex<Vec<Value>>,
    sign_in_calls: AtomicU32,
    fail_sign_out: bool,
}

impl MockAuth {
    fn new(initial: InitialFetch) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            initial: Mutex::new(Some(initial)),
            tx,
            rx: Mutex::new(Some(rx)),
            accounts: Mutex::new(HashMap::new()),
            sign_up_metadata: Mutex::new(Vec::new()),
            sign_in_calls: AtomicU32::new(0),
            fail_sign_out: false,
        }
    }

    fn with_account(self, email: &str, password: &str, subject: &str) -> Self {
        self.accounts.lock().unwrap().insert(
            email.to_string(),
            (password.to_string(), subject.to_string()),
        );
        self
    }

    fn failing_sign_out(mut self) -> Self {
        self.fail_sign_out = true;
        self
    }

    fn emit(&self, change: AuthChange) {
        self.tx.send(change).unwrap();
    }
}

impl AuthProvider for MockAuth {
    async fn current_session(&self) -> Result<Option<AuthSession>, BackendError> {
        let initial = self.initial.lock().unwrap().take();
        match initial {
            Some(InitialFetch::Ready(session)) => Ok(session),
            Some(InitialFetch::Gated(gate)) => Ok(gate.await.unwrap_or(None)),
            Some(InitialFetch::Hang) => std::future::pending().await,
            Some(InitialFetch::Fail) => Err(BackendError::new("auth endpoint unreachable")),
            None => Ok(None),
        }
    }

    fn subscribe(&self) -> mpsc::UnboundedReceiver<AuthChange> {
        self.rx
            .lock()
            .unwrap()
            .take()
            .unwrap_or_else(|| mpsc::unbounded_channel().1)
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, BackendError> {
        self.sign_in_calls.fetch_add(1, Ordering::SeqCst);
        let account = self.accounts.lock().unwrap().get(email).cloned();
        match account {
            Some((expected, subject)) if expected == password => {
                let session = AuthSession::new(subject.as_str(), "token");
                self.emit(AuthChange::signed_in(session.clone()));
                Ok(session)
            }
            Some(_) | None => Err(BackendError::new("Invalid login credentials")),
        }
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: &Value,
    ) -> Result<(), BackendError> {
        if email.ends_with("@down.test") {
            return Err(BackendError::new("upstream 503"));
        }
        let mut accounts = self.accounts.lock().unwrap();
        if accounts.contains_key(email) {
            return Err(BackendError::with_code(
                "user_already_exists",
                "User already registered",
            ));
        }
        let subject = format!("new-{}", accounts.len());
        accounts.insert(email.to_string(), (password.to_string(), subject));
        self.sign_up_metadata.lock().unwrap().push(metadata.clone());
        Ok(())
    }

    async fn sign_out(&self) -> Result<(), BackendError> {
        if self.fail_sign_out {
            return Err(BackendError::new("network down"));
        }
        self.emit(AuthChange::signed_out());
        Ok(())
    }
}

// =========================================================================
// Mock role store
// =========================================================================

/// One scripted answer from the role table.
#[derive(Clone)]
enum Reply {
    Admin,
    NotAdmin,
    Down,
    After(Duration, Box<Reply>),
    Hang,
}

/// Per-subject scripts; the last reply of a script repeats.
#[derive(Default)]
struct MockRoles {
    scripts: Mutex<HashMap<String, Vec<Reply>>>,
    calls: Mutex<HashMap<String, u32>>,
}

impl MockRoles {
    fn with(self, subject: &str, script: Vec<Reply>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(subject.to_string(), script);
        self
    }

    fn calls(&self, subject: &str) -> u32 {
        self.calls.lock().unwrap().get(subject).copied().unwrap_or(0)
    }

    fn next_reply(&self, subject: &str) -> Reply {
        *self
            .calls
            .lock()
            .unwrap()
            .entry(subject.to_string())
            .or_default() += 1;
        let mut scripts = self.scripts.lock().unwrap();
        match scripts.get_mut(subject) {
            Some(script) if script.len() > 1 => script.remove(0),
            Some(script) => script[0].clone(),
            None => Reply::NotAdmin,
        }
    }
}

impl RoleStore for MockRoles {
    async fn find_role(
        &self,
        subject: &SubjectId,
        role: &str,
    ) -> Result<Option<RoleRecord>, BackendError> {
        let mut reply = self.next_reply(subject.as_str());
        loop {
            match reply {
                Reply::Admin => {
                    return Ok(Some(RoleRecord {
                        user_id: subject.clone(),
                        role: role.to_string(),
                    }));
                }
                Reply::NotAdmin => return Ok(None),
                Reply::Down => return Err(BackendError::new("statement timeout")),
                Reply::After(delay, then) => {
                    tokio::time::sleep(delay).await;
                    reply = *then;
                }
                Reply::Hang => std::future::pending::<()>().await,
            }
        }
    }
}

// =========================================================================
// Helpers
// =========================================================================

fn session(subject: &str) -> AuthSession {
    AuthSession::new(subject, format!("token-{subject}"))
}

fn start(auth: MockAuth, roles: MockRoles) -> (SessionManager<MockAuth>, Arc<MockAuth>, Arc<MockRoles>) {
    let auth = Arc::new(auth);
    let roles = Arc::new(roles);
    let manager =
        SessionManager::start_shared(Arc::clone(&auth), Arc::clone(&roles), SessionConfig::default());
    (manager, auth, roles)
}

/// Waits (in paused time) until the identity satisfies `pred`.
async fn wait_for(manager: &SessionManager<MockAuth>, pred: impl Fn(&Identity) -> bool) -> Identity {
    let mut rx = manager.subscribe();
    let identity = rx.wait_for(|id| pred(id)).await.unwrap();
    identity.clone()
}

fn subject_is(identity: &Identity, subject: &str) -> bool {
    identity.subject.as_ref().map(SubjectId::as_str) == Some(subject)
}

// =========================================================================
// Bootstrap
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_bootstrap_without_session_is_ready_anonymous() {
    let (manager, _, _) = start(MockAuth::new(InitialFetch::Ready(None)), MockRoles::default());

    let identity = manager.wait_until_ready().await.unwrap();

    assert_eq!(identity.phase, SessionPhase::ReadyAnonymous);
    assert!(identity.subject.is_none());
    assert!(!identity.is_admin);
}

#[tokio::test(start_paused = true)]
async fn test_bootstrap_fetch_failure_is_ready_anonymous() {
    let (manager, _, _) = start(MockAuth::new(InitialFetch::Fail), MockRoles::default());

    let identity = manager.wait_until_ready().await.unwrap();

    assert_eq!(identity.phase, SessionPhase::ReadyAnonymous);
}

#[tokio::test(start_paused = true)]
async fn test_bootstrap_admin_session_resolves_admin() {
    let (manager, _, roles) = start(
        MockAuth::new(InitialFetch::Ready(Some(session("u1")))),
        MockRoles::default().with("u1", vec![Reply::Admin]),
    );

    let identity = manager.wait_until_ready().await.unwrap();

    assert!(subject_is(&identity, "u1"));
    assert!(identity.is_admin);
    assert_eq!(identity.phase, SessionPhase::ReadyAuthenticated);
    assert_eq!(roles.calls("u1"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_identity_is_not_ready_while_lookup_runs() {
    let (manager, _, _) = start(
        MockAuth::new(InitialFetch::Ready(Some(session("u1")))),
        MockRoles::default().with(
            "u1",
            vec![Reply::After(Duration::from_secs(2), Box::new(Reply::Admin))],
        ),
    );

    let resolving = wait_for(&manager, |id| id.phase == SessionPhase::Resolving).await;
    assert!(subject_is(&resolving, "u1"));
    assert!(!resolving.ready);
    assert!(!resolving.is_admin);

    let ready = manager.wait_until_ready().await.unwrap();
    assert!(ready.is_admin);
}

// =========================================================================
// Role lookup scenarios
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_sign_in_lookup_recovers_after_two_failures() {
    // u1 signs in; the role query fails twice, then matches.
    let (manager, auth, roles) = start(
        MockAuth::new(InitialFetch::Ready(None)),
        MockRoles::default().with("u1", vec![Reply::Down, Reply::Down, Reply::Admin]),
    );
    manager.wait_until_ready().await.unwrap();

    let started = Instant::now();
    auth.emit(AuthChange::signed_in(session("u1")));
    let identity = wait_for(&manager, |id| subject_is(id, "u1") && id.ready).await;

    assert_eq!(identity.phase, SessionPhase::ReadyAuthenticated);
    assert!(identity.is_admin);
    assert_eq!(roles.calls("u1"), 3);
    // Two backoff sleeps: 1 s, then 1.5 s.
    assert_eq!(started.elapsed(), Duration::from_millis(2500));
}

#[tokio::test(start_paused = true)]
async fn test_sign_in_lookup_no_match_is_not_retried() {
    let (manager, auth, roles) = start(
        MockAuth::new(InitialFetch::Ready(None)),
        MockRoles::default().with("u2", vec![Reply::NotAdmin]),
    );
    manager.wait_until_ready().await.unwrap();

    auth.emit(AuthChange::signed_in(session("u2")));
    let identity = wait_for(&manager, |id| subject_is(id, "u2") && id.ready).await;

    assert_eq!(identity.phase, SessionPhase::ReadyAuthenticated);
    assert!(!identity.is_admin);
    assert_eq!(roles.calls("u2"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_lookup_exhaustion_is_ready_without_admin() {
    let (manager, _, roles) = start(
        MockAuth::new(InitialFetch::Ready(Some(session("u3")))),
        MockRoles::default().with("u3", vec![Reply::Down]),
    );

    let identity = manager.wait_until_ready().await.unwrap();

    assert_eq!(identity.phase, SessionPhase::ReadyAuthenticated);
    assert!(!identity.is_admin);
    assert_eq!(roles.calls("u3"), 4);
}

#[tokio::test(start_paused = true)]
async fn test_stale_lookup_for_previous_subject_is_discarded() {
    // u1's lookup is slow and would grant admin; u2 signs in meanwhile.
    let (manager, auth, _) = start(
        MockAuth::new(InitialFetch::Ready(Some(session("u1")))),
        MockRoles::default()
            .with(
                "u1",
                vec![Reply::After(Duration::from_secs(5), Box::new(Reply::Admin))],
            )
            .with("u2", vec![Reply::NotAdmin]),
    );
    wait_for(&manager, |id| id.phase == SessionPhase::Resolving).await;

    tokio::time::sleep(Duration::from_secs(1)).await;
    auth.emit(AuthChange::signed_in(session("u2")));
    wait_for(&manager, |id| subject_is(id, "u2") && id.ready).await;

    // Let u1's lookup finish.
    tokio::time::sleep(Duration::from_secs(10)).await;

    let identity = manager.current_identity();
    assert!(subject_is(&identity, "u2"));
    assert!(!identity.is_admin);
}

#[tokio::test(start_paused = true)]
async fn test_token_refresh_for_same_subject_keeps_result() {
    let (manager, auth, roles) = start(
        MockAuth::new(InitialFetch::Ready(Some(session("u1")))),
        MockRoles::default().with("u1", vec![Reply::Admin]),
    );
    let before = manager.wait_until_ready().await.unwrap();

    auth.emit(AuthChange {
        event: AuthEvent::TokenRefreshed,
        session: Some(AuthSession::new("u1", "token-refreshed")),
    });
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert_eq!(manager.current_identity(), before);
    assert_eq!(roles.calls("u1"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_initial_event_is_ignored() {
    let (manager, auth, roles) = start(
        MockAuth::new(InitialFetch::Ready(None)),
        MockRoles::default().with("u9", vec![Reply::Admin]),
    );
    manager.wait_until_ready().await.unwrap();

    auth.emit(AuthChange {
        event: AuthEvent::Initial,
        session: Some(session("u9")),
    });
    tokio::time::sleep(Duration::from_secs(1)).await;

    let identity = manager.current_identity();
    assert_eq!(identity.phase, SessionPhase::ReadyAnonymous);
    assert_eq!(roles.calls("u9"), 0);
}

// =========================================================================
// Global timeout
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_hanging_initial_fetch_is_forced_ready_at_timeout() {
    let (manager, _, _) = start(MockAuth::new(InitialFetch::Hang), MockRoles::default());

    tokio::time::sleep(Duration::from_millis(9_900)).await;
    assert!(!manager.current_identity().ready);

    let started = Instant::now();
    let identity = manager.wait_until_ready().await.unwrap();

    assert_eq!(identity.phase, SessionPhase::ReadyAnonymous);
    assert!(started.elapsed() <= Duration::from_millis(100));
}

#[tokio::test(start_paused = true)]
async fn test_hanging_lookup_is_forced_ready_without_admin() {
    let (manager, _, _) = start(
        MockAuth::new(InitialFetch::Ready(Some(session("u1")))),
        MockRoles::default().with("u1", vec![Reply::Hang]),
    );

    let started = Instant::now();
    let identity = manager.wait_until_ready().await.unwrap();

    assert_eq!(started.elapsed(), Duration::from_secs(10));
    assert_eq!(identity.phase, SessionPhase::ReadyAuthenticated);
    assert!(subject_is(&identity, "u1"));
    assert!(!identity.is_admin);
}

#[tokio::test(start_paused = true)]
async fn test_late_lookup_after_timeout_still_grants_admin() {
    let (manager, _, _) = start(
        MockAuth::new(InitialFetch::Ready(Some(session("u1")))),
        MockRoles::default().with(
            "u1",
            vec![Reply::After(Duration::from_secs(15), Box::new(Reply::Admin))],
        ),
    );

    let forced = manager.wait_until_ready().await.unwrap();
    assert!(!forced.is_admin);

    let late = wait_for(&manager, |id| id.is_admin).await;
    assert!(subject_is(&late, "u1"));
    assert_eq!(late.phase, SessionPhase::ReadyAuthenticated);
}

#[tokio::test(start_paused = true)]
async fn test_sign_out_during_bootstrap_is_replayed_after_fetch() {
    let (gate_tx, gate_rx) = oneshot::channel();
    let (manager, auth, roles) = start(
        MockAuth::new(InitialFetch::Gated(gate_rx)),
        MockRoles::default().with("u1", vec![Reply::Admin]),
    );

    auth.emit(AuthChange::signed_out());
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(manager.current_identity().phase, SessionPhase::Bootstrapping);

    gate_tx.send(Some(session("u1"))).unwrap();
    let identity = manager.wait_until_ready().await.unwrap();

    assert_eq!(identity.phase, SessionPhase::ReadyAnonymous);
    assert!(identity.subject.is_none());

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(!manager.current_identity().is_admin);
    assert_eq!(roles.calls("u1"), 0, "no lookup for the signed-out subject");
}

#[tokio::test(start_paused = true)]
async fn test_deferred_sign_in_with_hanging_fetch_and_lookup_is_forced_ready() {
    let auth = MockAuth::new(InitialFetch::Hang);
    auth.emit(AuthChange::signed_in(session("u9")));
    let (manager, _, _) = start(auth, MockRoles::default().with("u9", vec![Reply::Hang]));

    let started = Instant::now();
    let identity = tokio::time::timeout(Duration::from_secs(60), manager.wait_until_ready())
        .await
        .expect("ready within the bootstrap timeout")
        .unwrap();

    assert_eq!(started.elapsed(), Duration::from_secs(10));
    assert_eq!(identity.phase, SessionPhase::ReadyAuthenticated);
    assert!(subject_is(&identity, "u9"));
    assert!(!identity.is_admin);
}

// =========================================================================
// UI operations
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_sign_in_blank_credentials_skip_backend() {
    let (manager, auth, _) = start(MockAuth::new(InitialFetch::Ready(None)), MockRoles::default());

    let err = manager
        .sign_in(&Credentials::new("  ", "secret"))
        .await
        .unwrap_err();

    assert_eq!(err, AuthError::InvalidCredentials);
    assert_eq!(auth.sign_in_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_sign_in_wrong_password_is_invalid_credentials() {
    let (manager, _, _) = start(
        MockAuth::new(InitialFetch::Ready(None))
            .with_account("admin@jwgroup.co.th", "right", "u1"),
        MockRoles::default(),
    );

    let err = manager
        .sign_in(&Credentials::new("admin@jwgroup.co.th", "wrong"))
        .await
        .unwrap_err();

    assert_eq!(err, AuthError::InvalidCredentials);
    assert_eq!(err.user_message(), AuthError::InvalidCredentials.user_message());
}

#[tokio::test(start_paused = true)]
async fn test_sign_in_success_resolves_admin() {
    let (manager, _, _) = start(
        MockAuth::new(InitialFetch::Ready(None))
            .with_account("admin@jwgroup.co.th", "right", "u1"),
        MockRoles::default().with("u1", vec![Reply::Admin]),
    );
    manager.wait_until_ready().await.unwrap();

    manager
        .sign_in(&Credentials::new(" admin@jwgroup.co.th ", "right"))
        .await
        .unwrap();
    let identity = wait_for(&manager, |id| subject_is(id, "u1") && id.ready).await;

    assert!(identity.is_admin);
}

#[tokio::test(start_paused = true)]
async fn test_sign_up_sends_metadata_and_rejects_duplicates() {
    let (manager, auth, _) = start(MockAuth::new(InitialFetch::Ready(None)), MockRoles::default());
    let request = SignUpRequest::new(Credentials::new("staff@jwgroup.co.th", "pw"))
        .with_full_name("Somchai P.");

    manager.sign_up(&request).await.unwrap();
    let err = manager.sign_up(&request).await.unwrap_err();

    assert_eq!(err, AuthError::AlreadyRegistered);
    assert_eq!(
        auth.sign_up_metadata.lock().unwrap().as_slice(),
        &[serde_json::json!({ "full_name": "Somchai P." })]
    );
}

#[tokio::test(start_paused = true)]
async fn test_sign_up_backend_failure_is_unknown() {
    let (manager, _, _) = start(MockAuth::new(InitialFetch::Ready(None)), MockRoles::default());

    let err = manager
        .sign_up(&SignUpRequest::new(Credentials::new("x@down.test", "pw")))
        .await
        .unwrap_err();

    assert!(matches!(err, AuthError::Unknown(_)));
}

#[tokio::test(start_paused = true)]
async fn test_sign_out_clears_admin_then_goes_anonymous() {
    let (manager, _, _) = start(
        MockAuth::new(InitialFetch::Ready(Some(session("u1")))),
        MockRoles::default().with("u1", vec![Reply::Admin]),
    );
    assert!(manager.wait_until_ready().await.unwrap().is_admin);

    manager.sign_out().await;
    let identity = wait_for(&manager, |id| id.phase == SessionPhase::ReadyAnonymous).await;

    assert!(identity.subject.is_none());
    assert!(!identity.is_admin);
}

#[tokio::test(start_paused = true)]
async fn test_sign_out_backend_failure_still_clears_admin() {
    let (manager, _, _) = start(
        MockAuth::new(InitialFetch::Ready(Some(session("u1")))).failing_sign_out(),
        MockRoles::default().with("u1", vec![Reply::Admin]),
    );
    assert!(manager.wait_until_ready().await.unwrap().is_admin);

    manager.sign_out().await;

    let identity = manager.current_identity();
    assert!(!identity.is_admin);
    // No SignedOut event arrived, so the subject is still known.
    assert!(subject_is(&identity, "u1"));
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_keeps_last_identity() {
    let (manager, _, _) = start(MockAuth::new(InitialFetch::Ready(None)), MockRoles::default());
    let ready = manager.wait_until_ready().await.unwrap();

    manager.shutdown().await;
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert_eq!(manager.current_identity(), ready);
    assert_eq!(manager.wait_until_ready().await.unwrap(), ready);
}
