use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use jwgroup::prelude::*;
use serde_json::{Value, json};
use tokio::sync::mpsc;

// ---------------------------------------------------------------------------
// In-memory backend
// ---------------------------------------------------------------------------

/// Simulated round-trip time for every backend call.
const LATENCY: Duration = Duration::from_millis(40);

/// Everything the hosted backend would hold, shared by all adapters.
#[derive(Default)]
struct Backend {
    /// email → (password, subject)
    accounts: HashMap<String, (String, String)>,
    /// (subject, role)
    roles: HashSet<(String, String)>,
    tables: HashMap<String, Vec<Value>>,
    /// Subject of the current session, if any.
    session: Option<String>,
    listeners: Vec<mpsc::UnboundedSender<AuthChange>>,
    /// Writes to these row ids fail, to show the rollback path.
    broken_rows: HashSet<String>,
}

#[derive(Clone, Default)]
struct Memory(Arc<Mutex<Backend>>);

impl Memory {
    fn lock(&self) -> Result<MutexGuard<'_, Backend>, BackendError> {
        self.0
            .lock()
            .map_err(|_| BackendError::new("backend state poisoned"))
    }

    fn seed(&self) -> Result<(), BackendError> {
        let mut db = self.lock()?;
        db.accounts.insert(
            "admin@jwgroup.co.th".into(),
            ("correct horse".into(), "3f1c-admin".into()),
        );
        db.accounts.insert(
            "staff@jwgroup.co.th".into(),
            ("battery staple".into(), "88aa-staff".into()),
        );
        db.roles.insert(("3f1c-admin".into(), "admin".into()));

        let rows = |names: &[&str]| -> Vec<Value> {
            names
                .iter()
                .enumerate()
                .map(|(i, name)| json!({ "id": format!("r{i}"), "name": name, "display_order": i }))
                .collect()
        };
        db.tables.insert(
            "executives".into(),
            rows(&["Chairman", "Managing Director", "Chief Engineer", "Finance Director"]),
        );
        db.tables.insert(
            "projects".into(),
            rows(&["Rayong solar farm", "Bang Na depot", "Chiang Mai water works"]),
        );
        db.tables.insert(
            "timeline_events".into(),
            rows(&["Founded", "First government contract", "ISO 9001"]),
        );
        Ok(())
    }

    fn broadcast(db: &mut Backend, change: AuthChange) {
        db.listeners.retain(|tx| tx.send(change.clone()).is_ok());
    }
}

impl AuthProvider for Memory {
    async fn current_session(&self) -> Result<Option<AuthSession>, BackendError> {
        tokio::time::sleep(LATENCY).await;
        let db = self.lock()?;
        Ok(db.session.as_deref().map(|s| AuthSession::new(s, "demo-token")))
    }

    fn subscribe(&self) -> mpsc::UnboundedReceiver<AuthChange> {
        let (tx, rx) = mpsc::unbounded_channel();
        if let Ok(mut db) = self.lock() {
            db.listeners.push(tx);
        }
        rx
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, BackendError> {
        tokio::time::sleep(LATENCY).await;
        let mut db = self.lock()?;
        let subject = match db.accounts.get(email) {
            Some((expected, subject)) if expected == password => subject.clone(),
            _ => return Err(BackendError::with_code("invalid_credentials", "Invalid login credentials")),
        };
        let session = AuthSession::new(subject.as_str(), "demo-token");
        db.session = Some(subject);
        Memory::broadcast(&mut db, AuthChange::signed_in(session.clone()));
        Ok(session)
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: &Value,
    ) -> Result<(), BackendError> {
        tokio::time::sleep(LATENCY).await;
        let mut db = self.lock()?;
        if db.accounts.contains_key(email) {
            return Err(BackendError::with_code("user_already_exists", "User already registered"));
        }
        let subject = format!("user-{}", db.accounts.len());
        tracing::info!(%subject, %metadata, "demo backend: account created");
        db.accounts
            .insert(email.to_string(), (password.to_string(), subject));
        Ok(())
    }

    async fn sign_out(&self) -> Result<(), BackendError> {
        tokio::time::sleep(LATENCY).await;
        let mut db = self.lock()?;
        db.session = None;
        Memory::broadcast(&mut db, AuthChange::signed_out());
        Ok(())
    }
}

impl RoleStore for Memory {
    async fn find_role(
        &self,
        subject: &SubjectId,
        role: &str,
    ) -> Result<Option<RoleRecord>, BackendError> {
        tokio::time::sleep(LATENCY).await;
        let db = self.lock()?;
        let found = db
            .roles
            .contains(&(subject.to_string(), role.to_string()));
        Ok(found.then(|| RoleRecord {
            user_id: subject.clone(),
            role: role.to_string(),
        }))
    }
}

impl OrderStore for Memory {
    async fn fetch_ordered(&self, table: &str, _position_field: &str) -> Result<Value, BackendError> {
        tokio::time::sleep(LATENCY).await;
        let db = self.lock()?;
        db.tables
            .get(table)
            .map(|rows| Value::Array(rows.clone()))
            .ok_or_else(|| BackendError::with_code("42P01", format!("relation \"{table}\" does not exist")))
    }

    async fn update_field(
        &self,
        table: &str,
        id: &ItemId,
        field: &str,
        value: Value,
    ) -> Result<(), BackendError> {
        tokio::time::sleep(LATENCY).await;
        let mut db = self.lock()?;
        if db.broken_rows.contains(id.as_str()) {
            return Err(BackendError::new("connection reset by peer"));
        }
        let row = db
            .tables
            .get_mut(table)
            .and_then(|rows| rows.iter_mut().find(|row| row["id"] == json!(id.as_str())))
            .ok_or_else(|| BackendError::new(format!("no row {id} in {table}")))?;
        row[field] = value;
        Ok(())
    }
}

/// Prints toasts to stdout.
struct Toasts;

impl Notifier for Toasts {
    fn notify(&self, kind: NoticeKind, message: &str) {
        println!("  [toast:{kind}] {message}");
    }
}

// ---------------------------------------------------------------------------
// Walkthrough
// ---------------------------------------------------------------------------

fn print_list(title: &str, items: &[OrderedItem]) {
    println!("  {title}:");
    for item in items {
        let name = item.field("name").and_then(Value::as_str).unwrap_or("?");
        println!("    {:>2}. {name}", item.position);
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    jwgroup::telemetry::init();

    let config = match std::env::args().nth(1) {
        Some(path) => ConsoleConfig::from_json_file(path)?,
        None => ConsoleConfig::default(),
    };

    let backend = Memory::default();
    backend.seed()?;
    let ctx = AdminContext::start(
        backend.clone(),
        backend.clone(),
        backend.clone(),
        Toasts,
        config,
    );
    let gate = ctx.gate();

    println!("1. console starts with nobody signed in");
    println!("  access: {:?}", gate.wait().await);

    println!("2. wrong password");
    if let Err(err) = ctx
        .session()
        .sign_in(&Credentials::new("admin@jwgroup.co.th", "letmein"))
        .await
    {
        println!("  sign-in failed: {}", err.user_message());
    }

    println!("3. staff signs up, gets no admin access");
    let request = SignUpRequest::new(Credentials::new("new.hire@jwgroup.co.th", "pw123456"))
        .with_full_name("Napat S.");
    ctx.session().sign_up(&request).await?;
    ctx.session()
        .sign_in(&Credentials::new("staff@jwgroup.co.th", "battery staple"))
        .await?;
    let mut identity = ctx.session().subscribe();
    identity
        .wait_for(|id| id.ready && id.subject.as_ref().is_some_and(|s| s.as_str() == "88aa-staff"))
        .await?;
    println!("  access: {:?}", gate.current());
    if let Err(err) = ctx.reorder(CollectionKind::Projects, 0, 1).await {
        println!("  reorder refused: {err}");
    }
    ctx.session().sign_out().await;

    println!("4. admin signs in");
    ctx.session()
        .sign_in(&Credentials::new("admin@jwgroup.co.th", "correct horse"))
        .await?;
    identity.wait_for(|id| id.ready && id.is_admin).await?;
    println!("  access: {:?}", gate.current());

    ctx.load_all().await?;
    print_list("executives", ctx.editor(CollectionKind::Executives).await.items());

    println!("5. drag the Chairman below the Chief Engineer");
    ctx.reorder(CollectionKind::Executives, 0, 2).await?;
    print_list("executives", ctx.editor(CollectionKind::Executives).await.items());

    println!("6. a save fails halfway and the list rolls back");
    backend.lock()?.broken_rows.insert("r0".into());
    if let Err(err) = ctx.reorder(CollectionKind::Projects, 2, 0).await {
        println!("  reorder failed: {err}");
    }
    print_list("projects", ctx.editor(CollectionKind::Projects).await.items());

    println!("7. sign out");
    ctx.session().sign_out().await;
    identity.wait_for(|id| id.ready && id.subject.is_none()).await?;
    println!("  access: {:?}", gate.current());

    ctx.shutdown().await;
    Ok(())
}
