//! The context object handed to the UI layer.
//!
//! [`AdminContext`] owns the session manager and one editor per ordered
//! collection. It is the only way the UI reaches either, so there is no
//! module-level auth state anywhere.

use std::sync::Arc;

use jwgroup_ordering::{CollectionKind, Notifier, OrderStore, OrderedCollectionEditor};
use jwgroup_session::{AuthProvider, Identity, RoleStore, SessionManager};
use tokio::sync::{Mutex, MutexGuard};

use crate::{Access, AdminGate, ConsoleConfig, ConsoleError};

/// One editor per [`CollectionKind`].
///
/// Each sits behind an async `Mutex` so a reorder, which holds the editor
/// across backend calls, is never interleaved with another operation on
/// the same collection.
struct Editors<S: OrderStore, N: Notifier> {
    executives: Mutex<OrderedCollectionEditor<S, N>>,
    projects: Mutex<OrderedCollectionEditor<S, N>>,
    timeline: Mutex<OrderedCollectionEditor<S, N>>,
}

impl<S: OrderStore, N: Notifier> Editors<S, N> {
    fn get(&self, kind: CollectionKind) -> &Mutex<OrderedCollectionEditor<S, N>> {
        match kind {
            CollectionKind::Executives => &self.executives,
            CollectionKind::Projects => &self.projects,
            CollectionKind::Timeline => &self.timeline,
        }
    }
}

/// Session plus editors, wired to one backend.
pub struct AdminContext<A: AuthProvider, S: OrderStore, N: Notifier> {
    session: SessionManager<A>,
    editors: Editors<S, N>,
}

impl<A, S, N> AdminContext<A, S, N>
where
    A: AuthProvider,
    S: OrderStore,
    N: Notifier,
{
    /// Starts the session manager and creates the editors.
    ///
    /// Must be called from inside a Tokio runtime. Editors start empty;
    /// call [`load_all`](Self::load_all) once the UI needs the lists.
    pub fn start<R: RoleStore>(
        auth: A,
        roles: R,
        store: S,
        notifier: N,
        config: ConsoleConfig,
    ) -> Self {
        let store = Arc::new(store);
        let notifier = Arc::new(notifier);
        let editor = |kind: CollectionKind| {
            Mutex::new(OrderedCollectionEditor::new(
                Arc::clone(&store),
                Arc::clone(&notifier),
                config.collection(kind),
            ))
        };
        let editors = Editors {
            executives: editor(CollectionKind::Executives),
            projects: editor(CollectionKind::Projects),
            timeline: editor(CollectionKind::Timeline),
        };

        tracing::info!(
            bootstrap_timeout_ms = config.session.bootstrap_timeout_ms,
            admin_role = %config.session.admin_role,
            "admin console starting"
        );
        let session = SessionManager::start(auth, roles, config.session);

        Self { session, editors }
    }

    pub fn session(&self) -> &SessionManager<A> {
        &self.session
    }

    pub fn identity(&self) -> Identity {
        self.session.current_identity()
    }

    /// A guard for admin routes, tracking this context's session.
    pub fn gate(&self) -> AdminGate {
        AdminGate::new(self.session.subscribe())
    }

    /// Fails with [`ConsoleError::AccessDenied`] unless the current
    /// identity is a resolved admin.
    pub fn require_admin(&self) -> Result<(), ConsoleError> {
        match AdminGate::check(&self.identity()) {
            Access::Granted => Ok(()),
            access => {
                tracing::warn!(?access, "admin operation refused");
                Err(ConsoleError::AccessDenied)
            }
        }
    }

    /// Locks the editor for `kind`.
    pub async fn editor(&self, kind: CollectionKind) -> MutexGuard<'_, OrderedCollectionEditor<S, N>> {
        self.editors.get(kind).lock().await
    }

    /// Loads every collection from the backend. Stops at the first failure.
    pub async fn load_all(&self) -> Result<(), ConsoleError> {
        for kind in CollectionKind::ALL {
            self.editor(kind).await.load().await?;
        }
        Ok(())
    }

    /// Reorders one collection on behalf of the signed-in admin.
    ///
    /// # Errors
    /// - [`ConsoleError::AccessDenied`] — not a resolved admin; nothing
    ///   changed
    /// - [`ConsoleError::Ordering`] — invalid index, or a failed save that
    ///   has already been rolled back
    pub async fn reorder(
        &self,
        kind: CollectionKind,
        from: usize,
        to: usize,
    ) -> Result<(), ConsoleError> {
        self.require_admin()?;
        self.editor(kind).await.reorder(from, to).await?;
        Ok(())
    }

    /// Stops the session actor.
    pub async fn shutdown(&self) {
        self.session.shutdown().await;
    }
}
