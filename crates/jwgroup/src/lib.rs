//! # JW Group admin console core
//!
//! The coordination logic behind the corporate site's admin console:
//!
//! - [`SessionManager`](jwgroup_session::SessionManager) decides who is
//!   signed in and whether they are an admin, and never leaves the UI
//!   loading forever.
//! - [`OrderedCollectionEditor`](jwgroup_ordering::OrderedCollectionEditor)
//!   drag-reorders executives, projects and timeline events with an
//!   optimistic update and rollback on failure.
//!
//! Both are written against traits, so the hosted backend SDK plugs in
//! from outside. [`AdminContext`] bundles them into the single context
//! object the UI layer receives.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use jwgroup::prelude::*;
//!
//! jwgroup::telemetry::init();
//! let config = ConsoleConfig::from_json_file("console.json")?;
//! let ctx = AdminContext::start(auth, roles, store, notifier, config);
//!
//! if ctx.gate().wait().await == Access::Granted {
//!     ctx.load_all().await?;
//!     ctx.reorder(CollectionKind::Projects, 0, 3).await?;
//! }
//! ```

mod access;
mod config;
mod context;
mod error;
pub mod telemetry;

pub use access::{Access, AdminGate};
pub use config::ConsoleConfig;
pub use context::AdminContext;
pub use error::ConsoleError;

/// Everything a UI layer or backend adapter usually needs.
pub mod prelude {
    pub use crate::{Access, AdminContext, AdminGate, ConsoleConfig, ConsoleError};
    pub use jwgroup_ordering::{
        CollectionConfig, CollectionKind, Notifier, OrderStore, OrderedCollectionEditor,
        OrderingError, PositionUpdate, ViewFilter,
    };
    pub use jwgroup_retry::RetryPolicy;
    pub use jwgroup_session::{
        AuthError, AuthProvider, Credentials, Identity, RoleStore, SessionConfig,
        SessionError, SessionManager, SessionPhase, SignUpRequest,
    };
    pub use jwgroup_types::{
        AuthChange, AuthEvent, AuthSession, BackendError, ItemId, NoticeKind, OrderedItem,
        RoleRecord, SubjectId,
    };
}
