//! Collaborator traits for the remote table store and user notifications.

use std::future::Future;

use jwgroup_types::{BackendError, ItemId, NoticeKind};
use serde_json::Value;

/// Read/write access to the admin tables.
///
/// Shared behind an `Arc` by every editor, so `Send + Sync + 'static`.
pub trait OrderStore: Send + Sync + 'static {
    /// Returns every row of `table` as a JSON array, ordered by
    /// `position_field` ascending.
    ///
    /// The editor re-sorts after decoding, so a store that can't order
    /// server-side may return rows in any order.
    fn fetch_ordered(
        &self,
        table: &str,
        position_field: &str,
    ) -> impl Future<Output = Result<Value, BackendError>> + Send;

    /// Sets one column of one row.
    fn update_field(
        &self,
        table: &str,
        id: &ItemId,
        field: &str,
        value: Value,
    ) -> impl Future<Output = Result<(), BackendError>> + Send;
}

/// Fire-and-forget user notifications (toasts).
pub trait Notifier: Send + Sync + 'static {
    fn notify(&self, kind: NoticeKind, message: &str);
}
