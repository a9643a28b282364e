//! Error types for the ordering layer.

use jwgroup_types::{BackendError, ItemId, TypesError};

/// Errors that can occur while loading or reordering a collection.
#[derive(Debug, thiserror::Error)]
pub enum OrderingError {
    /// A reorder index is outside the displayed sequence.
    #[error("index {index} out of range for {len} displayed items")]
    InvalidIndex { index: usize, len: usize },

    /// Writing an item's new position failed. The local order has already
    /// been rolled back when this is returned.
    #[error("failed to save position of item {id}")]
    PersistenceFailure {
        id: ItemId,
        #[source]
        source: BackendError,
    },

    /// Reading the collection from the backend failed.
    #[error("failed to fetch table {table}")]
    Fetch {
        table: String,
        #[source]
        source: BackendError,
    },

    /// The backend returned rows the editor can't use.
    #[error(transparent)]
    Types(#[from] TypesError),
}
