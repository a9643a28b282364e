//! Ordered collection editing for the JW Group admin console.
//!
//! Several admin lists (executives, projects, timeline events) are shown
//! in a user-defined order stored in a position column. The editor in this
//! crate lets an admin drag an item to a new place and keeps three things
//! in sync: the local sequence, what the UI displays, and the persisted
//! positions.
//!
//! A reorder is a two-phase protocol:
//!
//! ```text
//! apply_move(from, to)   local move + renumber + publish   (synchronous)
//!        ↓
//! persist(updates)       one update_field per changed item
//!        ↓ first failure
//! rollback               re-fetch, replace local state, notify
//! ```
//!
//! # Key types
//!
//! - [`OrderedCollectionEditor`] — owns one collection's sequence
//! - [`OrderStore`] / [`Notifier`] — the backend and toast seams
//! - [`CollectionConfig`] / [`CollectionKind`] — which table, which column
//! - [`ViewFilter`] — restrict the displayed subset

#![allow(async_fn_in_trait)]

mod config;
mod editor;
mod error;
mod sequence;
mod store;

pub use config::{CollectionConfig, CollectionKind, ViewFilter};
pub use editor::{ORDER_SAVE_FAILED, ORDER_SAVED, OrderedCollectionEditor};
pub use error::OrderingError;
pub use sequence::{PositionUpdate, move_in_view, renumber};
pub use store::{Notifier, OrderStore};
