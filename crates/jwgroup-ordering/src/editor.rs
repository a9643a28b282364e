//! The ordered collection editor.
//!
//! One editor owns the local copy of one collection. It is the only thing
//! that mutates that copy; the UI reads it through [`subscribe`] (the
//! displayed order) or [`items`] (the full collection).
//!
//! # Reorder protocol
//!
//! 1. [`apply_move`] moves the item, renumbers the *full* collection to
//!    `0..n`, and publishes the new displayed order. Nothing has been
//!    written yet.
//! 2. [`persist`] writes each changed position with one
//!    [`OrderStore::update_field`] call, in display order, one at a time.
//! 3. On the first failed write the remaining writes are skipped, the
//!    collection is re-fetched and replaces the local state, and the user
//!    is notified. Writes that already succeeded stay; the re-fetch shows
//!    exactly what the backend now holds.
//!
//! [`reorder`] runs all three.
//!
//! [`subscribe`]: OrderedCollectionEditor::subscribe
//! [`items`]: OrderedCollectionEditor::items
//! [`apply_move`]: OrderedCollectionEditor::apply_move
//! [`persist`]: OrderedCollectionEditor::persist
//! [`reorder`]: OrderedCollectionEditor::reorder

use std::sync::Arc;

use jwgroup_types::{NoticeKind, OrderedItem, decode_rows};
use serde_json::Value;
use tokio::sync::watch;

use crate::{
    CollectionConfig, Notifier, OrderStore, OrderingError, PositionUpdate, ViewFilter,
    move_in_view, renumber,
};

/// Notification text after a successful reorder.
pub const ORDER_SAVED: &str = "order saved";

/// Notification text after a failed reorder.
pub const ORDER_SAVE_FAILED: &str = "failed to save order";

/// Drag-reorder editor for one ordered collection.
pub struct OrderedCollectionEditor<S: OrderStore, N: Notifier> {
    store: Arc<S>,
    notifier: Arc<N>,
    config: CollectionConfig,
    filter: Option<ViewFilter>,
    /// The full collection in display order.
    items: Vec<OrderedItem>,
    /// Order before the last unpersisted move, used if the re-fetch fails.
    before_move: Option<Vec<OrderedItem>>,
    displayed: watch::Sender<Vec<OrderedItem>>,
}

impl<S: OrderStore, N: Notifier> OrderedCollectionEditor<S, N> {
    /// Creates an empty editor. Call [`load`](Self::load) to populate it.
    pub fn new(store: Arc<S>, notifier: Arc<N>, config: CollectionConfig) -> Self {
        let (displayed, _) = watch::channel(Vec::new());
        Self {
            store,
            notifier,
            config,
            filter: None,
            items: Vec::new(),
            before_move: None,
            displayed,
        }
    }

    /// Builder-style [`set_filter`](Self::set_filter).
    pub fn with_filter(mut self, filter: ViewFilter) -> Self {
        self.set_filter(Some(filter));
        self
    }

    /// Table and position column this editor writes to.
    pub fn config(&self) -> &CollectionConfig {
        &self.config
    }

    /// The active view filter, if any.
    pub fn filter(&self) -> Option<&ViewFilter> {
        self.filter.as_ref()
    }

    /// Changes the displayed subset. View indices passed to
    /// [`reorder`](Self::reorder) are relative to the new subset from now on.
    pub fn set_filter(&mut self, filter: Option<ViewFilter>) {
        self.filter = filter;
        self.publish();
    }

    /// The full collection in display order.
    pub fn items(&self) -> &[OrderedItem] {
        &self.items
    }

    /// The displayed subset in display order.
    pub fn visible_items(&self) -> Vec<OrderedItem> {
        self.view()
            .into_iter()
            .map(|index| self.items[index].clone())
            .collect()
    }

    /// Position for a new item appended at the end of the collection.
    pub fn next_position(&self) -> i64 {
        self.items
            .iter()
            .map(|item| item.position + 1)
            .max()
            .unwrap_or(0)
    }

    /// A receiver that observes the displayed order.
    pub fn subscribe(&self) -> watch::Receiver<Vec<OrderedItem>> {
        self.displayed.subscribe()
    }

    /// Replaces the local state with the backend's current sequence.
    ///
    /// # Errors
    /// - [`OrderingError::Fetch`] — the backend call failed
    /// - [`OrderingError::Types`] — the backend returned malformed rows
    ///
    /// The local state is untouched on error.
    pub async fn load(&mut self) -> Result<(), OrderingError> {
        self.items = self.fetch().await?;
        self.before_move = None;
        tracing::debug!(
            table = %self.config.table,
            count = self.items.len(),
            "collection loaded"
        );
        self.publish();
        Ok(())
    }

    /// Moves the displayed item at `from` to displayed index `to`, then
    /// renumbers the whole collection and publishes the result.
    ///
    /// Returns the position writes needed to persist the move. Empty for
    /// `from == to`, in which case nothing is published either.
    ///
    /// # Errors
    /// [`OrderingError::InvalidIndex`] if either index is outside the
    /// displayed sequence. The local state is untouched.
    pub fn apply_move(
        &mut self,
        from: usize,
        to: usize,
    ) -> Result<Vec<PositionUpdate>, OrderingError> {
        let view = self.view();
        let mut next = self.items.clone();
        move_in_view(&mut next, &view, from, to)?;
        if from == to {
            return Ok(Vec::new());
        }
        let updates = renumber(&mut next);
        if updates.is_empty() {
            return Ok(updates);
        }

        // Keep the oldest unpersisted order if moves are stacked.
        let previous = std::mem::replace(&mut self.items, next);
        self.before_move.get_or_insert(previous);
        tracing::debug!(
            table = %self.config.table,
            from,
            to,
            changed = updates.len(),
            "applied move locally"
        );
        self.publish();
        Ok(updates)
    }

    /// Writes `updates` one at a time, stopping at the first failure.
    ///
    /// On success the user is told the order was saved. On failure the
    /// local state is replaced by a fresh fetch (or, if that fails too,
    /// by the order before the move) and the user is told saving failed.
    ///
    /// # Errors
    /// [`OrderingError::PersistenceFailure`] naming the item whose write
    /// failed. The rollback has already happened when this returns.
    pub async fn persist(&mut self, updates: &[PositionUpdate]) -> Result<(), OrderingError> {
        for update in updates {
            let result = self
                .store
                .update_field(
                    &self.config.table,
                    &update.id,
                    &self.config.position_field,
                    Value::from(update.position),
                )
                .await;

            if let Err(source) = result {
                tracing::error!(
                    table = %self.config.table,
                    id = %update.id,
                    position = update.position,
                    error = %source,
                    "failed to save position, rolling back"
                );
                self.rollback().await;
                self.notifier.notify(NoticeKind::Error, ORDER_SAVE_FAILED);
                return Err(OrderingError::PersistenceFailure {
                    id: update.id.clone(),
                    source,
                });
            }
        }

        self.before_move = None;
        if !updates.is_empty() {
            tracing::info!(
                table = %self.config.table,
                saved = updates.len(),
                "order saved"
            );
            self.notifier.notify(NoticeKind::Success, ORDER_SAVED);
        }
        Ok(())
    }

    /// Moves an item and persists the new order.
    ///
    /// The displayed order changes before any write is issued.
    ///
    /// # Errors
    /// - [`OrderingError::InvalidIndex`] — nothing changed
    /// - [`OrderingError::PersistenceFailure`] — rolled back and notified
    pub async fn reorder(&mut self, from: usize, to: usize) -> Result<(), OrderingError> {
        let updates = self.apply_move(from, to)?;
        if updates.is_empty() {
            return Ok(());
        }
        self.persist(&updates).await
    }

    // -- Internals --------------------------------------------------------

    async fn fetch(&self) -> Result<Vec<OrderedItem>, OrderingError> {
        let payload = self
            .store
            .fetch_ordered(&self.config.table, &self.config.position_field)
            .await
            .map_err(|source| OrderingError::Fetch {
                table: self.config.table.clone(),
                source,
            })?;
        Ok(decode_rows(payload, &self.config.position_field)?)
    }

    /// Discards the optimistic order in favour of the backend's.
    async fn rollback(&mut self) {
        let previous = self.before_move.take();
        match self.fetch().await {
            Ok(items) => self.items = items,
            Err(err) => {
                tracing::error!(
                    table = %self.config.table,
                    error = %err,
                    "re-fetch after failed save also failed, restoring previous order"
                );
                if let Some(previous) = previous {
                    self.items = previous;
                }
            }
        }
        self.publish();
    }

    /// Indices into `items` of the displayed items.
    fn view(&self) -> Vec<usize> {
        self.items
            .iter()
            .enumerate()
            .filter(|(_, item)| self.filter.as_ref().is_none_or(|f| f.matches(item)))
            .map(|(index, _)| index)
            .collect()
    }

    fn publish(&self) {
        self.displayed.send_replace(self.visible_items());
    }
}
