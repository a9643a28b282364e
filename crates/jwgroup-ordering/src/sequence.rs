//! Pure sequence operations: move an item, renumber positions.
//!
//! No I/O here; the editor composes these with persistence.

use jwgroup_types::{ItemId, OrderedItem};

use crate::OrderingError;

/// One position write produced by a reorder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionUpdate {
    pub id: ItemId,
    pub position: i64,
}

/// Moves the displayed item at `from` so it ends up at displayed index `to`.
///
/// `view` lists, in display order, the indices into `items` that are
/// displayed. Without a filter it is simply `0..items.len()` and this is a
/// plain array move. With a filter, hidden items keep their relative
/// order and the moved item lands next to the displayed item it was
/// dropped on.
///
/// # Errors
/// [`OrderingError::InvalidIndex`] if `from` or `to` is not a displayed
/// index. `from == to` is a valid no-op.
pub fn move_in_view(
    items: &mut Vec<OrderedItem>,
    view: &[usize],
    from: usize,
    to: usize,
) -> Result<(), OrderingError> {
    let len = view.len();
    for index in [from, to] {
        if index >= len {
            return Err(OrderingError::InvalidIndex { index, len });
        }
    }
    if from == to {
        return Ok(());
    }

    // Moving down: after the removal the drop target shifts up by one, so
    // inserting at its old index places the item right after it. Moving
    // up: nothing shifts and the item lands right before it.
    let item = items.remove(view[from]);
    items.insert(view[to], item);
    Ok(())
}

/// Sets every item's position to its index and returns the items whose
/// position actually changed.
pub fn renumber(items: &mut [OrderedItem]) -> Vec<PositionUpdate> {
    let mut updates = Vec::new();
    for (index, item) in items.iter_mut().enumerate() {
        let position = index as i64;
        if item.position != position {
            item.position = position;
            updates.push(PositionUpdate {
                id: item.id.clone(),
                position,
            });
        }
    }
    updates
}
