//! Decoding backend rows into [`OrderedItem`]s.
//!
//! The hosted store returns table rows as JSON objects. Admin tables agree
//! on an `id` column and *some* integer position column, whose name is
//! per-table configuration. Everything else is domain data we carry along
//! without interpreting.

use serde_json::Value;

use crate::{ItemId, OrderedItem, TypesError};

impl OrderedItem {
    /// Builds an item from one backend row.
    ///
    /// - `id` may be a string (UUID primary keys) or an integer (serial
    ///   keys); both become an [`ItemId`] string.
    /// - A missing or `null` position column reads as `0`, the column
    ///   default on every admin table.
    ///
    /// # Errors
    /// [`TypesError::InvalidRow`] if the row is not an object, has no
    /// usable `id`, or the position column is not an integer.
    pub fn from_row(row: Value, position_field: &str) -> Result<Self, TypesError> {
        let mut fields = match row {
            Value::Object(fields) => fields,
            other => {
                return Err(TypesError::InvalidRow(format!(
                    "expected an object, got {other}"
                )));
            }
        };

        let id = match fields.remove("id") {
            Some(Value::String(s)) => ItemId(s),
            Some(Value::Number(n)) => ItemId(n.to_string()),
            Some(other) => {
                return Err(TypesError::InvalidRow(format!(
                    "id must be a string or number, got {other}"
                )));
            }
            None => return Err(TypesError::InvalidRow("row has no id".into())),
        };

        let position = match fields.remove(position_field) {
            None | Some(Value::Null) => 0,
            Some(Value::Number(n)) => n.as_i64().ok_or_else(|| {
                TypesError::InvalidRow(format!(
                    "{position_field} of {id} is not an integer: {n}"
                ))
            })?,
            Some(other) => {
                return Err(TypesError::InvalidRow(format!(
                    "{position_field} of {id} is not an integer: {other}"
                )));
            }
        };

        Ok(Self {
            id,
            position,
            fields,
        })
    }
}

/// Decodes a JSON array of rows and returns them in display order.
///
/// # Errors
/// [`TypesError::InvalidRow`] if the payload is not an array or any row
/// fails [`OrderedItem::from_row`].
pub fn decode_rows(
    payload: Value,
    position_field: &str,
) -> Result<Vec<OrderedItem>, TypesError> {
    let rows = match payload {
        Value::Array(rows) => rows,
        other => {
            return Err(TypesError::InvalidRow(format!(
                "expected an array of rows, got {other}"
            )));
        }
    };

    let mut items = rows
        .into_iter()
        .map(|row| OrderedItem::from_row(row, position_field))
        .collect::<Result<Vec<_>, _>>()?;
    sort_by_position(&mut items);
    Ok(items)
}

/// Sorts items into display order: ascending position, ties broken by id
/// so two reads of the same table always agree.
pub fn sort_by_position(items: &mut [OrderedItem]) {
    items.sort_by(|a, b| a.position.cmp(&b.position).then_with(|| a.id.cmp(&b.id)));
}
