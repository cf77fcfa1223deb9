//! Capability traits for integer-keyed maps and row indexes.

use core::any::Any;
use tessera_core::{Result, Row, RowId};

/// An `i32`-keyed map. Implementations differ only in how they lay out storage
/// for the expected key density.
pub trait IntegerMap {
    /// Stored value type.
    type Value: Copy;

    /// Returns the value stored for `key`.
    fn get(&self, key: i32) -> Option<Self::Value>;

    /// Stores `value` for `key`, returning the previous value.
    fn insert(&mut self, key: i32, value: Self::Value) -> Option<Self::Value>;

    /// Removes `key`, returning its value.
    fn remove(&mut self, key: i32) -> Option<Self::Value>;

    fn contains_key(&self, key: i32) -> bool {
        self.get(key).is_some()
    }

    /// Removes every entry.
    fn clear(&mut self);

    /// Returns the number of entries.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterates the entries in the map's natural key order.
    fn iter(&self) -> impl Iterator<Item = (i32, Self::Value)> + '_;
}

/// A derived index over the rows of one table.
///
/// Every method either succeeds completely or leaves the index as it was.
pub trait RowIndex<T>: Send + Sync {
    /// Returns the index name.
    fn name(&self) -> &str;

    /// Indexes a new row.
    fn add(&mut self, row: &Row<T>) -> Result<()>;

    /// Re-indexes a row whose data changed from `old` to `new`.
    fn update(&mut self, old: &Row<T>, new: &Row<T>) -> Result<()>;

    /// Drops the entry derived from `row`.
    fn remove(&mut self, row: &Row<T>);

    /// Drops every entry.
    fn clear(&mut self);

    /// Returns the number of indexed keys.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the row id indexed under the key derived from `data`, if any.
    fn lookup_row(&self, data: &T) -> Option<RowId>;

    /// Allows typed access to the concrete index.
    fn as_any(&self) -> &dyn Any;
}
