//! Row value type for Tessera tables.
//!
//! A `Row<T>` is a snapshot, not a live reference: holding one says nothing about
//! what the table stores now. Tables re-stamp `slot` and `version` on the rows they
//! hand back, and compare `version` on update to reject stale writes.

use serde::{Deserialize, Serialize};

/// Identifier of a row within its table.
pub type RowId = i32;

/// Reserved id meaning "no row". Never assigned to a stored row and used as the
/// null value of foreign-key fields.
pub const NO_ROW: RowId = 0;

/// A row in a table.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Row<T> {
    id: RowId,
    /// Physical position in the owning container when this snapshot was taken.
    #[serde(skip)]
    slot: Option<usize>,
    version: i32,
    /// Row payload.
    pub data: T,
}

impl<T> Row<T> {
    /// Creates an unplaced row without an id. The table assigns one on add.
    pub fn new(data: T) -> Self {
        Self::from_parts(NO_ROW, 0, data)
    }

    /// Creates an unplaced row with a caller-chosen id.
    pub fn with_id(id: RowId, data: T) -> Self {
        Self::from_parts(id, 0, data)
    }

    /// Creates an unplaced row with an explicit id and version stamp.
    pub fn from_parts(id: RowId, version: i32, data: T) -> Self {
        Self {
            id,
            slot: None,
            version,
            data,
        }
    }

    /// Returns the row id.
    #[inline]
    pub fn id(&self) -> RowId {
        self.id
    }

    /// Returns the cached physical slot, if the row has been placed.
    #[inline]
    pub fn slot(&self) -> Option<usize> {
        self.slot
    }

    /// Returns the optimistic-concurrency version stamp.
    #[inline]
    pub fn version(&self) -> i32 {
        self.version
    }

    /// Returns true if the row carries a slot assigned by a container.
    #[inline]
    pub fn is_placed(&self) -> bool {
        self.slot.is_some()
    }

    /// Returns true if this row has no id yet.
    #[inline]
    pub fn is_unassigned(&self) -> bool {
        self.id == NO_ROW
    }

    /// Consumes the row and returns its payload.
    pub fn into_data(self) -> T {
        self.data
    }

    #[doc(hidden)]
    pub fn set_id(&mut self, id: RowId) {
        self.id = id;
    }

    #[doc(hidden)]
    pub fn set_slot(&mut self, slot: Option<usize>) {
        self.slot = slot;
    }

    #[doc(hidden)]
    pub fn set_version(&mut self, version: i32) {
        self.version = version;
    }

    /// Compares id, version and payload, ignoring the cached slot.
    pub fn same_value(&self, other: &Self) -> bool
    where
        T: PartialEq,
    {
        self.id == other.id && self.version == other.version && self.data == other.data
    }
}
