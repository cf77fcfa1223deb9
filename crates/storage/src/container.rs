//! Physical row storage for one table.
//!
//! Rows live in a dense array in slot order, with an id-to-slot map beside it.
//! Removal compacts the array by shifting later rows down one slot. The
//! structural version changes whenever the row count or slot layout changes,
//! never on an in-place overwrite.
//!
//! Callers check existence before `set` and `remove`. A miss there means the
//! array and the id map disagree, which is reported as an internal error.

use tessera_core::{Error, Result, Row, RowId, TableOperation};
use tessera_index::{IdMap, IntegerMap, PagedIdMap};

/// Expected shape of a table's id domain, selecting the id-to-slot map.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum IdDensity {
    /// Ids are mostly sequential: one array indexed by id.
    #[default]
    Dense,
    /// Ids are large or scattered: lazily allocated pages.
    Sparse,
}

/// Id-to-slot map in the chosen layout.
#[derive(Clone, Debug)]
pub enum SlotMap {
    Dense(IdMap),
    Sparse(PagedIdMap),
}

impl SlotMap {
    pub fn new(density: IdDensity, capacity: usize) -> Self {
        match density {
            IdDensity::Dense => SlotMap::Dense(IdMap::with_capacity(capacity)),
            IdDensity::Sparse => SlotMap::Sparse(PagedIdMap::new()),
        }
    }

    pub fn density(&self) -> IdDensity {
        match self {
            SlotMap::Dense(_) => IdDensity::Dense,
            SlotMap::Sparse(_) => IdDensity::Sparse,
        }
    }
}

impl IntegerMap for SlotMap {
    type Value = u32;

    #[inline]
    fn get(&self, key: i32) -> Option<u32> {
        match self {
            SlotMap::Dense(map) => map.get(key),
            SlotMap::Sparse(map) => map.get(key),
        }
    }

    #[inline]
    fn insert(&mut self, key: i32, value: u32) -> Option<u32> {
        match self {
            SlotMap::Dense(map) => map.insert(key, value),
            SlotMap::Sparse(map) => map.insert(key, value),
        }
    }

    fn remove(&mut self, key: i32) -> Option<u32> {
        match self {
            SlotMap::Dense(map) => map.remove(key),
            SlotMap::Sparse(map) => map.remove(key),
        }
    }

    fn clear(&mut self) {
        match self {
            SlotMap::Dense(map) => map.clear(),
            SlotMap::Sparse(map) => map.clear(),
        }
    }

    fn len(&self) -> usize {
        match self {
            SlotMap::Dense(map) => map.len(),
            SlotMap::Sparse(map) => map.len(),
        }
    }

    fn iter(&self) -> impl Iterator<Item = (i32, u32)> + '_ {
        let (dense, sparse) = match self {
            SlotMap::Dense(map) => (Some(map.iter()), None),
            SlotMap::Sparse(map) => (None, Some(map.iter())),
        };
        dense.into_iter().flatten().chain(sparse.into_iter().flatten())
    }
}

/// A row-modified event: the slot touched and what happened to it.
pub type RowEvent = (usize, TableOperation);

/// Dense row array plus id-to-slot map.
#[derive(Clone, Debug)]
pub struct RowContainer<T> {
    rows: Vec<Row<T>>,
    slots: SlotMap,
    version: u64,
    events: Vec<RowEvent>,
    track_events: bool,
}

impl<T: Clone> RowContainer<T> {
    /// Creates an empty container.
    pub fn new(density: IdDensity, capacity: usize) -> Self {
        Self {
            rows: Vec::with_capacity(capacity),
            slots: SlotMap::new(density, capacity),
            version: 0,
            events: Vec::new(),
            track_events: false,
        }
    }

    /// Starts buffering row-modified events for `take_events`.
    pub fn track_events(&mut self) {
        self.track_events = true;
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns the structural version.
    #[inline]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Returns the rows in slot order.
    #[inline]
    pub fn rows(&self) -> &[Row<T>] {
        &self.rows
    }

    #[inline]
    pub fn contains_id(&self, id: RowId) -> bool {
        self.slots.contains_key(id)
    }

    /// Returns the slot currently holding `id`.
    #[inline]
    pub fn try_get_index_for_id(&self, id: RowId) -> Option<usize> {
        self.slots.get(id).map(|slot| slot as usize)
    }

    #[inline]
    pub fn get_by_id(&self, id: RowId) -> Option<&Row<T>> {
        self.try_get_index_for_id(id).and_then(|slot| self.rows.get(slot))
    }

    #[inline]
    pub fn get_by_index(&self, slot: usize) -> Option<&Row<T>> {
        self.rows.get(slot)
    }

    /// Returns the largest id stored, or 0 when empty.
    pub fn max_id(&self) -> RowId {
        self.rows.iter().map(Row::id).max().unwrap_or(0)
    }

    /// Appends `row`, stamping its slot.
    pub fn add(&mut self, row: &mut Row<T>) {
        let slot = self.rows.len();
        row.set_slot(Some(slot));
        self.slots.insert(row.id(), slot as u32);
        self.rows.push(row.clone());
        self.version += 1;
        self.emit(slot, TableOperation::Add);
    }

    /// Overwrites the stored row with `row.id()`, stamping its slot.
    pub fn set(&mut self, row: &mut Row<T>) -> Result<()> {
        let slot = self.require_slot(row.id())?;
        row.set_slot(Some(slot));
        self.rows[slot] = row.clone();
        self.emit(slot, TableOperation::Update);
        Ok(())
    }

    /// Removes the row with `id`, shifting every later row down one slot.
    pub fn remove(&mut self, id: RowId) -> Result<Row<T>> {
        let slot = self.require_slot(id)?;
        let removed = self.rows.remove(slot);
        self.slots.remove(id);

        for moved in slot..self.rows.len() {
            let row = &mut self.rows[moved];
            row.set_slot(Some(moved));
            self.slots.insert(row.id(), moved as u32);
            self.emit(moved, TableOperation::Update);
        }

        self.version += 1;
        self.emit(self.rows.len(), TableOperation::Remove);
        Ok(removed)
    }

    /// Drops every row and reserves room for `capacity`.
    pub fn clear(&mut self, capacity: usize) {
        self.rows = Vec::with_capacity(capacity);
        self.slots = SlotMap::new(self.slots.density(), capacity);
        self.version += 1;
    }

    /// Hands out the events buffered since the last call.
    pub fn take_events(&mut self) -> Vec<RowEvent> {
        core::mem::take(&mut self.events)
    }

    fn require_slot(&self, id: RowId) -> Result<usize> {
        match self.try_get_index_for_id(id) {
            Some(slot) if slot < self.rows.len() && self.rows[slot].id() == id => Ok(slot),
            _ => Err(Error::internal(format!(
                "row {id} missing from container or id map out of sync"
            ))),
        }
    }

    #[inline]
    fn emit(&mut self, slot: usize, op: TableOperation) {
        if self.track_events {
            self.events.push((slot, op));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(ids: &[RowId]) -> RowContainer<&'static str> {
        let mut container = RowContainer::new(IdDensity::Dense, 4);
        container.track_events();
        for &id in ids {
            container.add(&mut Row::with_id(id, "x"));
        }
        container.take_events();
        container
    }

    fn assert_consistent<T: Clone>(container: &RowContainer<T>) {
        assert_eq!(container.slots.len(), container.len());
        for (slot, row) in container.rows().iter().enumerate() {
            assert_eq!(row.slot(), Some(slot));
            assert_eq!(container.try_get_index_for_id(row.id()), Some(slot));
        }
    }

    #[test]
    fn test_add_stamps_slot_and_version() {
        let mut container = RowContainer::new(IdDensity::Sparse, 0);
        let mut row = Row::with_id(500_000, 1);
        container.add(&mut row);
        assert_eq!(row.slot(), Some(0));
        assert_eq!(container.version(), 1);
        assert_eq!(container.get_by_id(500_000).map(|r| r.data), Some(1));
        assert_consistent(&container);
    }

    #[test]
    fn test_set_keeps_version() {
        let mut container = filled(&[1, 2]);
        let version = container.version();

        let mut row = Row::from_parts(2, 1, "y");
        container.set(&mut row).unwrap();
        assert_eq!(row.slot(), Some(1));
        assert_eq!(container.version(), version);
        assert_eq!(container.get_by_id(2).unwrap().data, "y");
        assert_eq!(container.take_events(), vec![(1, TableOperation::Update)]);
    }

    #[test]
    fn test_remove_compacts() {
        let mut container = filled(&[1, 2, 3, 4]);
        let version = container.version();

        let removed = container.remove(2).unwrap();
        assert_eq!(removed.id(), 2);
        assert_eq!(container.version(), version + 1);
        assert_eq!(
            container.rows().iter().map(Row::id).collect::<Vec<_>>(),
            vec![1, 3, 4]
        );
        assert!(!container.contains_id(2));
        assert_consistent(&container);
        assert_eq!(
            container.take_events(),
            vec![
                (1, TableOperation::Update),
                (2, TableOperation::Update),
                (3, TableOperation::Remove),
            ]
        );
    }

    #[test]
    fn test_missing_row_is_internal_error() {
        let mut container = filled(&[1]);
        assert!(matches!(container.remove(9), Err(Error::Internal { .. })));
        assert!(container.set(&mut Row::with_id(9, "z")).is_err());
    }

    #[test]
    fn test_clear() {
        let mut container = filled(&[1, 2]);
        let version = container.version();
        container.clear(8);
        assert!(container.is_empty());
        assert!(!container.contains_id(1));
        assert_eq!(container.version(), version + 1);
        assert_eq!(container.max_id(), 0);
    }

    #[test]
    fn test_events_off_by_default() {
        let mut container = RowContainer::new(IdDensity::Dense, 0);
        container.add(&mut Row::with_id(1, ()));
        assert!(container.take_events().is_empty());
    }
}
