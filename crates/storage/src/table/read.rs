//! Point reads and predicate queries.

use super::Table;
use crate::iter::{IdQueryIter, JoinIter, ManyToManyIter, QueryIter, RowIdIter, RowIter};
use std::hash::Hash;
use tessera_core::{Error, Result, Row, RowId, TableData};
use tessera_index::UniqueIndex;

impl<T: TableData> Table<T> {
    /// Returns the row with `id`.
    pub fn get(&self, id: RowId) -> Result<Row<T>> {
        self.try_get(id).ok_or_else(|| Error::not_found(self.name(), id))
    }

    /// Returns the row with `id`, if present.
    pub fn try_get(&self, id: RowId) -> Option<Row<T>> {
        let _scope = self.lock().read();
        self.state.read().container.get_by_id(id).cloned()
    }

    /// Returns the row at physical `slot`, if any.
    pub fn get_by_slot(&self, slot: usize) -> Option<Row<T>> {
        let _scope = self.lock().read();
        self.state.read().container.get_by_index(slot).cloned()
    }

    pub fn contains_key(&self, id: RowId) -> bool {
        let _scope = self.lock().read();
        self.state.read().container.contains_id(id)
    }

    /// Returns the number of rows.
    pub fn len(&self) -> usize {
        let _scope = self.lock().read();
        self.state.read().container.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the structural version: it changes on add, remove, clear and
    /// sort, not on in-place update.
    pub fn structural_version(&self) -> u64 {
        let _scope = self.lock().read();
        self.state.read().container.version()
    }

    /// Returns a snapshot of every row in slot order.
    pub fn to_vec(&self) -> Vec<Row<T>> {
        let _scope = self.lock().read();
        self.state.read().container.rows().to_vec()
    }

    /// Returns the ids of every row in slot order.
    pub fn ids(&self) -> Vec<RowId> {
        let _scope = self.lock().read();
        self.state.read().container.rows().iter().map(Row::id).collect()
    }

    /// Returns true if any row matches `predicate`.
    pub fn exists(&self, predicate: impl Fn(&Row<T>) -> bool) -> bool {
        let _scope = self.lock().read();
        self.state.read_recursive().container.rows().iter().any(predicate)
    }

    /// Returns the first row matching `predicate`, if any.
    pub fn try_get_one(&self, predicate: impl Fn(&Row<T>) -> bool) -> Option<Row<T>> {
        let _scope = self.lock().read();
        self.state
            .read_recursive()
            .container
            .rows()
            .iter()
            .find(|row| predicate(row))
            .cloned()
    }

    /// Returns the first row matching `predicate`.
    pub fn get_one(&self, predicate: impl Fn(&Row<T>) -> bool) -> Result<Row<T>> {
        self.try_get_one(predicate).ok_or_else(|| {
            Error::invalid_operation(format!(
                "no row in table {} matches the predicate",
                self.name()
            ))
        })
    }

    /// Looks up a row through the unique index `index`.
    ///
    /// Fails with `IndexNotFound` if no index with that name and key type exists.
    pub fn try_get_by_unique_index<K>(&self, index: &str, key: &K) -> Result<Option<Row<T>>>
    where
        K: Eq + Hash + Clone + std::fmt::Debug + Send + Sync + 'static,
    {
        let _scope = self.lock().read();
        let state = self.state.read();
        let unique = state
            .indexes
            .iter()
            .find(|candidate| candidate.name() == index)
            .and_then(|candidate| candidate.as_any().downcast_ref::<UniqueIndex<T, K>>())
            .ok_or_else(|| Error::index_not_found(self.name(), index))?;
        Ok(unique
            .get(key)
            .and_then(|id| state.container.get_by_id(id))
            .cloned())
    }

    /// Looks up a row through the unique index `index`, failing with
    /// `KeyNotFound` when no row has `key`.
    pub fn get_by_unique_index<K>(&self, index: &str, key: &K) -> Result<Row<T>>
    where
        K: Eq + Hash + Clone + std::fmt::Debug + Send + Sync + 'static,
    {
        self.try_get_by_unique_index(index, key)?
            .ok_or_else(|| Error::key_not_found(self.name(), index, format!("{key:?}")))
    }

    /// Returns true if `data` would collide with a stored row other than
    /// `except` in any unique index.
    pub fn violates_unique(&self, data: &T, except: RowId) -> bool {
        let _scope = self.lock().read();
        let state = self.state.read();
        state
            .indexes
            .iter()
            .any(|index| matches!(index.lookup_row(data), Some(id) if id != except))
    }

    /// Iterates every row in slot order.
    pub fn rows(&self) -> RowIter<'_, T> {
        RowIter::new(self)
    }

    /// Iterates the rows matching `predicate`.
    pub fn query<P>(&self, predicate: P) -> QueryIter<'_, T, P>
    where
        P: FnMut(&Row<T>) -> bool,
    {
        QueryIter::new(self, predicate)
    }

    /// Iterates the ids of every row in slot order.
    pub fn row_ids(&self) -> RowIdIter<'_, T> {
        RowIdIter::new(self)
    }

    /// Iterates the rows with the given ids, skipping ids not present.
    pub fn query_ids(&self, ids: &[RowId]) -> IdQueryIter<'_, T> {
        IdQueryIter::new(self, ids.to_vec())
    }

    /// Iterates the pairs of rows from `self` and `other` satisfying `condition`.
    pub fn join<'a, U, F>(&'a self, other: &'a Table<U>, condition: F) -> JoinIter<'a, T, U, F>
    where
        U: TableData,
        F: FnMut(&Row<T>, &Row<U>) -> bool,
    {
        JoinIter::new(self, other, condition)
    }

    /// Iterates the rows of `self` once per row of `link` satisfying
    /// `condition`, as when walking a many-to-many link table.
    pub fn many_to_many<'a, L, F>(
        &'a self,
        link: &'a Table<L>,
        condition: F,
    ) -> ManyToManyIter<'a, T, L, F>
    where
        L: TableData,
        F: FnMut(&Row<T>, &Row<L>) -> bool,
    {
        ManyToManyIter::new(self, link, condition)
    }
}
