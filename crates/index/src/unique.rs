//! Unique hash index over derived row keys.

use crate::traits::RowIndex;
use core::any::Any;
use core::fmt;
use core::hash::Hash;
use hashbrown::HashMap;
use tessera_core::{Error, Result, Row, RowId};

/// Function deriving an index key from row data.
pub type KeyFn<T, K> = Box<dyn Fn(&T) -> K + Send + Sync>;

/// Maps a key derived from each row's data to that row's id, allowing at most
/// one row per key.
pub struct UniqueIndex<T, K> {
    table: String,
    name: String,
    key_fn: KeyFn<T, K>,
    map: HashMap<K, RowId>,
}

impl<T, K> UniqueIndex<T, K>
where
    K: Eq + Hash + Clone + fmt::Debug + Send + Sync + 'static,
{
    /// Creates an empty index named `name` over rows of `table`.
    pub fn new(
        table: impl Into<String>,
        name: impl Into<String>,
        key_fn: impl Fn(&T) -> K + Send + Sync + 'static,
    ) -> Self {
        Self {
            table: table.into(),
            name: name.into(),
            key_fn: Box::new(key_fn),
            map: HashMap::new(),
        }
    }

    /// Derives the key for `data`.
    #[inline]
    pub fn key_of(&self, data: &T) -> K {
        (self.key_fn)(data)
    }

    /// Returns the row id stored under `key`.
    #[inline]
    pub fn get(&self, key: &K) -> Option<RowId> {
        self.map.get(key).copied()
    }

    #[inline]
    pub fn contains_key(&self, key: &K) -> bool {
        self.map.contains_key(key)
    }

    fn check_free(&self, key: &K, id: RowId) -> Result<()> {
        match self.map.get(key) {
            Some(&owner) if owner != id => Err(Error::duplicate_key(
                self.table.as_str(),
                self.name.as_str(),
                format!("{key:?}"),
            )),
            _ => Ok(()),
        }
    }
}

impl<T, K> RowIndex<T> for UniqueIndex<T, K>
where
    T: 'static,
    K: Eq + Hash + Clone + fmt::Debug + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn add(&mut self, row: &Row<T>) -> Result<()> {
        let key = self.key_of(&row.data);
        self.check_free(&key, row.id())?;
        self.map.insert(key, row.id());
        Ok(())
    }

    fn update(&mut self, old: &Row<T>, new: &Row<T>) -> Result<()> {
        let old_key = self.key_of(&old.data);
        let new_key = self.key_of(&new.data);
        if old_key == new_key {
            return Ok(());
        }

        // New key goes in first so a collision leaves the old mapping intact.
        self.check_free(&new_key, new.id())?;
        self.map.insert(new_key, new.id());
        if self.map.get(&old_key) == Some(&old.id()) {
            self.map.remove(&old_key);
        }
        Ok(())
    }

    fn remove(&mut self, row: &Row<T>) {
        let key = self.key_of(&row.data);
        self.map.remove(&key);
    }

    fn clear(&mut self) {
        self.map.clear();
    }

    fn len(&self) -> usize {
        self.map.len()
    }

    fn lookup_row(&self, data: &T) -> Option<RowId> {
        self.get(&self.key_of(data))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl<T, K: fmt::Debug> fmt::Debug for UniqueIndex<T, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UniqueIndex")
            .field("table", &self.table)
            .field("name", &self.name)
            .field("len", &self.map.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    struct Account {
        email: String,
        region: u8,
    }

    fn account(id: RowId, email: &str, region: u8) -> Row<Account> {
        Row::with_id(
            id,
            Account {
                email: email.into(),
                region,
            },
        )
    }

    fn by_email() -> UniqueIndex<Account, String> {
        UniqueIndex::new("accounts", "by_email", |a: &Account| a.email.clone())
    }

    #[test]
    fn test_add_and_get() {
        let mut index = by_email();
        index.add(&account(1, "a@x", 0)).unwrap();
        index.add(&account(2, "b@x", 0)).unwrap();

        assert_eq!(index.get(&"a@x".to_string()), Some(1));
        assert_eq!(index.lookup_row(&account(0, "b@x", 9).data), Some(2));
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_add_duplicate_rejected() {
        let mut index = by_email();
        index.add(&account(1, "a@x", 0)).unwrap();

        let err = index.add(&account(2, "a@x", 1)).unwrap_err();
        assert!(matches!(err, Error::DuplicateKey { ref index, .. } if index == "by_email"));
        assert_eq!(index.get(&"a@x".to_string()), Some(1));

        // Re-adding the owner is not a collision.
        index.add(&account(1, "a@x", 0)).unwrap();
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_update_moves_key() {
        let mut index = by_email();
        let old = account(1, "a@x", 0);
        index.add(&old).unwrap();

        let new = account(1, "c@x", 0);
        index.update(&old, &new).unwrap();
        assert_eq!(index.get(&"a@x".to_string()), None);
        assert_eq!(index.get(&"c@x".to_string()), Some(1));
    }

    #[test]
    fn test_update_collision_leaves_index_unchanged() {
        let mut index = by_email();
        let first = account(1, "a@x", 0);
        let second = account(2, "b@x", 0);
        index.add(&first).unwrap();
        index.add(&second).unwrap();

        let moved = account(2, "a@x", 0);
        assert!(index.update(&second, &moved).is_err());
        assert_eq!(index.get(&"a@x".to_string()), Some(1));
        assert_eq!(index.get(&"b@x".to_string()), Some(2));
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_update_same_key_is_noop() {
        let mut index = by_email();
        let old = account(1, "a@x", 0);
        index.add(&old).unwrap();
        index.update(&old, &account(1, "a@x", 5)).unwrap();
        assert_eq!(index.get(&"a@x".to_string()), Some(1));
    }

    #[test]
    fn test_remove_and_clear() {
        let mut index = by_email();
        let row = account(1, "a@x", 0);
        index.add(&row).unwrap();
        index.add(&account(2, "b@x", 0)).unwrap();

        index.remove(&row);
        assert!(!index.contains_key(&"a@x".to_string()));
        index.clear();
        assert!(index.is_empty());
    }
}
