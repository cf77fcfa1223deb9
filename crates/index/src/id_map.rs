//! Dense id map.

use crate::traits::IntegerMap;

const VACANT: u32 = u32::MAX;

/// Map from non-negative ids to `u32` values backed by one growable array
/// indexed by id.
///
/// Suited to small dense id domains such as the id-to-slot map of a table whose
/// ids are handed out sequentially. Memory is proportional to the largest id.
#[derive(Clone, Debug, Default)]
pub struct IdMap {
    values: Vec<u32>,
    len: usize,
}

impl IdMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a map with room for ids below `capacity`.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            values: Vec::with_capacity(capacity),
            len: 0,
        }
    }
}

impl IntegerMap for IdMap {
    type Value = u32;

    #[inline]
    fn get(&self, key: i32) -> Option<u32> {
        let index = usize::try_from(key).ok()?;
        match self.values.get(index) {
            Some(&value) if value != VACANT => Some(value),
            _ => None,
        }
    }

    /// # Panics
    ///
    /// Panics if `key` is negative or `value` is `u32::MAX`.
    fn insert(&mut self, key: i32, value: u32) -> Option<u32> {
        assert!(value != VACANT, "IdMap value out of range");
        let index = usize::try_from(key).unwrap_or_else(|_| panic!("IdMap key {key} is negative"));
        if index >= self.values.len() {
            self.values.resize(index + 1, VACANT);
        }
        let previous = core::mem::replace(&mut self.values[index], value);
        if previous == VACANT {
            self.len += 1;
            None
        } else {
            Some(previous)
        }
    }

    fn remove(&mut self, key: i32) -> Option<u32> {
        let index = usize::try_from(key).ok()?;
        let slot = self.values.get_mut(index)?;
        if *slot == VACANT {
            return None;
        }
        self.len -= 1;
        Some(core::mem::replace(slot, VACANT))
    }

    fn clear(&mut self) {
        self.values.clear();
        self.len = 0;
    }

    #[inline]
    fn len(&self) -> usize {
        self.len
    }

    fn iter(&self) -> impl Iterator<Item = (i32, u32)> + '_ {
        self.values
            .iter()
            .enumerate()
            .filter(|&(_, &value)| value != VACANT)
            .map(|(key, &value)| (key as i32, value))
    }
}
