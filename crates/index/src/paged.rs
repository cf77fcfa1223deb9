//! Paged integer maps for sparse or large key domains.
//!
//! Values live in fixed-size pages allocated on first write, so memory tracks
//! the pages actually touched rather than the largest key.

use crate::bits::{KeyCodec, ZigZag};
use crate::set::IntSet;
use crate::traits::IntegerMap;

const PAGE_SHIFT: u32 = 10;

/// Entries per page.
pub const PAGE_SIZE: usize = 1 << PAGE_SHIFT;

const PAGE_MASK: u32 = (PAGE_SIZE as u32) - 1;

#[inline]
fn locate(code: u32) -> (usize, usize) {
    ((code >> PAGE_SHIFT) as usize, (code & PAGE_MASK) as usize)
}

/// Array of lazily allocated value pages addressed by non-negative code.
#[derive(Clone, Debug)]
struct PagedStore<V> {
    pages: Vec<Option<Box<[V]>>>,
    fill: V,
}

impl<V: Copy> PagedStore<V> {
    fn new(fill: V) -> Self {
        Self {
            pages: Vec::new(),
            fill,
        }
    }

    #[inline]
    fn get(&self, code: u32) -> Option<V> {
        let (page, offset) = locate(code);
        self.pages.get(page)?.as_ref().map(|p| p[offset])
    }

    fn slot_mut(&mut self, code: u32) -> &mut V {
        let (page, offset) = locate(code);
        if page >= self.pages.len() {
            self.pages.resize_with(page + 1, || None);
        }
        let fill = self.fill;
        let page = self.pages[page].get_or_insert_with(|| vec![fill; PAGE_SIZE].into_boxed_slice());
        &mut page[offset]
    }

    fn allocated_pages(&self) -> usize {
        self.pages.iter().filter(|p| p.is_some()).count()
    }

    fn clear(&mut self) {
        self.pages.clear();
    }

    fn entries(&self) -> impl Iterator<Item = (u32, V)> + '_ {
        self.pages.iter().enumerate().flat_map(|(index, page)| {
            let base = (index as u32) << PAGE_SHIFT;
            page.iter()
                .flat_map(|values| values.iter().copied().enumerate())
                .map(move |(offset, value)| (base | offset as u32, value))
        })
    }
}

const VACANT: u32 = u32::MAX;

/// Map from non-negative ids to `u32` values stored in 1024-entry pages.
#[derive(Clone, Debug)]
pub struct PagedIdMap {
    store: PagedStore<u32>,
    len: usize,
}

impl PagedIdMap {
    pub fn new() -> Self {
        Self {
            store: PagedStore::new(VACANT),
            len: 0,
        }
    }

    /// Returns the number of pages currently allocated.
    pub fn allocated_pages(&self) -> usize {
        self.store.allocated_pages()
    }
}

impl Default for PagedIdMap {
    fn default() -> Self {
        Self::new()
    }
}

impl IntegerMap for PagedIdMap {
    type Value = u32;

    #[inline]
    fn get(&self, key: i32) -> Option<u32> {
        let code = u32::try_from(key).ok()?;
        self.store.get(code).filter(|&value| value != VACANT)
    }

    /// # Panics
    ///
    /// Panics if `key` is negative or `value` is `u32::MAX`.
    fn insert(&mut self, key: i32, value: u32) -> Option<u32> {
        assert!(value != VACANT, "PagedIdMap value out of range");
        let code =
            u32::try_from(key).unwrap_or_else(|_| panic!("PagedIdMap key {key} is negative"));
        let previous = core::mem::replace(self.store.slot_mut(code), value);
        if previous == VACANT {
            self.len += 1;
            None
        } else {
            Some(previous)
        }
    }

    fn remove(&mut self, key: i32) -> Option<u32> {
        let code = u32::try_from(key).ok()?;
        self.store.get(code).filter(|&value| value != VACANT)?;
        self.len -= 1;
        Some(core::mem::replace(self.store.slot_mut(code), VACANT))
    }

    fn clear(&mut self) {
        self.store.clear();
        self.len = 0;
    }

    #[inline]
    fn len(&self) -> usize {
        self.len
    }

    fn iter(&self) -> impl Iterator<Item = (i32, u32)> + '_ {
        self.store
            .entries()
            .filter(|&(_, value)| value != VACANT)
            .map(|(code, value)| (code as i32, value))
    }
}

/// Map over the full `i32` key domain.
///
/// Keys are zig-zag encoded before paging, and membership is tracked by an
/// `IntSet`, so every `V` value (including `V::default()`) can be stored.
/// Iteration follows zig-zag order: 0, -1, 1, -2, 2, ...
#[derive(Clone, Debug)]
pub struct IntMap<V> {
    keys: IntSet,
    store: PagedStore<V>,
}

impl<V: Copy + Default> IntMap<V> {
    pub fn new() -> Self {
        Self {
            keys: IntSet::new(),
            store: PagedStore::new(V::default()),
        }
    }

    /// Returns the set of present keys.
    pub fn keys(&self) -> &IntSet {
        &self.keys
    }
}

impl<V: Copy + Default> Default for IntMap<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Copy + Default> IntegerMap for IntMap<V> {
    type Value = V;

    fn get(&self, key: i32) -> Option<V> {
        if !self.keys.contains(key) {
            return None;
        }
        self.store.get(ZigZag::encode(key)?)
    }

    fn insert(&mut self, key: i32, value: V) -> Option<V> {
        let previous = self.get(key);
        if let Some(code) = ZigZag::encode(key) {
            *self.store.slot_mut(code) = value;
            self.keys.insert(key);
        }
        previous
    }

    fn remove(&mut self, key: i32) -> Option<V> {
        let previous = self.get(key)?;
        self.keys.remove(key);
        Some(previous)
    }

    #[inline]
    fn contains_key(&self, key: i32) -> bool {
        self.keys.contains(key)
    }

    fn clear(&mut self) {
        self.keys.clear();
        self.store.clear();
    }

    #[inline]
    fn len(&self) -> usize {
        self.keys.len()
    }

    fn iter(&self) -> impl Iterator<Item = (i32, V)> + '_ {
        self.keys.iter().filter_map(move |key| {
            let value = self.store.get(ZigZag::encode(key)?)?;
            Some((key, value))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paged_id_map_allocates_lazily() {
        let mut map = PagedIdMap::new();
        assert_eq!(map.allocated_pages(), 0);

        map.insert(3, 30);
        map.insert(1_000_000, 7);
        assert_eq!(map.allocated_pages(), 2);
        assert_eq!(map.len(), 2);
        assert_eq!(map.get(1_000_000), Some(7));
        assert_eq!(map.get(999_999), None);
        assert_eq!(map.iter().collect::<Vec<_>>(), vec![(3, 30), (1_000_000, 7)]);

        assert_eq!(map.remove(3), Some(30));
        assert_eq!(map.remove(3), None);
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_int_map_negative_keys_and_default_values() {
        let mut map: IntMap<i64> = IntMap::new();
        assert_eq!(map.insert(-5, 0), None);
        assert_eq!(map.insert(5, 50), None);
        assert_eq!(map.insert(-5, -1), Some(0));
        assert!(map.contains_key(-5));
        assert_eq!(map.get(-5), Some(-1));
        assert_eq!(map.get(4), None);
        assert_eq!(map.iter().collect::<Vec<_>>(), vec![(-5, -1), (5, 50)]);

        assert_eq!(map.remove(-5), Some(-1));
        assert_eq!(map.get(-5), None);
        map.clear();
        assert!(map.is_empty());
    }
}
