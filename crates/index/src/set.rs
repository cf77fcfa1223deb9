//! Compact integer sets.
//!
//! `IdSet` holds non-negative ids and iterates them in ascending order. `IntSet`
//! accepts the whole `i32` domain by zig-zag encoding keys, and iterates in code
//! order: 0, -1, 1, -2, 2, ...
//!
//! Bulk operations take a span of raw integers, fold it into a temporary word
//! mask and combine that mask with the stored words, so a call costs
//! O(span + pages) rather than one lookup per element. Duplicates in a span are
//! harmless for every operation.

use crate::bits::{build_mask, BitPages, Codes, Identity, KeyCodec, MaskOp, ZigZag};
use core::fmt;
use core::marker::PhantomData;

/// A bitset over `i32` keys stored through the codec `C`.
pub struct BitSet<C: KeyCodec> {
    pages: BitPages,
    _codec: PhantomData<C>,
}

/// Set of non-negative ids. Negative keys are never members.
pub type IdSet = BitSet<Identity>;

/// Set over the full `i32` domain.
pub type IntSet = BitSet<ZigZag>;

impl<C: KeyCodec> BitSet<C> {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self {
            pages: BitPages::default(),
            _codec: PhantomData,
        }
    }

    /// Adds `key`. Returns false if it was already present or cannot be stored.
    pub fn insert(&mut self, key: i32) -> bool {
        match C::encode(key) {
            Some(code) => self.pages.insert(code),
            None => false,
        }
    }

    /// Removes `key`. Returns false if it was not present.
    pub fn remove(&mut self, key: i32) -> bool {
        match C::encode(key) {
            Some(code) => self.pages.remove(code),
            None => false,
        }
    }

    #[inline]
    pub fn contains(&self, key: i32) -> bool {
        C::encode(key).map_or(false, |code| self.pages.contains(code))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pages.len() == 0
    }

    /// Removes every key and releases the page storage.
    pub fn clear(&mut self) {
        self.pages.clear();
    }

    pub fn iter(&self) -> Iter<'_, C> {
        Iter {
            codes: self.pages.codes(),
            _codec: PhantomData,
        }
    }

    /// Adds every key in `keys`.
    pub fn union_with(&mut self, keys: &[i32]) {
        let mask = build_mask::<C>(keys, None);
        self.pages.apply(&mask, MaskOp::Or);
    }

    /// Keeps only the keys that also appear in `keys`.
    pub fn intersect_with(&mut self, keys: &[i32]) {
        if self.is_empty() {
            return;
        }
        let mask = build_mask::<C>(keys, Some(self.pages.word_count()));
        self.pages.apply(&mask, MaskOp::And);
    }

    /// Removes every key that appears in `keys`.
    pub fn except_with(&mut self, keys: &[i32]) {
        if self.is_empty() {
            return;
        }
        let mask = build_mask::<C>(keys, Some(self.pages.word_count()));
        self.pages.apply(&mask, MaskOp::AndNot);
    }

    /// Keeps the keys present in exactly one of `self` and `keys`.
    pub fn symmetric_except_with(&mut self, keys: &[i32]) {
        let mask = build_mask::<C>(keys, None);
        self.pages.apply(&mask, MaskOp::Xor);
    }
}

impl<C: KeyCodec> Default for BitSet<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: KeyCodec> Clone for BitSet<C> {
    fn clone(&self) -> Self {
        Self {
            pages: self.pages.clone(),
            _codec: PhantomData,
        }
    }
}

impl<C: KeyCodec> fmt::Debug for BitSet<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<C: KeyCodec> PartialEq for BitSet<C> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|key| other.contains(key))
    }
}

impl<C: KeyCodec> Eq for BitSet<C> {}

impl<C: KeyCodec> FromIterator<i32> for BitSet<C> {
    fn from_iter<I: IntoIterator<Item = i32>>(iter: I) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

impl<C: KeyCodec> Extend<i32> for BitSet<C> {
    fn extend<I: IntoIterator<Item = i32>>(&mut self, iter: I) {
        for key in iter {
            self.insert(key);
        }
    }
}

impl<'a, C: KeyCodec> IntoIterator for &'a BitSet<C> {
    type Item = i32;
    type IntoIter = Iter<'a, C>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over the keys of a `BitSet`, in code order.
pub struct Iter<'a, C: KeyCodec> {
    codes: Codes<'a>,
    _codec: PhantomData<C>,
}

impl<C: KeyCodec> Iterator for Iter<'_, C> {
    type Item = i32;

    #[inline]
    fn next(&mut self) -> Option<i32> {
        self.codes.next().map(C::decode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_set_basic() {
        let mut set = IdSet::new();
        assert!(set.insert(10));
        assert!(set.insert(3));
        assert!(!set.insert(10));
        assert!(!set.insert(-1));
        assert!(set.contains(3));
        assert!(!set.contains(-1));
        assert_eq!(set.len(), 2);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![3, 10]);

        assert!(set.remove(3));
        assert!(!set.remove(3));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_int_set_zigzag_order() {
        let set: IntSet = [2, -1, 0, 1, -2].into_iter().collect();
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![0, -1, 1, -2, 2]);
    }

    #[test]
    fn test_bulk_operations() {
        let mut set: IdSet = [1, 2, 3, 100].into_iter().collect();
        set.intersect_with(&[2, 3, 3, 500, -7]);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![2, 3]);

        set.union_with(&[3, 4, 1000]);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![2, 3, 4, 1000]);

        set.except_with(&[4, 5, 70000]);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![2, 3, 1000]);

        set.symmetric_except_with(&[3, 9, 9]);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![2, 9, 1000]);
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn test_bulk_with_empty_span() {
        let mut set: IntSet = [-5, 5].into_iter().collect();
        set.union_with(&[]);
        set.except_with(&[]);
        set.symmetric_except_with(&[]);
        assert_eq!(set.len(), 2);

        set.intersect_with(&[]);
        assert!(set.is_empty());
        assert_eq!(set.iter().next(), None);
    }

    #[test]
    fn test_clear_and_reuse() {
        let mut set = IdSet::new();
        set.union_with(&[1, 64, 4096]);
        set.clear();
        assert!(set.is_empty());
        set.insert(7);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![7]);
    }
}
