//! Word-page bit storage shared by `IdSet` and `IntSet`.
//!
//! Keys are first mapped to non-negative codes by a `KeyCodec`. A code lives in
//! word `code >> 6` at bit `code & 63`. A second-level summary bitmap records
//! every word that has held a bit since the last clear, so iteration skips runs
//! of untouched words.

use smallvec::SmallVec;

/// Words kept inline by bulk-operation masks before spilling to the heap.
pub(crate) const MASK_INLINE_WORDS: usize = 64;

pub(crate) type Mask = SmallVec<[u64; MASK_INLINE_WORDS]>;

#[inline]
pub(crate) fn split(code: u32) -> (usize, u64) {
    ((code >> 6) as usize, 1u64 << (code & 63))
}

/// Maps `i32` keys to storage codes and back.
pub trait KeyCodec {
    /// Returns the storage code for `key`, or `None` if the codec cannot store it.
    fn encode(key: i32) -> Option<u32>;

    /// Inverse of `encode`.
    fn decode(code: u32) -> i32;
}

/// Stores non-negative keys as themselves.
#[derive(Clone, Copy, Debug, Default)]
pub struct Identity;

/// Interleaves negative and non-negative keys: 0, -1, 1, -2, 2, ...
#[derive(Clone, Copy, Debug, Default)]
pub struct ZigZag;

impl KeyCodec for Identity {
    #[inline]
    fn encode(key: i32) -> Option<u32> {
        u32::try_from(key).ok()
    }

    #[inline]
    fn decode(code: u32) -> i32 {
        code as i32
    }
}

impl KeyCodec for ZigZag {
    #[inline]
    fn encode(key: i32) -> Option<u32> {
        Some(((key << 1) ^ (key >> 31)) as u32)
    }

    #[inline]
    fn decode(code: u32) -> i32 {
        ((code >> 1) as i32) ^ -((code & 1) as i32)
    }
}

/// How a bulk mask is combined with the stored words.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum MaskOp {
    Or,
    And,
    AndNot,
    Xor,
}

#[derive(Clone, Debug, Default)]
pub(crate) struct BitPages {
    words: Vec<u64>,
    active: Vec<u64>,
    len: usize,
}

impl BitPages {
    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub(crate) fn word_count(&self) -> usize {
        self.words.len()
    }

    #[inline]
    pub(crate) fn contains(&self, code: u32) -> bool {
        let (page, bit) = split(code);
        self.words.get(page).map_or(false, |w| w & bit != 0)
    }

    pub(crate) fn insert(&mut self, code: u32) -> bool {
        let (page, bit) = split(code);
        if page >= self.words.len() {
            self.words.resize(page + 1, 0);
        }
        if self.words[page] & bit != 0 {
            return false;
        }
        self.words[page] |= bit;
        self.len += 1;
        self.mark_active(page);
        true
    }

    pub(crate) fn remove(&mut self, code: u32) -> bool {
        let (page, bit) = split(code);
        match self.words.get_mut(page) {
            Some(word) if *word & bit != 0 => {
                *word &= !bit;
                self.len -= 1;
                true
            }
            _ => false,
        }
    }

    pub(crate) fn clear(&mut self) {
        self.words.clear();
        self.active.clear();
        self.len = 0;
    }

    fn mark_active(&mut self, page: usize) {
        let (summary, bit) = split(page as u32);
        if summary >= self.active.len() {
            self.active.resize(summary + 1, 0);
        }
        self.active[summary] |= bit;
    }

    /// Combines `mask` word by word with the stored pages.
    ///
    /// `Or` and `Xor` grow storage to the mask length; `And` treats words past the
    /// mask as zero; `AndNot` ignores mask words past the stored pages.
    pub(crate) fn apply(&mut self, mask: &[u64], op: MaskOp) {
        match op {
            MaskOp::Or | MaskOp::Xor => {
                if mask.len() > self.words.len() {
                    self.words.resize(mask.len(), 0);
                }
            }
            MaskOp::And => {
                for word in self.words.iter_mut().skip(mask.len()) {
                    *word = 0;
                }
            }
            MaskOp::AndNot => {}
        }

        let mut len = self.len;
        for (page, &m) in mask.iter().enumerate() {
            let Some(word) = self.words.get_mut(page) else {
                break;
            };
            let before = *word;
            let after = match op {
                MaskOp::Or => before | m,
                MaskOp::And => before & m,
                MaskOp::AndNot => before & !m,
                MaskOp::Xor => before ^ m,
            };
            *word = after;
            len = len + after.count_ones() as usize - before.count_ones() as usize;
            if after != 0 && before == 0 {
                self.mark_active(page);
            }
        }

        if op == MaskOp::And {
            len = self.words.iter().map(|w| w.count_ones() as usize).sum();
        }
        self.len = len;
    }

    pub(crate) fn codes(&self) -> Codes<'_> {
        Codes {
            words: &self.words,
            active: &self.active,
            summary_index: 0,
            summary: self.active.first().copied().unwrap_or(0),
            page: 0,
            word: 0,
        }
    }
}

/// Builds a mask from `keys`, skipping keys the codec rejects.
///
/// With `limit`, codes falling past `limit` words are dropped and the mask is
/// never longer than `limit`.
pub(crate) fn build_mask<C: KeyCodec>(keys: &[i32], limit: Option<usize>) -> Mask {
    let mut words = 0usize;
    for &key in keys {
        if let Some(code) = C::encode(key) {
            words = words.max(split(code).0 + 1);
        }
    }
    if let Some(limit) = limit {
        words = words.min(limit);
    }

    let mut mask: Mask = SmallVec::from_elem(0, words);
    for &key in keys {
        if let Some(code) = C::encode(key) {
            let (page, bit) = split(code);
            if page < words {
                mask[page] |= bit;
            }
        }
    }
    mask
}

/// Set codes in ascending order, found by trailing-zero scans of the summary
/// bitmap and then of each active word.
pub(crate) struct Codes<'a> {
    words: &'a [u64],
    active: &'a [u64],
    summary_index: usize,
    summary: u64,
    page: usize,
    word: u64,
}

impl Iterator for Codes<'_> {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        loop {
            if self.word != 0 {
                let bit = self.word.trailing_zeros();
                self.word &= self.word - 1;
                return Some(((self.page as u32) << 6) | bit);
            }
            while self.summary == 0 {
                self.summary_index += 1;
                self.summary = *self.active.get(self.summary_index)?;
            }
            let bit = self.summary.trailing_zeros() as usize;
            self.summary &= self.summary - 1;
            self.page = (self.summary_index << 6) | bit;
            self.word = self.words.get(self.page).copied().unwrap_or(0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zigzag_codes() {
        assert_eq!(ZigZag::encode(0), Some(0));
        assert_eq!(ZigZag::encode(-1), Some(1));
        assert_eq!(ZigZag::encode(1), Some(2));
        assert_eq!(ZigZag::encode(-2), Some(3));
        assert_eq!(ZigZag::encode(i32::MIN), Some(u32::MAX));
        for key in [0, 1, -1, 63, -64, i32::MAX, i32::MIN] {
            assert_eq!(ZigZag::decode(ZigZag::encode(key).unwrap()), key);
        }
    }

    #[test]
    fn test_identity_rejects_negative() {
        assert_eq!(Identity::encode(-1), None);
        assert_eq!(Identity::encode(65), Some(65));
    }

    #[test]
    fn test_codes_skip_untouched_pages() {
        let mut pages = BitPages::default();
        for code in [5000, 3, 64, 63, 70000] {
            assert!(pages.insert(code));
        }
        assert!(!pages.insert(64));
        assert_eq!(pages.codes().collect::<Vec<_>>(), vec![3, 63, 64, 5000, 70000]);

        pages.remove(64);
        assert_eq!(pages.len(), 4);
        assert_eq!(pages.codes().collect::<Vec<_>>(), vec![3, 63, 5000, 70000]);
    }

    #[test]
    fn test_mask_limit() {
        let mask = build_mask::<Identity>(&[1, 200, -4], Some(2));
        assert_eq!(mask.len(), 2);
        assert_eq!(mask[0], 1 << 1);
        assert_eq!(mask[1], 0);
    }
}
