//! Per-table row id generator.

use parking_lot::Mutex;
use tessera_core::RowId;

/// Monotonic source of row ids for one table.
///
/// Holds the last id handed out (0 when none). Each table owns its own
/// generator and lock.
#[derive(Debug, Default)]
pub struct KeyGenerator {
    last: Mutex<RowId>,
}

impl KeyGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the next id, or `None` once the id space is exhausted.
    pub fn next_id(&self) -> Option<RowId> {
        let mut last = self.last.lock();
        let next = last.checked_add(1)?;
        *last = next;
        Some(next)
    }

    /// Raises the high-water mark to `id`. Returns true if it moved.
    pub fn ensure_at_least(&self, id: RowId) -> bool {
        let mut last = self.last.lock();
        if id > *last {
            *last = id;
            true
        } else {
            false
        }
    }

    /// Sets the last issued id, so the next one is `value + 1`.
    pub fn reset(&self, value: RowId) {
        *self.last.lock() = value;
    }

    /// Returns the last issued id.
    pub fn current(&self) -> RowId {
        *self.last.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_and_reset() {
        let keys = KeyGenerator::new();
        assert_eq!(keys.next_id(), Some(1));
        assert_eq!(keys.next_id(), Some(2));

        assert!(keys.ensure_at_least(10));
        assert!(!keys.ensure_at_least(4));
        assert_eq!(keys.next_id(), Some(11));

        keys.reset(0);
        assert_eq!(keys.current(), 0);
        assert_eq!(keys.next_id(), Some(1));
    }

    #[test]
    fn test_exhaustion() {
        let keys = KeyGenerator::new();
        keys.reset(RowId::MAX);
        assert_eq!(keys.next_id(), None);
        assert_eq!(keys.current(), RowId::MAX);
    }
}
