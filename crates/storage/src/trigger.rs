//! Priority-ordered trigger lists and the callback types tables accept.
//!
//! A list stays sorted by priority, lowest first, with equal priorities kept
//! in registration order. Priorities of zero or below mark system triggers,
//! which keep running when a caller disables user triggers (bulk `load`).

use smallvec::SmallVec;
use std::sync::Arc;
use tessera_core::{CascadeOperation, Result, Row, RowId, TableOperation};

/// Priority used by the registration helpers that take none.
pub const USER_PRIORITY: i32 = i32::MAX;

/// Highest priority still treated as a system trigger.
pub const SYSTEM_PRIORITY: i32 = 0;

/// Returns true if `priority` marks a system trigger.
#[inline]
pub fn is_system(priority: i32) -> bool {
    priority <= SYSTEM_PRIORITY
}

/// Handle for removing a registered trigger or listener.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TriggerId(pub(crate) u64);

/// Before-add trigger. May rewrite the row.
pub type BeforeAddFn<T> = dyn Fn(&mut Row<T>) -> Result<()> + Send + Sync;
/// After-add, before-remove and after-remove trigger.
pub type RowTriggerFn<T> = dyn Fn(&Row<T>) -> Result<()> + Send + Sync;
/// Before-update trigger: stored row, then the new image it may rewrite.
pub type BeforeUpdateFn<T> = dyn Fn(&Row<T>, &mut Row<T>) -> Result<()> + Send + Sync;
/// After-update trigger: previous row, then the stored new row.
pub type AfterUpdateFn<T> = dyn Fn(&Row<T>, &Row<T>) -> Result<()> + Send + Sync;

/// Injected validation of a row about to be added.
pub type ValidateAddFn<T> = dyn Fn(&T) -> Result<()> + Send + Sync;
/// Injected validation of an update: new data, then stored data.
pub type ValidateUpdateFn<T> = dyn Fn(&T, &T) -> Result<()> + Send + Sync;
/// Injected handling of rows referencing one that is about to be removed.
pub type CascadeFn = dyn Fn(RowId, CascadeOperation) -> Result<()> + Send + Sync;
/// Row-modified listener: slot and operation.
pub type RowModifiedFn = dyn Fn(usize, TableOperation) + Send + Sync;

/// Triggers captured for the duration of one mutation.
pub type TriggerSnapshot<F> = SmallVec<[Arc<F>; 4]>;

struct Entry<F: ?Sized> {
    id: TriggerId,
    priority: i32,
    callback: Arc<F>,
}

/// Insertion-sorted trigger list.
pub struct TriggerList<F: ?Sized> {
    entries: Vec<Entry<F>>,
}

impl<F: ?Sized> TriggerList<F> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Inserts after every entry with a priority at or below `priority`.
    pub fn insert(&mut self, id: TriggerId, priority: i32, callback: Arc<F>) {
        let at = self.entries.partition_point(|e| e.priority <= priority);
        self.entries.insert(
            at,
            Entry {
                id,
                priority,
                callback,
            },
        );
    }

    /// Removes the trigger registered under `id`.
    pub fn remove(&mut self, id: TriggerId) -> bool {
        match self.entries.iter().position(|e| e.id == id) {
            Some(index) => {
                self.entries.remove(index);
                true
            }
            None => false,
        }
    }

    /// Returns the triggers to run, in order. Without `include_user` only system
    /// triggers are returned.
    pub fn snapshot(&self, include_user: bool) -> TriggerSnapshot<F> {
        self.entries
            .iter()
            .filter(|e| include_user || is_system(e.priority))
            .map(|e| Arc::clone(&e.callback))
            .collect()
    }

    /// Returns the priorities in run order.
    pub fn priorities(&self) -> Vec<i32> {
        self.entries.iter().map(|e| e.priority).collect()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<F: ?Sized> Default for TriggerList<F> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    type Probe = dyn Fn(&mut Vec<&'static str>) + Send + Sync;

    fn probe(label: &'static str) -> Arc<Probe> {
        Arc::new(move |out: &mut Vec<&'static str>| out.push(label))
    }

    fn run(list: &TriggerList<Probe>, include_user: bool) -> Vec<&'static str> {
        let mut out = Vec::new();
        for trigger in list.snapshot(include_user) {
            trigger(&mut out);
        }
        out
    }

    #[test]
    fn test_priority_order_with_stable_ties() {
        let mut list = TriggerList::new();
        list.insert(TriggerId(1), 10, probe("b1"));
        list.insert(TriggerId(2), 5, probe("a"));
        list.insert(TriggerId(3), 10, probe("b2"));
        list.insert(TriggerId(4), USER_PRIORITY, probe("z"));
        list.insert(TriggerId(5), -1, probe("sys"));

        assert_eq!(list.priorities(), vec![-1, 5, 10, 10, USER_PRIORITY]);
        assert_eq!(run(&list, true), vec!["sys", "a", "b1", "b2", "z"]);
    }

    #[test]
    fn test_user_triggers_can_be_skipped() {
        let mut list = TriggerList::new();
        list.insert(TriggerId(1), 0, probe("sys0"));
        list.insert(TriggerId(2), 1, probe("user"));
        list.insert(TriggerId(3), -5, probe("sys-5"));
        assert_eq!(run(&list, false), vec!["sys-5", "sys0"]);
    }

    #[test]
    fn test_remove() {
        let calls = Arc::new(Mutex::new(0));
        let mut list: TriggerList<dyn Fn() + Send + Sync> = TriggerList::new();
        let counter = Arc::clone(&calls);
        list.insert(TriggerId(7), 1, Arc::new(move || *counter.lock().unwrap() += 1));

        assert!(list.remove(TriggerId(7)));
        assert!(!list.remove(TriggerId(7)));
        assert!(list.snapshot(true).is_empty());
        assert_eq!(*calls.lock().unwrap(), 0);
    }
}
