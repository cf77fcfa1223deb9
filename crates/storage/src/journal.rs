//! Undo journal backing table changesets.
//!
//! The journal records just enough to invert each mutation. Nested changesets
//! share one entry stack; each `begin` pushes a marker holding the entry count
//! at that moment, and a rollback undoes exactly the entries above its marker.
//! Inner commits only pop their marker: the entries stay until the outermost
//! changeset commits, so an outer rollback still undoes them.

use tessera_core::{Error, Result, Row, RowId};

/// A single undoable change.
#[derive(Clone, Debug, PartialEq)]
pub enum LogEntry<T> {
    /// A row was added. Holds the row as added.
    Add(Row<T>),
    /// A row was overwritten. Holds the prior image.
    Update(Row<T>),
    /// A row was removed. Holds the removed image.
    Remove(Row<T>),
    /// The key generator moved. Holds its prior value.
    KeyGeneratorReset(RowId),
}

/// Receiver of undo steps during rollback.
pub trait UndoTarget<T> {
    /// Removes a row that was added.
    fn undo_add(&mut self, row: &Row<T>) -> Result<()>;

    /// Puts back the prior image of an updated row.
    fn undo_update(&mut self, prior: Row<T>) -> Result<()>;

    /// Re-inserts a removed row.
    fn undo_remove(&mut self, prior: Row<T>) -> Result<()>;

    /// Restores the key generator to `value`.
    fn restore_key(&mut self, value: RowId);
}

/// Changeset journal for one table.
#[derive(Debug)]
pub struct ChangeSetLog<T> {
    table: String,
    entries: Vec<LogEntry<T>>,
    markers: Vec<usize>,
    fault: Option<String>,
}

impl<T> ChangeSetLog<T> {
    /// Creates an empty journal for `table`.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            entries: Vec::new(),
            markers: Vec::new(),
            fault: None,
        }
    }

    /// Returns true while at least one changeset is open.
    #[inline]
    pub fn is_active(&self) -> bool {
        !self.markers.is_empty()
    }

    /// Returns the number of open changesets.
    #[inline]
    pub fn depth(&self) -> usize {
        self.markers.len()
    }

    /// Returns the number of undo entries held.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the recorded failure, if any.
    pub fn fault(&self) -> Option<&str> {
        self.fault.as_deref()
    }

    /// Fails with `TransactionFaulted` if a failure has been recorded.
    pub fn check_fault(&self) -> Result<()> {
        match &self.fault {
            Some(cause) => Err(Error::transaction_faulted(self.table.as_str(), cause.as_str())),
            None => Ok(()),
        }
    }

    /// Records the first failure seen while a changeset is open.
    pub fn record_fault(&mut self, error: &Error) {
        if self.is_active() && self.fault.is_none() {
            self.fault = Some(error.to_string());
        }
    }

    /// Opens a changeset.
    pub fn begin(&mut self) -> Result<()> {
        self.check_fault()?;
        self.markers.push(self.entries.len());
        Ok(())
    }

    /// Appends an entry if a changeset is open.
    pub fn record(&mut self, entry: LogEntry<T>) {
        if self.is_active() {
            self.entries.push(entry);
        }
    }

    /// Closes the innermost changeset, keeping its effects.
    pub fn commit(&mut self) -> Result<()> {
        if self.markers.is_empty() {
            return Err(Error::no_active_change_set(self.table.as_str()));
        }
        self.check_fault()?;
        self.markers.pop();
        if self.markers.is_empty() {
            self.entries.clear();
        }
        Ok(())
    }

    /// Closes the innermost changeset, undoing its entries newest first.
    ///
    /// Clears any recorded failure: a failure blocks `begin`, so it always lies
    /// within the changeset being rolled back.
    pub fn rollback(&mut self, target: &mut impl UndoTarget<T>) -> Result<usize> {
        let marker = self
            .markers
            .pop()
            .ok_or_else(|| Error::no_active_change_set(self.table.as_str()))?;
        self.fault = None;

        let undone = self.entries.len() - marker;
        while self.entries.len() > marker {
            let Some(entry) = self.entries.pop() else {
                break;
            };
            match entry {
                LogEntry::Add(row) => target.undo_add(&row)?,
                LogEntry::Update(prior) => target.undo_update(prior)?,
                LogEntry::Remove(prior) => target.undo_remove(prior)?,
                LogEntry::KeyGeneratorReset(value) => target.restore_key(value),
            }
        }
        Ok(undone)
    }

    /// Returns the entries currently held, oldest first.
    pub fn entries(&self) -> &[LogEntry<T>] {
        &self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        steps: Vec<String>,
        key: RowId,
    }

    impl UndoTarget<&'static str> for Recorder {
        fn undo_add(&mut self, row: &Row<&'static str>) -> Result<()> {
            self.steps.push(format!("unadd {}", row.id()));
            Ok(())
        }

        fn undo_update(&mut self, prior: Row<&'static str>) -> Result<()> {
            self.steps.push(format!("restore {} {}", prior.id(), prior.data));
            Ok(())
        }

        fn undo_remove(&mut self, prior: Row<&'static str>) -> Result<()> {
            self.steps.push(format!("readd {}", prior.id()));
            Ok(())
        }

        fn restore_key(&mut self, value: RowId) {
            self.key = value;
            self.steps.push(format!("key {value}"));
        }
    }

    #[test]
    fn test_record_requires_open_changeset() {
        let mut log = ChangeSetLog::new("t");
        log.record(LogEntry::Add(Row::with_id(1, "a")));
        assert!(log.is_empty());

        log.begin().unwrap();
        log.record(LogEntry::Add(Row::with_id(1, "a")));
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn test_rollback_replays_in_reverse() {
        let mut log = ChangeSetLog::new("t");
        log.begin().unwrap();
        log.record(LogEntry::KeyGeneratorReset(2));
        log.record(LogEntry::Add(Row::with_id(3, "c")));
        log.record(LogEntry::Update(Row::with_id(1, "a")));
        log.record(LogEntry::Remove(Row::with_id(2, "b")));

        let mut target = Recorder::default();
        assert_eq!(log.rollback(&mut target).unwrap(), 4);
        assert_eq!(
            target.steps,
            vec!["readd 2", "restore 1 a", "unadd 3", "key 2"]
        );
        assert_eq!(target.key, 2);
        assert!(!log.is_active());
        assert!(log.is_empty());
    }

    #[test]
    fn test_inner_commit_keeps_entries_for_outer_rollback() {
        let mut log = ChangeSetLog::new("t");
        log.begin().unwrap();
        log.record(LogEntry::Add(Row::with_id(1, "a")));
        log.begin().unwrap();
        log.record(LogEntry::Add(Row::with_id(2, "b")));
        log.commit().unwrap();
        assert_eq!(log.depth(), 1);
        assert_eq!(log.len(), 2);

        let mut target = Recorder::default();
        log.rollback(&mut target).unwrap();
        assert_eq!(target.steps, vec!["unadd 2", "unadd 1"]);
    }

    #[test]
    fn test_inner_rollback_stops_at_marker() {
        let mut log = ChangeSetLog::new("t");
        log.begin().unwrap();
        log.record(LogEntry::Add(Row::with_id(1, "a")));
        log.begin().unwrap();
        log.begin().unwrap();
        log.record(LogEntry::Add(Row::with_id(2, "b")));
        log.commit().unwrap();
        log.record(LogEntry::Add(Row::with_id(3, "c")));

        let mut target = Recorder::default();
        log.rollback(&mut target).unwrap();
        assert_eq!(target.steps, vec!["unadd 3", "unadd 2"]);
        assert_eq!(log.depth(), 1);
        assert_eq!(log.len(), 1);

        log.commit().unwrap();
        assert!(log.is_empty());
    }

    #[test]
    fn test_fault_blocks_until_rollback() {
        let mut log: ChangeSetLog<&'static str> = ChangeSetLog::new("t");
        log.begin().unwrap();
        log.record_fault(&Error::constraint_violation("t", "positive", 1));
        assert!(log.check_fault().is_err());
        assert!(matches!(log.commit(), Err(Error::TransactionFaulted { .. })));
        assert!(log.begin().is_err());

        log.rollback(&mut Recorder::default()).unwrap();
        assert!(log.fault().is_none());
        log.begin().unwrap();
    }

    #[test]
    fn test_fault_ignored_outside_changeset() {
        let mut log: ChangeSetLog<&'static str> = ChangeSetLog::new("t");
        log.record_fault(&Error::not_found("t", 1));
        assert!(log.fault().is_none());
        assert!(matches!(log.commit(), Err(Error::NoActiveChangeSet { .. })));
    }
}
