//! Changesets spanning several tables.
//!
//! A `ChangeSet` opens a changeset on each participating table and closes
//! them together. Commit walks the tables in order; if one refuses, that
//! table and every table not yet committed are rolled back and the error is
//! returned. Tables committed before the failure keep their changes, so a
//! multi-table commit is not atomic. Dropping an unfinished `ChangeSet` rolls
//! back every table.

use tessera_core::{Error, Result};
use tracing::{error, warn};

/// A table that can take part in a `ChangeSet`.
pub trait ChangeSetParticipant: Send + Sync {
    fn table_name(&self) -> &str;
    fn begin_change_set(&self) -> Result<()>;
    fn commit_change_set(&self) -> Result<()>;
    fn rollback_change_set(&self) -> Result<()>;
    /// Message of the failure recorded in the open changeset, if any.
    fn fault(&self) -> Option<String>;
}

/// Guard over an open changeset on one or more tables.
#[must_use = "an unfinished change set rolls back when dropped"]
pub struct ChangeSet<'a> {
    tables: Vec<&'a dyn ChangeSetParticipant>,
    completed: bool,
}

impl<'a> ChangeSet<'a> {
    /// Opens a changeset on every table, in order. If any table refuses, the
    /// ones already opened are rolled back and the error returned.
    pub fn begin(tables: &[&'a dyn ChangeSetParticipant]) -> Result<Self> {
        for (at, table) in tables.iter().enumerate() {
            if let Err(e) = table.begin_change_set() {
                for opened in tables[..at].iter().rev() {
                    if let Err(undo) = opened.rollback_change_set() {
                        error!(
                            target: "tessera::changeset",
                            table = opened.table_name(),
                            error = %undo,
                            "rollback after failed begin"
                        );
                    }
                }
                return Err(e);
            }
        }
        Ok(Self {
            tables: tables.to_vec(),
            completed: false,
        })
    }

    /// Names of the participating tables.
    pub fn table_names(&self) -> Vec<&str> {
        self.tables.iter().map(|t| t.table_name()).collect()
    }

    /// Returns true if any participating table recorded a failure.
    pub fn has_fault(&self) -> bool {
        self.tables.iter().any(|t| t.fault().is_some())
    }

    /// First recorded failure, with the table it happened in.
    pub fn fault(&self) -> Option<Error> {
        self.tables.iter().find_map(|t| {
            t.fault()
                .map(|cause| Error::transaction_faulted(t.table_name(), cause))
        })
    }

    /// Commits every table in order.
    pub fn commit(mut self) -> Result<()> {
        self.completed = true;
        let tables = std::mem::take(&mut self.tables);
        for (at, table) in tables.iter().enumerate() {
            if let Err(e) = table.commit_change_set() {
                warn!(
                    target: "tessera::changeset",
                    table = table.table_name(),
                    error = %e,
                    "commit refused, rolling back remaining tables"
                );
                rollback_all(&tables[at..]);
                return Err(e);
            }
        }
        Ok(())
    }

    /// Rolls back every table. All tables are attempted; the first error is
    /// returned.
    pub fn rollback(mut self) -> Result<()> {
        self.completed = true;
        let tables = std::mem::take(&mut self.tables);
        let mut first = None;
        for table in tables.iter().rev() {
            if let Err(e) = table.rollback_change_set() {
                first.get_or_insert(e);
            }
        }
        first.map_or(Ok(()), Err)
    }
}

fn rollback_all(tables: &[&dyn ChangeSetParticipant]) {
    for table in tables.iter().rev() {
        if let Err(e) = table.rollback_change_set() {
            error!(
                target: "tessera::changeset",
                table = table.table_name(),
                error = %e,
                "rollback failed"
            );
        }
    }
}

impl Drop for ChangeSet<'_> {
    fn drop(&mut self) {
        if self.completed {
            return;
        }
        match self.fault() {
            Some(fault) => error!(
                target: "tessera::changeset",
                error = %fault,
                "change set dropped after a failure, rolling back"
            ),
            None => warn!(
                target: "tessera::changeset",
                "change set dropped without commit, rolling back"
            ),
        }
        rollback_all(&self.tables);
    }
}

impl std::fmt::Debug for ChangeSet<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeSet")
            .field("tables", &self.table_names())
            .field("completed", &self.completed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Table;
    use tessera_core::CascadeOperation;

    #[test]
    fn test_guard_rolls_back_on_drop() {
        let table: Table<i32> = Table::new("numbers");
        table.add(1).unwrap();
        {
            let _cs = table.change_set().unwrap();
            table.add(2).unwrap();
            table.remove(1, CascadeOperation::None).unwrap();
        }
        assert_eq!(table.ids(), vec![1]);
        assert_eq!(table.change_set_depth(), 0);
    }

    #[test]
    fn test_commit_keeps_all_tables() {
        let a: Table<i32> = Table::new("a");
        let b: Table<String> = Table::new("b");
        let cs = ChangeSet::begin(&[&a, &b]).unwrap();
        a.add(1).unwrap();
        b.add("one".to_owned()).unwrap();
        assert_eq!(cs.table_names(), vec!["a", "b"]);
        cs.commit().unwrap();
        assert_eq!(a.len(), 1);
        assert_eq!(b.len(), 1);
        assert_eq!(a.change_set_depth(), 0);
    }

    #[test]
    fn test_rollback_restores_all_tables() {
        let a: Table<i32> = Table::new("a");
        let b: Table<i32> = Table::new("b");
        b.add(7).unwrap();
        let cs = ChangeSet::begin(&[&a, &b]).unwrap();
        a.add(1).unwrap();
        b.clear(CascadeOperation::None).unwrap();
        cs.rollback().unwrap();
        assert!(a.is_empty());
        assert_eq!(b.len(), 1);
    }

    #[test]
    fn test_fault_blocks_commit_and_rolls_back() {
        let a: Table<i32> = Table::new("a");
        let b: Table<i32> = Table::new("b");
        let cs = ChangeSet::begin(&[&a, &b]).unwrap();
        a.add(1).unwrap();
        b.add(1).unwrap();
        assert!(b.get(42).is_err());
        assert!(!cs.has_fault());
        assert!(b.update(&mut tessera_core::Row::with_id(42, 0)).is_err());
        assert!(cs.has_fault());
        assert!(matches!(cs.fault(), Some(Error::TransactionFaulted { .. })));

        let err = cs.commit().unwrap_err();
        assert!(matches!(err, Error::TransactionFaulted { .. }));
        // "a" committed before "b" refused.
        assert_eq!(a.len(), 1);
        assert!(b.is_empty());
        assert!(!b.has_fault());
    }
}
