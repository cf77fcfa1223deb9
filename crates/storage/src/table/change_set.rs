//! Changeset control for a single table.

use super::Table;
use crate::change_set::{ChangeSet, ChangeSetParticipant};
use tessera_core::{Result, TableData};
use tracing::debug;

impl<T: TableData> Table<T> {
    /// Opens a changeset. Changesets nest; each needs its own commit or
    /// rollback.
    ///
    /// Fails with `TransactionFaulted` while a failed mutation awaits rollback.
    pub fn begin_change_set(&self) -> Result<()> {
        let _scope = self.lock().write();
        let mut state = self.state.write();
        state.log.begin()?;
        debug!(
            target: "tessera::changeset",
            table = %self.name(),
            depth = state.log.depth(),
            "begin"
        );
        Ok(())
    }

    /// Closes the innermost changeset and keeps its effects. Closing the
    /// outermost one discards the undo log.
    pub fn commit_change_set(&self) -> Result<()> {
        let _scope = self.lock().write();
        let mut state = self.state.write();
        let depth = state.log.depth();
        state.log.commit()?;
        debug!(target: "tessera::changeset", table = %self.name(), depth, "commit");
        Ok(())
    }

    /// Closes the innermost changeset and undoes everything it recorded,
    /// including key generator moves. Observers see the undo as ordinary row
    /// events.
    pub fn rollback_change_set(&self) -> Result<()> {
        let _scope = self.lock().write();
        let (result, events) = {
            let mut state = self.state.write();
            let depth = state.log.depth();
            let result = state.rollback(&self.keys);
            if let Ok(undone) = &result {
                debug!(
                    target: "tessera::changeset",
                    table = %self.name(),
                    depth,
                    undone,
                    "rollback"
                );
            }
            (result, state.container.take_events())
        };
        self.dispatch(events);
        result.map(|_| ())
    }

    /// Number of open changesets.
    pub fn change_set_depth(&self) -> usize {
        let _scope = self.lock().read();
        self.state.read_recursive().log.depth()
    }

    /// Message of the failure recorded in the open changeset, if any.
    pub fn fault(&self) -> Option<String> {
        let _scope = self.lock().read();
        self.state.read_recursive().log.fault().map(str::to_owned)
    }

    pub fn has_fault(&self) -> bool {
        self.fault().is_some()
    }

    /// Opens a changeset on this table and returns a guard that rolls it
    /// back unless committed.
    pub fn change_set(&self) -> Result<ChangeSet<'_>> {
        ChangeSet::begin(&[self as &dyn ChangeSetParticipant])
    }
}

impl<T: TableData> ChangeSetParticipant for Table<T> {
    fn table_name(&self) -> &str {
        self.name()
    }

    fn begin_change_set(&self) -> Result<()> {
        Table::begin_change_set(self)
    }

    fn commit_change_set(&self) -> Result<()> {
        Table::commit_change_set(self)
    }

    fn rollback_change_set(&self) -> Result<()> {
        Table::rollback_change_set(self)
    }

    fn fault(&self) -> Option<String> {
        Table::fault(self)
    }
}
