//! The table runtime.
//!
//! `Table<T>` ties together the row container, unique indexes, the changeset
//! journal, the key generator, check constraints, trigger lists and observers.
//! Every public call takes a scope on the table's reentrant `TableLock`: reads
//! a shared scope, mutations an exclusive one. Storage itself sits behind an
//! inner `RwLock` that is only held for short stretches and never while user
//! callbacks run, so triggers, hooks and listeners may call back into the
//! table.

mod change_set;
mod hooks;
mod observe;
mod read;
mod write;

pub use observe::{ListenerId, ObserverFn, ObserverHandle};
pub use write::{LoadReport, RejectedRow, UpdateOutcome};

use crate::container::{IdDensity, RowContainer};
use crate::journal::{ChangeSetLog, UndoTarget};
use crate::keygen::KeyGenerator;
use crate::lock::TableLock;
use hashbrown::HashSet;
use hooks::Hooks;
use observe::ObserverRegistry;
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use tessera_core::{Error, Result, Row, RowId, TableData};
use tessera_index::RowIndex;

/// Construction options for a table.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TableOptions {
    /// Rows to reserve room for up front.
    pub initial_capacity: usize,
    /// Layout of the id-to-slot map.
    pub id_density: IdDensity,
}

/// Builder for `Table`.
#[derive(Clone, Debug)]
pub struct TableBuilder {
    name: String,
    options: TableOptions,
}

impl TableBuilder {
    /// Starts building a table named `name` with default options.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            options: TableOptions::default(),
        }
    }

    /// Reserves room for `capacity` rows.
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.options.initial_capacity = capacity;
        self
    }

    /// Selects the id-to-slot layout.
    pub fn id_density(mut self, density: IdDensity) -> Self {
        self.options.id_density = density;
        self
    }

    /// Shorthand for `id_density(IdDensity::Sparse)`.
    pub fn sparse_ids(self) -> Self {
        self.id_density(IdDensity::Sparse)
    }

    pub fn options(&self) -> &TableOptions {
        &self.options
    }

    pub fn build<T: TableData>(self) -> Table<T> {
        Table::with_options(self.name, self.options)
    }
}

/// Storage guarded by the inner lock.
pub(crate) struct TableState<T> {
    pub(crate) container: RowContainer<T>,
    pub(crate) indexes: Vec<Box<dyn RowIndex<T>>>,
    pub(crate) log: ChangeSetLog<T>,
    /// Ids whose removal is in progress further up the call chain.
    pub(crate) removing: HashSet<RowId>,
}

impl<T: TableData> TableState<T> {
    /// Adds `row` to every index, or to none.
    pub(crate) fn index_add(&mut self, row: &Row<T>) -> Result<()> {
        for at in 0..self.indexes.len() {
            if let Err(e) = self.indexes[at].add(row) {
                for index in &mut self.indexes[..at] {
                    index.remove(row);
                }
                return Err(e);
            }
        }
        Ok(())
    }

    /// Moves `old` to `new` in every index, or in none.
    pub(crate) fn index_update(&mut self, old: &Row<T>, new: &Row<T>) -> Result<()> {
        for at in 0..self.indexes.len() {
            if let Err(e) = self.indexes[at].update(old, new) {
                for index in &mut self.indexes[..at] {
                    index.update(new, old)?;
                }
                return Err(e);
            }
        }
        Ok(())
    }

    pub(crate) fn index_remove(&mut self, row: &Row<T>) {
        for index in &mut self.indexes {
            index.remove(row);
        }
    }

    /// Undoes the innermost changeset against this state.
    pub(crate) fn rollback(&mut self, keys: &KeyGenerator) -> Result<usize> {
        let TableState {
            container,
            indexes,
            log,
            ..
        } = self;
        log.rollback(&mut Undo {
            container,
            indexes,
            keys,
        })
    }
}

struct Undo<'a, T> {
    container: &'a mut RowContainer<T>,
    indexes: &'a mut Vec<Box<dyn RowIndex<T>>>,
    keys: &'a KeyGenerator,
}

impl<T: TableData> UndoTarget<T> for Undo<'_, T> {
    fn undo_add(&mut self, row: &Row<T>) -> Result<()> {
        let stored = self.container.remove(row.id())?;
        for index in self.indexes.iter_mut() {
            index.remove(&stored);
        }
        Ok(())
    }

    fn undo_update(&mut self, mut prior: Row<T>) -> Result<()> {
        let current = self
            .container
            .get_by_id(prior.id())
            .cloned()
            .ok_or_else(|| Error::internal(format!("row {} vanished before undo", prior.id())))?;
        for index in self.indexes.iter_mut() {
            index.update(&current, &prior)?;
        }
        self.container.set(&mut prior)
    }

    fn undo_remove(&mut self, mut prior: Row<T>) -> Result<()> {
        for index in self.indexes.iter_mut() {
            index.add(&prior)?;
        }
        self.container.add(&mut prior);
        Ok(())
    }

    fn restore_key(&mut self, value: RowId) {
        self.keys.reset(value);
    }
}

/// A typed in-memory table.
///
/// Triggers and cascade hooks that write to another table acquire that table's
/// lock while this one is held. Two threads mutating the same pair of tables in
/// opposite orders can deadlock; keep cross-table writes in a consistent order.
pub struct Table<T> {
    name: String,
    options: TableOptions,
    lock: TableLock,
    pub(crate) state: RwLock<TableState<T>>,
    keys: KeyGenerator,
    hooks: RwLock<Hooks<T>>,
    observers: Arc<ObserverRegistry<T>>,
}

impl Table<()> {
    /// Starts building a table named `name`; the row type is chosen by
    /// [`TableBuilder::build`].
    pub fn builder(name: impl Into<String>) -> TableBuilder {
        TableBuilder::new(name)
    }
}

impl<T: TableData> Table<T> {
    /// Creates an empty table with default options.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_options(name, TableOptions::default())
    }

    /// Creates an empty table.
    pub fn with_options(name: impl Into<String>, options: TableOptions) -> Self {
        let name = name.into();
        let state = TableState {
            container: RowContainer::new(options.id_density, options.initial_capacity),
            indexes: Vec::new(),
            log: ChangeSetLog::new(name.as_str()),
            removing: HashSet::new(),
        };
        Self {
            name,
            options,
            lock: TableLock::new(),
            state: RwLock::new(state),
            keys: KeyGenerator::new(),
            hooks: RwLock::new(Hooks::new()),
            observers: Arc::new(ObserverRegistry::new()),
        }
    }

    /// Returns the table name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the options the table was created with.
    pub fn options(&self) -> &TableOptions {
        &self.options
    }

    /// Returns the last id issued by the key generator.
    pub fn last_id(&self) -> RowId {
        self.keys.current()
    }

    pub(crate) fn lock(&self) -> &TableLock {
        &self.lock
    }

    /// Records `error` as the changeset fault, unless it is the fault itself
    /// being reported again.
    fn note_failure<R>(&self, result: &Result<R>) {
        if let Err(error) = result {
            if !matches!(error, Error::TransactionFaulted { .. }) {
                self.state.write().log.record_fault(error);
            }
        }
    }

    fn check_fault(&self) -> Result<()> {
        self.state.read().log.check_fault()
    }
}

impl<T: TableData> fmt::Debug for Table<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        f.debug_struct("Table")
            .field("name", &self.name)
            .field("len", &state.container.len())
            .field("version", &state.container.version())
            .field("change_set_depth", &state.log.depth())
            .finish()
    }
}
