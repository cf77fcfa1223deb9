//! Mutations: add, update, remove and the bulk operations built from them.

use super::hooks::AddPlan;
use super::Table;
use crate::constraint::check_all;
use crate::guard::TriggerGuard;
use crate::journal::LogEntry;
use std::cmp::Ordering;
use tessera_core::{CascadeOperation, Error, Result, Row, RowId, TableData, NO_ROW};
use tracing::{debug, warn};

/// Result of a successful `update`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The row was written and its version incremented.
    Updated,
    /// The supplied row equals the stored one; nothing was written.
    NoChange,
}

enum UpdateAttempt {
    Done(UpdateOutcome),
    Missing,
    Stale { stored: i32 },
}

/// A row `load` skipped.
#[derive(Clone, Debug, PartialEq)]
pub struct RejectedRow {
    /// Position of the row in the loaded sequence.
    pub position: usize,
    /// Id the row carried (or was assigned).
    pub id: RowId,
    pub error: Error,
}

/// Outcome of a bulk `load`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LoadReport {
    /// Rows stored.
    pub loaded: usize,
    /// Rows skipped, in input order.
    pub rejected: Vec<RejectedRow>,
}

impl LoadReport {
    /// Returns true if every row was stored.
    pub fn is_complete(&self) -> bool {
        self.rejected.is_empty()
    }
}

impl<T: TableData> Table<T> {
    /// Adds a new row holding `data` and returns it with its assigned id.
    pub fn add(&self, data: T) -> Result<Row<T>> {
        let mut row = Row::new(data);
        self.add_row(&mut row)?;
        Ok(row)
    }

    /// Adds `row`, assigning an id if it has none. A caller-chosen id above
    /// the generator's high-water mark advances the generator to it.
    ///
    /// Fails with `DuplicateKey` if the id is taken.
    pub fn add_row(&self, row: &mut Row<T>) -> Result<()> {
        if self.try_add_with(row, true, true)? {
            Ok(())
        } else {
            Err(Error::duplicate_id(self.name(), row.id()))
        }
    }

    /// Adds `row` with triggers and constraints enabled. Returns `Ok(false)`
    /// if the id is taken.
    pub fn try_add(&self, row: &mut Row<T>) -> Result<bool> {
        self.try_add_with(row, true, true)
    }

    /// Adds `row`. Returns `Ok(false)` if the id is taken.
    ///
    /// With `enable_triggers` false the add validation hook and user triggers
    /// are skipped; system triggers still run. With `enable_constraints` false
    /// check constraints are skipped. Unique indexes are always enforced.
    pub fn try_add_with(
        &self,
        row: &mut Row<T>,
        enable_triggers: bool,
        enable_constraints: bool,
    ) -> Result<bool> {
        let _scope = self.lock().write();
        let result = self.add_locked(row, enable_triggers, enable_constraints);
        self.note_failure(&result);
        result
    }

    fn add_locked(
        &self,
        row: &mut Row<T>,
        enable_triggers: bool,
        enable_constraints: bool,
    ) -> Result<bool> {
        let plan = self.hooks.read().add_plan(enable_triggers, enable_constraints);
        if let Some(validate) = &plan.validate {
            validate(&row.data)?;
        }
        self.check_fault()?;

        let prior_key = self.keys.current();
        if row.is_unassigned() {
            let id = self.keys.next_id().ok_or_else(|| {
                Error::invalid_operation(format!("table {} ran out of row ids", self.name()))
            })?;
            row.set_id(id);
        } else if row.id() < 0 {
            return Err(Error::invalid_row_id(self.name(), row.id()));
        } else if self.state.read().container.contains_id(row.id()) {
            return Ok(false);
        } else {
            self.keys.ensure_at_least(row.id());
        }
        let assigned = row.id();
        let moved = self.keys.current() != prior_key;
        if moved {
            self.state.write().log.record(LogEntry::KeyGeneratorReset(prior_key));
        }

        let placed = TriggerGuard::enter::<T>(self.name())
            .and_then(|guard| self.place(row, &plan).map(|stored| stored.then_some(guard)));
        let _guard = match placed {
            Ok(Some(guard)) => guard,
            other => {
                // Nothing was stored: hand the id back.
                if moved && self.keys.current() == assigned {
                    self.keys.reset(prior_key);
                }
                return other.map(|_| false);
            }
        };

        for trigger in &plan.after {
            trigger(row)?;
        }
        Ok(true)
    }

    /// Runs before-add triggers and constraints, then stores `row`. Returns
    /// false if its id turned out to be taken.
    fn place(&self, row: &mut Row<T>, plan: &AddPlan<T>) -> Result<bool> {
        for trigger in &plan.before {
            trigger(row)?;
        }
        check_all(&plan.constraints, self.name(), row)?;

        let events = {
            let mut state = self.state.write();
            if state.container.contains_id(row.id()) {
                return Ok(false);
            }
            state.index_add(row)?;
            state.container.add(row);
            state.log.record(LogEntry::Add(row.clone()));
            state.container.take_events()
        };
        self.dispatch(events);
        Ok(true)
    }

    /// Writes `row` over the stored row with the same id.
    ///
    /// The supplied version must not be older than the stored one. On success
    /// `row` is refreshed with the stored image, including the incremented
    /// version and any rewrites made by before-update triggers.
    pub fn update(&self, row: &mut Row<T>) -> Result<UpdateOutcome> {
        let _scope = self.lock().write();
        let result = match self.update_locked(row) {
            Ok(UpdateAttempt::Done(outcome)) => Ok(outcome),
            Ok(UpdateAttempt::Missing) => Err(Error::not_found(self.name(), row.id())),
            Ok(UpdateAttempt::Stale { stored }) => Err(Error::stale_version(
                self.name(),
                row.id(),
                row.version(),
                stored,
            )),
            Err(e) => Err(e),
        };
        self.note_failure(&result);
        result
    }

    /// Like `update`, but reports a missing row or stale version as `Ok(false)`.
    pub fn try_update(&self, row: &mut Row<T>) -> Result<bool> {
        let _scope = self.lock().write();
        let result = self
            .update_locked(row)
            .map(|attempt| matches!(attempt, UpdateAttempt::Done(_)));
        self.note_failure(&result);
        result
    }

    fn update_locked(&self, row: &mut Row<T>) -> Result<UpdateAttempt> {
        let Some(stored) = self.state.read().container.get_by_id(row.id()).cloned() else {
            return Ok(UpdateAttempt::Missing);
        };

        let plan = self.hooks.read().update_plan();
        if let Some(validate) = &plan.validate {
            validate(&row.data, &stored.data)?;
        }
        self.check_fault()?;

        if stored.same_value(row) {
            row.set_slot(stored.slot());
            return Ok(UpdateAttempt::Done(UpdateOutcome::NoChange));
        }
        if stored.version() > row.version() {
            return Ok(UpdateAttempt::Stale {
                stored: stored.version(),
            });
        }

        let mut candidate = row.clone();
        candidate.set_version(row.version().wrapping_add(1));

        let _guard = TriggerGuard::enter::<T>(self.name())?;
        for trigger in &plan.before {
            trigger(&stored, &mut candidate)?;
        }
        check_all(&plan.constraints, self.name(), &candidate)?;

        let events = {
            let mut state = self.state.write();
            state.index_update(&stored, &candidate)?;
            state.container.set(&mut candidate)?;
            if state.log.is_active() {
                state.log.record(LogEntry::Update(stored.clone()));
            }
            state.container.take_events()
        };
        self.dispatch(events);

        *row = candidate;
        for trigger in &plan.after {
            trigger(&stored, row)?;
        }
        Ok(UpdateAttempt::Done(UpdateOutcome::Updated))
    }

    /// Removes the row with `id`, applying `cascade` to rows referencing it.
    ///
    /// Fails with `NotFound` if there is no such row; id 0 never exists.
    pub fn remove(&self, id: RowId, cascade: CascadeOperation) -> Result<()> {
        if self.try_remove(id, cascade)? {
            Ok(())
        } else {
            Err(Error::not_found(self.name(), id))
        }
    }

    /// Removes the stored row with `row.id()`.
    pub fn remove_row(&self, row: &Row<T>, cascade: CascadeOperation) -> Result<()> {
        self.remove(row.id(), cascade)
    }

    /// Like `remove`, but reports a missing row as `Ok(false)`. A row whose
    /// removal is already in progress on this call chain also reports false.
    pub fn try_remove(&self, id: RowId, cascade: CascadeOperation) -> Result<bool> {
        let _scope = self.lock().write();
        let result = self.remove_locked(id, cascade);
        self.note_failure(&result);
        result
    }

    fn remove_locked(&self, id: RowId, cascade: CascadeOperation) -> Result<bool> {
        if id == NO_ROW {
            return Ok(false);
        }
        {
            let mut state = self.state.write();
            if !state.container.contains_id(id) || !state.removing.insert(id) {
                return Ok(false);
            }
        }
        let result = self.remove_claimed(id, cascade);
        self.state.write().removing.remove(&id);
        result
    }

    fn remove_claimed(&self, id: RowId, cascade: CascadeOperation) -> Result<bool> {
        let plan = self.hooks.read().remove_plan();
        if let Some(cascade_remove) = &plan.cascade {
            cascade_remove(id, cascade)?;
        }
        self.check_fault()?;

        let Some(row) = self.state.read().container.get_by_id(id).cloned() else {
            return Ok(false);
        };

        let _guard = TriggerGuard::enter::<T>(self.name())?;
        for trigger in &plan.before {
            trigger(&row)?;
        }

        let events = {
            let mut state = self.state.write();
            state.index_remove(&row);
            let removed = state.container.remove(id)?;
            state.log.record(LogEntry::Remove(removed));
            if state.container.is_empty() {
                let prior = self.keys.current();
                if prior != NO_ROW {
                    state.log.record(LogEntry::KeyGeneratorReset(prior));
                    self.keys.reset(NO_ROW);
                }
            }
            state.container.take_events()
        };
        self.dispatch(events);

        for trigger in &plan.after {
            trigger(&row)?;
        }
        Ok(true)
    }

    /// Removes every row matching `predicate`. Returns the number removed.
    pub fn remove_where(
        &self,
        predicate: impl Fn(&Row<T>) -> bool,
        cascade: CascadeOperation,
    ) -> Result<usize> {
        let _scope = self.lock().write();
        let ids = self.ids_matching(&predicate);
        let mut removed = 0;
        for id in ids {
            if self.try_remove(id, cascade)? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Applies `change` to the data of every row matching `predicate` and
    /// writes it back. Returns the number of rows written.
    pub fn update_where(
        &self,
        mut change: impl FnMut(&mut T),
        predicate: impl Fn(&Row<T>) -> bool,
    ) -> Result<usize> {
        let _scope = self.lock().write();
        let ids = self.ids_matching(&predicate);
        let mut updated = 0;
        for id in ids {
            let Some(mut row) = self.try_get(id) else {
                continue;
            };
            change(&mut row.data);
            if self.update(&mut row)? == UpdateOutcome::Updated {
                updated += 1;
            }
        }
        Ok(updated)
    }

    /// Removes every row, last slot first.
    pub fn clear(&self, cascade: CascadeOperation) -> Result<()> {
        let _scope = self.lock().write();
        let ids = self.ids_matching(&|_: &Row<T>| true);
        debug!(target: "tessera::table", table = %self.name(), rows = ids.len(), "clearing table");
        for id in ids.into_iter().rev() {
            self.try_remove(id, cascade)?;
        }
        Ok(())
    }

    /// Reorders rows by `compare` on their data. Ids, versions and indexes are
    /// untouched and nothing is logged.
    pub fn sort_by(&self, mut compare: impl FnMut(&T, &T) -> Ordering) {
        let _scope = self.lock().write();
        let events = {
            let mut state = self.state.write();
            let mut rows = state.container.rows().to_vec();
            rows.sort_by(|a, b| compare(&a.data, &b.data));
            state.container.clear(rows.len());
            for mut row in rows {
                state.container.add(&mut row);
            }
            state.container.take_events()
        };
        self.dispatch(events);
    }

    /// Reorders rows by their data's natural order.
    pub fn sort(&self)
    where
        T: Ord,
    {
        self.sort_by(T::cmp);
    }

    /// Replaces the table contents with `rows`, as when restoring from
    /// persistence.
    ///
    /// User triggers and the add validation hook are skipped, constraints and
    /// unique indexes apply. A row that fails is skipped, logged as a warning
    /// and listed in the report instead of aborting the load. Afterwards the
    /// key generator continues from the highest loaded id.
    ///
    /// Fails without touching the table while a changeset is open.
    pub fn load(&self, rows: impl IntoIterator<Item = Row<T>>) -> Result<LoadReport> {
        let _scope = self.lock().write();
        {
            let mut state = self.state.write();
            if state.log.is_active() {
                return Err(Error::invalid_operation(format!(
                    "cannot load table {} inside an open changeset",
                    self.name()
                )));
            }
            let capacity = self.options().initial_capacity;
            state.container.clear(capacity);
            for index in state.indexes.iter_mut() {
                index.clear();
            }
        }
        self.keys.reset(NO_ROW);

        let mut report = LoadReport::default();
        for (position, mut row) in rows.into_iter().enumerate() {
            row.set_slot(None);
            match self.add_locked(&mut row, false, true) {
                Ok(true) => report.loaded += 1,
                Ok(false) => {
                    warn!(
                        target: "tessera::load",
                        table = %self.name(),
                        id = row.id(),
                        position,
                        "skipping row with duplicate id"
                    );
                    report.rejected.push(RejectedRow {
                        position,
                        id: row.id(),
                        error: Error::duplicate_id(self.name(), row.id()),
                    });
                }
                Err(error) => {
                    warn!(
                        target: "tessera::load",
                        table = %self.name(),
                        id = row.id(),
                        position,
                        error = %error,
                        "skipping row"
                    );
                    report.rejected.push(RejectedRow {
                        position,
                        id: row.id(),
                        error,
                    });
                }
            }
        }

        let max_id = self.state.read().container.max_id();
        self.keys.reset(max_id);
        debug!(
            target: "tessera::load",
            table = %self.name(),
            loaded = report.loaded,
            rejected = report.rejected.len(),
            "table loaded"
        );
        Ok(report)
    }

    fn ids_matching(&self, predicate: &dyn Fn(&Row<T>) -> bool) -> Vec<RowId> {
        self.state
            .read()
            .container
            .rows()
            .iter()
            .filter(|row| predicate(row))
            .map(Row::id)
            .collect()
    }
}
