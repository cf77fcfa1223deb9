//! Trigger, constraint and hook registration.

use super::Table;
use crate::constraint::{Constraint, ConstraintSnapshot};
use crate::trigger::{
    AfterUpdateFn, BeforeAddFn, BeforeUpdateFn, CascadeFn, RowModifiedFn, RowTriggerFn,
    TriggerId, TriggerList, TriggerSnapshot, ValidateAddFn, ValidateUpdateFn, USER_PRIORITY,
};
use std::sync::Arc;
use tessera_core::{CascadeOperation, Error, Result, Row, RowId, TableData};
use tessera_index::UniqueIndex;

pub(crate) struct Hooks<T> {
    pub(crate) before_add: TriggerList<BeforeAddFn<T>>,
    pub(crate) after_add: TriggerList<RowTriggerFn<T>>,
    pub(crate) before_update: TriggerList<BeforeUpdateFn<T>>,
    pub(crate) after_update: TriggerList<AfterUpdateFn<T>>,
    pub(crate) before_remove: TriggerList<RowTriggerFn<T>>,
    pub(crate) after_remove: TriggerList<RowTriggerFn<T>>,
    pub(crate) constraints: Vec<Constraint<T>>,
    pub(crate) validate_for_add: Option<Arc<ValidateAddFn<T>>>,
    pub(crate) validate_for_update: Option<Arc<ValidateUpdateFn<T>>>,
    pub(crate) cascading_remove: Option<Arc<CascadeFn>>,
    pub(crate) listeners: Vec<(TriggerId, Arc<RowModifiedFn>)>,
    next_id: u64,
}

/// Callbacks one add runs, captured before it starts.
pub(crate) struct AddPlan<T> {
    pub(crate) validate: Option<Arc<ValidateAddFn<T>>>,
    pub(crate) before: TriggerSnapshot<BeforeAddFn<T>>,
    pub(crate) constraints: ConstraintSnapshot<T>,
    pub(crate) after: TriggerSnapshot<RowTriggerFn<T>>,
}

pub(crate) struct UpdatePlan<T> {
    pub(crate) validate: Option<Arc<ValidateUpdateFn<T>>>,
    pub(crate) before: TriggerSnapshot<BeforeUpdateFn<T>>,
    pub(crate) constraints: ConstraintSnapshot<T>,
    pub(crate) after: TriggerSnapshot<AfterUpdateFn<T>>,
}

pub(crate) struct RemovePlan<T> {
    pub(crate) cascade: Option<Arc<CascadeFn>>,
    pub(crate) before: TriggerSnapshot<RowTriggerFn<T>>,
    pub(crate) after: TriggerSnapshot<RowTriggerFn<T>>,
}

impl<T> Hooks<T> {
    pub(crate) fn new() -> Self {
        Self {
            before_add: TriggerList::new(),
            after_add: TriggerList::new(),
            before_update: TriggerList::new(),
            after_update: TriggerList::new(),
            before_remove: TriggerList::new(),
            after_remove: TriggerList::new(),
            constraints: Vec::new(),
            validate_for_add: None,
            validate_for_update: None,
            cascading_remove: None,
            listeners: Vec::new(),
            next_id: 0,
        }
    }

    fn next_id(&mut self) -> TriggerId {
        self.next_id += 1;
        TriggerId(self.next_id)
    }

    pub(crate) fn next_listener_id(&mut self) -> TriggerId {
        self.next_id()
    }

    pub(crate) fn add_plan(&self, triggers: bool, constraints: bool) -> AddPlan<T> {
        AddPlan {
            validate: if triggers {
                self.validate_for_add.clone()
            } else {
                None
            },
            before: self.before_add.snapshot(triggers),
            constraints: if constraints {
                self.constraints.iter().cloned().collect()
            } else {
                ConstraintSnapshot::new()
            },
            after: self.after_add.snapshot(triggers),
        }
    }

    pub(crate) fn update_plan(&self) -> UpdatePlan<T> {
        UpdatePlan {
            validate: self.validate_for_update.clone(),
            before: self.before_update.snapshot(true),
            constraints: self.constraints.iter().cloned().collect(),
            after: self.after_update.snapshot(true),
        }
    }

    pub(crate) fn remove_plan(&self) -> RemovePlan<T> {
        RemovePlan {
            cascade: self.cascading_remove.clone(),
            before: self.before_remove.snapshot(true),
            after: self.after_remove.snapshot(true),
        }
    }

    pub(crate) fn listeners(&self) -> Vec<Arc<RowModifiedFn>> {
        self.listeners.iter().map(|(_, l)| Arc::clone(l)).collect()
    }
}

impl<T: TableData> Table<T> {
    /// Registers a before-add trigger. It may rewrite the row before it is
    /// checked and stored.
    pub fn add_before_add(
        &self,
        priority: i32,
        trigger: impl Fn(&mut Row<T>) -> Result<()> + Send + Sync + 'static,
    ) -> TriggerId {
        let mut hooks = self.hooks.write();
        let id = hooks.next_id();
        hooks.before_add.insert(id, priority, Arc::new(trigger));
        id
    }

    /// Registers an after-add trigger.
    pub fn add_after_add(
        &self,
        priority: i32,
        trigger: impl Fn(&Row<T>) -> Result<()> + Send + Sync + 'static,
    ) -> TriggerId {
        let mut hooks = self.hooks.write();
        let id = hooks.next_id();
        hooks.after_add.insert(id, priority, Arc::new(trigger));
        id
    }

    /// Registers a before-update trigger receiving the stored row and the new
    /// image, which it may rewrite.
    pub fn add_before_update(
        &self,
        priority: i32,
        trigger: impl Fn(&Row<T>, &mut Row<T>) -> Result<()> + Send + Sync + 'static,
    ) -> TriggerId {
        let mut hooks = self.hooks.write();
        let id = hooks.next_id();
        hooks.before_update.insert(id, priority, Arc::new(trigger));
        id
    }

    /// Registers an after-update trigger receiving the previous and stored rows.
    pub fn add_after_update(
        &self,
        priority: i32,
        trigger: impl Fn(&Row<T>, &Row<T>) -> Result<()> + Send + Sync + 'static,
    ) -> TriggerId {
        let mut hooks = self.hooks.write();
        let id = hooks.next_id();
        hooks.after_update.insert(id, priority, Arc::new(trigger));
        id
    }

    /// Registers a before-remove trigger.
    pub fn add_before_remove(
        &self,
        priority: i32,
        trigger: impl Fn(&Row<T>) -> Result<()> + Send + Sync + 'static,
    ) -> TriggerId {
        let mut hooks = self.hooks.write();
        let id = hooks.next_id();
        hooks.before_remove.insert(id, priority, Arc::new(trigger));
        id
    }

    /// Registers an after-remove trigger.
    pub fn add_after_remove(
        &self,
        priority: i32,
        trigger: impl Fn(&Row<T>) -> Result<()> + Send + Sync + 'static,
    ) -> TriggerId {
        let mut hooks = self.hooks.write();
        let id = hooks.next_id();
        hooks.after_remove.insert(id, priority, Arc::new(trigger));
        id
    }

    /// Registers a user-priority before-add trigger.
    pub fn on_before_add(
        &self,
        trigger: impl Fn(&mut Row<T>) -> Result<()> + Send + Sync + 'static,
    ) -> TriggerId {
        self.add_before_add(USER_PRIORITY, trigger)
    }

    /// Registers a user-priority after-add trigger.
    pub fn on_after_add(
        &self,
        trigger: impl Fn(&Row<T>) -> Result<()> + Send + Sync + 'static,
    ) -> TriggerId {
        self.add_after_add(USER_PRIORITY, trigger)
    }

    /// Registers a user-priority before-update trigger.
    pub fn on_before_update(
        &self,
        trigger: impl Fn(&Row<T>, &mut Row<T>) -> Result<()> + Send + Sync + 'static,
    ) -> TriggerId {
        self.add_before_update(USER_PRIORITY, trigger)
    }

    /// Registers a user-priority after-update trigger.
    pub fn on_after_update(
        &self,
        trigger: impl Fn(&Row<T>, &Row<T>) -> Result<()> + Send + Sync + 'static,
    ) -> TriggerId {
        self.add_after_update(USER_PRIORITY, trigger)
    }

    /// Registers a user-priority before-remove trigger.
    pub fn on_before_remove(
        &self,
        trigger: impl Fn(&Row<T>) -> Result<()> + Send + Sync + 'static,
    ) -> TriggerId {
        self.add_before_remove(USER_PRIORITY, trigger)
    }

    /// Registers a user-priority after-remove trigger.
    pub fn on_after_remove(
        &self,
        trigger: impl Fn(&Row<T>) -> Result<()> + Send + Sync + 'static,
    ) -> TriggerId {
        self.add_after_remove(USER_PRIORITY, trigger)
    }

    /// Unregisters a trigger of any kind. Returns false if `id` is unknown.
    pub fn remove_trigger(&self, id: TriggerId) -> bool {
        let mut hooks = self.hooks.write();
        hooks.before_add.remove(id)
            || hooks.after_add.remove(id)
            || hooks.before_update.remove(id)
            || hooks.after_update.remove(id)
            || hooks.before_remove.remove(id)
            || hooks.after_remove.remove(id)
    }

    /// Adds a named check constraint. It applies to later writes only.
    pub fn add_constraint(
        &self,
        name: impl Into<String>,
        predicate: impl Fn(&T) -> bool + Send + Sync + 'static,
    ) {
        self.hooks
            .write()
            .constraints
            .push(Constraint::new(name, predicate));
    }

    /// Returns the names of the registered check constraints.
    pub fn constraint_names(&self) -> Vec<String> {
        self.hooks
            .read()
            .constraints
            .iter()
            .map(|c| c.name().to_string())
            .collect()
    }

    /// Installs the validation run before every add with triggers enabled.
    pub fn set_validate_for_add(&self, hook: impl Fn(&T) -> Result<()> + Send + Sync + 'static) {
        self.hooks.write().validate_for_add = Some(Arc::new(hook));
    }

    /// Installs the validation run before every update, receiving the new and
    /// the stored data.
    pub fn set_validate_for_update(
        &self,
        hook: impl Fn(&T, &T) -> Result<()> + Send + Sync + 'static,
    ) {
        self.hooks.write().validate_for_update = Some(Arc::new(hook));
    }

    /// Installs the handler run before a row is removed, responsible for the
    /// rows referencing it.
    pub fn set_cascading_remove(
        &self,
        hook: impl Fn(RowId, CascadeOperation) -> Result<()> + Send + Sync + 'static,
    ) {
        self.hooks.write().cascading_remove = Some(Arc::new(hook));
    }

    /// Adds a unique index named `name` over the key derived by `key_fn`, and
    /// indexes the current rows. Nothing is registered if two rows share a key.
    pub fn add_unique_index<K>(
        &self,
        name: impl Into<String>,
        key_fn: impl Fn(&T) -> K + Send + Sync + 'static,
    ) -> Result<()>
    where
        K: Eq + std::hash::Hash + Clone + std::fmt::Debug + Send + Sync + 'static,
    {
        let name = name.into();
        let _scope = self.lock().write();
        let mut state = self.state.write();
        if state.indexes.iter().any(|index| index.name() == name) {
            return Err(Error::invalid_operation(format!(
                "index {name} already exists on table {}",
                self.name()
            )));
        }

        let mut index = UniqueIndex::new(self.name(), name, key_fn);
        for row in state.container.rows() {
            tessera_index::RowIndex::add(&mut index, row)?;
        }
        state.indexes.push(Box::new(index));
        Ok(())
    }

    /// Returns the names of the registered indexes.
    pub fn index_names(&self) -> Vec<String> {
        self.state
            .read()
            .indexes
            .iter()
            .map(|index| index.name().to_string())
            .collect()
    }
}
