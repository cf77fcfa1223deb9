//! Foreign-key references between tables.
//!
//! A reference says that a key field of a child row names a row of a parent
//! table, with `NO_ROW` meaning "no parent". The table runtime knows nothing
//! about references: the database installs validation and cascade hooks on
//! each table that consult that table's `Links`, and every reference adds
//! itself to the links of its child and parent tables.
//!
//! Hooks reach the other table through `Weak` pointers, so a table that
//! references itself does not keep itself alive.

use parking_lot::RwLock;
use std::any::TypeId;
use std::sync::{Arc, Weak};
use tessera_core::{CascadeOperation, Error, Result, Row, RowId, TableData, NO_ROW};
use tessera_storage::{Table, UpdateOutcome};

/// Reads a child row's foreign key.
pub type KeyGetter<C> = dyn Fn(&C) -> RowId + Send + Sync;
/// Writes a child row's foreign key.
pub type KeySetter<C> = dyn Fn(&mut C, RowId) + Send + Sync;

/// Checks run when a row of `C` is written.
pub(crate) trait OutgoingLink<C>: Send + Sync {
    fn check_add(&self, data: &C) -> Result<()>;
    fn check_update(&self, next: &C, stored: &C) -> Result<()>;
}

/// Work done when a parent row is about to be removed.
pub(crate) trait IncomingLink: Send + Sync {
    fn parent_removed(&self, id: RowId, cascade: CascadeOperation) -> Result<()>;
}

/// References touching one table: those it holds as a child and those
/// pointing at it.
pub(crate) struct Links<T> {
    outgoing: RwLock<Vec<Arc<dyn OutgoingLink<T>>>>,
    incoming: RwLock<Vec<Arc<dyn IncomingLink>>>,
}

impl<T: TableData> Links<T> {
    pub(crate) fn new() -> Self {
        Self {
            outgoing: RwLock::new(Vec::new()),
            incoming: RwLock::new(Vec::new()),
        }
    }

    /// Installs the composite hooks on `table`.
    pub(crate) fn install(self: &Arc<Self>, table: &Table<T>) {
        let links = Arc::clone(self);
        table.set_validate_for_add(move |data| {
            let outgoing = links.outgoing.read().clone();
            outgoing.iter().try_for_each(|link| link.check_add(data))
        });
        let links = Arc::clone(self);
        table.set_validate_for_update(move |next, stored| {
            let outgoing = links.outgoing.read().clone();
            outgoing.iter().try_for_each(|link| link.check_update(next, stored))
        });
        let links = Arc::clone(self);
        table.set_cascading_remove(move |id, cascade| {
            let incoming = links.incoming.read().clone();
            incoming.iter().try_for_each(|link| link.parent_removed(id, cascade))
        });
    }

    pub(crate) fn add_outgoing(&self, link: Arc<dyn OutgoingLink<T>>) {
        self.outgoing.write().push(link);
    }

    pub(crate) fn add_incoming(&self, link: Arc<dyn IncomingLink>) {
        self.incoming.write().push(link);
    }
}

/// Hook-side view of a reference.
pub(crate) struct Link<C, P> {
    name: String,
    child_name: String,
    parent_name: String,
    child: Weak<Table<C>>,
    parent: Weak<Table<P>>,
    get: Arc<KeyGetter<C>>,
    set: Arc<KeySetter<C>>,
}

impl<C: TableData, P: TableData> Link<C, P> {
    fn require_parent(&self, key: RowId) -> Result<()> {
        if key == NO_ROW {
            return Ok(());
        }
        let Some(parent) = self.parent.upgrade() else {
            return Ok(());
        };
        if parent.contains_key(key) {
            Ok(())
        } else {
            Err(Error::referential_violation(
                self.child_name.as_str(),
                self.name.as_str(),
                format!("row {key} does not exist in table {}", self.parent_name),
            ))
        }
    }
}

impl<C: TableData, P: TableData> OutgoingLink<C> for Link<C, P> {
    fn check_add(&self, data: &C) -> Result<()> {
        self.require_parent((self.get)(data))
    }

    fn check_update(&self, next: &C, stored: &C) -> Result<()> {
        let key = (self.get)(next);
        if key == (self.get)(stored) {
            return Ok(());
        }
        self.require_parent(key)
    }
}

impl<C: TableData, P: TableData> IncomingLink for Link<C, P> {
    fn parent_removed(&self, id: RowId, cascade: CascadeOperation) -> Result<()> {
        let Some(child) = self.child.upgrade() else {
            return Ok(());
        };
        // A row pointing at itself goes away with the removal.
        let same_table = TypeId::of::<C>() == TypeId::of::<P>();
        let dependents: Vec<RowId> = child
            .to_vec()
            .into_iter()
            .filter(|row| (self.get)(&row.data) == id && !(same_table && row.id() == id))
            .map(|row| row.id())
            .collect();
        if dependents.is_empty() {
            return Ok(());
        }

        match cascade {
            CascadeOperation::None => Err(Error::referential_violation(
                self.parent_name.as_str(),
                self.name.as_str(),
                format!(
                    "row {id} is still referenced by {} rows of table {}",
                    dependents.len(),
                    self.child_name
                ),
            )),
            CascadeOperation::SetNull => {
                for dependent in dependents {
                    let Some(mut row) = child.try_get(dependent) else {
                        continue;
                    };
                    if (self.get)(&row.data) != id {
                        continue;
                    }
                    (self.set)(&mut row.data, NO_ROW);
                    child.update(&mut row)?;
                }
                Ok(())
            }
            CascadeOperation::Delete => {
                for dependent in dependents {
                    child.try_remove(dependent, CascadeOperation::Delete)?;
                }
                Ok(())
            }
        }
    }
}

/// Typed handle on a reference from child table `C` to parent table `P`.
pub struct Reference<C, P> {
    name: Arc<str>,
    child: Arc<Table<C>>,
    parent: Arc<Table<P>>,
    get: Arc<KeyGetter<C>>,
    set: Arc<KeySetter<C>>,
}

impl<C, P> Clone for Reference<C, P> {
    fn clone(&self) -> Self {
        Self {
            name: Arc::clone(&self.name),
            child: Arc::clone(&self.child),
            parent: Arc::clone(&self.parent),
            get: Arc::clone(&self.get),
            set: Arc::clone(&self.set),
        }
    }
}

impl<C: TableData, P: TableData> Reference<C, P> {
    pub(crate) fn new(
        name: &str,
        child: Arc<Table<C>>,
        parent: Arc<Table<P>>,
        get: Arc<KeyGetter<C>>,
        set: Arc<KeySetter<C>>,
    ) -> Self {
        Self {
            name: Arc::from(name),
            child,
            parent,
            get,
            set,
        }
    }

    /// Returns the hook-side view, holding the tables weakly.
    pub(crate) fn link(&self) -> Link<C, P> {
        Link {
            name: self.name.to_string(),
            child_name: self.child.name().to_owned(),
            parent_name: self.parent.name().to_owned(),
            child: Arc::downgrade(&self.child),
            parent: Arc::downgrade(&self.parent),
            get: Arc::clone(&self.get),
            set: Arc::clone(&self.set),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn child(&self) -> &Arc<Table<C>> {
        &self.child
    }

    pub fn parent(&self) -> &Arc<Table<P>> {
        &self.parent
    }

    /// Returns the foreign key held by `data`.
    pub fn key_of(&self, data: &C) -> RowId {
        (self.get)(data)
    }

    /// Returns the parent of `row`, or `None` when its key is `NO_ROW`.
    pub fn parent_of(&self, row: &Row<C>) -> Result<Option<Row<P>>> {
        match self.key_of(&row.data) {
            NO_ROW => Ok(None),
            key => self.parent.get(key).map(Some),
        }
    }

    /// Returns the child rows whose key names `parent`.
    pub fn children_of(&self, parent: RowId) -> Result<Vec<Row<C>>> {
        let get = &self.get;
        self.child
            .query(|row| get(&row.data) == parent)
            .collect()
    }

    /// Points `row` at `parent` and writes it back.
    pub fn set_parent(&self, row: &mut Row<C>, parent: RowId) -> Result<UpdateOutcome> {
        (self.set)(&mut row.data, parent);
        self.child.update(row)
    }
}

impl<C, P> std::fmt::Debug for Reference<C, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reference")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
