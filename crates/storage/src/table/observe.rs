//! Row-modified listeners and per-row observers.
//!
//! Both are called after the storage lock is released but while the
//! mutation's write scope is still held, so they may read the table.

use super::Table;
use crate::container::RowEvent;
use crate::trigger::TriggerId;
use hashbrown::HashMap;
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use tessera_core::{Row, RowId, TableData, TableOperation};

/// Handle for removing a row-modified listener.
pub type ListenerId = TriggerId;

/// Callback receiving the current image of an observed row.
pub type ObserverFn<T> = dyn Fn(&Row<T>) + Send + Sync;

pub(crate) struct ObserverRegistry<T> {
    by_row: Mutex<HashMap<RowId, Vec<(u64, Arc<ObserverFn<T>>)>>>,
    next_id: Mutex<u64>,
}

impl<T> ObserverRegistry<T> {
    pub(crate) fn new() -> Self {
        Self {
            by_row: Mutex::new(HashMap::new()),
            next_id: Mutex::new(0),
        }
    }

    fn register(&self, row: RowId, callback: Arc<ObserverFn<T>>) -> u64 {
        let id = {
            let mut next = self.next_id.lock();
            *next += 1;
            *next
        };
        self.by_row.lock().entry(row).or_default().push((id, callback));
        id
    }

    fn unregister(&self, row: RowId, id: u64) {
        let mut by_row = self.by_row.lock();
        if let Some(callbacks) = by_row.get_mut(&row) {
            callbacks.retain(|(existing, _)| *existing != id);
            if callbacks.is_empty() {
                by_row.remove(&row);
            }
        }
    }

    fn callbacks_for(&self, row: RowId) -> Vec<Arc<ObserverFn<T>>> {
        self.by_row
            .lock()
            .get(&row)
            .map(|callbacks| callbacks.iter().map(|(_, cb)| Arc::clone(cb)).collect())
            .unwrap_or_default()
    }

    fn is_empty(&self) -> bool {
        self.by_row.lock().is_empty()
    }

    fn count(&self) -> usize {
        self.by_row.lock().values().map(Vec::len).sum()
    }
}

/// Registration of a row observer. Dropping it unregisters the observer.
#[must_use = "the observer is removed when the handle is dropped"]
pub struct ObserverHandle<T> {
    registry: Weak<ObserverRegistry<T>>,
    row: RowId,
    id: u64,
}

impl<T> ObserverHandle<T> {
    /// Returns the observed row id.
    pub fn row_id(&self) -> RowId {
        self.row
    }
}

impl<T> Drop for ObserverHandle<T> {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.unregister(self.row, self.id);
        }
    }
}

impl<T: TableData> Table<T> {
    /// Registers a listener receiving `(slot, operation)` for every physical
    /// change. Slots are only valid until the next structural change, so a
    /// listener needing the row must fetch it by slot right away.
    pub fn on_row_modified(
        &self,
        listener: impl Fn(usize, TableOperation) + Send + Sync + 'static,
    ) -> ListenerId {
        self.state.write().container.track_events();
        let mut hooks = self.hooks.write();
        let id = hooks.next_listener_id();
        hooks.listeners.push((id, Arc::new(listener)));
        id
    }

    /// Removes a row-modified listener.
    pub fn remove_row_modified(&self, id: ListenerId) -> bool {
        let mut hooks = self.hooks.write();
        let before = hooks.listeners.len();
        hooks.listeners.retain(|(existing, _)| *existing != id);
        hooks.listeners.len() != before
    }

    /// Observes `row`: `callback` receives the row's new image whenever it is
    /// updated in place or moved to another slot.
    pub fn add_observer(
        &self,
        row: &Row<T>,
        callback: impl Fn(&Row<T>) + Send + Sync + 'static,
    ) -> ObserverHandle<T> {
        self.state.write().container.track_events();
        let id = self.observers.register(row.id(), Arc::new(callback));
        ObserverHandle {
            registry: Arc::downgrade(&self.observers),
            row: row.id(),
            id,
        }
    }

    /// Returns the number of registered observers.
    pub fn observer_count(&self) -> usize {
        self.observers.count()
    }

    /// Delivers buffered events to listeners and observers.
    pub(crate) fn dispatch(&self, events: Vec<RowEvent>) {
        if events.is_empty() {
            return;
        }
        let listeners = self.hooks.read().listeners();
        let observe = !self.observers.is_empty();

        for (slot, op) in events {
            for listener in &listeners {
                listener(slot, op);
            }
            if observe && op == TableOperation::Update {
                let row = self.state.read().container.get_by_index(slot).cloned();
                if let Some(row) = row {
                    for callback in self.observers.callbacks_for(row.id()) {
                        callback(&row);
                    }
                }
            }
        }
    }
}
