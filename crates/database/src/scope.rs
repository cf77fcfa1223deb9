//! Ambient database for the current thread.
//!
//! `Database::enter` pushes a database on a thread-local stack and returns a
//! `DatabaseScope`; dropping the scope pops it. `Database::current` returns
//! the innermost entered database. Scopes nest and must be dropped in the
//! reverse order they were created, on the thread that created them (the
//! guard is not `Send`). Code that runs outside every scope gets
//! `NoAmbientDatabase` from `Database::current`.

use crate::database::Database;
use std::cell::RefCell;
use std::marker::PhantomData;
use std::sync::Arc;
use tessera_core::{Error, Result};

thread_local! {
    static SCOPES: RefCell<Vec<Arc<Database>>> = const { RefCell::new(Vec::new()) };
}

/// Keeps a database entered on this thread until dropped.
#[must_use = "the database is only ambient while the scope is alive"]
pub struct DatabaseScope {
    depth: usize,
    _not_send: PhantomData<*const ()>,
}

impl DatabaseScope {
    pub(crate) fn enter(database: &Arc<Database>) -> Self {
        let depth = SCOPES.with(|stack| {
            let mut stack = stack.borrow_mut();
            stack.push(Arc::clone(database));
            stack.len()
        });
        Self {
            depth,
            _not_send: PhantomData,
        }
    }

    /// Nesting level of this scope, starting at 1.
    pub fn depth(&self) -> usize {
        self.depth
    }
}

impl Drop for DatabaseScope {
    fn drop(&mut self) {
        let len = SCOPES.with(|stack| {
            let mut stack = stack.borrow_mut();
            let len = stack.len();
            stack.pop();
            len
        });
        if len != self.depth && !std::thread::panicking() {
            panic!("database scopes dropped out of order");
        }
    }
}

pub(crate) fn current() -> Result<Arc<Database>> {
    SCOPES.with(|stack| stack.borrow().last().cloned().ok_or(Error::NoAmbientDatabase))
}

/// Returns true if some database is entered on this thread.
pub fn is_entered() -> bool {
    SCOPES.with(|stack| !stack.borrow().is_empty())
}
