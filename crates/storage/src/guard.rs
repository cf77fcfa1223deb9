//! Trigger reentrancy detection.
//!
//! Each thread keeps a stack of the row types whose trigger sections are
//! running. Entering a type already on the stack means a trigger chain came
//! back to a table it started from, which is reported as a cycle. Stacks are
//! per thread, so triggers running on different threads never interfere.

use core::any::TypeId;
use core::cell::RefCell;
use core::marker::PhantomData;
use tessera_core::{Error, Result};

thread_local! {
    static ACTIVE: RefCell<Vec<TypeId>> = const { RefCell::new(Vec::new()) };
}

/// Marks the trigger section of one table type as running on this thread.
/// Leaving happens on drop.
#[must_use = "the trigger section ends when the guard is dropped"]
pub struct TriggerGuard {
    kind: TypeId,
    _not_send: PhantomData<*const ()>,
}

impl TriggerGuard {
    /// Enters the trigger section for row type `T`.
    pub fn enter<T: 'static>(table: &str) -> Result<Self> {
        let kind = TypeId::of::<T>();
        ACTIVE.with(|stack| {
            let mut stack = stack.borrow_mut();
            if stack.contains(&kind) {
                return Err(Error::reentrant_trigger(table));
            }
            stack.push(kind);
            Ok(Self {
                kind,
                _not_send: PhantomData,
            })
        })
    }

    /// Returns true if the trigger section for `T` is running on this thread.
    pub fn is_active<T: 'static>() -> bool {
        let kind = TypeId::of::<T>();
        ACTIVE.with(|stack| stack.borrow().contains(&kind))
    }

    /// Returns the number of trigger sections running on this thread.
    pub fn depth() -> usize {
        ACTIVE.with(|stack| stack.borrow().len())
    }
}

impl Drop for TriggerGuard {
    fn drop(&mut self) {
        let top = ACTIVE.with(|stack| stack.borrow_mut().pop());
        if top != Some(self.kind) && !std::thread::panicking() {
            panic!("trigger guard stack corrupted: guards released out of order");
        }
    }
}
