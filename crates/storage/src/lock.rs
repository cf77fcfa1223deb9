//! Reentrant reader/writer lock guarding one table.
//!
//! Triggers run inside the write scope of the mutation that fired them and may
//! call back into the same table, so the thread holding the write scope can
//! take further read or write scopes without blocking. Readers on other threads
//! run concurrently with each other and wait for the writer to finish.
//!
//! A thread holding only a read scope must not ask for a write scope: two such
//! threads would wait on each other forever, so the attempt panics instead.

use core::marker::PhantomData;
use hashbrown::HashMap;
use parking_lot::{Condvar, Mutex};
use std::thread::{self, ThreadId};

#[derive(Debug, Default)]
struct LockState {
    /// Read scopes held per thread, excluding reads nested in a write scope.
    readers: HashMap<ThreadId, usize>,
    writer: Option<ThreadId>,
    write_depth: usize,
}

/// Lock with reentrant read and write scopes.
#[derive(Debug, Default)]
pub struct TableLock {
    state: Mutex<LockState>,
    released: Condvar,
}

impl TableLock {
    /// Creates an unlocked table lock.
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires a shared scope, blocking while another thread writes.
    pub fn read(&self) -> ReadScope<'_> {
        let me = thread::current().id();
        let mut state = self.state.lock();

        if state.writer == Some(me) {
            return ReadScope {
                lock: self,
                owner: me,
                nested_in_write: true,
                _not_send: PhantomData,
            };
        }

        if !state.readers.contains_key(&me) {
            while state.writer.is_some() {
                self.released.wait(&mut state);
            }
        }
        *state.readers.entry(me).or_insert(0) += 1;

        ReadScope {
            lock: self,
            owner: me,
            nested_in_write: false,
            _not_send: PhantomData,
        }
    }

    /// Acquires an exclusive scope, blocking while other threads read or write.
    ///
    /// # Panics
    ///
    /// Panics if the calling thread holds a read scope but no write scope.
    pub fn write(&self) -> WriteScope<'_> {
        let me = thread::current().id();
        let mut state = self.state.lock();

        if state.writer == Some(me) {
            state.write_depth += 1;
            return WriteScope {
                lock: self,
                _not_send: PhantomData,
            };
        }

        assert!(
            !state.readers.contains_key(&me),
            "cannot upgrade a table read scope to a write scope"
        );

        while state.writer.is_some() || !state.readers.is_empty() {
            self.released.wait(&mut state);
        }
        state.writer = Some(me);
        state.write_depth = 1;

        WriteScope {
            lock: self,
            _not_send: PhantomData,
        }
    }

    /// Returns true if the calling thread holds the write scope.
    pub fn is_write_held(&self) -> bool {
        self.state.lock().writer == Some(thread::current().id())
    }

    /// Returns the number of threads currently holding read scopes.
    pub fn reader_count(&self) -> usize {
        self.state.lock().readers.len()
    }
}

/// Shared scope on a `TableLock`. Released on drop.
pub struct ReadScope<'a> {
    lock: &'a TableLock,
    owner: ThreadId,
    nested_in_write: bool,
    _not_send: PhantomData<*const ()>,
}

impl Drop for ReadScope<'_> {
    fn drop(&mut self) {
        if self.nested_in_write {
            return;
        }
        let mut state = self.lock.state.lock();
        if let Some(count) = state.readers.get_mut(&self.owner) {
            *count -= 1;
            if *count == 0 {
                state.readers.remove(&self.owner);
            }
        }
        if state.readers.is_empty() {
            self.lock.released.notify_all();
        }
    }
}

/// Exclusive scope on a `TableLock`. Released on drop.
pub struct WriteScope<'a> {
    lock: &'a TableLock,
    _not_send: PhantomData<*const ()>,
}

impl Drop for WriteScope<'_> {
    fn drop(&mut self) {
        let mut state = self.lock.state.lock();
        state.write_depth -= 1;
        if state.write_depth == 0 {
            state.writer = None;
            self.lock.released.notify_all();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_write_is_reentrant() {
        let lock = TableLock::new();
        let outer = lock.write();
        {
            let _inner = lock.write();
            let _read = lock.read();
            assert!(lock.is_write_held());
        }
        assert!(lock.is_write_held());
        drop(outer);
        assert!(!lock.is_write_held());
    }

    #[test]
    fn test_read_is_reentrant() {
        let lock = TableLock::new();
        let _a = lock.read();
        let _b = lock.read();
        assert_eq!(lock.reader_count(), 1);
    }

    #[test]
    #[should_panic(expected = "cannot upgrade")]
    fn test_upgrade_panics() {
        let lock = TableLock::new();
        let _read = lock.read();
        let _write = lock.write();
    }

    #[test]
    fn test_writer_waits_for_readers() {
        let lock = Arc::new(TableLock::new());
        let written = Arc::new(AtomicBool::new(false));
        let read = lock.read();

        let handle = {
            let lock = Arc::clone(&lock);
            let written = Arc::clone(&written);
            thread::spawn(move || {
                let _write = lock.write();
                written.store(true, Ordering::SeqCst);
            })
        };

        thread::sleep(Duration::from_millis(50));
        assert!(!written.load(Ordering::SeqCst));
        drop(read);
        handle.join().unwrap();
        assert!(written.load(Ordering::SeqCst));
    }

    #[test]
    fn test_readers_run_concurrently() {
        let lock = Arc::new(TableLock::new());
        let _read = lock.read();

        let other = {
            let lock = Arc::clone(&lock);
            thread::spawn(move || {
                let _read = lock.read();
                lock.reader_count()
            })
        };
        assert_eq!(other.join().unwrap(), 2);
    }
}
