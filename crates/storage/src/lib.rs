//! Tessera Storage - the table runtime for Tessera.
//!
//! This crate provides:
//!
//! - `Table`: a typed in-memory table with unique indexes, triggers,
//!   constraints, observers and nested changesets
//! - `RowContainer`: slot-ordered row storage with an id-to-slot map
//! - `ChangeSetLog`: the undo journal behind changesets
//! - `ChangeSet`: a guard that opens and closes changesets on several tables
//! - `TableLock`: the reentrant per-table read/write lock
//! - lazy enumerators that detect structural modification
//!
//! # Example
//!
//! ```rust
//! use tessera_storage::Table;
//! use tessera_core::CascadeOperation;
//!
//! let people: Table<String> = Table::new("people");
//! let alice = people.add("Alice".to_owned()).unwrap();
//! assert_eq!(alice.id(), 1);
//!
//! let cs = people.change_set().unwrap();
//! people.add("Bob".to_owned()).unwrap();
//! people.remove(alice.id(), CascadeOperation::None).unwrap();
//! cs.rollback().unwrap();
//!
//! assert_eq!(people.ids(), vec![1]);
//! ```

pub mod change_set;
pub mod constraint;
pub mod container;
pub mod guard;
pub mod iter;
pub mod journal;
pub mod keygen;
pub mod lock;
pub mod table;
pub mod trigger;

pub use change_set::{ChangeSet, ChangeSetParticipant};
pub use constraint::Constraint;
pub use container::{IdDensity, RowContainer, RowEvent, SlotMap};
pub use guard::TriggerGuard;
pub use iter::{IdQueryIter, JoinIter, ManyToManyIter, QueryIter, RowIdIter, RowIter};
pub use journal::{ChangeSetLog, LogEntry, UndoTarget};
pub use keygen::KeyGenerator;
pub use lock::{ReadScope, TableLock, WriteScope};
pub use table::{
    ListenerId, LoadReport, ObserverFn, ObserverHandle, RejectedRow, Table, TableBuilder,
    TableOptions, UpdateOutcome,
};
pub use trigger::{TriggerId, SYSTEM_PRIORITY, USER_PRIORITY};
