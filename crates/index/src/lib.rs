//! Tessera Index - Integer containers and row indexes for the Tessera table engine.
//!
//! This crate provides:
//!
//! - `IdSet` / `IntSet`: paged bitsets over non-negative or arbitrary `i32` keys,
//!   with bulk set algebra against raw integer spans
//! - `IntegerMap`: the capability trait shared by `IdMap` (dense array),
//!   `PagedIdMap` (lazily allocated pages) and `IntMap<V>` (full `i32` domain)
//! - `RowIndex` / `UniqueIndex`: derived-key indexes enforcing one row per key
//!
//! # Example
//!
//! ```rust
//! use tessera_index::{IdMap, IdSet, IntegerMap, IntSet};
//!
//! let mut ids = IdSet::new();
//! ids.union_with(&[9, 3, 3, 40]);
//! ids.except_with(&[40]);
//! assert_eq!(ids.iter().collect::<Vec<_>>(), vec![3, 9]);
//!
//! let mut ints = IntSet::new();
//! ints.union_with(&[-2, 1]);
//! assert!(ints.contains(-2));
//!
//! let mut slots = IdMap::new();
//! slots.insert(7, 0);
//! assert_eq!(slots.get(7), Some(0));
//! ```

mod bits;
pub mod id_map;
pub mod paged;
pub mod set;
pub mod traits;
pub mod unique;

pub use bits::{Identity, KeyCodec, ZigZag};
pub use id_map::IdMap;
pub use paged::{IntMap, PagedIdMap, PAGE_SIZE};
pub use set::{BitSet, IdSet, IntSet};
pub use traits::{IntegerMap, RowIndex};
pub use unique::{KeyFn, UniqueIndex};
