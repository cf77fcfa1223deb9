//! Tessera Core - Shared types for the Tessera in-memory table engine.
//!
//! This crate provides the vocabulary every other Tessera crate speaks:
//!
//! - `Row<T>`: a typed row value with its id, cached slot and version stamp
//! - `RowId` and the `NO_ROW` sentinel
//! - `TableOperation` / `CascadeOperation`: notification and cascade kinds
//! - `TableData`: the bound every row payload satisfies
//! - `Error`: the error taxonomy for table operations
//!
//! # Example
//!
//! ```rust
//! use tessera_core::{Row, NO_ROW};
//!
//! #[derive(Clone, Debug, PartialEq)]
//! struct Employee {
//!     name: String,
//!     salary: f32,
//! }
//!
//! let row = Row::new(Employee { name: "A".into(), salary: 1000.0 });
//! assert_eq!(row.id(), NO_ROW);
//! assert_eq!(row.slot(), None);
//! assert_eq!(row.version(), 0);
//! ```

mod error;
mod row;
mod types;

pub use error::{Error, Result, PRIMARY_KEY};
pub use row::{Row, RowId, NO_ROW};
pub use types::{CascadeOperation, TableData, TableOperation};
