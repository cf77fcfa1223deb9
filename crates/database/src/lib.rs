//! Tessera Database - tables wired together by references.
//!
//! This crate provides the layer above single tables:
//!
//! - `Schema` / `SchemaBuilder`: an explicit description of tables,
//!   references, constraints and indexes, built with plain function calls
//! - `Database`: the registry of typed tables, with changesets spanning all
//!   of them
//! - `Reference`: foreign keys with validation, cascade handling and
//!   navigation
//! - `Persistence`: save and restore through `JsonPersistence` or
//!   `MemoryPersistence`
//! - `DatabaseScope`: an optional ambient database for the current thread
//!
//! # Example
//!
//! ```rust
//! use serde::{Deserialize, Serialize};
//! use tessera_core::{CascadeOperation, RowId};
//! use tessera_database::Schema;
//!
//! #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
//! struct Department { name: String }
//!
//! #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
//! struct Employee { name: String, department: RowId }
//!
//! let db = Schema::builder()
//!     .table::<Department>("departments").unwrap()
//!     .table::<Employee>("employees").unwrap()
//!     .reference::<Employee, Department>(
//!         "employee_department",
//!         |e| e.department,
//!         |e, id| e.department = id,
//!     )
//!     .unwrap()
//!     .build()
//!     .unwrap();
//!
//! let departments = db.table::<Department>().unwrap();
//! let employees = db.table::<Employee>().unwrap();
//! let sales = departments.add(Department { name: "Sales".into() }).unwrap();
//! employees.add(Employee { name: "Ann".into(), department: sales.id() }).unwrap();
//!
//! // Still referenced: removal without a cascade is refused.
//! assert!(departments.remove(sales.id(), CascadeOperation::None).is_err());
//! departments.remove(sales.id(), CascadeOperation::Delete).unwrap();
//! assert!(employees.is_empty());
//! ```

pub mod database;
pub mod persistence;
pub mod reference;
pub mod schema;
pub mod scope;

pub use database::{Database, Record};
pub use persistence::{JsonPersistence, MemoryPersistence, Persistence, StoredRow};
pub use reference::{KeyGetter, KeySetter, Reference};
pub use schema::{ReferenceInfo, Schema, SchemaBuilder, TableInfo};
pub use scope::{is_entered, DatabaseScope};
