//! Explicit schema description and the builder that turns it into a
//! `Database`.
//!
//! # Example
//!
//! ```rust
//! use serde::{Deserialize, Serialize};
//! use tessera_core::RowId;
//! use tessera_database::Schema;
//!
//! #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
//! struct Department { name: String }
//!
//! #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
//! struct Employee { name: String, department: RowId }
//!
//! let db = Schema::builder()
//!     .table::<Department>("departments")
//!     .unwrap()
//!     .table::<Employee>("employees")
//!     .unwrap()
//!     .reference::<Employee, Department>(
//!         "employee_department",
//!         |e| e.department,
//!         |e, id| e.department = id,
//!     )
//!     .unwrap()
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(db.table_names(), vec!["departments", "employees"]);
//! ```

use crate::database::{Database, Record, StoredTable, TableEntry};
use crate::reference::{Links, Reference};
use hashbrown::HashMap;
use std::any::{Any, TypeId};
use std::hash::Hash;
use std::sync::Arc;
use tessera_core::{Error, Result, RowId};
use tessera_storage::{Table, TableOptions};
use tracing::debug;

/// A registered table as the schema describes it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableInfo {
    pub name: String,
    pub row_type: &'static str,
    pub options: TableOptions,
}

/// A registered reference as the schema describes it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReferenceInfo {
    pub name: String,
    pub child: String,
    pub parent: String,
}

/// Description of the tables and references of a database.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Schema {
    tables: Vec<TableInfo>,
    references: Vec<ReferenceInfo>,
}

impl Schema {
    /// Starts describing a database.
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::new()
    }

    pub fn tables(&self) -> &[TableInfo] {
        &self.tables
    }

    pub fn references(&self) -> &[ReferenceInfo] {
        &self.references
    }

    /// Returns the references whose parent is table `name`.
    pub fn references_to(&self, name: &str) -> impl Iterator<Item = &ReferenceInfo> {
        let name = name.to_owned();
        self.references.iter().filter(move |r| r.parent == name)
    }
}

/// Builder for `Database`.
///
/// Tables are created as they are registered, so everything registered
/// against a table (references, constraints, indexes, triggers) must come
/// after the table itself.
pub struct SchemaBuilder {
    schema: Schema,
    tables: Vec<TableEntry>,
    by_type: HashMap<TypeId, usize>,
    references: HashMap<String, Arc<dyn Any + Send + Sync>>,
}

impl SchemaBuilder {
    fn new() -> Self {
        Self {
            schema: Schema::default(),
            tables: Vec::new(),
            by_type: HashMap::new(),
            references: HashMap::new(),
        }
    }

    /// Registers a table for rows of type `T`.
    pub fn table<T: Record>(self, name: impl Into<String>) -> Result<Self> {
        self.table_with::<T>(name, TableOptions::default())
    }

    /// Registers a table for rows of type `T` with explicit options.
    pub fn table_with<T: Record>(
        mut self,
        name: impl Into<String>,
        options: TableOptions,
    ) -> Result<Self> {
        let name = name.into();
        if self.by_type.contains_key(&TypeId::of::<T>()) {
            return Err(Error::invalid_operation(format!(
                "row type {} already has a table",
                std::any::type_name::<T>()
            )));
        }
        if self.schema.tables.iter().any(|t| t.name == name) {
            return Err(Error::invalid_operation(format!("table {name} already exists")));
        }

        let table = Arc::new(Table::<T>::with_options(name.as_str(), options.clone()));
        let links = Arc::new(Links::<T>::new());
        links.install(&table);

        self.by_type.insert(TypeId::of::<T>(), self.tables.len());
        self.tables.push(TableEntry {
            table: Arc::clone(&table) as Arc<dyn StoredTable>,
            typed: table,
            links,
        });
        self.schema.tables.push(TableInfo {
            name,
            row_type: std::any::type_name::<T>(),
            options,
        });
        Ok(self)
    }

    /// Registers reference `name` from the key `get` reads out of `C` rows to
    /// the rows of `P`. `set` writes the key, for `SetNull` cascades.
    pub fn reference<C: Record, P: Record>(
        mut self,
        name: impl Into<String>,
        get: impl Fn(&C) -> RowId + Send + Sync + 'static,
        set: impl Fn(&mut C, RowId) + Send + Sync + 'static,
    ) -> Result<Self> {
        let name = name.into();
        if self.references.contains_key(name.as_str()) {
            return Err(Error::invalid_operation(format!("reference {name} already exists")));
        }
        let child = self.typed::<C>()?;
        let parent = self.typed::<P>()?;
        let child_links = self.links::<C>()?;
        let parent_links = self.links::<P>()?;

        let reference = Reference::new(&name, child, parent, Arc::new(get), Arc::new(set));
        let link = Arc::new(reference.link());
        child_links.add_outgoing(link.clone());
        parent_links.add_incoming(link);

        debug!(
            target: "tessera::database",
            reference = %name,
            child = reference.child().name(),
            parent = reference.parent().name(),
            "reference registered"
        );
        self.schema.references.push(ReferenceInfo {
            name: name.clone(),
            child: reference.child().name().to_owned(),
            parent: reference.parent().name().to_owned(),
        });
        self.references.insert(name, Arc::new(reference));
        Ok(self)
    }

    /// Adds a named check constraint to the table of `T`.
    pub fn constraint<T: Record>(
        self,
        name: impl Into<String>,
        predicate: impl Fn(&T) -> bool + Send + Sync + 'static,
    ) -> Result<Self> {
        self.typed::<T>()?.add_constraint(name, predicate);
        Ok(self)
    }

    /// Adds a unique index to the table of `T`.
    pub fn unique_index<T: Record, K>(
        self,
        name: impl Into<String>,
        key_fn: impl Fn(&T) -> K + Send + Sync + 'static,
    ) -> Result<Self>
    where
        K: Eq + Hash + Clone + std::fmt::Debug + Send + Sync + 'static,
    {
        self.typed::<T>()?.add_unique_index(name, key_fn)?;
        Ok(self)
    }

    /// Runs `configure` against the table of `T`, for registering triggers
    /// and anything else the builder has no shorthand for.
    pub fn configure<T: Record>(
        self,
        configure: impl FnOnce(&Table<T>) -> Result<()>,
    ) -> Result<Self> {
        let table = self.typed::<T>()?;
        configure(&*table)?;
        Ok(self)
    }

    /// Finishes the database.
    pub fn build(self) -> Result<Database> {
        debug!(
            target: "tessera::database",
            tables = self.tables.len(),
            references = self.references.len(),
            "database built"
        );
        Ok(Database::from_parts(
            self.schema,
            self.tables,
            self.by_type,
            self.references,
        ))
    }

    fn entry<T: Record>(&self) -> Result<&TableEntry> {
        self.by_type
            .get(&TypeId::of::<T>())
            .map(|&at| &self.tables[at])
            .ok_or_else(|| Error::table_not_found(std::any::type_name::<T>()))
    }

    fn typed<T: Record>(&self) -> Result<Arc<Table<T>>> {
        Arc::clone(&self.entry::<T>()?.typed)
            .downcast::<Table<T>>()
            .map_err(|_| Error::internal("table registered under the wrong row type"))
    }

    fn links<T: Record>(&self) -> Result<Arc<Links<T>>> {
        Arc::clone(&self.entry::<T>()?.links)
            .downcast::<Links<T>>()
            .map_err(|_| Error::internal("links registered under the wrong row type"))
    }
}

impl Default for SchemaBuilder {
    fn default() -> Self {
        Self::new()
    }
}
