//! The table registry.

use crate::persistence::{Persistence, StoredRow};
use crate::reference::Reference;
use crate::schema::{Schema, SchemaBuilder};
use crate::scope::{self, DatabaseScope};
use hashbrown::HashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::any::{Any, TypeId};
use std::sync::Arc;
use tessera_core::{Error, Result, Row, TableData};
use tessera_storage::{ChangeSet, ChangeSetParticipant, LoadReport, RejectedRow, Table};
use tracing::{debug, warn};

/// Row payloads a database can hold and persist.
pub trait Record: TableData + Serialize + DeserializeOwned {}

impl<T> Record for T where T: TableData + Serialize + DeserializeOwned {}

/// Type-erased view of a registered table.
pub(crate) trait StoredTable: Send + Sync {
    fn table_name(&self) -> &str;
    fn row_count(&self) -> usize;
    fn participant(&self) -> &dyn ChangeSetParticipant;
    fn export_rows(&self) -> Result<Vec<StoredRow>>;
    fn import_rows(&self, rows: Vec<StoredRow>) -> Result<LoadReport>;
}

impl<T: Record> StoredTable for Table<T> {
    fn table_name(&self) -> &str {
        self.name()
    }

    fn row_count(&self) -> usize {
        self.len()
    }

    fn participant(&self) -> &dyn ChangeSetParticipant {
        self
    }

    fn export_rows(&self) -> Result<Vec<StoredRow>> {
        self.to_vec()
            .into_iter()
            .map(|row| {
                let data = serde_json::to_value(&row.data)
                    .map_err(|e| Error::persistence(self.name(), e))?;
                Ok(StoredRow {
                    id: row.id(),
                    version: row.version(),
                    data,
                })
            })
            .collect()
    }

    fn import_rows(&self, rows: Vec<StoredRow>) -> Result<LoadReport> {
        let mut positions = Vec::with_capacity(rows.len());
        let mut decoded = Vec::with_capacity(rows.len());
        let mut undecodable = Vec::new();
        for (position, stored) in rows.into_iter().enumerate() {
            match serde_json::from_value::<T>(stored.data) {
                Ok(data) => {
                    positions.push(position);
                    decoded.push(Row::from_parts(stored.id, stored.version, data));
                }
                Err(e) => {
                    warn!(
                        target: "tessera::load",
                        table = %self.name(),
                        id = stored.id,
                        position,
                        error = %e,
                        "skipping undecodable row"
                    );
                    undecodable.push(RejectedRow {
                        position,
                        id: stored.id,
                        error: Error::persistence(self.name(), e),
                    });
                }
            }
        }

        let mut report = self.load(decoded)?;
        for rejected in &mut report.rejected {
            rejected.position = positions[rejected.position];
        }
        report.rejected.extend(undecodable);
        report.rejected.sort_by_key(|r| r.position);
        Ok(report)
    }
}

/// A registered table: erased for bulk work, typed for lookup.
pub(crate) struct TableEntry {
    pub(crate) table: Arc<dyn StoredTable>,
    pub(crate) typed: Arc<dyn Any + Send + Sync>,
    pub(crate) links: Arc<dyn Any + Send + Sync>,
}

/// A set of tables wired together by references.
///
/// Tables are registered per row type, so each row type has at most one
/// table. Build one with `Schema::builder()`.
pub struct Database {
    schema: Schema,
    tables: Vec<TableEntry>,
    by_type: HashMap<TypeId, usize>,
    references: HashMap<String, Arc<dyn Any + Send + Sync>>,
}

impl Database {
    /// Shorthand for `Schema::builder()`.
    pub fn builder() -> SchemaBuilder {
        Schema::builder()
    }

    pub(crate) fn from_parts(
        schema: Schema,
        tables: Vec<TableEntry>,
        by_type: HashMap<TypeId, usize>,
        references: HashMap<String, Arc<dyn Any + Send + Sync>>,
    ) -> Self {
        Self {
            schema,
            tables,
            by_type,
            references,
        }
    }

    /// Returns the description the database was built from.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Returns the table holding rows of type `T`.
    pub fn table<T: Record>(&self) -> Result<Arc<Table<T>>> {
        self.by_type
            .get(&TypeId::of::<T>())
            .and_then(|&at| Arc::clone(&self.tables[at].typed).downcast::<Table<T>>().ok())
            .ok_or_else(|| Error::table_not_found(std::any::type_name::<T>()))
    }

    /// Returns the table names in registration order.
    pub fn table_names(&self) -> Vec<&str> {
        self.tables.iter().map(|e| e.table.table_name()).collect()
    }

    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    /// Returns the number of rows across all tables.
    pub fn total_rows(&self) -> usize {
        self.tables.iter().map(|e| e.table.row_count()).sum()
    }

    /// Returns the reference registered as `name`.
    pub fn reference<C: Record, P: Record>(&self, name: &str) -> Result<Reference<C, P>> {
        self.references
            .get(name)
            .and_then(|any| any.downcast_ref::<Reference<C, P>>())
            .cloned()
            .ok_or_else(|| {
                Error::invalid_operation(format!(
                    "no reference named {name} between these row types"
                ))
            })
    }

    /// Opens a changeset on every table.
    pub fn change_set(&self) -> Result<ChangeSet<'_>> {
        let participants: Vec<&dyn ChangeSetParticipant> =
            self.tables.iter().map(|e| e.table.participant()).collect();
        ChangeSet::begin(&participants)
    }

    /// Writes every table to `store`.
    pub fn save(&self, store: &dyn Persistence) -> Result<()> {
        for entry in &self.tables {
            let rows = entry.table.export_rows()?;
            store.save_rows(entry.table.table_name(), &rows)?;
            debug!(
                target: "tessera::database",
                table = entry.table.table_name(),
                rows = rows.len(),
                "table saved"
            );
        }
        Ok(())
    }

    /// Replaces the contents of every table `store` holds rows for. Tables
    /// with nothing stored are left as they are.
    ///
    /// Rows that cannot be decoded or stored are skipped and reported per
    /// table. Referential checks do not run during a load.
    pub fn load(&self, store: &dyn Persistence) -> Result<Vec<(String, LoadReport)>> {
        let mut reports = Vec::new();
        for entry in &self.tables {
            let name = entry.table.table_name();
            let Some(rows) = store.load_rows(name)? else {
                debug!(target: "tessera::database", table = name, "nothing stored");
                continue;
            };
            let report = entry.table.import_rows(rows)?;
            reports.push((name.to_owned(), report));
        }
        Ok(reports)
    }

    /// Makes `database` the ambient database of this thread until the
    /// returned scope is dropped.
    pub fn enter(database: &Arc<Database>) -> DatabaseScope {
        DatabaseScope::enter(database)
    }

    /// Returns the innermost database entered on this thread.
    pub fn current() -> Result<Arc<Database>> {
        scope::current()
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("tables", &self.table_names())
            .field("references", &self.references.len())
            .finish()
    }
}
