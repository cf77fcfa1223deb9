//! Saving and restoring table contents.
//!
//! A `Persistence` adapter moves `StoredRow` lists in and out of some store.
//! Row payloads travel as `serde_json::Value`, so adapters never see the row
//! types. `Database::save` and `Database::load` drive the adapter table by
//! table.

use hashbrown::HashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tessera_core::{Error, Result, RowId};

/// One persisted row.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoredRow {
    pub id: RowId,
    #[serde(default)]
    pub version: i32,
    pub data: serde_json::Value,
}

/// Storage backend for table contents.
pub trait Persistence: Send + Sync {
    /// Replaces whatever is stored for `table` with `rows`.
    fn save_rows(&self, table: &str, rows: &[StoredRow]) -> Result<()>;

    /// Returns the rows stored for `table`, or `None` if nothing was ever
    /// saved for it.
    fn load_rows(&self, table: &str) -> Result<Option<Vec<StoredRow>>>;
}

/// Writes each table as an indented JSON array to `<dir>/<table>.json`.
#[derive(Clone, Debug)]
pub struct JsonPersistence {
    dir: PathBuf,
}

impl JsonPersistence {
    /// Uses `dir` for table files. The directory is created on first save.
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the file holding `table`.
    pub fn path_for(&self, table: &str) -> PathBuf {
        self.dir.join(format!("{table}.json"))
    }
}

impl Persistence for JsonPersistence {
    fn save_rows(&self, table: &str, rows: &[StoredRow]) -> Result<()> {
        fs::create_dir_all(&self.dir).map_err(|e| Error::persistence(table, e))?;
        let json = serde_json::to_string_pretty(rows).map_err(|e| Error::persistence(table, e))?;
        fs::write(self.path_for(table), json).map_err(|e| Error::persistence(table, e))
    }

    fn load_rows(&self, table: &str) -> Result<Option<Vec<StoredRow>>> {
        let json = match fs::read_to_string(self.path_for(table)) {
            Ok(json) => json,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Error::persistence(table, e)),
        };
        serde_json::from_str(&json)
            .map(Some)
            .map_err(|e| Error::persistence(table, e))
    }
}

/// Keeps serialized tables in memory. Useful for tests and snapshots.
#[derive(Debug, Default)]
pub struct MemoryPersistence {
    tables: Mutex<HashMap<String, String>>,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the JSON saved for `table`.
    pub fn contents(&self, table: &str) -> Option<String> {
        self.tables.lock().get(table).cloned()
    }

    /// Stores raw JSON for `table`, as if it had been saved.
    pub fn insert_raw(&self, table: impl Into<String>, json: impl Into<String>) {
        self.tables.lock().insert(table.into(), json.into());
    }

    pub fn table_count(&self) -> usize {
        self.tables.lock().len()
    }
}

impl Persistence for MemoryPersistence {
    fn save_rows(&self, table: &str, rows: &[StoredRow]) -> Result<()> {
        let json = serde_json::to_string(rows).map_err(|e| Error::persistence(table, e))?;
        self.tables.lock().insert(table.to_owned(), json);
        Ok(())
    }

    fn load_rows(&self, table: &str) -> Result<Option<Vec<StoredRow>>> {
        let Some(json) = self.contents(table) else {
            return Ok(None);
        };
        serde_json::from_str(&json)
            .map(Some)
            .map_err(|e| Error::persistence(table, e))
    }
}
