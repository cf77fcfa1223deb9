//! Error types for Tessera table operations.

use crate::row::RowId;
use thiserror::Error;

/// Result type alias for Tessera operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Index name reported when a row id collides on add.
pub const PRIMARY_KEY: &str = "id";

/// Error types for Tessera table operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Unknown row id on get, update or remove.
    #[error("row {id} not found in table {table}")]
    NotFound { table: String, id: RowId },

    /// No row has `key` in the unique index `index`.
    #[error("key {key} not found in index {index} of table {table}")]
    KeyNotFound {
        table: String,
        index: String,
        key: String,
    },

    /// Id collision on add, or unique-index collision on add/update.
    #[error("duplicate key {key} for index {index} in table {table}")]
    DuplicateKey {
        table: String,
        index: String,
        key: String,
    },

    /// The supplied row is older than the stored one.
    #[error("stale version for row {id} in table {table}: supplied {supplied}, stored {stored}")]
    StaleVersion {
        table: String,
        id: RowId,
        supplied: i32,
        stored: i32,
    },

    /// A named check constraint rejected the row.
    #[error("constraint {constraint} violated by row {id} in table {table}")]
    ConstraintViolation {
        table: String,
        constraint: String,
        id: RowId,
    },

    /// A reference would dangle, or a referenced row was removed without cascade.
    #[error("reference {reference} violated in table {table}: {message}")]
    ReferentialViolation {
        table: String,
        reference: String,
        message: String,
    },

    /// A trigger re-entered a table whose trigger section is already running on this thread.
    #[error("reentrant trigger cycle on table {table}")]
    ReentrantTriggerCycle { table: String },

    /// The open changeset already recorded a failure and must be rolled back.
    #[error("changeset on table {table} has failed: {cause}")]
    TransactionFaulted { table: String, cause: String },

    /// The table changed shape while an enumerator was open.
    #[error("table {table} was modified during enumeration")]
    ModifiedDuringEnumeration { table: String },

    /// Commit or rollback without a matching begin.
    #[error("no active changeset on table {table}")]
    NoActiveChangeSet { table: String },

    /// Caller-supplied row id outside the assignable range.
    #[error("invalid row id {id} for table {table}")]
    InvalidRowId { table: String, id: RowId },

    /// Index not registered on the table, or registered with another key type.
    #[error("index {index} not found in table {table}")]
    IndexNotFound { table: String, index: String },

    /// Table type not registered in the database.
    #[error("table not found: {name}")]
    TableNotFound { name: String },

    /// No database has been entered on the current thread.
    #[error("no ambient database entered on this thread")]
    NoAmbientDatabase,

    /// Saving or loading rows failed.
    #[error("persistence failure for table {table}: {message}")]
    Persistence { table: String, message: String },

    /// Invalid operation.
    #[error("invalid operation: {message}")]
    InvalidOperation { message: String },

    /// Internal state was found inconsistent while undoing a change.
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl Error {
    /// Creates a not found error.
    pub fn not_found(table: impl Into<String>, id: RowId) -> Self {
        Error::NotFound {
            table: table.into(),
            id,
        }
    }

    /// Creates a missing unique-index key error.
    pub fn key_not_found(
        table: impl Into<String>,
        index: impl Into<String>,
        key: impl Into<String>,
    ) -> Self {
        Error::KeyNotFound {
            table: table.into(),
            index: index.into(),
            key: key.into(),
        }
    }

    /// Creates a duplicate key error for a unique index.
    pub fn duplicate_key(
        table: impl Into<String>,
        index: impl Into<String>,
        key: impl Into<String>,
    ) -> Self {
        Error::DuplicateKey {
            table: table.into(),
            index: index.into(),
            key: key.into(),
        }
    }

    /// Creates a duplicate key error for a colliding row id.
    pub fn duplicate_id(table: impl Into<String>, id: RowId) -> Self {
        Self::duplicate_key(table, PRIMARY_KEY, id.to_string())
    }

    /// Creates a stale version error.
    pub fn stale_version(table: impl Into<String>, id: RowId, supplied: i32, stored: i32) -> Self {
        Error::StaleVersion {
            table: table.into(),
            id,
            supplied,
            stored,
        }
    }

    /// Creates a constraint violation error.
    pub fn constraint_violation(
        table: impl Into<String>,
        constraint: impl Into<String>,
        id: RowId,
    ) -> Self {
        Error::ConstraintViolation {
            table: table.into(),
            constraint: constraint.into(),
            id,
        }
    }

    /// Creates a referential violation error.
    pub fn referential_violation(
        table: impl Into<String>,
        reference: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Error::ReferentialViolation {
            table: table.into(),
            reference: reference.into(),
            message: message.into(),
        }
    }

    /// Creates a reentrant trigger cycle error.
    pub fn reentrant_trigger(table: impl Into<String>) -> Self {
        Error::ReentrantTriggerCycle {
            table: table.into(),
        }
    }

    /// Creates a faulted changeset error.
    pub fn transaction_faulted(table: impl Into<String>, cause: impl Into<String>) -> Self {
        Error::TransactionFaulted {
            table: table.into(),
            cause: cause.into(),
        }
    }

    /// Creates a modified during enumeration error.
    pub fn modified_during_enumeration(table: impl Into<String>) -> Self {
        Error::ModifiedDuringEnumeration {
            table: table.into(),
        }
    }

    /// Creates a no active changeset error.
    pub fn no_active_change_set(table: impl Into<String>) -> Self {
        Error::NoActiveChangeSet {
            table: table.into(),
        }
    }

    /// Creates an invalid row id error.
    pub fn invalid_row_id(table: impl Into<String>, id: RowId) -> Self {
        Error::InvalidRowId {
            table: table.into(),
            id,
        }
    }

    /// Creates an index not found error.
    pub fn index_not_found(table: impl Into<String>, index: impl Into<String>) -> Self {
        Error::IndexNotFound {
            table: table.into(),
            index: index.into(),
        }
    }

    /// Creates a table not found error.
    pub fn table_not_found(name: impl Into<String>) -> Self {
        Error::TableNotFound { name: name.into() }
    }

    /// Creates a persistence error.
    pub fn persistence(table: impl Into<String>, message: impl ToString) -> Self {
        Error::Persistence {
            table: table.into(),
            message: message.to_string(),
        }
    }

    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Error::InvalidOperation {
            message: message.into(),
        }
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Error::Internal {
            message: message.into(),
        }
    }

    /// Returns true for errors that leave the table untouched and are expected
    /// in normal operation (missing rows or keys, stale versions, collisions).
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::NotFound { .. }
                | Error::KeyNotFound { .. }
                | Error::StaleVersion { .. }
                | Error::DuplicateKey { .. }
        )
    }
}
