//! Operation kinds and the row payload bound.

use core::fmt;

/// Bound satisfied by every row payload stored in a table.
///
/// Rows are values: reads hand out clones, updates compare payloads to detect
/// no-op writes, and tables are shared across threads.
pub trait TableData: Clone + PartialEq + Send + Sync + 'static {}

impl<T> TableData for T where T: Clone + PartialEq + Send + Sync + 'static {}

/// Kind of physical change reported by row-modified notifications.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TableOperation {
    /// A row was appended at the reported slot.
    Add,
    /// The row at the reported slot was overwritten or moved there.
    Update,
    /// The reported slot was vacated.
    Remove,
}

/// Policy applied when removing a row that other rows still reference.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum CascadeOperation {
    /// Reject the removal.
    #[default]
    None,
    /// Clear the referencing foreign keys to `NO_ROW`.
    SetNull,
    /// Remove the referencing rows, transitively.
    Delete,
}

impl fmt::Display for TableOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TableOperation::Add => "add",
            TableOperation::Update => "update",
            TableOperation::Remove => "remove",
        };
        f.write_str(name)
    }
}

impl fmt::Display for CascadeOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CascadeOperation::None => "none",
            CascadeOperation::SetNull => "set-null",
            CascadeOperation::Delete => "delete",
        };
        f.write_str(name)
    }
}
