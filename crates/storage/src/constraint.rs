//! Named check constraints.

use smallvec::SmallVec;
use std::sync::Arc;
use tessera_core::{Error, Result, Row};

/// Predicate a row's data must satisfy.
pub type CheckFn<T> = dyn Fn(&T) -> bool + Send + Sync;

/// A named check constraint.
pub struct Constraint<T> {
    name: String,
    predicate: Arc<CheckFn<T>>,
}

impl<T> Constraint<T> {
    pub fn new(
        name: impl Into<String>,
        predicate: impl Fn(&T) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            predicate: Arc::new(predicate),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fails with a violation naming this constraint if `row` does not satisfy it.
    pub fn check(&self, table: &str, row: &Row<T>) -> Result<()> {
        if (self.predicate)(&row.data) {
            Ok(())
        } else {
            Err(Error::constraint_violation(table, self.name.as_str(), row.id()))
        }
    }
}

impl<T> Clone for Constraint<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            predicate: Arc::clone(&self.predicate),
        }
    }
}

/// Constraints captured for one mutation.
pub type ConstraintSnapshot<T> = SmallVec<[Constraint<T>; 4]>;

/// Checks every constraint in order, stopping at the first violation.
pub fn check_all<T>(constraints: &[Constraint<T>], table: &str, row: &Row<T>) -> Result<()> {
    constraints.iter().try_for_each(|c| c.check(table, row))
}
