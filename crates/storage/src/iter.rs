//! Lazy enumerators over tables.
//!
//! An enumerator records the table's structural version when created and
//! takes a short read scope on every `next`, so the table stays writable
//! between steps. If a row was added or removed (or the table cleared or
//! sorted) in the meantime, `next` yields one `ModifiedDuringEnumeration`
//! error and the enumerator ends. In-place updates do not invalidate it; rows
//! reached after an update show the new data.

use crate::container::RowContainer;
use crate::table::Table;
use tessera_core::{Error, Result, Row, RowId, TableData};

struct Cursor<'a, T> {
    table: &'a Table<T>,
    version: u64,
    position: usize,
    exhausted: bool,
    failed: bool,
}

impl<'a, T: TableData> Cursor<'a, T> {
    fn new(table: &'a Table<T>) -> Self {
        Self {
            table,
            version: table.structural_version(),
            position: 0,
            exhausted: false,
            failed: false,
        }
    }

    /// Runs one step under a read scope after checking the captured version.
    fn step<R>(
        &mut self,
        advance: impl FnOnce(&RowContainer<T>, &mut usize) -> Option<R>,
    ) -> Option<Result<R>> {
        if self.exhausted || self.failed {
            return None;
        }
        let _scope = self.table.lock().read();
        let state = self.table.state.read_recursive();
        if state.container.version() != self.version {
            self.failed = true;
            return Some(Err(Error::modified_during_enumeration(self.table.name())));
        }
        match advance(&state.container, &mut self.position) {
            Some(item) => Some(Ok(item)),
            None => {
                self.exhausted = true;
                None
            }
        }
    }

    fn next_matching(&mut self, mut accept: impl FnMut(&Row<T>) -> bool) -> Option<Result<Row<T>>> {
        self.step(|container, position| {
            while let Some(row) = container.get_by_index(*position) {
                *position += 1;
                if accept(row) {
                    return Some(row.clone());
                }
            }
            None
        })
    }

    fn rewind(&mut self) {
        self.position = 0;
        self.exhausted = false;
    }
}

/// Iterator over every row of a table, in slot order.
pub struct RowIter<'a, T> {
    cursor: Cursor<'a, T>,
}

impl<'a, T: TableData> RowIter<'a, T> {
    pub(crate) fn new(table: &'a Table<T>) -> Self {
        Self {
            cursor: Cursor::new(table),
        }
    }
}

impl<T: TableData> Iterator for RowIter<'_, T> {
    type Item = Result<Row<T>>;

    fn next(&mut self) -> Option<Self::Item> {
        self.cursor.next_matching(|_| true)
    }
}

/// Iterator over the rows matching a predicate.
pub struct QueryIter<'a, T, P> {
    cursor: Cursor<'a, T>,
    predicate: P,
}

impl<'a, T: TableData, P> QueryIter<'a, T, P> {
    pub(crate) fn new(table: &'a Table<T>, predicate: P) -> Self {
        Self {
            cursor: Cursor::new(table),
            predicate,
        }
    }
}

impl<T, P> Iterator for QueryIter<'_, T, P>
where
    T: TableData,
    P: FnMut(&Row<T>) -> bool,
{
    type Item = Result<Row<T>>;

    fn next(&mut self) -> Option<Self::Item> {
        let predicate = &mut self.predicate;
        self.cursor.next_matching(|row| predicate(row))
    }
}

/// Iterator over the ids of a table's rows.
pub struct RowIdIter<'a, T> {
    cursor: Cursor<'a, T>,
}

impl<'a, T: TableData> RowIdIter<'a, T> {
    pub(crate) fn new(table: &'a Table<T>) -> Self {
        Self {
            cursor: Cursor::new(table),
        }
    }
}

impl<T: TableData> Iterator for RowIdIter<'_, T> {
    type Item = Result<RowId>;

    fn next(&mut self) -> Option<Self::Item> {
        self.cursor.step(|container, position| {
            let id = container.get_by_index(*position)?.id();
            *position += 1;
            Some(id)
        })
    }
}

/// Iterator over the rows with the given ids. Ids with no row are skipped.
pub struct IdQueryIter<'a, T> {
    cursor: Cursor<'a, T>,
    ids: Vec<RowId>,
}

impl<'a, T: TableData> IdQueryIter<'a, T> {
    pub(crate) fn new(table: &'a Table<T>, ids: Vec<RowId>) -> Self {
        Self {
            cursor: Cursor::new(table),
            ids,
        }
    }
}

impl<T: TableData> Iterator for IdQueryIter<'_, T> {
    type Item = Result<Row<T>>;

    fn next(&mut self) -> Option<Self::Item> {
        let ids = &self.ids;
        self.cursor.step(|container, position| {
            while let Some(&id) = ids.get(*position) {
                *position += 1;
                if let Some(row) = container.get_by_id(id) {
                    return Some(row.clone());
                }
            }
            None
        })
    }
}

/// Nested-loop join over two tables.
pub struct JoinIter<'a, A, B, F> {
    left: Cursor<'a, A>,
    right: Cursor<'a, B>,
    current: Option<Row<A>>,
    condition: F,
    done: bool,
}

impl<'a, A: TableData, B: TableData, F> JoinIter<'a, A, B, F> {
    pub(crate) fn new(left: &'a Table<A>, right: &'a Table<B>, condition: F) -> Self {
        Self {
            left: Cursor::new(left),
            right: Cursor::new(right),
            current: None,
            condition,
            done: false,
        }
    }
}

impl<A, B, F> Iterator for JoinIter<'_, A, B, F>
where
    A: TableData,
    B: TableData,
    F: FnMut(&Row<A>, &Row<B>) -> bool,
{
    type Item = Result<(Row<A>, Row<B>)>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            if self.current.is_none() {
                match self.left.next_matching(|_| true) {
                    Some(Ok(row)) => {
                        self.current = Some(row);
                        self.right.rewind();
                    }
                    Some(Err(e)) => {
                        self.done = true;
                        return Some(Err(e));
                    }
                    None => {
                        self.done = true;
                        return None;
                    }
                }
            }

            let Some(left) = self.current.as_ref() else {
                continue;
            };
            let condition = &mut self.condition;
            match self.right.next_matching(|right| condition(left, right)) {
                Some(Ok(right)) => return Some(Ok((left.clone(), right))),
                Some(Err(e)) => {
                    self.done = true;
                    return Some(Err(e));
                }
                None => self.current = None,
            }
        }
        None
    }
}

/// Rows of one table repeated once per matching row of a link table.
pub struct ManyToManyIter<'a, A, L, F> {
    inner: JoinIter<'a, A, L, F>,
}

impl<'a, A: TableData, L: TableData, F> ManyToManyIter<'a, A, L, F> {
    pub(crate) fn new(table: &'a Table<A>, link: &'a Table<L>, condition: F) -> Self {
        Self {
            inner: JoinIter::new(table, link, condition),
        }
    }
}

impl<A, L, F> Iterator for ManyToManyIter<'_, A, L, F>
where
    A: TableData,
    L: TableData,
    F: FnMut(&Row<A>, &Row<L>) -> bool,
{
    type Item = Result<Row<A>>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|pair| pair.map(|(row, _)| row))
    }
}
