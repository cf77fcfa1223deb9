//! Integration tests for nested changesets, fault handling and the
//! multi-table `ChangeSet` guard.

use tessera_core::{CascadeOperation, Error, Row};
use tessera_storage::{ChangeSet, Table};

#[derive(Clone, Debug, PartialEq)]
struct Employee {
    name: String,
    salary: f32,
}

fn employee(name: &str, salary: f32) -> Employee {
    Employee {
        name: name.to_owned(),
        salary,
    }
}

fn employees() -> Table<Employee> {
    let table = Table::new("employees");
    table
        .add_unique_index("name", |e: &Employee| e.name.clone())
        .unwrap();
    table
}

fn snapshot(table: &Table<Employee>) -> Vec<(i32, i32, String, u32)> {
    let mut rows: Vec<_> = table
        .to_vec()
        .into_iter()
        .map(|r| (r.id(), r.version(), r.data.name.clone(), r.data.salary.to_bits()))
        .collect();
    rows.sort_by_key(|r| r.0);
    rows
}

#[test]
fn test_rollback_restores_data_and_reuses_ids() {
    let table = employees();
    assert_eq!(table.add(employee("A", 1000.0)).unwrap().id(), 1);
    assert_eq!(table.add(employee("B", 2000.0)).unwrap().id(), 2);

    table.begin_change_set().unwrap();
    let mut a = table.get(1).unwrap();
    a.data.salary = 1500.0;
    table.update(&mut a).unwrap();
    assert_eq!(table.add(employee("C", 3000.0)).unwrap().id(), 3);
    table.rollback_change_set().unwrap();

    assert_eq!(table.get(1).unwrap().data.salary, 1000.0);
    assert_eq!(table.get(1).unwrap().version(), 0);
    assert!(table.try_get(3).is_none());
    assert!(table.try_get_by_unique_index("name", &"C".to_owned()).unwrap().is_none());
    assert_eq!(table.add(employee("C", 3000.0)).unwrap().id(), 3);
}

#[test]
fn test_rollback_restores_removed_rows_and_indexes() {
    let table = employees();
    for name in ["A", "B", "C"] {
        table.add(employee(name, 1.0)).unwrap();
    }
    let before = snapshot(&table);

    table.begin_change_set().unwrap();
    table.remove(2, CascadeOperation::None).unwrap();
    let mut c = table.get(3).unwrap();
    c.data.name = "B".to_owned();
    table.update(&mut c).unwrap();
    table.clear(CascadeOperation::None).unwrap();
    assert_eq!(table.last_id(), 0);
    table.rollback_change_set().unwrap();

    assert_eq!(snapshot(&table), before);
    assert_eq!(table.last_id(), 3);
    for (id, name) in [(1, "A"), (2, "B"), (3, "C")] {
        assert_eq!(table.get_by_unique_index("name", &name.to_owned()).unwrap().id(), id);
    }
}

#[test]
fn test_inner_commit_is_undone_by_outer_rollback() {
    let table = employees();
    table.add(employee("A", 1.0)).unwrap();
    let before = snapshot(&table);

    table.begin_change_set().unwrap();
    table.add(employee("B", 1.0)).unwrap();
    table.begin_change_set().unwrap();
    table.add(employee("C", 1.0)).unwrap();
    table.begin_change_set().unwrap();
    table.remove(1, CascadeOperation::None).unwrap();
    table.commit_change_set().unwrap();
    table.commit_change_set().unwrap();
    assert_eq!(table.change_set_depth(), 1);
    assert_eq!(table.len(), 2);
    table.rollback_change_set().unwrap();

    assert_eq!(snapshot(&table), before);
    assert_eq!(table.change_set_depth(), 0);
    assert_eq!(table.add(employee("B", 1.0)).unwrap().id(), 2);
}

#[test]
fn test_inner_rollback_keeps_outer_work() {
    let table = employees();
    table.begin_change_set().unwrap();
    table.add(employee("A", 1.0)).unwrap();
    table.begin_change_set().unwrap();
    table.add(employee("B", 1.0)).unwrap();
    table.rollback_change_set().unwrap();
    assert_eq!(table.ids(), vec![1]);
    table.commit_change_set().unwrap();

    assert_eq!(table.ids(), vec![1]);
    assert_eq!(table.add(employee("C", 1.0)).unwrap().id(), 2);
}

#[test]
fn test_commit_without_begin_fails() {
    let table = employees();
    assert!(matches!(table.commit_change_set(), Err(Error::NoActiveChangeSet { .. })));
    assert!(matches!(table.rollback_change_set(), Err(Error::NoActiveChangeSet { .. })));
}

#[test]
fn test_fault_blocks_further_work_until_rollback() {
    let table = employees();
    table.add(employee("A", 1.0)).unwrap();

    table.begin_change_set().unwrap();
    table.add(employee("B", 1.0)).unwrap();
    assert!(table.add(employee("A", 2.0)).is_err());
    assert!(table.has_fault());
    assert!(table.fault().unwrap().contains("name"));

    assert!(matches!(table.add(employee("C", 1.0)), Err(Error::TransactionFaulted { .. })));
    assert!(matches!(
        table.remove(1, CascadeOperation::None),
        Err(Error::TransactionFaulted { .. })
    ));
    assert!(matches!(table.begin_change_set(), Err(Error::TransactionFaulted { .. })));
    assert!(matches!(table.commit_change_set(), Err(Error::TransactionFaulted { .. })));
    assert!(table.get(1).is_ok());

    table.rollback_change_set().unwrap();
    assert!(!table.has_fault());
    assert_eq!(table.ids(), vec![1]);
    assert_eq!(table.add(employee("C", 1.0)).unwrap().id(), 2);
}

#[test]
fn test_failures_outside_change_set_leave_no_fault() {
    let table = employees();
    table.add(employee("A", 1.0)).unwrap();
    assert!(table.add(employee("A", 1.0)).is_err());
    assert!(!table.has_fault());
    table.add(employee("B", 1.0)).unwrap();
}

#[test]
fn test_guard_commit_and_drop() {
    let table = employees();
    {
        let cs = table.change_set().unwrap();
        table.add(employee("A", 1.0)).unwrap();
        cs.commit().unwrap();
    }
    {
        let _cs = table.change_set().unwrap();
        table.add(employee("B", 1.0)).unwrap();
    }
    assert_eq!(table.ids(), vec![1]);
    assert_eq!(table.change_set_depth(), 0);
}

#[test]
fn test_multi_table_guard() {
    let people = employees();
    let scores: Table<i32> = Table::new("scores");
    people.add(employee("A", 1.0)).unwrap();

    let cs = ChangeSet::begin(&[&people, &scores]).unwrap();
    people.add(employee("B", 1.0)).unwrap();
    scores.add(10).unwrap();
    drop(cs);
    assert_eq!(people.len(), 1);
    assert!(scores.is_empty());

    let cs = ChangeSet::begin(&[&people, &scores]).unwrap();
    people.add(employee("B", 1.0)).unwrap();
    scores.add(10).unwrap();
    assert!(!cs.has_fault());
    cs.commit().unwrap();
    assert_eq!(people.len(), 2);
    assert_eq!(scores.len(), 1);
}

#[test]
fn test_begin_failure_releases_earlier_tables() {
    let healthy: Table<i32> = Table::new("healthy");
    let broken: Table<i32> = Table::new("broken");
    broken.begin_change_set().unwrap();
    assert!(broken.update(&mut Row::with_id(9, 0)).is_err());

    assert!(ChangeSet::begin(&[&healthy, &broken]).is_err());
    assert_eq!(healthy.change_set_depth(), 0);
    broken.rollback_change_set().unwrap();
}

#[test]
fn test_rollback_is_seen_by_listeners() {
    use std::sync::{Arc, Mutex};
    use tessera_core::TableOperation;

    let table: Table<i32> = Table::new("numbers");
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    table.on_row_modified(move |_, op| sink.lock().unwrap().push(op));

    table.begin_change_set().unwrap();
    table.add(1).unwrap();
    table.rollback_change_set().unwrap();
    assert_eq!(
        *events.lock().unwrap(),
        vec![TableOperation::Add, TableOperation::Remove]
    );
}
