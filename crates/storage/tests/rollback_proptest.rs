//! Property tests: rolling back a changeset restores rows, indexes and the
//! key generator whatever happened inside it.

use proptest::prelude::*;
use tessera_core::CascadeOperation;
use tessera_storage::Table;

#[derive(Clone, Debug)]
enum Op {
    Add(i32),
    Update(usize, i32),
    Remove(usize),
    Begin,
    Commit,
    Clear,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (-50i32..50).prop_map(Op::Add),
        3 => (0usize..16, -50i32..50).prop_map(|(at, v)| Op::Update(at, v)),
        2 => (0usize..16).prop_map(Op::Remove),
        1 => Just(Op::Begin),
        1 => Just(Op::Commit),
        1 => Just(Op::Clear),
    ]
}

fn build(initial: &[i32]) -> Table<i32> {
    let table = Table::new("values");
    table.add_unique_index("value", |v: &i32| *v).unwrap();
    for &v in initial {
        let _ = table.add(v);
    }
    table
}

fn snapshot(table: &Table<i32>) -> Vec<(i32, i32, i32)> {
    let mut rows: Vec<_> = table
        .to_vec()
        .iter()
        .map(|r| (r.id(), r.version(), r.data))
        .collect();
    rows.sort_unstable();
    rows
}

fn apply(table: &Table<i32>, op: &Op, opened: &mut usize) {
    let ids = table.ids();
    match op {
        Op::Add(v) => {
            let _ = table.add(*v);
        }
        Op::Update(at, v) => {
            if let Some(&id) = ids.get(at % ids.len().max(1)) {
                if let Some(mut row) = table.try_get(id) {
                    row.data = *v;
                    let _ = table.update(&mut row);
                }
            }
        }
        Op::Remove(at) => {
            if let Some(&id) = ids.get(at % ids.len().max(1)) {
                let _ = table.remove(id, CascadeOperation::None);
            }
        }
        Op::Begin => {
            if table.begin_change_set().is_ok() {
                *opened += 1;
            }
        }
        Op::Commit => {
            if *opened > 0 && table.commit_change_set().is_ok() {
                *opened -= 1;
            }
        }
        Op::Clear => {
            let _ = table.clear(CascadeOperation::None);
        }
    }
}

proptest! {
    #[test]
    fn prop_rollback_restores_state(
        initial in prop::collection::vec(-50i32..50, 0..12),
        ops in prop::collection::vec(op_strategy(), 0..40),
    ) {
        let table = build(&initial);
        let rows = snapshot(&table);
        let last_id = table.last_id();

        table.begin_change_set().unwrap();
        let mut opened = 0;
        for op in &ops {
            apply(&table, op, &mut opened);
        }
        for _ in 0..opened {
            table.rollback_change_set().unwrap();
        }
        table.rollback_change_set().unwrap();

        prop_assert_eq!(snapshot(&table), rows.clone());
        prop_assert_eq!(table.last_id(), last_id);
        prop_assert_eq!(table.change_set_depth(), 0);
        prop_assert!(!table.has_fault());
        for (id, _, value) in rows {
            prop_assert_eq!(table.get_by_unique_index("value", &value).unwrap().id(), id);
        }
    }

    #[test]
    fn prop_unique_index_matches_rows(
        ops in prop::collection::vec(op_strategy(), 0..60),
    ) {
        let table = build(&[]);
        let mut opened = 0;
        for op in &ops {
            apply(&table, op, &mut opened);
            if table.has_fault() {
                table.rollback_change_set().unwrap();
                opened -= 1;
            }
        }
        let rows = table.to_vec();
        for row in &rows {
            prop_assert_eq!(table.get_by_unique_index("value", &row.data).unwrap().id(), row.id());
        }
        for probe in -50i32..50 {
            let indexed = table.try_get_by_unique_index("value", &probe).unwrap();
            prop_assert_eq!(indexed.is_some(), rows.iter().any(|r| r.data == probe));
        }
    }
}
