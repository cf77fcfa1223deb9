//! Benchmarks for table mutations, changeset rollback and enumeration.

use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use tessera_core::CascadeOperation;
use tessera_storage::Table;

#[derive(Clone, Debug, PartialEq)]
struct Quote {
    symbol: String,
    price: f64,
    sector: &'static str,
}

fn create_table() -> Table<Quote> {
    let table: Table<Quote> = Table::builder("quotes").capacity(1024).build();
    table
        .add_unique_index("symbol", |q: &Quote| q.symbol.clone())
        .unwrap();
    table
}

fn populate_table(table: &Table<Quote>, count: usize) {
    let sectors = ["Tech", "Finance", "Health", "Energy", "Consumer"];
    for i in 0..count {
        table
            .add(Quote {
                symbol: format!("SYM{}", i),
                price: 100.0 + (i as f64) * 0.1,
                sector: sectors[i % sectors.len()],
            })
            .unwrap();
    }
}

/// Benchmark: add with a unique index
fn table_add_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("table_add");
    for count in [1000usize, 10000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, &count| {
            b.iter_batched(
                create_table,
                |table| {
                    populate_table(&table, count);
                    black_box(table.len())
                },
                BatchSize::LargeInput,
            );
        });
    }
    group.finish();
}

/// Benchmark: remove from the front (worst case for compaction) vs the back
fn table_remove_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("table_remove");
    let total = 10000usize;
    for (label, front) in [("front", true), ("back", false)] {
        group.bench_function(label, |b| {
            b.iter_batched(
                || {
                    let table = create_table();
                    populate_table(&table, total);
                    table
                },
                |table| {
                    for i in 0..100 {
                        let id = if front { i + 1 } else { total - i };
                        table.remove(id as i32, CascadeOperation::None).unwrap();
                    }
                    black_box(table.len())
                },
                BatchSize::LargeInput,
            );
        });
    }
    group.finish();
}

/// Benchmark: rollback of a changeset holding mixed operations
fn change_set_rollback_benchmark(c: &mut Criterion) {
    c.bench_function("change_set_rollback", |b| {
        b.iter_batched(
            || {
                let table = create_table();
                populate_table(&table, 5000);
                table
            },
            |table| {
                table.begin_change_set().unwrap();
                for id in 1..=500 {
                    let mut row = table.get(id).unwrap();
                    row.data.price += 1.0;
                    table.update(&mut row).unwrap();
                }
                table
                    .remove_where(|row| row.data.sector == "Tech", CascadeOperation::None)
                    .unwrap();
                table.rollback_change_set().unwrap();
                black_box(table.len())
            },
            BatchSize::LargeInput,
        );
    });
}

/// Benchmark: lazy query vs snapshot filter
fn table_query_benchmark(c: &mut Criterion) {
    let table = create_table();
    populate_table(&table, 10000);
    let mut group = c.benchmark_group("table_query");
    group.bench_function("query", |b| {
        b.iter(|| {
            table
                .query(|row| row.data.price > 500.0)
                .filter_map(Result::ok)
                .count()
        })
    });
    group.bench_function("to_vec_filter", |b| {
        b.iter(|| {
            table
                .to_vec()
                .into_iter()
                .filter(|row| row.data.price > 500.0)
                .count()
        })
    });
    group.finish();
}

criterion_group!(
    benches,
    table_add_benchmark,
    table_remove_benchmark,
    change_set_rollback_benchmark,
    table_query_benchmark
);
criterion_main!(benches);
