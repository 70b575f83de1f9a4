//! Benchmarks for filter compilation and in-memory evaluation.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use vitrine_core::Row;
use vitrine_filter::{query, Filter, OrderDirection};

fn build_compound_filter() -> Filter {
    query()
        .where_()
        .column("id")
        .is_in([44i64, 100, 101, 99, 0])
        .and()
        .open_scope()
        .column("id")
        .gte(100i64)
        .or()
        .column("id")
        .eq(99i64)
        .close_scope()
        .and()
        .column("type")
        .eq(0i64)
        .end_where()
        .order_by("type", OrderDirection::Desc)
        .limit(10)
        .build()
        .unwrap()
}

fn filter_build_benchmark(c: &mut Criterion) {
    c.bench_function("filter_build_compound", |b| {
        b.iter(|| black_box(build_compound_filter()))
    });
}

fn filter_eval_benchmark(c: &mut Criterion) {
    let filter = build_compound_filter();
    let rows: Vec<Row> = (0..1000)
        .map(|i| Row::new(i).with("id", i).with("type", i % 3))
        .collect();

    c.bench_function("filter_eval_1000_rows", |b| {
        b.iter(|| {
            let mut matched = 0usize;
            for row in &rows {
                if filter.would_affect_row(black_box(row), true) {
                    matched += 1;
                }
            }
            black_box(matched)
        })
    });

    let like = query()
        .where_()
        .column("name")
        .like("%Eric_Fulton%")
        .end_where()
        .build()
        .unwrap();
    let row = Row::new(1).with("name", "asdfasdfaEric&Fultona2342");

    c.bench_function("filter_eval_like", |b| {
        b.iter(|| black_box(like.would_affect_row(black_box(&row), false)))
    });
}

criterion_group!(benches, filter_build_benchmark, filter_eval_benchmark);
criterion_main!(benches);
