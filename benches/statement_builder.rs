use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use store_middleware::prelude::*;

fn wide_schema(columns: usize) -> SchemaDefinition {
    (0..columns).fold(SchemaDefinition::new(), |schema, i| {
        schema.column(format!("col_{i}"), if i % 2 == 0 { "int" } else { "text" })
    })
}

fn wide_row(columns: usize) -> RowData {
    (0..columns).fold(RowData::new(), |row, i| {
        if i % 2 == 0 {
            row.value(format!("col_{i}"), i64::try_from(i).unwrap_or_default())
        } else {
            row.value(format!("col_{i}"), format!("value-{i}"))
        }
    })
}

fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_insert");
    for columns in [4, 32, 256] {
        let row = wide_row(columns);
        group.bench_with_input(BenchmarkId::new("cql", columns), &row, |b, row| {
            b.iter(|| CqlDialect.build_insert(Some("ks"), "t", black_box(row)));
        });
        group.bench_with_input(BenchmarkId::new("postgres", columns), &row, |b, row| {
            b.iter(|| PostgresDialect.build_insert(Some("app"), "t", black_box(row)));
        });
    }
    group.finish();
}

fn bench_create_table(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_create_table");
    for columns in [4, 32, 256] {
        let schema = wide_schema(columns);
        group.bench_with_input(BenchmarkId::new("cql_all_columns", columns), &schema, |b, schema| {
            b.iter(|| {
                CqlDialect.build_create_table(Some("ks"), "t", black_box(schema), &TableKey::AllColumns)
            });
        });
        group.bench_with_input(BenchmarkId::new("postgres_no_key", columns), &schema, |b, schema| {
            b.iter(|| {
                PostgresDialect.build_create_table(Some("app"), "t", black_box(schema), &TableKey::NoKey)
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_insert, bench_create_table);
criterion_main!(benches);
