//! Criterion benchmarks for rust_record_mapper

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rust_record_mapper::core::{
    classify, normalize, AttributeSet, ColumnDefinition, InsertBuilder, Record, SelectBuilder,
    StructuredCondition, UpdateBuilder,
};
use rust_record_mapper::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;

// ============================================================================
// Type Classification Benchmarks
// ============================================================================

fn bench_classify(c: &mut Criterion) {
    let mut group = c.benchmark_group("classify");
    group.throughput(Throughput::Elements(1));

    for raw in [
        "int(11)",
        "int(10) unsigned zerofill",
        "varchar(255)",
        "double(8,2)",
        "longtext",
        "datetime",
    ] {
        group.bench_with_input(BenchmarkId::from_parameter(raw), raw, |b, raw| {
            b.iter(|| black_box(classify(black_box(raw))));
        });
    }

    group.finish();
}

// ============================================================================
// Condition Normalization Benchmarks
// ============================================================================

fn bench_normalize(c: &mut Criterion) {
    let mut group = c.benchmark_group("normalize");

    group.bench_function("filter", |b| {
        b.iter(|| black_box(normalize(black_box("age > 18"))));
    });

    group.bench_function("structured", |b| {
        b.iter(|| {
            let condition = StructuredCondition::new()
                .select("id, name")
                .condition("age > :min")
                .order("name ASC")
                .limit(10);
            black_box(normalize(condition))
        });
    });

    group.finish();
}

// ============================================================================
// Statement Building Benchmarks
// ============================================================================

fn bench_statements(c: &mut Criterion) {
    let mut group = c.benchmark_group("statements");
    let condition = normalize(
        StructuredCondition::new()
            .condition("age > 18")
            .order("name ASC")
            .limit(10),
    );

    group.bench_function("select", |b| {
        b.iter(|| black_box(SelectBuilder::from_condition("users", &condition).build()));
    });

    for width in [2usize, 8, 32] {
        let columns: Vec<String> = (0..width).map(|i| format!("col{}", i)).collect();

        group.bench_with_input(BenchmarkId::new("insert", width), &columns, |b, columns| {
            b.iter(|| {
                let builder = columns
                    .iter()
                    .fold(InsertBuilder::new("wide"), |builder, col| {
                        builder.value(col, 1i64)
                    });
                black_box((builder.build(), builder.params()))
            });
        });

        group.bench_with_input(BenchmarkId::new("update", width), &columns, |b, columns| {
            b.iter(|| {
                let builder = columns
                    .iter()
                    .fold(UpdateBuilder::new("wide", "id", 7i64), |builder, col| {
                        builder.set(col, "x")
                    });
                black_box((builder.build(), builder.params()))
            });
        });
    }

    group.finish();
}

// ============================================================================
// Record Hydration Benchmarks
// ============================================================================

fn bench_hydrate(c: &mut Criterion) {
    let mut group = c.benchmark_group("hydrate");

    let columns = vec![
        ColumnDefinition::new("id", "int(11)")
            .not_null()
            .primary()
            .extra("auto_increment"),
        ColumnDefinition::new("name", "varchar(64)"),
        ColumnDefinition::new("age", "int(11)").not_null(),
        ColumnDefinition::new("score", "double").default_value("1.5"),
    ];
    let attributes = Arc::new(AttributeSet::build("users", &columns).expect("valid columns"));

    let mut row = HashMap::new();
    row.insert("id".to_string(), DatabaseValue::Long(1));
    row.insert("name".to_string(), DatabaseValue::from("Ann"));
    row.insert("age".to_string(), DatabaseValue::from("33"));

    group.bench_function("row", |b| {
        b.iter(|| {
            black_box(Record::hydrate(
                Arc::clone(&attributes),
                "id",
                black_box(row.clone()),
            ))
        });
    });

    group.bench_function("attribute_set", |b| {
        b.iter(|| black_box(AttributeSet::build("users", black_box(&columns))));
    });

    group.finish();
}

// ============================================================================
// Criterion Configuration
// ============================================================================

criterion_group!(
    benches,
    bench_classify,
    bench_normalize,
    bench_statements,
    bench_hydrate
);

criterion_main!(benches);
