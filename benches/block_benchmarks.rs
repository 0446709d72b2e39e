//! Criterion benchmarks for the columnar engine's core operations.
//!
//! Run with: `cargo bench`

use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};

use columnar_engine::aggregation::{AggregateDescriptor, AggregateFunctionKind, Aggregator};
use columnar_engine::block::{DataBlock, NamedColumn};
use columnar_engine::column::{Column, DataType, Field, PodArray};

fn make_key_value_block(rows: u64, cardinality: u64) -> DataBlock {
    let mut keys = PodArray::new();
    let mut values = PodArray::new();
    for i in 0..rows {
        keys.push(i % cardinality);
        values.push(i);
    }
    DataBlock::from_columns(vec![
        NamedColumn { name: "k".into(), data_type: DataType::UInt64, column: Column::UInt64(keys) },
        NamedColumn { name: "v".into(), data_type: DataType::UInt64, column: Column::UInt64(values) },
    ])
    .unwrap()
}

fn bench_column_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("column_insert");
    for count in [100, 1_000, 10_000] {
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &n| {
            b.iter(|| {
                let mut column = Column::UInt64(PodArray::new());
                for i in 0..n {
                    column.insert_field(Field::UInt64(i)).unwrap();
                }
                black_box(column.size())
            });
        });
    }
    group.finish();
}

fn bench_column_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("column_filter");
    for count in [1_000, 10_000, 100_000] {
        let mut column = Column::UInt64(PodArray::new());
        for i in 0..count {
            column.insert_field(Field::UInt64(i)).unwrap();
        }
        let mask: Vec<u8> = (0..count).map(|i| (i % 2) as u8).collect();

        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, _| {
            b.iter(|| black_box(column.filter(&mask).unwrap().size()));
        });
    }
    group.finish();
}

fn bench_column_permutation(c: &mut Criterion) {
    let mut group = c.benchmark_group("column_get_permutation");
    for count in [1_000, 10_000, 50_000] {
        let mut column = Column::UInt64(PodArray::new());
        for i in 0..count {
            column.insert_field(Field::UInt64(count - i)).unwrap();
        }

        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, _| {
            b.iter(|| black_box(column.get_permutation(false, None, false).unwrap().len()));
        });
    }
    group.finish();
}

fn bench_aggregation_groups(c: &mut Criterion) {
    let mut group = c.benchmark_group("aggregation_group_by");
    for (rows, cardinality) in [(10_000u64, 10u64), (10_000, 1_000), (100_000, 1_000)] {
        let block = make_key_value_block(rows, cardinality);
        group.bench_with_input(BenchmarkId::new("rows_cardinality", format!("{rows}_{cardinality}")), &(), |b, _| {
            b.iter(|| {
                let mut aggregator = Aggregator::new(
                    vec!["k".to_string()],
                    vec![AggregateDescriptor { kind: AggregateFunctionKind::Sum, argument: "v".to_string(), result_name: "sum_v".to_string() }],
                );
                aggregator.consume(&block).unwrap();
                black_box(aggregator.len())
            });
        });
    }
    group.finish();
}

fn bench_aggregation_finalize(c: &mut Criterion) {
    let mut group = c.benchmark_group("aggregation_finalize");
    for cardinality in [100u64, 10_000] {
        let block = make_key_value_block(200_000, cardinality);
        group.bench_with_input(BenchmarkId::from_parameter(cardinality), &(), |b, _| {
            b.iter_batched(
                || {
                    let mut aggregator = Aggregator::new(
                        vec!["k".to_string()],
                        vec![AggregateDescriptor { kind: AggregateFunctionKind::Count, argument: "v".to_string(), result_name: "n".to_string() }],
                    );
                    aggregator.consume(&block).unwrap();
                    aggregator
                },
                |aggregator| black_box(aggregator.finalize().unwrap().rows()),
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

criterion_group!(
    column_benches,
    bench_column_insert,
    bench_column_filter,
    bench_column_permutation,
);

criterion_group!(
    aggregation_benches,
    bench_aggregation_groups,
    bench_aggregation_finalize,
);

criterion_main!(column_benches, aggregation_benches);
