#![allow(clippy::uninlined_format_args)]
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use parcsv::columns::ColumnType;
use parcsv::config::ReadOptions;
use parcsv::csv::{CsvDialect, read_bytes};
use std::time::Duration;

/// 生成 n 行测试数据
fn make_input(n: usize) -> Vec<u8> {
    let mut input = String::with_capacity(n * 24);
    for i in 0..n {
        input.push_str(&format!("{},value_{},{}.5\n", i, i % 997, i % 31));
    }
    input.into_bytes()
}

fn schema() -> Vec<ColumnType> {
    vec![ColumnType::Int64, ColumnType::Str, ColumnType::Float64]
}

fn bench_read_varied(c: &mut Criterion) {
    let sizes = [100_000usize, 500_000usize, 1_000_000usize];

    // A 组：单线程读取
    let mut g_single = c.benchmark_group("read_single_thread");
    g_single.sample_size(10);
    g_single.measurement_time(Duration::from_secs(10));
    for &n in &sizes {
        let input = make_input(n);
        g_single.bench_with_input(
            BenchmarkId::from_parameter(n),
            &input,
            |b, input| {
                b.iter(|| {
                    let (store, summary) = read_bytes(
                        input.clone(),
                        &schema(),
                        CsvDialect::default(),
                        false,
                        ReadOptions {
                            nthreads: 1,
                            max_nrows: u64::MAX,
                            report_progress: false,
                        },
                        20.0,
                    )
                    .unwrap();
                    assert_eq!(summary.nrows as usize, n);
                    store
                })
            },
        );
    }
    g_single.finish();

    // B 组：多线程读取
    let mut g_multi = c.benchmark_group("read_multi_thread");
    g_multi.sample_size(10);
    g_multi.measurement_time(Duration::from_secs(10));
    for &n in &sizes {
        let input = make_input(n);
        g_multi.bench_with_input(
            BenchmarkId::from_parameter(n),
            &input,
            |b, input| {
                b.iter(|| {
                    let (store, summary) = read_bytes(
                        input.clone(),
                        &schema(),
                        CsvDialect::default(),
                        false,
                        ReadOptions {
                            nthreads: 0,
                            max_nrows: u64::MAX,
                            report_progress: false,
                        },
                        20.0,
                    )
                    .unwrap();
                    assert_eq!(summary.nrows as usize, n);
                    store
                })
            },
        );
    }
    g_multi.finish();
}

criterion_group!(benches, bench_read_varied);
criterion_main!(benches);
