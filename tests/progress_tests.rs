//! 进度回报的集成测试
//!
//! 小而快的读取不应闪现进度：启动延迟内完成时一次都不回报。

use parcsv::prelude::*;
use std::sync::{Arc, Mutex};

/// 把所有回报收集起来的测试接收端
struct CollectingSink {
    calls: Arc<Mutex<Vec<(f64, ProgressStatus)>>>,
}

impl ProgressSink for CollectingSink {
    fn progress(&self, fraction: f64, status: ProgressStatus) {
        self.calls.lock().unwrap().push((fraction, status));
    }
}

#[test]
fn test_small_input_reports_nothing() {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let sink = CollectingSink { calls: Arc::clone(&calls) };

    let input: Vec<u8> = "a,b\n".repeat(50_000).into_bytes();
    let schema = vec![ColumnType::Str, ColumnType::Str];
    let factory = CsvContextFactory::new(
        input,
        CsvDialect::default(),
        schema.clone(),
        false,
    );
    let store = MemoryColumns::new(&schema);
    let options = ReadOptions {
        nthreads: 2,
        max_nrows: u64::MAX,
        report_progress: true,
    };
    let mut reader = ChunkedReader::new(factory, store, options, 4.0)
        .with_progress(Box::new(sink));

    let summary = reader.read_all().unwrap();
    assert_eq!(summary.nrows, 50_000);
    // 读取远快于 0.75 秒的启动延迟，接收端不应被调用
    assert!(calls.lock().unwrap().is_empty());
}

#[test]
fn test_progress_disabled_is_fine_with_sink_attached() {
    let input = b"1,a\n2,b\n".to_vec();
    let schema = vec![ColumnType::Int64, ColumnType::Str];
    let factory = CsvContextFactory::new(
        input,
        CsvDialect::default(),
        schema.clone(),
        false,
    );
    let store = MemoryColumns::new(&schema);
    let options = ReadOptions {
        nthreads: 2,
        max_nrows: u64::MAX,
        report_progress: false,
    };
    let mut reader = ChunkedReader::new(factory, store, options, 4.0)
        .with_progress(Box::new(NullProgress));

    let summary = reader.read_all().unwrap();
    assert_eq!(summary.nrows, 2);
}
