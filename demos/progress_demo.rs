//! 进度与中断演示
//!
//! 手动组装读取流水线，挂上进度接收端并展示中断句柄的用法。
//!
//! 运行：`cargo run --example progress_demo`

use parcsv::prelude::*;

/// 打印到终端的进度接收端
struct StderrProgress;

impl ProgressSink for StderrProgress {
    fn progress(&self, fraction: f64, status: ProgressStatus) {
        eprintln!("进度: {:>5.1}%  状态: {:?}", fraction * 100.0, status);
    }
}

fn main() -> parcsv::Result<()> {
    #[cfg(feature = "logging")]
    parcsv::logging::init_default_logging().ok();

    let mut input = String::new();
    for i in 0..2_000_000 {
        input.push_str(&format!("{i},payload_{}\n", i % 100));
    }
    let schema = vec![ColumnType::Int64, ColumnType::Str];

    let factory = CsvContextFactory::new(
        input.into_bytes(),
        CsvDialect::default(),
        schema.clone(),
        false,
    );
    let store = MemoryColumns::new(&schema);
    let options = ReadOptions {
        nthreads: 0,
        max_nrows: u64::MAX,
        report_progress: true,
    };
    let mut reader = ChunkedReader::new(factory, store, options, 14.0)
        .with_progress(Box::new(StderrProgress));

    // 中断句柄可以交给其他线程；这里只演示获取方式
    let _handle = reader.interrupt_handle();

    let summary = reader.read_all()?;
    println!("读取 {} 行，耗时 {:?}", summary.nrows, summary.elapsed);

    Ok(())
}
