//! 并行读取演示
//!
//! 生成一段内存 CSV 数据，用多线程读进列存储，打印统计摘要。
//!
//! 运行：`cargo run --example parallel_read_demo`

use parcsv::prelude::*;

fn main() -> parcsv::Result<()> {
    #[cfg(feature = "logging")]
    parcsv::logging::init_default_logging().ok();

    // 生成 50 万行测试数据
    let mut input = String::new();
    for i in 0..500_000 {
        input.push_str(&format!("{i},name_{},{}.25\n", i % 1000, i % 37));
    }
    let schema =
        vec![ColumnType::Int64, ColumnType::Str, ColumnType::Float64];

    let (store, summary) = read_bytes(
        input.into_bytes(),
        &schema,
        CsvDialect::default(),
        false,
        ReadOptions::default(),
        20.0,
    )?;

    println!("读取完成:");
    println!("  行数       : {}", summary.nrows);
    println!("  块数       : {}", summary.chunks);
    println!("  重分配次数 : {}", summary.reallocs);
    println!("  重解析次数 : {}", summary.reparses);
    println!("  耗时       : {:?}", summary.elapsed);
    println!("  列数       : {}", store.ncols());

    Ok(())
}
