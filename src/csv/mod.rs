//! CSV 具体解析器
//!
//! 提供方言定义、记录扫描、每线程解析上下文，以及把整个流水线串起来的
//! 便捷读取函数。

pub mod context;
pub mod dialect;

pub use context::{CsvContextFactory, CsvThreadContext};
pub use dialect::CsvDialect;

use crate::columns::{ColumnType, MemoryColumns};
use crate::config::ReadOptions;
use crate::error::Result;
use crate::reader::driver::{ChunkedReader, ReadSummary};
use std::path::Path;

/// 把内存中的 CSV 字节缓冲并行读取成列存储
///
/// # Errors
///
/// 解析失败、边界对账失败或被中断时返回错误。
pub fn read_bytes(
    input: Vec<u8>,
    schema: &[ColumnType],
    dialect: CsvDialect,
    has_header: bool,
    options: ReadOptions,
    mean_line_len: f64,
) -> Result<(MemoryColumns, ReadSummary)> {
    let factory =
        CsvContextFactory::new(input, dialect, schema.to_vec(), has_header);
    let store = MemoryColumns::new(schema);
    let mut reader = ChunkedReader::new(factory, store, options, mean_line_len);
    let summary = reader.read_all()?;
    Ok((reader.into_store(), summary))
}

/// 把整个 CSV 文件并行读取成列存储
///
/// # Errors
///
/// 文件无法读取、解析失败或被中断时返回错误。
pub fn read_path<P: AsRef<Path>>(
    path: P,
    schema: &[ColumnType],
    dialect: CsvDialect,
    has_header: bool,
    options: ReadOptions,
    mean_line_len: f64,
) -> Result<(MemoryColumns, ReadSummary)> {
    let factory = CsvContextFactory::from_path(
        path,
        dialect,
        schema.to_vec(),
        has_header,
    )?;
    let store = MemoryColumns::new(schema);
    let mut reader = ChunkedReader::new(factory, store, options, mean_line_len);
    let summary = reader.read_all()?;
    Ok((reader.into_store(), summary))
}
