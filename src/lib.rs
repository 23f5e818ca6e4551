//! # 并行分块 CSV 读取库
//!
//! 这是一个把内存中的分隔文本并行载入列式表格的 Rust 库。
//!
//! ## 功能特性
//!
//! - 推测式分块：在未知记录边界处起读，由解析器就地重同步
//! - 按输入顺序提交：块乱序完成，行序始终与输入一致
//! - 摊还几何扩容：读取过程中按需求外推增长输出列
//! - 行数上限与干净的提前终止（解析失败 / 用户中断 / 行数截断）
//! - 统一的日志系统（通过 logging feature）
//! - 丰富的错误处理
//! - 类型安全的 API
//!
//! ## 快速开始
//!
//! ### 便捷读取
//!
//! ```no_run
//! use parcsv::columns::ColumnType;
//! use parcsv::config::ReadOptions;
//! use parcsv::csv::{read_path, CsvDialect};
//!
//! let schema = [ColumnType::Int64, ColumnType::Str];
//! let (table, summary) = read_path(
//!     "data.csv",
//!     &schema,
//!     CsvDialect::default(),
//!     true,
//!     ReadOptions::default(),
//!     30.0,
//! )
//! .unwrap();
//! println!("读取 {} 行，{} 块", summary.nrows, summary.chunks);
//! println!("首列: {:?}", table.column(0));
//! ```
//!
//! ### 手动组装流水线
//!
//! ```no_run
//! use parcsv::prelude::*;
//!
//! let input = b"a,b\n1,x\n2,y\n".to_vec();
//! let schema = vec![ColumnType::Int64, ColumnType::Str];
//! let factory = CsvContextFactory::new(
//!     input,
//!     CsvDialect::default(),
//!     schema.clone(),
//!     true,
//! );
//! let store = MemoryColumns::new(&schema);
//! let mut reader =
//!     ChunkedReader::new(factory, store, ReadOptions::default(), 4.0);
//!
//! // 可以在读取过程中从其他线程请求中断
//! let handle = reader.interrupt_handle();
//! let _ = handle;
//!
//! let summary = reader.read_all().unwrap();
//! assert_eq!(summary.nrows, 2);
//! ```
//!
//! ## Feature 说明
//!
//! - `logging` (默认启用) - 启用日志系统功能（tracing）
//!
//! ## 模块结构
//!
//! - [`error`] - 错误类型定义
//! - [`config`] - TOML 配置加载与运行时选项
//! - [`columns`] - 列式输出存储与线程本地行缓冲
//! - [`reader`] - 并行分块读取核心
//!   - [`chunks`](reader::chunks) - 分块规划
//!   - [`context`](reader::context) - 解析上下文契约
//!   - [`driver`](reader::driver) - 按序提交驱动
//!   - [`latch`](reader::latch) - 异常闩
//!   - [`progress`](reader::progress) - 进度回报
//! - [`csv`] - CSV 方言与具体解析器
//!

pub mod columns;
pub mod config;
pub mod csv;
pub mod error;
#[cfg(feature = "logging")]
pub mod logging;
pub mod reader;

// 重新导出常用类型和函数
pub use error::{ReadError, Result};
pub use reader::driver::{ChunkedReader, ReadSummary};

/// 库版本信息
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// 库名称
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// 库描述
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// 预导入模块
///
/// 包含了最常用的类型和函数，方便用户快速开始使用。
///
/// ```no_run
/// use parcsv::prelude::*;
///
/// // 现在你可以直接使用所有常用的类型和函数
/// ```
pub mod prelude {
    pub use crate::columns::{
        ColumnData, ColumnStore, ColumnType, MemoryColumns, RowBatch,
    };
    pub use crate::config::{Config, ReadOptions, RuntimeConfig};
    pub use crate::csv::{
        read_bytes, read_path, CsvContextFactory, CsvDialect,
        CsvThreadContext,
    };
    pub use crate::error::{ReadError, Result};
    pub use crate::reader::{
        ChunkCoordinates, ChunkPlan, ChunkedReader, ContextFactory,
        InterruptHandle, NullProgress, ParseContext, ProgressSink,
        ProgressStatus, ReadSummary,
    };
}
