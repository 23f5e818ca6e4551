//! 并行分块读取核心
//!
//! 提供分块规划、解析上下文契约、异常闩、进度回报和按序提交驱动。
//! 具体的字节级解析器在 [`crate::csv`] 中实现。

pub mod chunks;
pub mod context;
pub mod driver;
pub mod latch;
pub mod progress;

// 重新导出核心类型
pub use chunks::{ChunkCoordinates, ChunkPlan};
pub use context::{ContextFactory, ParseContext};
pub use driver::{ChunkedReader, InterruptHandle, ReadSummary};
pub use latch::ExceptionLatch;
pub use progress::{NullProgress, ProgressSink, ProgressStatus};
