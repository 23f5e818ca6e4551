//! 线程解析上下文契约
//!
//! 驱动只依赖这里的两个 trait：每个工作线程持有一个 [`ParseContext`]，
//! 负责把一个块解析进自己的本地缓冲；[`ContextFactory`] 在线程启动时
//! 为其创建全新实例。具体的字节级解析器（如 CSV）在 `csv` 模块中实现。

use crate::columns::ColumnStore;
use crate::error::Result;
use crate::reader::chunks::ChunkCoordinates;

/// 每线程解析上下文
///
/// 同一实例会被同一线程跨块复用，`read_chunk` 必须在入口处重置内部
/// 写游标（即对外部状态幂等，除自身缓冲外）。
pub trait ParseContext: Send {
    /// 按 `expected` 坐标解析一个块，真实边界写入 `actual`
    ///
    /// - `expected.true_start` 为真时从 `expected.start` 直接开始；否则从
    ///   `expected.start` 向后扫描到下一个语法上成立的记录边界，并把该偏移
    ///   写入 `actual.start`。
    /// - 在第一条结束位置达到或越过 `expected.end` 的完整记录之后停止
    ///   （不晚于输入末尾），记录终点写入 `actual.end`。
    ///
    /// # Errors
    ///
    /// 块内容无法恢复地损坏时返回 `ReadError::Parse`。
    fn read_chunk(
        &mut self,
        expected: &ChunkCoordinates,
        actual: &mut ChunkCoordinates,
    ) -> Result<()>;

    /// 把本地缓冲的 `used_nrows` 行写入列存储的 `[row0, row0+used_nrows)`
    ///
    /// 零行时也必须可调用。调用方保证此时持有重分配锁的共享端。
    ///
    /// # Errors
    ///
    /// 缓冲与存储不一致或底层写入失败时返回错误。
    fn push_buffers(&mut self, store: &dyn ColumnStore) -> Result<()>;

    /// 提交顺序确定后的收尾钩子
    ///
    /// 需要提交串行顺序才能确定的每块元数据（比如连续的字符串池偏移）
    /// 在这里登记。默认空实现。
    fn order_buffer(&mut self) {}

    /// 允许解析器用线程本地状态微调候选坐标（默认恒等）
    ///
    /// 实现不得移动真实边界。
    fn adjust_chunk_coordinates(&self, _c: &mut ChunkCoordinates) {}

    /// 本地缓冲中已解析的行数
    fn used_nrows(&self) -> u64;

    /// 行数上限裁剪：丢弃本地缓冲中第 `nrows` 行之后的内容
    fn truncate_rows(&mut self, nrows: u64);

    /// 丢弃全部本地缓冲（错误终止路径，防止乱序提交）
    fn clear_rows(&mut self);

    /// 记录本块在全局输出中的起始行号（提交阶段分配）
    fn set_row0(&mut self, row0: u64);
}

/// 解析上下文工厂
///
/// 驱动在每个工作线程启动时调用一次 `init_thread_context`，必须返回
/// 全新实例。
pub trait ContextFactory: Send + Sync {
    type Context: ParseContext;

    /// 输入字节范围的长度（分块规划用）
    fn input_size(&self) -> usize;

    /// 为第 `thread_id` 个工作线程创建解析上下文
    fn init_thread_context(&self, thread_id: usize) -> Self::Context;
}
