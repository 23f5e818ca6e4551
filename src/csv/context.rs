//! CSV 线程解析上下文
//!
//! [`CsvContextFactory`] 持有共享输入和 schema，为每个工作线程创建
//! [`CsvThreadContext`]。上下文把块内记录解析成列式行缓冲，由驱动在
//! 提交排序后推入列存储。

use crate::columns::{ColumnStore, ColumnType, RowBatch};
use crate::csv::dialect::CsvDialect;
use crate::error::{ReadError, Result};
use crate::reader::chunks::ChunkCoordinates;
use crate::reader::context::{ContextFactory, ParseContext};
use std::path::Path;
use std::sync::Arc;

/// CSV 解析上下文工厂
#[derive(Debug, Clone)]
pub struct CsvContextFactory {
    /// 共享的输入字节缓冲
    input: Arc<Vec<u8>>,
    /// 方言
    dialect: CsvDialect,
    /// 各列类型
    schema: Arc<Vec<ColumnType>>,
    /// 输入首条记录是否为表头（解析时跳过）
    has_header: bool,
}

impl CsvContextFactory {
    /// 从内存缓冲创建工厂
    pub fn new(
        input: Vec<u8>,
        dialect: CsvDialect,
        schema: Vec<ColumnType>,
        has_header: bool,
    ) -> Self {
        Self {
            input: Arc::new(input),
            dialect,
            schema: Arc::new(schema),
            has_header,
        }
    }

    /// 读取整个文件后创建工厂
    ///
    /// # Errors
    ///
    /// 文件无法读取时返回 `Err(ReadError::Io(_))`。
    pub fn from_path<P: AsRef<Path>>(
        path: P,
        dialect: CsvDialect,
        schema: Vec<ColumnType>,
        has_header: bool,
    ) -> Result<Self> {
        let input = std::fs::read(path.as_ref())?;
        #[cfg(feature = "logging")]
        tracing::debug!(
            "载入文件 {}: {} 字节",
            path.as_ref().display(),
            input.len()
        );
        Ok(Self::new(input, dialect, schema, has_header))
    }

    /// 各列类型
    pub fn schema(&self) -> &[ColumnType] {
        &self.schema
    }
}

impl ContextFactory for CsvContextFactory {
    type Context = CsvThreadContext;

    fn input_size(&self) -> usize {
        self.input.len()
    }

    fn init_thread_context(&self, thread_id: usize) -> CsvThreadContext {
        #[cfg(feature = "logging")]
        tracing::trace!("为线程 {} 创建 CSV 解析上下文", thread_id);
        CsvThreadContext {
            input: Arc::clone(&self.input),
            dialect: self.dialect,
            schema: Arc::clone(&self.schema),
            has_header: self.has_header,
            batch: RowBatch::new(&self.schema),
            row0: 0,
            thread_id,
        }
    }
}

/// CSV 每线程解析上下文
///
/// 同一线程跨块复用同一实例；行缓冲的写游标在每次
/// [`read_chunk`](ParseContext::read_chunk) 入口重置。
#[derive(Debug)]
pub struct CsvThreadContext {
    input: Arc<Vec<u8>>,
    dialect: CsvDialect,
    schema: Arc<Vec<ColumnType>>,
    has_header: bool,
    /// 列式行缓冲
    batch: RowBatch,
    /// 本块在全局输出中的起始行号（提交阶段分配）
    row0: u64,
    /// 所属工作线程号
    thread_id: usize,
}

impl ParseContext for CsvThreadContext {
    fn read_chunk(
        &mut self,
        expected: &ChunkCoordinates,
        actual: &mut ChunkCoordinates,
    ) -> Result<()> {
        // 重置写游标：同一上下文可带不同坐标反复调用
        self.batch.clear();

        let input = self.input.as_slice();
        let ncols = self.schema.len();
        let mut pos = expected.start.min(input.len());

        if !expected.true_start {
            // 推测起点：向后同步到下一个语法上成立的记录边界
            pos = self.dialect.resync(input, pos, ncols);
        }
        actual.start = pos;
        actual.true_start = true;

        #[cfg(feature = "logging")]
        tracing::trace!(
            "线程 {} 解析块 [{}, {})，实际起点 {}",
            self.thread_id,
            expected.start,
            expected.end,
            pos
        );

        let mut fields = Vec::with_capacity(ncols);

        // 表头：范围从输入起点开始时消费并丢弃首条记录
        if self.has_header && pos == 0 {
            match self.dialect.scan_record(input, pos, &mut fields)? {
                Some(end) => pos = end,
                None => pos = input.len(),
            }
        }

        // 解析记录，直到第一条结束位置达到或越过期望终点的记录为止
        while pos < input.len() && pos < expected.end {
            let Some(rec_end) =
                self.dialect.scan_record(input, pos, &mut fields)?
            else {
                // 起点之后只剩空行：消费到输入末尾
                pos = input.len();
                break;
            };
            if fields.len() != ncols {
                return Err(ReadError::parse_error(
                    pos,
                    format!("字段数 {} 与列数 {} 不符", fields.len(), ncols),
                ));
            }
            for (col, field) in fields.iter().enumerate() {
                self.batch.push_field(col, field);
            }
            self.batch.finish_row();
            pos = rec_end;
        }

        actual.end = pos;
        actual.true_end = true;
        Ok(())
    }

    fn push_buffers(&mut self, store: &dyn ColumnStore) -> Result<()> {
        if self.batch.nrows() > 0 {
            #[cfg(feature = "logging")]
            tracing::trace!(
                "线程 {} 推出 {} 行到全局行 {}",
                self.thread_id,
                self.batch.nrows(),
                self.row0
            );
            store.write_rows(self.row0, &self.batch)?;
        }
        self.batch.clear();
        Ok(())
    }

    fn used_nrows(&self) -> u64 {
        self.batch.nrows() as u64
    }

    fn truncate_rows(&mut self, nrows: u64) {
        self.batch.truncate(usize::try_from(nrows).unwrap_or(usize::MAX));
    }

    fn clear_rows(&mut self) {
        self.batch.clear();
    }

    fn set_row0(&mut self, row0: u64) {
        self.row0 = row0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(input: &str, ncols: usize, has_header: bool) -> CsvThreadContext {
        let schema = vec![ColumnType::Str; ncols];
        let factory = CsvContextFactory::new(
            input.as_bytes().to_vec(),
            CsvDialect::default(),
            schema,
            has_header,
        );
        factory.init_thread_context(0)
    }

    #[test]
    fn test_read_chunk_true_start() {
        let mut ctx = context("a,b\nc,d\ne,f\n", 2, false);
        let expected = ChunkCoordinates {
            start: 0,
            end: 12,
            true_start: true,
            true_end: true,
        };
        let mut actual = ChunkCoordinates::default();
        ctx.read_chunk(&expected, &mut actual).unwrap();
        assert_eq!(ctx.used_nrows(), 3);
        assert_eq!(actual.start, 0);
        assert_eq!(actual.end, 12);
    }

    #[test]
    fn test_read_chunk_guessed_start_resyncs() {
        let mut ctx = context("aa,bb\ncc,dd\nee,ff\n", 2, false);
        // 猜测起点落在第一条记录中间：应同步到第二条记录（偏移 6）
        let expected = ChunkCoordinates::new(2, 18);
        let mut actual = ChunkCoordinates::default();
        ctx.read_chunk(&expected, &mut actual).unwrap();
        assert_eq!(actual.start, 6);
        assert_eq!(ctx.used_nrows(), 2);
    }

    #[test]
    fn test_read_chunk_stops_after_record_crossing_end() {
        let mut ctx = context("a,b\nc,d\ne,f\n", 2, false);
        // 期望终点 5 落在第二条记录中间：该记录也要解析完
        let expected = ChunkCoordinates {
            start: 0,
            end: 5,
            true_start: true,
            true_end: false,
        };
        let mut actual = ChunkCoordinates::default();
        ctx.read_chunk(&expected, &mut actual).unwrap();
        assert_eq!(ctx.used_nrows(), 2);
        assert_eq!(actual.end, 8);
    }

    #[test]
    fn test_read_chunk_skips_header_at_input_start() {
        let mut ctx = context("a,b\n1,2\n3,4\n", 2, true);
        let expected = ChunkCoordinates {
            start: 0,
            end: 12,
            true_start: true,
            true_end: true,
        };
        let mut actual = ChunkCoordinates::default();
        ctx.read_chunk(&expected, &mut actual).unwrap();
        // 表头不计入数据行
        assert_eq!(ctx.used_nrows(), 2);
        assert_eq!(actual.end, 12);
    }

    #[test]
    fn test_read_chunk_rerun_resets_cursor() {
        let mut ctx = context("a,b\nc,d\n", 2, false);
        let expected = ChunkCoordinates {
            start: 0,
            end: 8,
            true_start: true,
            true_end: true,
        };
        let mut actual = ChunkCoordinates::default();
        ctx.read_chunk(&expected, &mut actual).unwrap();
        ctx.read_chunk(&expected, &mut actual).unwrap();
        // 重复调用不累积行
        assert_eq!(ctx.used_nrows(), 2);
    }

    #[test]
    fn test_read_chunk_wrong_field_count_is_parse_error() {
        let mut ctx = context("a,b\noops\nc,d\n", 2, false);
        let expected = ChunkCoordinates {
            start: 0,
            end: 13,
            true_start: true,
            true_end: true,
        };
        let mut actual = ChunkCoordinates::default();
        let err = ctx.read_chunk(&expected, &mut actual).unwrap_err();
        assert!(err.is_parse_error());
    }

    #[test]
    fn test_empty_input() {
        let mut ctx = context("", 2, true);
        let expected = ChunkCoordinates {
            start: 0,
            end: 0,
            true_start: true,
            true_end: true,
        };
        let mut actual = ChunkCoordinates::default();
        ctx.read_chunk(&expected, &mut actual).unwrap();
        assert_eq!(ctx.used_nrows(), 0);
        assert_eq!(actual.end, 0);
    }
}
