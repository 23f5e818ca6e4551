//! 列式输出存储
//!
//! 定义读取器的输出端：列类型、列存储接口（容量调整 + 按行段写入）、
//! 线程本地行缓冲，以及一个内存实现 [`MemoryColumns`]。
//!
//! 并发约定：`set_nrows` 需要独占访问（`&mut self`），`write_rows` 只需共享
//! 访问且各块写入的行区间互不重叠；具体实现据此保证内部一致性。

use crate::error::{ReadError, Result};
use std::io::Write;
use std::sync::Mutex;

/// 列类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    /// 64 位整数
    Int64,
    /// 64 位浮点数
    Float64,
    /// 布尔值
    Bool,
    /// 字符串
    Str,
}

/// 单列数据，带空值标记
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Int64(Vec<Option<i64>>),
    Float64(Vec<Option<f64>>),
    Bool(Vec<Option<bool>>),
    Str(Vec<Option<String>>),
}

impl ColumnData {
    /// 按类型创建空列
    pub fn new(ty: ColumnType) -> Self {
        match ty {
            ColumnType::Int64 => Self::Int64(Vec::new()),
            ColumnType::Float64 => Self::Float64(Vec::new()),
            ColumnType::Bool => Self::Bool(Vec::new()),
            ColumnType::Str => Self::Str(Vec::new()),
        }
    }

    /// 当前行数
    pub fn len(&self) -> usize {
        match self {
            Self::Int64(v) => v.len(),
            Self::Float64(v) => v.len(),
            Self::Bool(v) => v.len(),
            Self::Str(v) => v.len(),
        }
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 调整列长度，新行填空值
    pub fn resize(&mut self, nrows: usize) {
        match self {
            Self::Int64(v) => v.resize(nrows, None),
            Self::Float64(v) => v.resize(nrows, None),
            Self::Bool(v) => v.resize(nrows, None),
            Self::Str(v) => v.resize(nrows, None),
        }
    }

    /// 截断到前 `nrows` 行
    pub fn truncate(&mut self, nrows: usize) {
        match self {
            Self::Int64(v) => v.truncate(nrows),
            Self::Float64(v) => v.truncate(nrows),
            Self::Bool(v) => v.truncate(nrows),
            Self::Str(v) => v.truncate(nrows),
        }
    }

    /// 解析一个原始字段并追加到列尾
    ///
    /// 空字段视为空值；数字/布尔解析失败也记为空值，不中断读取。
    pub fn push_field(&mut self, raw: &str) {
        match self {
            Self::Int64(v) => v.push(if raw.is_empty() {
                None
            } else {
                raw.parse::<i64>().ok()
            }),
            Self::Float64(v) => v.push(if raw.is_empty() {
                None
            } else {
                raw.parse::<f64>().ok()
            }),
            Self::Bool(v) => v.push(match raw {
                "" => None,
                "true" | "TRUE" | "True" | "1" => Some(true),
                "false" | "FALSE" | "False" | "0" => Some(false),
                _ => None,
            }),
            Self::Str(v) => v.push(if raw.is_empty() {
                None
            } else {
                Some(raw.to_string())
            }),
        }
    }

    /// 将 `src` 的前 `nrows` 行复制到本列的 `[row0, row0+nrows)` 区间
    ///
    /// 调用方保证目标区间已由 `set_nrows` 分配。
    fn copy_from(
        &mut self,
        src: &ColumnData,
        row0: usize,
        nrows: usize,
    ) -> Result<()> {
        match (self, src) {
            (Self::Int64(dst), Self::Int64(s)) => {
                dst[row0..row0 + nrows].clone_from_slice(&s[..nrows]);
            }
            (Self::Float64(dst), Self::Float64(s)) => {
                dst[row0..row0 + nrows].clone_from_slice(&s[..nrows]);
            }
            (Self::Bool(dst), Self::Bool(s)) => {
                dst[row0..row0 + nrows].clone_from_slice(&s[..nrows]);
            }
            (Self::Str(dst), Self::Str(s)) => {
                dst[row0..row0 + nrows].clone_from_slice(&s[..nrows]);
            }
            _ => {
                return Err(ReadError::other("列类型不匹配，无法写入"));
            }
        }
        Ok(())
    }

    /// 将第 `row` 行格式化为输出字段；空值输出空字符串
    fn format_cell(&self, row: usize) -> String {
        match self {
            Self::Int64(v) => {
                v[row].map(|x| x.to_string()).unwrap_or_default()
            }
            Self::Float64(v) => {
                v[row].map(|x| x.to_string()).unwrap_or_default()
            }
            Self::Bool(v) => {
                v[row].map(|x| x.to_string()).unwrap_or_default()
            }
            Self::Str(v) => v[row].clone().unwrap_or_default(),
        }
    }
}

/// 线程本地的列式行缓冲
///
/// 每个工作线程解析一个块时先把行写入自己的 `RowBatch`，提交排序后再由
/// `push_buffers` 一次性复制进共享列存储。
#[derive(Debug, Clone)]
pub struct RowBatch {
    /// 各列缓冲，与 schema 一一对应
    columns: Vec<ColumnData>,
    /// 已完成的行数
    nrows: usize,
}

impl RowBatch {
    /// 按 schema 创建空缓冲
    pub fn new(schema: &[ColumnType]) -> Self {
        Self {
            columns: schema.iter().map(|&ty| ColumnData::new(ty)).collect(),
            nrows: 0,
        }
    }

    /// 列数
    pub fn ncols(&self) -> usize {
        self.columns.len()
    }

    /// 已完成的行数
    pub fn nrows(&self) -> usize {
        self.nrows
    }

    /// 各列缓冲
    pub fn columns(&self) -> &[ColumnData] {
        &self.columns
    }

    /// 清空缓冲（重置写游标）
    pub fn clear(&mut self) {
        for col in &mut self.columns {
            col.truncate(0);
        }
        self.nrows = 0;
    }

    /// 截断到前 `nrows` 行（行数上限裁剪时使用）
    pub fn truncate(&mut self, nrows: usize) {
        if nrows >= self.nrows {
            return;
        }
        for col in &mut self.columns {
            col.truncate(nrows);
        }
        self.nrows = nrows;
    }

    /// 向第 `col` 列追加一个原始字段
    pub fn push_field(&mut self, col: usize, raw: &str) {
        self.columns[col].push_field(raw);
    }

    /// 完成当前行；所有列必须已追加同样多的字段
    pub fn finish_row(&mut self) {
        self.nrows += 1;
        debug_assert!(self.columns.iter().all(|c| c.len() == self.nrows));
    }
}

/// 列式输出存储接口
///
/// `set_nrows` 由持有重分配锁独占端的线程调用；`write_rows` 在共享端调用，
/// 各调用写入互不重叠的行区间。
pub trait ColumnStore: Send + Sync {
    /// 当前分配的行数
    fn nrows(&self) -> u64;

    /// 调整行容量（增长或最终裁剪）
    ///
    /// # Errors
    ///
    /// 实现可在容量无法满足时返回错误。
    fn set_nrows(&mut self, nrows: u64) -> Result<()>;

    /// 把一个批次写入 `[row0, row0 + batch.nrows())` 区间
    ///
    /// # Errors
    ///
    /// 批次列类型与存储不一致时返回错误。
    fn write_rows(&self, row0: u64, batch: &RowBatch) -> Result<()>;
}

/// 内存列存储
///
/// 每列一个互斥量：`write_rows` 逐列短暂加锁后写入各自区间，容量增长则由
/// 外层读取器以独占方式调用 `set_nrows`。
#[derive(Debug)]
pub struct MemoryColumns {
    schema: Vec<ColumnType>,
    columns: Vec<Mutex<ColumnData>>,
    nrows: u64,
}

impl MemoryColumns {
    /// 按 schema 创建空存储
    pub fn new(schema: &[ColumnType]) -> Self {
        Self {
            schema: schema.to_vec(),
            columns: schema
                .iter()
                .map(|&ty| Mutex::new(ColumnData::new(ty)))
                .collect(),
            nrows: 0,
        }
    }

    /// 列数
    pub fn ncols(&self) -> usize {
        self.columns.len()
    }

    /// 列类型
    pub fn schema(&self) -> &[ColumnType] {
        &self.schema
    }

    /// 克隆出第 `col` 列的数据（测试与导出用）
    pub fn column(&self, col: usize) -> ColumnData {
        self.columns[col].lock().expect("列锁中毒").clone()
    }

    /// 把整表转成字符串单元格（行优先），便于比较与调试
    pub fn to_string_rows(&self) -> Vec<Vec<String>> {
        let nrows = usize::try_from(self.nrows).unwrap_or(usize::MAX);
        let cols: Vec<ColumnData> =
            (0..self.ncols()).map(|c| self.column(c)).collect();
        (0..nrows)
            .map(|r| cols.iter().map(|c| c.format_cell(r)).collect())
            .collect()
    }

    /// 将表内容按原方言序列化回分隔文本
    ///
    /// 含分隔符、引号或换行的字段会被引号包裹，内部引号翻倍。
    ///
    /// # Errors
    ///
    /// 底层写入失败时返回 IO 错误。
    pub fn write_delimited<W: Write>(
        &self,
        out: &mut W,
        delimiter: u8,
        quote: u8,
    ) -> Result<()> {
        let rows = self.to_string_rows();
        for row in rows {
            for (i, cell) in row.iter().enumerate() {
                if i > 0 {
                    out.write_all(&[delimiter])?;
                }
                let needs_quote = cell.bytes().any(|b| {
                    b == delimiter || b == quote || b == b'\n' || b == b'\r'
                });
                if needs_quote {
                    out.write_all(&[quote])?;
                    for b in cell.bytes() {
                        if b == quote {
                            out.write_all(&[quote, quote])?;
                        } else {
                            out.write_all(&[b])?;
                        }
                    }
                    out.write_all(&[quote])?;
                } else {
                    out.write_all(cell.as_bytes())?;
                }
            }
            out.write_all(b"\n")?;
        }
        Ok(())
    }
}

impl ColumnStore for MemoryColumns {
    fn nrows(&self) -> u64 {
        self.nrows
    }

    fn set_nrows(&mut self, nrows: u64) -> Result<()> {
        let n = usize::try_from(nrows)
            .map_err(|_| ReadError::other("行数超出平台可寻址范围"))?;
        for col in &self.columns {
            col.lock().expect("列锁中毒").resize(n);
        }
        self.nrows = nrows;
        Ok(())
    }

    fn write_rows(&self, row0: u64, batch: &RowBatch) -> Result<()> {
        if batch.ncols() != self.ncols() {
            return Err(ReadError::other(format!(
                "批次列数 {} 与存储列数 {} 不一致",
                batch.ncols(),
                self.ncols()
            )));
        }
        let nrows = batch.nrows();
        if nrows == 0 {
            return Ok(());
        }
        let row0 = usize::try_from(row0)
            .map_err(|_| ReadError::other("行偏移超出平台可寻址范围"))?;
        for (dst, src) in self.columns.iter().zip(batch.columns()) {
            dst.lock().expect("列锁中毒").copy_from(src, row0, nrows)?;
        }
        Ok(())
    }
}
