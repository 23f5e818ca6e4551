//! 分块规划
//!
//! 把输入字节范围切成若干候选块。除第一块的起点和最后一块的终点外，
//! 块边界只是猜测：真正的记录边界要等工作线程解析后才能确定。

/// 一个块的坐标
///
/// `true_start`/`true_end` 表示对应偏移是已知的记录边界而非猜测。
/// 初始时只有第 0 块的起点和最后一块的终点为真。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChunkCoordinates {
    /// 块起始偏移（含）
    pub start: usize,
    /// 块结束偏移（不含）
    pub end: usize,
    /// 起点是否为已知记录边界
    pub true_start: bool,
    /// 终点是否为已知记录边界
    pub true_end: bool,
}

impl ChunkCoordinates {
    /// 创建一对猜测边界
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end, true_start: false, true_end: false }
    }
}

/// 分块方案
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPlan {
    /// 单块字节数（最后一块吸收余数）
    pub chunk_size: usize,
    /// 块总数
    pub chunk_count: usize,
    /// 规划后的工作线程数
    pub nthreads: usize,
}

impl ChunkPlan {
    /// 规划分块策略
    ///
    /// 初始块大小取 `max(1000 × 平均行长, 256 KiB)`；块数向上取整为线程数的
    /// 倍数以利负载均衡；若数据太小导致块数少于线程数，则把线程数降为块数。
    pub fn plan(
        input_size: usize,
        mean_line_len: f64,
        nthreads: usize,
    ) -> Self {
        let line_length = mean_line_len.max(1.0);
        let mut nthreads = nthreads.max(1);

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let size1000 = (1000.0 * line_length) as usize;
        let mut chunk_size = size1000.max(1 << 18);
        let mut chunk_count = (input_size / chunk_size).max(1);

        if chunk_count > nthreads {
            chunk_count = nthreads * (1 + (chunk_count - 1) / nthreads);
        } else {
            nthreads = chunk_count;
            #[cfg(feature = "logging")]
            tracing::debug!("数据量较小，线程数降为 {}", nthreads);
        }
        chunk_size = input_size / chunk_count;

        Self { chunk_size, chunk_count, nthreads }
    }

    /// 计算第 `i` 块的候选坐标
    ///
    /// 第 0 块（或单线程模式下的每一块）从上一块的真实终点开始；
    /// 最后一块终止于输入末尾；其余边界均为猜测。
    pub fn chunk_boundaries(
        &self,
        i: usize,
        input_start: usize,
        input_end: usize,
        last_chunk_end: usize,
    ) -> ChunkCoordinates {
        debug_assert!(i < self.chunk_count);
        let mut c = ChunkCoordinates::default();

        let is_first_chunk = i == 0;
        let is_last_chunk = i == self.chunk_count - 1;

        if self.nthreads == 1 || is_first_chunk {
            c.start = last_chunk_end;
            c.true_start = true;
        } else {
            c.start = input_start + i * self.chunk_size;
        }
        if is_last_chunk {
            c.end = input_end;
            c.true_end = true;
        } else {
            c.end = c.start + self.chunk_size;
        }

        c
    }
}
