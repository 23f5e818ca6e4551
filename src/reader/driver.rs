//! 并行分块读取驱动
//!
//! 核心流水线：工作线程动态领取块号，各自推测解析，然后按块号顺序进入
//! 提交区对账边界、扩容输出并发布行数。提交区内的任何状态只由当前提交
//! 线程修改，因此无需额外同步即可保证一致快照。

use crate::columns::ColumnStore;
use crate::config::ReadOptions;
use crate::error::{ReadError, Result};
use crate::reader::chunks::{ChunkCoordinates, ChunkPlan};
use crate::reader::context::{ContextFactory, ParseContext};
use crate::reader::latch::ExceptionLatch;
use crate::reader::progress::{ProgressSink, ProgressStatus};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, RwLock};
use std::thread;
use std::time::{Duration, Instant};

/// 输入超过此字节数时立即显示进度，不等启动延迟
const PROGRESS_IMMEDIATE_BYTES: usize = 1 << 28;
/// 小文件的进度条启动延迟：避免为瞬间完成的读取闪现进度
const PROGRESS_STARTUP_DELAY: Duration = Duration::from_millis(750);
/// 每次重分配至少增加的行数
const REALLOC_MIN_STEP: u64 = 1024;
/// 按剩余块数外推需求时的安全系数
const REALLOC_HEADROOM: f64 = 1.2;

/// 一次读取的统计摘要
#[derive(Debug, Clone)]
pub struct ReadSummary {
    /// 提交的总行数
    pub nrows: u64,
    /// 分块方案中的块数
    pub chunks: usize,
    /// 输出列重分配次数
    pub reallocs: usize,
    /// 边界对账触发的强制重解析次数
    pub reparses: usize,
    /// 总耗时
    pub elapsed: Duration,
}

/// 中断句柄
///
/// 可克隆后交给其他线程；调用 [`interrupt`](InterruptHandle::interrupt)
/// 后，工作线程会在下一个块边界停止，读取以 `ReadError::Interrupted` 结束。
/// 标志一经设置对后续的 `read_all` 调用同样生效。
#[derive(Debug, Clone, Default)]
pub struct InterruptHandle {
    flag: Arc<AtomicBool>,
}

impl InterruptHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// 请求中断读取
    pub fn interrupt(&self) {
        self.flag.store(true, Ordering::Release);
    }

    /// 是否已请求中断
    pub fn is_interrupted(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

/// 驱动状态：规划发布前由主线程写入，此后仅在按序提交区内修改
#[derive(Debug)]
struct DriverState {
    /// 分块方案；工作线程在方案发布前等待
    plan: Option<ChunkPlan>,
    /// 下一个允许进入提交区的块号
    next_commit: usize,
    /// 最近一次成功提交的块终点（单调不减）
    last_chunk_end: usize,
    /// 已提交行数
    nrows_written: u64,
    /// 输出存储当前分配的行数
    nrows_allocated: u64,
    /// 重分配次数
    reallocs: usize,
    /// 强制重解析次数
    reparses: usize,
}

/// 并行分块读取器
///
/// 把 `[0, input_size)` 字节范围切块分发给工作线程，按输入顺序把解析出的
/// 行提交进列存储。`store` 外层的读写锁即重分配锁：`push_buffers` 持共享
/// 端写入已分配区间，容量增长持独占端调用 `set_nrows`。
pub struct ChunkedReader<S: ColumnStore, F: ContextFactory> {
    factory: F,
    store: RwLock<S>,
    options: ReadOptions,
    mean_line_len: f64,
    input_start: usize,
    input_end: usize,
    nrows_max: u64,
    state: Mutex<DriverState>,
    commit_cv: Condvar,
    latch: ExceptionLatch,
    interrupt: InterruptHandle,
    progress: Option<Box<dyn ProgressSink>>,
}

impl<S: ColumnStore, F: ContextFactory> ChunkedReader<S, F> {
    /// 创建读取器
    ///
    /// `mean_line_len` 是平均行长的估计值（字节），仅影响分块粒度，
    /// 会被钳制到不小于 1。
    pub fn new(
        factory: F,
        store: S,
        options: ReadOptions,
        mean_line_len: f64,
    ) -> Self {
        let input_end = factory.input_size();
        let nrows_allocated = store.nrows();
        let nrows_max = options.max_nrows;
        debug_assert!(nrows_allocated <= nrows_max);

        Self {
            factory,
            store: RwLock::new(store),
            options,
            mean_line_len,
            input_start: 0,
            input_end,
            nrows_max,
            state: Mutex::new(DriverState {
                plan: None,
                next_commit: 0,
                last_chunk_end: 0,
                nrows_written: 0,
                nrows_allocated,
                reallocs: 0,
                reparses: 0,
            }),
            commit_cv: Condvar::new(),
            latch: ExceptionLatch::new(),
            interrupt: InterruptHandle::new(),
            progress: None,
        }
    }

    /// 设置进度接收端（仅协调线程会调用它）
    #[must_use]
    pub fn with_progress(mut self, sink: Box<dyn ProgressSink>) -> Self {
        self.progress = Some(sink);
        self
    }

    /// 获取中断句柄
    pub fn interrupt_handle(&self) -> InterruptHandle {
        self.interrupt.clone()
    }

    /// 已完成的输入比例，取值 `[0, 1]`
    #[allow(clippy::cast_precision_loss)]
    pub fn work_done_amount(&self) -> f64 {
        let total = self.input_end - self.input_start;
        if total == 0 {
            return 1.0;
        }
        let done = {
            let st = self.state.lock().expect("驱动状态锁中毒");
            st.last_chunk_end - self.input_start
        };
        done as f64 / total as f64
    }

    /// 取回输出列存储
    pub fn into_store(self) -> S {
        self.store.into_inner().expect("重分配锁中毒")
    }

    /// 驱动整个读取流水线
    ///
    /// 正常完成返回统计摘要；任何工作线程的首个失败会在线程汇合后原样
    /// 返回。无论成败，输出存储都会先被裁剪到已提交行数，已提交的前缀
    /// 保持一致可用。
    ///
    /// # Errors
    ///
    /// 解析失败、边界对账失败、用户中断或底层 IO 失败。
    pub fn read_all(&mut self) -> Result<ReadSummary> {
        let start_time = Instant::now();
        let input_size = self.input_end - self.input_start;

        let requested = if self.options.nthreads == 0 {
            thread::available_parallelism().map_or(1, |n| n.get())
        } else {
            self.options.nthreads
        };
        let initial_plan =
            ChunkPlan::plan(input_size, self.mean_line_len, requested);

        #[cfg(feature = "logging")]
        tracing::debug!(
            "开始读取: 输入 {} 字节，计划 {} 块 × {} 字节，{} 线程",
            input_size,
            initial_plan.chunk_count,
            initial_plan.chunk_size,
            initial_plan.nthreads
        );

        // 重置驱动状态（允许同一读取器重复使用）
        self.latch = ExceptionLatch::new();
        {
            let mut st = self.state.lock().expect("驱动状态锁中毒");
            st.plan = None;
            st.next_commit = 0;
            st.last_chunk_end = self.input_start;
            st.nrows_written = 0;
            st.nrows_allocated =
                self.store.read().expect("重分配锁中毒").nrows();
            st.reallocs = 0;
            st.reparses = 0;
        }

        let next_chunk = AtomicUsize::new(0);
        let this = &*self;

        thread::scope(|scope| {
            let mut handles = Vec::with_capacity(initial_plan.nthreads);
            for thread_id in 0..initial_plan.nthreads {
                let builder = thread::Builder::new()
                    .name(format!("parcsv-worker-{thread_id}"));
                let next_chunk = &next_chunk;
                match builder.spawn_scoped(scope, move || {
                    this.worker_loop(thread_id, next_chunk);
                }) {
                    Ok(handle) => handles.push(handle),
                    Err(e) => {
                        #[cfg(feature = "logging")]
                        tracing::warn!(
                            "创建工作线程失败: {}，以 {} 个线程继续",
                            e,
                            handles.len()
                        );
                        #[cfg(not(feature = "logging"))]
                        let _ = e;
                        break;
                    }
                }
            }

            // 实际线程数少于请求时重新规划；方案发布前所有工作线程都在
            // 等待，因此它们观察到的分块参数一致
            let actual = handles.len().max(1);
            let plan = if actual == initial_plan.nthreads {
                initial_plan
            } else {
                #[cfg(feature = "logging")]
                tracing::debug!("实际可用线程数: {}，重新规划分块", actual);
                ChunkPlan::plan(input_size, self.mean_line_len, actual)
            };
            {
                let mut st = self.state.lock().expect("驱动状态锁中毒");
                st.plan = Some(plan);
                self.commit_cv.notify_all();
            }

            // 一个线程都没能创建时退化为在当前线程执行
            if handles.is_empty() {
                this.worker_loop(0, &next_chunk);
            }
            for handle in handles {
                let _ = handle.join();
            }
        });

        // 收尾：无论成败都先把输出裁剪到已提交行数，保证前缀一致
        let (nrows_written, last_chunk_end, chunks, reallocs, reparses) = {
            let st = self.state.lock().expect("驱动状态锁中毒");
            (
                st.nrows_written,
                st.last_chunk_end,
                st.plan.map_or(0, |p| p.chunk_count),
                st.reallocs,
                st.reparses,
            )
        };
        let trim = self
            .store
            .write()
            .expect("重分配锁中毒")
            .set_nrows(nrows_written);

        if let Some(err) = self.latch.take() {
            return Err(err);
        }
        trim?;

        // 完整性检查：除非被行数上限截断，否则必须读完全部输入
        if nrows_written < self.nrows_max && last_chunk_end != self.input_end
        {
            return Err(ReadError::inconsistent(
                chunks.saturating_sub(1),
                self.input_end,
                last_chunk_end,
            ));
        }

        #[cfg(feature = "logging")]
        tracing::info!(
            "读取完成: {} 行，{} 块，{} 次重分配，{} 次重解析，耗时 {:?}",
            nrows_written,
            chunks,
            reallocs,
            reparses,
            start_time.elapsed()
        );

        Ok(ReadSummary {
            nrows: nrows_written,
            chunks,
            reallocs,
            reparses,
            elapsed: start_time.elapsed(),
        })
    }

    /// 工作线程主循环
    fn worker_loop(&self, thread_id: usize, next_chunk: &AtomicUsize) {
        // 等待分块方案发布
        let plan = {
            let mut st = self.state.lock().expect("驱动状态锁中毒");
            loop {
                if let Some(plan) = st.plan {
                    break plan;
                }
                st = self.commit_cv.wait(st).expect("驱动状态锁中毒");
            }
        };

        // 进度只能由协调线程（0 号）回报：接收端不要求线程安全的用法
        let is_coordinator = thread_id == 0;
        let show_progress = is_coordinator
            && self.options.report_progress
            && self.progress.is_some();
        let mut show_always = show_progress
            && (self.input_end - self.input_start > PROGRESS_IMMEDIATE_BYTES);
        let show_when = Instant::now() + PROGRESS_STARTUP_DELAY;

        let mut ctx = self.factory.init_thread_context(thread_id);
        let mut xcc = ChunkCoordinates::default();
        let mut acc = ChunkCoordinates::default();
        // 当前缓冲内容是否已经过按序提交（决定收尾时推出还是丢弃）
        let mut committed = false;

        loop {
            let i = next_chunk.fetch_add(1, Ordering::SeqCst);
            if i >= plan.chunk_count {
                break;
            }

            if !self.latch.is_caught() {
                if show_always || (show_progress && Instant::now() >= show_when)
                {
                    if let Some(sink) = &self.progress {
                        sink.progress(
                            self.work_done_amount(),
                            ProgressStatus::Running,
                        );
                    }
                    show_always = true;
                }

                if let Err(e) = self.parse_chunk(
                    &mut ctx,
                    i,
                    &plan,
                    &mut xcc,
                    &mut acc,
                    &mut committed,
                ) {
                    self.latch.capture(e);
                }
            }

            // 按序提交门：无论本块成败都要推进 next_commit，否则后继块
            // 会在门上永久等待
            let mut st = self.state.lock().expect("驱动状态锁中毒");
            while st.next_commit != i {
                st = self.commit_cv.wait(st).expect("驱动状态锁中毒");
            }
            if !self.latch.is_caught() {
                match self.commit_chunk(&mut st, &mut ctx, i, &mut xcc, &mut acc)
                {
                    Ok(()) => committed = true,
                    Err(e) => self.latch.capture(e),
                }
            }
            st.next_commit += 1;
            self.commit_cv.notify_all();
            drop(st);
        }

        // 未经过按序提交的缓冲不能再推入，行序会被破坏，直接丢弃；
        // 已提交只是尚未落盘的缓冲仍要推出，保证已发布的行数前缀完整
        if !committed {
            ctx.clear_rows();
        }

        // 把最后一块的缓冲推出去
        if ctx.used_nrows() > 0 {
            let guard = self.store.read().expect("重分配锁中毒");
            if let Err(e) = ctx.push_buffers(&*guard) {
                self.latch.capture(e);
            }
        }

        // 最后一次进度回报
        if show_always {
            if let Some(sink) = &self.progress {
                let status = if self.latch.is_interrupt() {
                    ProgressStatus::Interrupted
                } else if self.latch.is_caught() {
                    ProgressStatus::Errored
                } else {
                    ProgressStatus::Done
                };
                sink.progress(self.work_done_amount(), status);
            }
        }
    }

    /// 单块的解析阶段：推出上一块缓冲，计算候选边界，推测解析
    ///
    /// 上一块缓冲成功推出后，`committed` 置为假：此后缓冲里的内容都属于
    /// 尚未提交的新块。
    #[allow(clippy::too_many_arguments)]
    fn parse_chunk(
        &self,
        ctx: &mut F::Context,
        i: usize,
        plan: &ChunkPlan,
        xcc: &mut ChunkCoordinates,
        acc: &mut ChunkCoordinates,
        committed: &mut bool,
    ) -> Result<()> {
        if self.interrupt.is_interrupted() {
            return Err(ReadError::Interrupted);
        }

        // 上一块的 row0 已在其提交阶段确定，这里持共享锁写入存储
        {
            let guard = self.store.read().expect("重分配锁中毒");
            ctx.push_buffers(&*guard)?;
        }
        *committed = false;

        let (last_chunk_end, capped) = {
            let st = self.state.lock().expect("驱动状态锁中毒");
            (st.last_chunk_end, st.nrows_written >= self.nrows_max)
        };
        // 行数上限已满：后续块直接跳过解析，提交阶段同样跳过
        if capped {
            return Ok(());
        }
        *xcc = plan.chunk_boundaries(
            i,
            self.input_start,
            self.input_end,
            last_chunk_end,
        );
        ctx.adjust_chunk_coordinates(xcc);

        ctx.read_chunk(xcc, acc)
    }

    /// 单块的提交阶段（调用方已持有提交顺序）
    fn commit_chunk(
        &self,
        st: &mut DriverState,
        ctx: &mut F::Context,
        i: usize,
        xcc: &mut ChunkCoordinates,
        acc: &mut ChunkCoordinates,
    ) -> Result<()> {
        // 行数上限已满：本块不提交任何行，也不推进已提交终点
        if st.nrows_written >= self.nrows_max {
            ctx.clear_rows();
            return Ok(());
        }

        ctx.set_row0(st.nrows_written);

        // 边界对账：推测起点与上一块真实终点不符时，强制真实起点重解析。
        // 第二轮使用真实起点，解析器必须命中 last_chunk_end，否则输入在
        // 可恢复范围之外
        let mut attempts_left = 2;
        while acc.start != st.last_chunk_end || acc.end < st.last_chunk_end {
            attempts_left -= 1;
            if attempts_left == 0 {
                return Err(ReadError::inconsistent(
                    i,
                    st.last_chunk_end,
                    acc.start,
                ));
            }
            #[cfg(feature = "logging")]
            tracing::trace!(
                "块{}起点 {} 与上一块终点 {} 不一致，强制真实起点重解析",
                i,
                acc.start,
                st.last_chunk_end
            );
            xcc.start = st.last_chunk_end;
            xcc.true_start = true;
            st.reparses += 1;
            ctx.read_chunk(xcc, acc)?;
        }

        let mut nrows_new = st.nrows_written + ctx.used_nrows();
        if nrows_new > st.nrows_allocated {
            if st.nrows_allocated == self.nrows_max {
                // 已到行数上限：不再扩容，裁剪当前块多出的行
                ctx.truncate_rows(st.nrows_allocated - st.nrows_written);
                nrows_new = st.nrows_allocated;
            } else {
                self.realloc_output_columns(st, i, nrows_new)?;
                if nrows_new > st.nrows_allocated {
                    // 增长被行数上限截断
                    ctx.truncate_rows(st.nrows_allocated - st.nrows_written);
                    nrows_new = st.nrows_allocated;
                }
            }
        }
        st.nrows_written = nrows_new;
        st.last_chunk_end = acc.end;

        ctx.order_buffer();
        Ok(())
    }

    /// 扩容输出列
    ///
    /// 非最后一块按剩余块数外推需求并加安全系数；持重分配锁独占端调用
    /// `set_nrows`，此时所有推入缓冲的共享端持有者都已退出。
    fn realloc_output_columns(
        &self,
        st: &mut DriverState,
        ichunk: usize,
        new_alloc: u64,
    ) -> Result<()> {
        let chunk_count = st.plan.map_or(1, |p| p.chunk_count);
        let new_alloc = if ichunk == chunk_count - 1 {
            // 最后一块：需求就是精确行数
            new_alloc
        } else {
            #[allow(
                clippy::cast_precision_loss,
                clippy::cast_possible_truncation,
                clippy::cast_sign_loss
            )]
            let projected = (REALLOC_HEADROOM
                * new_alloc as f64
                * chunk_count as f64
                / (ichunk + 1) as f64) as u64;
            projected.max(REALLOC_MIN_STEP + st.nrows_allocated)
        };
        let new_alloc = new_alloc.min(self.nrows_max);

        st.nrows_allocated = new_alloc;
        st.reallocs += 1;
        #[cfg(feature = "logging")]
        tracing::trace!("输出行数不足，重分配到 {} 行", new_alloc);

        self.store
            .write()
            .expect("重分配锁中毒")
            .set_nrows(new_alloc)
    }
}
