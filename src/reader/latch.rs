//! 异常闩
//!
//! 并行区域内的错误不允许跨线程边界传播，否则会破坏工作线程的栈。
//! 所有失败统一写入这个"首写者获胜"的单槽闩，循环结束后由驱动端取出重抛。

use crate::error::ReadError;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

/// 首写者获胜的单槽错误闩
#[derive(Debug, Default)]
pub struct ExceptionLatch {
    /// 快路径标志：工作线程每块轮询一次
    caught: AtomicBool,
    /// 第一个被捕获的错误
    slot: Mutex<Option<ReadError>>,
}

impl ExceptionLatch {
    /// 创建空闩
    pub fn new() -> Self {
        Self::default()
    }

    /// 捕获一个错误；槽已占用时丢弃后来者
    pub fn capture(&self, err: ReadError) {
        let mut slot = self.slot.lock().expect("异常闩锁中毒");
        if slot.is_none() {
            #[cfg(feature = "logging")]
            tracing::debug!("捕获首个工作线程错误: {}", err);
            *slot = Some(err);
            self.caught.store(true, Ordering::Release);
        }
    }

    /// 是否已有错误被捕获
    pub fn is_caught(&self) -> bool {
        self.caught.load(Ordering::Acquire)
    }

    /// 捕获的是否为用户中断
    pub fn is_interrupt(&self) -> bool {
        self.slot
            .lock()
            .expect("异常闩锁中毒")
            .as_ref()
            .is_some_and(ReadError::is_interrupt)
    }

    /// 取出捕获的错误（若有）
    pub fn take(&self) -> Option<ReadError> {
        self.slot.lock().expect("异常闩锁中毒").take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_writer_wins() {
        let latch = ExceptionLatch::new();
        assert!(!latch.is_caught());

        latch.capture(ReadError::Interrupted);
        latch.capture(ReadError::other("后来者"));

        assert!(latch.is_caught());
        assert!(latch.is_interrupt());
        let err = latch.take().unwrap();
        assert!(err.is_interrupt());
        assert!(latch.take().is_none());
    }

    #[test]
    fn test_not_interrupt() {
        let latch = ExceptionLatch::new();
        latch.capture(ReadError::parse_error(7, "坏块"));
        assert!(latch.is_caught());
        assert!(!latch.is_interrupt());
    }
}
