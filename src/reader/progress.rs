//! 进度回报
//!
//! 进度接收端不要求线程安全的使用方式：驱动保证只有协调线程会调用它，
//! 每块至多一次。

/// 读取进度状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressStatus {
    /// 读取进行中
    Running = 0,
    /// 正常完成
    Done = 1,
    /// 因错误终止
    Errored = 2,
    /// 被用户中断
    Interrupted = 3,
}

/// 进度接收端
///
/// `fraction` 为已提交输入占总输入的比例，取值 `[0, 1]`。
pub trait ProgressSink: Send + Sync {
    fn progress(&self, fraction: f64, status: ProgressStatus);
}

/// 丢弃所有进度回报的空实现
#[derive(Debug, Default, Clone, Copy)]
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn progress(&self, _fraction: f64, _status: ProgressStatus) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(ProgressStatus::Running as u8, 0);
        assert_eq!(ProgressStatus::Done as u8, 1);
        assert_eq!(ProgressStatus::Errored as u8, 2);
        assert_eq!(ProgressStatus::Interrupted as u8, 3);
    }

    #[test]
    fn test_null_progress_is_noop() {
        NullProgress.progress(0.5, ProgressStatus::Running);
    }
}
