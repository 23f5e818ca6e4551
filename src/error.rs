//! 错误类型定义
//!
//! 这个模块定义了库中使用的所有错误类型，使用 thiserror 提供丰富的错误信息。

/// 并行读取器的结果类型
pub type Result<T> = std::result::Result<T, ReadError>;

/// 并行读取错误类型
#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    /// IO错误
    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),

    /// 解析错误：块内容无法恢复地损坏
    #[error("解析错误 (字节偏移{offset}): {message}")]
    Parse { offset: usize, message: String },

    /// 边界对账失败：强制真实起点重解析后仍不一致
    #[error("块{chunk}边界不一致: 期望起点{expected}, 实际起点{actual}")]
    Inconsistent { chunk: usize, expected: usize, actual: usize },

    /// 用户中断
    #[error("读取被用户中断")]
    Interrupted,

    /// 配置错误
    #[error("配置错误: {0}")]
    Config(String),

    /// 日志错误（仅在启用 logging feature 时可用）
    #[cfg(feature = "logging")]
    #[error("日志错误: {0}")]
    Log(#[from] crate::logging::LogError),

    /// 其他错误
    #[error("未知错误: {0}")]
    Other(String),
}

impl ReadError {
    /// 创建一个解析错误
    pub fn parse_error<S: Into<String>>(offset: usize, message: S) -> Self {
        let message = message.into();
        #[cfg(feature = "logging")]
        {
            crate::logging::ensure_logger_initialized();
            tracing::error!("解析错误发生在字节偏移{}: {}", offset, message);
        }
        Self::Parse { offset, message }
    }

    /// 创建一个边界不一致错误
    pub fn inconsistent(chunk: usize, expected: usize, actual: usize) -> Self {
        #[cfg(feature = "logging")]
        {
            crate::logging::ensure_logger_initialized();
            tracing::error!(
                "块{}边界对账失败: 期望起点{}, 实际起点{}",
                chunk,
                expected,
                actual
            );
        }
        Self::Inconsistent { chunk, expected, actual }
    }

    /// 创建一个配置错误
    pub fn config_error<S: Into<String>>(message: S) -> Self {
        let message = message.into();
        #[cfg(feature = "logging")]
        {
            crate::logging::ensure_logger_initialized();
            tracing::error!("配置错误: {}", message);
        }
        Self::Config(message)
    }

    /// 创建一个其他类型错误
    pub fn other<S: Into<String>>(message: S) -> Self {
        let message = message.into();
        #[cfg(feature = "logging")]
        {
            crate::logging::ensure_logger_initialized();
            tracing::error!("未知错误: {}", message);
        }
        Self::Other(message)
    }

    /// 检查是否为 IO 错误
    pub fn is_io_error(&self) -> bool {
        matches!(self, ReadError::Io(_))
    }

    /// 检查是否为解析错误
    pub fn is_parse_error(&self) -> bool {
        matches!(self, ReadError::Parse { .. })
    }

    /// 检查是否为边界不一致错误
    pub fn is_inconsistent(&self) -> bool {
        matches!(self, ReadError::Inconsistent { .. })
    }

    /// 检查是否为用户中断
    pub fn is_interrupt(&self) -> bool {
        matches!(self, ReadError::Interrupted)
    }

    /// 检查是否为配置错误
    pub fn is_config_error(&self) -> bool {
        matches!(self, ReadError::Config(_))
    }
}
