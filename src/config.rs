//! 配置加载模块
//!
//! 支持从 TOML 文件加载配置（`$PARCSV_CONFIG`、`./config.toml` 或用户配置目录），
//! 并合并默认值得到运行时配置。

use crate::error::{ReadError, Result};
use serde::Deserialize;
use std::{env, fs, path::PathBuf};

#[derive(Debug, Deserialize)]
pub struct Config {
    pub log: Option<LogSection>,
    pub read: Option<ReadSection>,
    pub csv: Option<CsvSection>,
}

#[derive(Debug, Deserialize)]
pub struct LogSection {
    pub enable_stdout: Option<bool>,
    pub log_dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
pub struct ReadSection {
    /// 线程数；0 表示使用系统可用并行度
    pub nthreads: Option<usize>,
    /// 最大读取行数；0 表示不限制
    pub max_nrows: Option<u64>,
    pub report_progress: Option<bool>,
    /// 平均行长估计（字节），用于分块规划
    pub mean_line_length: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct CsvSection {
    /// 字段分隔符（单字节字符串，如 ","）
    pub delimiter: Option<String>,
    /// 引号字符（单字节字符串，如 "\""）
    pub quote: Option<String>,
    pub has_header: Option<bool>,
}

/// 读取器的运行时选项，由 [`Config::load`] 合并得到，也可以直接构造
#[derive(Debug, Clone)]
pub struct ReadOptions {
    /// 工作线程数；0 表示使用系统可用并行度
    pub nthreads: usize,
    /// 最大读取行数上限
    pub max_nrows: u64,
    /// 是否回报进度
    pub report_progress: bool,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self { nthreads: 0, max_nrows: u64::MAX, report_progress: false }
    }
}

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub enable_stdout: bool,
    pub log_dir: Option<PathBuf>,
    pub read: ReadOptions,
    pub mean_line_length: f64,
    pub delimiter: u8,
    pub quote: u8,
    pub has_header: bool,
}

impl RuntimeConfig {
    /// 由运行时配置导出日志配置
    #[cfg(feature = "logging")]
    pub fn log_config(&self) -> crate::logging::LogConfig {
        let mut cfg = crate::logging::LogConfig::new()
            .enable_stdout(self.enable_stdout);
        if let Some(dir) = &self.log_dir {
            cfg = cfg.log_dir(dir.clone());
        }
        cfg
    }
}

impl Config {
    /// 加载配置文件并合并默认值
    ///
    /// # Errors
    ///
    /// 配置文件存在但无法解析时返回 `Err(ReadError::Config(_))`；
    /// 文件不存在或读取失败时使用默认配置（读取失败仅记录警告）。
    pub fn load() -> Result<RuntimeConfig> {
        // Default empty config
        let mut cfg = Self { log: None, read: None, csv: None };

        // Try loading config from: $PARCSV_CONFIG, ./config.toml, or config_dir()/parcsv/config.toml
        let config_path = (|| {
            if let Ok(p) = env::var("PARCSV_CONFIG") {
                return Some(PathBuf::from(p));
            }
            if let Ok(cwd) = env::current_dir() {
                let p = cwd.join("config.toml");
                if p.exists() {
                    return Some(p);
                }
            }
            if let Some(cfg_dir) = dirs::config_dir() {
                let p = cfg_dir.join("parcsv").join("config.toml");
                if p.exists() {
                    return Some(p);
                }
            }
            None
        })();

        if let Some(path) = config_path {
            match fs::read_to_string(&path) {
                Ok(contents) => match toml::from_str::<Self>(&contents) {
                    Ok(parsed) => {
                        cfg = parsed;
                        #[cfg(feature = "logging")]
                        tracing::info!("使用配置文件: {}", path.display());
                    }
                    Err(e) => {
                        // treat parse errors as fatal: misconfigured input
                        return Err(ReadError::config_error(format!(
                            "解析配置文件失败 {}: {}",
                            path.display(),
                            e
                        )));
                    }
                },
                Err(e) => {
                    #[cfg(feature = "logging")]
                    tracing::warn!("读取配置文件失败 {}: {}", path.display(), e);
                    #[cfg(not(feature = "logging"))]
                    let _ = e;
                }
            }
        } else {
            #[cfg(feature = "logging")]
            tracing::info!("未找到配置文件；使用默认运行时配置");
        }

        Self::merge(cfg)
    }

    /// 将解析出的配置与默认值合并
    fn merge(cfg: Self) -> Result<RuntimeConfig> {
        let enable_stdout = cfg
            .log
            .as_ref()
            .and_then(|l| l.enable_stdout)
            .unwrap_or(cfg!(debug_assertions));

        let log_dir = cfg.log.as_ref().and_then(|l| l.log_dir.clone());

        let nthreads =
            cfg.read.as_ref().and_then(|r| r.nthreads).unwrap_or(0);

        // max_nrows 为 0 时表示不限制
        let max_nrows = match cfg.read.as_ref().and_then(|r| r.max_nrows) {
            Some(0) | None => u64::MAX,
            Some(n) => n,
        };

        let report_progress = cfg
            .read
            .as_ref()
            .and_then(|r| r.report_progress)
            .unwrap_or(false);

        let mean_line_length = cfg
            .read
            .as_ref()
            .and_then(|r| r.mean_line_length)
            .unwrap_or(30.0);

        let delimiter = Self::single_byte(
            cfg.csv.as_ref().and_then(|c| c.delimiter.as_deref()),
            b',',
            "delimiter",
        )?;
        let quote = Self::single_byte(
            cfg.csv.as_ref().and_then(|c| c.quote.as_deref()),
            b'"',
            "quote",
        )?;

        let has_header =
            cfg.csv.as_ref().and_then(|c| c.has_header).unwrap_or(true);

        Ok(RuntimeConfig {
            enable_stdout,
            log_dir,
            read: ReadOptions { nthreads, max_nrows, report_progress },
            mean_line_length,
            delimiter,
            quote,
            has_header,
        })
    }

    // 配置里的分隔符/引号必须是单个 ASCII 字节
    fn single_byte(
        value: Option<&str>,
        default: u8,
        field: &str,
    ) -> Result<u8> {
        match value {
            None => Ok(default),
            Some(s) if s.len() == 1 && s.is_ascii() => Ok(s.as_bytes()[0]),
            Some(s) => Err(ReadError::config_error(format!(
                "{field} 必须是单个 ASCII 字符，当前值: {s:?}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_options_default() {
        let opts = ReadOptions::default();
        assert_eq!(opts.nthreads, 0);
        assert_eq!(opts.max_nrows, u64::MAX);
        assert!(!opts.report_progress);
    }

    #[test]
    fn test_merge_empty_config() {
        let cfg = Config { log: None, read: None, csv: None };
        let rt = Config::merge(cfg).unwrap();
        assert_eq!(rt.delimiter, b',');
        assert_eq!(rt.quote, b'"');
        assert!(rt.has_header);
        assert_eq!(rt.read.max_nrows, u64::MAX);
    }

    #[test]
    fn test_merge_zero_max_nrows_means_unlimited() {
        let cfg: Config =
            toml::from_str("[read]\nmax_nrows = 0\n").unwrap();
        let rt = Config::merge(cfg).unwrap();
        assert_eq!(rt.read.max_nrows, u64::MAX);
    }

    #[test]
    fn test_merge_rejects_multibyte_delimiter() {
        let cfg: Config =
            toml::from_str("[csv]\ndelimiter = \"ab\"\n").unwrap();
        let err = Config::merge(cfg).unwrap_err();
        assert!(err.is_config_error());
    }

    #[test]
    fn test_merge_custom_csv_section() {
        let cfg: Config = toml::from_str(
            "[csv]\ndelimiter = \"\\t\"\nquote = \"'\"\nhas_header = false\n",
        )
        .unwrap();
        let rt = Config::merge(cfg).unwrap();
        assert_eq!(rt.delimiter, b'\t');
        assert_eq!(rt.quote, b'\'');
        assert!(!rt.has_header);
    }
}
