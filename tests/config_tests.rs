//! 配置加载的集成测试
//!
//! 这些测试操作进程级环境变量，用一把静态互斥量串行化，避免并行
//! 测试互相干扰。

use parcsv::config::Config;
use std::io::Write;
use std::sync::Mutex;
use tempfile::NamedTempFile;

/// 串行化环境变量操作
static ENV_LOCK: Mutex<()> = Mutex::new(());

/// 写出一个临时配置文件
fn write_config_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("创建临时文件失败");
    write!(file, "{}", content).expect("写入配置失败");
    file.flush().expect("flush 失败");
    file
}

#[test]
fn test_load_from_env_path() {
    let _guard = ENV_LOCK.lock().unwrap();
    let file = write_config_file(
        "[read]\nnthreads = 3\nmax_nrows = 500\nreport_progress = true\n\
         mean_line_length = 42.0\n\n[csv]\ndelimiter = \";\"\nhas_header = false\n",
    );
    std::env::set_var("PARCSV_CONFIG", file.path());

    let rt = Config::load().unwrap();
    std::env::remove_var("PARCSV_CONFIG");

    assert_eq!(rt.read.nthreads, 3);
    assert_eq!(rt.read.max_nrows, 500);
    assert!(rt.read.report_progress);
    assert!((rt.mean_line_length - 42.0).abs() < f64::EPSILON);
    assert_eq!(rt.delimiter, b';');
    assert_eq!(rt.quote, b'"');
    assert!(!rt.has_header);
}

#[test]
fn test_load_invalid_toml_is_config_error() {
    let _guard = ENV_LOCK.lock().unwrap();
    let file = write_config_file("[read\nnthreads = !!!\n");
    std::env::set_var("PARCSV_CONFIG", file.path());

    let err = Config::load().unwrap_err();
    std::env::remove_var("PARCSV_CONFIG");

    assert!(err.is_config_error());
}

#[test]
fn test_load_rejects_multibyte_delimiter() {
    let _guard = ENV_LOCK.lock().unwrap();
    let file = write_config_file("[csv]\ndelimiter = \"ab\"\n");
    std::env::set_var("PARCSV_CONFIG", file.path());

    let err = Config::load().unwrap_err();
    std::env::remove_var("PARCSV_CONFIG");

    assert!(err.is_config_error());
}
