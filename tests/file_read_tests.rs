//! 基于文件的读取测试

use parcsv::prelude::*;
use std::io::Write;
use tempfile::NamedTempFile;

/// 创建测试 CSV 文件
fn create_csv_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("创建临时文件失败");
    write!(file, "{}", content).expect("写入内容失败");
    file.flush().expect("flush 失败");
    file
}

#[test]
fn test_read_path_with_header() {
    let file = create_csv_file("id,name\n1,alpha\n2,beta\n3,gamma\n");
    let schema = [ColumnType::Int64, ColumnType::Str];

    let (store, summary) = read_path(
        file.path(),
        &schema,
        CsvDialect::default(),
        true,
        ReadOptions::default(),
        10.0,
    )
    .unwrap();

    assert_eq!(summary.nrows, 3);
    assert_eq!(
        store.column(0),
        ColumnData::Int64(vec![Some(1), Some(2), Some(3)])
    );
}

#[test]
fn test_read_path_missing_file_is_io_error() {
    let schema = [ColumnType::Str];
    let err = read_path(
        "/definitely/not/a/real/file.csv",
        &schema,
        CsvDialect::default(),
        false,
        ReadOptions::default(),
        10.0,
    )
    .unwrap_err();
    assert!(err.is_io_error());
}

#[test]
fn test_read_path_semicolon_dialect() {
    let file = create_csv_file("1;a\n2;b\n");
    let schema = [ColumnType::Int64, ColumnType::Str];

    let (store, summary) = read_path(
        file.path(),
        &schema,
        CsvDialect::new(b';', b'"'),
        false,
        ReadOptions::default(),
        4.0,
    )
    .unwrap();

    assert_eq!(summary.nrows, 2);
    assert_eq!(
        store.column(1),
        ColumnData::Str(vec![Some("a".to_string()), Some("b".to_string())])
    );
}
