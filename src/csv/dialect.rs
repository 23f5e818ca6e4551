//! CSV 方言与记录扫描
//!
//! 提供引号感知的单条记录扫描和推测起点的重同步。扫描只依赖输入字节，
//! 不持有任何状态，因此可以被任意线程在任意偏移上并发调用。

use crate::error::{ReadError, Result};
use memchr::{memchr, memchr3};
use std::borrow::Cow;

/// 字段结束时遇到的终结符
enum Term {
    /// 字段分隔符
    Delim,
    /// 行终止符（`\n` 为 1 字节，`\r\n` 为 2 字节）
    Newline(usize),
    /// 输入末尾（末行允许没有换行）
    Eof,
}

/// CSV 方言：分隔符与引号字符
///
/// 引号字段内允许出现分隔符、回车换行和翻倍转义的引号。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsvDialect {
    /// 字段分隔符
    pub delimiter: u8,
    /// 引号字符
    pub quote: u8,
}

impl Default for CsvDialect {
    fn default() -> Self {
        Self { delimiter: b',', quote: b'"' }
    }
}

impl CsvDialect {
    /// 创建自定义方言
    pub fn new(delimiter: u8, quote: u8) -> Self {
        Self { delimiter, quote }
    }

    /// 从 `start` 扫描一条记录，字段写入 `fields`
    ///
    /// 返回记录结束偏移（含行终止符）。起点到输入末尾之间只有空行时
    /// 返回 `Ok(None)`。行首的空行被当作记录的一部分消费，保证块覆盖
    /// 范围连续。
    ///
    /// # Errors
    ///
    /// 引号字段未闭合、或闭合后跟随非法字符时返回 `ReadError::Parse`。
    pub fn scan_record<'i>(
        &self,
        input: &'i [u8],
        start: usize,
        fields: &mut Vec<Cow<'i, str>>,
    ) -> Result<Option<usize>> {
        fields.clear();
        let mut pos = start;

        // 跳过空行（只含行终止符的行）
        loop {
            match input.get(pos) {
                None => return Ok(None),
                Some(&b'\n') => pos += 1,
                Some(&b'\r') if input.get(pos + 1) == Some(&b'\n') => {
                    pos += 2;
                }
                Some(_) => break,
            }
        }

        loop {
            // 每轮解析一个字段，按终结符决定继续本记录还是返回
            let term = if input.get(pos) == Some(&self.quote) {
                let (field, after) = self.scan_quoted(input, pos)?;
                fields.push(field);
                pos = after;
                // 引号闭合后只允许分隔符、行终止符或输入末尾
                match input.get(pos) {
                    None => Term::Eof,
                    Some(&b) if b == self.delimiter => Term::Delim,
                    Some(&b'\n') => Term::Newline(1),
                    Some(&b'\r') if input.get(pos + 1) == Some(&b'\n') => {
                        Term::Newline(2)
                    }
                    Some(_) => {
                        return Err(ReadError::parse_error(
                            pos,
                            "引号字段闭合后存在多余字符",
                        ));
                    }
                }
            } else {
                let (field, after, term) = self.scan_unquoted(input, pos);
                fields.push(field);
                pos = after;
                term
            };

            match term {
                Term::Delim => pos += 1,
                Term::Newline(n) => return Ok(Some(pos + n)),
                Term::Eof => return Ok(Some(pos)),
            }
        }
    }

    /// 扫描一个引号字段；`pos` 指向起始引号
    ///
    /// 返回去除包裹引号、翻倍引号还原后的字段内容和闭合引号之后的偏移。
    fn scan_quoted<'i>(
        &self,
        input: &'i [u8],
        pos: usize,
    ) -> Result<(Cow<'i, str>, usize)> {
        let mut seg_start = pos + 1;
        let mut cursor = seg_start;
        let mut owned: Option<String> = None;

        loop {
            let Some(k) = memchr(self.quote, &input[cursor..]) else {
                return Err(ReadError::parse_error(pos, "引号字段未闭合"));
            };
            let qpos = cursor + k;
            if input.get(qpos + 1) == Some(&self.quote) {
                // 翻倍引号转义
                let buf = owned.get_or_insert_with(String::new);
                buf.push_str(&String::from_utf8_lossy(
                    &input[seg_start..qpos],
                ));
                buf.push(char::from(self.quote));
                seg_start = qpos + 2;
                cursor = qpos + 2;
            } else {
                let field = match owned {
                    Some(mut buf) => {
                        buf.push_str(&String::from_utf8_lossy(
                            &input[seg_start..qpos],
                        ));
                        Cow::Owned(buf)
                    }
                    None => String::from_utf8_lossy(&input[seg_start..qpos]),
                };
                return Ok((field, qpos + 1));
            }
        }
    }

    /// 扫描一个非引号字段
    fn scan_unquoted<'i>(
        &self,
        input: &'i [u8],
        pos: usize,
    ) -> (Cow<'i, str>, usize, Term) {
        let field_start = pos;
        let mut cursor = pos;
        loop {
            match memchr3(self.delimiter, b'\n', b'\r', &input[cursor..]) {
                None => {
                    let field =
                        String::from_utf8_lossy(&input[field_start..]);
                    return (field, input.len(), Term::Eof);
                }
                Some(k) => {
                    let kpos = cursor + k;
                    let field = || {
                        String::from_utf8_lossy(&input[field_start..kpos])
                    };
                    if input[kpos] == self.delimiter {
                        return (field(), kpos, Term::Delim);
                    } else if input[kpos] == b'\n' {
                        return (field(), kpos, Term::Newline(1));
                    } else if input.get(kpos + 1) == Some(&b'\n') {
                        return (field(), kpos, Term::Newline(2));
                    }
                    // 字段内的孤立 CR
                    cursor = kpos + 1;
                }
            }
        }
    }

    /// 从猜测偏移向后寻找下一个可信的记录起点
    ///
    /// 候选点是行首（猜测点本身恰在行首时直接验证）；候选处能解析出
    /// 字段数与 `ncols` 相符的记录才被接受。到输入末尾仍无候选时返回
    /// 输入长度。候选可能落在跨行引号字段内部并碰巧通过验证；这种
    /// 错判由提交阶段的边界对账修复。
    pub fn resync(&self, input: &[u8], guess: usize, ncols: usize) -> usize {
        let mut fields = Vec::with_capacity(ncols);
        let mut cand = if guess == 0
            || matches!(input.get(guess - 1), Some(&b'\n'))
        {
            guess
        } else {
            Self::next_line_start(input, guess)
        };
        while cand < input.len() {
            match self.scan_record(input, cand, &mut fields) {
                Ok(Some(_)) if fields.len() == ncols => return cand,
                // 只剩空行：当作末尾边界
                Ok(None) => return cand,
                _ => cand = Self::next_line_start(input, cand),
            }
        }
        input.len()
    }

    /// 下一个换行符之后的偏移；没有换行符时返回输入长度
    fn next_line_start(input: &[u8], from: usize) -> usize {
        match memchr(b'\n', &input[from..]) {
            Some(k) => from + k + 1,
            None => input.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(input: &str, start: usize) -> Option<(Vec<String>, usize)> {
        let dialect = CsvDialect::default();
        let mut fields = Vec::new();
        let end = dialect
            .scan_record(input.as_bytes(), start, &mut fields)
            .unwrap()?;
        Some((fields.into_iter().map(Cow::into_owned).collect(), end))
    }

    #[test]
    fn test_scan_plain_record() {
        let (fields, end) = scan("a,b,c\nd,e,f\n", 0).unwrap();
        assert_eq!(fields, vec!["a", "b", "c"]);
        assert_eq!(end, 6);
    }

    #[test]
    fn test_scan_crlf_and_missing_trailing_newline() {
        let (fields, end) = scan("a,b\r\n", 0).unwrap();
        assert_eq!(fields, vec!["a", "b"]);
        assert_eq!(end, 5);

        let (fields, end) = scan("x,y", 0).unwrap();
        assert_eq!(fields, vec!["x", "y"]);
        assert_eq!(end, 3);
    }

    #[test]
    fn test_scan_quoted_with_embedded_separators() {
        let (fields, end) = scan("\"a,b\",\"c\nd\",e\n", 0).unwrap();
        assert_eq!(fields, vec!["a,b", "c\nd", "e"]);
        assert_eq!(end, 14);
    }

    #[test]
    fn test_scan_doubled_quote_escape() {
        let (fields, _) = scan("\"say \"\"hi\"\"\",2\n", 0).unwrap();
        assert_eq!(fields, vec!["say \"hi\"", "2"]);
    }

    #[test]
    fn test_scan_empty_fields() {
        let (fields, _) = scan(",,\n", 0).unwrap();
        assert_eq!(fields, vec!["", "", ""]);
    }

    #[test]
    fn test_scan_skips_blank_lines() {
        let (fields, end) = scan("\n\na,b\n", 0).unwrap();
        assert_eq!(fields, vec!["a", "b"]);
        assert_eq!(end, 6);
    }

    #[test]
    fn test_scan_only_blank_lines_returns_none() {
        assert!(scan("\n\n", 0).is_none());
        assert!(scan("", 0).is_none());
    }

    #[test]
    fn test_scan_unclosed_quote_is_error() {
        let dialect = CsvDialect::default();
        let mut fields = Vec::new();
        let err = dialect
            .scan_record(b"\"abc\n", 0, &mut fields)
            .unwrap_err();
        assert!(err.is_parse_error());
    }

    #[test]
    fn test_scan_junk_after_closing_quote_is_error() {
        let dialect = CsvDialect::default();
        let mut fields = Vec::new();
        let err = dialect
            .scan_record(b"\"abc\"x,1\n", 0, &mut fields)
            .unwrap_err();
        assert!(err.is_parse_error());
    }

    #[test]
    fn test_resync_lands_on_next_record() {
        let dialect = CsvDialect::default();
        let input = b"aaa,bbb\nccc,ddd\neee,fff\n";
        // 猜测点落在第一条记录中间，应同步到第二条记录的行首
        assert_eq!(dialect.resync(input, 3, 2), 8);
        // 猜测点恰在行首时直接接受
        assert_eq!(dialect.resync(input, 8, 2), 8);
    }

    #[test]
    fn test_resync_rejects_wrong_field_count() {
        let dialect = CsvDialect::default();
        // 第二行只有一个字段，不匹配 ncols=2，应继续同步到第三行
        let input = b"a,b\noops\nc,d\n";
        assert_eq!(dialect.resync(input, 1, 2), 9);
    }

    #[test]
    fn test_resync_exhausted_returns_input_len() {
        let dialect = CsvDialect::default();
        let input = b"a,b,c";
        assert_eq!(dialect.resync(input, 1, 2), input.len());
    }

    #[test]
    fn test_custom_dialect() {
        let dialect = CsvDialect::new(b'\t', b'\'');
        let mut fields = Vec::new();
        let end = dialect
            .scan_record(b"'a\tb'\tc\n", 0, &mut fields)
            .unwrap()
            .unwrap();
        assert_eq!(end, 8);
        assert_eq!(fields, vec!["a\tb", "c"]);
    }
}
