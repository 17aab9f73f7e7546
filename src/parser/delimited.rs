//! Delimited Text Parser
//!
//! 区切りテキスト（CSV）を1行ずつトークナイズし、`SourceTable`を構築する。
//! ダブルクォートで囲まれたフィールドは区切り文字を含むことができ、
//! クォート内の`""`は1文字の`"`として扱う。それ以外のエスケープはサポートしない。

use tracing::{debug, warn};

use super::{SourceTable, TableLayout};
use crate::error::AgendaToJsonError;
use crate::security::SecurityConfig;
use crate::types::CellValue;

/// 1行のテキストをフィールドの列に分解する
///
/// - クォート外の前後の空白は各フィールドから除去されます
/// - クォート内の空白はそのまま保持されます
/// - 閉じられていないクォートは行末で閉じたものとして扱い、エラーにはしません
///
/// # 使用例
///
/// ```rust
/// use agenda_json::tokenize_line;
///
/// let fields = tokenize_line(r#"42, "Lunch, Hall A" ,"Say ""hi""""#, ',');
/// assert_eq!(fields, vec!["42", "Lunch, Hall A", r#"Say "hi""#]);
/// ```
pub fn tokenize_line(line: &str, delimiter: char) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    // `current`のうち、クォートによって保護されている先頭部分のバイト長
    let mut quoted_end = 0;
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '"' {
            if in_quotes && chars.peek() == Some(&'"') {
                chars.next();
                current.push('"');
                quoted_end = current.len();
            } else {
                in_quotes = !in_quotes;
                if !in_quotes {
                    quoted_end = current.len();
                }
            }
        } else if c == delimiter && !in_quotes {
            fields.push(finish_field(&current, quoted_end));
            current.clear();
            quoted_end = 0;
        } else if !in_quotes && c.is_whitespace() && current.is_empty() {
            continue;
        } else {
            current.push(c);
            if in_quotes {
                quoted_end = current.len();
            }
        }
    }

    fields.push(finish_field(&current, quoted_end));
    fields
}

/// クォート外の末尾空白を除去してフィールドを確定する
fn finish_field(current: &str, quoted_end: usize) -> String {
    let (protected, tail) = current.split_at(quoted_end);
    let mut field = String::with_capacity(current.len());
    field.push_str(protected);
    field.push_str(tail.trim_end());
    field
}

/// 区切りテキストのパーサー
#[derive(Debug, Clone)]
pub(crate) struct DelimitedParser {
    delimiter: char,
}

impl DelimitedParser {
    pub fn new(delimiter: char) -> Self {
        Self { delimiter }
    }

    /// テキスト全体を解析して`SourceTable`を構築する
    ///
    /// # 引数
    ///
    /// * `bytes` - 入力ファイルの内容（UTF-8、先頭のBOMは除去）
    /// * `layout` - ヘッダー行の位置
    /// * `security` - データ行数の上限
    ///
    /// # 戻り値
    ///
    /// * `Ok(SourceTable)` - ヘッダーとデータ行
    /// * `Err(AgendaToJsonError::SourceNotFound)` - 指定したヘッダー行が存在しない場合
    /// * `Err(AgendaToJsonError::EmptyInput)` - データ行が1件もない場合
    pub fn parse(
        &self,
        bytes: &[u8],
        layout: &TableLayout,
        security: &SecurityConfig,
    ) -> Result<SourceTable, AgendaToJsonError> {
        let text = match std::str::from_utf8(bytes) {
            Ok(text) => std::borrow::Cow::Borrowed(text),
            Err(e) => {
                warn!("Input is not valid UTF-8 ({}), replacing invalid sequences", e);
                String::from_utf8_lossy(bytes)
            }
        };
        let text = text.strip_prefix('\u{feff}').unwrap_or(&text);

        let rows: Vec<(usize, Vec<CellValue>)> = text
            .lines()
            .enumerate()
            .map(|(index, line)| {
                let cells = tokenize_line(line, self.delimiter)
                    .into_iter()
                    .map(CellValue::String)
                    .collect();
                (index, cells)
            })
            .collect();

        debug!("Tokenized {} lines", rows.len());
        SourceTable::from_rows(None, rows, layout, security)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_simple() {
        assert_eq!(tokenize_line("a,b,c", ','), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_tokenize_quoted_delimiter() {
        assert_eq!(
            tokenize_line(r#"a,"b,c",d"#, ','),
            vec!["a", "b,c", "d"]
        );
    }

    #[test]
    fn test_tokenize_doubled_quote() {
        assert_eq!(
            tokenize_line(r#""She said ""hello""",x"#, ','),
            vec![r#"She said "hello""#, "x"]
        );
    }

    #[test]
    fn test_tokenize_trims_outside_quotes_only() {
        assert_eq!(
            tokenize_line(r#"  a  ,"  padded  "  , b "#, ','),
            vec!["a", "  padded  ", "b"]
        );
    }

    #[test]
    fn test_tokenize_empty_fields() {
        assert_eq!(tokenize_line(",Opening Keynote,Keynote", ','), vec!["", "Opening Keynote", "Keynote"]);
        assert_eq!(tokenize_line("a,,", ','), vec!["a", "", ""]);
        assert_eq!(tokenize_line("", ','), vec![""]);
        assert_eq!(tokenize_line(r#""""#, ','), vec![""]);
    }

    #[test]
    fn test_tokenize_unterminated_quote_closes_at_end_of_line() {
        assert_eq!(
            tokenize_line(r#"1,"Unclosed, still one field"#, ','),
            vec!["1", "Unclosed, still one field"]
        );
    }

    #[test]
    fn test_tokenize_custom_delimiter() {
        assert_eq!(
            tokenize_line("a;\"b;c\";d", ';'),
            vec!["a", "b;c", "d"]
        );
    }

    #[test]
    fn test_tokenize_multibyte_text() {
        assert_eq!(
            tokenize_line("基調講演, \"会場 A\" ,—", ','),
            vec!["基調講演", "会場 A", "—"]
        );
    }

    #[test]
    fn test_parse_header_and_short_rows() {
        let parser = DelimitedParser::new(',');
        let input = "\u{feff}Unique ID,Session Title*,1st Filter Name\r\n\r\n,Opening Keynote\r\n";
        let table = parser
            .parse(input.as_bytes(), &TableLayout::default(), &SecurityConfig::default())
            .unwrap();

        assert_eq!(
            table.headers,
            vec!["Unique ID", "Session Title*", "1st Filter Name"]
        );
        assert_eq!(table.header_row, 0);
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0].index, 2);
        assert!(table.rows[0].cell(0).is_blank());
        assert_eq!(
            table.rows[0].cell(1),
            &CellValue::String("Opening Keynote".to_string())
        );
        // 短い行の不足分は空セル
        assert!(table.rows[0].cell(2).is_blank());
    }

    #[test]
    fn test_parse_header_only_is_empty_input() {
        let parser = DelimitedParser::new(',');
        let result = parser.parse(
            b"Unique ID,Session Title*\n\n",
            &TableLayout::default(),
            &SecurityConfig::default(),
        );
        assert!(matches!(result, Err(AgendaToJsonError::EmptyInput(_))));
    }

    #[test]
    fn test_parse_with_banner_rows() {
        let parser = DelimitedParser::new(',');
        let input = "FUSION Agenda\nExported 2025-09-02\nID,Title\n1,Welcome\n";
        let layout = TableLayout {
            header_row: Some(2),
        };
        let table = parser
            .parse(input.as_bytes(), &layout, &SecurityConfig::default())
            .unwrap();
        assert_eq!(table.headers, vec!["ID", "Title"]);
        assert_eq!(table.rows.len(), 1);
    }
}
