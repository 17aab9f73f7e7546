//! Builder Module
//!
//! Fluent Builder APIを提供し、`Converter`インスタンスを段階的に構築する。

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use crate::api::{SheetSelector, SourceFormat};
use crate::error::{AgendaToJsonError, FieldParseFailure};
use crate::formatter::is_valid_offset_label;
use crate::mapper::{IdGenerator, RandomIdGenerator, SessionMapper};
use crate::output::generated_at;
use crate::parser::{DelimitedParser, SourceTable, TableLayout, WorkbookParser};
use crate::profile::{SourceProfile, TrackGuard};
use crate::security::SecurityConfig;
use crate::types::AgendaDocument;

/// 変換処理の設定を保持する内部構造体
#[derive(Debug, Clone)]
pub(crate) struct ConversionConfig {
    /// 列レイアウトとヘッダー位置
    pub profile: SourceProfile,

    /// `metadata.source`に記録する名前（`None`の場合は入力ファイル名）
    pub source_label: Option<String>,

    /// idのないセッションのid生成
    pub id_generator: Arc<dyn IdGenerator>,

    /// 入力サイズ・行数の上限
    pub security: SecurityConfig,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            profile: SourceProfile::default(),
            source_label: None,
            id_generator: Arc::new(RandomIdGenerator),
            security: SecurityConfig::default(),
        }
    }
}

/// Fluent Builder APIを提供する構造体
///
/// すべての設定項目にデフォルト値が設定されており、必要な設定のみをオーバーライドできます。
/// プロファイルを指定した後に個別の設定（シート、ヘッダー行など）を呼び出すと、
/// プロファイルの値を上書きします。
///
/// # 使用例
///
/// ```rust,no_run
/// use agenda_json::{ConverterBuilder, SheetSelector, SourceProfile};
///
/// # fn main() -> Result<(), agenda_json::AgendaToJsonError> {
/// let converter = ConverterBuilder::new()
///     .with_profile(SourceProfile::workbook())
///     .with_sheet_selector(SheetSelector::Name("Day 1".to_string()))
///     .with_timestamp_offset("+09:00")
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct ConverterBuilder {
    /// 内部設定（構築中）
    config: ConversionConfig,
}

impl ConverterBuilder {
    /// デフォルト設定を持つビルダーインスタンスを生成する
    ///
    /// # デフォルト設定
    ///
    /// - プロファイル: `SourceProfile::workbook()`
    /// - id生成: `RandomIdGenerator`
    /// - 入力サイズ上限: 256MB
    pub fn new() -> Self {
        Self {
            config: ConversionConfig::default(),
        }
    }

    /// 入力ソースのプロファイルを指定する
    pub fn with_profile(mut self, profile: SourceProfile) -> Self {
        self.config.profile = profile;
        self
    }

    /// 変換対象のワークシートを選択する
    ///
    /// 区切りテキストの入力では無視されます。
    pub fn with_sheet_selector(mut self, selector: SheetSelector) -> Self {
        self.config.profile.sheet = selector;
        self
    }

    /// ヘッダー行の絶対位置（0始まり）を指定する
    ///
    /// # 使用例
    ///
    /// ```rust,no_run
    /// use agenda_json::ConverterBuilder;
    ///
    /// // 2行のバナーの後、3行目がヘッダー
    /// let builder = ConverterBuilder::new().with_header_row(Some(2));
    /// ```
    pub fn with_header_row(mut self, header_row: Option<usize>) -> Self {
        self.config.profile.header_row = header_row;
        self
    }

    /// idを持たない行のid生成方法を指定する
    ///
    /// # 使用例
    ///
    /// ```rust
    /// use agenda_json::{ConverterBuilder, SequentialIdGenerator};
    ///
    /// let builder = ConverterBuilder::new()
    ///     .with_id_generator(SequentialIdGenerator::new("s-"));
    /// ```
    pub fn with_id_generator<G: IdGenerator + 'static>(mut self, generator: G) -> Self {
        self.config.id_generator = Arc::new(generator);
        self
    }

    /// `metadata.source`に記録する名前を指定する
    pub fn with_source_label(mut self, label: impl Into<String>) -> Self {
        self.config.source_label = Some(label.into());
        self
    }

    /// シリアル日付値を最も近い分に丸めるかを指定する
    pub fn with_round_to_minute(mut self, round: bool) -> Self {
        self.config.profile.round_to_minute = round;
        self
    }

    /// タイムスタンプ末尾のオフセット表記を指定する（`Z`または`±HH:MM`）
    pub fn with_timestamp_offset(mut self, offset: impl Into<String>) -> Self {
        self.config.profile.timestamp_offset = offset.into();
        self
    }

    /// trackのガードを指定する（`None`で無効）
    pub fn with_track_guard(mut self, guard: Option<TrackGuard>) -> Self {
        self.config.profile.track_guard = guard;
        self
    }

    /// 入力サイズと行数の上限を指定する
    pub fn with_security_config(mut self, security: SecurityConfig) -> Self {
        self.config.security = security;
        self
    }

    /// 設定を検証し、`Converter`インスタンスを生成する
    ///
    /// # 発生し得るエラー
    ///
    /// * `AgendaToJsonError::Config(String)`: 設定の検証に失敗した場合
    ///   * titleの列候補がない
    ///   * オフセット表記が`Z`または`±HH:MM`形式でない
    ///   * 区切り文字がダブルクォートまたは改行
    ///   * trackのガードの最大文字数が0
    pub fn build(self) -> Result<Converter, AgendaToJsonError> {
        let profile = &self.config.profile;

        // 1. 必須フィールド
        if profile.fields.title.candidates.is_empty() {
            return Err(AgendaToJsonError::Config(format!(
                "Profile '{}' has no title column candidates",
                profile.name
            )));
        }

        // 2. タイムスタンプのオフセット表記
        if !is_valid_offset_label(&profile.timestamp_offset) {
            return Err(AgendaToJsonError::Config(format!(
                "Invalid timestamp offset '{}': expected 'Z' or '±HH:MM'",
                profile.timestamp_offset
            )));
        }

        // 3. 区切り文字
        if profile.format == SourceFormat::Delimited
            && matches!(profile.delimiter, '"' | '\n' | '\r')
        {
            return Err(AgendaToJsonError::Config(format!(
                "Invalid delimiter {:?}",
                profile.delimiter
            )));
        }

        // 4. trackのガード
        if let Some(guard) = &profile.track_guard {
            if guard.max_len == 0 {
                return Err(AgendaToJsonError::Config(
                    "Track guard max_len must be greater than 0".to_string(),
                ));
            }
        }

        Ok(Converter::new(self.config))
    }
}

/// 変換処理の付随情報
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversionReport {
    /// 読み込んだワークシート（区切りテキストの場合は`None`）
    pub sheet: Option<String>,
    /// ヘッダー行の絶対位置（0始まり）
    pub header_row: usize,
    /// ヘッダー行の文字列
    pub headers: Vec<String>,
    /// 空行を除いたデータ行数
    pub data_rows: usize,
    /// titleがないために除外された行数
    pub skipped_rows: usize,
    /// 空文字列に縮退したフィールド
    pub field_failures: Vec<FieldParseFailure>,
}

/// 変換結果
#[derive(Debug, Clone, PartialEq)]
pub struct Conversion {
    pub document: AgendaDocument,
    pub report: ConversionReport,
}

/// 変換処理のファサード
///
/// 入力ソースを読み込み、`AgendaDocument`に変換します。ファイルへの保存は
/// 呼び出し側が`write_document`で行います。
///
/// # 使用例
///
/// ```rust,no_run
/// use agenda_json::{write_document, ConverterBuilder, SourceProfile};
///
/// # fn main() -> Result<(), agenda_json::AgendaToJsonError> {
/// let converter = ConverterBuilder::new()
///     .with_profile(SourceProfile::csv_export())
///     .build()?;
/// let conversion = converter.convert_file("agenda.csv")?;
/// write_document(&conversion.document, "agenda.json")?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Converter {
    /// 変換設定
    config: ConversionConfig,
}

impl Converter {
    pub(crate) fn new(config: ConversionConfig) -> Self {
        Self { config }
    }

    pub fn profile(&self) -> &SourceProfile {
        &self.config.profile
    }

    /// ファイルを変換する
    ///
    /// `metadata.source`にはソースラベル、未指定の場合はファイル名を記録します。
    ///
    /// # 戻り値
    ///
    /// * `Err(AgendaToJsonError::SourceNotFound)` - ファイルが存在しない、または読み込めない場合
    /// * その他は`convert`と同じ
    pub fn convert_file<P: AsRef<Path>>(&self, path: P) -> Result<Conversion, AgendaToJsonError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| unreadable_input(path, e))?;

        let source_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        // convertのI/Oエラーは入力の読み込みからのみ発生する
        self.convert(file, &source_name).map_err(|e| match e {
            AgendaToJsonError::Io(io) => unreadable_input(path, io),
            other => other,
        })
    }

    /// 入力ソースを変換する
    ///
    /// # 引数
    ///
    /// * `input` - 入力データのリーダー（全体をメモリに読み込みます）
    /// * `source_name` - ソースラベル未指定時に`metadata.source`へ記録する名前
    ///
    /// # 戻り値
    ///
    /// * `Ok(Conversion)` - ドキュメントと付随情報
    /// * `Err(AgendaToJsonError::SourceNotFound)` - ワークシートまたはヘッダー行が存在しない場合
    /// * `Err(AgendaToJsonError::EmptyInput)` - データ行、または有効なセッションが1件もない場合
    /// * `Err(AgendaToJsonError::Parse)` - ワークブックの形式が不正な場合
    /// * `Err(AgendaToJsonError::SecurityViolation)` - 入力サイズ・行数が上限を超えた場合
    ///
    /// # 処理フロー
    ///
    /// 1. 入力データをメモリに読み込む
    /// 2. 形式に応じてパースし、`SourceTable`を構築
    /// 3. 各行を`Session`に正規化
    /// 4. `AgendaDocument`を組み立てる
    pub fn convert<R: Read>(
        &self,
        input: R,
        source_name: &str,
    ) -> Result<Conversion, AgendaToJsonError> {
        let profile = &self.config.profile;

        // 1. 入力データの読み込み
        let buffer = self.config.security.read_limited(input)?;
        debug!(
            "Read {} bytes from '{}' using profile '{}'",
            buffer.len(),
            source_name,
            profile.name
        );

        // 2. パース
        let table = self.parse(buffer)?;

        // 3. 正規化
        let mapper = SessionMapper::new(profile, &table.headers, self.config.id_generator.as_ref());
        let mapped = mapper.map_table(&table);
        if mapped.sessions.is_empty() {
            return Err(AgendaToJsonError::EmptyInput(format!(
                "none of the {} data rows in '{}' has a title",
                table.rows.len(),
                source_name
            )));
        }
        info!(
            "Mapped {} sessions from {} rows ({} skipped, {} field failures)",
            mapped.sessions.len(),
            table.rows.len(),
            mapped.skipped_rows,
            mapped.failures.len()
        );

        // 4. ドキュメントの組み立て
        let source = self
            .config
            .source_label
            .clone()
            .unwrap_or_else(|| source_name.to_string());
        let document = AgendaDocument::assemble(mapped.sessions, source, generated_at(Utc::now()));

        Ok(Conversion {
            document,
            report: ConversionReport {
                data_rows: table.rows.len(),
                sheet: table.sheet,
                header_row: table.header_row,
                headers: table.headers,
                skipped_rows: mapped.skipped_rows,
                field_failures: mapped.failures,
            },
        })
    }

    fn parse(&self, buffer: Vec<u8>) -> Result<SourceTable, AgendaToJsonError> {
        let profile = &self.config.profile;
        let layout = TableLayout {
            header_row: profile.header_row,
        };

        match profile.format {
            SourceFormat::Delimited => {
                DelimitedParser::new(profile.delimiter).parse(&buffer, &layout, &self.config.security)
            }
            SourceFormat::Workbook => {
                let mut parser = WorkbookParser::open(buffer)?;
                parser.parse_sheet(&profile.sheet, &layout, &self.config.security)
            }
        }
    }
}

fn unreadable_input(path: &Path, error: io::Error) -> AgendaToJsonError {
    AgendaToJsonError::SourceNotFound(format!(
        "input file '{}' could not be read: {}",
        path.display(),
        error
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapper::SequentialIdGenerator;
    use crate::profile::FieldRule;
    use std::io::Cursor;

    fn csv_converter() -> Converter {
        ConverterBuilder::new()
            .with_profile(SourceProfile::csv_export())
            .with_id_generator(SequentialIdGenerator::new("s-"))
            .build()
            .unwrap()
    }

    #[test]
    fn test_converter_builder_new() {
        let builder = ConverterBuilder::new();
        assert_eq!(builder.config.profile, SourceProfile::workbook());
        assert_eq!(builder.config.source_label, None);
    }

    #[test]
    fn test_builder_overrides_profile_fields() {
        let builder = ConverterBuilder::new()
            .with_profile(SourceProfile::agenda_sheet())
            .with_sheet_selector(SheetSelector::Index(1))
            .with_header_row(None)
            .with_round_to_minute(false)
            .with_timestamp_offset("Z")
            .with_track_guard(None);
        let profile = &builder.config.profile;
        assert_eq!(profile.name, "agenda");
        assert_eq!(profile.sheet, SheetSelector::Index(1));
        assert_eq!(profile.header_row, None);
        assert!(!profile.round_to_minute);
        assert_eq!(profile.timestamp_offset, "Z");
        assert_eq!(profile.track_guard, None);
    }

    #[test]
    fn test_build_rejects_invalid_offset() {
        let result = ConverterBuilder::new().with_timestamp_offset("PDT").build();
        assert!(matches!(result, Err(AgendaToJsonError::Config(_))));
    }

    #[test]
    fn test_build_rejects_profile_without_title() {
        let mut profile = SourceProfile::csv_export();
        profile.fields.title = FieldRule::default();
        let result = ConverterBuilder::new().with_profile(profile).build();
        match result {
            Err(AgendaToJsonError::Config(msg)) => assert!(msg.contains("title")),
            other => panic!("Expected Config error, got {:?}", other),
        }
    }

    #[test]
    fn test_build_rejects_quote_delimiter() {
        let mut profile = SourceProfile::csv_export();
        profile.delimiter = '"';
        let result = ConverterBuilder::new().with_profile(profile).build();
        assert!(matches!(result, Err(AgendaToJsonError::Config(_))));
    }

    #[test]
    fn test_build_rejects_zero_track_guard() {
        let result = ConverterBuilder::new()
            .with_track_guard(Some(TrackGuard {
                max_len: 0,
                ..Default::default()
            }))
            .build();
        assert!(matches!(result, Err(AgendaToJsonError::Config(_))));
    }

    #[test]
    fn test_convert_csv_keynote() {
        let input = "Unique ID,Session Title*,1st Filter Name\n\n,Opening Keynote,Keynote\n";
        let conversion = csv_converter()
            .convert(Cursor::new(input), "agenda.csv")
            .unwrap();

        let document = &conversion.document;
        assert_eq!(document.metadata.source, "agenda.csv");
        assert_eq!(document.metadata.total_sessions, 1);
        assert!(document.metadata.generated_at.ends_with('Z'));

        let session = &document.sessions[0];
        assert_eq!(session.id, "s-1");
        assert_eq!(session.title, "Opening Keynote");
        assert_eq!(session.track, "Keynote");
        assert!(session.reg_enabled);

        let report = &conversion.report;
        assert_eq!(report.sheet, None);
        assert_eq!(report.data_rows, 1);
        assert_eq!(report.skipped_rows, 0);
        assert_eq!(report.headers.len(), 3);
    }

    #[test]
    fn test_convert_source_label() {
        let converter = ConverterBuilder::new()
            .with_profile(SourceProfile::csv_export())
            .with_source_label("FUSION 2025 export")
            .build()
            .unwrap();
        let conversion = converter
            .convert(Cursor::new("Session Title*\nWelcome\n"), "upload.csv")
            .unwrap();
        assert_eq!(conversion.document.metadata.source, "FUSION 2025 export");
    }

    #[test]
    fn test_convert_all_rows_untitled_is_empty_input() {
        let input = "Unique ID,Session Title*\nS-1,\nS-2,  \n";
        let result = csv_converter().convert(Cursor::new(input), "agenda.csv");
        assert!(matches!(result, Err(AgendaToJsonError::EmptyInput(_))));
    }

    #[test]
    fn test_convert_header_only_is_empty_input() {
        let result = csv_converter().convert(Cursor::new("Unique ID,Session Title*\n"), "agenda.csv");
        assert!(matches!(result, Err(AgendaToJsonError::EmptyInput(_))));
    }

    #[test]
    fn test_convert_input_size_limit() {
        let converter = ConverterBuilder::new()
            .with_profile(SourceProfile::csv_export())
            .with_security_config(SecurityConfig {
                max_input_file_size: 8,
                ..Default::default()
            })
            .build()
            .unwrap();
        let result = converter.convert(Cursor::new("Session Title*\nWelcome\n"), "agenda.csv");
        assert!(matches!(
            result,
            Err(AgendaToJsonError::SecurityViolation(_))
        ));
    }

    #[test]
    fn test_convert_invalid_workbook() {
        let converter = ConverterBuilder::new().build().unwrap();
        let result = converter.convert(Cursor::new(b"plain text".to_vec()), "agenda.xlsx");
        assert!(matches!(result, Err(AgendaToJsonError::Parse(_))));
    }

    #[test]
    fn test_convert_file_not_found() {
        let result = csv_converter().convert_file("/nonexistent/agenda.csv");
        assert!(matches!(result, Err(AgendaToJsonError::SourceNotFound(_))));
    }

    #[test]
    fn test_convert_file_unreadable_is_source_not_found() {
        // ディレクトリはオープンできても読み込みに失敗する
        let dir = tempfile::tempdir().unwrap();
        match csv_converter().convert_file(dir.path()) {
            Err(AgendaToJsonError::SourceNotFound(msg)) => {
                assert!(msg.contains("could not be read"), "{}", msg);
            }
            other => panic!("Expected SourceNotFound, got {:?}", other),
        }
    }
}
