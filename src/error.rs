//! Error Types Module
//!
//! クレート全体で使用する構造化エラー型を定義するモジュール。
//! `thiserror`を使用して、エラーの自動変換とメッセージフォーマットを実現する。
//!
//! 変換処理全体を中断する致命的なエラーは`AgendaToJsonError`で表し、
//! 行・フィールド単位の非致命的な失敗は`FieldParseFailure`として収集する。

use std::fmt;

use thiserror::Error;

/// agenda-jsonクレート全体で使用するエラー型
///
/// このエラー型は、入力ファイルの読み込み、解析、JSON出力処理中に発生する
/// 致命的なエラーを統一的に扱うために使用されます。
///
/// # エラーの種類
///
/// - `SourceNotFound`: 入力ファイル、ワークシート、ヘッダー行が見つからない
/// - `EmptyInput`: 入力は解析できたが、有効なデータ行が1件もない
/// - `Io`: I/O操作中に発生したエラー（書き込み失敗など）
/// - `Parse`: スプレッドシートの解析中に発生したエラー（calamine由来）
/// - `Json`: JSONのシリアライズ・デシリアライズ中に発生したエラー
/// - `Config`: 設定の検証に失敗したエラー
/// - `SecurityViolation`: 入力サイズ制限などに違反したエラー
///
/// # 使用例
///
/// ```rust,no_run
/// use agenda_json::{AgendaToJsonError, ConverterBuilder};
///
/// fn run() -> Result<(), AgendaToJsonError> {
///     let converter = ConverterBuilder::new().build()?;
///     let conversion = converter.convert_file("agenda.xlsx")?;
///     println!("{} sessions", conversion.document.sessions.len());
///     Ok(())
/// }
/// ```
#[derive(Error, Debug)]
pub enum AgendaToJsonError {
    /// 入力ソースが見つからないエラー
    ///
    /// 入力ファイルが存在しない・読み込めない場合、指定したワークシートが
    /// ワークブックに存在しない場合、ヘッダー行が存在しない場合に発生します。
    #[error("Source not found: {0}")]
    SourceNotFound(String),

    /// 有効なデータ行が存在しないエラー
    ///
    /// ヘッダー行以降にデータ行が1件もない場合、またはすべての行が
    /// タイトル欠落により除外された場合に発生します。
    #[error("Empty input: {0}")]
    EmptyInput(String),

    /// I/O操作中に発生したエラー
    ///
    /// `#[from]`属性により、`std::io::Error`から自動的に変換されます。
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// スプレッドシートの解析中に発生したエラー
    ///
    /// calamineクレートがワークブックを解析する際に発生したエラーです。
    /// ファイル形式が不正、破損したファイル、サポートされていない形式などが
    /// 原因となります。
    #[error("Failed to parse spreadsheet: {0}")]
    Parse(#[from] calamine::Error),

    /// JSONの読み書きエラー
    ///
    /// 出力ドキュメントのシリアライズ、既存の`agenda.json`の読み込み、
    /// プロファイルファイルの読み込みに失敗した場合に発生します。
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// 設定の検証に失敗したエラー
    ///
    /// `ConverterBuilder::build()`時に設定を検証し、無効な設定が検出された
    /// 場合に発生します。例えば、タイトル列の候補が空の場合や、
    /// タイムスタンプのオフセット表記が不正な場合などです。
    ///
    /// # 例
    ///
    /// ```rust,no_run
    /// use agenda_json::{AgendaToJsonError, ConverterBuilder};
    ///
    /// let result = ConverterBuilder::new()
    ///     .with_timestamp_offset("PST")
    ///     .build();
    ///
    /// match result {
    ///     Err(AgendaToJsonError::Config(msg)) => {
    ///         println!("設定エラー: {}", msg);
    ///     }
    ///     _ => {}
    /// }
    /// ```
    #[error("Configuration error: {0}")]
    Config(String),

    /// セキュリティ制限に違反したエラー
    ///
    /// 入力ファイルのサイズ制限などに違反した場合に発生します。
    #[error("Security violation: {0}")]
    SecurityViolation(String),
}

/// 行単位で吸収される非致命的なフィールド解析失敗
///
/// 日付の解析に失敗したフィールドは空文字列に縮退し、変換処理は継続します。
/// 失敗内容は`ConversionReport`に記録され、`tracing::warn!`でも出力されます。
#[derive(Debug, Clone, PartialEq)]
pub struct FieldParseFailure {
    /// 失敗が発生した行（ソース上の0始まりの行番号）
    pub row: usize,
    /// 失敗したフィールド名（`start`、`end`など）
    pub field: &'static str,
    /// 解析できなかった元の値
    pub raw: String,
    /// 失敗の理由
    pub reason: String,
}

impl fmt::Display for FieldParseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "row {}: could not parse {} from '{}' ({})",
            self.row, self.field, self.raw, self.reason
        )
    }
}
