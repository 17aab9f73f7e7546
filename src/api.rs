//! Public API Types
//!
//! 公開APIで使用する列挙型を定義するモジュール。

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// ワークシート選択方式
///
/// ワークブック形式の入力で、変換対象のワークシートを選択する方法を指定します。
/// 区切りテキスト形式の入力では無視されます。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum SheetSelector {
    /// インデックス指定（0始まり）
    ///
    /// 例: `SheetSelector::Index(0)` は最初のシートを選択
    Index(usize),

    /// シート名指定
    ///
    /// 例: `SheetSelector::Name("Agenda".to_string())`
    Name(String),
}

impl Default for SheetSelector {
    fn default() -> Self {
        SheetSelector::Index(0)
    }
}

impl fmt::Display for SheetSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SheetSelector::Index(index) => write!(f, "sheet #{}", index),
            SheetSelector::Name(name) => write!(f, "sheet '{}'", name),
        }
    }
}

/// 入力ソースの形式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum SourceFormat {
    /// スプレッドシートのワークブック（XLSX/XLSM/XLS/ODS）
    ///
    /// calamineでワークシートを読み込みます。日付セルはシリアル値として扱います。
    Workbook,

    /// 区切りテキスト（CSV）
    ///
    /// 1行ずつトークナイズします。すべてのセルは文字列として扱います。
    Delimited,
}

impl SourceFormat {
    /// ファイル拡張子から入力形式を推定する
    ///
    /// `.csv`/`.txt`/`.tsv`は区切りテキスト、それ以外はワークブックとして扱います。
    pub fn from_path<P: AsRef<Path>>(path: P) -> Self {
        let extension = path
            .as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());

        match extension.as_deref() {
            Some("csv") | Some("txt") | Some("tsv") => SourceFormat::Delimited,
            _ => SourceFormat::Workbook,
        }
    }
}

/// 列の指定方法
///
/// プロファイルの各フィールドは、候補となる列を順番に列挙します。
/// ヘッダー文字列で指定する方法と、0始まりの列インデックスで指定する方法があります。
///
/// JSONでは、文字列はヘッダー名、数値は列インデックスとして解釈されます。
///
/// ```json
/// { "candidates": ["Session Title*", "Session Title"] }
/// { "candidates": [1] }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnKey {
    /// 列インデックス（0始まり）
    ///
    /// エクスポートごとにヘッダー文字列が揺れるソースで使用します。
    Index(usize),

    /// ヘッダー文字列（前後の空白を除いて完全一致）
    Header(String),
}

impl ColumnKey {
    /// ヘッダー名で列を指定する
    pub fn header(name: impl Into<String>) -> Self {
        ColumnKey::Header(name.into())
    }

    /// 列インデックスで列を指定する
    pub fn index(index: usize) -> Self {
        ColumnKey::Index(index)
    }

    /// ヘッダー行に対して列位置を解決する
    ///
    /// ヘッダー名がヘッダー行に存在しない場合は`None`を返します。
    /// 同名のヘッダーが複数ある場合は、最初の列を採用します。
    pub fn resolve(&self, headers: &[String]) -> Option<usize> {
        match self {
            ColumnKey::Index(index) => Some(*index),
            ColumnKey::Header(name) => {
                let name = name.trim();
                headers.iter().position(|header| header == name)
            }
        }
    }
}

impl fmt::Display for ColumnKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnKey::Index(index) => write!(f, "column #{}", index),
            ColumnKey::Header(name) => write!(f, "column '{}'", name.escape_debug()),
        }
    }
}

impl From<&str> for ColumnKey {
    fn from(name: &str) -> Self {
        ColumnKey::Header(name.to_string())
    }
}

impl From<usize> for ColumnKey {
    fn from(index: usize) -> Self {
        ColumnKey::Index(index)
    }
}
