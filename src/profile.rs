//! Source Profile Module
//!
//! 入力ソースごとの列レイアウトを「データ」として表すモジュール。
//!
//! プロファイルは、論理フィールド（id、title、trackなど）ごとに
//! 候補となる列（ヘッダー名または列インデックス）を優先順に列挙し、
//! 値が得られなかった場合のデフォルト値を指定します。
//! 新しいエクスポート形式への対応は、コードの追加ではなくプロファイルの追加で行います。

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::api::{ColumnKey, SheetSelector, SourceFormat};
use crate::error::AgendaToJsonError;

/// trackの既定値
pub const DEFAULT_TRACK: &str = "General";
/// levelの既定値
pub const DEFAULT_LEVEL: &str = "All";
/// room・speakerの既定値（プレースホルダー）
pub const PLACEHOLDER: &str = "—";
/// タイムスタンプのオフセット表記の既定値
pub const DEFAULT_TIMESTAMP_OFFSET: &str = "-07:00";

/// 1つの論理フィールドの列候補と既定値
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRule {
    /// 優先順の列候補。最初に空でない値が得られた列を採用する
    #[serde(default)]
    pub candidates: Vec<ColumnKey>,

    /// どの候補からも値が得られなかった場合の値
    #[serde(default)]
    pub default: String,
}

impl FieldRule {
    pub fn new<K, I>(candidates: I, default: impl Into<String>) -> Self
    where
        K: Into<ColumnKey>,
        I: IntoIterator<Item = K>,
    {
        Self {
            candidates: candidates.into_iter().map(Into::into).collect(),
            default: default.into(),
        }
    }

    /// 既定値なし（空文字列）のルール
    pub fn optional<K, I>(candidates: I) -> Self
    where
        K: Into<ColumnKey>,
        I: IntoIterator<Item = K>,
    {
        Self::new(candidates, "")
    }
}

/// セッションレコードの各フィールドに対応する列ルール
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMap {
    #[serde(default)]
    pub id: FieldRule,
    #[serde(default)]
    pub title: FieldRule,
    #[serde(default)]
    pub track: FieldRule,
    #[serde(default)]
    pub level: FieldRule,
    #[serde(default)]
    pub room: FieldRule,
    #[serde(default)]
    pub speaker: FieldRule,
    #[serde(default)]
    pub description: FieldRule,
    #[serde(default)]
    pub start: FieldRule,
    #[serde(default)]
    pub end: FieldRule,

    /// 明示的な有効/無効フラグの列候補（`Enabled`、`1`、`yes`など）
    #[serde(default)]
    pub enabled: Vec<ColumnKey>,

    /// 表示ラベルの列候補（`Visible` / `Hidden`）
    ///
    /// `enabled`から値が得られなかった場合にのみ参照します。
    #[serde(default)]
    pub visibility: Vec<ColumnKey>,
}

/// 集約列の誤選択に対するtrackのガード
///
/// trackの値が`max_len`文字を超えるか、カンマを含む場合は、複数の値が連結された
/// 集約列を誤って選んだものとみなし、タイトルの接頭辞から代替ラベルを決めます。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackGuard {
    /// 許容するtrackの最大文字数
    #[serde(default = "default_track_max_len")]
    pub max_len: usize,

    /// 代替ラベルを割り当てるタイトルの接頭辞
    #[serde(default = "default_track_prefix")]
    pub prefix: String,

    /// 接頭辞に一致した場合のtrack
    #[serde(default = "default_track_prefix_label")]
    pub prefix_label: String,
}

fn default_track_max_len() -> usize {
    50
}

fn default_track_prefix() -> String {
    "Agentic Labs:".to_string()
}

fn default_track_prefix_label() -> String {
    "Lab".to_string()
}

impl Default for TrackGuard {
    fn default() -> Self {
        Self {
            max_len: default_track_max_len(),
            prefix: default_track_prefix(),
            prefix_label: default_track_prefix_label(),
        }
    }
}

impl TrackGuard {
    /// trackの値が集約列由来と判断されるかどうか
    pub fn is_degenerate(&self, track: &str) -> bool {
        track.chars().count() > self.max_len || track.contains(',')
    }

    /// 代替のtrackを決める
    ///
    /// タイトルが接頭辞で始まる場合は`prefix_label`、それ以外は`fallback`を返します。
    pub fn replacement<'a>(&'a self, title: &str, fallback: &'a str) -> &'a str {
        if !self.prefix.is_empty() && title.starts_with(&self.prefix) {
            &self.prefix_label
        } else {
            fallback
        }
    }
}

fn default_delimiter() -> char {
    ','
}

fn default_timestamp_offset() -> String {
    DEFAULT_TIMESTAMP_OFFSET.to_string()
}

/// 入力ソースのプロファイル
///
/// # 使用例
///
/// ```rust
/// use agenda_json::{ColumnKey, SourceProfile};
///
/// let mut profile = SourceProfile::csv_export();
/// profile.fields.room.candidates.push(ColumnKey::header("Venue"));
/// assert_eq!(profile.fields.room.default, "—");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceProfile {
    /// プロファイル名（ログ出力用）
    pub name: String,

    /// 入力形式
    pub format: SourceFormat,

    /// ワークシート選択（ワークブックのみ）
    #[serde(default)]
    pub sheet: SheetSelector,

    /// ヘッダー行の絶対位置（0始まり）。`None`は最初の空でない行
    #[serde(default)]
    pub header_row: Option<usize>,

    /// 区切り文字（区切りテキストのみ）
    #[serde(default = "default_delimiter")]
    pub delimiter: char,

    /// シリアル日付値を最も近い分に丸めるかどうか
    #[serde(default)]
    pub round_to_minute: bool,

    /// タイムスタンプ末尾のオフセット表記
    #[serde(default = "default_timestamp_offset")]
    pub timestamp_offset: String,

    /// trackのガード（`None`の場合は無効）
    #[serde(default)]
    pub track_guard: Option<TrackGuard>,

    /// フィールドごとの列ルール
    pub fields: FieldMap,
}

impl SourceProfile {
    /// `Agenda`シート用のプロファイル
    ///
    /// 3行目（0始まりで2）がヘッダーで、ヘッダー文字列がエクスポートごとに揺れるため
    /// 列インデックスで参照します。シリアル日付値は分単位に丸めます。
    pub fn agenda_sheet() -> Self {
        Self {
            name: "agenda".to_string(),
            format: SourceFormat::Workbook,
            sheet: SheetSelector::Name("Agenda".to_string()),
            header_row: Some(2),
            delimiter: default_delimiter(),
            round_to_minute: true,
            timestamp_offset: default_timestamp_offset(),
            track_guard: Some(TrackGuard::default()),
            fields: FieldMap {
                id: FieldRule::optional([0usize]),
                title: FieldRule::optional([1usize]),
                description: FieldRule::optional([2usize]),
                start: FieldRule::optional([4usize]),
                end: FieldRule::optional([5usize]),
                visibility: vec![ColumnKey::index(6)],
                speaker: FieldRule::new([7usize], PLACEHOLDER),
                room: FieldRule::new([8usize], PLACEHOLDER),
                // 4th Filter Name
                track: FieldRule::new([26usize], DEFAULT_TRACK),
                level: FieldRule::new([33usize], DEFAULT_LEVEL),
                enabled: Vec::new(),
            },
        }
    }

    /// 汎用ワークブック用のプロファイル
    ///
    /// 先頭のシートの3行目をヘッダーとし、ヘッダー名で列を参照します。
    pub fn workbook() -> Self {
        Self {
            name: "workbook".to_string(),
            format: SourceFormat::Workbook,
            sheet: SheetSelector::Index(0),
            header_row: Some(2),
            delimiter: default_delimiter(),
            round_to_minute: false,
            timestamp_offset: default_timestamp_offset(),
            track_guard: Some(TrackGuard::default()),
            fields: FieldMap {
                id: FieldRule::optional(["Unique ID"]),
                title: FieldRule::optional(["Session Title*", "Session Title"]),
                track: FieldRule::new(["1st Filter Name", "Track"], DEFAULT_TRACK),
                start: FieldRule::optional([
                    "Start Date & Time\nMM/DD/YYYY 12H",
                    "Start Date & Time",
                    "Start",
                ]),
                end: FieldRule::optional([
                    "End Date & Time\nMM/DD/YYYY 12H",
                    "End Date & Time",
                    "End",
                ]),
                room: FieldRule::new(["Sessions Main Location", "Room"], PLACEHOLDER),
                speaker: FieldRule::new(["(Email, Session-Role)", "Speaker"], PLACEHOLDER),
                level: FieldRule::new(["2nd Filter Name", "Level"], DEFAULT_LEVEL),
                description: FieldRule::optional(["Description"]),
                enabled: vec![
                    ColumnKey::header("Session Registration (Enabled/Disabled)"),
                    ColumnKey::header("Enabled"),
                ],
                visibility: Vec::new(),
            },
        }
    }

    /// CSVエクスポート用のプロファイル
    ///
    /// 最初の空でない行をヘッダーとします。CSVでは改行を含むヘッダーが
    /// `\n`という2文字で書き出されるため、その表記も候補に含めます。
    pub fn csv_export() -> Self {
        Self {
            name: "csv".to_string(),
            format: SourceFormat::Delimited,
            sheet: SheetSelector::default(),
            header_row: None,
            delimiter: default_delimiter(),
            round_to_minute: false,
            timestamp_offset: default_timestamp_offset(),
            track_guard: Some(TrackGuard::default()),
            fields: FieldMap {
                id: FieldRule::optional(["Unique ID"]),
                title: FieldRule::optional(["Session Title*", "Session Title"]),
                track: FieldRule::new(["1st Filter Name"], DEFAULT_TRACK),
                start: FieldRule::optional([
                    "Start Date & Time\\nMM/DD/YYYY 12H",
                    "Start Date & Time\nMM/DD/YYYY 12H",
                    "Start Date & Time",
                ]),
                end: FieldRule::optional([
                    "End Date & Time\\nMM/DD/YYYY 12H",
                    "End Date & Time\nMM/DD/YYYY 12H",
                    "End Date & Time",
                ]),
                room: FieldRule::new(["Sessions Main Location"], PLACEHOLDER),
                speaker: FieldRule::new(["(Email, Session-Role)"], PLACEHOLDER),
                level: FieldRule::new(["2nd Filter Name"], DEFAULT_LEVEL),
                description: FieldRule::optional(["Description"]),
                enabled: vec![
                    ColumnKey::header("Session Registration (Enabled/Disabled)"),
                    ColumnKey::header("Enabled"),
                ],
                visibility: Vec::new(),
            },
        }
    }

    /// 名前から組み込みプロファイルを取得する
    ///
    /// `agenda`、`workbook`、`csv`のいずれか（大文字小文字は区別しない）。
    pub fn preset(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "agenda" => Some(Self::agenda_sheet()),
            "workbook" | "excel" => Some(Self::workbook()),
            "csv" => Some(Self::csv_export()),
            _ => None,
        }
    }

    /// 入力ファイルの拡張子から既定のプロファイルを選ぶ
    ///
    /// `.tsv`はCSVプロファイルの区切り文字をタブに置き換えたものになります。
    pub fn for_path<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match SourceFormat::from_path(path) {
            SourceFormat::Delimited => {
                let mut profile = Self::csv_export();
                let is_tsv = path
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("tsv"));
                if is_tsv {
                    profile.delimiter = '\t';
                }
                profile
            }
            _ => Self::workbook(),
        }
    }

    /// JSON文字列からプロファイルを読み込む
    pub fn from_json_str(json: &str) -> Result<Self, AgendaToJsonError> {
        Ok(serde_json::from_str(json)?)
    }

    /// JSONファイルからプロファイルを読み込む
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, AgendaToJsonError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            AgendaToJsonError::SourceNotFound(format!(
                "profile file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json_str(&json)
    }
}

impl Default for SourceProfile {
    fn default() -> Self {
        Self::workbook()
    }
}
