//! Types Module
//!
//! クレート全体で使用する共通データ型を定義するモジュール。

use serde::{Deserialize, Serialize};

/// セルの値を表す列挙型
///
/// ワークブックのセルは型付きで、区切りテキストのセルは常に`String`になります。
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum CellValue {
    /// 数値（f64）。日付セルはシリアル値として格納される
    Number(f64),

    /// 文字列
    String(String),

    /// 論理値
    Bool(bool),

    /// エラー値（例: #DIV/0!）
    Error(String),

    /// 空セル
    Empty,
}

impl CellValue {
    /// 値が実質的に空かどうかを判定
    ///
    /// 空白のみの文字列とエラー値も空として扱います。
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty | CellValue::Error(_) => true,
            CellValue::String(s) => s.trim().is_empty(),
            CellValue::Number(_) | CellValue::Bool(_) => false,
        }
    }

    /// 値をトリム済みの文字列として取得
    ///
    /// 空白のみの値、空セル、エラー値は`None`になります。
    /// 整数値の数値は小数部なしで出力します（`42.0` → `"42"`）。
    pub fn as_text(&self) -> Option<String> {
        let text = match self {
            CellValue::Number(n) => n.to_string(),
            CellValue::String(s) => s.trim().to_string(),
            CellValue::Bool(b) => b.to_string(),
            CellValue::Error(_) | CellValue::Empty => return None,
        };
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

/// 正規化済みのセッションレコード
///
/// 出力JSONの`sessions`配列の1要素です。キーはcamelCaseで、宣言順に出力されます。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub title: String,
    pub track: String,
    /// `YYYY-MM-DD`（`start`の先頭10文字）。`start`が空なら空
    pub day: String,
    pub start: String,
    pub end: String,
    pub room: String,
    pub speaker: String,
    pub level: String,
    pub description: String,
    /// 登録受付・表示フラグ
    pub reg_enabled: bool,
}

/// ドキュメントの生成メタデータ
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    /// 生成時刻（RFC 3339、UTC、ミリ秒精度）
    pub generated_at: String,
    /// 生成元のファイル名
    pub source: String,
    /// `sessions`の件数
    pub total_sessions: usize,
}

/// 出力JSONドキュメント全体
///
/// ```json
/// {
///   "metadata": { "generatedAt": "...", "source": "agenda.xlsx", "totalSessions": 1 },
///   "sessions": [ { "id": "...", "title": "...", ... } ]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgendaDocument {
    pub metadata: Metadata,
    pub sessions: Vec<Session>,
}
