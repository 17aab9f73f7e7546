//! Formatter Module
//!
//! 日時セルの変換とフォーマット処理を提供するモジュール。
//!
//! - 数値セル: スプレッドシートのシリアル日付値（1900年エポック）として変換
//! - 文字列セル: 既知のカレンダー書式を順に試して解析
//!
//! 変換に失敗したフィールドは空として扱い、変換処理全体は中断しません。

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Utc};

use crate::types::CellValue;

/// シリアル値0（1899年12月30日）からUnixエポックまでの日数
///
/// Excelの1900年うるう年バグを含んだ値です。
pub(crate) const UNIX_EPOCH_SERIAL: f64 = 25569.0;

const MILLIS_PER_DAY: f64 = 86_400_000.0;
const MILLIS_PER_MINUTE: f64 = 60_000.0;

/// 表現可能な時刻の上限（±1億日、ミリ秒）
const MAX_ABS_MILLIS: f64 = 8.64e15;

/// 時刻付きの文字列書式（空白は1つに正規化してから照合する）
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%d %I:%M %p",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %I:%M %p",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%B %d, %Y %I:%M %p",
    "%b %d, %Y %I:%M %p",
];

/// 日付のみの文字列書式（UTCの0時として扱う）
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%B %d, %Y", "%b %d, %Y"];

/// 日時変換器
///
/// シリアル値・文字列を`DateTime<Utc>`に変換し、出力用の固定オフセット表記に整形します。
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DateConverter {
    /// シリアル値の変換結果を最も近い分に丸めるかどうか
    round_to_minute: bool,

    /// タイムスタンプ末尾に付与するオフセット表記（例: `-07:00`）
    offset_label: String,
}

impl DateConverter {
    pub fn new(round_to_minute: bool, offset_label: impl Into<String>) -> Self {
        Self {
            round_to_minute,
            offset_label: offset_label.into(),
        }
    }

    /// シリアル日付値を時刻に変換する
    ///
    /// `instant_ms = (serial − 25569) × 86 400 000`
    ///
    /// 丸めが有効な場合は`round(instant_ms / 60000) × 60000`とし、
    /// 14:59:59.999のような浮動小数点誤差を15:00:00.000に吸収します。
    /// 丸めが無効な場合、端数のミリ秒は切り捨てます。
    ///
    /// # 戻り値
    ///
    /// * `Ok(DateTime<Utc>)` - 変換に成功した場合
    /// * `Err(String)` - 非有限値、または表現可能な範囲（西暦1〜9999年）外の場合
    pub fn serial_to_instant(&self, serial: f64) -> Result<DateTime<Utc>, String> {
        let mut millis = (serial - UNIX_EPOCH_SERIAL) * MILLIS_PER_DAY;
        if self.round_to_minute {
            millis = (millis / MILLIS_PER_MINUTE).round() * MILLIS_PER_MINUTE;
        }

        if !millis.is_finite() || millis.abs() > MAX_ABS_MILLIS {
            return Err(format!("serial value {} is out of range", serial));
        }

        let instant = DateTime::from_timestamp_millis(millis.trunc() as i64)
            .ok_or_else(|| format!("serial value {} is out of range", serial))?;
        ensure_four_digit_year(instant)
    }

    /// 文字列を時刻に変換する
    ///
    /// RFC 3339（オフセット付き）を最初に試し、次にオフセットなしの書式を
    /// UTCの壁時計時刻として解釈します。いずれにも一致しなければ`None`を返します。
    pub fn parse_text(&self, text: &str) -> Option<DateTime<Utc>> {
        let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
        if normalized.is_empty() {
            return None;
        }

        if let Ok(instant) = DateTime::parse_from_rfc3339(&normalized) {
            return ensure_four_digit_year(instant.with_timezone(&Utc)).ok();
        }

        let naive = DATETIME_FORMATS
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(&normalized, format).ok())
            .or_else(|| {
                DATE_FORMATS.iter().find_map(|format| {
                    NaiveDate::parse_from_str(&normalized, format)
                        .ok()
                        .and_then(|date| date.and_hms_opt(0, 0, 0))
                })
            })?;

        ensure_four_digit_year(naive.and_utc()).ok()
    }

    /// セル値を時刻に変換する
    ///
    /// # 戻り値
    ///
    /// * `Ok(Some(DateTime<Utc>))` - 変換に成功した場合
    /// * `Ok(None)` - セルが空の場合
    /// * `Err(String)` - 値はあるが日時として解釈できない場合（理由を返す）
    pub fn convert_cell(&self, cell: &CellValue) -> Result<Option<DateTime<Utc>>, String> {
        match cell {
            CellValue::Number(serial) => self.serial_to_instant(*serial).map(Some),
            CellValue::String(text) if text.trim().is_empty() => Ok(None),
            CellValue::String(text) => self
                .parse_text(text)
                .map(Some)
                .ok_or_else(|| "unrecognized date format".to_string()),
            CellValue::Bool(_) => Err("boolean is not a date".to_string()),
            CellValue::Error(_) | CellValue::Empty => Ok(None),
        }
    }

    /// 時刻を出力用の文字列に整形する
    ///
    /// UTCの日時をミリ秒精度で出力し、末尾の`Z`の代わりにオフセット表記を付与します。
    /// 例: `2025-09-02T15:00:00.000-07:00`
    pub fn format(&self, instant: &DateTime<Utc>) -> String {
        format!(
            "{}{}",
            instant.format("%Y-%m-%dT%H:%M:%S%.3f"),
            self.offset_label
        )
    }
}

impl Default for DateConverter {
    fn default() -> Self {
        Self::new(false, "-07:00")
    }
}

/// `YYYY-MM-DD`の10文字で表せる年かどうかを検証する
fn ensure_four_digit_year(instant: DateTime<Utc>) -> Result<DateTime<Utc>, String> {
    if (1..=9999).contains(&instant.year()) {
        Ok(instant)
    } else {
        Err(format!("year {} is out of range", instant.year()))
    }
}

/// オフセット表記が`Z`または`±HH:MM`形式かどうかを検証する
pub(crate) fn is_valid_offset_label(label: &str) -> bool {
    if label == "Z" {
        return true;
    }
    let bytes = label.as_bytes();
    bytes.len() == 6
        && (bytes[0] == b'+' || bytes[0] == b'-')
        && bytes[1].is_ascii_digit()
        && bytes[2].is_ascii_digit()
        && bytes[3] == b':'
        && bytes[4].is_ascii_digit()
        && bytes[5].is_ascii_digit()
        && &label[1..3] <= "23"
        && &label[4..6] <= "59"
}
