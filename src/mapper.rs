//! Session Mapper Module
//!
//! `SourceTable`の各行を、プロファイルの列ルールに従って`Session`に正規化するモジュール。
//!
//! # 正規化ルール
//!
//! - id: 最初の空でない候補列、なければ`IdGenerator`で生成
//! - title: 最初の空でない候補列、なければ行をスキップ（唯一の除外条件）
//! - track/level/room/speaker/description: 最初の空でない候補列、なければ既定値
//! - start/end: 最初に日時として解釈できた候補列、すべて失敗した場合は空文字列
//! - regEnabled: 明示的な有効/無効フラグ、なければ表示ラベル、どちらもなければ`true`

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use rand::Rng;
use tracing::{debug, warn};

use crate::error::FieldParseFailure;
use crate::formatter::DateConverter;
use crate::parser::{SourceRow, SourceTable};
use crate::profile::{FieldRule, SourceProfile, TrackGuard};
use crate::types::{CellValue, Session};

/// ソースにidがない行のidを生成する
///
/// 実行ごとにidが変わってよい場合は`RandomIdGenerator`、
/// 再現性が必要な場合（テストなど）は`SequentialIdGenerator`を使用します。
pub trait IdGenerator: fmt::Debug + Send + Sync {
    fn generate(&self) -> String;
}

const BASE36_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// 生成するidの長さ
pub const GENERATED_ID_LEN: usize = 13;

/// 13文字の小文字英数字（base-36）のランダムなidを生成する
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomIdGenerator;

impl IdGenerator for RandomIdGenerator {
    fn generate(&self) -> String {
        let mut rng = rand::rng();
        (0..GENERATED_ID_LEN)
            .map(|_| BASE36_ALPHABET[rng.random_range(0..BASE36_ALPHABET.len())] as char)
            .collect()
    }
}

/// 接頭辞と連番からなるidを生成する
///
/// ```rust
/// use agenda_json::{IdGenerator, SequentialIdGenerator};
///
/// let ids = SequentialIdGenerator::new("session-");
/// assert_eq!(ids.generate(), "session-1");
/// assert_eq!(ids.generate(), "session-2");
/// ```
#[derive(Debug)]
pub struct SequentialIdGenerator {
    prefix: String,
    next: AtomicU64,
}

impl SequentialIdGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: AtomicU64::new(1),
        }
    }
}

impl Default for SequentialIdGenerator {
    fn default() -> Self {
        Self::new("session-")
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn generate(&self) -> String {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        format!("{}{}", self.prefix, n)
    }
}

/// ヘッダー行に対して解決済みの列ルール
#[derive(Debug, Clone, Default)]
struct ResolvedRule {
    columns: Vec<usize>,
    default: String,
}

impl ResolvedRule {
    fn resolve(field: &str, rule: &FieldRule, headers: &[String]) -> Self {
        let columns = rule
            .candidates
            .iter()
            .filter_map(|key| {
                let column = key.resolve(headers);
                if column.is_none() {
                    debug!("{}: {} not present in header row", field, key);
                }
                column
            })
            .collect();
        Self {
            columns,
            default: rule.default.clone(),
        }
    }

    fn from_columns(field: &str, keys: &[crate::api::ColumnKey], headers: &[String]) -> Self {
        Self::resolve(
            field,
            &FieldRule {
                candidates: keys.to_vec(),
                default: String::new(),
            },
            headers,
        )
    }

    /// 最初の空でない候補のテキスト
    fn first_text(&self, row: &SourceRow) -> Option<String> {
        self.columns
            .iter()
            .find_map(|&column| row.cell(column).as_text())
    }

    /// 候補のテキスト、なければ既定値
    fn text_or_default(&self, row: &SourceRow) -> String {
        self.first_text(row).unwrap_or_else(|| self.default.clone())
    }
}

/// 1テーブル分の正規化結果
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct MappedRows {
    pub sessions: Vec<Session>,
    /// titleがないために除外された行数
    pub skipped_rows: usize,
    pub failures: Vec<FieldParseFailure>,
}

/// 行を`Session`に変換するマッパー
///
/// 生成時にプロファイルの列候補をヘッダー行に対して解決し、以降の行では列位置のみを参照します。
#[derive(Debug)]
pub(crate) struct SessionMapper<'a> {
    id: ResolvedRule,
    title: ResolvedRule,
    track: ResolvedRule,
    level: ResolvedRule,
    room: ResolvedRule,
    speaker: ResolvedRule,
    description: ResolvedRule,
    start: ResolvedRule,
    end: ResolvedRule,
    enabled: ResolvedRule,
    visibility: ResolvedRule,
    track_guard: Option<TrackGuard>,
    dates: DateConverter,
    ids: &'a dyn IdGenerator,
}

impl<'a> SessionMapper<'a> {
    pub fn new(profile: &SourceProfile, headers: &[String], ids: &'a dyn IdGenerator) -> Self {
        let fields = &profile.fields;
        let mapper = Self {
            id: ResolvedRule::resolve("id", &fields.id, headers),
            title: ResolvedRule::resolve("title", &fields.title, headers),
            track: ResolvedRule::resolve("track", &fields.track, headers),
            level: ResolvedRule::resolve("level", &fields.level, headers),
            room: ResolvedRule::resolve("room", &fields.room, headers),
            speaker: ResolvedRule::resolve("speaker", &fields.speaker, headers),
            description: ResolvedRule::resolve("description", &fields.description, headers),
            start: ResolvedRule::resolve("start", &fields.start, headers),
            end: ResolvedRule::resolve("end", &fields.end, headers),
            enabled: ResolvedRule::from_columns("enabled", &fields.enabled, headers),
            visibility: ResolvedRule::from_columns("visibility", &fields.visibility, headers),
            track_guard: profile.track_guard.clone(),
            dates: DateConverter::new(profile.round_to_minute, profile.timestamp_offset.clone()),
            ids,
        };

        if mapper.title.columns.is_empty() {
            warn!(
                "Profile '{}': no title column matched the header row, every row will be skipped",
                profile.name
            );
        }
        mapper
    }

    /// テーブルの全データ行を変換する
    pub fn map_table(&self, table: &SourceTable) -> MappedRows {
        let mut mapped = MappedRows::default();
        for row in &table.rows {
            match self.map_row(row, &mut mapped.failures) {
                Some(session) => mapped.sessions.push(session),
                None => mapped.skipped_rows += 1,
            }
        }
        mapped
    }

    /// 1行を変換する
    ///
    /// titleが空の行は`None`を返します。
    /// 日時の解析失敗は`failures`に追加され、該当フィールドは空文字列になります。
    pub fn map_row(
        &self,
        row: &SourceRow,
        failures: &mut Vec<FieldParseFailure>,
    ) -> Option<Session> {
        let Some(title) = self.title.first_text(row) else {
            debug!("Row {} skipped: no title", row.index);
            return None;
        };

        let id = self
            .id
            .first_text(row)
            .unwrap_or_else(|| self.ids.generate());
        let track = self.sanitize_track(self.track.text_or_default(row), &title);
        let start = self.timestamp("start", &self.start, row, failures);
        let end = self.timestamp("end", &self.end, row, failures);
        let day = start.get(..10).unwrap_or_default().to_string();

        Some(Session {
            id,
            title,
            track,
            day,
            start,
            end,
            room: self.room.text_or_default(row),
            speaker: self.speaker.text_or_default(row),
            level: self.level.text_or_default(row),
            description: self.description.text_or_default(row),
            reg_enabled: self.reg_enabled(row),
        })
    }

    fn sanitize_track(&self, track: String, title: &str) -> String {
        match &self.track_guard {
            Some(guard) if guard.is_degenerate(&track) => {
                let replacement = guard.replacement(title, &self.track.default).to_string();
                debug!(
                    "Track '{}' looks like an aggregate column, using '{}'",
                    track, replacement
                );
                replacement
            }
            _ => track,
        }
    }

    /// 最初に解釈できた候補列の日時を整形する
    fn timestamp(
        &self,
        field: &'static str,
        rule: &ResolvedRule,
        row: &SourceRow,
        failures: &mut Vec<FieldParseFailure>,
    ) -> String {
        let mut pending = Vec::new();
        for &column in &rule.columns {
            let cell = row.cell(column);
            match self.dates.convert_cell(cell) {
                Ok(Some(instant)) => return self.dates.format(&instant),
                Ok(None) => {}
                Err(reason) => pending.push(FieldParseFailure {
                    row: row.index,
                    field,
                    raw: raw_text(cell),
                    reason,
                }),
            }
        }

        for failure in &pending {
            warn!("{}", failure);
        }
        failures.extend(pending);
        String::new()
    }

    fn reg_enabled(&self, row: &SourceRow) -> bool {
        if let Some(flag) = self
            .enabled
            .columns
            .iter()
            .find_map(|&column| explicit_flag(row.cell(column)))
        {
            return flag;
        }

        match self.visibility.first_text(row) {
            Some(label) => !label.to_lowercase().contains("hidden"),
            None => true,
        }
    }
}

fn raw_text(cell: &CellValue) -> String {
    match cell {
        CellValue::Error(e) => e.clone(),
        other => other.as_text().unwrap_or_default(),
    }
}

/// 有効/無効フラグのセルを解釈する（空セルは`None`）
fn explicit_flag(cell: &CellValue) -> Option<bool> {
    match cell {
        CellValue::Bool(b) => Some(*b),
        CellValue::Number(n) => Some(*n != 0.0),
        CellValue::String(s) => {
            let value = s.trim().to_lowercase();
            if value.is_empty() {
                None
            } else {
                Some(interpret_flag(&value))
            }
        }
        CellValue::Error(_) | CellValue::Empty => None,
    }
}

/// 小文字化済みの文字列フラグを解釈する
///
/// 否定の表記を先に判定し、どちらにも該当しない値は`true`とします。
/// `"disabled"`は`"enabled"`を部分文字列として含むため、この順序を入れ替えると無効が有効になります。
fn interpret_flag(value: &str) -> bool {
    if value.contains("disabled")
        || value.contains("hidden")
        || matches!(value, "false" | "0" | "no")
    {
        return false;
    }
    if value.contains("enabled") || matches!(value, "true" | "1" | "yes") {
        return true;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ColumnKey;
    use crate::profile::{FieldMap, DEFAULT_LEVEL, DEFAULT_TRACK, PLACEHOLDER};

    fn headers() -> Vec<String> {
        [
            "Unique ID",
            "Session Title*",
            "1st Filter Name",
            "Start Date & Time",
            "End Date & Time",
            "Session Registration (Enabled/Disabled)",
            "Visibility",
        ]
        .iter()
        .map(|h| h.to_string())
        .collect()
    }

    fn profile() -> SourceProfile {
        let mut profile = SourceProfile::csv_export();
        profile.fields.visibility = vec![ColumnKey::header("Visibility")];
        profile
    }

    fn row(index: usize, cells: &[&str]) -> SourceRow {
        SourceRow {
            index,
            cells: cells
                .iter()
                .map(|c| CellValue::String(c.to_string()))
                .collect(),
        }
    }

    fn map(profile: &SourceProfile, row: &SourceRow) -> (Option<Session>, Vec<FieldParseFailure>) {
        let ids = SequentialIdGenerator::default();
        let mapper = SessionMapper::new(profile, &headers(), &ids);
        let mut failures = Vec::new();
        let session = mapper.map_row(row, &mut failures);
        (session, failures)
    }

    #[test]
    fn test_keynote_row_uses_defaults() {
        let (session, failures) = map(&profile(), &row(1, &["", "Opening Keynote", "Keynote"]));
        let session = session.unwrap();
        assert_eq!(session.id, "session-1");
        assert_eq!(session.title, "Opening Keynote");
        assert_eq!(session.track, "Keynote");
        assert_eq!(session.level, DEFAULT_LEVEL);
        assert_eq!(session.room, PLACEHOLDER);
        assert_eq!(session.speaker, PLACEHOLDER);
        assert_eq!(session.description, "");
        assert_eq!(session.day, "");
        assert_eq!(session.start, "");
        assert_eq!(session.end, "");
        assert!(session.reg_enabled);
        assert!(failures.is_empty());
    }

    #[test]
    fn test_source_id_is_kept() {
        let (session, _) = map(&profile(), &row(1, &[" S-42 ", "Welcome"]));
        assert_eq!(session.unwrap().id, "S-42");
    }

    #[test]
    fn test_blank_title_is_skipped() {
        let (session, _) = map(&profile(), &row(1, &["S-1", "   ", "Keynote"]));
        assert!(session.is_none());
    }

    #[test]
    fn test_title_falls_back_to_second_candidate() {
        let mut profile = profile();
        profile.fields.title = FieldRule::optional(["Missing Header", "1st Filter Name"]);
        let (session, _) = map(&profile, &row(1, &["", "", "Workshops"]));
        assert_eq!(session.unwrap().title, "Workshops");
    }

    #[test]
    fn test_start_and_day() {
        let (session, failures) = map(
            &profile(),
            &row(
                1,
                &["", "Welcome", "", "09/02/2025 9:00 AM", "2025-09-02 10:30"],
            ),
        );
        let session = session.unwrap();
        assert_eq!(session.start, "2025-09-02T09:00:00.000-07:00");
        assert_eq!(session.end, "2025-09-02T10:30:00.000-07:00");
        assert_eq!(session.day, "2025-09-02");
        assert_eq!(session.day, &session.start[..10]);
        assert!(failures.is_empty());
    }

    #[test]
    fn test_unparseable_start_degrades_to_empty() {
        let (session, failures) = map(&profile(), &row(7, &["", "Welcome", "", "sometime"]));
        let session = session.unwrap();
        assert_eq!(session.start, "");
        assert_eq!(session.day, "");
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].row, 7);
        assert_eq!(failures[0].field, "start");
        assert_eq!(failures[0].raw, "sometime");
    }

    #[test]
    fn test_start_uses_first_parseable_candidate() {
        let mut profile = profile();
        profile.fields.start = FieldRule::optional(["Start Date & Time", "End Date & Time"]);
        let (session, failures) = map(
            &profile,
            &row(1, &["", "Welcome", "", "TBD", "2025-09-02T08:00:00Z"]),
        );
        assert_eq!(session.unwrap().start, "2025-09-02T08:00:00.000-07:00");
        assert!(failures.is_empty());
    }

    #[test]
    fn test_serial_start_with_rounding() {
        let mut profile = profile();
        profile.round_to_minute = true;
        let ids = SequentialIdGenerator::default();
        let mapper = SessionMapper::new(&profile, &headers(), &ids);
        let row = SourceRow {
            index: 3,
            cells: vec![
                CellValue::Empty,
                CellValue::String("Lunch".to_string()),
                CellValue::Empty,
                CellValue::Number(45902.62499999884),
            ],
        };
        let session = mapper.map_row(&row, &mut Vec::new()).unwrap();
        assert_eq!(session.start, "2025-09-02T15:00:00.000-07:00");
    }

    #[test]
    fn test_track_guard_long_value() {
        let long_track = "x".repeat(60);
        let (session, _) = map(&profile(), &row(1, &["", "Welcome", &long_track]));
        assert_eq!(session.unwrap().track, DEFAULT_TRACK);
    }

    #[test]
    fn test_track_guard_comma() {
        let (session, _) = map(&profile(), &row(1, &["", "Welcome", "Lab, Keynote"]));
        assert_eq!(session.unwrap().track, DEFAULT_TRACK);
    }

    #[test]
    fn test_track_guard_lab_prefix() {
        let (session, _) = map(
            &profile(),
            &row(1, &["", "Agentic Labs: Build an agent", "Lab, Workshop"]),
        );
        assert_eq!(session.unwrap().track, "Lab");
    }

    #[test]
    fn test_track_guard_disabled() {
        let mut profile = profile();
        profile.track_guard = None;
        let (session, _) = map(&profile, &row(1, &["", "Welcome", "Lab, Workshop"]));
        assert_eq!(session.unwrap().track, "Lab, Workshop");
    }

    #[test]
    fn test_reg_enabled_from_explicit_field() {
        let cases = [
            ("Enabled", true),
            ("Disabled", false),
            ("yes", true),
            ("NO", false),
            ("0", false),
            ("1", true),
            ("hidden", false),
            ("maybe", true),
        ];
        for (value, expected) in cases {
            let (session, _) = map(&profile(), &row(1, &["", "Welcome", "", "", "", value]));
            assert_eq!(session.unwrap().reg_enabled, expected, "value: {}", value);
        }
    }

    #[test]
    fn test_reg_enabled_typed_cells() {
        assert_eq!(explicit_flag(&CellValue::Bool(false)), Some(false));
        assert_eq!(explicit_flag(&CellValue::Number(0.0)), Some(false));
        assert_eq!(explicit_flag(&CellValue::Number(2.0)), Some(true));
        assert_eq!(explicit_flag(&CellValue::String("  ".to_string())), None);
        assert_eq!(explicit_flag(&CellValue::Empty), None);
    }

    #[test]
    fn test_reg_enabled_from_visibility_label() {
        let (session, _) = map(
            &profile(),
            &row(1, &["", "Welcome", "", "", "", "", "Hidden from agenda"]),
        );
        assert!(!session.unwrap().reg_enabled);

        let (session, _) = map(&profile(), &row(1, &["", "Welcome", "", "", "", "", "Visible"]));
        assert!(session.unwrap().reg_enabled);
    }

    #[test]
    fn test_explicit_field_takes_precedence_over_label() {
        let (session, _) = map(
            &profile(),
            &row(1, &["", "Welcome", "", "", "", "Enabled", "Hidden"]),
        );
        assert!(session.unwrap().reg_enabled);
    }

    #[test]
    fn test_map_table_counts_skipped_rows() {
        let ids = SequentialIdGenerator::default();
        let profile = profile();
        let table = SourceTable {
            sheet: None,
            header_row: 0,
            headers: headers(),
            rows: vec![
                row(1, &["", "Welcome"]),
                row(2, &["orphan-id", ""]),
                row(3, &["", "Closing", "", "not a date"]),
            ],
        };
        let mapper = SessionMapper::new(&profile, &table.headers, &ids);
        let mapped = mapper.map_table(&table);
        assert_eq!(mapped.sessions.len(), 2);
        assert_eq!(mapped.skipped_rows, 1);
        assert_eq!(mapped.failures.len(), 1);
        assert_eq!(mapped.sessions[1].id, "session-2");
    }

    #[test]
    fn test_indexed_profile_ignores_headers() {
        let profile = SourceProfile {
            fields: FieldMap {
                title: FieldRule::optional([1usize]),
                room: FieldRule::new([3usize], PLACEHOLDER),
                ..Default::default()
            },
            ..SourceProfile::agenda_sheet()
        };
        let ids = SequentialIdGenerator::default();
        let mapper = SessionMapper::new(&profile, &[], &ids);
        let session = mapper
            .map_row(&row(3, &["", "Welcome", "", "Hall A"]), &mut Vec::new())
            .unwrap();
        assert_eq!(session.room, "Hall A");
        // 候補のない項目は既定値のまま
        assert_eq!(session.track, "");
    }

    #[test]
    fn test_random_id_generator_shape() {
        let ids = RandomIdGenerator;
        let id = ids.generate();
        assert_eq!(id.len(), GENERATED_ID_LEN);
        assert!(id
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn test_single_emit_per_titled_row(title in "\\PC{0,20}", track in "[a-zA-Z ,]{0,80}") {
                let profile = profile();
                let ids = SequentialIdGenerator::default();
                let mapper = SessionMapper::new(&profile, &headers(), &ids);
                let row = SourceRow {
                    index: 1,
                    cells: vec![
                        CellValue::Empty,
                        CellValue::String(title.clone()),
                        CellValue::String(track),
                    ],
                };
                let session = mapper.map_row(&row, &mut Vec::new());
                prop_assert_eq!(session.is_some(), !title.trim().is_empty());
                if let Some(session) = session {
                    prop_assert_eq!(session.title, title.trim());
                    prop_assert!(session.track.chars().count() <= 50);
                    prop_assert!(!session.track.contains(','));
                }
            }
        }
    }
}
