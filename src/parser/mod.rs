//! Parser Module
//!
//! 入力ソース（区切りテキスト、ワークブック）を読み込み、
//! ヘッダー行とデータ行からなる`SourceTable`に統一するモジュール。
//!
//! どちらの形式でも、行は絶対位置（ファイル先頭・シート先頭からの0始まり）で
//! 管理します。列の参照方法（ヘッダー名・列インデックス）はプロファイル側で決まります。

mod delimited;
mod workbook;

pub use delimited::tokenize_line;
pub(crate) use delimited::DelimitedParser;
pub(crate) use workbook::WorkbookParser;

use crate::error::AgendaToJsonError;
use crate::security::SecurityConfig;
use crate::types::CellValue;

/// 範囲外の列を参照したときに返す空セル
static EMPTY_CELL: CellValue = CellValue::Empty;

/// ヘッダー行の位置指定
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct TableLayout {
    /// ヘッダー行の絶対位置（0始まり）
    ///
    /// `None`の場合は最初の空でない行をヘッダーとして扱います。
    /// `Some(n)`の場合は、それより前の行（タイトル・バナー行）を読み飛ばします。
    pub header_row: Option<usize>,
}

/// ソースの1データ行
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SourceRow {
    /// ソース上の絶対行番号（0始まり）
    pub index: usize,
    /// 列インデックス順のセル値
    pub cells: Vec<CellValue>,
}

impl SourceRow {
    /// 列のセル値を取得する（範囲外は空セル）
    pub fn cell(&self, column: usize) -> &CellValue {
        self.cells.get(column).unwrap_or(&EMPTY_CELL)
    }

    fn is_blank(&self) -> bool {
        self.cells.iter().all(CellValue::is_blank)
    }
}

/// ヘッダー行とデータ行に分解されたソース
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SourceTable {
    /// ワークシート名（区切りテキストの場合は`None`）
    pub sheet: Option<String>,
    /// ヘッダー行の絶対位置
    pub header_row: usize,
    /// ヘッダー文字列（トリム済み、空セルは空文字列）
    pub headers: Vec<String>,
    /// 空行を除いたデータ行
    pub rows: Vec<SourceRow>,
}

impl SourceTable {
    /// 絶対位置付きの全行から`SourceTable`を構築する
    ///
    /// # 戻り値
    ///
    /// * `Err(AgendaToJsonError::SourceNotFound)` - 指定したヘッダー行がソースの範囲外の場合
    /// * `Err(AgendaToJsonError::EmptyInput)` - 内容がない、またはデータ行が見つからない場合
    /// * `Err(AgendaToJsonError::SecurityViolation)` - データ行数が上限を超えた場合
    pub fn from_rows(
        sheet: Option<String>,
        rows: Vec<(usize, Vec<CellValue>)>,
        layout: &TableLayout,
        security: &SecurityConfig,
    ) -> Result<Self, AgendaToJsonError> {
        let mut rows: Vec<SourceRow> = rows
            .into_iter()
            .map(|(index, cells)| SourceRow { index, cells })
            .collect();

        let location = match &sheet {
            Some(name) => format!("sheet '{}'", name),
            None => "input".to_string(),
        };

        if rows.iter().all(SourceRow::is_blank) {
            return Err(AgendaToJsonError::EmptyInput(format!("{} has no content", location)));
        }

        // 1. ヘッダー行の特定
        let header_pos = match layout.header_row {
            Some(header_row) => rows
                .iter()
                .position(|row| row.index == header_row)
                .ok_or_else(|| {
                    AgendaToJsonError::SourceNotFound(format!(
                        "header row {} not present in {}",
                        header_row + 1,
                        location
                    ))
                })?,
            None => rows
                .iter()
                .position(|row| !row.is_blank())
                .ok_or_else(|| {
                    AgendaToJsonError::EmptyInput(format!("no header row found in {}", location))
                })?,
        };

        let data = rows.split_off(header_pos + 1);
        let header = rows.swap_remove(header_pos);
        let headers = header
            .cells
            .iter()
            .map(|cell| cell.as_text().unwrap_or_default())
            .collect();

        // 2. データ行（空行は除外）
        let data: Vec<SourceRow> = data.into_iter().filter(|row| !row.is_blank()).collect();
        if data.is_empty() {
            return Err(AgendaToJsonError::EmptyInput(format!(
                "no data rows after header row {} in {}",
                header.index + 1,
                location
            )));
        }
        security.check_row_count(data.len())?;

        Ok(SourceTable {
            sheet,
            header_row: header.index,
            headers,
            rows: data,
        })
    }
}
