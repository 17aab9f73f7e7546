//! Workbook Parser
//!
//! calamineを使用したワークブック解析の実装。
//! 選択したワークシートのセルを絶対座標に揃えて`SourceTable`を構築します。

use calamine::{open_workbook_auto_from_rs, Data, Reader, Sheets};
use std::io::Cursor;
use tracing::debug;

use super::{SourceTable, TableLayout};
use crate::api::SheetSelector;
use crate::error::AgendaToJsonError;
use crate::security::SecurityConfig;
use crate::types::CellValue;

/// ワークブックパーサー
///
/// calamineのラッパーとして、ワークブックレベルの操作を提供します。
/// 形式（XLSX/XLSM/XLS/ODS）はcalamineが内容から自動判定します。
pub(crate) struct WorkbookParser {
    workbook: Sheets<Cursor<Vec<u8>>>,
}

impl WorkbookParser {
    /// メモリ上のワークブックを開く
    ///
    /// # 戻り値
    ///
    /// * `Ok(WorkbookParser)` - ワークブックの読み込みに成功した場合
    /// * `Err(AgendaToJsonError::Parse)` - 形式が不正、または破損している場合
    pub fn open(buffer: Vec<u8>) -> Result<Self, AgendaToJsonError> {
        let workbook = open_workbook_auto_from_rs(Cursor::new(buffer))?;
        Ok(Self { workbook })
    }

    /// すべてのシート名を取得
    pub fn sheet_names(&self) -> Vec<String> {
        self.workbook.sheet_names()
    }

    /// シート選択方式に基づいてシート名を解決する
    ///
    /// # 戻り値
    ///
    /// * `Ok(String)` - 選択されたシート名
    /// * `Err(AgendaToJsonError::SourceNotFound)` - シートが見つからない、またはインデックスが範囲外の場合
    pub fn select_sheet(&self, selector: &SheetSelector) -> Result<String, AgendaToJsonError> {
        let all_sheet_names = self.sheet_names();

        match selector {
            SheetSelector::Index(index) => all_sheet_names.get(*index).cloned().ok_or_else(|| {
                AgendaToJsonError::SourceNotFound(format!(
                    "Sheet index {} is out of range (total: {})",
                    index,
                    all_sheet_names.len()
                ))
            }),
            SheetSelector::Name(name) => {
                if all_sheet_names.iter().any(|sheet| sheet == name) {
                    Ok(name.clone())
                } else {
                    Err(AgendaToJsonError::SourceNotFound(format!(
                        "Sheet '{}' not found (available: {})",
                        name,
                        all_sheet_names.join(", ")
                    )))
                }
            }
        }
    }

    /// シートをパースして`SourceTable`を構築する
    ///
    /// calamineの`Range`は最初の使用セルから始まるため、
    /// 行番号と列番号をシート先頭（A1）からの絶対位置に揃えてから
    /// ヘッダー行・データ行に分解します。
    pub fn parse_sheet(
        &mut self,
        selector: &SheetSelector,
        layout: &TableLayout,
        security: &SecurityConfig,
    ) -> Result<SourceTable, AgendaToJsonError> {
        // 1. シートの取得
        let sheet_name = self.select_sheet(selector)?;
        let range = self.workbook.worksheet_range(&sheet_name)?;

        // 2. 絶対座標への変換
        let (first_row, first_col) = range.start().unwrap_or((0, 0));
        let rows: Vec<(usize, Vec<CellValue>)> = range
            .rows()
            .enumerate()
            .map(|(offset, row)| {
                let mut cells = vec![CellValue::Empty; first_col as usize];
                cells.extend(row.iter().map(convert_cell));
                (first_row as usize + offset, cells)
            })
            .collect();

        debug!(
            "Read {} rows from sheet '{}' (first used cell at row {}, col {})",
            rows.len(),
            sheet_name,
            first_row + 1,
            first_col + 1
        );

        SourceTable::from_rows(Some(sheet_name), rows, layout, security)
    }
}

/// calamineのセルを`CellValue`に変換する
///
/// 日付セルはシリアル値、ISO 8601形式の日時セルは文字列として扱います。
fn convert_cell(cell: &Data) -> CellValue {
    match cell {
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Float(f) => CellValue::Number(*f),
        Data::String(s) => CellValue::String(s.clone()),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => CellValue::Number(dt.as_f64()),
        Data::DateTimeIso(s) => CellValue::String(s.clone()),
        Data::DurationIso(s) => CellValue::String(s.clone()),
        Data::Error(e) => CellValue::Error(format!("{:?}", e)),
        _ => CellValue::Empty,
    }
}
