//! Security Module
//!
//! 入力サイズの上限を定義するモジュール。
//! 入力はすべてメモリに読み込むため、巨大なファイルは読み込み前後で拒否します。

use std::io::Read;

use crate::error::AgendaToJsonError;

/// セキュリティ設定
///
/// ファイル処理時のリソース制限を定義します。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityConfig {
    /// 入力ファイルの最大サイズ（バイト）
    /// デフォルト: 256MB (268_435_456 bytes)
    pub max_input_file_size: u64,
    /// ヘッダー行以降の最大データ行数
    /// デフォルト: 1_048_576（Excelの最大行数）
    pub max_data_rows: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_input_file_size: 268_435_456, // 256MB
            max_data_rows: 1_048_576,
        }
    }
}

impl SecurityConfig {
    /// 入力全体をメモリに読み込む
    ///
    /// 上限を1バイトでも超えた時点で読み込みを打ち切り、
    /// `AgendaToJsonError::SecurityViolation`を返します。
    pub(crate) fn read_limited<R: Read>(&self, reader: R) -> Result<Vec<u8>, AgendaToJsonError> {
        let mut buffer = Vec::new();
        let bytes_read = reader
            .take(self.max_input_file_size.saturating_add(1))
            .read_to_end(&mut buffer)?;

        if bytes_read as u64 > self.max_input_file_size {
            return Err(AgendaToJsonError::SecurityViolation(format!(
                "Input file size exceeds maximum: more than {} bytes",
                self.max_input_file_size
            )));
        }

        Ok(buffer)
    }

    /// データ行数の上限を検証する
    pub(crate) fn check_row_count(&self, rows: usize) -> Result<(), AgendaToJsonError> {
        if rows > self.max_data_rows {
            return Err(AgendaToJsonError::SecurityViolation(format!(
                "Data row count exceeds maximum: {} rows (max: {} rows)",
                rows, self.max_data_rows
            )));
        }
        Ok(())
    }
}
