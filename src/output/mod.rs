//! Output Module
//!
//! `AgendaDocument`の組み立て、JSONへのシリアライズ、ファイルへの保存と読み込みを提供するモジュール。
//!
//! 保存は同じディレクトリの一時ファイルに書き込んでから置き換えるため、
//! 読み手が書き込み途中のドキュメントを観測することはありません。

mod atomic;

use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::AgendaToJsonError;
use crate::types::{AgendaDocument, Metadata, Session};

pub(crate) use atomic::write_atomic;

/// `generatedAt`の書式（RFC 3339、UTC、ミリ秒精度、`Z`表記）
pub fn generated_at(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

impl AgendaDocument {
    /// セッション列からドキュメントを組み立てる
    ///
    /// `totalSessions`は常に`sessions`の件数になります。
    pub fn assemble(
        sessions: Vec<Session>,
        source: impl Into<String>,
        generated_at: impl Into<String>,
    ) -> Self {
        Self {
            metadata: Metadata {
                generated_at: generated_at.into(),
                source: source.into(),
                total_sessions: sessions.len(),
            },
            sessions,
        }
    }

    /// メタデータの生成時刻と件数を更新する
    pub fn refresh_metadata(&mut self, generated_at: impl Into<String>) {
        self.metadata.generated_at = generated_at.into();
        self.metadata.total_sessions = self.sessions.len();
    }

    /// 2スペースインデントのJSON文字列に変換する（末尾に改行を含む）
    pub fn to_json_string(&self) -> Result<String, AgendaToJsonError> {
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');
        Ok(json)
    }
}

/// ドキュメントをファイルに保存する
///
/// # 戻り値
///
/// * `Ok(())` - 保存に成功した場合
/// * `Err(AgendaToJsonError::Io)` - 一時ファイルの作成、書き込み、置き換えに失敗した場合
pub fn write_document<P: AsRef<Path>>(
    document: &AgendaDocument,
    path: P,
) -> Result<(), AgendaToJsonError> {
    let json = document.to_json_string()?;
    write_atomic(path.as_ref(), json.as_bytes())
}

/// 保存済みのドキュメントを読み込む
///
/// # 戻り値
///
/// * `Err(AgendaToJsonError::SourceNotFound)` - ファイルが存在しない、または読み込めない場合
/// * `Err(AgendaToJsonError::Json)` - ドキュメントの形式が不正な場合
pub fn load_document<P: AsRef<Path>>(path: P) -> Result<AgendaDocument, AgendaToJsonError> {
    let path = path.as_ref();
    let json = std::fs::read_to_string(path).map_err(|e| {
        AgendaToJsonError::SourceNotFound(format!(
            "document '{}' could not be read: {}",
            path.display(),
            e
        ))
    })?;
    Ok(serde_json::from_str(&json)?)
}
