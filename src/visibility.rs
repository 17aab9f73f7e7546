//! Visibility Module
//!
//! 生成済みのドキュメントに対して、タイトルの拒否リストから`regEnabled`を再計算するモジュール。
//!
//! 以前の値は参照せず、毎回タイトルだけから決定します。そのため同じ拒否リストで
//! 2回続けて適用しても結果は変わりません。

use std::path::Path;

use chrono::Utc;
use tracing::{debug, info};

use crate::error::AgendaToJsonError;
use crate::output::{generated_at, load_document, write_document};
use crate::types::AgendaDocument;

/// 拒否リストの既定値（内部テスト用セッションの目印）
pub const DEFAULT_DENY_LIST: &[&str] = &["test"];

/// `regEnabled`が変化したセッション
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisibilityChange {
    pub id: String,
    pub title: String,
    pub previous: bool,
    pub current: bool,
}

/// 再計算の結果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisibilityReport {
    pub total: usize,
    pub enabled: usize,
    pub disabled: usize,
    /// 値が変化したセッション数（`changes.len()`と同じ）
    pub changed: usize,
    pub changes: Vec<VisibilityChange>,
}

/// 拒否リストに基づく`regEnabled`の再計算
///
/// # 使用例
///
/// ```rust,no_run
/// use agenda_json::VisibilityUpdater;
///
/// # fn main() -> Result<(), agenda_json::AgendaToJsonError> {
/// let report = VisibilityUpdater::new(["test", "internal"]).update_file("agenda.json")?;
/// println!("{} of {} sessions enabled", report.enabled, report.total);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisibilityUpdater {
    /// 小文字化済みの拒否リスト
    deny_list: Vec<String>,
}

impl Default for VisibilityUpdater {
    fn default() -> Self {
        Self::new(DEFAULT_DENY_LIST.iter().copied())
    }
}

impl VisibilityUpdater {
    /// 拒否リストを指定して生成する
    ///
    /// 各要素は小文字化され、空の要素は無視されます。
    pub fn new<S, I>(deny_list: I) -> Self
    where
        S: AsRef<str>,
        I: IntoIterator<Item = S>,
    {
        Self {
            deny_list: deny_list
                .into_iter()
                .map(|s| s.as_ref().trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }

    pub fn deny_list(&self) -> &[String] {
        &self.deny_list
    }

    /// タイトルが表示対象かどうか
    pub fn is_enabled(&self, title: &str) -> bool {
        let title = title.to_lowercase();
        !self.deny_list.iter().any(|deny| title.contains(deny.as_str()))
    }

    /// ドキュメントの`regEnabled`を再計算し、メタデータを更新する
    pub fn apply(
        &self,
        document: &mut AgendaDocument,
        generated_at: impl Into<String>,
    ) -> VisibilityReport {
        let mut report = VisibilityReport {
            total: document.sessions.len(),
            ..Default::default()
        };

        for session in &mut document.sessions {
            let current = self.is_enabled(&session.title);
            if current != session.reg_enabled {
                debug!(
                    "'{}': regEnabled {} -> {}",
                    session.title, session.reg_enabled, current
                );
                report.changes.push(VisibilityChange {
                    id: session.id.clone(),
                    title: session.title.clone(),
                    previous: session.reg_enabled,
                    current,
                });
            }
            session.reg_enabled = current;

            if current {
                report.enabled += 1;
            } else {
                report.disabled += 1;
            }
        }

        report.changed = report.changes.len();
        document.refresh_metadata(generated_at);
        report
    }

    /// ファイルを読み込み、再計算してから同じパスに保存する
    ///
    /// # 戻り値
    ///
    /// * `Err(AgendaToJsonError::SourceNotFound)` - ファイルが存在しない場合
    /// * `Err(AgendaToJsonError::Json)` - ドキュメントの形式が不正な場合
    pub fn update_file<P: AsRef<Path>>(&self, path: P) -> Result<VisibilityReport, AgendaToJsonError> {
        let path = path.as_ref();
        let mut document = load_document(path)?;
        let report = self.apply(&mut document, generated_at(Utc::now()));
        write_document(&document, path)?;
        info!(
            "Updated {}: {} enabled, {} disabled, {} changed",
            path.display(),
            report.enabled,
            report.disabled,
            report.changed
        );
        Ok(report)
    }
}
