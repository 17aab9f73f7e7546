//! 一時ファイル経由の置き換え書き込み

use std::fs::Permissions;
use std::io::{self, ErrorKind, Write};
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::AgendaToJsonError;

/// `path`と同じディレクトリに一時ファイルを作成して書き込み、`path`へリネームする
///
/// 失敗した場合、一時ファイルは削除され`path`の内容は変更されません。
/// 既存のファイルを置き換える場合はそのパーミッションを引き継ぎ、
/// 新規作成の場合は`NEW_FILE_MODE`を使います（Unixのみ）。
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), AgendaToJsonError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut file = NamedTempFile::new_in(dir)?;
    if let Some(permissions) = replacement_permissions(path)? {
        file.as_file().set_permissions(permissions)?;
    }
    file.write_all(bytes)?;
    file.as_file().sync_all()?;
    debug!(
        "Persisting {} bytes from {} to {}",
        bytes.len(),
        file.path().display(),
        path.display()
    );
    file.persist(path).map_err(|e| AgendaToJsonError::Io(e.error))?;
    Ok(())
}

/// 新規作成するドキュメントのモード
#[cfg(unix)]
const NEW_FILE_MODE: u32 = 0o644;

fn replacement_permissions(path: &Path) -> io::Result<Option<Permissions>> {
    match std::fs::metadata(path) {
        Ok(metadata) => Ok(Some(metadata.permissions())),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(new_file_permissions()),
        Err(e) => Err(e),
    }
}

#[cfg(unix)]
fn new_file_permissions() -> Option<Permissions> {
    use std::os::unix::fs::PermissionsExt;
    Some(Permissions::from_mode(NEW_FILE_MODE))
}

#[cfg(not(unix))]
fn new_file_permissions() -> Option<Permissions> {
    None
}
