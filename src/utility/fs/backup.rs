// flowvcs: Git-backed project storage for flow hosts
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::trace;

use crate::error::VcsResult;

/// Returns the hidden backup location for `path`: `dir/.name.backup`.
#[must_use]
pub fn backup_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map_or_else(String::new, |n| n.to_string_lossy().into_owned());
    path.with_file_name(format!(".{name}.backup"))
}

/// Writes `contents` to `path`, first copying any existing file to its backup.
///
/// Parent directories are created as needed.
///
/// # Errors
///
/// Returns an error if the backup copy or the write fails.
pub async fn write_with_backup(path: &Path, contents: &str) -> VcsResult<()> {
    if fs::try_exists(path).await? {
        let backup = backup_path(path);
        trace!(from = %path.display(), to = %backup.display(), "backup");
        fs::copy(path, &backup).await?;
    } else if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    fs::write(path, contents).await?;
    Ok(())
}
