// flowvcs: Git-backed project storage for flow hosts
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

use std::path::Path;
use tokio::fs;

use crate::error::VcsResult;

/// Copies `src` into `dst_dir` under `name` if `src` exists.
///
/// Returns whether a file was copied.
///
/// # Errors
///
/// Returns an error if the directory cannot be created or the copy fails.
pub async fn copy_file_into(src: &Path, dst_dir: &Path, name: &str) -> VcsResult<bool> {
    if !fs::try_exists(src).await? {
        return Ok(false);
    }
    fs::create_dir_all(dst_dir).await?;
    fs::copy(src, dst_dir.join(name)).await?;
    Ok(true)
}

/// Lists the visible subdirectory names of `dir`, sorted case-insensitively.
///
/// A missing directory yields an empty list.
///
/// # Errors
///
/// Returns an error if the directory exists but cannot be read.
pub async fn list_dirs(dir: &Path) -> VcsResult<Vec<String>> {
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') {
            continue;
        }
        if entry.file_type().await?.is_dir() {
            names.push(name);
        }
    }
    names.sort_by_key(|n| n.to_lowercase());
    Ok(names)
}
