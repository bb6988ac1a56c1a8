// flowvcs: Git-backed project storage for flow hosts
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Role file access for the host's flow loader.

use serde_json::Value;
use std::path::Path;
use tokio::fs;
use tracing::warn;

use super::Project;
use super::package::PACKAGE_FILE;
use crate::error::{ProjectError, VcsResult};
use crate::utility::fs::backup::{backup_path, write_with_backup};

/// Reads JSON from `path`, falling back to its dot backup when the file
/// does not parse. A missing file yields `default`.
async fn read_json(path: &Path, default: Value) -> VcsResult<Value> {
    let text = match fs::read_to_string(path).await {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(default),
        Err(e) => return Err(e.into()),
    };
    if text.trim().is_empty() {
        return Ok(default);
    }
    match serde_json::from_str(&text) {
        Ok(value) => Ok(value),
        Err(err) => {
            let backup = backup_path(path);
            let restored = fs::read_to_string(&backup)
                .await
                .ok()
                .and_then(|t| serde_json::from_str(&t).ok());
            match restored {
                Some(value) => {
                    warn!(path = %path.display(), error = %err, "unreadable file, using backup");
                    Ok(value)
                }
                None => Err(err.into()),
            }
        }
    }
}

async fn write_json(path: &Path, value: &Value) -> VcsResult<()> {
    let mut text = serde_json::to_string_pretty(value)?;
    text.push('\n');
    write_with_backup(path, &text).await
}

impl Project {
    /// The flows the host should run.
    ///
    /// # Errors
    ///
    /// In order: `project_empty`, `missing_package_file`,
    /// `missing_flow_file`, `merge_conflict`.
    pub async fn get_flows(&self) -> VcsResult<Value> {
        let flow = {
            let state = self.state();
            if state.empty {
                return Err(ProjectError::Empty.into());
            }
            if state.missing_files.iter().any(|f| f == PACKAGE_FILE) {
                return Err(ProjectError::MissingPackageFile {
                    file: PACKAGE_FILE.to_string(),
                }
                .into());
            }
            let Some(flow) = state.files.flow.clone() else {
                return Err(ProjectError::MissingFlowFile.into());
            };
            if state.merging {
                return Err(ProjectError::Unmerged.into());
            }
            flow
        };
        read_json(&self.path.join(flow), Value::Array(Vec::new())).await
    }

    /// Writes the flow file, keeping a dot backup of the previous copy.
    ///
    /// # Errors
    ///
    /// Returns `merge_conflict` while merging and `missing_flow_file`
    /// when no flow file is configured.
    pub async fn save_flows(&self, flows: &Value) -> VcsResult<()> {
        if self.is_merging() {
            return Err(ProjectError::Unmerged.into());
        }
        let path = self.flow_file().ok_or(ProjectError::MissingFlowFile)?;
        write_json(&path, flows).await?;
        self.state()
            .missing_files
            .retain(|f| !path.ends_with(f.as_str()));
        Ok(())
    }

    /// The (possibly encrypted) credentials object; `{}` when absent.
    ///
    /// # Errors
    ///
    /// Returns an I/O or JSON error.
    pub async fn get_credentials(&self) -> VcsResult<Value> {
        match self.credentials_file() {
            Some(path) => read_json(&path, Value::Object(serde_json::Map::new())).await,
            None => Ok(Value::Object(serde_json::Map::new())),
        }
    }

    /// # Errors
    ///
    /// Returns `missing_flow_file` when no role files are configured.
    pub async fn save_credentials(&self, credentials: &Value) -> VcsResult<()> {
        let path = self.credentials_file().ok_or(ProjectError::MissingFlowFile)?;
        write_json(&path, credentials).await
    }
}
