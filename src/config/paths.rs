// flowvcs: Git-backed project storage for flow hosts
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Project storage configuration.
//!
//! ```text
//! user_dir/                      (default: $HOME/.flowvcs)
//!   .config.projects.json        settings_file
//!   flows.json                   standalone flow file (migration source)
//!   projects/                    path
//!     .sshkeys/
//!     <project>/
//! ```
//!
//! Relative paths resolve against `user_dir`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, Result};
use crate::manager::Workflow;
use crate::project::package::DEFAULT_FLOW_FILE;

/// `[projects]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectsConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_dir: Option<PathBuf>,
    /// Projects root (default: `user_dir/projects`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    pub workflow: Workflow,
    /// Flow file name for new projects.
    pub flow_file: String,
    /// Key inherited by projects without their own credential secret.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential_secret: Option<String>,
    /// Settings JSON (default: `user_dir/.config.projects.json`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settings_file: Option<PathBuf>,
}

impl Default for ProjectsConfig {
    fn default() -> Self {
        Self {
            user_dir: None,
            path: None,
            workflow: Workflow::Manual,
            flow_file: DEFAULT_FLOW_FILE.to_string(),
            credential_secret: None,
            settings_file: None,
        }
    }
}

fn missing(key: &str) -> ConfigError {
    ConfigError::MissingKey {
        section: "projects".to_string(),
        key: key.to_string(),
    }
}

impl ProjectsConfig {
    /// Fills in `user_dir` from `$HOME` and derives the other paths.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingKey` if `user_dir` is unset and there is
    /// no home directory, or `ConfigError::InvalidValue` for an empty
    /// `flow_file`.
    pub fn resolve(&mut self) -> Result<()> {
        if self.user_dir.is_none() {
            let home = std::env::var_os("HOME")
                .filter(|h| !h.is_empty())
                .ok_or_else(|| missing("user_dir"))?;
            self.user_dir = Some(PathBuf::from(home).join(".flowvcs"));
        }
        let user_dir = self.user_dir.clone().ok_or_else(|| missing("user_dir"))?;

        let resolve = |path: &mut Option<PathBuf>, default: &str| match path {
            Some(p) if p.is_relative() => *path = Some(user_dir.join(p.clone())),
            None => *path = Some(user_dir.join(default)),
            _ => {}
        };
        resolve(&mut self.path, "projects");
        resolve(&mut self.settings_file, ".config.projects.json");

        if self.flow_file.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                section: "projects".to_string(),
                key: "flow_file".to_string(),
                message: "must not be empty".to_string(),
            }
            .into());
        }
        if self.credential_secret.as_deref() == Some("") {
            self.credential_secret = None;
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `ConfigError::MissingKey` before [`Self::resolve`] ran.
    pub fn root(&self) -> Result<&Path> {
        self.path.as_deref().ok_or_else(|| missing("path").into())
    }

    /// # Errors
    ///
    /// Returns `ConfigError::MissingKey` before [`Self::resolve`] ran.
    pub fn settings_file(&self) -> Result<&Path> {
        self.settings_file
            .as_deref()
            .ok_or_else(|| missing("settings_file").into())
    }

    /// The pre-project flow file in `user_dir`, if one exists.
    #[must_use]
    pub fn standalone_flow_file(&self) -> Option<PathBuf> {
        self.user_dir
            .as_ref()
            .map(|dir| dir.join(&self.flow_file))
            .filter(|p| p.is_file())
    }
}
