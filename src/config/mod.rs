// flowvcs: Git-backed project storage for flow hosts
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Configuration management for flowvcs.
//!
//! # Configuration Hierarchy
//!
//! ```text
//! Priority (low → high)
//! 1. defaults
//! 2. $XDG_CONFIG_HOME/flowvcs/flowvcs.toml
//! 3. ./flowvcs.toml
//! 4. --config
//! 5. FLOWVCS_* env vars
//! 6. --set overrides
//! ```
//!
//! # Environment Variable Mapping
//!
//! ```text
//! FLOWVCS_PROJECTS__WORKFLOW=auto       → projects.workflow = "auto"
//! FLOWVCS_GIT__NETWORK_TIMEOUT_SECS=30  → git.network_timeout_secs = 30
//! ```

pub mod loader;
pub mod paths;
pub mod types;


use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::Result;

pub use loader::ConfigLoader;
use paths::ProjectsConfig;
use types::{GitConfig, GlobalConfig};

/// Complete application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub global: GlobalConfig,
    pub projects: ProjectsConfig,
    pub git: GitConfig,
}

impl Config {
    /// Create a new configuration builder.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use flowvcs::config::Config;
    ///
    /// let config = Config::builder()
    ///     .add_toml_file_optional("flowvcs.toml")
    ///     .with_env_prefix("FLOWVCS")
    ///     .build()?;
    /// # Ok::<(), anyhow::Error>(())
    /// ```
    #[must_use]
    pub fn builder() -> ConfigLoader {
        ConfigLoader::new()
    }

    /// # Errors
    ///
    /// Returns an error if the file cannot be read, contains invalid TOML, or
    /// does not match the `Config` structure.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::builder().add_toml_file(path).build()
    }

    /// # Errors
    ///
    /// Returns an error if the content is not valid TOML or does not match the
    /// `Config` structure.
    pub fn parse(content: &str) -> Result<Self> {
        Self::builder().add_toml_str(content).build()
    }

    /// Default per-user config file location.
    #[must_use]
    pub fn user_config_file() -> Option<PathBuf> {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("flowvcs").join("flowvcs.toml"))
    }

    /// Resolve all paths and validate configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the projects directory cannot be determined or
    /// the git identity is half set.
    pub fn resolve_and_validate(&mut self) -> Result<()> {
        self.projects.resolve()?;
        self.git.identity()?;
        Ok(())
    }

    /// Configuration options for display, one `key = value` per line.
    ///
    /// The credential secret is shown as `[hidden]`.
    #[must_use]
    pub fn format_options(&self) -> Vec<String> {
        let mut options = BTreeMap::new();
        self.format_global_options(&mut options);
        self.format_projects_options(&mut options);
        self.format_git_options(&mut options);

        let max_key_len = options.keys().map(String::len).max().unwrap_or(0);

        options
            .into_iter()
            .map(|(key, value)| format!("{key:<max_key_len$} = {value}"))
            .collect()
    }

    fn format_global_options(&self, options: &mut BTreeMap<String, String>) {
        options.insert(
            "global.output_log_level".into(),
            self.global.output_log_level.as_u8().to_string(),
        );
        options.insert(
            "global.file_log_level".into(),
            self.global.file_log_level.as_u8().to_string(),
        );
        if let Some(file) = &self.global.log_file {
            options.insert("global.log_file".into(), file.display().to_string());
        }
        options.insert("global.json_logs".into(), self.global.json_logs.to_string());
    }

    fn format_projects_options(&self, options: &mut BTreeMap<String, String>) {
        let fmt = |p: &Option<PathBuf>| {
            p.as_ref()
                .map_or_else(String::new, |p| p.display().to_string())
        };
        let projects = &self.projects;
        options.insert("projects.user_dir".into(), fmt(&projects.user_dir));
        options.insert("projects.path".into(), fmt(&projects.path));
        options.insert("projects.settings_file".into(), fmt(&projects.settings_file));
        options.insert(
            "projects.workflow".into(),
            format!("{:?}", projects.workflow).to_lowercase(),
        );
        options.insert("projects.flow_file".into(), projects.flow_file.clone());
        if projects.credential_secret.is_some() {
            options.insert("projects.credential_secret".into(), "[hidden]".into());
        }
    }

    fn format_git_options(&self, options: &mut BTreeMap<String, String>) {
        options.insert("git.program".into(), self.git.program.clone());
        options.insert(
            "git.network_timeout_secs".into(),
            self.git.network_timeout_secs.to_string(),
        );
        options.insert(
            "git.command_timeout_secs".into(),
            self.git.command_timeout_secs.to_string(),
        );
        if let Some(name) = &self.git.user_name {
            options.insert("git.user_name".into(), name.clone());
        }
        if let Some(email) = &self.git.user_email {
            options.insert("git.user_email".into(), email.clone());
        }
    }
}
