// flowvcs: Git-backed project storage for flow hosts
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Configuration sections other than `[projects]`.
//!
//! ```text
//! [global]  log levels, log file, json console output
//! [git]     program, timeouts, fallback commit identity
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;
use crate::git::GitUser;
use crate::logging::LogLevel;

/// Global configuration options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GlobalConfig {
    /// Log level for stderr output (0-6).
    pub output_log_level: LogLevel,
    /// Log level for file output (0-6).
    pub file_log_level: LogLevel,
    /// Path to log file; no file logging when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
    /// Console logs as JSON lines.
    pub json_logs: bool,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            output_log_level: LogLevel::INFO,
            file_log_level: LogLevel::TRACE,
            log_file: None,
            json_logs: false,
        }
    }
}

/// How git is run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GitConfig {
    /// Git executable, looked up on PATH.
    pub program: String,
    /// Limit for clone, fetch, pull and push; 0 disables it.
    pub network_timeout_secs: u64,
    /// Limit for every other command; 0 disables it.
    pub command_timeout_secs: u64,
    /// Commit identity used when the caller supplies none.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_email: Option<String>,
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            program: "git".to_string(),
            network_timeout_secs: 300,
            command_timeout_secs: 60,
            user_name: None,
            user_email: None,
        }
    }
}

const fn timeout(secs: u64) -> Option<Duration> {
    if secs == 0 {
        None
    } else {
        Some(Duration::from_secs(secs))
    }
}

impl GitConfig {
    #[must_use]
    pub const fn network_timeout(&self) -> Option<Duration> {
        timeout(self.network_timeout_secs)
    }

    #[must_use]
    pub const fn command_timeout(&self) -> Option<Duration> {
        timeout(self.command_timeout_secs)
    }

    /// The configured identity; both parts or neither.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if only one part is set.
    pub fn identity(&self) -> Result<Option<GitUser>, ConfigError> {
        match (&self.user_name, &self.user_email) {
            (Some(name), Some(email)) => Ok(Some(GitUser {
                name: name.clone(),
                email: email.clone(),
            })),
            (None, None) => Ok(None),
            (name, _) => Err(ConfigError::InvalidValue {
                section: "git".to_string(),
                key: if name.is_some() { "user_email" } else { "user_name" }.to_string(),
                message: "user_name and user_email must be set together".to_string(),
            }),
        }
    }
}
