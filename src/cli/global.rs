// flowvcs: Git-backed project storage for flow hosts
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Global CLI options available for all commands.
//!
//! # Option Precedence
//!
//! ```text
//! -c, --config FILE  ← Additional config files (can repeat)
//! -v / -q            ← Console verbosity
//! --log-file FILE    ← global.log_file
//! --json-logs        ← global.json_logs
//! --projects DIR     ← projects.path override
//! -p, --project NAME ← target of version-control commands
//! -s, --set KEY=VAL  ← Direct config override
//!
//! Precedence: CLI flags > --set > FLOWVCS_* > --config > defaults
//! ```

use clap::{ArgAction, Args};
use std::path::PathBuf;

use crate::logging::LogLevel;

/// Global options available for all commands.
#[derive(Debug, Clone, Default, Args)]
pub struct GlobalOptions {
    /// Additional TOML configuration file(s), loaded after the defaults.
    #[arg(short = 'c', long = "config", value_name = "FILE", action = ArgAction::Append, global = true)]
    pub configs: Vec<PathBuf>,

    /// More output (-v debug, -vv trace, -vvv everything).
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Errors only.
    #[arg(short = 'q', long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Path to log file.
    #[arg(long = "log-file", value_name = "FILE", global = true)]
    pub log_file: Option<PathBuf>,

    /// Log to stderr as JSON lines.
    #[arg(long = "json-logs", global = true)]
    pub json_logs: bool,

    /// Projects directory.
    #[arg(long = "projects", value_name = "DIR", env = "FLOWVCS_PROJECTS_DIR", global = true)]
    pub projects: Option<PathBuf>,

    /// Project a version-control command targets; defaults to the active one.
    #[arg(short = 'p', long = "project", value_name = "NAME", global = true)]
    pub project: Option<String>,

    /// User the command acts for; selects stored keys and credentials.
    #[arg(long = "user", value_name = "NAME", env = "FLOWVCS_USER", global = true)]
    pub user: Option<String>,

    /// Sets an option, such as 'projects.workflow=auto'.
    /// Can be specified multiple times.
    #[arg(short = 's', long = "set", value_name = "OPTION", action = ArgAction::Append, global = true)]
    pub options: Vec<String>,

    /// Only load files given with --config.
    #[arg(long = "no-default-configs", global = true)]
    pub no_default_configs: bool,
}

impl GlobalOptions {
    /// Command-line options as `key=value` configuration overrides.
    #[must_use]
    pub fn to_config_overrides(&self) -> Vec<String> {
        let mut overrides = self.options.clone();

        if self.verbose > 0 || self.quiet {
            let level = LogLevel::from_verbosity(self.verbose, self.quiet);
            overrides.push(format!("global.output_log_level={}", level.as_u8()));
        }

        if let Some(ref path) = self.log_file {
            overrides.push(format!("global.log_file={}", path.display()));
        }

        if self.json_logs {
            overrides.push("global.json_logs=true".to_string());
        }

        if let Some(ref dir) = self.projects {
            overrides.push(format!("projects.path={}", dir.display()));
        }

        overrides
    }
}
