// flowvcs: Git-backed project storage for flow hosts
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Config-related commands for flowvcs.

use anyhow::Context;
use std::sync::Arc;

use super::print_json;
use crate::config::Config;
use crate::error::{Result, VcsError};
use crate::git::{AuthBroker, Git, ShellGit};

/// Display current configuration options.
pub fn run_options_command(config: &Config) {
    for line in config.format_options() {
        println!("{line}");
    }
}

/// Display loaded configuration files.
pub fn run_configs_command(config_files: &[String]) {
    if config_files.is_empty() {
        println!("No configuration files loaded");
    } else {
        for line in config_files {
            println!("{line}");
        }
    }
}

/// Reports the git version and global identity.
///
/// # Errors
///
/// Returns `GitError::NotInstalled` or `GitError::VersionTooOld`.
pub async fn run_check_command(config: &Config) -> Result<()> {
    let program = ShellGit::locate(&config.git.program).map_err(VcsError::from)?;
    let runner = ShellGit::builder()
        .program(program)
        .maybe_command_timeout(config.git.command_timeout())
        .build();
    let exe = std::env::current_exe().context("Failed to locate the flowvcs executable")?;
    let git = Git::new(Arc::new(runner), AuthBroker::new(exe));

    let cwd = std::env::current_dir().context("Failed to read the current directory")?;
    print_json(&git.check_install(&cwd).await?)
}
