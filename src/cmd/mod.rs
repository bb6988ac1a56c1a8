// flowvcs: Git-backed project storage for flow hosts
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Command implementations.
//!
//! ```text
//! Config + GlobalOptions
//!        |
//!        v
//!   Session::open
//!     ShellGit (located, timeouts) + AuthBroker (this executable)
//!     Host (settings file, logging runtime, ~/.sshkeys)
//!     ProjectManager::restore()
//!        |
//!        v
//!   cmd::run_* handlers --> JSON on stdout
//! ```

pub mod askpass;
pub mod config;
pub mod project;
pub mod vcs;

use anyhow::{Context, anyhow};
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use crate::cli::global::GlobalOptions;
use crate::config::Config;
use crate::error::{Result, VcsError};
use crate::git::{AuthBroker, Git, ShellGit};
use crate::keyring::SshKeyDir;
use crate::manager::{Host, JsonSettingsFile, ManagerOptions, ProjectManager};
use crate::project::Caller;

/// A manager wired to the real git and the settings file, plus who is
/// asking and which project they named.
pub struct Session {
    manager: ProjectManager,
    caller: Caller,
    project: Option<String>,
}

impl Session {
    /// Builds the manager from `config` and restores the active project.
    ///
    /// # Errors
    ///
    /// Returns an error if git cannot be found, the configuration is
    /// incomplete, or the settings file cannot be read.
    pub async fn open(config: &Config, global: &GlobalOptions) -> Result<Self> {
        let program = ShellGit::locate(&config.git.program).map_err(VcsError::from)?;
        debug!(git = %program.display(), "using git");
        let runner = ShellGit::builder()
            .program(program)
            .maybe_command_timeout(config.git.command_timeout())
            .maybe_network_timeout(config.git.network_timeout())
            .build();

        let exe = std::env::current_exe().context("Failed to locate the flowvcs executable")?;
        let git = Git::new(Arc::new(runner), AuthBroker::new(exe));

        let root = config.projects.root()?;
        let host = Host::logging(
            Arc::new(JsonSettingsFile::new(config.projects.settings_file()?)),
            Arc::new(SshKeyDir::new(root)),
        );

        let options = ManagerOptions::builder()
            .root(root)
            .with_workflow(config.projects.workflow)
            .with_flow_file(config.projects.flow_file.clone())
            .maybe_with_system_secret(config.projects.credential_secret.clone())
            .maybe_with_identity(config.git.identity()?)
            .maybe_with_standalone_flow_file(config.projects.standalone_flow_file())
            .build();

        tokio::fs::create_dir_all(root)
            .await
            .with_context(|| format!("Failed to create {}", root.display()))?;

        let manager = ProjectManager::new(options, git, host);
        manager.restore().await?;

        Ok(Self {
            manager,
            caller: global
                .user
                .as_deref()
                .map_or_else(Caller::default, Caller::named),
            project: global.project.clone(),
        })
    }

    #[must_use]
    pub const fn manager(&self) -> &ProjectManager {
        &self.manager
    }

    #[must_use]
    pub const fn caller(&self) -> &Caller {
        &self.caller
    }

    /// The project named with `--project`, else the active one.
    ///
    /// # Errors
    ///
    /// Returns an error if neither exists.
    pub fn target(&self) -> Result<String> {
        self.project
            .clone()
            .or_else(|| self.manager.active_name())
            .ok_or_else(|| anyhow!("No active project; run 'flowvcs activate NAME' first"))
    }
}

/// Prints `value` as pretty JSON on stdout.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
