// flowvcs: Git-backed project storage for flow hosts
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Project lifecycle arguments.
//!
//! ```text
//! create NAME [--summary S] [--clone URL [--remote R] [--branch B]]
//!             [--no-encryption | --secret KEY] [--migrate]
//! activate NAME [--clear-context]
//! delete NAME
//! info [NAME]
//! update [--summary S] [--description D] [--flow-file F]
//!        [--secret KEY [--current-secret KEY] | --reset-secret]
//! flows [--credentials]
//! ```

use clap::Args;

use super::auth::AuthArgs;

/// Arguments for `create`.
#[derive(Debug, Clone, Args)]
pub struct CreateArgs {
    /// Project name (also its directory name).
    pub name: String,

    /// One-line summary for package.json.
    #[arg(long, default_value = "")]
    pub summary: String,

    /// Longer description for README.md.
    #[arg(long, default_value = "")]
    pub description: String,

    /// Flow file name.
    #[arg(long = "flow-file", value_name = "FILE")]
    pub flow_file: Option<String>,

    /// Clone this repository instead of creating the default files.
    #[arg(long = "clone", value_name = "URL", conflicts_with = "migrate")]
    pub clone: Option<String>,

    /// Name for the cloned remote.
    #[arg(long, value_name = "NAME", requires = "clone")]
    pub remote: Option<String>,

    /// Branch to check out after cloning.
    #[arg(long, value_name = "BRANCH", requires = "clone")]
    pub branch: Option<String>,

    /// Store the credentials file unencrypted.
    #[arg(long = "no-encryption", conflicts_with = "secret")]
    pub no_encryption: bool,

    /// Credentials encryption key for this project.
    #[arg(long, value_name = "KEY", env = "FLOWVCS_CREDENTIAL_SECRET", hide_env_values = true)]
    pub secret: Option<String>,

    /// Copy the standalone flow files into the new project.
    #[arg(long)]
    pub migrate: bool,

    #[command(flatten)]
    pub auth: AuthArgs,
}

/// Arguments for `activate`.
#[derive(Debug, Clone, Args)]
pub struct ActivateArgs {
    pub name: String,

    /// Drop runtime context while switching.
    #[arg(long = "clear-context")]
    pub clear_context: bool,
}

/// Arguments naming one project.
#[derive(Debug, Clone, Args)]
pub struct NameArgs {
    pub name: String,
}

/// Arguments for `info`.
#[derive(Debug, Clone, Default, Args)]
pub struct InfoArgs {
    /// Project to describe; the active project by default.
    pub name: Option<String>,
}

/// Arguments for `update`.
#[derive(Debug, Clone, Default, Args)]
pub struct UpdateArgs {
    #[arg(long)]
    pub summary: Option<String>,

    #[arg(long)]
    pub description: Option<String>,

    /// Rename the flow file; the credentials file follows it.
    #[arg(long = "flow-file", value_name = "FILE")]
    pub flow_file: Option<String>,

    /// New credentials encryption key.
    #[arg(long, value_name = "KEY")]
    pub secret: Option<String>,

    /// Key the credentials are encrypted with now.
    #[arg(long = "current-secret", value_name = "KEY", requires = "secret")]
    pub current_secret: Option<String>,

    /// Discard the stored credentials and start over with --secret.
    #[arg(long = "reset-secret", requires = "secret", conflicts_with = "current_secret")]
    pub reset_secret: bool,
}

/// Arguments for `flows`.
#[derive(Debug, Clone, Default, Args)]
pub struct FlowsArgs {
    /// Print the credentials file instead.
    #[arg(long)]
    pub credentials: bool,
}
