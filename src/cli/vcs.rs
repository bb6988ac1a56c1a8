// flowvcs: Git-backed project storage for flow hosts
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Version-control arguments for the active project.
//!
//! ```text
//! status [--remote]          files
//! branches [-r] [-d B [-f]]   checkout BRANCH [-b]
//! log [-n N] [--before REF]  show SHA
//! stage [FILE...]            unstage [FILE]
//! commit -m MSG              diff FILE [--staged]
//! revert FILE                remotes [add NAME URL | remove NAME]
//! pull [REMOTE/BRANCH]       push [REMOTE/BRANCH] [-u]
//! resolve FILE STRATEGY      abort-merge
//! ```

use clap::{Args, Subcommand, ValueEnum};

use super::auth::AuthArgs;
use crate::project::Resolution;

/// Arguments for `status`.
#[derive(Debug, Clone, Default, Args)]
pub struct StatusArgs {
    /// Fetch the upstream first to refresh ahead/behind counts.
    #[arg(long)]
    pub remote: bool,

    #[command(flatten)]
    pub auth: AuthArgs,
}

/// Arguments for `branches`.
#[derive(Debug, Clone, Default, Args)]
pub struct BranchesArgs {
    /// List remote-tracking branches after fetching every remote.
    #[arg(short = 'r', long)]
    pub remote: bool,

    /// Delete this branch instead of listing; with -r, `remote/branch`.
    #[arg(short = 'd', long, value_name = "BRANCH", conflicts_with = "compare")]
    pub delete: Option<String>,

    /// Delete even if unmerged.
    #[arg(short = 'f', long, requires = "delete")]
    pub force: bool,

    /// Count commits ahead of and behind `remote/branch`.
    #[arg(long, value_name = "REMOTE/BRANCH")]
    pub compare: Option<String>,
}

/// Arguments for `checkout`.
#[derive(Debug, Clone, Args)]
pub struct CheckoutArgs {
    pub branch: String,

    /// Create the branch.
    #[arg(short = 'b', long)]
    pub create: bool,
}

/// Arguments for `log`.
#[derive(Debug, Clone, Default, Args)]
pub struct LogArgs {
    /// Number of commits.
    #[arg(short = 'n', long = "limit", value_name = "N")]
    pub limit: Option<usize>,

    /// Start below this commit.
    #[arg(long, value_name = "REF")]
    pub before: Option<String>,
}

/// Arguments for `show`.
#[derive(Debug, Clone, Args)]
pub struct ShowArgs {
    pub sha: String,

    /// Print one file at this revision instead of the commit.
    #[arg(long, value_name = "PATH")]
    pub file: Option<String>,
}

/// Arguments for `stage`.
#[derive(Debug, Clone, Default, Args)]
pub struct StageArgs {
    /// Files to stage; everything when empty.
    pub files: Vec<String>,
}

/// Arguments for `unstage`.
#[derive(Debug, Clone, Default, Args)]
pub struct UnstageArgs {
    /// File to unstage; everything when omitted.
    pub file: Option<String>,
}

/// Arguments for `commit`.
#[derive(Debug, Clone, Args)]
pub struct CommitArgs {
    #[arg(short = 'm', long)]
    pub message: String,
}

/// Arguments for `diff`.
#[derive(Debug, Clone, Args)]
pub struct DiffArgs {
    pub file: String,

    /// Diff the index against HEAD.
    #[arg(long)]
    pub staged: bool,
}

/// Arguments naming one file.
#[derive(Debug, Clone, Args)]
pub struct FileArgs {
    pub file: String,
}

/// Arguments for `remotes`.
#[derive(Debug, Clone, Default, Args)]
pub struct RemotesArgs {
    #[command(subcommand)]
    pub action: Option<RemoteAction>,
}

/// Remote changes.
#[derive(Debug, Clone, Subcommand)]
pub enum RemoteAction {
    /// Adds a remote.
    Add {
        name: String,
        url: String,
        #[command(flatten)]
        auth: AuthArgs,
    },
    /// Removes a remote.
    Remove { name: String },
}

/// Arguments for `pull`.
#[derive(Debug, Clone, Default, Args)]
pub struct PullArgs {
    /// `remote/branch` to pull; the upstream by default.
    #[arg(value_name = "REMOTE/BRANCH")]
    pub remote_branch: Option<String>,

    /// Make REMOTE/BRANCH the upstream.
    #[arg(short = 'u', long = "set-upstream", requires = "remote_branch")]
    pub set_upstream: bool,

    #[arg(long = "allow-unrelated-histories")]
    pub allow_unrelated_histories: bool,

    #[command(flatten)]
    pub auth: AuthArgs,
}

/// Arguments for `push`.
#[derive(Debug, Clone, Default, Args)]
pub struct PushArgs {
    /// `remote/branch` to push to; the upstream by default.
    #[arg(value_name = "REMOTE/BRANCH")]
    pub remote_branch: Option<String>,

    /// Make REMOTE/BRANCH the upstream.
    #[arg(short = 'u', long = "set-upstream", requires = "remote_branch")]
    pub set_upstream: bool,

    #[command(flatten)]
    pub auth: AuthArgs,
}

/// How `resolve` settles a conflicted file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Strategy {
    /// Keep the local side.
    Ours,
    /// Keep the incoming side.
    Theirs,
    /// The working tree copy is already fixed.
    Resolved,
}

impl From<Strategy> for Resolution {
    fn from(strategy: Strategy) -> Self {
        match strategy {
            Strategy::Ours => Self::KeepLocal,
            Strategy::Theirs => Self::KeepRemote,
            Strategy::Resolved => Self::MarkResolved,
        }
    }
}

/// Arguments for `resolve`.
#[derive(Debug, Clone, Args)]
pub struct ResolveArgs {
    pub file: String,

    #[arg(value_enum)]
    pub strategy: Strategy,
}
