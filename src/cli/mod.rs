// flowvcs: Git-backed project storage for flow hosts
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! CLI module for flowvcs using clap derive.
//!
//! # Command Structure
//!
//! ```text
//! flowvcs [global options] <command>
//! version | options | configs | check
//! list | create | activate | delete | info | update | flows
//! status | files | branches | checkout | log | show
//! stage | unstage | commit | diff | revert
//! remotes | pull | push | resolve | abort-merge
//! askpass PROMPT            (hidden, run by git)
//! ```

pub mod auth;
pub mod global;
pub mod project;
pub mod vcs;


use clap::{Parser, Subcommand};

use crate::cli::global::GlobalOptions;
use crate::cli::project::{ActivateArgs, CreateArgs, FlowsArgs, InfoArgs, NameArgs, UpdateArgs};
use crate::cli::vcs::{
    BranchesArgs, CheckoutArgs, CommitArgs, DiffArgs, FileArgs, LogArgs, PullArgs, PushArgs,
    RemotesArgs, ResolveArgs, ShowArgs, StageArgs, StatusArgs, UnstageArgs,
};

/// Git-backed project storage for flow hosts.
#[derive(Debug, Parser)]
#[command(
    name = "flowvcs",
    author,
    version,
    about = "Git-backed project storage for flow hosts",
    long_about = "flowvcs Copyright (C) 2026 Romeo Ahmed\n\
                  This program comes with ABSOLUTELY NO WARRANTY\n\
                  This is free software, and you are welcome to redistribute it\n\
                  under certain conditions; see LICENSE for details.\n\n\
                  Keeps each flow project in its own git repository. One project\n\
                  is active at a time; version-control commands act on it unless\n\
                  --project names it explicitly. Results are printed as JSON.",
    after_help = "CONFIG FILES:\n\n\
                  flowvcs reads $XDG_CONFIG_HOME/flowvcs/flowvcs.toml, then\n\
                  flowvcs.toml in the current directory, then every --config file.\n\
                  FLOWVCS_<SECTION>__<KEY> variables and --set override them.\n\
                  Use --no-default-configs to only load --config files."
)]
pub struct Cli {
    /// Global options shared by all commands
    #[command(flatten)]
    pub global: GlobalOptions,

    /// Command to execute
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Shows the version.
    Version,

    /// Lists all options and their values.
    Options,

    /// Lists the configuration files used.
    Configs,

    /// Checks the git installation and global identity.
    Check,

    /// Lists projects.
    List,

    /// Creates or clones a project and makes it active.
    Create(CreateArgs),

    /// Makes a project active.
    Activate(ActivateArgs),

    /// Deletes an inactive project.
    Delete(NameArgs),

    /// Describes a project.
    Info(InfoArgs),

    /// Changes the active project's metadata or credential key.
    Update(UpdateArgs),

    /// Prints the active project's flows.
    Flows(FlowsArgs),

    /// Shows working tree status.
    Status(StatusArgs),

    /// Lists tracked and untracked files with their status.
    Files,

    /// Lists branches.
    Branches(BranchesArgs),

    /// Switches branch.
    Checkout(CheckoutArgs),

    /// Lists commits.
    Log(LogArgs),

    /// Shows a commit.
    Show(ShowArgs),

    /// Stages files.
    Stage(StageArgs),

    /// Unstages files.
    Unstage(UnstageArgs),

    /// Commits staged changes.
    Commit(CommitArgs),

    /// Shows changes to a file.
    Diff(DiffArgs),

    /// Discards working tree changes to a file.
    Revert(FileArgs),

    /// Lists or changes remotes.
    Remotes(RemotesArgs),

    /// Pulls from a remote.
    Pull(PullArgs),

    /// Pushes to a remote.
    Push(PushArgs),

    /// Settles a conflicted file during a merge.
    Resolve(ResolveArgs),

    /// Abandons the merge in progress.
    #[command(name = "abort-merge")]
    AbortMerge,

    /// Relays a git credential prompt; run by git, not by people.
    #[command(hide = true)]
    Askpass {
        prompt: String,
    },
}

/// Parses command-line arguments.
#[must_use]
pub fn parse() -> Cli {
    Cli::parse()
}

/// Parses command-line arguments from an iterator.
pub fn parse_from<I, T>(iter: I) -> Cli
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    Cli::parse_from(iter)
}
