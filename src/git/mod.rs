// flowvcs: Git-backed project storage for flow hosts
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Git operations module.
//!
//! ```text
//!            repo.rs  (Git facade, typed operations)
//!           /    |     \
//!          v     v      v
//!    runner.rs  auth/   parse/
//!    GitRunner  Broker  status/branch/log/remote
//!        |        |
//!        v        v
//!    ShellGit   AuthSession (unix socket + askpass scripts)
//!        |
//!        v
//!   classify.rs  ordered (pattern -> ErrorCode) table
//! ```
//!
//! **`ShellGit`** always shells out to the installed git; nothing here reads
//! repository internals directly.

pub mod auth;
pub mod classify;
pub mod parse;
pub mod repo;
pub mod runner;

#[cfg(test)]
pub(crate) mod fake;
#[cfg(test)]
mod tests;

pub use auth::{AuthBroker, Credentials};
pub use repo::{
    BranchStatus, CloneOptions, CommitList, Git, GitInfo, GitUser, PullOptions, PushOptions,
};
pub use runner::{GitOutput, GitRequest, GitRunner, ShellGit};
