// flowvcs: Git-backed project storage for flow hosts
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Version-control commands against the active project.
//!
//! Credentials given on the command line are stored for the remote first,
//! so the operation that follows picks them up like any stored auth.

use serde_json::json;
use tracing::{info, warn};

use super::{Session, print_json};
use crate::cli::auth::AuthArgs;
use crate::cli::vcs::{
    BranchesArgs, CheckoutArgs, CommitArgs, DiffArgs, FileArgs, LogArgs, PullArgs, PushArgs,
    RemoteAction, RemotesArgs, ResolveArgs, ShowArgs, StageArgs, StatusArgs, UnstageArgs,
};
use crate::error::Result;
use crate::project::{PullRequest, PushRequest, Resolution};

const DEFAULT_REMOTE: &str = "origin";

/// Remote part of `remote/branch`; `origin` when absent.
#[must_use]
pub fn remote_of(remote_branch: Option<&str>) -> &str {
    remote_branch
        .and_then(|rb| rb.split_once('/').map(|(remote, _)| remote))
        .filter(|remote| !remote.is_empty())
        .unwrap_or(DEFAULT_REMOTE)
}

async fn store_auth(session: &Session, name: &str, remote: &str, auth: &AuthArgs) -> Result<()> {
    if let Some(auth) = auth.remote_auth() {
        session
            .manager()
            .update_remote(session.caller(), name, remote, &auth)
            .await?;
    }
    Ok(())
}

/// # Errors
///
/// Returns `cannot_operate_on_inactive_project` or a git error.
pub async fn run_status_command(session: &Session, args: &StatusArgs) -> Result<()> {
    let name = session.target()?;
    if args.remote {
        store_auth(session, &name, DEFAULT_REMOTE, &args.auth).await?;
    }
    let status = session
        .manager()
        .status(session.caller(), &name, args.remote)
        .await?;
    print_json(&status)
}

/// # Errors
///
/// Returns `cannot_operate_on_inactive_project` or a git error.
pub async fn run_files_command(session: &Session) -> Result<()> {
    let name = session.target()?;
    print_json(&session.manager().files(session.caller(), &name).await?)
}

/// Lists branches, deletes one, or compares against a remote branch.
///
/// # Errors
///
/// Returns `delete_branch_unmerged` for unmerged branches unless forced.
pub async fn run_branches_command(session: &Session, args: &BranchesArgs) -> Result<()> {
    let name = session.target()?;
    let manager = session.manager();
    if let Some(branch) = &args.delete {
        manager
            .delete_branch(session.caller(), &name, branch, args.remote, args.force)
            .await?;
        info!(branch = %branch, "deleted branch");
        return Ok(());
    }
    if let Some(remote_branch) = &args.compare {
        let status = manager
            .branch_status(session.caller(), &name, remote_branch)
            .await?;
        return print_json(&status);
    }
    print_json(
        &manager
            .branches(session.caller(), &name, args.remote)
            .await?,
    )
}

/// # Errors
///
/// Returns `local_overwrite` when local changes would be lost.
pub async fn run_checkout_command(session: &Session, args: &CheckoutArgs) -> Result<()> {
    let name = session.target()?;
    session
        .manager()
        .set_branch(session.caller(), &name, &args.branch, args.create)
        .await?;
    info!(branch = %args.branch, "switched branch");
    Ok(())
}

/// # Errors
///
/// Returns a git error.
pub async fn run_log_command(session: &Session, args: &LogArgs) -> Result<()> {
    let name = session.target()?;
    let commits = session
        .manager()
        .commits(session.caller(), &name, args.limit, args.before.as_deref())
        .await?;
    print_json(&commits)
}

/// Prints a commit, or one file at that commit.
///
/// # Errors
///
/// Returns a git error, or `forbidden` for paths outside the project.
pub async fn run_show_command(session: &Session, args: &ShowArgs) -> Result<()> {
    let name = session.target()?;
    let manager = session.manager();
    let text = match &args.file {
        Some(path) => {
            manager
                .get_file(session.caller(), &name, path, Some(&args.sha))
                .await?
        }
        None => {
            manager
                .commit_detail(session.caller(), &name, &args.sha)
                .await?
        }
    };
    print!("{text}");
    Ok(())
}

/// # Errors
///
/// Returns a git error.
pub async fn run_stage_command(session: &Session, args: &StageArgs) -> Result<()> {
    let name = session.target()?;
    session
        .manager()
        .stage(session.caller(), &name, &args.files)
        .await?;
    Ok(())
}

/// # Errors
///
/// Returns a git error.
pub async fn run_unstage_command(session: &Session, args: &UnstageArgs) -> Result<()> {
    let name = session.target()?;
    session
        .manager()
        .unstage(session.caller(), &name, args.file.as_deref())
        .await?;
    Ok(())
}

/// # Errors
///
/// Returns `missing_user` without a commit identity, or a git error.
pub async fn run_commit_command(session: &Session, args: &CommitArgs) -> Result<()> {
    let name = session.target()?;
    session
        .manager()
        .commit(session.caller(), &name, &args.message)
        .await?;
    Ok(())
}

/// # Errors
///
/// Returns a git error.
pub async fn run_diff_command(session: &Session, args: &DiffArgs) -> Result<()> {
    let name = session.target()?;
    let diff = session
        .manager()
        .diff(session.caller(), &name, &args.file, args.staged)
        .await?;
    print!("{diff}");
    Ok(())
}

/// # Errors
///
/// Returns a git error, or `forbidden` for paths outside the project.
pub async fn run_revert_command(session: &Session, args: &FileArgs) -> Result<()> {
    let name = session.target()?;
    session
        .manager()
        .revert_file(session.caller(), &name, &args.file)
        .await?;
    Ok(())
}

/// # Errors
///
/// Returns `remote_already_exists`, `not_found` or a git error.
pub async fn run_remotes_command(session: &Session, args: &RemotesArgs) -> Result<()> {
    let name = session.target()?;
    let manager = session.manager();
    match &args.action {
        None => print_json(&manager.remotes(session.caller(), &name).await?),
        Some(RemoteAction::Add {
            name: remote,
            url,
            auth,
        }) => {
            manager
                .add_remote(session.caller(), &name, remote, url, auth.remote_auth().as_ref())
                .await?;
            info!(remote = %remote, "added remote");
            Ok(())
        }
        Some(RemoteAction::Remove { name: remote }) => {
            manager.remove_remote(session.caller(), &name, remote).await?;
            info!(remote = %remote, "removed remote");
            Ok(())
        }
    }
}

/// Pulls; a conflicted merge is reported, not failed.
///
/// # Errors
///
/// Returns an auth, `pull_unrelated_history` or git error.
pub async fn run_pull_command(session: &Session, args: &PullArgs) -> Result<()> {
    let name = session.target()?;
    store_auth(
        session,
        &name,
        remote_of(args.remote_branch.as_deref()),
        &args.auth,
    )
    .await?;
    let request = PullRequest {
        remote_branch: args.remote_branch.clone(),
        set_upstream: args.set_upstream,
        allow_unrelated_histories: args.allow_unrelated_histories,
    };
    let outcome = session
        .manager()
        .pull(session.caller(), &name, &request)
        .await?;
    if outcome.merge_conflict {
        warn!(
            project = %name,
            "pull stopped on conflicts; resolve them and commit, or abort-merge"
        );
    }
    print_json(&outcome)
}

/// # Errors
///
/// Returns `push_failed` for rejected pushes, an auth or git error.
pub async fn run_push_command(session: &Session, args: &PushArgs) -> Result<()> {
    let name = session.target()?;
    store_auth(
        session,
        &name,
        remote_of(args.remote_branch.as_deref()),
        &args.auth,
    )
    .await?;
    let request = PushRequest {
        remote_branch: args.remote_branch.clone(),
        set_upstream: args.set_upstream,
    };
    session
        .manager()
        .push(session.caller(), &name, &request)
        .await?;
    Ok(())
}

/// # Errors
///
/// Returns `not_merging` outside a merge.
pub async fn run_resolve_command(session: &Session, args: &ResolveArgs) -> Result<()> {
    let name = session.target()?;
    let resolution = Resolution::from(args.strategy);
    session
        .manager()
        .resolve_merge(session.caller(), &name, &args.file, &resolution)
        .await?;
    Ok(())
}

/// # Errors
///
/// Returns `not_merging` outside a merge.
pub async fn run_abort_merge_command(session: &Session) -> Result<()> {
    let name = session.target()?;
    session
        .manager()
        .abort_merge(session.caller(), &name)
        .await?;
    print_json(&json!({ "merging": false }))
}
