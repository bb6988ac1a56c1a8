// flowvcs: Git-backed project storage for flow hosts
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Version-control operations on a [`Project`].
//!
//! Every operation holds the project's `op_lock` for its whole git
//! sequence, so a second caller waits instead of running git alongside.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tokio::fs;
use tracing::{debug, info, warn};

use super::{Caller, Project};
use crate::error::{ErrorCode, ProjectError, VcsResult};
use crate::git::parse::{Branch, FileStatusEntry, RepoStatus, Remotes};
use crate::git::{BranchStatus, CommitList, Credentials, GitUser, PullOptions, PushOptions};

/// How to settle one conflicted file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Resolution {
    /// Keep our side (`checkout --ours`).
    KeepLocal,
    /// Keep their side (`checkout --theirs`).
    KeepRemote,
    /// The working tree copy is already resolved.
    MarkResolved,
    /// Replace the file with this text.
    Content(String),
}

/// `push` parameters. `remote_branch` is `remote/branch`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PushRequest {
    pub remote_branch: Option<String>,
    pub set_upstream: bool,
}

/// `pull` parameters. `remote_branch` is `remote/branch`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PullRequest {
    pub remote_branch: Option<String>,
    pub set_upstream: bool,
    pub allow_unrelated_histories: bool,
}

/// Result of a pull that reached git.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PullOutcome {
    /// The merge stopped on conflicts; the project is now merging.
    pub merge_conflict: bool,
}

/// Result of a commit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommitOutcome {
    /// The commit concluded a merge in progress.
    pub merge_completed: bool,
}

/// `origin/main` -> (`origin`, `Some("main")`); `origin` -> (`origin`, `None`).
fn split_remote_branch(spec: &str) -> (&str, Option<&str>) {
    match spec.split_once('/') {
        Some((remote, branch)) if !branch.is_empty() => (remote, Some(branch)),
        _ => (spec.trim_end_matches('/'), None),
    }
}

impl Project {
    fn auth_for(&self, caller: &Caller, remote: &str) -> Option<Credentials> {
        self.state()
            .remote_auth
            .get(&(caller.key().to_string(), remote.to_string()))
            .cloned()
    }

    fn identity_for<'a>(&'a self, caller: &'a Caller) -> Option<&'a GitUser> {
        caller.identity.as_ref().or(self.identity.as_ref())
    }

    fn ensure_not_empty(&self) -> VcsResult<()> {
        if self.state().empty {
            return Err(ProjectError::Empty.into());
        }
        Ok(())
    }

    async fn sync_merging(&self) -> VcsResult<bool> {
        let merging = self.git.is_merging(&self.path).await?;
        self.state().merging = merging;
        Ok(merging)
    }

    // --- Status and files ---

    /// Working tree status; with `include_remote`, fetches the upstream
    /// first and reports a fetch failure as `branches.remoteError`.
    ///
    /// # Errors
    ///
    /// Returns a classified git error.
    pub async fn status(&self, caller: &Caller, include_remote: bool) -> VcsResult<RepoStatus> {
        let _op = self.op_lock.lock().await;
        let mut fetch_error = None;
        if include_remote && let Some(upstream) = self.git.upstream(&self.path).await? {
            let (remote, _) = split_remote_branch(&upstream);
            let auth = self.auth_for(caller, remote);
            if let Err(e) = self.git.fetch(&self.path, remote, auth.as_ref()).await {
                warn!(project = %self.name, remote, error = %e, "fetch for status failed");
                fetch_error = Some(e.code());
            }
        }

        let mut status = self.git.status(&self.path).await?;
        if status.branches.remote_error.is_none() {
            status.branches.remote_error = fetch_error;
        }
        let mut state = self.state();
        state.empty = status.commits.total == 0;
        state.merging = status.merging;
        Ok(status)
    }

    /// # Errors
    ///
    /// Returns a classified git error.
    pub async fn files(&self) -> VcsResult<BTreeMap<String, FileStatusEntry>> {
        Ok(self.status(&Caller::default(), false).await?.files)
    }

    /// Stages `files`, or everything when empty.
    ///
    /// # Errors
    ///
    /// Returns a classified git error.
    pub async fn stage(&self, files: &[String]) -> VcsResult<()> {
        let _op = self.op_lock.lock().await;
        self.git.stage(&self.path, files).await
    }

    /// # Errors
    ///
    /// Returns a classified git error.
    pub async fn unstage(&self, file: Option<&str>) -> VcsResult<()> {
        let _op = self.op_lock.lock().await;
        self.git.unstage(&self.path, file).await
    }

    /// Commits what is already staged.
    ///
    /// # Errors
    ///
    /// Returns a classified git error.
    pub async fn commit(&self, caller: &Caller, message: &str) -> VcsResult<CommitOutcome> {
        let _op = self.op_lock.lock().await;
        let was_merging = self.state().merging;
        self.git
            .commit(&self.path, message, self.identity_for(caller))
            .await?;
        let merging = self.sync_merging().await?;
        self.state().empty = false;

        let outcome = CommitOutcome {
            merge_completed: was_merging && !merging,
        };
        info!(project = %self.name, merge_completed = outcome.merge_completed, "committed");
        Ok(outcome)
    }

    /// # Errors
    ///
    /// Returns a classified git error.
    pub async fn diff(&self, file: &str, staged: bool) -> VcsResult<String> {
        let _op = self.op_lock.lock().await;
        self.git.diff(&self.path, file, staged).await
    }

    /// # Errors
    ///
    /// Returns a classified git error.
    pub async fn commits(
        &self,
        limit: Option<usize>,
        before: Option<&str>,
    ) -> VcsResult<CommitList> {
        let _op = self.op_lock.lock().await;
        self.git.commits(&self.path, limit, before).await
    }

    /// Full `git show` text of one commit.
    ///
    /// # Errors
    ///
    /// Returns a classified git error.
    pub async fn commit_detail(&self, sha: &str) -> VcsResult<String> {
        let _op = self.op_lock.lock().await;
        self.git.show_commit(&self.path, sha).await
    }

    /// Reads `path` from the working tree, or at `revision` when given.
    ///
    /// # Errors
    ///
    /// Returns `ProjectError::Forbidden` for paths outside the project,
    /// otherwise an I/O or classified git error.
    pub async fn get_file(&self, path: &str, revision: Option<&str>) -> VcsResult<String> {
        let full = self.resolve(path)?;
        match revision {
            None => Ok(fs::read_to_string(full).await?),
            Some(treeish) => {
                let _op = self.op_lock.lock().await;
                self.git.show_file(&self.path, path, treeish).await
            }
        }
    }

    /// Discards working tree changes to `path`.
    ///
    /// Returns true if `path` is a role file, so the running flows changed.
    ///
    /// # Errors
    ///
    /// Returns a classified git error.
    pub async fn revert_file(&self, path: &str) -> VcsResult<bool> {
        self.resolve(path)?;
        let _op = self.op_lock.lock().await;
        self.git.revert_file(&self.path, path).await?;
        Ok(self.state().files.contains(path))
    }

    // --- Merging ---

    /// Settles one conflicted file and stages it.
    ///
    /// # Errors
    ///
    /// Returns `ProjectError::NotMerging` outside a merge.
    pub async fn resolve_merge(&self, path: &str, resolution: &Resolution) -> VcsResult<()> {
        let full = self.resolve(path)?;
        if !self.state().merging {
            return Err(ProjectError::NotMerging.into());
        }
        let _op = self.op_lock.lock().await;
        match resolution {
            Resolution::KeepLocal => self.git.checkout_side(&self.path, path, true).await?,
            Resolution::KeepRemote => self.git.checkout_side(&self.path, path, false).await?,
            Resolution::MarkResolved => {}
            Resolution::Content(text) => fs::write(&full, text).await?,
        }
        self.git.stage(&self.path, &[path.to_string()]).await?;
        debug!(project = %self.name, path, ?resolution, "conflict resolved");
        Ok(())
    }

    /// Abandons the merge in progress.
    ///
    /// # Errors
    ///
    /// Returns `ProjectError::NotMerging` outside a merge.
    pub async fn abort_merge(&self) -> VcsResult<()> {
        let _op = self.op_lock.lock().await;
        if !self.sync_merging().await? {
            return Err(ProjectError::NotMerging.into());
        }
        self.git.abort_merge(&self.path).await?;
        self.sync_merging().await?;
        self.refresh_locked().await?;
        info!(project = %self.name, "merge aborted");
        Ok(())
    }

    // --- Network ---

    /// Pushes `HEAD`. Without a target the upstream (or `origin`) is used.
    ///
    /// # Errors
    ///
    /// Returns a classified git error, `push_failed` for rejected
    /// non-fast-forward updates.
    pub async fn push(&self, caller: &Caller, request: &PushRequest) -> VcsResult<()> {
        self.ensure_not_empty()?;
        let _op = self.op_lock.lock().await;
        let target = match &request.remote_branch {
            Some(spec) => spec.clone(),
            None => self
                .git
                .upstream(&self.path)
                .await?
                .unwrap_or_else(|| "origin".to_string()),
        };
        let (remote, branch) = split_remote_branch(&target);
        let auth = self.auth_for(caller, remote);
        let options = PushOptions {
            remote,
            branch,
            set_upstream: request.set_upstream,
        };
        self.git.push(&self.path, &options, auth.as_ref()).await?;
        info!(project = %self.name, remote, branch = ?branch, "pushed");
        Ok(())
    }

    /// Pulls. A conflicted merge is not an error: the project enters the
    /// merging state and the outcome says so.
    ///
    /// Without a target git pulls the upstream, and the credentials stored
    /// for the upstream's remote (or `origin`) are used.
    ///
    /// # Errors
    ///
    /// Returns any classified git error other than `merge_conflict`.
    pub async fn pull(&self, caller: &Caller, request: &PullRequest) -> VcsResult<PullOutcome> {
        let _op = self.op_lock.lock().await;
        let upstream = match &request.remote_branch {
            Some(_) => None,
            None => self.git.upstream(&self.path).await?,
        };
        let target = request
            .remote_branch
            .as_deref()
            .map(split_remote_branch);
        let remote = target.map_or_else(
            || upstream.as_deref().map_or("origin", |u| split_remote_branch(u).0),
            |(r, _)| r,
        );
        let auth = self.auth_for(caller, remote);

        if request.set_upstream
            && let Some((remote, Some(_))) = target
            && let Some(spec) = request.remote_branch.as_deref()
        {
            self.git.fetch(&self.path, remote, auth.as_ref()).await?;
            self.git.set_upstream(&self.path, spec).await?;
        }

        let options = PullOptions {
            remote: Some(remote),
            branch: target.and_then(|(_, b)| b),
            allow_unrelated_histories: request.allow_unrelated_histories,
            user: self.identity_for(caller),
        };
        let result = self.git.pull(&self.path, &options, auth.as_ref()).await;
        let outcome = match result {
            Ok(()) => PullOutcome::default(),
            Err(e) if e.code() == ErrorCode::MergeConflict => {
                warn!(project = %self.name, "pull stopped on conflicts");
                PullOutcome {
                    merge_conflict: true,
                }
            }
            Err(e) => return Err(e),
        };
        self.refresh_locked().await?;
        info!(project = %self.name, merge_conflict = outcome.merge_conflict, "pulled");
        Ok(outcome)
    }

    // --- Branches ---

    /// Local branches, or remote-tracking branches after fetching every
    /// remote.
    ///
    /// # Errors
    ///
    /// Returns a classified git error.
    pub async fn branches(&self, caller: &Caller, remote: bool) -> VcsResult<Vec<Branch>> {
        let _op = self.op_lock.lock().await;
        if remote {
            for name in self.git.remotes(&self.path).await?.keys() {
                let auth = self.auth_for(caller, name);
                self.git.fetch(&self.path, name, auth.as_ref()).await?;
            }
        }
        self.git.branches(&self.path, remote).await
    }

    /// # Errors
    ///
    /// Returns `delete_branch_unmerged` without `force`.
    pub async fn delete_branch(&self, name: &str, remote: bool, force: bool) -> VcsResult<()> {
        let _op = self.op_lock.lock().await;
        self.git.delete_branch(&self.path, name, remote, force).await
    }

    /// Checks out (or creates) `name` and re-reads the project files.
    ///
    /// # Errors
    ///
    /// Returns `local_overwrite` if local changes would be lost.
    pub async fn set_branch(&self, name: &str, create: bool) -> VcsResult<()> {
        let _op = self.op_lock.lock().await;
        self.git.checkout_branch(&self.path, name, create).await?;
        self.refresh_locked().await?;
        info!(project = %self.name, branch = name, create, "branch changed");
        Ok(())
    }

    /// # Errors
    ///
    /// Returns a classified git error.
    pub async fn branch_status(&self, remote_branch: &str) -> VcsResult<BranchStatus> {
        let _op = self.op_lock.lock().await;
        self.git.branch_status(&self.path, remote_branch).await
    }

    // --- Remotes ---

    /// # Errors
    ///
    /// Returns a classified git error.
    pub async fn remotes(&self) -> VcsResult<Remotes> {
        let _op = self.op_lock.lock().await;
        self.git.remotes(&self.path).await
    }

    /// Adds a remote, remembering `auth` for this caller.
    ///
    /// # Errors
    ///
    /// Returns `remote_already_exists` for a duplicate name.
    pub async fn add_remote(
        &self,
        caller: &Caller,
        name: &str,
        url: &str,
        auth: Option<Credentials>,
    ) -> VcsResult<()> {
        let _op = self.op_lock.lock().await;
        self.git.add_remote(&self.path, name, url).await?;
        if let Some(auth) = auth {
            self.store_auth(caller, name, auth);
        }
        Ok(())
    }

    /// Removes a remote and every stored credential for it.
    ///
    /// # Errors
    ///
    /// Returns a classified git error.
    pub async fn remove_remote(&self, name: &str) -> VcsResult<()> {
        let _op = self.op_lock.lock().await;
        self.git.remove_remote(&self.path, name).await?;
        self.state().remote_auth.retain(|(_, remote), _| remote != name);
        Ok(())
    }

    /// Replaces the caller's stored credentials for `name`.
    ///
    /// # Errors
    ///
    /// Returns `ProjectError::NotFound` for an unknown remote.
    pub async fn update_remote(
        &self,
        caller: &Caller,
        name: &str,
        auth: Credentials,
    ) -> VcsResult<()> {
        let _op = self.op_lock.lock().await;
        if !self.git.remotes(&self.path).await?.contains_key(name) {
            return Err(ProjectError::NotFound {
                what: "remote",
                name: name.to_string(),
            }
            .into());
        }
        self.store_auth(caller, name, auth);
        Ok(())
    }

    fn store_auth(&self, caller: &Caller, remote: &str, auth: Credentials) {
        debug!(project = %self.name, remote, kind = ?auth.kind(), "remote auth stored");
        self.state()
            .remote_auth
            .insert((caller.key().to_string(), remote.to_string()), auth);
    }
}
