// flowvcs: Git-backed project storage for flow hosts
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Version-control operations routed through the manager.
//!
//! Each call first checks that the named project is the active one, so an
//! inactive project never reaches git. Operations that rewrite the role
//! files finish with the reload sequence.

use std::collections::BTreeMap;

use super::ProjectManager;
use super::host::ProjectAction;
use crate::error::VcsResult;
use crate::git::parse::{Branch, FileStatusEntry, RepoStatus, Remotes};
use crate::git::{BranchStatus, CommitList};
use crate::keyring::RemoteAuth;
use crate::project::{Caller, PullOutcome, PullRequest, PushRequest, Resolution};

impl ProjectManager {
    /// # Errors
    ///
    /// Returns `cannot_operate_on_inactive_project` or a git error.
    pub async fn status(
        &self,
        caller: &Caller,
        name: &str,
        include_remote: bool,
    ) -> VcsResult<RepoStatus> {
        self.require_active(name)?
            .status(caller, include_remote)
            .await
    }

    /// # Errors
    ///
    /// Returns `cannot_operate_on_inactive_project` or a git error.
    pub async fn files(
        &self,
        _caller: &Caller,
        name: &str,
    ) -> VcsResult<BTreeMap<String, FileStatusEntry>> {
        self.require_active(name)?.files().await
    }

    /// # Errors
    ///
    /// Returns `cannot_operate_on_inactive_project` or a git error.
    pub async fn stage(&self, _caller: &Caller, name: &str, files: &[String]) -> VcsResult<()> {
        self.require_active(name)?.stage(files).await
    }

    /// # Errors
    ///
    /// Returns `cannot_operate_on_inactive_project` or a git error.
    pub async fn unstage(&self, _caller: &Caller, name: &str, file: Option<&str>) -> VcsResult<()> {
        self.require_active(name)?.unstage(file).await
    }

    /// Commits the index; completing a merge reloads the flows.
    ///
    /// # Errors
    ///
    /// Returns `cannot_operate_on_inactive_project` or a git error.
    pub async fn commit(&self, caller: &Caller, name: &str, message: &str) -> VcsResult<()> {
        let project = self.require_active(name)?;
        let outcome = project.commit(caller, message).await?;
        if outcome.merge_completed {
            self.reload(&project, ProjectAction::MergeComplete, false)
                .await?;
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `cannot_operate_on_inactive_project` or a git error.
    pub async fn diff(
        &self,
        _caller: &Caller,
        name: &str,
        file: &str,
        staged: bool,
    ) -> VcsResult<String> {
        self.require_active(name)?.diff(file, staged).await
    }

    /// # Errors
    ///
    /// Returns `cannot_operate_on_inactive_project` or a git error.
    pub async fn commits(
        &self,
        _caller: &Caller,
        name: &str,
        limit: Option<usize>,
        before: Option<&str>,
    ) -> VcsResult<CommitList> {
        self.require_active(name)?.commits(limit, before).await
    }

    /// # Errors
    ///
    /// Returns `cannot_operate_on_inactive_project` or a git error.
    pub async fn commit_detail(
        &self,
        _caller: &Caller,
        name: &str,
        sha: &str,
    ) -> VcsResult<String> {
        self.require_active(name)?.commit_detail(sha).await
    }

    /// # Errors
    ///
    /// Returns `forbidden` for paths outside the project.
    pub async fn get_file(
        &self,
        _caller: &Caller,
        name: &str,
        path: &str,
        revision: Option<&str>,
    ) -> VcsResult<String> {
        self.require_active(name)?.get_file(path, revision).await
    }

    /// Discards working tree changes to `path`; reverting a role file
    /// reloads the flows.
    ///
    /// # Errors
    ///
    /// Returns `cannot_operate_on_inactive_project` or a git error.
    pub async fn revert_file(&self, _caller: &Caller, name: &str, path: &str) -> VcsResult<()> {
        let project = self.require_active(name)?;
        let role_file = {
            let _files = self.file_set.lock().await;
            project.revert_file(path).await?
        };
        if role_file {
            self.reload(&project, ProjectAction::Revert, false).await?;
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `not_merging` outside a merge.
    pub async fn resolve_merge(
        &self,
        _caller: &Caller,
        name: &str,
        path: &str,
        resolution: &Resolution,
    ) -> VcsResult<()> {
        let project = self.require_active(name)?;
        let _files = self.file_set.lock().await;
        project.resolve_merge(path, resolution).await
    }

    /// # Errors
    ///
    /// Returns `not_merging` outside a merge.
    pub async fn abort_merge(&self, _caller: &Caller, name: &str) -> VcsResult<()> {
        let project = self.require_active(name)?;
        {
            let _files = self.file_set.lock().await;
            project.abort_merge().await?;
        }
        self.reload(&project, ProjectAction::MergeAbort, false).await
    }

    /// # Errors
    ///
    /// Returns `push_failed`, an auth error, or `project_empty`.
    pub async fn push(&self, caller: &Caller, name: &str, request: &PushRequest) -> VcsResult<()> {
        self.require_active(name)?.push(caller, request).await
    }

    /// Pulls and reloads the flows. A conflicting pull leaves the project
    /// merging and does not reload.
    ///
    /// # Errors
    ///
    /// Returns an auth, `unrelated_histories` or git error.
    pub async fn pull(
        &self,
        caller: &Caller,
        name: &str,
        request: &PullRequest,
    ) -> VcsResult<PullOutcome> {
        let project = self.require_active(name)?;
        let outcome = project.pull(caller, request).await?;
        if !outcome.merge_conflict {
            self.reload(&project, ProjectAction::Pull, false).await?;
        }
        Ok(outcome)
    }

    /// # Errors
    ///
    /// Returns `cannot_operate_on_inactive_project` or a git error.
    pub async fn branches(
        &self,
        caller: &Caller,
        name: &str,
        remote: bool,
    ) -> VcsResult<Vec<Branch>> {
        self.require_active(name)?.branches(caller, remote).await
    }

    /// # Errors
    ///
    /// Returns `delete_branch_unmerged` unless forced.
    pub async fn delete_branch(
        &self,
        _caller: &Caller,
        name: &str,
        branch: &str,
        remote: bool,
        force: bool,
    ) -> VcsResult<()> {
        self.require_active(name)?
            .delete_branch(branch, remote, force)
            .await
    }

    /// Checks out (or creates) `branch` and reloads the flows.
    ///
    /// # Errors
    ///
    /// Returns `local_overwrite` when uncommitted changes are in the way.
    pub async fn set_branch(
        &self,
        _caller: &Caller,
        name: &str,
        branch: &str,
        create: bool,
    ) -> VcsResult<()> {
        let project = self.require_active(name)?;
        {
            let _files = self.file_set.lock().await;
            project.set_branch(branch, create).await?;
        }
        self.reload(&project, ProjectAction::ChangeBranch, false)
            .await
    }

    /// # Errors
    ///
    /// Returns `cannot_operate_on_inactive_project` or a git error.
    pub async fn branch_status(
        &self,
        _caller: &Caller,
        name: &str,
        remote_branch: &str,
    ) -> VcsResult<BranchStatus> {
        self.require_active(name)?
            .branch_status(remote_branch)
            .await
    }

    /// # Errors
    ///
    /// Returns `cannot_operate_on_inactive_project` or a git error.
    pub async fn remotes(&self, _caller: &Caller, name: &str) -> VcsResult<Remotes> {
        self.require_active(name)?.remotes().await
    }

    /// Adds a remote; `auth` is kept for this caller.
    ///
    /// # Errors
    ///
    /// Returns `remote_already_exists` or a key lookup error.
    pub async fn add_remote(
        &self,
        caller: &Caller,
        name: &str,
        remote: &str,
        url: &str,
        auth: Option<&RemoteAuth>,
    ) -> VcsResult<()> {
        let project = self.require_active(name)?;
        let credentials = auth
            .map(|a| a.resolve(self.host.keys.as_ref(), caller.key()))
            .transpose()?;
        project.add_remote(caller, remote, url, credentials).await
    }

    /// # Errors
    ///
    /// Returns `cannot_operate_on_inactive_project` or a git error.
    pub async fn remove_remote(&self, _caller: &Caller, name: &str, remote: &str) -> VcsResult<()> {
        self.require_active(name)?.remove_remote(remote).await
    }

    /// Replaces this caller's credentials for `remote`.
    ///
    /// # Errors
    ///
    /// Returns `not_found` for an unknown remote or a key lookup error.
    pub async fn update_remote(
        &self,
        caller: &Caller,
        name: &str,
        remote: &str,
        auth: &RemoteAuth,
    ) -> VcsResult<()> {
        let project = self.require_active(name)?;
        let credentials = auth.resolve(self.host.keys.as_ref(), caller.key())?;
        project.update_remote(caller, remote, credentials).await
    }
}
