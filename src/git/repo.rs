// flowvcs: Git-backed project storage for flow hosts
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Typed git operations on a working directory.
//!
//! ```text
//! Git { runner: Arc<dyn GitRunner>, broker: AuthBroker }
//!   exec()       run + classify, returns stdout
//!   exec_auth()  open AuthSession --> exec --> close (every path)
//!
//! read     status, commit_count, is_merging, commits, show_*, diff,
//!          remotes, branches, upstream, branch_status
//! write    init, stage, unstage, commit, revert_file, checkout_*,
//!          abort_merge, add/remove_remote, set_upstream, delete_branch
//! network  clone_repo, fetch, pull, push
//! ```

use regex::Regex;
use serde::Serialize;
use std::path::Path;
use std::sync::{Arc, LazyLock};
use tracing::debug;

use super::auth::{AuthBroker, Credentials};
use super::parse::{
    Branch, CommitRecord, LOG_FORMAT, RepoStatus, Remotes, build_status, parse_branches,
    parse_log, parse_remotes,
};
use super::runner::{Classifier, GitOutput, GitRequest, GitRunner};
use crate::error::{GitError, ProjectError, VcsResult};

static VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r" (\d\S*)").expect("Invalid regex pattern"));

/// Default page size for commit listings.
pub const DEFAULT_COMMIT_LIMIT: usize = 20;

/// Identity used for commits and merge commits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GitUser {
    pub name: String,
    pub email: String,
}

impl GitUser {
    fn config_args(user: Option<&Self>) -> Vec<String> {
        user.map_or_else(Vec::new, |u| {
            vec![
                "-c".to_string(),
                format!("user.name={}", u.name),
                "-c".to_string(),
                format!("user.email={}", u.email),
            ]
        })
    }
}

/// Result of probing the installed git.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GitInfo {
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<GitUser>,
}

/// A page of history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitList {
    pub count: usize,
    pub commits: Vec<CommitRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub before: Option<String>,
    pub total: u64,
}

/// Divergence between `HEAD` and a remote branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct BranchStatus {
    pub ahead: u64,
    pub behind: u64,
}

/// `pull` arguments.
#[derive(Debug, Clone, Default)]
pub struct PullOptions<'a> {
    pub remote: Option<&'a str>,
    pub branch: Option<&'a str>,
    pub allow_unrelated_histories: bool,
    pub user: Option<&'a GitUser>,
}

/// `push` arguments.
#[derive(Debug, Clone)]
pub struct PushOptions<'a> {
    pub remote: &'a str,
    pub branch: Option<&'a str>,
    pub set_upstream: bool,
}

/// `clone` arguments.
#[derive(Debug, Clone)]
pub struct CloneOptions<'a> {
    pub url: &'a str,
    pub remote_name: Option<&'a str>,
    pub branch: Option<&'a str>,
}

/// Facade over a [`GitRunner`] and the [`AuthBroker`].
#[derive(Clone)]
pub struct Git {
    runner: Arc<dyn GitRunner>,
    broker: AuthBroker,
}

impl std::fmt::Debug for Git {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Git").field("broker", &self.broker).finish_non_exhaustive()
    }
}

fn args<const N: usize>(list: [&str; N]) -> Vec<String> {
    list.iter().map(|s| (*s).to_string()).collect()
}

/// Refuses caller-supplied refs, urls and names that git would read as options.
fn plain(value: &str) -> VcsResult<&str> {
    if value.starts_with('-') {
        return Err(ProjectError::OptionArgument {
            value: value.to_string(),
        }
        .into());
    }
    Ok(value)
}

fn is_ambiguous(err: &GitError) -> bool {
    err.message().to_lowercase().contains("ambiguous argument")
}

impl Git {
    pub fn new(runner: Arc<dyn GitRunner>, broker: AuthBroker) -> Self {
        Self { runner, broker }
    }

    #[must_use]
    pub const fn broker(&self) -> &AuthBroker {
        &self.broker
    }

    async fn run_raw(&self, request: GitRequest) -> VcsResult<(GitRequest, GitOutput)> {
        let output = self.runner.run(request.clone()).await?;
        Ok((request, output))
    }

    /// Runs a request and returns stdout, classifying failures.
    async fn exec(&self, request: GitRequest) -> VcsResult<String> {
        let (request, output) = self.run_raw(request).await?;
        Ok(output.into_result(&request)?.stdout)
    }

    /// Runs a networked request, forwarding credentials when supplied.
    ///
    /// The auth endpoint is closed before the result is returned, whether
    /// git succeeded, failed or could not be spawned.
    async fn exec_auth(
        &self,
        request: GitRequest,
        auth: Option<&Credentials>,
    ) -> VcsResult<String> {
        let Some(credentials) = auth else {
            return self.exec(request).await;
        };
        let session = self.broker.open(credentials)?;
        let request = request.envs(session.env().clone());
        let result = self.exec(request).await;
        session.close().await;
        result
    }

    // --- Environment ---

    /// Reports the git version and global identity.
    ///
    /// # Errors
    ///
    /// Returns `GitError::NotInstalled` if git cannot run and
    /// `GitError::VersionTooOld` for 1.x releases.
    pub async fn check_install(&self, cwd: &Path) -> VcsResult<GitInfo> {
        let out = self
            .exec(GitRequest::new(cwd, ["--version"]))
            .await
            .map_err(|_| GitError::NotInstalled)?;
        let version = VERSION
            .captures(&out)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .ok_or_else(|| GitError::Output {
                command: "git --version".to_string(),
                message: out.trim().to_string(),
            })?;
        if version.starts_with("1.") {
            return Err(GitError::VersionTooOld { version }.into());
        }

        let global = |key: &'static str| async move {
            self.exec(GitRequest::new(cwd, ["config", "--global", key]))
                .await
                .map(|v| v.trim().to_string())
                .unwrap_or_default()
        };
        let name = global("user.name").await;
        let email = global("user.email").await;
        let user = (!name.is_empty() && !email.is_empty()).then_some(GitUser { name, email });

        debug!(version = %version, has_user = user.is_some(), "git installation checked");
        Ok(GitInfo { version, user })
    }

    // --- Repository lifecycle ---

    /// # Errors
    ///
    /// Returns a classified git error.
    pub async fn init(&self, dir: &Path) -> VcsResult<()> {
        self.exec(GitRequest::new(dir, ["init"])).await.map(drop)
    }

    /// Clones into `dir` (which must be empty).
    ///
    /// # Errors
    ///
    /// Returns a classified git error carrying the remote name.
    pub async fn clone_repo(
        &self,
        dir: &Path,
        options: &CloneOptions<'_>,
        auth: Option<&Credentials>,
    ) -> VcsResult<()> {
        let url = plain(options.url)?;
        let mut argv = args(["clone"]);
        if let Some(name) = options.remote_name {
            argv.extend(args(["-o", plain(name)?]));
        }
        if let Some(branch) = options.branch {
            argv.extend(args(["-b", plain(branch)?]));
        }
        argv.extend(args(["--end-of-options", url, "."]));
        let remote = options.remote_name.unwrap_or("origin");
        let request = GitRequest::new(dir, argv).network(Some(remote));
        self.exec_auth(request, auth).await.map(drop)
    }

    // --- Status ---

    /// Number of commits reachable from `HEAD`; 0 before the first commit.
    ///
    /// # Errors
    ///
    /// Returns a classified git error other than "no HEAD yet".
    pub async fn commit_count(&self, dir: &Path) -> VcsResult<u64> {
        let (request, output) = self
            .run_raw(GitRequest::new(dir, ["rev-list", "HEAD", "--count"]))
            .await?;
        match output.into_result(&request) {
            Ok(out) => Ok(out.stdout.trim().parse().unwrap_or(0)),
            Err(e) if is_ambiguous(&e) => Ok(0),
            Err(e) => Err(e.into()),
        }
    }

    /// True while `MERGE_HEAD` exists.
    ///
    /// # Errors
    ///
    /// Returns an error only if git cannot be run.
    pub async fn is_merging(&self, dir: &Path) -> VcsResult<bool> {
        let output = self
            .runner
            .run(GitRequest::new(dir, ["rev-parse", "-q", "--verify", "MERGE_HEAD"]))
            .await?;
        Ok(output.exit_code == 0)
    }

    /// Full working tree status, including the merging flag.
    ///
    /// # Errors
    ///
    /// Returns a classified git error.
    pub async fn status(&self, dir: &Path) -> VcsResult<RepoStatus> {
        let total = self.commit_count(dir).await?;
        let listing = self
            .exec(GitRequest::new(
                dir,
                ["ls-files", "--cached", "--others", "--exclude-standard"],
            ))
            .await?;
        let porcelain = self
            .exec(GitRequest::new(dir, ["status", "--porcelain", "-b"]))
            .await?;
        let mut status = build_status(total, &listing, &porcelain);
        status.merging = self.is_merging(dir).await?;
        Ok(status)
    }

    // --- Index and working tree ---

    /// Stages `files`; an empty list stages everything.
    ///
    /// # Errors
    ///
    /// Returns a classified git error.
    pub async fn stage(&self, dir: &Path, files: &[String]) -> VcsResult<()> {
        let mut argv = args(["add"]);
        if files.is_empty() {
            argv.push("-A".to_string());
        } else {
            argv.push("--".to_string());
            argv.extend(files.iter().cloned());
        }
        self.exec(GitRequest::new(dir, argv)).await.map(drop)
    }

    /// Unstages `file`, or everything when `None`.
    ///
    /// # Errors
    ///
    /// Returns a classified git error.
    pub async fn unstage(&self, dir: &Path, file: Option<&str>) -> VcsResult<()> {
        let mut argv = args(["reset", "--"]);
        argv.extend(file.map(String::from));
        self.exec(GitRequest::new(dir, argv)).await.map(drop)
    }

    /// Commits what is staged.
    ///
    /// # Errors
    ///
    /// Returns a classified git error (`missing_user` without an identity).
    pub async fn commit(&self, dir: &Path, message: &str, user: Option<&GitUser>) -> VcsResult<()> {
        let mut argv = GitUser::config_args(user);
        argv.extend(args(["commit", "-m", message]));
        self.exec(GitRequest::new(dir, argv)).await.map(drop)
    }

    /// Whitespace-insensitive diff of one file against the index or `HEAD`.
    ///
    /// # Errors
    ///
    /// Returns a classified git error.
    pub async fn diff(&self, dir: &Path, file: &str, staged: bool) -> VcsResult<String> {
        let mut argv = args(["diff", "-w"]);
        if staged {
            argv.push("--cached".to_string());
        }
        argv.extend(args(["--", file]));
        self.exec(GitRequest::new(dir, argv)).await
    }

    /// Contents of `path` at `treeish`.
    ///
    /// # Errors
    ///
    /// Returns a classified git error.
    pub async fn show_file(&self, dir: &Path, path: &str, treeish: &str) -> VcsResult<String> {
        let spec = format!("{}:{path}", plain(treeish)?);
        self.exec(GitRequest::new(
            dir,
            ["show", "--end-of-options", spec.as_str()],
        ))
        .await
    }

    /// `git show <sha>` text.
    ///
    /// # Errors
    ///
    /// Returns a classified git error.
    pub async fn show_commit(&self, dir: &Path, sha: &str) -> VcsResult<String> {
        self.exec(GitRequest::new(dir, ["show", "--end-of-options", plain(sha)?]))
            .await
    }

    /// Discards working tree changes to `path`.
    ///
    /// # Errors
    ///
    /// Returns a classified git error.
    pub async fn revert_file(&self, dir: &Path, path: &str) -> VcsResult<()> {
        self.exec(GitRequest::new(dir, ["checkout", "--", path]))
            .await
            .map(drop)
    }

    /// Takes one side of a conflicted file: `ours` or `theirs`.
    ///
    /// # Errors
    ///
    /// Returns a classified git error.
    pub async fn checkout_side(&self, dir: &Path, path: &str, ours: bool) -> VcsResult<()> {
        let side = if ours { "--ours" } else { "--theirs" };
        self.exec(GitRequest::new(dir, ["checkout", side, "--", path]))
            .await
            .map(drop)
    }

    /// # Errors
    ///
    /// Returns a classified git error.
    pub async fn abort_merge(&self, dir: &Path) -> VcsResult<()> {
        self.exec(GitRequest::new(dir, ["merge", "--abort"]))
            .await
            .map(drop)
    }

    // --- History ---

    /// A page of commits, newest first.
    ///
    /// # Errors
    ///
    /// Returns a classified git error.
    pub async fn commits(
        &self,
        dir: &Path,
        limit: Option<usize>,
        before: Option<&str>,
    ) -> VcsResult<CommitList> {
        before.map(plain).transpose()?;
        let total = self.commit_count(dir).await?;
        if total == 0 {
            return Ok(CommitList {
                count: 0,
                commits: Vec::new(),
                before: before.map(String::from),
                total,
            });
        }
        let limit = limit.filter(|l| *l > 0).unwrap_or(DEFAULT_COMMIT_LIMIT);
        let mut argv = vec![
            "log".to_string(),
            LOG_FORMAT.to_string(),
            "-n".to_string(),
            limit.to_string(),
        ];
        if let Some(before) = before {
            argv.extend(args(["--end-of-options", before]));
        }
        let commits = parse_log(&self.exec(GitRequest::new(dir, argv)).await?);
        Ok(CommitList {
            count: commits.len(),
            commits,
            before: before.map(String::from),
            total,
        })
    }

    // --- Remotes ---

    /// # Errors
    ///
    /// Returns a classified git error.
    pub async fn remotes(&self, dir: &Path) -> VcsResult<Remotes> {
        let out = self.exec(GitRequest::new(dir, ["remote", "-v"])).await?;
        Ok(parse_remotes(&out))
    }

    /// # Errors
    ///
    /// Returns `remote_already_exists` for duplicate names.
    pub async fn add_remote(&self, dir: &Path, name: &str, url: &str) -> VcsResult<()> {
        self.exec(GitRequest::new(
            dir,
            ["remote", "add", "--", plain(name)?, plain(url)?],
        ))
            .await
            .map(drop)
    }

    /// # Errors
    ///
    /// Returns a classified git error.
    pub async fn remove_remote(&self, dir: &Path, name: &str) -> VcsResult<()> {
        self.exec(GitRequest::new(dir, ["remote", "remove", "--", plain(name)?]))
            .await
            .map(drop)
    }

    // --- Branches ---

    /// Local (or remote-tracking) branches.
    ///
    /// # Errors
    ///
    /// Returns a classified git error.
    pub async fn branches(&self, dir: &Path, remote: bool) -> VcsResult<Vec<Branch>> {
        let mut argv = args(["branch", "-vv", "--no-color"]);
        if remote {
            argv.push("-r".to_string());
        }
        let out = self.exec(GitRequest::new(dir, argv)).await?;
        Ok(parse_branches(&out))
    }

    /// Upstream of the current branch, if one is configured.
    ///
    /// # Errors
    ///
    /// Returns a classified git error other than "no upstream".
    pub async fn upstream(&self, dir: &Path) -> VcsResult<Option<String>> {
        let (request, output) = self
            .run_raw(GitRequest::new(
                dir,
                ["rev-parse", "--abbrev-ref", "--symbolic-full-name", "@{u}"],
            ))
            .await?;
        match output.into_result(&request) {
            Ok(out) => Ok(Some(out.stdout.trim().to_string()).filter(|s| !s.is_empty())),
            Err(e)
                if e.message().to_lowercase().contains("no upstream configured")
                    || is_ambiguous(&e) =>
            {
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// # Errors
    ///
    /// Returns a classified git error.
    pub async fn set_upstream(&self, dir: &Path, remote_branch: &str) -> VcsResult<()> {
        self.exec(GitRequest::new(
            dir,
            ["branch", "--set-upstream-to", plain(remote_branch)?],
        ))
        .await
        .map(drop)
    }

    /// # Errors
    ///
    /// Returns `local_overwrite` if uncommitted changes would be lost.
    pub async fn checkout_branch(&self, dir: &Path, name: &str, create: bool) -> VcsResult<()> {
        let name = plain(name)?;
        let argv = if create {
            args(["checkout", "-b", name])
        } else {
            args(["checkout", name])
        };
        self.exec(GitRequest::new(dir, argv)).await.map(drop)
    }

    /// Deletes a local branch.
    ///
    /// # Errors
    ///
    /// Returns `delete_branch_unmerged` without `force`, and an
    /// unsupported error for remote branches.
    pub async fn delete_branch(
        &self,
        dir: &Path,
        name: &str,
        remote: bool,
        force: bool,
    ) -> VcsResult<()> {
        if remote {
            return Err(
                ProjectError::Unsupported("deleting remote branches is not supported").into(),
            );
        }
        let flag = if force { "-D" } else { "-d" };
        self.exec(GitRequest::new(dir, ["branch", flag, "--", plain(name)?]))
            .await
            .map(drop)
    }

    /// Commits on `HEAD` not on `remote_branch` and vice versa.
    ///
    /// # Errors
    ///
    /// Returns a classified git error.
    pub async fn branch_status(&self, dir: &Path, remote_branch: &str) -> VcsResult<BranchStatus> {
        let count = |argv: Vec<String>| async move {
            self.exec(GitRequest::new(dir, argv))
                .await
                .map(|out| out.trim().parse::<u64>().unwrap_or(0))
        };
        let not_remote = format!("^{}", plain(remote_branch)?);
        let ahead = count(args(["rev-list", "HEAD", not_remote.as_str(), "--count"])).await?;
        let behind = count(args(["rev-list", "^HEAD", remote_branch, "--count"])).await?;
        Ok(BranchStatus { ahead, behind })
    }

    // --- Network ---

    /// # Errors
    ///
    /// Returns a classified git error carrying the remote name.
    pub async fn fetch(
        &self,
        dir: &Path,
        remote: &str,
        auth: Option<&Credentials>,
    ) -> VcsResult<()> {
        let request = GitRequest::new(dir, ["fetch", plain(remote)?]).network(Some(remote));
        self.exec_auth(request, auth).await.map(drop)
    }

    /// Pulls; a conflicted merge surfaces as `merge_conflict`.
    ///
    /// # Errors
    ///
    /// Returns a classified git error carrying the remote name.
    pub async fn pull(
        &self,
        dir: &Path,
        options: &PullOptions<'_>,
        auth: Option<&Credentials>,
    ) -> VcsResult<()> {
        let mut argv = GitUser::config_args(options.user);
        argv.extend(args(["pull", "--no-rebase"]));
        if let (Some(remote), Some(branch)) = (options.remote, options.branch) {
            argv.extend(args([plain(remote)?, plain(branch)?]));
        }
        if options.allow_unrelated_histories {
            argv.push("--allow-unrelated-histories".to_string());
        }
        let request = GitRequest::new(dir, argv).network(options.remote);
        self.exec_auth(request, auth).await.map(drop)
    }

    /// Pushes `HEAD` (to `branch` when given) with porcelain output.
    ///
    /// # Errors
    ///
    /// Returns `push_failed` for non-fast-forward rejections, otherwise a
    /// classified git error carrying the remote name.
    pub async fn push(
        &self,
        dir: &Path,
        options: &PushOptions<'_>,
        auth: Option<&Credentials>,
    ) -> VcsResult<()> {
        plain(options.remote)?;
        options.branch.map(plain).transpose()?;
        let mut argv = args(["push"]);
        if let Some(branch) = options.branch {
            if options.set_upstream {
                argv.push("-u".to_string());
            }
            argv.push(options.remote.to_string());
            argv.push(format!("HEAD:{branch}"));
        } else {
            argv.push(options.remote.to_string());
        }
        argv.push("--porcelain".to_string());
        let request = GitRequest::new(dir, argv)
            .network(Some(options.remote))
            .classifier(Classifier::Push);
        self.exec_auth(request, auth).await.map(drop)
    }
}
