// flowvcs: Git-backed project storage for flow hosts
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Running the git binary.
//!
//! ```text
//! GitRequest { args, cwd, env, network, remote }
//!       |
//!       v
//! GitRunner::run  (trait seam, faked in tests)
//!       |
//!       v
//! ShellGit: git -c credential.helper= <args>
//!           GIT_TERMINAL_PROMPT=0  GCM_INTERACTIVE=never  LC_ALL=C
//!           own process group, stdin closed, optional line sink
//!           FLOWVCS_* secrets removed from the inherited environment
//!       |
//!       v
//! GitOutput { exit_code, stdout, stderr }
//!       |
//!       v
//! into_result(Classifier) --> Ok(GitOutput) | GitError::CommandFailed { code }
//! ```

use bon::Builder;
use futures_util::future::BoxFuture;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::auth::SECRET_ENV_VARS;
use super::classify::{classify, classify_push};
use crate::core::process::builder::{OutputSink, ProcessBuilder, ProcessFlags};
use crate::error::{GitError, ProcessError, VcsError, VcsResult};

/// How a non-zero exit is turned into an error code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Classifier {
    #[default]
    Default,
    /// `push --porcelain`; non-fast-forward rejections become `push_failed`.
    Push,
}

/// One git invocation.
#[derive(Debug, Clone, Default)]
pub struct GitRequest {
    pub args: Vec<String>,
    pub cwd: PathBuf,
    pub env: BTreeMap<String, String>,
    /// Talks to a remote: longer timeout, output streamed to the sink.
    pub network: bool,
    /// Remote the operation targets, attached to auth failures.
    pub remote: Option<String>,
    pub classifier: Classifier,
}

impl GitRequest {
    pub fn new<I, S>(cwd: impl AsRef<Path>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
            cwd: cwd.as_ref().to_path_buf(),
            ..Self::default()
        }
    }

    /// Marks the request as networked against `remote`.
    #[must_use]
    pub fn network(mut self, remote: Option<&str>) -> Self {
        self.network = true;
        self.remote = remote.map(String::from);
        self
    }

    #[must_use]
    pub fn envs(mut self, env: BTreeMap<String, String>) -> Self {
        self.env.extend(env);
        self
    }

    #[must_use]
    pub const fn classifier(mut self, classifier: Classifier) -> Self {
        self.classifier = classifier;
        self
    }

    /// `git <args>` for messages.
    #[must_use]
    pub fn command_line(&self) -> String {
        format!("git {}", self.args.join(" "))
    }
}

/// Raw result of a git invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GitOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl GitOutput {
    #[must_use]
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    #[must_use]
    pub fn failed(code: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            exit_code: code,
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    /// Returns the output on success, or a classified `CommandFailed` error.
    ///
    /// # Errors
    ///
    /// Returns `GitError::CommandFailed` if the exit code is non-zero.
    pub fn into_result(self, request: &GitRequest) -> Result<Self, GitError> {
        if self.exit_code == 0 {
            return Ok(self);
        }
        let code = match request.classifier {
            Classifier::Default => classify(&self.stdout, &self.stderr),
            Classifier::Push => classify_push(&self.stdout, &self.stderr),
        };
        Err(GitError::CommandFailed {
            code,
            command: request.command_line(),
            message: self.stderr.trim().to_string(),
            stdout: self.stdout,
            remote: request.remote.clone(),
        })
    }
}

/// Executes git requests.
///
/// Implementations return the raw output for any exit status; only
/// failures to run git at all are errors.
pub trait GitRunner: Send + Sync {
    fn run(&self, request: GitRequest) -> BoxFuture<'_, VcsResult<GitOutput>>;
}

/// Runs the installed git binary.
#[derive(Debug, Clone, Builder)]
pub struct ShellGit {
    #[builder(into, default = PathBuf::from("git"))]
    program: PathBuf,
    /// Limit for local commands.
    command_timeout: Option<Duration>,
    /// Limit for clone/fetch/pull/push.
    network_timeout: Option<Duration>,
    /// Receives network command output line by line.
    sink: Option<OutputSink>,
}

impl ShellGit {
    /// Resolves `program` through PATH.
    ///
    /// # Errors
    ///
    /// Returns `GitError::NotInstalled` if git cannot be found.
    pub fn locate(program: &str) -> Result<PathBuf, GitError> {
        ProcessBuilder::find(program).ok_or(GitError::NotInstalled)
    }

    #[must_use]
    pub fn program(&self) -> &Path {
        &self.program
    }

    async fn execute(&self, request: GitRequest) -> VcsResult<GitOutput> {
        let timeout = if request.network {
            self.network_timeout
        } else {
            self.command_timeout
        };
        let sink = if request.network {
            self.sink.clone()
        } else {
            None
        };

        let mut builder = ProcessBuilder::new(&self.program);
        for key in SECRET_ENV_VARS {
            builder = builder.env_remove(key);
        }
        let result = builder
            .args(["-c", "credential.helper="])
            .args(&request.args)
            .cwd(&request.cwd)
            .env("GIT_TERMINAL_PROMPT", "0")
            .env("GCM_INTERACTIVE", "never")
            .env("LC_ALL", "C")
            .envs(request.env.clone())
            .flag(ProcessFlags::ALLOW_FAILURE | ProcessFlags::NEW_PROCESS_GROUP)
            .capture_output()
            .name("git")
            .timeout_opt(timeout)
            .sink(sink)
            .run()
            .await;

        match result {
            Ok(output) => {
                let exit_code = output.exit_code();
                let (stdout, stderr) = output.into_parts();
                Ok(GitOutput {
                    exit_code,
                    stdout,
                    stderr,
                })
            }
            Err(ProcessError::ExecutableNotFound { .. }) => Err(GitError::NotInstalled.into()),
            Err(ProcessError::Timeout { timeout_secs, .. }) => Err(GitError::Timeout {
                command: request.command_line(),
                timeout_secs,
            }
            .into()),
            Err(e) => Err(VcsError::from(e)),
        }
    }
}

impl GitRunner for ShellGit {
    fn run(&self, request: GitRequest) -> BoxFuture<'_, VcsResult<GitOutput>> {
        Box::pin(self.execute(request))
    }
}
