// flowvcs: Git-backed project storage for flow hosts
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Error handling module.
//!
//! ```text
//!                 VcsError (~24 bytes)
//!                        |
//!   +-------+-------+----+----+-------+-----+------+
//!   |       |       |         |       |     |      |
//!   v       v       v         v       v     v      v
//!  Git   Project   Auth    Config  Process  Io   Other
//!  Box     Box     Box      Box     Box    Box  Box<str>
//!
//! Sub-errors (unboxed internally):
//!   Git      CommandFailed{code}, NotInstalled, Timeout, Output
//!   Project  NotFound, Forbidden, InvalidName, Inactive, Empty, ...
//!   Auth     Bind, Helper, KeyNotFound
//!   Process  ExecutableNotFound, SpawnFailed, NonZeroExit, Timeout
//!
//! Every variant maps onto a stable ErrorCode via VcsError::code().
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Convenience alias for `anyhow::Result`.
pub type Result<T> = anyhow::Result<T>;

/// Result type using [`VcsError`].
pub type VcsResult<T> = std::result::Result<T, VcsError>;

/// Stable, machine readable error codes.
///
/// These are what external layers (HTTP API, editor UI) switch on; the
/// `Display` text of an error is for humans only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    NotFound,
    Forbidden,
    ConnectionFailed,
    HostKeyVerificationFailed,
    AuthFailed,
    LocalOverwrite,
    MergeConflict,
    DeleteBranchUnmerged,
    RemoteAlreadyExists,
    NotARepository,
    RepositoryNotFound,
    PullUnrelatedHistory,
    MissingUser,
    PushFailed,
    ProjectEmpty,
    ProjectExists,
    MissingFlowFile,
    MissingPackageFile,
    CannotDeleteActiveProject,
    CannotOperateOnInactiveProject,
    CannotInitialiseNonEmpty,
    MissingCurrentCredentialKey,
    InvalidProjectName,
    NotMerging,
    RemoteGone,
    UnexpectedError,
}

impl ErrorCode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::Forbidden => "forbidden",
            Self::ConnectionFailed => "connection_failed",
            Self::HostKeyVerificationFailed => "host_key_verification_failed",
            Self::AuthFailed => "auth_failed",
            Self::LocalOverwrite => "local_overwrite",
            Self::MergeConflict => "merge_conflict",
            Self::DeleteBranchUnmerged => "delete_branch_unmerged",
            Self::RemoteAlreadyExists => "remote_already_exists",
            Self::NotARepository => "not_a_repository",
            Self::RepositoryNotFound => "repository_not_found",
            Self::PullUnrelatedHistory => "pull_unrelated_history",
            Self::MissingUser => "missing_user",
            Self::PushFailed => "push_failed",
            Self::ProjectEmpty => "project_empty",
            Self::ProjectExists => "project_exists",
            Self::MissingFlowFile => "missing_flow_file",
            Self::MissingPackageFile => "missing_package_file",
            Self::CannotDeleteActiveProject => "cannot_delete_active_project",
            Self::CannotOperateOnInactiveProject => "cannot_operate_on_inactive_project",
            Self::CannotInitialiseNonEmpty => "cannot_initialise_non_empty",
            Self::MissingCurrentCredentialKey => "missing_current_credential_key",
            Self::InvalidProjectName => "invalid_project_name",
            Self::NotMerging => "not_merging",
            Self::RemoteGone => "remote_gone",
            Self::UnexpectedError => "unexpected_error",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Top-level error type for the project engine.
///
/// All sub-errors are boxed to keep this enum at ~24 bytes on the stack.
#[derive(Debug, Error)]
pub enum VcsError {
    /// Git invocation failed.
    #[error("git error: {0}")]
    Git(Box<GitError>),

    /// Project precondition or lifecycle error.
    #[error("project error: {0}")]
    Project(Box<ProjectError>),

    /// Credential forwarding failed.
    #[error("auth error: {0}")]
    Auth(Box<AuthError>),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(Box<ConfigError>),

    /// Process execution error.
    #[error("process error: {0}")]
    Process(Box<ProcessError>),

    /// I/O error.
    #[error("io error: {0}")]
    Io(Box<std::io::Error>),

    /// Generic error with message.
    #[error("{0}")]
    Other(Box<str>),
}

impl VcsError {
    /// Creates a [`VcsError::Other`] from a message.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into().into_boxed_str())
    }

    /// Returns the stable error code for this error.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Git(e) => e.code(),
            Self::Project(e) => e.code(),
            Self::Auth(e) => e.code(),
            Self::Io(e) if e.kind() == std::io::ErrorKind::NotFound => ErrorCode::NotFound,
            Self::Io(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                ErrorCode::Forbidden
            }
            Self::Config(_) | Self::Process(_) | Self::Io(_) | Self::Other(_) => {
                ErrorCode::UnexpectedError
            }
        }
    }

    /// Returns the remote an auth/transport failure applies to, if known.
    #[must_use]
    pub fn remote(&self) -> Option<&str> {
        match self {
            Self::Git(e) => e.remote(),
            _ => None,
        }
    }
}

// --- From implementations for boxing ---

/// Macro to generate `From` implementations that box the source error.
macro_rules! impl_from_boxed {
    ($($error:ty => $variant:ident),+ $(,)?) => {
        $(
            impl From<$error> for VcsError {
                fn from(err: $error) -> Self {
                    VcsError::$variant(Box::new(err))
                }
            }
        )+
    };
}

impl_from_boxed! {
    GitError => Git,
    ProjectError => Project,
    AuthError => Auth,
    ConfigError => Config,
    ProcessError => Process,
    std::io::Error => Io,
}

impl From<serde_json::Error> for VcsError {
    fn from(err: serde_json::Error) -> Self {
        Self::other(format!("invalid json: {err}"))
    }
}

// --- Git Errors ---

/// Git invocation errors.
#[derive(Debug, Error)]
pub enum GitError {
    /// Git exited non-zero; `code` is the classified failure.
    #[error("{command} failed [{code}]: {message}")]
    CommandFailed {
        code: ErrorCode,
        command: String,
        message: String,
        stdout: String,
        remote: Option<String>,
    },

    /// No usable git binary.
    #[error("git is not installed or could not be found")]
    NotInstalled,

    /// Git binary is older than the minimum supported version.
    #[error("git version {version} is too old")]
    VersionTooOld { version: String },

    /// Git did not finish in time and was killed.
    #[error("{command} timed out after {timeout_secs} seconds")]
    Timeout { command: String, timeout_secs: u64 },

    /// Git produced output we could not interpret.
    #[error("unexpected output from {command}: {message}")]
    Output { command: String, message: String },
}

impl GitError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::CommandFailed { code, .. } => *code,
            Self::NotInstalled
            | Self::VersionTooOld { .. }
            | Self::Timeout { .. }
            | Self::Output { .. } => ErrorCode::UnexpectedError,
        }
    }

    #[must_use]
    pub fn remote(&self) -> Option<&str> {
        match self {
            Self::CommandFailed { remote, .. } => remote.as_deref(),
            _ => None,
        }
    }

    /// Raw stderr text of a failed command (empty for other variants).
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::CommandFailed { message, .. } => message,
            _ => "",
        }
    }
}

// --- Project Errors ---

/// Project precondition and lifecycle errors.
///
/// These are raised before any subprocess is spawned.
#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("{what} not found: {name}")]
    NotFound { what: &'static str, name: String },

    #[error("path escapes the projects directory: {path}")]
    Forbidden { path: String },

    #[error("argument would be read as a git option: {value}")]
    OptionArgument { value: String },

    #[error("invalid project name: '{name}'")]
    InvalidName { name: String },

    #[error("project already exists: {name}")]
    Exists { name: String },

    #[error("cannot delete the active project: {name}")]
    CannotDeleteActive { name: String },

    #[error("cannot operate on inactive project '{wanted}' (active: {active})")]
    Inactive { wanted: String, active: String },

    #[error("project repository is empty")]
    Empty,

    #[error("project has no flow file")]
    MissingFlowFile,

    #[error("project is missing {file}")]
    MissingPackageFile { file: String },

    #[error("project has unmerged changes")]
    Unmerged,

    #[error("project is not merging")]
    NotMerging,

    #[error("cannot initialise a project that already has commits")]
    NonEmpty,

    #[error("cannot change the credential secret without the current key")]
    MissingCurrentCredentialKey,

    #[error("cannot migrate files while a project is active")]
    MigrateWhileActive,

    #[error("{0}")]
    Unsupported(&'static str),
}

impl ProjectError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::NotFound { .. } => ErrorCode::NotFound,
            Self::Forbidden { .. } | Self::OptionArgument { .. } => ErrorCode::Forbidden,
            Self::InvalidName { .. } => ErrorCode::InvalidProjectName,
            Self::Exists { .. } => ErrorCode::ProjectExists,
            Self::CannotDeleteActive { .. } => ErrorCode::CannotDeleteActiveProject,
            Self::Inactive { .. } => ErrorCode::CannotOperateOnInactiveProject,
            Self::Empty => ErrorCode::ProjectEmpty,
            Self::MissingFlowFile => ErrorCode::MissingFlowFile,
            Self::MissingPackageFile { .. } => ErrorCode::MissingPackageFile,
            Self::Unmerged => ErrorCode::MergeConflict,
            Self::NotMerging => ErrorCode::NotMerging,
            Self::NonEmpty => ErrorCode::CannotInitialiseNonEmpty,
            Self::MissingCurrentCredentialKey => ErrorCode::MissingCurrentCredentialKey,
            Self::MigrateWhileActive | Self::Unsupported(_) => ErrorCode::UnexpectedError,
        }
    }
}

// --- Auth Errors ---

/// Credential forwarding errors.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Could not create the rendezvous endpoint or helper scripts.
    #[error("failed to prepare credential endpoint: {0}")]
    Endpoint(#[source] std::io::Error),

    /// Helper invoked without the broker environment.
    #[error("askpass helper is missing {0}")]
    HelperEnvironment(&'static str),

    /// Helper could not reach the broker.
    #[error("askpass helper could not reach the broker: {0}")]
    HelperConnect(#[source] std::io::Error),

    /// SSH key reference did not resolve to a key file.
    #[error("ssh key not found: {name}")]
    KeyNotFound { name: String },
}

impl AuthError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::KeyNotFound { .. } => ErrorCode::NotFound,
            Self::Endpoint(_) | Self::HelperEnvironment(_) | Self::HelperConnect(_) => {
                ErrorCode::UnexpectedError
            }
        }
    }
}

// --- Config Errors ---

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to parse configuration file.
    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: String, message: String },

    /// Required configuration key is not set and has no default.
    #[error("missing required key '{key}' in section '[{section}]'")]
    MissingKey { section: String, key: String },

    /// Invalid configuration value.
    #[error("invalid value for '{key}' in section '[{section}]': {message}")]
    InvalidValue {
        section: String,
        key: String,
        message: String,
    },
}

// --- Process Errors ---

/// Process execution errors.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// Executable not found in PATH.
    #[error("executable not found: '{name}' (not in PATH)")]
    ExecutableNotFound { name: String },

    /// Failed to spawn process.
    #[error("failed to spawn process '{command}': {source}")]
    SpawnFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// Process exited with non-zero status.
    #[error("process '{command}' exited with code {code}")]
    NonZeroExit { command: String, code: i32 },

    /// Process timed out.
    #[error("process '{command}' timed out after {timeout_secs} seconds")]
    Timeout { command: String, timeout_secs: u64 },

    /// Failed to read process output or wait for it.
    #[error("failed to read output from process '{command}': {message}")]
    OutputError { command: String, message: String },
}
