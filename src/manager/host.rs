// flowvcs: Git-backed project storage for flow hosts
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Collaborators the manager drives: the flow runtime and the event sink.

use futures_util::future::BoxFuture;
use serde::Serialize;
use std::fmt;
use tracing::info;

use crate::error::VcsResult;

/// The host's flow runtime, as seen by the reload sequence.
pub trait FlowRuntime: Send + Sync {
    fn stop(&self) -> BoxFuture<'_, VcsResult<()>>;

    /// Drops accumulated runtime context.
    fn clear_context(&self) -> BoxFuture<'_, VcsResult<()>>;

    /// Reads the active project's flows; `force` bypasses any cache.
    fn load(&self, force: bool) -> BoxFuture<'_, VcsResult<()>>;

    fn start(&self) -> BoxFuture<'_, VcsResult<()>>;

    /// Key for the credentials file; `None` stores it unencrypted.
    fn set_credential_secret(&self, secret: Option<String>) -> BoxFuture<'_, VcsResult<()>>;

    /// Forgets all decrypted credentials.
    fn clear_credentials(&self) -> BoxFuture<'_, VcsResult<()>>;

    /// Re-exports the credentials under the current key and saves them.
    fn save_credentials(&self) -> BoxFuture<'_, VcsResult<()>>;
}

/// Why the active project's files changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProjectAction {
    Loaded,
    Updated,
    Pull,
    Revert,
    ChangeBranch,
    MergeAbort,
    MergeComplete,
}

impl ProjectAction {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Loaded => "loaded",
            Self::Updated => "updated",
            Self::Pull => "pull",
            Self::Revert => "revert",
            Self::ChangeBranch => "change-branch",
            Self::MergeAbort => "merge-abort",
            Self::MergeComplete => "merge-complete",
        }
    }
}

impl fmt::Display for ProjectAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Notification emitted at the end of every reload sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectEvent {
    pub project: String,
    pub action: ProjectAction,
}

pub trait EventSink: Send + Sync {
    fn emit(&self, event: ProjectEvent);
}

/// Runtime for hosts that run no flows, such as the command line tool.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingRuntime;

impl LoggingRuntime {
    fn step(&self, step: &'static str) -> BoxFuture<'_, VcsResult<()>> {
        Box::pin(async move {
            info!(step, "flow runtime");
            Ok(())
        })
    }
}

impl FlowRuntime for LoggingRuntime {
    fn stop(&self) -> BoxFuture<'_, VcsResult<()>> {
        self.step("stop")
    }

    fn clear_context(&self) -> BoxFuture<'_, VcsResult<()>> {
        self.step("clear-context")
    }

    fn load(&self, _force: bool) -> BoxFuture<'_, VcsResult<()>> {
        self.step("load")
    }

    fn start(&self) -> BoxFuture<'_, VcsResult<()>> {
        self.step("start")
    }

    fn set_credential_secret(&self, secret: Option<String>) -> BoxFuture<'_, VcsResult<()>> {
        Box::pin(async move {
            info!(encrypted = secret.is_some(), "credential secret set");
            Ok(())
        })
    }

    fn clear_credentials(&self) -> BoxFuture<'_, VcsResult<()>> {
        self.step("clear-credentials")
    }

    fn save_credentials(&self) -> BoxFuture<'_, VcsResult<()>> {
        self.step("save-credentials")
    }
}

/// Writes project events to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogEvents;

impl EventSink for LogEvents {
    fn emit(&self, event: ProjectEvent) {
        info!(project = %event.project, action = %event.action, "project-update");
    }
}
