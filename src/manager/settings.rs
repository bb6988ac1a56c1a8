// flowvcs: Git-backed project storage for flow hosts
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Process-wide project settings.
//!
//! ```json
//! {
//!   "activeProject": "demo",
//!   "projects": { "demo": { "credentialSecret": false } }
//! }
//! ```

use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tokio::fs;
use tracing::debug;

use crate::error::VcsResult;
use crate::project::CredentialSecret;
use crate::utility::fs::backup::write_with_backup;

/// Per-project overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSettings {
    #[serde(default, skip_serializing_if = "CredentialSecret::is_default")]
    pub credential_secret: CredentialSecret,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectsSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_project: Option<String>,
    #[serde(default)]
    pub projects: BTreeMap<String, ProjectSettings>,
}

impl ProjectsSettings {
    #[must_use]
    pub fn secret_for(&self, name: &str) -> CredentialSecret {
        self.projects
            .get(name)
            .map(|p| p.credential_secret.clone())
            .unwrap_or_default()
    }
}

/// Persists [`ProjectsSettings`].
pub trait SettingsStore: Send + Sync {
    fn load(&self) -> BoxFuture<'_, VcsResult<ProjectsSettings>>;
    fn save<'a>(&'a self, settings: &'a ProjectsSettings) -> BoxFuture<'a, VcsResult<()>>;
}

/// Settings kept in a JSON file.
#[derive(Debug, Clone)]
pub struct JsonSettingsFile {
    path: PathBuf,
}

impl JsonSettingsFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read(&self) -> VcsResult<ProjectsSettings> {
        match fs::read_to_string(&self.path).await {
            Ok(text) if text.trim().is_empty() => Ok(ProjectsSettings::default()),
            Ok(text) => Ok(serde_json::from_str(&text)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ProjectsSettings::default()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, settings: &ProjectsSettings) -> VcsResult<()> {
        let mut text = serde_json::to_string_pretty(settings)?;
        text.push('\n');
        write_with_backup(&self.path, &text).await?;
        debug!(path = %self.path.display(), "settings saved");
        Ok(())
    }
}

impl SettingsStore for JsonSettingsFile {
    fn load(&self) -> BoxFuture<'_, VcsResult<ProjectsSettings>> {
        Box::pin(self.read())
    }

    fn save<'a>(&'a self, settings: &'a ProjectsSettings) -> BoxFuture<'a, VcsResult<()>> {
        Box::pin(self.write(settings))
    }
}

/// Settings held in memory only.
#[derive(Debug, Default)]
pub struct MemorySettings {
    inner: Mutex<ProjectsSettings>,
}

impl MemorySettings {
    pub fn new(settings: ProjectsSettings) -> Self {
        Self {
            inner: Mutex::new(settings),
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> ProjectsSettings {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl SettingsStore for MemorySettings {
    fn load(&self) -> BoxFuture<'_, VcsResult<ProjectsSettings>> {
        let settings = self.snapshot();
        Box::pin(async move { Ok(settings) })
    }

    fn save<'a>(&'a self, settings: &'a ProjectsSettings) -> BoxFuture<'a, VcsResult<()>> {
        *self.inner.lock().unwrap_or_else(PoisonError::into_inner) = settings.clone();
        Box::pin(async { Ok(()) })
    }
}
