// flowvcs: Git-backed project storage for flow hosts
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! One on-disk project repository.
//!
//! ```text
//!   uninitialized --initialise--> active, clean
//!                                   |      ^
//!                pull (CONFLICT)    |      |  abort_merge
//!                                   v      |  commit after resolve_merge
//!                               active, merging
//!
//!   Project
//!     state     std Mutex: empty, merging, missing files, role files,
//!               package.json, README, credential secret, remote auth
//!     op_lock   tokio Mutex: one git invocation sequence at a time
//! ```
//!
//! `empty` and `merging` are only ever copied from what git reports.
//! File roles come from the `flows` section of `package.json`.

mod flows;
pub mod package;
pub mod secret;
mod vcs;


pub use package::{PackageFile, RoleFiles};
pub use secret::CredentialSecret;
pub use vcs::{CommitOutcome, PullOutcome, PullRequest, PushRequest, Resolution};

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Component, Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::fs;
use tracing::{debug, info};

use crate::error::{ProjectError, VcsResult};
use crate::git::parse::{BranchSummary, Remotes};
use crate::git::{Credentials, Git, GitUser};
use crate::utility::fs::copy::copy_file_into;
use package::{
    DEFAULT_FLOW_FILE, DEFAULT_GITIGNORE, GITIGNORE_FILE, PACKAGE_FILE, README_FILE,
    default_readme,
};

/// Who is asking. Keys stored remote credentials and supplies the commit
/// identity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Caller {
    pub username: Option<String>,
    pub identity: Option<GitUser>,
}

impl Caller {
    pub fn named(username: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
            identity: None,
        }
    }

    #[must_use]
    pub fn with_identity(mut self, identity: GitUser) -> Self {
        self.identity = Some(identity);
        self
    }

    /// Storage key for per-caller data; anonymous callers share `_`.
    #[must_use]
    pub fn key(&self) -> &str {
        self.username.as_deref().unwrap_or("_")
    }
}

/// Standalone files copied into a new project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrateFiles {
    pub flow: PathBuf,
    pub credentials: PathBuf,
}

/// Contents for the first commit of a project.
#[derive(Debug, Clone, Default)]
pub struct InitialiseData {
    pub summary: String,
    pub description: String,
    pub files: RoleFiles,
    pub credential_secret: Option<CredentialSecret>,
    pub migrate: Option<MigrateFiles>,
}

/// Metadata changes accepted by [`Project::update`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProjectUpdate {
    pub credential_secret: Option<String>,
    pub current_credential_secret: Option<String>,
    pub reset_credential_secret: bool,
    pub description: Option<String>,
    pub summary: Option<String>,
    pub dependencies: Option<BTreeMap<String, String>>,
    pub files: Option<RoleFiles>,
}

/// What an update touched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateOutcome {
    pub flow_files_changed: bool,
    pub credential_secret_changed: bool,
}

/// Encryption flags reported to the editor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretInfo {
    pub credentials_encrypted: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub credential_secret_invalid: bool,
}

/// Exported view of a project.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectInfo {
    pub name: String,
    pub summary: String,
    pub description: String,
    pub dependencies: BTreeMap<String, String>,
    pub empty: bool,
    pub merging: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub missing_files: Vec<String>,
    pub files: RoleFiles,
    pub settings: SecretInfo,
    pub remotes: Remotes,
    pub branches: BranchSummary,
}

#[derive(Debug, Default)]
struct ProjectState {
    empty: bool,
    merging: bool,
    missing_files: Vec<String>,
    package: Option<PackageFile>,
    description: String,
    files: RoleFiles,
    credential_secret: CredentialSecret,
    credential_secret_invalid: bool,
    remote_auth: HashMap<(String, String), Credentials>,
}

/// A project directory and its repository.
#[derive(Debug)]
pub struct Project {
    name: String,
    path: PathBuf,
    git: Git,
    identity: Option<GitUser>,
    state: Mutex<ProjectState>,
    op_lock: tokio::sync::Mutex<()>,
}

impl Project {
    /// A handle with default state; nothing is read from disk.
    pub fn open(name: impl Into<String>, path: impl Into<PathBuf>, git: Git) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            git,
            identity: None,
            state: Mutex::new(ProjectState::default()),
            op_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Identity used when the caller supplies none.
    #[must_use]
    pub fn with_identity(mut self, identity: Option<GitUser>) -> Self {
        self.identity = identity;
        self
    }

    #[must_use]
    pub fn with_secret(self, secret: CredentialSecret) -> Self {
        self.state().credential_secret = secret;
        self
    }

    /// Opens and reads the project's files and repository state.
    ///
    /// # Errors
    ///
    /// Returns an error if `package.json` is unreadable or git fails.
    pub async fn load(
        name: impl Into<String>,
        path: impl Into<PathBuf>,
        git: Git,
        secret: CredentialSecret,
        identity: Option<GitUser>,
    ) -> VcsResult<Self> {
        let project = Self::open(name, path, git)
            .with_identity(identity)
            .with_secret(secret);
        project.refresh().await?;
        info!(project = %project.name, path = %project.path.display(), "project loaded");
        Ok(project)
    }

    fn state(&self) -> MutexGuard<'_, ProjectState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state().empty
    }

    #[must_use]
    pub fn is_merging(&self) -> bool {
        self.state().merging
    }

    #[must_use]
    pub fn missing_files(&self) -> Vec<String> {
        self.state().missing_files.clone()
    }

    #[must_use]
    pub fn role_files(&self) -> RoleFiles {
        self.state().files.clone()
    }

    #[must_use]
    pub fn flow_file(&self) -> Option<PathBuf> {
        self.state().files.flow.as_deref().map(|f| self.path.join(f))
    }

    #[must_use]
    pub fn credentials_file(&self) -> Option<PathBuf> {
        self.state()
            .files
            .credentials
            .as_deref()
            .map(|f| self.path.join(f))
    }

    #[must_use]
    pub fn credential_secret(&self) -> CredentialSecret {
        self.state().credential_secret.clone()
    }

    #[must_use]
    pub fn credential_secret_invalid(&self) -> bool {
        self.state().credential_secret_invalid
    }

    /// Records that the host could not decrypt the credentials file.
    pub fn set_credential_secret_invalid(&self, invalid: bool) {
        self.state().credential_secret_invalid = invalid;
    }

    fn is_repository(&self) -> bool {
        self.path.join(".git").exists()
    }

    /// Resolves `relative` inside the project directory.
    ///
    /// # Errors
    ///
    /// Returns `ProjectError::Forbidden` for absolute paths or `..`.
    pub fn resolve(&self, relative: &str) -> VcsResult<PathBuf> {
        let candidate = Path::new(relative);
        let escapes = candidate
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes || relative.is_empty() {
            return Err(ProjectError::Forbidden {
                path: relative.to_string(),
            }
            .into());
        }
        Ok(self.path.join(candidate))
    }

    /// Re-reads files and repository flags.
    ///
    /// # Errors
    ///
    /// Returns an error if `package.json` is unreadable or git fails.
    pub async fn refresh(&self) -> VcsResult<()> {
        let _op = self.op_lock.lock().await;
        self.refresh_locked().await
    }

    async fn refresh_locked(&self) -> VcsResult<()> {
        let package = match fs::read_to_string(self.path.join(PACKAGE_FILE)).await {
            Ok(text) => Some(PackageFile::parse(&text)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };
        let description = fs::read_to_string(self.path.join(README_FILE))
            .await
            .unwrap_or_default();
        let files = package
            .as_ref()
            .map(|p| p.flows.normalized())
            .unwrap_or_default();

        let mut missing_files = Vec::new();
        if package.is_none() {
            missing_files.push(PACKAGE_FILE.to_string());
        }
        if let Some(flow) = &files.flow
            && !fs::try_exists(self.path.join(flow)).await?
        {
            missing_files.push(flow.clone());
        }

        let (empty, merging) = if self.is_repository() {
            let total = self.git.commit_count(&self.path).await?;
            (total == 0, self.git.is_merging(&self.path).await?)
        } else {
            (true, false)
        };

        debug!(project = %self.name, empty, merging, missing = ?missing_files, "project state");
        let mut state = self.state();
        state.package = package;
        state.description = description;
        state.files = files;
        state.missing_files = missing_files;
        state.empty = empty;
        state.merging = merging;
        Ok(())
    }

    /// Writes the initial files and makes the first commit.
    ///
    /// # Errors
    ///
    /// Returns `ProjectError::NonEmpty` if the repository has commits.
    pub async fn initialise(&self, caller: &Caller, data: &InitialiseData) -> VcsResult<()> {
        let _op = self.op_lock.lock().await;
        if self.is_repository() {
            if self.git.commit_count(&self.path).await? > 0 {
                return Err(ProjectError::NonEmpty.into());
            }
        } else {
            fs::create_dir_all(&self.path).await?;
            self.git.init(&self.path).await?;
        }

        let files = if data.files.flow.is_some() {
            data.files.normalized()
        } else {
            RoleFiles::new(DEFAULT_FLOW_FILE)
        };
        let existing = self.state().package.clone();
        let mut package = existing
            .unwrap_or_else(|| PackageFile::new(&self.name, &data.summary, RoleFiles::default()));
        package.flows = files.clone();
        fs::write(self.path.join(PACKAGE_FILE), package.to_json()?).await?;

        let readme = self.path.join(README_FILE);
        if !fs::try_exists(&readme).await? {
            fs::write(
                &readme,
                default_readme(&self.name, &data.summary, &data.description),
            )
            .await?;
        }
        let ignore = self.path.join(GITIGNORE_FILE);
        if !fs::try_exists(&ignore).await? {
            fs::write(&ignore, DEFAULT_GITIGNORE).await?;
        }

        let (flow, credentials) = (
            files.flow.clone().unwrap_or_else(|| DEFAULT_FLOW_FILE.to_string()),
            files.credentials.clone().unwrap_or_default(),
        );
        if let Some(migrate) = &data.migrate {
            let flow_copied = copy_file_into(&migrate.flow, &self.path, &flow).await?;
            let creds_copied =
                copy_file_into(&migrate.credentials, &self.path, &credentials).await?;
            info!(project = %self.name, flow_copied, creds_copied, "migrated standalone files");
        }
        let flow_path = self.path.join(&flow);
        if !fs::try_exists(&flow_path).await? {
            fs::write(&flow_path, "[]\n").await?;
        }

        self.git.stage(&self.path, &[]).await?;
        let identity = caller.identity.as_ref().or(self.identity.as_ref());
        self.git
            .commit(&self.path, "Create project files", identity)
            .await?;

        if let Some(secret) = &data.credential_secret {
            let mut state = self.state();
            state.credential_secret = secret.clone();
            state.credential_secret_invalid = false;
        }
        self.refresh_locked().await?;
        info!(project = %self.name, "project initialised");
        Ok(())
    }

    /// Applies metadata and credential secret changes.
    ///
    /// # Errors
    ///
    /// Returns `ProjectError::MissingCurrentCredentialKey` when replacing a
    /// working key without the current one, and
    /// `ProjectError::MissingPackageFile` for package changes without a
    /// `package.json`.
    pub async fn update(&self, data: &ProjectUpdate) -> VcsResult<UpdateOutcome> {
        let mut outcome = UpdateOutcome::default();

        if let Some(secret) = data.credential_secret.as_deref().filter(|s| !s.is_empty()) {
            let mut state = self.state();
            let current = state.credential_secret.as_custom();
            if !data.reset_credential_secret
                && current.is_some()
                && !state.credential_secret_invalid
                && current != data.current_credential_secret.as_deref()
            {
                return Err(ProjectError::MissingCurrentCredentialKey.into());
            }
            state.credential_secret = CredentialSecret::Custom(secret.to_string());
            state.credential_secret_invalid = false;
            outcome.credential_secret_changed = true;
        }

        let touches_package =
            data.summary.is_some() || data.dependencies.is_some() || data.files.is_some();
        if !touches_package && data.description.is_none() {
            return Ok(outcome);
        }

        let _op = self.op_lock.lock().await;
        let (package, readme) = {
            let mut state = self.state();
            if let Some(description) = &data.description {
                state.description.clone_from(description);
            }
            let previous = state.files.clone();
            let package = if touches_package {
                let package = state.package.as_mut().ok_or_else(|| {
                    ProjectError::MissingPackageFile {
                        file: PACKAGE_FILE.to_string(),
                    }
                })?;
                if let Some(summary) = &data.summary {
                    package.description.clone_from(summary);
                }
                if let Some(dependencies) = &data.dependencies {
                    package.dependencies.clone_from(dependencies);
                }
                if let Some(files) = &data.files {
                    package.flows = files.normalized();
                }
                Some(package.clone())
            } else {
                None
            };
            if let Some(package) = &package {
                state.files = package.flows.normalized();
                outcome.flow_files_changed = state.files != previous;
            }
            (package, data.description.clone())
        };

        if let Some(package) = package {
            fs::write(self.path.join(PACKAGE_FILE), package.to_json()?).await?;
        }
        if let Some(readme) = readme {
            fs::write(self.path.join(README_FILE), readme).await?;
        }
        if outcome.flow_files_changed {
            self.refresh_locked().await?;
        }
        debug!(project = %self.name, ?outcome, "project updated");
        Ok(outcome)
    }

    /// Snapshot for callers outside the core.
    ///
    /// # Errors
    ///
    /// Returns a classified git error.
    pub async fn export(&self) -> VcsResult<ProjectInfo> {
        let _op = self.op_lock.lock().await;
        let (remotes, branches) = if self.is_repository() {
            let remotes = self.git.remotes(&self.path).await?;
            let branches = self.git.status(&self.path).await?.branches;
            (remotes, branches)
        } else {
            (Remotes::default(), BranchSummary::default())
        };

        let state = self.state();
        let (summary, dependencies) = state
            .package
            .as_ref()
            .map(|p| (p.description.clone(), p.dependencies.clone()))
            .unwrap_or_default();
        Ok(ProjectInfo {
            name: self.name.clone(),
            summary,
            description: state.description.clone(),
            dependencies,
            empty: state.empty,
            merging: state.merging,
            missing_files: state.missing_files.clone(),
            files: state.files.clone(),
            settings: SecretInfo {
                credentials_encrypted: state.credential_secret.as_custom().is_some(),
                credential_secret_invalid: state.credential_secret_invalid,
            },
            remotes,
            branches,
        })
    }
}
