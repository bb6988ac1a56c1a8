// flowvcs: Git-backed project storage for flow hosts
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Registry of projects and the single active project.
//!
//! ```text
//! caller --> ProjectManager --require_active(name)--> Project --> Git
//!                 |
//!                 | file contents changed (pull, revert, branch, merge, ...)
//!                 v
//!            reload sequence (one at a time)
//!              runtime.stop()
//!              runtime.clear_context()   only when asked
//!              runtime.load(true)
//!              runtime.start()           skipped if load failed
//!              events.emit(project-update)
//!              --> first error, if any
//! ```
//!
//! Locks, always taken in this order:
//!
//! ```text
//! reload_lock   one reload sequence (and one activation) at a time
//! file_set      writes to role files; never held across network calls
//! settings      load-modify-save of the settings store
//! ```

pub mod host;
mod ops;
pub mod settings;

#[cfg(test)]
mod tests;

pub use host::{EventSink, FlowRuntime, LogEvents, LoggingRuntime, ProjectAction, ProjectEvent};
pub use settings::{
    JsonSettingsFile, MemorySettings, ProjectSettings, ProjectsSettings, SettingsStore,
};

use bon::Builder;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use tokio::fs;
use tracing::{debug, info, warn};

use crate::error::{ProjectError, VcsResult};
use crate::git::{CloneOptions, Git, GitUser};
use crate::keyring::{KeyLookup, RemoteAuth};
use crate::project::package::{DEFAULT_FLOW_FILE, credentials_name_for};
use crate::project::{
    Caller, CredentialSecret, InitialiseData, MigrateFiles, Project, ProjectInfo, ProjectUpdate,
    RoleFiles,
};
use crate::utility::fs::copy::list_dirs;

/// What happens after the host writes the role files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Workflow {
    /// The user stages and commits.
    #[default]
    Manual,
    /// Role files are staged and committed on every save.
    Auto,
}

/// Message used by the auto workflow.
pub const AUTO_COMMIT_MESSAGE: &str = "Update flow files";

/// Manager settings that do not change at runtime.
#[derive(Debug, Clone, Builder)]
pub struct ManagerOptions {
    /// Directory holding one subdirectory per project.
    #[builder(into)]
    root: PathBuf,
    #[builder(setters(name = with_workflow), default)]
    workflow: Workflow,
    /// Flow file name for new projects.
    #[builder(setters(name = with_flow_file), into, default = DEFAULT_FLOW_FILE.to_string())]
    flow_file: String,
    /// Key inherited by projects without their own credential secret.
    #[builder(setters(name = with_system_secret))]
    system_secret: Option<String>,
    /// Commit identity when the caller has none.
    #[builder(setters(name = with_identity))]
    identity: Option<GitUser>,
    /// Pre-project flow file, copied into a project created with migration.
    #[builder(setters(name = with_standalone_flow_file))]
    standalone_flow_file: Option<PathBuf>,
}

impl ManagerOptions {
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub const fn workflow(&self) -> Workflow {
        self.workflow
    }
}

/// The host-side collaborators.
#[derive(Clone)]
pub struct Host {
    pub settings: Arc<dyn SettingsStore>,
    pub runtime: Arc<dyn FlowRuntime>,
    pub events: Arc<dyn EventSink>,
    pub keys: Arc<dyn KeyLookup>,
}

impl Host {
    /// A host that runs no flows and logs its events.
    pub fn logging(settings: Arc<dyn SettingsStore>, keys: Arc<dyn KeyLookup>) -> Self {
        Self {
            settings,
            runtime: Arc::new(LoggingRuntime),
            events: Arc::new(LogEvents),
            keys,
        }
    }
}

/// Where a cloned project comes from.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CloneSource {
    pub url: String,
    pub remote_name: Option<String>,
    pub branch: Option<String>,
    pub auth: Option<RemoteAuth>,
}

/// A new project: cloned when `git` is set, otherwise created from the
/// default file set.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateProject {
    pub name: String,
    pub summary: String,
    pub description: String,
    pub files: Option<RoleFiles>,
    pub credential_secret: CredentialSecret,
    pub git: Option<CloneSource>,
    pub migrate_files: bool,
}

/// Owns the active project and runs the reload sequence.
pub struct ProjectManager {
    options: ManagerOptions,
    git: Git,
    host: Host,
    active: RwLock<Option<Arc<Project>>>,
    reload_lock: tokio::sync::Mutex<()>,
    file_set: tokio::sync::Mutex<()>,
    settings_lock: tokio::sync::Mutex<()>,
}

impl std::fmt::Debug for ProjectManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProjectManager")
            .field("options", &self.options)
            .field("active", &self.active_name())
            .finish_non_exhaustive()
    }
}

/// Rejects names that are empty, hidden, or could leave the projects root.
///
/// # Errors
///
/// Returns `ProjectError::InvalidName`.
pub fn validate_name(name: &str) -> VcsResult<()> {
    let invalid = name.is_empty()
        || name.starts_with('.')
        || name.contains(['/', '\\'])
        || name.contains("..")
        || name.chars().any(char::is_control);
    if invalid {
        return Err(ProjectError::InvalidName {
            name: name.to_string(),
        }
        .into());
    }
    Ok(())
}

/// True if `path` stays under `root` without walking through `..`.
fn is_inside(root: &Path, path: &Path) -> bool {
    path.strip_prefix(root).is_ok_and(|relative| {
        relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
    })
}

impl ProjectManager {
    pub fn new(options: ManagerOptions, git: Git, host: Host) -> Self {
        Self {
            options,
            git,
            host,
            active: RwLock::new(None),
            reload_lock: tokio::sync::Mutex::new(()),
            file_set: tokio::sync::Mutex::new(()),
            settings_lock: tokio::sync::Mutex::new(()),
        }
    }

    #[must_use]
    pub const fn options(&self) -> &ManagerOptions {
        &self.options
    }

    #[must_use]
    pub fn active_project(&self) -> Option<Arc<Project>> {
        self.active
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn active_name(&self) -> Option<String> {
        self.active_project().map(|p| p.name().to_string())
    }

    fn set_active_handle(&self, project: Option<Arc<Project>>) {
        *self.active.write().unwrap_or_else(PoisonError::into_inner) = project;
    }

    /// Directory of project `name`, checked against the projects root.
    ///
    /// # Errors
    ///
    /// Returns `invalid_project_name` or `forbidden`.
    pub fn project_path(&self, name: &str) -> VcsResult<PathBuf> {
        validate_name(name)?;
        let path = self.options.root.join(name);
        if !is_inside(&self.options.root, &path) {
            return Err(ProjectError::Forbidden {
                path: path.display().to_string(),
            }
            .into());
        }
        Ok(path)
    }

    /// The active project, if it is `name`.
    fn require_active(&self, name: &str) -> VcsResult<Arc<Project>> {
        match self.active_project() {
            Some(project) if project.name() == name => Ok(project),
            other => Err(ProjectError::Inactive {
                wanted: name.to_string(),
                active: other.map_or_else(|| "none".to_string(), |p| p.name().to_string()),
            }
            .into()),
        }
    }

    fn current(&self) -> VcsResult<Arc<Project>> {
        self.active_project().ok_or_else(|| {
            ProjectError::NotFound {
                what: "active project",
                name: String::new(),
            }
            .into()
        })
    }

    fn resolved_secret(&self, project: &Project) -> Option<String> {
        project
            .credential_secret()
            .resolve(self.options.system_secret.as_deref())
    }

    async fn edit_settings(&self, edit: impl FnOnce(&mut ProjectsSettings)) -> VcsResult<()> {
        let _settings = self.settings_lock.lock().await;
        let mut settings = self.host.settings.load().await?;
        edit(&mut settings);
        self.host.settings.save(&settings).await
    }

    // --- Reload sequence ---

    async fn reload(&self, project: &Project, action: ProjectAction, clear: bool) -> VcsResult<()> {
        let _reload = self.reload_lock.lock().await;
        self.reload_locked(project, action, clear).await
    }

    /// Runs the sequence; the caller holds `reload_lock`.
    async fn reload_locked(
        &self,
        project: &Project,
        action: ProjectAction,
        clear: bool,
    ) -> VcsResult<()> {
        debug!(project = %project.name(), %action, clear, "reload");
        let runtime = &self.host.runtime;
        runtime.stop().await?;
        if clear {
            runtime.clear_context().await?;
        }
        let result = match runtime.load(true).await {
            Ok(()) => runtime.start().await,
            Err(e) => {
                warn!(project = %project.name(), error = %e, "flows failed to load");
                Err(e)
            }
        };
        self.host.events.emit(ProjectEvent {
            project: project.name().to_string(),
            action,
        });
        result
    }

    // --- Registry ---

    /// Project directory names, sorted case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns an error if the projects root cannot be read.
    pub async fn list(&self) -> VcsResult<Vec<String>> {
        list_dirs(&self.options.root).await
    }

    async fn load_project(&self, name: &str) -> VcsResult<Project> {
        let path = self.project_path(name)?;
        if !fs::try_exists(&path).await? {
            return Err(ProjectError::NotFound {
                what: "project",
                name: name.to_string(),
            }
            .into());
        }
        let secret = self.host.settings.load().await?.secret_for(name);
        Project::load(
            name,
            path,
            self.git.clone(),
            secret,
            self.options.identity.clone(),
        )
        .await
    }

    /// Re-opens the project recorded as active, without reloading flows.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings or the project cannot be read.
    pub async fn restore(&self) -> VcsResult<Option<Arc<Project>>> {
        let Some(name) = self.host.settings.load().await?.active_project else {
            info!("no active project");
            return Ok(None);
        };
        let project = match self.load_project(&name).await {
            Ok(project) => Arc::new(project),
            Err(e) => {
                warn!(project = %name, error = %e, "active project unavailable");
                return Ok(None);
            }
        };
        self.host
            .runtime
            .set_credential_secret(self.resolved_secret(&project))
            .await?;
        self.set_active_handle(Some(Arc::clone(&project)));
        info!(project = %name, "active project restored");
        Ok(Some(project))
    }

    /// Makes `name` the active project and reloads the flows.
    ///
    /// # Errors
    ///
    /// Returns `not_found` for unknown projects; a flow load failure is
    /// returned after the change notification.
    pub async fn set_active(
        &self,
        caller: &Caller,
        name: &str,
        clear_context: bool,
    ) -> VcsResult<()> {
        let _reload = self.reload_lock.lock().await;
        let project = Arc::new(self.load_project(name).await?);
        self.edit_settings(|s| s.active_project = Some(name.to_string()))
            .await?;
        self.set_active_handle(Some(Arc::clone(&project)));
        info!(project = %name, user = caller.key(), "changing active project");
        if let Some(flow) = project.flow_file() {
            info!(path = %flow.display(), "flows file");
        }
        self.host
            .runtime
            .set_credential_secret(self.resolved_secret(&project))
            .await?;
        self.reload_locked(&project, ProjectAction::Loaded, clear_context)
            .await
    }

    /// Creates (or clones) a project and activates it.
    ///
    /// # Errors
    ///
    /// Returns `project_exists`, name errors, or the clone/initialise
    /// error after removing the half-created project.
    pub async fn create(&self, caller: &Caller, request: &CreateProject) -> VcsResult<ProjectInfo> {
        let path = self.project_path(&request.name)?;
        if fs::try_exists(&path).await? {
            return Err(ProjectError::Exists {
                name: request.name.clone(),
            }
            .into());
        }
        let migrate = if request.migrate_files {
            if self.active_project().is_some() {
                return Err(ProjectError::MigrateWhileActive.into());
            }
            self.options.standalone_flow_file.as_ref().map(|flow| {
                let name = flow
                    .file_name()
                    .map_or_else(String::new, |n| n.to_string_lossy().into_owned());
                MigrateFiles {
                    flow: flow.clone(),
                    credentials: flow.with_file_name(credentials_name_for(&name)),
                }
            })
        } else {
            None
        };

        fs::create_dir_all(&path).await?;
        let secret = request.credential_secret.clone();
        self.edit_settings(|s| {
            s.projects.insert(
                request.name.clone(),
                ProjectSettings {
                    credential_secret: secret.clone(),
                },
            );
        })
        .await?;

        let built = match &request.git {
            Some(source) => self.clone_into(caller, &path, source).await,
            None => {
                let files = request
                    .files
                    .clone()
                    .filter(|f| f.flow.is_some())
                    .unwrap_or_else(|| RoleFiles::new(self.options.flow_file.clone()));
                let data = InitialiseData {
                    summary: request.summary.clone(),
                    description: request.description.clone(),
                    files,
                    credential_secret: Some(secret),
                    migrate,
                };
                Project::open(&request.name, &path, self.git.clone())
                    .with_identity(self.options.identity.clone())
                    .initialise(caller, &data)
                    .await
            }
        };
        if let Err(e) = built {
            warn!(project = %request.name, error = %e, "project creation failed, cleaning up");
            if let Err(cleanup) = fs::remove_dir_all(&path).await {
                warn!(
                    path = %path.display(),
                    error = %cleanup,
                    "failed to remove project directory"
                );
            }
            self.edit_settings(|s| {
                s.projects.remove(&request.name);
            })
            .await?;
            return Err(e);
        }

        info!(project = %request.name, cloned = request.git.is_some(), "project created");
        self.set_active(caller, &request.name, false).await?;
        if let Some(source) = &request.git
            && let Some(auth) = &source.auth
        {
            let credentials = auth.resolve(self.host.keys.as_ref(), caller.key())?;
            let remote = source.remote_name.as_deref().unwrap_or("origin");
            self.require_active(&request.name)?
                .update_remote(caller, remote, credentials)
                .await?;
        }
        self.get(caller, &request.name).await
    }

    async fn clone_into(
        &self,
        caller: &Caller,
        path: &Path,
        source: &CloneSource,
    ) -> VcsResult<()> {
        let auth = source
            .auth
            .as_ref()
            .map(|a| a.resolve(self.host.keys.as_ref(), caller.key()))
            .transpose()?;
        let options = CloneOptions {
            url: &source.url,
            remote_name: source.remote_name.as_deref(),
            branch: source.branch.as_deref(),
        };
        self.git.clone_repo(path, &options, auth.as_ref()).await
    }

    /// Deletes an inactive project's directory and settings.
    ///
    /// # Errors
    ///
    /// Returns `cannot_delete_active_project` for the active project,
    /// before touching the filesystem.
    pub async fn delete(&self, caller: &Caller, name: &str) -> VcsResult<()> {
        if self.active_name().as_deref() == Some(name) {
            return Err(ProjectError::CannotDeleteActive {
                name: name.to_string(),
            }
            .into());
        }
        let path = self.project_path(name)?;
        if !fs::try_exists(&path).await? {
            return Err(ProjectError::NotFound {
                what: "project",
                name: name.to_string(),
            }
            .into());
        }
        fs::remove_dir_all(&path).await?;
        self.edit_settings(|s| {
            s.projects.remove(name);
        })
        .await?;
        info!(project = %name, user = caller.key(), "project deleted");
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `cannot_operate_on_inactive_project` unless `name` is active.
    pub async fn get(&self, _caller: &Caller, name: &str) -> VcsResult<ProjectInfo> {
        self.require_active(name)?.export().await
    }

    /// Makes the first commit of an empty active project.
    ///
    /// # Errors
    ///
    /// Returns `cannot_initialise_non_empty` if it already has commits.
    pub async fn initialise(
        &self,
        caller: &Caller,
        name: &str,
        data: &InitialiseData,
    ) -> VcsResult<()> {
        let project = self.require_active(name)?;
        {
            let _files = self.file_set.lock().await;
            project.initialise(caller, data).await?;
        }
        if let Some(secret) = &data.credential_secret {
            let secret = secret.clone();
            self.edit_settings(|s| {
                s.projects.entry(name.to_string()).or_default().credential_secret = secret;
            })
            .await?;
        }
        self.host
            .runtime
            .set_credential_secret(self.resolved_secret(&project))
            .await?;
        self.reload(&project, ProjectAction::Updated, false).await
    }

    /// Updates metadata, role files and the credential secret.
    ///
    /// Flows reload when the role files change, or when a secret replaces
    /// one the host could not use.
    ///
    /// # Errors
    ///
    /// Returns `missing_current_credential_key` when replacing a working
    /// key without the current one.
    pub async fn update(
        &self,
        _caller: &Caller,
        name: &str,
        data: &ProjectUpdate,
    ) -> VcsResult<()> {
        let project = self.require_active(name)?;
        let is_reset = data.reset_credential_secret;
        let was_invalid = project.credential_secret_invalid();

        let outcome = {
            let _files = self.file_set.lock().await;
            project.update(data).await?
        };
        if outcome.credential_secret_changed {
            let secret = project.credential_secret();
            self.edit_settings(|s| {
                s.projects.entry(name.to_string()).or_default().credential_secret = secret;
            })
            .await?;
        }

        if outcome.flow_files_changed {
            return self.reload(&project, ProjectAction::Updated, false).await;
        }
        if outcome.credential_secret_changed {
            let runtime = &self.host.runtime;
            if is_reset {
                runtime.clear_credentials().await?;
            }
            runtime
                .set_credential_secret(self.resolved_secret(&project))
                .await?;
            if is_reset || !was_invalid {
                runtime.save_credentials().await?;
            }
            if was_invalid {
                return self.reload(&project, ProjectAction::Updated, false).await;
            }
        }
        Ok(())
    }

    // --- Role files for the host ---

    /// # Errors
    ///
    /// See [`Project::get_flows`].
    pub async fn get_flows(&self) -> VcsResult<Value> {
        self.current()?.get_flows().await
    }

    /// Writes the flows, then applies the workflow.
    ///
    /// # Errors
    ///
    /// Returns `merge_conflict` while merging, or a git error from the
    /// auto workflow commit.
    pub async fn save_flows(&self, caller: &Caller, flows: &Value) -> VcsResult<()> {
        let project = self.current()?;
        let _files = self.file_set.lock().await;
        project.save_flows(flows).await?;
        if self.options.workflow == Workflow::Auto {
            self.auto_commit(caller, &project).await?;
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an I/O or JSON error.
    pub async fn get_credentials(&self) -> VcsResult<Value> {
        self.current()?.get_credentials().await
    }

    /// # Errors
    ///
    /// Returns an I/O error.
    pub async fn save_credentials(&self, credentials: &Value) -> VcsResult<()> {
        let project = self.current()?;
        let _files = self.file_set.lock().await;
        project.save_credentials(credentials).await
    }

    /// Stages the role files and commits them if that staged anything.
    async fn auto_commit(&self, caller: &Caller, project: &Project) -> VcsResult<()> {
        let mut files = Vec::new();
        for name in project.role_files().names() {
            if fs::try_exists(project.path().join(&name)).await? {
                files.push(name);
            }
        }
        if files.is_empty() {
            return Ok(());
        }
        project.stage(&files).await?;
        if project.status(caller, false).await?.has_staged_changes() {
            project.commit(caller, AUTO_COMMIT_MESSAGE).await?;
            debug!(project = %project.name(), "flow files committed");
        }
        Ok(())
    }
}
