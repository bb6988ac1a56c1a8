// flowvcs: Git-backed project storage for flow hosts
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Project lifecycle commands.

use serde_json::json;
use tracing::info;

use super::{Session, print_json};
use crate::cli::project::{ActivateArgs, CreateArgs, FlowsArgs, InfoArgs, NameArgs, UpdateArgs};
use crate::error::Result;
use crate::manager::{CloneSource, CreateProject};
use crate::project::{CredentialSecret, ProjectUpdate, RoleFiles};

/// Turns `create` arguments into a request.
#[must_use]
pub fn create_request(args: &CreateArgs) -> CreateProject {
    let credential_secret = match (&args.secret, args.no_encryption) {
        (_, true) => CredentialSecret::Disabled,
        (Some(key), false) if !key.is_empty() => CredentialSecret::Custom(key.clone()),
        _ => CredentialSecret::Default,
    };
    CreateProject {
        name: args.name.clone(),
        summary: args.summary.clone(),
        description: args.description.clone(),
        files: args.flow_file.as_deref().map(RoleFiles::new),
        credential_secret,
        git: args.clone.as_ref().map(|url| CloneSource {
            url: url.clone(),
            remote_name: args.remote.clone(),
            branch: args.branch.clone(),
            auth: args.auth.remote_auth(),
        }),
        migrate_files: args.migrate,
    }
}

/// Turns `update` arguments into a request.
#[must_use]
pub fn update_request(args: &UpdateArgs) -> ProjectUpdate {
    ProjectUpdate {
        credential_secret: args.secret.clone(),
        current_credential_secret: args.current_secret.clone(),
        reset_credential_secret: args.reset_secret,
        description: args.description.clone(),
        summary: args.summary.clone(),
        dependencies: None,
        files: args.flow_file.as_deref().map(RoleFiles::new),
    }
}

/// Lists projects and marks the active one.
///
/// # Errors
///
/// Returns an error if the projects directory cannot be read.
pub async fn run_list_command(session: &Session) -> Result<()> {
    let projects = session.manager().list().await?;
    print_json(&json!({
        "active": session.manager().active_name(),
        "projects": projects,
    }))
}

/// # Errors
///
/// Returns `project_exists`, `repository_not_found`, an auth error, or
/// any failure writing the default files.
pub async fn run_create_command(session: &Session, args: &CreateArgs) -> Result<()> {
    let request = create_request(args);
    let project = session.manager().create(session.caller(), &request).await?;
    info!(project = %project.name, "created project");
    print_json(&project)
}

/// # Errors
///
/// Returns `not_found` for unknown projects.
pub async fn run_activate_command(session: &Session, args: &ActivateArgs) -> Result<()> {
    let manager = session.manager();
    manager
        .set_active(session.caller(), &args.name, args.clear_context)
        .await?;
    print_json(&manager.get(session.caller(), &args.name).await?)
}

/// # Errors
///
/// Returns `cannot_delete_active_project` or `not_found`.
pub async fn run_delete_command(session: &Session, args: &NameArgs) -> Result<()> {
    session.manager().delete(session.caller(), &args.name).await?;
    info!(project = %args.name, "deleted project");
    Ok(())
}

/// # Errors
///
/// Returns `not_found` for unknown projects.
pub async fn run_info_command(session: &Session, args: &InfoArgs) -> Result<()> {
    let name = match &args.name {
        Some(name) => name.clone(),
        None => session.target()?,
    };
    print_json(&session.manager().get(session.caller(), &name).await?)
}

/// # Errors
///
/// Returns `missing_current_credential_key` when changing a valid key
/// without the current one.
pub async fn run_update_command(session: &Session, args: &UpdateArgs) -> Result<()> {
    let name = session.target()?;
    let manager = session.manager();
    manager
        .update(session.caller(), &name, &update_request(args))
        .await?;
    print_json(&manager.get(session.caller(), &name).await?)
}

/// # Errors
///
/// Returns `project_empty`, `missing_flow_file` or `merge_conflict`.
pub async fn run_flows_command(session: &Session, args: &FlowsArgs) -> Result<()> {
    let manager = session.manager();
    let value = if args.credentials {
        manager.get_credentials().await?
    } else {
        manager.get_flows().await?
    };
    print_json(&value)
}
