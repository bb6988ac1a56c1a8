// flowvcs: Git-backed project storage for flow hosts
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! `package.json` model and the files a new project starts with.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::VcsResult;

pub const PACKAGE_FILE: &str = "package.json";
pub const README_FILE: &str = "README.md";
pub const GITIGNORE_FILE: &str = ".gitignore";
pub const DEFAULT_FLOW_FILE: &str = "flows.json";

/// Names of the role files, as recorded in the package `flows` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleFiles {
    #[serde(rename = "flowFile", default, skip_serializing_if = "Option::is_none")]
    pub flow: Option<String>,
    #[serde(
        rename = "credentialsFile",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub credentials: Option<String>,
}

impl RoleFiles {
    /// A flow file with its derived credentials file.
    pub fn new(flow: impl Into<String>) -> Self {
        let flow = flow.into();
        Self {
            credentials: Some(credentials_name_for(&flow)),
            flow: Some(flow),
        }
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.flow.is_none() && self.credentials.is_none()
    }

    /// Fills in the credentials name from the flow name when absent.
    #[must_use]
    pub fn normalized(&self) -> Self {
        Self {
            flow: self.flow.clone(),
            credentials: self
                .credentials
                .clone()
                .or_else(|| self.flow.as_deref().map(credentials_name_for)),
        }
    }

    /// True if `path` names one of the role files.
    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        let path = path.trim_start_matches("./");
        self.flow.as_deref() == Some(path) || self.credentials.as_deref() == Some(path)
    }

    /// Role file names that are set, flow first.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.flow
            .iter()
            .chain(self.credentials.iter())
            .cloned()
            .collect()
    }
}

/// `flows.json` -> `flows_cred.json`; keeps any directory prefix.
#[must_use]
pub fn credentials_name_for(flow: &str) -> String {
    let path = Path::new(flow);
    let stem = path
        .file_stem()
        .map_or_else(|| flow.to_string(), |s| s.to_string_lossy().into_owned());
    let name = match path.extension() {
        Some(ext) => format!("{stem}_cred.{}", ext.to_string_lossy()),
        None => format!("{stem}_cred"),
    };
    match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => format!("{}/{name}", parent.to_string_lossy()),
        None => name,
    }
}

/// The project's `package.json`. Unknown keys are kept as they were.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PackageFile {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version: String,
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "RoleFiles::is_empty")]
    pub flows: RoleFiles,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl PackageFile {
    pub fn new(name: impl Into<String>, summary: impl Into<String>, files: RoleFiles) -> Self {
        Self {
            name: name.into(),
            description: summary.into(),
            version: "0.0.1".to_string(),
            flows: files,
            ..Self::default()
        }
    }

    /// # Errors
    ///
    /// Returns an error if `text` is not a JSON object of the expected shape.
    pub fn parse(text: &str) -> VcsResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> VcsResult<String> {
        let mut text = serde_json::to_string_pretty(self)?;
        text.push('\n');
        Ok(text)
    }
}

/// README text for a new project.
#[must_use]
pub fn default_readme(name: &str, summary: &str, description: &str) -> String {
    let mut text = format!("# {name}\n");
    for part in [summary, description] {
        if !part.trim().is_empty() {
            text.push('\n');
            text.push_str(part.trim());
            text.push('\n');
        }
    }
    text
}

/// Ignore rules for a new project: the dot backups of the role files.
pub const DEFAULT_GITIGNORE: &str = "*.backup\n";
