// flowvcs: Git-backed project storage for flow hosts
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! SSH key lookup for remote credentials.
//!
//! ```text
//! RemoteAuth::Key { key_file: "deploy" }  (caller "alice")
//!   1. <user_dir>/projects/.sshkeys/alice_deploy
//!   2. ~/.ssh/deploy
//! ```
//!
//! Keys are only looked up here; generating them is the host's business.

use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{AuthError, VcsResult};
use crate::git::Credentials;

#[cfg(test)]
mod tests;

/// Resolves a named SSH key to a private key file.
pub trait KeyLookup: Send + Sync {
    /// # Errors
    ///
    /// Returns `AuthError::KeyNotFound` if no key file exists.
    fn key_path(&self, user: &str, name: &str) -> VcsResult<PathBuf>;
}

/// Keys stored under the projects directory, then in `~/.ssh`.
#[derive(Debug, Clone)]
pub struct SshKeyDir {
    dir: PathBuf,
    home_ssh: Option<PathBuf>,
}

impl SshKeyDir {
    /// Keys under `<projects_root>/.sshkeys`, falling back to `$HOME/.ssh`.
    pub fn new(projects_root: &Path) -> Self {
        Self {
            dir: projects_root.join(".sshkeys"),
            home_ssh: std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".ssh")),
        }
    }

    #[must_use]
    pub fn with_home_ssh(mut self, dir: Option<PathBuf>) -> Self {
        self.home_ssh = dir;
        self
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl KeyLookup for SshKeyDir {
    fn key_path(&self, user: &str, name: &str) -> VcsResult<PathBuf> {
        let not_found = || AuthError::KeyNotFound {
            name: name.to_string(),
        };
        if name.is_empty() || name.contains(['/', '\\']) || name.starts_with('.') {
            return Err(not_found().into());
        }
        let candidates = std::iter::once(self.dir.join(format!("{user}_{name}")))
            .chain(self.home_ssh.iter().map(|dir| dir.join(name)));
        for candidate in candidates {
            if candidate.is_file() {
                debug!(key = %candidate.display(), "ssh key resolved");
                return Ok(candidate);
            }
        }
        Err(not_found().into())
    }
}

/// Credentials as a caller supplies them for a remote.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RemoteAuth {
    Basic {
        username: String,
        password: String,
    },
    #[serde(rename_all = "camelCase")]
    Key {
        key_file: String,
        #[serde(default)]
        passphrase: Option<String>,
    },
}

impl RemoteAuth {
    /// Turns a key reference into a key path.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::KeyNotFound` for unknown keys.
    pub fn resolve(&self, keys: &dyn KeyLookup, user: &str) -> VcsResult<Credentials> {
        Ok(match self {
            Self::Basic { username, password } => Credentials::Basic {
                username: username.clone(),
                password: password.clone(),
            },
            Self::Key {
                key_file,
                passphrase,
            } => Credentials::SshKey {
                key_path: keys.key_path(user, key_file)?,
                passphrase: passphrase.clone(),
            },
        })
    }
}

impl fmt::Debug for RemoteAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .finish_non_exhaustive(),
            Self::Key { key_file, .. } => f
                .debug_struct("Key")
                .field("key_file", key_file)
                .finish_non_exhaustive(),
        }
    }
}
