// flowvcs: Git-backed project storage for flow hosts
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Remote credentials taken from flags and the environment.
//!
//! Secrets come from the environment only, so they never show up in a
//! process listing.

use clap::Args;
use std::fmt;

use crate::git::auth::{ENV_GIT_PASSWORD, ENV_SSH_PASSPHRASE};
use crate::keyring::RemoteAuth;

fn env_secret(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Credentials for a networked command.
#[derive(Clone, Default, Args)]
pub struct AuthArgs {
    /// Username for HTTPS remotes; the password is read from
    /// FLOWVCS_GIT_PASSWORD.
    #[arg(long = "git-user", value_name = "NAME", conflicts_with = "ssh_key")]
    pub git_user: Option<String>,

    /// Filled from the environment by [`AuthArgs::remote_auth`], never argv.
    #[arg(skip)]
    pub git_password: Option<String>,

    /// SSH key name, looked up in the projects key directory, then ~/.ssh.
    /// The passphrase is read from FLOWVCS_SSH_PASSPHRASE.
    #[arg(long = "ssh-key", value_name = "NAME")]
    pub ssh_key: Option<String>,

    #[arg(skip)]
    pub ssh_passphrase: Option<String>,
}

impl fmt::Debug for AuthArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hidden = |v: &Option<String>| v.as_ref().map(|_| "[hidden]");
        f.debug_struct("AuthArgs")
            .field("git_user", &self.git_user)
            .field("git_password", &hidden(&self.git_password))
            .field("ssh_key", &self.ssh_key)
            .field("ssh_passphrase", &hidden(&self.ssh_passphrase))
            .finish()
    }
}

impl AuthArgs {
    /// The credentials these flags describe, if any.
    ///
    /// Secrets not set on `self` come from `FLOWVCS_GIT_PASSWORD` and
    /// `FLOWVCS_SSH_PASSPHRASE`.
    #[must_use]
    pub fn remote_auth(&self) -> Option<RemoteAuth> {
        if let Some(username) = &self.git_user {
            return Some(RemoteAuth::Basic {
                username: username.clone(),
                password: self
                    .git_password
                    .clone()
                    .or_else(|| env_secret(ENV_GIT_PASSWORD))
                    .unwrap_or_default(),
            });
        }
        self.ssh_key.as_ref().map(|key| RemoteAuth::Key {
            key_file: key.clone(),
            passphrase: self
                .ssh_passphrase
                .clone()
                .or_else(|| env_secret(ENV_SSH_PASSPHRASE)),
        })
    }
}
