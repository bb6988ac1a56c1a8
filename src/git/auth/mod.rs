// flowvcs: Git-backed project storage for flow hosts
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Credential forwarding for networked git operations.
//!
//! ```text
//!  AuthBroker::open(&Credentials)
//!        |
//!        v
//!  AuthSession (owns a 0700 temp dir)
//!    auth.sock        UnixListener, answered by a spawned task
//!    askpass.sh       exec "$FLOWVCS_HELPER_EXE" askpass "$1"
//!    ssh-askpass.sh   same, handed to ssh as SSH_ASKPASS
//!    ssh.sh           ssh -i "$FLOWVCS_KEY_FILE" -F /dev/null ...
//!        |
//!        | env() --> GIT_ASKPASS, SSH_ASKPASS, GIT_SSH_COMMAND, FLOWVCS_*
//!        v
//!  git --> askpass.sh --> flowvcs askpass "<prompt>"
//!                              |  connect auth.sock
//!                              |  "<prompt>\n"  -->
//!                              |  <-- "<answer>\n"
//!                              v
//!                         prints answer to git
//!
//!  close() / Drop: cancel accept loop, delete temp dir
//! ```
//!
//! Secrets live only in the broker task's memory. Environment variables
//! carry paths, never the password or passphrase.

mod broker;
pub mod helper;

#[cfg(test)]
mod tests;

pub use broker::{AuthBroker, AuthSession};

use std::fmt;
use std::path::PathBuf;

/// Environment variable naming the rendezvous socket.
pub const ENV_AUTH_SOCK: &str = "FLOWVCS_AUTH_SOCK";
/// Environment variable naming the executable that relays prompts.
pub const ENV_HELPER_EXE: &str = "FLOWVCS_HELPER_EXE";
/// Environment variable naming the SSH private key for `ssh.sh`.
pub const ENV_KEY_FILE: &str = "FLOWVCS_KEY_FILE";
/// HTTPS password handed to the CLI.
pub const ENV_GIT_PASSWORD: &str = "FLOWVCS_GIT_PASSWORD";
/// SSH key passphrase handed to the CLI.
pub const ENV_SSH_PASSPHRASE: &str = "FLOWVCS_SSH_PASSPHRASE";

/// Secrets in our own environment that git and its children never inherit.
pub const SECRET_ENV_VARS: [&str; 4] = [
    ENV_GIT_PASSWORD,
    ENV_SSH_PASSPHRASE,
    "FLOWVCS_CREDENTIAL_SECRET",
    "FLOWVCS_PROJECTS__CREDENTIAL_SECRET",
];

/// Transport kind a credential object serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthKind {
    Password,
    Key,
}

/// Caller-supplied credentials for one remote.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    Basic {
        username: String,
        password: String,
    },
    SshKey {
        key_path: PathBuf,
        passphrase: Option<String>,
    },
}

impl Credentials {
    #[must_use]
    pub const fn kind(&self) -> AuthKind {
        match self {
            Self::Basic { .. } => AuthKind::Password,
            Self::SshKey { .. } => AuthKind::Key,
        }
    }

    /// Answers a prompt from git or ssh.
    ///
    /// Never asks a human: unknown prompts get an empty answer and host
    /// key confirmations are declined. Prompts are matched on their leading
    /// word, not on the URL that follows it.
    #[must_use]
    pub fn answer(&self, prompt: &str) -> String {
        let prompt = prompt.trim_start().to_lowercase();
        match self {
            Self::Basic { username, .. } if prompt.starts_with("username") => username.clone(),
            Self::Basic { password, .. }
                if prompt.starts_with("password") || prompt.trim_end().ends_with("password:") =>
            {
                password.clone()
            }
            _ if prompt.contains("yes/no") => "no".to_string(),
            Self::Basic { .. } => String::new(),
            Self::SshKey { passphrase, .. } => {
                if prompt.contains("passphrase") {
                    passphrase.clone().unwrap_or_default()
                } else {
                    String::new()
                }
            }
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"[hidden]")
                .finish(),
            Self::SshKey {
                key_path,
                passphrase,
            } => f
                .debug_struct("SshKey")
                .field("key_path", key_path)
                .field("passphrase", &passphrase.as_ref().map(|_| "[hidden]"))
                .finish(),
        }
    }
}
