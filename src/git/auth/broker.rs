// flowvcs: Git-backed project storage for flow hosts
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

use std::collections::BTreeMap;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use super::{Credentials, ENV_AUTH_SOCK, ENV_HELPER_EXE, ENV_KEY_FILE};
use crate::error::{AuthError, VcsResult};

const SOCKET_NAME: &str = "auth.sock";
const PROMPT_TIMEOUT: Duration = Duration::from_secs(30);

const ASKPASS_SCRIPT: &str = "#!/bin/sh\nexec \"$FLOWVCS_HELPER_EXE\" askpass \"$1\"\n";
const SSH_SCRIPT: &str =
    "#!/bin/sh\nexec ssh -i \"$FLOWVCS_KEY_FILE\" -F /dev/null -o IdentitiesOnly=yes \"$@\"\n";

/// Opens per-operation credential endpoints.
#[derive(Debug, Clone)]
pub struct AuthBroker {
    helper_exe: PathBuf,
    temp_root: PathBuf,
}

impl AuthBroker {
    /// `helper_exe` is the binary invoked as `<helper_exe> askpass <prompt>`.
    pub fn new(helper_exe: impl Into<PathBuf>) -> Self {
        Self {
            helper_exe: helper_exe.into(),
            temp_root: std::env::temp_dir(),
        }
    }

    /// Places session directories under `root` instead of the system temp dir.
    #[must_use]
    pub fn with_temp_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.temp_root = root.into();
        self
    }

    #[must_use]
    pub fn helper_exe(&self) -> &Path {
        &self.helper_exe
    }

    /// Stands up a fresh endpoint answering prompts from `credentials`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Endpoint` if the directory, scripts or socket
    /// cannot be created.
    pub fn open(&self, credentials: &Credentials) -> VcsResult<AuthSession> {
        let dir = tempfile::Builder::new()
            .prefix("flowvcs-auth-")
            .tempdir_in(&self.temp_root)
            .map_err(AuthError::Endpoint)?;

        let askpass = write_script(dir.path(), "askpass.sh", ASKPASS_SCRIPT)?;
        let socket = dir.path().join(SOCKET_NAME);
        let listener = UnixListener::bind(&socket).map_err(AuthError::Endpoint)?;

        let mut env = BTreeMap::new();
        env.insert(ENV_AUTH_SOCK.to_string(), path_string(&socket));
        env.insert(ENV_HELPER_EXE.to_string(), path_string(&self.helper_exe));
        env.insert("GIT_ASKPASS".to_string(), path_string(&askpass));

        if let Credentials::SshKey { key_path, .. } = credentials {
            let ssh_askpass = write_script(dir.path(), "ssh-askpass.sh", ASKPASS_SCRIPT)?;
            let ssh = write_script(dir.path(), "ssh.sh", SSH_SCRIPT)?;
            env.insert("SSH_ASKPASS".to_string(), path_string(&ssh_askpass));
            env.insert("SSH_ASKPASS_REQUIRE".to_string(), "force".to_string());
            env.insert("DISPLAY".to_string(), "dummy:0".to_string());
            env.insert("GIT_SSH".to_string(), path_string(&ssh));
            env.insert(ENV_KEY_FILE.to_string(), path_string(key_path));
            env.insert("GIT_SSH_COMMAND".to_string(), ssh_command(key_path));
        }

        let token = CancellationToken::new();
        let task = tokio::spawn(serve(listener, credentials.clone(), token.clone()));
        debug!(dir = %dir.path().display(), kind = ?credentials.kind(), "auth endpoint open");

        Ok(AuthSession {
            env,
            socket,
            token,
            task: Some(task),
            dir: Some(dir),
        })
    }
}

/// A live credential endpoint. Dropping it tears everything down.
#[derive(Debug)]
pub struct AuthSession {
    env: BTreeMap<String, String>,
    socket: PathBuf,
    token: CancellationToken,
    task: Option<JoinHandle<()>>,
    dir: Option<TempDir>,
}

impl AuthSession {
    /// Variables to add to the git child's environment.
    #[must_use]
    pub const fn env(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    #[must_use]
    pub fn socket_path(&self) -> &Path {
        &self.socket
    }

    /// Stops the accept loop and removes the endpoint directory.
    pub async fn close(mut self) {
        self.token.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
        if let Some(dir) = self.dir.take() {
            let path = dir.path().to_path_buf();
            if let Err(e) = dir.close() {
                warn!(dir = %path.display(), error = %e, "failed to remove auth endpoint");
            } else {
                debug!(dir = %path.display(), "auth endpoint closed");
            }
        }
    }
}

impl Drop for AuthSession {
    fn drop(&mut self) {
        self.token.cancel();
        if let Some(task) = self.task.take() {
            task.abort();
        }
        // `dir` removes itself when dropped
    }
}

/// Accepts helper connections one at a time until cancelled.
async fn serve(listener: UnixListener, credentials: Credentials, token: CancellationToken) {
    loop {
        tokio::select! {
            () = token.cancelled() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, _)) => {
                    let answered = tokio::time::timeout(
                        PROMPT_TIMEOUT,
                        answer_one(stream, &credentials),
                    )
                    .await;
                    match answered {
                        Ok(Ok(())) => {}
                        Ok(Err(e)) => debug!(error = %e, "credential exchange failed"),
                        Err(_) => debug!("credential helper went quiet"),
                    }
                }
                Err(e) => {
                    warn!(error = %e, "auth endpoint accept failed");
                    break;
                }
            }
        }
    }
}

async fn answer_one(stream: UnixStream, credentials: &Credentials) -> std::io::Result<()> {
    let (read, mut write) = stream.into_split();
    let mut prompt = String::new();
    BufReader::new(read).read_line(&mut prompt).await?;
    let prompt = prompt.trim_end_matches(['\r', '\n']);
    trace!(prompt = %prompt, "credential prompt");

    let mut answer = credentials.answer(prompt);
    answer.push('\n');
    write.write_all(answer.as_bytes()).await?;
    write.shutdown().await
}

fn write_script(dir: &Path, name: &str, body: &str) -> Result<PathBuf, AuthError> {
    let path = dir.join(name);
    std::fs::write(&path, body).map_err(AuthError::Endpoint)?;
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o700))
        .map_err(AuthError::Endpoint)?;
    Ok(path)
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// `GIT_SSH_COMMAND` pinned to one key with the user's ssh config ignored.
pub(super) fn ssh_command(key_path: &Path) -> String {
    let quoted = path_string(key_path).replace('\'', r"'\''");
    format!("ssh -i '{quoted}' -F /dev/null -o IdentitiesOnly=yes")
}
