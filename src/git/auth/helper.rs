// flowvcs: Git-backed project storage for flow hosts
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Client side of the credential endpoint, run as `flowvcs askpass <prompt>`.

use std::path::Path;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;

use super::ENV_AUTH_SOCK;
use crate::error::AuthError;

/// Sends `prompt` to the broker at `socket` and returns its answer.
///
/// # Errors
///
/// Returns `AuthError::HelperConnect` if the endpoint cannot be reached.
pub async fn relay_prompt(socket: &Path, prompt: &str) -> Result<String, AuthError> {
    let stream = UnixStream::connect(socket)
        .await
        .map_err(AuthError::HelperConnect)?;
    let (read, mut write) = stream.into_split();

    let line = format!("{}\n", prompt.replace('\n', " "));
    write
        .write_all(line.as_bytes())
        .await
        .map_err(AuthError::HelperConnect)?;

    let mut answer = String::new();
    BufReader::new(read)
        .read_line(&mut answer)
        .await
        .map_err(AuthError::HelperConnect)?;
    Ok(answer.trim_end_matches(['\r', '\n']).to_string())
}

/// Relays `prompt` to the endpoint named by `FLOWVCS_AUTH_SOCK`.
///
/// # Errors
///
/// Returns `AuthError::HelperEnvironment` if the variable is unset.
pub async fn relay_from_env(prompt: &str) -> Result<String, AuthError> {
    let socket =
        std::env::var_os(ENV_AUTH_SOCK).ok_or(AuthError::HelperEnvironment(ENV_AUTH_SOCK))?;
    relay_prompt(Path::new(&socket), prompt).await
}
