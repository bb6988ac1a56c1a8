// flowvcs: Git-backed project storage for flow hosts
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! The hidden `askpass` command run by git through the helper scripts.
//!
//! Prints only the answer on stdout; git reads it as the secret.

use std::io::Write;

use crate::error::{Result, VcsError};
use crate::git::auth::helper::relay_from_env;

/// Relays `prompt` to the broker and prints its answer.
///
/// # Errors
///
/// Returns `AuthError::HelperEnvironment` outside a brokered git call, or
/// `AuthError::HelperConnect` if the broker is gone.
pub async fn run_askpass_command(prompt: &str) -> Result<()> {
    let answer = relay_from_env(prompt).await.map_err(VcsError::from)?;
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{answer}")?;
    stdout.flush()?;
    Ok(())
}
