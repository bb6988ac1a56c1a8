// flowvcs: Git-backed project storage for flow hosts
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Core process management.
//!
//! ```text
//!              core
//!               |
//!            process
//!               |
//!     Builder  Output  Runner
//!     flags, env,      spawn in own process group,
//!     timeout, sink    capture, kill on timeout
//! ```

pub mod process;
