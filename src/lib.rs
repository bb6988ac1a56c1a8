// flowvcs: Git-backed project storage for flow hosts
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Library root.
//!
//! # Crate Architecture
//!
//! ```text
//!                        main.rs
//!                           |
//!                +----------+----------+
//!                v                     v
//!             cli (clap)          cmd (handlers)
//!                |            Session, JSON output
//!                +----------+----------+
//!                           v
//!              ,---------------------------,
//!              |          manager          |
//!              | active project, reloads,  |
//!              |  settings, host seams     |
//!              '-------------+-------------'
//!                            v
//!              ,---------------------------,
//!              |          project          |
//!              | state, role files, vcs ops|
//!              '--+-----------+--------+---'
//!                 |           |        |
//!                 v           v        v
//!               git        git/auth  keyring
//!           runner/parse   askpass   SSH keys
//!               |
//!   +-----------+-----------------------------+
//!   |  core     process (spawn, capture, kill) |
//!   +------------------------------------------+
//!   |  foundation   error, logging, config,    |
//!   |               utility                    |
//!   +------------------------------------------+
//! ```

pub mod cli;
pub mod cmd;
pub mod config;
pub mod core;
pub mod error;
pub mod git;
pub mod keyring;
pub mod logging;
pub mod manager;
pub mod project;
pub mod utility;
