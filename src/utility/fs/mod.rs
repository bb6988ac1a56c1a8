// flowvcs: Git-backed project storage for flow hosts
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Filesystem helpers for role files and project directories.
//!
//! ```text
//! backup:  backup_path()        flows.json --> .flows.json.backup
//!          write_with_backup()  copy old contents aside, then write
//! copy:    copy_file_into()     migrate a standalone file into a project
//!          list_dirs()          sorted, case-insensitive, no dotfiles
//! ```

pub mod backup;
pub mod copy;
