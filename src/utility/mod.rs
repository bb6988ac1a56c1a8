// flowvcs: Git-backed project storage for flow hosts
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Utility modules.
//!
//! ```text
//! fs
//!   backup:  backup_path(), write_with_backup()
//!   copy:    copy_file_into(), list_dirs()
//! ```

pub mod fs;
