// flowvcs: Git-backed project storage for flow hosts
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Working tree status.
//!
//! ```text
//! ## main...origin/main [ahead 2, behind 1]   branch header
//!  M flow.json                                 status lines
//! R  old.json -> new.json
//! ?? lib/                                      untracked dir, propagated
//! ```

use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::LazyLock;

use super::unquote;
use crate::error::ErrorCode;

static BRANCH_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^## (?:No commits yet on |Initial commit on )?(.+?)(?:$|\.\.\.(.+?)(?:$| \[(?:(?:ahead (\d+)(?:,\s*)?)?(?:behind (\d+))?|(gone))\]))",
    )
    .expect("Invalid regex pattern")
});

static FILENAMES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^("(?:[^"\\]|\\.)*"|[^ "]+)(?: -> ("(?:[^"\\]|\\.)*"|.+))?$"#)
        .expect("Invalid regex pattern")
});

/// File or directory marker, serialized as `f` / `d`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FileKind {
    #[serde(rename = "f")]
    File,
    #[serde(rename = "d")]
    Directory,
}

/// One path in the working tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileStatusEntry {
    pub path: String,
    #[serde(rename = "type")]
    pub kind: FileKind,
    /// Two-character porcelain code; `None` for clean tracked files.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Previous name when the entry is a rename.
    #[serde(rename = "oldName", skip_serializing_if = "Option::is_none")]
    pub old_name: Option<String>,
}

impl FileStatusEntry {
    fn new(path: &str) -> Self {
        let kind = if path.ends_with('/') {
            FileKind::Directory
        } else {
            FileKind::File
        };
        Self {
            path: path.to_string(),
            kind,
            status: None,
            old_name: None,
        }
    }

    /// True if the index column shows a staged change.
    #[must_use]
    pub fn is_staged(&self) -> bool {
        self.status
            .as_deref()
            .and_then(|s| s.chars().next())
            .is_some_and(|c| c != ' ' && c != '?')
    }

    /// True for unmerged entries (`UU`, `AA`, `DU`, ...).
    #[must_use]
    pub fn is_unmerged(&self) -> bool {
        matches!(
            self.status.as_deref(),
            Some("DD" | "AU" | "UD" | "UA" | "DU" | "AA" | "UU")
        )
    }
}

/// The parsed `## ...` header of `status --porcelain -b`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BranchHeader {
    pub local: String,
    pub remote: Option<String>,
    pub ahead: Option<u64>,
    pub behind: Option<u64>,
    pub gone: bool,
}

/// Parses a porcelain branch header line.
#[must_use]
pub fn parse_branch_header(line: &str) -> Option<BranchHeader> {
    let caps = BRANCH_HEADER.captures(line)?;
    let number = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u64>().ok());
    Some(BranchHeader {
        local: caps.get(1)?.as_str().to_string(),
        remote: caps.get(2).map(|m| m.as_str().to_string()),
        ahead: number(3),
        behind: number(4),
        gone: caps.get(5).is_some(),
    })
}

/// Parses one porcelain status line into its code and entry.
///
/// Renames resolve to the new name with the old one kept in `old_name`.
#[must_use]
pub fn parse_status_line(line: &str) -> Option<FileStatusEntry> {
    let status = line.get(..2)?;
    let rest = line.get(3..)?;
    if rest.is_empty() {
        return None;
    }

    let (path, old_name) = if status == "??" {
        (unquote(rest), None)
    } else {
        let caps = FILENAMES.captures(rest)?;
        let first = unquote(caps.get(1)?.as_str());
        match caps.get(2) {
            Some(second) => (unquote(second.as_str()), Some(first)),
            None => (first, None),
        }
    };

    let mut entry = FileStatusEntry::new(&path);
    entry.status = Some(status.to_string());
    entry.old_name = old_name;
    Some(entry)
}

/// Commit counters for the current branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CommitCounts {
    pub total: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ahead: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub behind: Option<u64>,
}

/// Current local/upstream branch names.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct BranchSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote: Option<String>,
    #[serde(rename = "remoteError", skip_serializing_if = "Option::is_none")]
    pub remote_error: Option<ErrorCode>,
}

/// Combined repository status.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct RepoStatus {
    pub files: BTreeMap<String, FileStatusEntry>,
    pub commits: CommitCounts,
    pub branches: BranchSummary,
    pub merging: bool,
}

impl RepoStatus {
    /// True if any entry has a staged change.
    #[must_use]
    pub fn has_staged_changes(&self) -> bool {
        self.files.values().any(FileStatusEntry::is_staged)
    }

    /// True if any entry is unmerged.
    #[must_use]
    pub fn has_unmerged(&self) -> bool {
        self.files.values().any(FileStatusEntry::is_unmerged)
    }
}

/// Builds a [`RepoStatus`] from the three raw outputs.
///
/// `ls_files` is the output of `ls-files --cached --others --exclude-standard`
/// and seeds the file map (with synthetic parent directory entries);
/// `porcelain` overlays status codes on top of it.
#[must_use]
pub fn build_status(total: u64, ls_files: &str, porcelain: &str) -> RepoStatus {
    let mut status = RepoStatus {
        commits: CommitCounts {
            total,
            ..CommitCounts::default()
        },
        ..RepoStatus::default()
    };

    for line in ls_files.lines().filter(|l| !l.is_empty()) {
        let full = unquote(line);
        let parts: Vec<&str> = full.split('/').collect();
        for i in 1..parts.len() {
            let dir = format!("{}/", parts[..i].join("/"));
            status
                .files
                .entry(dir.clone())
                .or_insert_with(|| FileStatusEntry::new(&dir));
        }
        status.files.insert(full.clone(), FileStatusEntry::new(&full));
    }

    let mut unknown_dirs = Vec::new();
    for line in porcelain.lines().filter(|l| !l.is_empty()) {
        if line.starts_with('#') {
            if let Some(header) = parse_branch_header(line) {
                apply_header(&mut status, header);
            }
            continue;
        }
        let Some(parsed) = parse_status_line(line) else {
            continue;
        };
        if parsed.status.as_deref() == Some("??") && parsed.path.ends_with('/') {
            unknown_dirs.push(parsed.path.clone());
        }
        let entry = status
            .files
            .entry(parsed.path.clone())
            .or_insert_with(|| FileStatusEntry::new(&parsed.path));
        entry.status = parsed.status;
        if parsed.old_name.is_some() {
            entry.old_name = parsed.old_name;
        }
    }

    for (path, entry) in &mut status.files {
        if entry.status.is_none() && unknown_dirs.iter().any(|dir| path.starts_with(dir)) {
            entry.status = Some("??".to_string());
        }
    }

    status
}

fn apply_header(status: &mut RepoStatus, header: BranchHeader) {
    status.branches.local = Some(header.local);
    if header.remote.is_some() {
        status.branches.remote = header.remote;
        status.commits.ahead = Some(0);
        status.commits.behind = Some(0);
    }
    if header.ahead.is_some() {
        status.commits.ahead = header.ahead;
    }
    if header.behind.is_some() {
        status.commits.behind = header.behind;
    }
    if header.gone {
        status.commits.ahead = Some(status.commits.total);
        status.branches.remote_error = Some(ErrorCode::RemoteGone);
    }
}
