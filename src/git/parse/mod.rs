// flowvcs: Git-backed project storage for flow hosts
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Parsers for git's script-friendly output formats.
//!
//! ```text
//! status   rev-list --count + ls-files + status --porcelain -b --> RepoStatus
//! branch   branch -vv --no-color [-r]                           --> Vec<Branch>
//! log      log --format=<LOG_FORMAT>                             --> Vec<CommitRecord>
//! remote   remote -v                                             --> Remotes
//! ```
//!
//! Everything here is a pure function over `&str`; nothing spawns git.

pub mod branch;
pub mod log;
pub mod remote;
pub mod status;


pub use branch::{Branch, BranchCommit, parse_branches};
pub use log::{CommitRecord, LOG_FORMAT, parse_log};
pub use remote::{RemoteUrls, Remotes, parse_remotes};
pub use status::{
    BranchHeader, BranchSummary, CommitCounts, FileKind, FileStatusEntry, RepoStatus,
    build_status, parse_branch_header, parse_status_line,
};

/// Strips git's C-style quoting from a path, if present.
///
/// `"a b.json"` becomes `a b.json`; escapes such as `\"`, `\\`, `\t` and
/// octal byte sequences (`\303\251`) are decoded.
#[must_use]
pub fn unquote(name: &str) -> String {
    let Some(inner) = name
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
    else {
        return name.to_string();
    };

    let mut bytes = Vec::with_capacity(inner.len());
    let mut chars = inner.bytes().peekable();
    while let Some(b) = chars.next() {
        if b != b'\\' {
            bytes.push(b);
            continue;
        }
        match chars.next() {
            Some(b'n') => bytes.push(b'\n'),
            Some(b't') => bytes.push(b'\t'),
            Some(b'r') => bytes.push(b'\r'),
            Some(d @ b'0'..=b'7') => {
                let mut value = u32::from(d - b'0');
                for _ in 0..2 {
                    match chars.peek() {
                        Some(&o @ b'0'..=b'7') => {
                            value = value * 8 + u32::from(o - b'0');
                            chars.next();
                        }
                        _ => break,
                    }
                }
                bytes.push(u8::try_from(value).unwrap_or(b'?'));
            }
            Some(other) => bytes.push(other),
            None => bytes.push(b'\\'),
        }
    }
    String::from_utf8_lossy(&bytes).into_owned()
}
