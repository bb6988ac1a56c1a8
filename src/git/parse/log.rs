// flowvcs: Git-backed project storage for flow hosts
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

use serde::Serialize;

/// `--format` string understood by [`parse_log`]; records end at `-----`.
pub const LOG_FORMAT: &str =
    "--format=sha: %H%nparents: %p%nrefs: %D%nauthor: %an%ndate: %ct%nsubject: %s%n-----";

const SENTINEL: &str = "-----";

/// One commit from `git log`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct CommitRecord {
    pub sha: String,
    pub parents: Vec<String>,
    pub refs: Vec<String>,
    pub author: String,
    /// Committer timestamp, seconds since the epoch.
    pub date: i64,
    pub subject: String,
}

/// Parses output produced with [`LOG_FORMAT`].
///
/// Old git versions print `%D` literally; that is read as "no refs".
#[must_use]
pub fn parse_log(output: &str) -> Vec<CommitRecord> {
    let mut commits = Vec::new();
    let mut current = CommitRecord::default();

    for line in output.lines() {
        if line == SENTINEL {
            commits.push(std::mem::take(&mut current));
            continue;
        }
        let Some((key, value)) = line.split_once(": ").or_else(|| {
            // "parents: " and "refs: " with nothing after them lose the space
            line.strip_suffix(':').map(|key| (key, ""))
        }) else {
            continue;
        };
        match key {
            "sha" => current.sha = value.to_string(),
            "parents" => {
                current.parents = value.split_whitespace().map(String::from).collect();
            }
            "refs" => {
                current.refs = if value.is_empty() || value == "%D" {
                    Vec::new()
                } else {
                    value.split(',').map(|r| r.trim().to_string()).collect()
                };
            }
            "author" => current.author = value.to_string(),
            "date" => current.date = value.trim().parse().unwrap_or_default(),
            "subject" => current.subject = value.to_string(),
            _ => {}
        }
    }

    commits
}
