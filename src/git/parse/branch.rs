// flowvcs: Git-backed project storage for flow hosts
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

static BRANCH_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^([ *+]) (\S+) +(\S+)(?: \[(\S+?)(?:: (?:(gone)|(?:ahead (\d+)(?:, )?)?(?:behind (\d+))?))?\])? ?(.*)$",
    )
    .expect("Invalid regex pattern")
});

/// Latest commit on a branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BranchCommit {
    pub sha: String,
    pub subject: String,
}

/// One line of `git branch -vv`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Branch {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote: Option<String>,
    pub ahead: u64,
    pub behind: u64,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub gone: bool,
    pub current: bool,
    pub commit: BranchCommit,
}

/// Parses `git branch -vv --no-color` (optionally `-r`) output.
///
/// Symbolic lines such as `origin/HEAD -> origin/main` are skipped.
#[must_use]
pub fn parse_branches(output: &str) -> Vec<Branch> {
    output
        .lines()
        .filter_map(|line| {
            let caps = BRANCH_LINE.captures(line)?;
            let name = caps.get(2)?.as_str();
            let sha = caps.get(3)?.as_str();
            // Symbolic refs and "(HEAD detached at ...)"
            if sha == "->" || name.starts_with('(') {
                return None;
            }
            let number = |i: usize| {
                caps.get(i)
                    .and_then(|m| m.as_str().parse::<u64>().ok())
                    .unwrap_or(0)
            };
            Some(Branch {
                name: name.to_string(),
                remote: caps.get(4).map(|m| m.as_str().to_string()),
                ahead: number(6),
                behind: number(7),
                gone: caps.get(5).is_some(),
                current: caps.get(1).is_some_and(|m| m.as_str() == "*"),
                commit: BranchCommit {
                    sha: sha.to_string(),
                    subject: caps.get(8).map_or_else(String::new, |m| m.as_str().to_string()),
                },
            })
        })
        .collect()
}
