// flowvcs: Git-backed project storage for flow hosts
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::LazyLock;

static REMOTE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(.+)\t(.+) \((fetch|push)\)$").expect("Invalid regex pattern")
});

/// Fetch and push URLs of one remote.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct RemoteUrls {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fetch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub push: Option<String>,
}

/// Remote name to URLs.
pub type Remotes = BTreeMap<String, RemoteUrls>;

/// Parses `git remote -v`.
#[must_use]
pub fn parse_remotes(output: &str) -> Remotes {
    let mut remotes = Remotes::new();
    for caps in output.lines().filter_map(|line| REMOTE_LINE.captures(line)) {
        let entry = remotes.entry(caps[1].to_string()).or_default();
        let url = Some(caps[2].to_string());
        if &caps[3] == "fetch" {
            entry.fetch = url;
        } else {
            entry.push = url;
        }
    }
    remotes
}
