// flowvcs: Git-backed project storage for flow hosts
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Failure classification for git invocations.
//!
//! ```text
//! (stdout, stderr) --> RULES (first match wins) --> ErrorCode
//!                          |
//!                          no match --> unexpected_error
//!
//! push: unexpected_error + stdout "^!.*non-fast-forward" --> push_failed
//! ```
//!
//! Rules are tested in table order. Add new ones to [`RULES`]; call sites
//! only ever see the resulting [`ErrorCode`].

use regex::{Regex, RegexBuilder};
use std::sync::LazyLock;

use crate::error::ErrorCode;

/// Which captured stream a rule inspects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Stdout,
    Stderr,
}

/// One classification rule: a pattern, the stream it applies to and the code.
#[derive(Debug, Clone, Copy)]
pub struct Rule {
    pub pattern: &'static str,
    pub source: Source,
    pub case_insensitive: bool,
    pub code: ErrorCode,
}

const fn stderr(pattern: &'static str, code: ErrorCode) -> Rule {
    Rule {
        pattern,
        source: Source::Stderr,
        case_insensitive: true,
        code,
    }
}

/// Ordered rule table.
pub const RULES: &[Rule] = &[
    stderr(r"Connection refused", ErrorCode::ConnectionFailed),
    stderr(r"Connection timed out", ErrorCode::ConnectionFailed),
    stderr(r"Could not resolve host", ErrorCode::ConnectionFailed),
    stderr(
        r"Host key verification failed",
        ErrorCode::HostKeyVerificationFailed,
    ),
    stderr(r"fatal: could not read", ErrorCode::AuthFailed),
    stderr(r"HTTP Basic: Access denied", ErrorCode::AuthFailed),
    stderr(r"Authentication failed", ErrorCode::AuthFailed),
    stderr(r"Permission denied \(publickey", ErrorCode::AuthFailed),
    stderr(r"commit your changes or stash", ErrorCode::LocalOverwrite),
    Rule {
        pattern: r"CONFLICT",
        source: Source::Stdout,
        case_insensitive: false,
        code: ErrorCode::MergeConflict,
    },
    stderr(r"not fully merged", ErrorCode::DeleteBranchUnmerged),
    stderr(r"remote .* already exists", ErrorCode::RemoteAlreadyExists),
    stderr(
        r"does not appear to be a git repository",
        ErrorCode::NotARepository,
    ),
    stderr(r"not a git repository", ErrorCode::NotARepository),
    stderr(r"Repository not found", ErrorCode::RepositoryNotFound),
    stderr(r"repository '.*' does not exist", ErrorCode::RepositoryNotFound),
    stderr(
        r"refusing to merge unrelated histories",
        ErrorCode::PullUnrelatedHistory,
    ),
    stderr(r"Please tell me who you are", ErrorCode::MissingUser),
    stderr(
        r"name consists only of disallowed characters",
        ErrorCode::MissingUser,
    ),
];

struct Compiled {
    regex: Regex,
    source: Source,
    code: ErrorCode,
}

static COMPILED: LazyLock<Vec<Compiled>> = LazyLock::new(|| {
    RULES
        .iter()
        .map(|rule| Compiled {
            regex: RegexBuilder::new(rule.pattern)
                .case_insensitive(rule.case_insensitive)
                .build()
                .expect("Invalid regex pattern"),
            source: rule.source,
            code: rule.code,
        })
        .collect()
});

static NON_FAST_FORWARD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^!.*non-fast-forward").expect("Invalid regex pattern"));

/// Classifies a failed invocation by its captured output.
#[must_use]
pub fn classify(stdout: &str, stderr: &str) -> ErrorCode {
    COMPILED
        .iter()
        .find(|rule| {
            let text = match rule.source {
                Source::Stdout => stdout,
                Source::Stderr => stderr,
            };
            rule.regex.is_match(text)
        })
        .map_or(ErrorCode::UnexpectedError, |rule| rule.code)
}

/// Classifies a failed `push --porcelain`.
///
/// Only a generic failure whose porcelain output marks a rejected
/// non-fast-forward ref is narrowed to `push_failed`.
#[must_use]
pub fn classify_push(stdout: &str, stderr: &str) -> ErrorCode {
    match classify(stdout, stderr) {
        ErrorCode::UnexpectedError if NON_FAST_FORWARD.is_match(stdout) => ErrorCode::PushFailed,
        code => code,
    }
}
