// flowvcs: Git-backed project storage for flow hosts
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Scripted [`GitRunner`] for unit tests.
//!
//! ```text
//! on(["push"], [out1, out2])   queue per argv prefix, last output repeats
//! effect(["clone"], f)         side effect run before answering
//! prompts(["Username", ..])    relayed through FLOWVCS_AUTH_SOCK when present
//! ```
//!
//! Leading `-c key=value` pairs are skipped when matching. The most
//! recently registered matching rule wins; unmatched requests succeed
//! with empty output.

use futures_util::future::BoxFuture;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::auth::ENV_AUTH_SOCK;
use super::auth::helper::relay_prompt;
use super::runner::{GitOutput, GitRequest, GitRunner};
use crate::error::VcsResult;

type Effect = Box<dyn Fn(&GitRequest) + Send + Sync>;

struct ScriptRule {
    prefix: Vec<String>,
    outputs: VecDeque<GitOutput>,
    effect: Option<Effect>,
}

#[derive(Default)]
pub(crate) struct ScriptedGit {
    rules: Mutex<Vec<ScriptRule>>,
    calls: Mutex<Vec<GitRequest>>,
    prompts: Mutex<Vec<String>>,
    answers: Mutex<Vec<String>>,
    delay: Mutex<Duration>,
    in_flight: AtomicBool,
    overlapped: AtomicBool,
}

/// Argv with leading `-c key=value` pairs removed.
pub(crate) fn command_args(request: &GitRequest) -> &[String] {
    let mut args = request.args.as_slice();
    while args.len() >= 2 && args[0] == "-c" {
        args = &args[2..];
    }
    args
}

impl ScriptedGit {
    pub(crate) fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn on<const N: usize>(
        &self,
        prefix: [&str; N],
        outputs: impl IntoIterator<Item = GitOutput>,
    ) -> &Self {
        self.rules.lock().unwrap().push(ScriptRule {
            prefix: prefix.iter().map(|s| (*s).to_string()).collect(),
            outputs: outputs.into_iter().collect(),
            effect: None,
        });
        self
    }

    pub(crate) fn effect<const N: usize>(
        &self,
        prefix: [&str; N],
        output: GitOutput,
        effect: impl Fn(&GitRequest) + Send + Sync + 'static,
    ) -> &Self {
        self.rules.lock().unwrap().push(ScriptRule {
            prefix: prefix.iter().map(|s| (*s).to_string()).collect(),
            outputs: VecDeque::from([output]),
            effect: Some(Box::new(effect)),
        });
        self
    }

    pub(crate) fn prompts<const N: usize>(&self, prompts: [&str; N]) -> &Self {
        *self.prompts.lock().unwrap() = prompts.iter().map(|s| (*s).to_string()).collect();
        self
    }

    /// Holds every call open for `delay` to widen overlap windows.
    pub(crate) fn delay(&self, delay: Duration) -> &Self {
        *self.delay.lock().unwrap() = delay;
        self
    }

    pub(crate) fn calls(&self) -> Vec<Vec<String>> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|r| command_args(r).to_vec())
            .collect()
    }

    pub(crate) fn requests(&self) -> Vec<GitRequest> {
        self.calls.lock().unwrap().clone()
    }

    /// Calls whose command starts with `verb`.
    pub(crate) fn count(&self, verb: &str) -> usize {
        self.calls()
            .iter()
            .filter(|args| args.first().is_some_and(|a| a == verb))
            .count()
    }

    pub(crate) fn answers(&self) -> Vec<String> {
        self.answers.lock().unwrap().clone()
    }

    pub(crate) fn overlapped(&self) -> bool {
        self.overlapped.load(Ordering::SeqCst)
    }

    fn respond(&self, request: &GitRequest) -> GitOutput {
        let args = command_args(request);
        let mut rules = self.rules.lock().unwrap();
        let Some(rule) = rules
            .iter_mut()
            .rev()
            .find(|rule| args.starts_with(&rule.prefix))
        else {
            return GitOutput::ok("");
        };
        if let Some(effect) = &rule.effect {
            effect(request);
        }
        if rule.outputs.len() > 1 {
            rule.outputs.pop_front().unwrap_or_default()
        } else {
            rule.outputs.front().cloned().unwrap_or_default()
        }
    }

    async fn execute(&self, request: GitRequest) -> VcsResult<GitOutput> {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            self.overlapped.store(true, Ordering::SeqCst);
        }
        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if let Some(socket) = request.env.get(ENV_AUTH_SOCK) {
            let prompts = self.prompts.lock().unwrap().clone();
            for prompt in prompts {
                if let Ok(answer) = relay_prompt(Path::new(socket), &prompt).await {
                    self.answers.lock().unwrap().push(answer);
                }
            }
        }

        let output = self.respond(&request);
        self.calls.lock().unwrap().push(request);
        self.in_flight.store(false, Ordering::SeqCst);
        Ok(output)
    }
}

impl GitRunner for ScriptedGit {
    fn run(&self, request: GitRequest) -> BoxFuture<'_, VcsResult<GitOutput>> {
        Box::pin(self.execute(request))
    }
}
