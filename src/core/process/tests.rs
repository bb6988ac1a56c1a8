// flowvcs: Git-backed project storage for flow hosts
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

use std::time::Duration;

use super::builder::{OutputLine, ProcessBuilder, ProcessFlags, Stream};
use crate::error::ProcessError;

#[tokio::test]
async fn test_process_echo() {
    let output = ProcessBuilder::new("echo")
        .arg("hello")
        .capture_output()
        .run()
        .await
        .expect("echo should succeed");

    assert!(output.success());
    insta::assert_snapshot!(output.stdout(), @"hello");
}

#[tokio::test]
async fn test_process_keeps_trailing_newline() {
    let output = ProcessBuilder::new("/bin/sh")
        .args(["-c", "printf 'a\\nb\\n'"])
        .capture_output()
        .run()
        .await
        .unwrap();

    assert_eq!(output.stdout(), "a\nb\n");
}

#[tokio::test]
async fn test_process_exit_code_allowed() {
    let output = ProcessBuilder::new("/bin/sh")
        .args(["-c", "exit 42"])
        .flag(ProcessFlags::ALLOW_FAILURE)
        .run()
        .await
        .expect("process should complete");

    assert_eq!(output.exit_code(), 42);
}

#[tokio::test]
async fn test_process_exit_code_rejected() {
    let err = ProcessBuilder::new("/bin/sh")
        .args(["-c", "exit 3"])
        .run()
        .await
        .unwrap_err();

    assert!(matches!(err, ProcessError::NonZeroExit { code: 3, .. }));
}

#[tokio::test]
async fn test_process_env_overlay_inherits_parent() {
    let output = ProcessBuilder::new("/bin/sh")
        .args(["-c", "echo \"$FLOWVCS_TEST_VAR:${PATH:+has-path}\""])
        .env("FLOWVCS_TEST_VAR", "test_value")
        .capture_output()
        .run()
        .await
        .expect("process should succeed");

    insta::assert_snapshot!(output.stdout().trim(), @"test_value:has-path");
}

#[tokio::test]
async fn test_process_env_remove() {
    let output = ProcessBuilder::new("/bin/sh")
        .args(["-c", "echo \"[${HOME:-unset}]\""])
        .env_remove("HOME")
        .capture_output()
        .run()
        .await
        .unwrap();

    assert_eq!(output.stdout().trim(), "[unset]");
}

#[tokio::test]
async fn test_process_stdin_is_closed() {
    let output = ProcessBuilder::new("/bin/sh")
        .args(["-c", "cat; echo done"])
        .capture_output()
        .timeout(Duration::from_secs(10))
        .run()
        .await
        .unwrap();

    assert_eq!(output.stdout().trim(), "done");
}

#[tokio::test]
async fn test_process_timeout_kills_child() {
    let err = ProcessBuilder::new("/bin/sh")
        .args(["-c", "sleep 30"])
        .flag(ProcessFlags::NEW_PROCESS_GROUP)
        .capture_output()
        .timeout(Duration::from_millis(200))
        .run()
        .await
        .unwrap_err();

    assert!(matches!(err, ProcessError::Timeout { .. }), "{err}");
}

/// Running and not a zombie, per `/proc`.
#[cfg(target_os = "linux")]
fn is_running(pid: &str) -> bool {
    std::fs::read_to_string(format!("/proc/{pid}/stat")).is_ok_and(|stat| {
        stat.rsplit_once(')')
            .is_some_and(|(_, rest)| !rest.trim_start().starts_with('Z'))
    })
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn test_process_timeout_kills_the_group() {
    let dir = tempfile::tempdir().unwrap();
    let pid_file = dir.path().join("grandchild.pid");
    let script = format!("sleep 30 & echo $! > '{}'; wait", pid_file.display());
    let err = ProcessBuilder::new("/bin/sh")
        .args(["-c", script.as_str()])
        .flag(ProcessFlags::NEW_PROCESS_GROUP)
        .capture_output()
        .timeout(Duration::from_millis(500))
        .run()
        .await
        .unwrap_err();
    assert!(matches!(err, ProcessError::Timeout { .. }), "{err}");

    let pid = std::fs::read_to_string(&pid_file).unwrap();
    let pid = pid.trim();
    let mut gone = false;
    for _ in 0..50 {
        if !is_running(pid) {
            gone = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(gone, "grandchild {pid} outlived the timeout");
}

#[tokio::test]
async fn test_process_streams_lines_to_sink() {
    let (tx, rx) = flume::unbounded();
    let output = ProcessBuilder::new("/bin/sh")
        .args(["-c", "echo one; echo two >&2; echo three"])
        .capture_output()
        .sink(Some(tx))
        .run()
        .await
        .unwrap();

    let lines: Vec<OutputLine> = rx.try_iter().collect();
    let stdout: Vec<&str> = lines
        .iter()
        .filter(|l| l.stream == Stream::Stdout)
        .map(|l| l.line.as_str())
        .collect();
    assert_eq!(stdout, ["one", "three"]);
    assert!(
        lines
            .iter()
            .any(|l| l.stream == Stream::Stderr && l.line == "two")
    );
    assert_eq!(output.stderr(), "two\n");
}

#[tokio::test]
async fn test_missing_executable_is_classified() {
    let err = ProcessBuilder::new("/nonexistent/flowvcs-no-such-binary")
        .run()
        .await
        .unwrap_err();

    assert!(matches!(err, ProcessError::ExecutableNotFound { .. }));
}

#[test]
fn test_executable_lookup() {
    assert!(ProcessBuilder::exists("sh"));
    let path = ProcessBuilder::find("sh").expect("sh should be in PATH");
    assert!(path.exists());

    let program = "nonexistent_program_12345";
    assert!(ProcessBuilder::find(program).is_none());
    let err = ProcessBuilder::which(program).unwrap_err();
    assert!(err.to_string().contains(program));
}

#[test]
fn test_command_line_quotes_spaces() {
    let builder = ProcessBuilder::new("git").args(["commit", "-m", "two words"]);
    insta::assert_snapshot!(builder.command_line(), @r#"git commit -m "two words""#);
}
