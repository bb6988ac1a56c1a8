// flowvcs: Git-backed project storage for flow hosts
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Integration tests for the flowvcs binary.
//!
//! Every run gets its own HOME so no user configuration leaks in.

use serde_json::Value;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

const BIN: &str = env!("CARGO_BIN_EXE_flowvcs");

fn git_available() -> bool {
    which::which("git").is_ok()
}

fn flowvcs(home: &Path, args: &[&str]) -> Output {
    Command::new(BIN)
        .args([
            "--no-default-configs",
            "-q",
            "-s",
            "git.user_name=Test",
            "-s",
            "git.user_email=test@test.com",
        ])
        .args(args)
        .env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .env_remove("FLOWVCS_PROJECTS_DIR")
        .env_remove("FLOWVCS_USER")
        .output()
        .expect("flowvcs runs")
}

fn json(output: &Output) -> Value {
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("JSON on stdout")
}

#[test]
fn cli_version() {
    let home = TempDir::new().unwrap();
    let output = flowvcs(home.path(), &["version"]);
    assert!(output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout).trim(),
        env!("CARGO_PKG_VERSION")
    );
}

#[test]
fn cli_options_hide_the_secret() {
    let home = TempDir::new().unwrap();
    let output = flowvcs(
        home.path(),
        &["-s", "projects.credential_secret=topsecret", "options"],
    );
    assert!(output.status.success());
    let text = String::from_utf8_lossy(&output.stdout);
    assert!(text.contains("[hidden]"));
    assert!(!text.contains("topsecret"));
}

#[test]
fn cli_bad_override_fails() {
    let home = TempDir::new().unwrap();
    let output = flowvcs(home.path(), &["-s", "projects.workflow=sometimes", "list"]);
    assert!(!output.status.success());
}

#[test]
fn cli_project_lifecycle() {
    if !git_available() {
        eprintln!("git not installed; skipping");
        return;
    }
    let home = TempDir::new().unwrap();
    let projects = home.path().join("projects");
    let projects_arg = projects.display().to_string();
    let run = |args: &[&str]| {
        let mut full = vec!["--projects", projects_arg.as_str()];
        full.extend_from_slice(args);
        flowvcs(home.path(), &full)
    };

    let listed = json(&run(&["list"]));
    assert_eq!(listed["projects"], serde_json::json!([]));
    assert_eq!(listed["active"], Value::Null);

    let created = json(&run(&["create", "demo", "--summary", "A demo", "--no-encryption"]));
    assert_eq!(created["name"], "demo");
    assert_eq!(created["summary"], "A demo");
    assert_eq!(created["settings"]["credentialsEncrypted"], false);
    assert!(projects.join("demo/flows.json").is_file());

    // The active project survives across runs through the settings file.
    let listed = json(&run(&["list"]));
    assert_eq!(listed["active"], "demo");

    let info = json(&run(&["info"]));
    assert_eq!(info["empty"], false);
    assert_eq!(info["files"]["flowFile"], "flows.json");

    let status = json(&run(&["status"]));
    assert_eq!(status["merging"], false);
    assert_eq!(status["commits"]["total"], 1);

    let log = json(&run(&["log", "-n", "5"]));
    assert_eq!(log["total"], 1);

    let missing = run(&["activate", "nope"]);
    assert!(!missing.status.success());
    assert!(String::from_utf8_lossy(&missing.stderr).contains("Error[not_found]"));

    let refused = run(&["delete", "demo"]);
    assert!(!refused.status.success());
    assert!(
        String::from_utf8_lossy(&refused.stderr).contains("Error[cannot_delete_active_project]")
    );

    let other = run(&["-p", "other", "status"]);
    assert!(!other.status.success());
    assert!(
        String::from_utf8_lossy(&other.stderr)
            .contains("Error[cannot_operate_on_inactive_project]")
    );
}
