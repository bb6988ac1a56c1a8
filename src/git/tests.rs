// flowvcs: Git-backed project storage for flow hosts
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

use super::classify::{classify, classify_push};
use super::fake::ScriptedGit;
use super::runner::{Classifier, GitOutput, GitRequest};
use super::{AuthBroker, CloneOptions, Credentials, Git, GitUser, PullOptions, PushOptions, ShellGit};
use crate::error::{ErrorCode, GitError, VcsError};

fn temp_dir() -> TempDir {
    tempfile::tempdir().expect("failed to create temp dir")
}

fn scripted() -> (Arc<ScriptedGit>, Git) {
    let fake = ScriptedGit::shared();
    let git = Git::new(fake.clone(), AuthBroker::new("/usr/bin/flowvcs"));
    (fake, git)
}

fn creds() -> Credentials {
    Credentials::Basic {
        username: "alice".to_string(),
        password: "s3cret".to_string(),
    }
}

// --- classify ---

#[test]
fn test_classify_table() {
    let cases = [
        ("ssh: connect to host example.com port 22: Connection refused", ErrorCode::ConnectionFailed),
        ("fatal: unable to access: Could not resolve host: example.com", ErrorCode::ConnectionFailed),
        ("Host key verification failed.", ErrorCode::HostKeyVerificationFailed),
        ("fatal: could not read Username for 'https://example.com'", ErrorCode::AuthFailed),
        ("remote: HTTP Basic: Access denied", ErrorCode::AuthFailed),
        ("git@example.com: Permission denied (publickey).", ErrorCode::AuthFailed),
        ("Please commit your changes or stash them before you merge.", ErrorCode::LocalOverwrite),
        ("error: The branch 'dev' is not fully merged.", ErrorCode::DeleteBranchUnmerged),
        ("error: remote origin already exists.", ErrorCode::RemoteAlreadyExists),
        ("fatal: 'nowhere' does not appear to be a git repository", ErrorCode::NotARepository),
        ("remote: Repository not found.", ErrorCode::RepositoryNotFound),
        ("fatal: refusing to merge unrelated histories", ErrorCode::PullUnrelatedHistory),
        ("*** Please tell me who you are.", ErrorCode::MissingUser),
        ("something else entirely", ErrorCode::UnexpectedError),
    ];
    for (stderr, expected) in cases {
        assert_eq!(classify("", stderr), expected, "stderr: {stderr}");
    }
}

#[test]
fn test_classify_conflict_reads_stdout() {
    let stdout = "Auto-merging flows.json\nCONFLICT (content): Merge conflict in flows.json\n";
    assert_eq!(classify(stdout, "Automatic merge failed"), ErrorCode::MergeConflict);
    assert_eq!(classify("", stdout), ErrorCode::UnexpectedError);
}

#[test]
fn test_classify_first_rule_wins() {
    let stderr = "Host key verification failed.\nfatal: Could not read from remote repository.";
    assert_eq!(classify("", stderr), ErrorCode::HostKeyVerificationFailed);
}

#[test]
fn test_classify_push_non_fast_forward() {
    let stdout = "To example.com:repo.git\n!\trefs/heads/main:refs/heads/main\t[rejected] (non-fast-forward)\nDone\n";
    assert_eq!(classify_push(stdout, "error: failed to push some refs"), ErrorCode::PushFailed);
    assert_eq!(
        classify_push(stdout, "fatal: could not read Username"),
        ErrorCode::AuthFailed
    );
    assert_eq!(classify_push("Done\n", "error"), ErrorCode::UnexpectedError);
}

#[test]
fn test_into_result_carries_remote() {
    let request = GitRequest::new("/tmp", ["fetch", "upstream"]).network(Some("upstream"));
    let err = GitOutput::failed(128, "", "fatal: Authentication failed for 'https://x'\n")
        .into_result(&request)
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::AuthFailed);
    assert_eq!(err.remote(), Some("upstream"));
    assert_eq!(err.message(), "fatal: Authentication failed for 'https://x'");
}

#[test]
fn test_into_result_push_classifier() {
    let request = GitRequest::new("/tmp", ["push", "origin"])
        .network(Some("origin"))
        .classifier(Classifier::Push);
    let err = GitOutput::failed(1, "!\trefs/heads/a:refs/heads/a\t[rejected] (non-fast-forward)\n", "")
        .into_result(&request)
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::PushFailed);
}

// --- facade over the scripted runner ---

#[tokio::test]
async fn test_commit_count_without_head_is_zero() {
    let (fake, git) = scripted();
    fake.on(
        ["rev-list"],
        [GitOutput::failed(
            128,
            "",
            "fatal: ambiguous argument 'HEAD': unknown revision or path not in the working tree.",
        )],
    );
    assert_eq!(git.commit_count(Path::new("/p")).await.unwrap(), 0);

    fake.on(["rev-list"], [GitOutput::ok("7\n")]);
    assert_eq!(git.commit_count(Path::new("/p")).await.unwrap(), 7);
}

#[tokio::test]
async fn test_upstream_missing_is_none() {
    let (fake, git) = scripted();
    fake.on(
        ["rev-parse", "--abbrev-ref"],
        [GitOutput::failed(128, "", "fatal: no upstream configured for branch 'main'")],
    );
    assert_eq!(git.upstream(Path::new("/p")).await.unwrap(), None);

    fake.on(["rev-parse", "--abbrev-ref"], [GitOutput::ok("origin/main\n")]);
    assert_eq!(
        git.upstream(Path::new("/p")).await.unwrap().as_deref(),
        Some("origin/main")
    );
}

#[tokio::test]
async fn test_stage_all_and_listed() {
    let (fake, git) = scripted();
    git.stage(Path::new("/p"), &[]).await.unwrap();
    git.stage(Path::new("/p"), &["flows.json".to_string()]).await.unwrap();
    assert_eq!(
        fake.calls(),
        vec![vec!["add", "-A"], vec!["add", "--", "flows.json"]]
    );
}

#[tokio::test]
async fn test_commit_passes_identity() {
    let (fake, git) = scripted();
    let user = GitUser {
        name: "Ada".to_string(),
        email: "ada@example.com".to_string(),
    };
    git.commit(Path::new("/p"), "msg", Some(&user)).await.unwrap();
    let request = &fake.requests()[0];
    assert_eq!(
        request.args,
        vec!["-c", "user.name=Ada", "-c", "user.email=ada@example.com", "commit", "-m", "msg"]
    );
}

#[tokio::test]
async fn test_check_install_rejects_old_git() {
    let (fake, git) = scripted();
    fake.on(["--version"], [GitOutput::ok("git version 1.9.5\n")]);
    let err = git.check_install(Path::new("/")).await.unwrap_err();
    assert!(matches!(
        err,
        VcsError::Git(ref e) if matches!(**e, GitError::VersionTooOld { .. })
    ));

    fake.on(["--version"], [GitOutput::ok("git version 2.43.0\n")]);
    fake.on(["config", "--global", "user.name"], [GitOutput::ok("Ada\n")]);
    fake.on(["config", "--global", "user.email"], [GitOutput::ok("ada@example.com\n")]);
    let info = git.check_install(Path::new("/")).await.unwrap();
    assert_eq!(info.version, "2.43.0");
    assert_eq!(info.user.map(|u| u.name).as_deref(), Some("Ada"));
}

#[tokio::test]
async fn test_push_argv_and_failure_code() {
    let (fake, git) = scripted();
    fake.on(
        ["push"],
        [GitOutput::failed(
            1,
            "To x\n!\trefs/heads/main:refs/heads/main\t[rejected] (non-fast-forward)\nDone\n",
            "error: failed to push some refs",
        )],
    );
    let options = PushOptions {
        remote: "origin",
        branch: Some("main"),
        set_upstream: true,
    };
    let err = git.push(Path::new("/p"), &options, None).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::PushFailed);
    assert_eq!(err.remote(), Some("origin"));
    assert_eq!(
        fake.calls()[0],
        vec!["push", "-u", "origin", "HEAD:main", "--porcelain"]
    );
}

#[tokio::test]
async fn test_pull_conflict_code() {
    let (fake, git) = scripted();
    fake.on(
        ["pull"],
        [GitOutput::failed(1, "CONFLICT (content): Merge conflict in flows.json\n", "")],
    );
    let options = PullOptions {
        remote: Some("origin"),
        branch: Some("main"),
        ..PullOptions::default()
    };
    let err = git.pull(Path::new("/p"), &options, None).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::MergeConflict);
    assert_eq!(fake.calls()[0], vec!["pull", "--no-rebase", "origin", "main"]);
}

#[tokio::test]
async fn test_remote_branch_delete_unsupported() {
    let (fake, git) = scripted();
    assert!(git.delete_branch(Path::new("/p"), "origin/x", true, false).await.is_err());
    assert!(fake.calls().is_empty());
}

#[tokio::test]
async fn test_credentials_relayed_to_git() {
    let root = temp_dir();
    let fake = ScriptedGit::shared();
    fake.prompts(["Username for 'https://example.com': ", "Password for 'https://alice@example.com': "]);
    let git = Git::new(
        fake.clone(),
        AuthBroker::new("/usr/bin/flowvcs").with_temp_root(root.path()),
    );

    git.fetch(Path::new("/p"), "origin", Some(&creds())).await.unwrap();
    assert_eq!(fake.answers(), vec!["alice", "s3cret"]);

    let request = &fake.requests()[0];
    assert!(request.network);
    assert!(request.env.contains_key("GIT_ASKPASS"));
    assert!(request.env.values().all(|v| !v.contains("s3cret")));
    assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_failed_clones_leave_no_endpoints() {
    let root = temp_dir();
    let fake = ScriptedGit::shared();
    fake.on(
        ["clone"],
        [GitOutput::failed(128, "", "fatal: Authentication failed for 'https://example.com/r.git'")],
    );
    let git = Git::new(
        fake.clone(),
        AuthBroker::new("/usr/bin/flowvcs").with_temp_root(root.path()),
    );
    let options = CloneOptions {
        url: "https://example.com/r.git",
        remote_name: None,
        branch: None,
    };

    for _ in 0..100 {
        let err = git
            .clone_repo(Path::new("/p"), &options, Some(&creds()))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::AuthFailed);
        assert_eq!(err.remote(), Some("origin"));
    }
    assert_eq!(fake.count("clone"), 100);
    assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
}

// --- installed git ---

fn shell_git() -> Option<Git> {
    ShellGit::locate("git").ok()?;
    Some(Git::new(
        Arc::new(ShellGit::builder().build()),
        AuthBroker::new("/usr/bin/flowvcs"),
    ))
}

fn user() -> GitUser {
    GitUser {
        name: "Test".to_string(),
        email: "test@example.com".to_string(),
    }
}

#[tokio::test]
async fn test_real_git_lifecycle() {
    let Some(git) = shell_git() else {
        return;
    };
    let dir = temp_dir();
    let path = dir.path();

    git.init(path).await.unwrap();
    let status = git.status(path).await.unwrap();
    assert_eq!(status.commits.total, 0);
    assert!(status.files.is_empty());
    assert!(!status.merging);

    std::fs::write(path.join("flows.json"), "[]").unwrap();
    let status = git.status(path).await.unwrap();
    assert_eq!(
        status.files["flows.json"].status.as_deref(),
        Some("??")
    );

    git.stage(path, &["flows.json".to_string()]).await.unwrap();
    assert!(git.status(path).await.unwrap().has_staged_changes());
    git.commit(path, "Create project", Some(&user())).await.unwrap();

    let log = git.commits(path, None, None).await.unwrap();
    assert_eq!((log.count, log.total), (1, 1));
    assert_eq!(log.commits[0].subject, "Create project");
    assert!(log.commits[0].parents.is_empty());

    assert_eq!(git.show_file(path, "flows.json", "HEAD").await.unwrap(), "[]");
    assert_eq!(git.upstream(path).await.unwrap(), None);
    assert!(!git.is_merging(path).await.unwrap());
}

#[tokio::test]
async fn test_real_git_remote_errors() {
    let Some(git) = shell_git() else {
        return;
    };
    let dir = temp_dir();
    git.init(dir.path()).await.unwrap();
    git.add_remote(dir.path(), "origin", "https://example.invalid/r.git")
        .await
        .unwrap();
    let err = git
        .add_remote(dir.path(), "origin", "https://example.invalid/other.git")
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::RemoteAlreadyExists);

    let remotes = git.remotes(dir.path()).await.unwrap();
    assert_eq!(
        remotes["origin"].fetch.as_deref(),
        Some("https://example.invalid/r.git")
    );

    let outside = temp_dir();
    let err = git.remotes(outside.path()).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::NotARepository);
}

#[tokio::test]
async fn test_clone_argv_ends_options() {
    let (fake, git) = scripted();
    let dir = temp_dir();
    let options = CloneOptions {
        url: "https://example.com/r.git",
        remote_name: Some("up"),
        branch: Some("dev"),
    };
    git.clone_repo(dir.path(), &options, None).await.unwrap();
    assert_eq!(
        fake.calls()[0],
        vec![
            "clone",
            "-o",
            "up",
            "-b",
            "dev",
            "--end-of-options",
            "https://example.com/r.git",
            "."
        ]
    );

    let options = CloneOptions {
        url: "--upload-pack=touch /tmp/owned",
        remote_name: None,
        branch: None,
    };
    let err = git.clone_repo(dir.path(), &options, None).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::Forbidden);
    assert_eq!(fake.count("clone"), 1);
}

#[tokio::test]
async fn test_real_git_rejects_option_like_values() {
    let Some(git) = shell_git() else {
        return;
    };
    let dir = temp_dir();
    let path = dir.path();
    git.init(path).await.unwrap();
    std::fs::write(path.join("flows.json"), "[]").unwrap();
    git.stage(path, &[]).await.unwrap();
    git.commit(path, "Create project", Some(&user())).await.unwrap();

    let injected = path.join("injected.txt");
    let sha = format!("--output={}", injected.display());
    let err = git.show_commit(path, &sha).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::Forbidden);
    let err = git.commits(path, None, Some(&sha)).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::Forbidden);
    let err = git.show_file(path, "flows.json", &sha).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::Forbidden);
    assert!(!injected.exists());

    // The guarded forms still work for ordinary values.
    let head = git.commits(path, None, None).await.unwrap().commits[0].sha.clone();
    assert!(git.show_commit(path, &head).await.unwrap().contains("Create project"));
    assert_eq!(git.commits(path, None, Some(&head)).await.unwrap().count, 1);
    git.checkout_branch(path, "feature", true).await.unwrap();
    let err = git.checkout_branch(path, "-f", false).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::Forbidden);
    git.add_remote(path, "origin", "https://example.invalid/r.git")
        .await
        .unwrap();
    git.remove_remote(path, "origin").await.unwrap();
    let err = git.delete_branch(path, "--all", false, true).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::Forbidden);
}
