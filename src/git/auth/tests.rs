// flowvcs: Git-backed project storage for flow hosts
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

use std::path::{Path, PathBuf};

use super::broker::ssh_command;
use super::helper::relay_prompt;
use super::{AuthBroker, AuthKind, Credentials, ENV_AUTH_SOCK, ENV_KEY_FILE};

fn basic() -> Credentials {
    Credentials::Basic {
        username: "alice".to_string(),
        password: "s3cret".to_string(),
    }
}

fn ssh_key() -> Credentials {
    Credentials::SshKey {
        key_path: PathBuf::from("/keys/id_ed25519"),
        passphrase: Some("open sesame".to_string()),
    }
}

fn entries(dir: &Path) -> usize {
    std::fs::read_dir(dir).unwrap().count()
}

#[test]
fn test_basic_answers() {
    let creds = basic();
    assert_eq!(creds.kind(), AuthKind::Password);
    assert_eq!(creds.answer("Username for 'https://example.com': "), "alice");
    assert_eq!(
        creds.answer("Password for 'https://alice@example.com': "),
        "s3cret"
    );
    assert_eq!(creds.answer("Something else"), "");
    assert_eq!(
        creds.answer("Password for 'https://username@example.com': "),
        "s3cret"
    );
    assert_eq!(
        creds.answer("Username for 'https://example.com/password-store': "),
        "alice"
    );
    assert_eq!(creds.answer("alice@example.com's password: "), "s3cret");
    assert_eq!(
        creds.answer("Are you sure you want to continue connecting (yes/no)? "),
        "no"
    );
}

#[test]
fn test_ssh_answers() {
    let creds = ssh_key();
    assert_eq!(creds.kind(), AuthKind::Key);
    assert_eq!(
        creds.answer("Enter passphrase for key '/keys/id_ed25519': "),
        "open sesame"
    );
    assert_eq!(
        creds.answer("Are you sure you want to continue connecting (yes/no/[fingerprint])? "),
        "no"
    );
    assert_eq!(creds.answer("Password:"), "");
}

#[test]
fn test_debug_hides_secrets() {
    let text = format!("{:?} {:?}", basic(), ssh_key());
    assert!(!text.contains("s3cret"));
    assert!(!text.contains("open sesame"));
    assert!(text.contains("alice"));
}

#[test]
fn test_ssh_command_quotes_key() {
    insta::assert_snapshot!(
        ssh_command(Path::new("/keys/bob's key")),
        @r"ssh -i '/keys/bob'\''s key' -F /dev/null -o IdentitiesOnly=yes"
    );
}

#[tokio::test]
async fn test_session_answers_prompts_over_socket() {
    let root = tempfile::tempdir().unwrap();
    let broker = AuthBroker::new("/usr/bin/flowvcs").with_temp_root(root.path());
    let session = broker.open(&basic()).unwrap();

    let socket = session.socket_path().to_path_buf();
    assert_eq!(
        session.env().get(ENV_AUTH_SOCK).map(String::as_str),
        socket.to_str()
    );
    assert!(session.env().contains_key("GIT_ASKPASS"));
    assert!(!session.env().contains_key("GIT_SSH_COMMAND"));
    assert!(
        session.env().values().all(|v| !v.contains("s3cret")),
        "secrets must never reach the environment"
    );

    let user = relay_prompt(&socket, "Username for 'https://example.com': ")
        .await
        .unwrap();
    let pass = relay_prompt(&socket, "Password for 'https://alice@example.com': ")
        .await
        .unwrap();
    assert_eq!((user.as_str(), pass.as_str()), ("alice", "s3cret"));

    session.close().await;
    assert_eq!(entries(root.path()), 0);
    assert!(relay_prompt(&socket, "Password").await.is_err());
}

#[tokio::test]
async fn test_ssh_session_env() {
    let root = tempfile::tempdir().unwrap();
    let broker = AuthBroker::new("/usr/bin/flowvcs").with_temp_root(root.path());
    let session = broker.open(&ssh_key()).unwrap();
    let env = session.env();

    assert_eq!(env.get("DISPLAY").map(String::as_str), Some("dummy:0"));
    assert_eq!(env.get(ENV_KEY_FILE).map(String::as_str), Some("/keys/id_ed25519"));
    assert!(env["GIT_SSH_COMMAND"].contains("-F /dev/null"));
    for script in ["SSH_ASKPASS", "GIT_SSH", "GIT_ASKPASS"] {
        assert!(Path::new(&env[script]).exists(), "{script} missing");
    }
    assert!(env.values().all(|v| !v.contains("open sesame")));

    let passphrase = relay_prompt(
        session.socket_path(),
        "Enter passphrase for key '/keys/id_ed25519': ",
    )
    .await
    .unwrap();
    assert_eq!(passphrase, "open sesame");
    session.close().await;
}

#[tokio::test]
async fn test_dropped_session_removes_endpoint() {
    let root = tempfile::tempdir().unwrap();
    let broker = AuthBroker::new("/usr/bin/flowvcs").with_temp_root(root.path());

    for _ in 0..10 {
        let session = broker.open(&basic()).unwrap();
        assert_eq!(entries(root.path()), 1);
        drop(session);
    }
    assert_eq!(entries(root.path()), 0);
}

#[tokio::test]
async fn test_sessions_never_share_endpoints() {
    let root = tempfile::tempdir().unwrap();
    let broker = AuthBroker::new("/usr/bin/flowvcs").with_temp_root(root.path());
    let a = broker.open(&basic()).unwrap();
    let b = broker.open(&basic()).unwrap();
    assert_ne!(a.socket_path(), b.socket_path());
    a.close().await;
    b.close().await;
}
