// flowvcs: Git-backed project storage for flow hosts
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

use super::{KeyLookup, RemoteAuth, SshKeyDir};
use crate::error::ErrorCode;

#[test]
fn test_project_key_preferred_over_home() {
    let root = tempfile::tempdir().unwrap();
    let home = tempfile::tempdir().unwrap();
    let keys = SshKeyDir::new(root.path()).with_home_ssh(Some(home.path().to_path_buf()));
    std::fs::create_dir_all(keys.dir()).unwrap();
    std::fs::write(keys.dir().join("alice_deploy"), "key").unwrap();
    std::fs::write(home.path().join("deploy"), "key").unwrap();
    std::fs::write(home.path().join("id_ed25519"), "key").unwrap();

    assert_eq!(
        keys.key_path("alice", "deploy").unwrap(),
        keys.dir().join("alice_deploy")
    );
    assert_eq!(
        keys.key_path("bob", "deploy").unwrap(),
        home.path().join("deploy")
    );
    assert_eq!(
        keys.key_path("alice", "id_ed25519").unwrap(),
        home.path().join("id_ed25519")
    );
}

#[test]
fn test_unknown_or_unsafe_keys_rejected() {
    let root = tempfile::tempdir().unwrap();
    let keys = SshKeyDir::new(root.path()).with_home_ssh(None);
    for name in ["missing", "../alice_deploy", ".hidden", ""] {
        let err = keys.key_path("alice", name).unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound, "{name}");
    }
}

#[test]
fn test_remote_auth_parses_both_shapes() {
    let basic: RemoteAuth =
        serde_json::from_str(r#"{"username":"u","password":"p"}"#).unwrap();
    assert!(matches!(basic, RemoteAuth::Basic { .. }));
    assert!(!format!("{basic:?}").contains("\"p\""));

    let key: RemoteAuth =
        serde_json::from_str(r#"{"keyFile":"deploy","passphrase":"pp"}"#).unwrap();
    assert!(!format!("{key:?}").contains("pp"));
    let root = tempfile::tempdir().unwrap();
    let keys = SshKeyDir::new(root.path()).with_home_ssh(None);
    assert!(key.resolve(&keys, "alice").is_err());
    let creds = basic.resolve(&keys, "alice").unwrap();
    assert_eq!(creds.answer("Password:"), "p");
}
