// flowvcs: Git-backed project storage for flow hosts
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

use futures_util::future::BoxFuture;
use serde_json::json;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

use super::host::{EventSink, FlowRuntime, ProjectEvent};
use super::settings::{MemorySettings, ProjectSettings, ProjectsSettings};
use super::{CloneSource, CreateProject, Host, ManagerOptions, ProjectManager, Workflow};
use crate::error::{ErrorCode, VcsError, VcsResult};
use crate::git::fake::ScriptedGit;
use crate::git::{AuthBroker, Git, GitOutput};
use crate::keyring::SshKeyDir;
use crate::project::{Caller, CredentialSecret, ProjectUpdate, PullRequest, PushRequest, Resolution};

const PACKAGE: &str = r#"{
  "name": "demo",
  "description": "",
  "version": "0.0.1",
  "dependencies": {},
  "flows": { "flowFile": "flows.json" }
}"#;

const MERGE_HEAD: [&str; 4] = ["rev-parse", "-q", "--verify", "MERGE_HEAD"];

/// Records runtime steps and events in one ordered log.
#[derive(Default)]
struct Recorder {
    log: Mutex<Vec<String>>,
    fail_load: AtomicBool,
    delay: Mutex<Duration>,
}

impl Recorder {
    fn push(&self, entry: impl Into<String>) {
        self.log.lock().unwrap().push(entry.into());
    }

    fn log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    fn clear(&self) {
        self.log.lock().unwrap().clear();
    }

    fn step(&self, name: &'static str) -> BoxFuture<'_, VcsResult<()>> {
        Box::pin(async move {
            self.push(name);
            let delay = *self.delay.lock().unwrap();
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            Ok(())
        })
    }
}

impl FlowRuntime for Recorder {
    fn stop(&self) -> BoxFuture<'_, VcsResult<()>> {
        self.step("stop")
    }

    fn clear_context(&self) -> BoxFuture<'_, VcsResult<()>> {
        self.step("clear-context")
    }

    fn load(&self, _force: bool) -> BoxFuture<'_, VcsResult<()>> {
        Box::pin(async move {
            self.step("load").await?;
            if self.fail_load.load(Ordering::SeqCst) {
                return Err(VcsError::other("flows failed to parse"));
            }
            Ok(())
        })
    }

    fn start(&self) -> BoxFuture<'_, VcsResult<()>> {
        self.step("start")
    }

    fn set_credential_secret(&self, secret: Option<String>) -> BoxFuture<'_, VcsResult<()>> {
        self.push(if secret.is_some() { "secret:some" } else { "secret:none" });
        Box::pin(async { Ok(()) })
    }

    fn clear_credentials(&self) -> BoxFuture<'_, VcsResult<()>> {
        self.step("clear-credentials")
    }

    fn save_credentials(&self) -> BoxFuture<'_, VcsResult<()>> {
        self.step("save-credentials")
    }
}

impl EventSink for Recorder {
    fn emit(&self, event: ProjectEvent) {
        self.push(format!("notify:{}:{}", event.project, event.action));
    }
}

struct Fixture {
    root: TempDir,
    _auth: TempDir,
    fake: Arc<ScriptedGit>,
    recorder: Arc<Recorder>,
    settings: Arc<MemorySettings>,
    manager: ProjectManager,
}

impl Fixture {
    fn new(workflow: Workflow, settings: ProjectsSettings) -> Self {
        let root = tempfile::tempdir().unwrap();
        let auth = tempfile::tempdir().unwrap();
        let fake = ScriptedGit::shared();
        fake.on(["rev-list"], [GitOutput::ok("3\n")]);
        fake.on(MERGE_HEAD, [GitOutput::failed(1, "", "")]);
        let recorder = Arc::new(Recorder::default());
        let settings = Arc::new(MemorySettings::new(settings));
        let host = Host {
            settings: settings.clone(),
            runtime: recorder.clone(),
            events: recorder.clone(),
            keys: Arc::new(SshKeyDir::new(root.path())),
        };
        let git = Git::new(
            fake.clone(),
            AuthBroker::new("/usr/bin/flowvcs").with_temp_root(auth.path()),
        );
        let options = ManagerOptions::builder()
            .root(root.path())
            .with_workflow(workflow)
            .build();
        Self {
            manager: ProjectManager::new(options, git, host),
            root,
            _auth: auth,
            fake,
            recorder,
            settings,
        }
    }

    fn manual() -> Self {
        Self::new(Workflow::Manual, ProjectsSettings::default())
    }

    fn seed(&self, name: &str) {
        seed(&self.root.path().join(name));
    }

    async fn activate(&self, name: &str) {
        self.seed(name);
        self.manager
            .set_active(&Caller::default(), name, false)
            .await
            .unwrap();
        self.recorder.clear();
    }
}

fn seed(dir: &Path) {
    std::fs::create_dir_all(dir.join(".git")).unwrap();
    std::fs::write(dir.join("package.json"), PACKAGE).unwrap();
    std::fs::write(dir.join("flows.json"), r#"[{"id":"n1"}]"#).unwrap();
}

fn caller() -> Caller {
    Caller::default()
}

// --- reload sequence ---

#[tokio::test]
async fn test_set_active_reload_order() {
    let fx = Fixture::manual();
    fx.seed("alpha");
    fx.manager.set_active(&caller(), "alpha", false).await.unwrap();

    assert_eq!(
        fx.recorder.log(),
        ["secret:none", "stop", "load", "start", "notify:alpha:loaded"]
    );
    assert_eq!(fx.manager.active_name().as_deref(), Some("alpha"));
    assert_eq!(fx.settings.snapshot().active_project.as_deref(), Some("alpha"));
}

#[tokio::test]
async fn test_clear_context_runs_between_stop_and_load() {
    let fx = Fixture::manual();
    fx.seed("alpha");
    fx.manager.set_active(&caller(), "alpha", true).await.unwrap();
    assert_eq!(
        fx.recorder.log()[1..4],
        ["stop", "clear-context", "load"]
    );
}

#[tokio::test]
async fn test_load_failure_still_notifies() {
    let fx = Fixture::manual();
    fx.seed("alpha");
    fx.recorder.fail_load.store(true, Ordering::SeqCst);

    let err = fx
        .manager
        .set_active(&caller(), "alpha", false)
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::UnexpectedError);
    assert_eq!(
        fx.recorder.log(),
        ["secret:none", "stop", "load", "notify:alpha:loaded"]
    );
}

#[tokio::test]
async fn test_activations_do_not_interleave() {
    let fx = Fixture::manual();
    fx.seed("alpha");
    fx.seed("beta");
    *fx.recorder.delay.lock().unwrap() = Duration::from_millis(10);

    let who = caller();
    let (a, b) = tokio::join!(
        fx.manager.set_active(&who, "alpha", false),
        fx.manager.set_active(&who, "beta", false),
    );
    a.unwrap();
    b.unwrap();

    let steps: Vec<String> = fx
        .recorder
        .log()
        .into_iter()
        .filter(|s| !s.starts_with("secret:"))
        .collect();
    assert_eq!(steps.len(), 8);
    for chunk in steps.chunks(4) {
        assert_eq!(chunk[..3], ["stop", "load", "start"]);
        assert!(chunk[3].starts_with("notify:"));
    }
    let last = steps[7].trim_start_matches("notify:").trim_end_matches(":loaded");
    assert_eq!(fx.manager.active_name().as_deref(), Some(last));
}

// --- registry ---

#[tokio::test]
async fn test_list_skips_hidden_entries() {
    let fx = Fixture::manual();
    fx.seed("beta");
    fx.seed("Alpha");
    std::fs::create_dir(fx.root.path().join(".sshkeys")).unwrap();
    std::fs::write(fx.root.path().join("notes.txt"), "").unwrap();
    assert_eq!(fx.manager.list().await.unwrap(), ["Alpha", "beta"]);
}

#[tokio::test]
async fn test_invalid_names_are_rejected() {
    let fx = Fixture::manual();
    for name in ["", "../escape", "a/b", "a\\b", ".hidden", "x..y", "tab\there"] {
        let err = fx.manager.project_path(name).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidProjectName, "{name:?}");
    }
    let err = fx
        .manager
        .set_active(&caller(), "ghost", false)
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::NotFound);
    assert!(fx.recorder.log().is_empty());
}

#[tokio::test]
async fn test_delete_active_project_is_refused() {
    let mut projects = BTreeMap::new();
    projects.insert("beta".to_string(), ProjectSettings::default());
    let fx = Fixture::new(
        Workflow::Manual,
        ProjectsSettings {
            active_project: None,
            projects,
        },
    );
    fx.activate("alpha").await;
    fx.seed("beta");

    let err = fx.manager.delete(&caller(), "alpha").await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::CannotDeleteActiveProject);
    assert!(fx.root.path().join("alpha/flows.json").exists());

    fx.manager.delete(&caller(), "beta").await.unwrap();
    assert!(!fx.root.path().join("beta").exists());
    assert!(!fx.settings.snapshot().projects.contains_key("beta"));

    let err = fx.manager.delete(&caller(), "beta").await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::NotFound);
}

#[tokio::test]
async fn test_inactive_project_never_reaches_git() {
    let fx = Fixture::manual();
    fx.activate("alpha").await;
    fx.seed("beta");
    let before = fx.fake.calls().len();

    let errors = [
        fx.manager.status(&caller(), "beta", true).await.unwrap_err(),
        fx.manager.stage(&caller(), "beta", &[]).await.unwrap_err(),
        fx.manager.commit(&caller(), "beta", "x").await.unwrap_err(),
        fx.manager
            .pull(&caller(), "beta", &PullRequest::default())
            .await
            .unwrap_err(),
        fx.manager.get(&caller(), "beta").await.unwrap_err(),
    ];
    for err in errors {
        assert_eq!(err.code(), ErrorCode::CannotOperateOnInactiveProject);
    }
    assert_eq!(fx.fake.calls().len(), before);
}

// --- create and update ---

fn script_init(fake: &ScriptedGit) {
    fake.effect(["init"], GitOutput::ok(""), |request| {
        std::fs::create_dir_all(request.cwd.join(".git")).unwrap();
    });
}

#[tokio::test]
async fn test_create_unencrypted_project_then_set_secret() {
    let fx = Fixture::manual();
    script_init(&fx.fake);
    let request = CreateProject {
        name: "demo".to_string(),
        summary: "A demo".to_string(),
        credential_secret: CredentialSecret::Disabled,
        ..CreateProject::default()
    };

    let info = fx.manager.create(&caller(), &request).await.unwrap();
    assert!(!info.settings.credentials_encrypted);
    assert_eq!(info.files.flow.as_deref(), Some("flows.json"));
    assert_eq!(
        std::fs::read_to_string(fx.root.path().join("demo/flows.json")).unwrap(),
        "[]\n"
    );
    assert_eq!(
        fx.recorder.log(),
        ["secret:none", "stop", "load", "start", "notify:demo:loaded"]
    );
    let settings = fx.settings.snapshot();
    assert_eq!(settings.active_project.as_deref(), Some("demo"));
    assert_eq!(settings.secret_for("demo"), CredentialSecret::Disabled);

    fx.recorder.clear();
    let update = ProjectUpdate {
        credential_secret: Some("k3y".to_string()),
        ..ProjectUpdate::default()
    };
    fx.manager.update(&caller(), "demo", &update).await.unwrap();
    assert_eq!(fx.recorder.log(), ["secret:some", "save-credentials"]);
    assert_eq!(
        fx.settings.snapshot().secret_for("demo"),
        CredentialSecret::Custom("k3y".to_string())
    );
    let info = fx.manager.get(&caller(), "demo").await.unwrap();
    assert!(info.settings.credentials_encrypted);
}

#[tokio::test]
async fn test_update_after_invalid_secret_reloads() {
    let fx = Fixture::manual();
    fx.activate("alpha").await;
    fx.manager
        .active_project()
        .unwrap()
        .set_credential_secret_invalid(true);

    let update = ProjectUpdate {
        credential_secret: Some("fresh".to_string()),
        ..ProjectUpdate::default()
    };
    fx.manager.update(&caller(), "alpha", &update).await.unwrap();
    assert_eq!(
        fx.recorder.log(),
        ["secret:some", "stop", "load", "start", "notify:alpha:updated"]
    );
}

#[tokio::test]
async fn test_create_existing_project_fails() {
    let fx = Fixture::manual();
    fx.seed("demo");
    let request = CreateProject {
        name: "demo".to_string(),
        ..CreateProject::default()
    };
    let err = fx.manager.create(&caller(), &request).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::ProjectExists);
}

#[tokio::test]
async fn test_migrate_needs_no_active_project() {
    let fx = Fixture::manual();
    fx.activate("alpha").await;
    let request = CreateProject {
        name: "demo".to_string(),
        migrate_files: true,
        ..CreateProject::default()
    };
    let err = fx.manager.create(&caller(), &request).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::UnexpectedError);
    assert!(!fx.root.path().join("demo").exists());
}

#[tokio::test]
async fn test_failed_clone_is_cleaned_up() {
    let fx = Fixture::manual();
    fx.fake.on(
        ["clone"],
        [GitOutput::failed(
            128,
            "",
            "remote: Repository not found.\nfatal: repository 'https://example.com/missing.git/' not found",
        )],
    );
    let request = CreateProject {
        name: "demo".to_string(),
        git: Some(CloneSource {
            url: "https://example.com/missing.git".to_string(),
            ..CloneSource::default()
        }),
        ..CreateProject::default()
    };

    let err = fx.manager.create(&caller(), &request).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::RepositoryNotFound);
    assert!(!fx.root.path().join("demo").exists());
    assert!(!fx.settings.snapshot().projects.contains_key("demo"));
    assert!(fx.manager.active_project().is_none());
}

// --- version control through the manager ---

#[tokio::test]
async fn test_pull_conflict_then_commit_reloads_once() {
    let fx = Fixture::manual();
    fx.fake.on(
        MERGE_HEAD,
        [
            GitOutput::failed(1, "", ""),
            GitOutput::ok("abc\n"),
            GitOutput::failed(1, "", ""),
        ],
    );
    fx.fake.on(
        ["pull"],
        [GitOutput::failed(
            1,
            "CONFLICT (content): Merge conflict in flows.json\n",
            "Automatic merge failed; fix conflicts and then commit the result.",
        )],
    );
    fx.activate("alpha").await;

    let request = PullRequest {
        remote_branch: Some("origin/main".to_string()),
        ..PullRequest::default()
    };
    let outcome = fx.manager.pull(&caller(), "alpha", &request).await.unwrap();
    assert!(outcome.merge_conflict);
    assert!(fx.recorder.log().is_empty());
    let err = fx.manager.get_flows().await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::MergeConflict);

    fx.manager
        .resolve_merge(&caller(), "alpha", "flows.json", &Resolution::KeepLocal)
        .await
        .unwrap();
    fx.manager.commit(&caller(), "alpha", "Merge").await.unwrap();
    assert_eq!(
        fx.recorder.log(),
        ["stop", "load", "start", "notify:alpha:merge-complete"]
    );
}

#[tokio::test]
async fn test_clean_pull_reloads() {
    let fx = Fixture::manual();
    fx.activate("alpha").await;
    let outcome = fx
        .manager
        .pull(&caller(), "alpha", &PullRequest::default())
        .await
        .unwrap();
    assert!(!outcome.merge_conflict);
    assert_eq!(fx.recorder.log().last().unwrap(), "notify:alpha:pull");
}

#[tokio::test]
async fn test_push_rejected_is_push_failed() {
    let fx = Fixture::manual();
    fx.fake.on(
        ["push"],
        [GitOutput::failed(
            1,
            "To https://example.com/r.git\n!\trefs/heads/main:refs/heads/main\t[rejected] (non-fast-forward)\nDone\n",
            "error: failed to push some refs",
        )],
    );
    fx.activate("alpha").await;
    let err = fx
        .manager
        .push(&caller(), "alpha", &PushRequest::default())
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::PushFailed);
    assert!(fx.recorder.log().is_empty());
}

#[tokio::test]
async fn test_revert_reloads_only_for_role_files() {
    let fx = Fixture::manual();
    fx.activate("alpha").await;

    fx.manager
        .revert_file(&caller(), "alpha", "notes.txt")
        .await
        .unwrap();
    assert!(fx.recorder.log().is_empty());

    fx.manager
        .revert_file(&caller(), "alpha", "flows.json")
        .await
        .unwrap();
    assert_eq!(fx.recorder.log().last().unwrap(), "notify:alpha:revert");
}

#[tokio::test]
async fn test_branch_change_and_abort_reload() {
    let fx = Fixture::manual();
    fx.activate("alpha").await;
    fx.manager
        .set_branch(&caller(), "alpha", "feature", true)
        .await
        .unwrap();
    assert_eq!(
        fx.recorder.log().last().unwrap(),
        "notify:alpha:change-branch"
    );

    fx.fake.on(MERGE_HEAD, [GitOutput::ok("abc\n"), GitOutput::failed(1, "", "")]);
    fx.manager.abort_merge(&caller(), "alpha").await.unwrap();
    assert_eq!(fx.recorder.log().last().unwrap(), "notify:alpha:merge-abort");
}

// --- workflow ---

#[tokio::test]
async fn test_auto_workflow_commits_saved_flows() {
    let fx = Fixture::new(Workflow::Auto, ProjectsSettings::default());
    fx.fake.on(["status"], [GitOutput::ok("## main\nM  flows.json\n")]);
    fx.activate("alpha").await;

    fx.manager
        .save_flows(&caller(), &json!([{"id": "n2"}]))
        .await
        .unwrap();
    assert!(fx.fake.calls().contains(&vec![
        "add".to_string(),
        "--".to_string(),
        "flows.json".to_string()
    ]));
    assert_eq!(fx.fake.count("commit"), 1);
    assert_eq!(fx.manager.get_flows().await.unwrap(), json!([{"id": "n2"}]));
}

#[tokio::test]
async fn test_manual_workflow_only_writes() {
    let fx = Fixture::manual();
    fx.activate("alpha").await;
    fx.manager
        .save_flows(&caller(), &json!([]))
        .await
        .unwrap();
    assert_eq!(fx.fake.count("add"), 0);
    assert_eq!(fx.fake.count("commit"), 0);
    fx.manager
        .save_credentials(&json!({"n1": {"user": "x"}}))
        .await
        .unwrap();
    assert_eq!(
        fx.manager.get_credentials().await.unwrap(),
        json!({"n1": {"user": "x"}})
    );
}

#[tokio::test]
async fn test_restore_reopens_active_project_without_reload() {
    let fx = Fixture::new(
        Workflow::Manual,
        ProjectsSettings {
            active_project: Some("alpha".to_string()),
            projects: BTreeMap::new(),
        },
    );
    fx.seed("alpha");
    let project = fx.manager.restore().await.unwrap().unwrap();
    assert_eq!(project.name(), "alpha");
    assert_eq!(fx.recorder.log(), ["secret:none"]);
}
