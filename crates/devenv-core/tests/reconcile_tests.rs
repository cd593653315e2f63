//! End-to-end reconciliation against local remotes and a directory package source.

use std::fs;
use std::sync::{Arc, Mutex};

use devenv_core::{
    DirectoryPackageSource, EngineOptions, Error, ModifyOptions, PluginManifest, ReconcileObserver,
    Reconciler, ResourceKind,
};
use devenv_git::CancellationToken;
use devenv_meta::{DesiredEnvironment, PluginSpec};
use devenv_test_utils::TestEnv;
use pretty_assertions::assert_eq;

fn reconciler(env: &TestEnv) -> Reconciler {
    let source = Arc::new(DirectoryPackageSource::new(env.packages()));
    Reconciler::new(env.root(), source, EngineOptions::default()).unwrap()
}

fn desired(env: &TestEnv) -> DesiredEnvironment {
    devenv_meta::load_from_root(&env.root()).unwrap()
}

fn forced() -> ModifyOptions {
    ModifyOptions {
        force: true,
        ..ModifyOptions::default()
    }
}

fn dry_run() -> ModifyOptions {
    ModifyOptions {
        dry_run: true,
        ..ModifyOptions::default()
    }
}

/// Three plugins on `branch`, core at `core`.
fn three_plugins(env: &TestEnv, core: &str, branch: &str) {
    let a = env.remote("alpha");
    let b = env.remote("beta");
    let c = env.remote("gamma");
    write_three(env, core, branch, [a.as_path(), b.as_path(), c.as_path()]);
}

fn write_three(env: &TestEnv, core: &str, branch: &str, remotes: [&std::path::Path; 3]) {
    env.write_config(
        core,
        &[
            ("plugins/alpha", remotes[0], branch),
            ("plugins/beta", remotes[1], branch),
            ("plugins/gamma", remotes[2], branch),
        ],
    );
}

#[test]
fn fresh_environment_is_fully_installed() {
    let env = TestEnv::new();
    let remote = env.remote("alpha");
    env.write_config("1.16.3", &[("plugins/alpha", &remote, "feature-x")]);

    let report = reconciler(&env)
        .update_all(&desired(&env), ModifyOptions::default())
        .unwrap();

    assert!(report.is_success(), "{:?}", report.failed);
    assert_eq!(report.updated, vec!["Rock", "plugins/alpha"]);
    assert_eq!(fs::read_to_string(env.path("Rock/bin/Rock.dll")).unwrap(), "rock 1.16.3");
    env.assert_exists("plugins/alpha/feature.txt");
}

#[test]
fn second_update_changes_nothing() {
    let env = TestEnv::new();
    three_plugins(&env, "1.16.3", "main");
    let reconciler = reconciler(&env);
    let config = desired(&env);

    reconciler.update_all(&config, ModifyOptions::default()).unwrap();
    let again = reconciler.update_all(&config, ModifyOptions::default()).unwrap();

    assert!(again.updated.is_empty());
    assert!(again.failed.is_empty());
    assert_eq!(
        again.skipped,
        vec!["Rock", "plugins/alpha", "plugins/beta", "plugins/gamma"]
    );
}

#[test]
fn one_dirty_plugin_blocks_the_whole_batch() {
    let env = TestEnv::new();
    let remotes = [env.remote("alpha"), env.remote("beta"), env.remote("gamma")];
    let paths = [remotes[0].as_path(), remotes[1].as_path(), remotes[2].as_path()];
    write_three(&env, "1.16.3", "main", paths);
    let reconciler = reconciler(&env);
    reconciler
        .update_all(&desired(&env), ModifyOptions::default())
        .unwrap();

    write_three(&env, "1.16.3", "feature-x", paths);
    env.write_file("plugins/beta/scratch.txt", "work in progress");

    let err = reconciler
        .update_all(&desired(&env), ModifyOptions::default())
        .unwrap_err();
    match &err {
        Error::DirtyEnvironment { resources } => {
            assert_eq!(resources.len(), 1);
            assert!(resources[0].starts_with("plugins/beta"));
        }
        other => panic!("expected DirtyEnvironment, got {other:?}"),
    }
    for name in ["alpha", "beta", "gamma"] {
        env.assert_not_exists(&format!("plugins/{name}/feature.txt"));
    }
    env.assert_exists("plugins/beta/scratch.txt");

    let report = reconciler.update_all(&desired(&env), forced()).unwrap();
    assert!(report.is_success(), "{:?}", report.failed);
    assert_eq!(report.updated.len(), 3);
    env.assert_not_exists("plugins/beta/scratch.txt");
    env.assert_exists("plugins/beta/feature.txt");
}

#[test]
fn branch_change_is_applied() {
    let env = TestEnv::new();
    let remote = env.remote("alpha");
    env.write_config("1.16.3", &[("plugins/alpha", &remote, "main")]);
    let reconciler = reconciler(&env);
    reconciler
        .update_all(&desired(&env), ModifyOptions::default())
        .unwrap();
    env.assert_not_exists("plugins/alpha/feature.txt");

    env.write_config("1.16.3", &[("plugins/alpha", &remote, "feature-x")]);
    let config = desired(&env);
    let status = reconciler.status(&config);
    let plugin = status[1].as_ref().unwrap();
    assert!(!plugin.is_up_to_date);
    assert!(!plugin.is_dirty);

    let report = reconciler
        .update_plugins(&config, ModifyOptions::default())
        .unwrap();
    assert_eq!(report.updated, vec!["plugins/alpha"]);
    env.assert_exists("plugins/alpha/feature.txt");
    assert!(reconciler.status(&config)[1].as_ref().unwrap().is_up_to_date);
}

#[test]
fn core_upgrade_removes_files_of_the_old_release() {
    let env = TestEnv::new();
    env.write_config("1.16.3", &[]);
    let reconciler = reconciler(&env);
    reconciler
        .update_core(&desired(&env), ModifyOptions::default())
        .unwrap();
    env.assert_exists("Rock/bin/Legacy.dll");

    env.write_config("1.17.0", &[]);
    let report = reconciler
        .update_core(&desired(&env), ModifyOptions::default())
        .unwrap();

    assert_eq!(report.updated, vec!["Rock"]);
    env.assert_not_exists("Rock/bin/Legacy.dll");
    env.assert_exists("Rock/bin/Rock.Blocks.dll");
    assert_eq!(
        reconciler.core_installer().installed().unwrap().version,
        "1.17.0"
    );
}

#[test]
fn dry_run_plans_without_touching_disk() {
    let env = TestEnv::new();
    let remote = env.remote("alpha");
    env.write_config("1.16.3", &[("plugins/alpha", &remote, "main")]);

    let report = reconciler(&env)
        .update_all(&desired(&env), dry_run())
        .unwrap();

    assert!(report.dry_run);
    assert!(report.updated.is_empty());
    let descriptions: Vec<_> = report.planned.iter().map(|p| p.description.as_str()).collect();
    assert_eq!(descriptions[0], "install 1.16.3");
    assert!(descriptions[1].starts_with("clone "));
    assert!(descriptions[1].ends_with(" at main"));
    env.assert_not_exists("Rock");
    env.assert_not_exists("plugins/alpha");
}

#[test]
fn dry_run_still_reports_dirty_resources() {
    let env = TestEnv::new();
    env.write_file("Rock/web.config", "hand-made");
    env.write_config("1.16.3", &[]);

    let err = reconciler(&env)
        .update_all(&desired(&env), dry_run())
        .unwrap_err();
    assert!(err.is_dirty());
    assert_eq!(fs::read_to_string(env.path("Rock/web.config")).unwrap(), "hand-made");
}

#[test]
fn core_failure_skips_plugins() {
    let env = TestEnv::new();
    let remote = env.remote("alpha");
    env.write_config("9.9.9", &[("plugins/alpha", &remote, "main")]);

    let report = reconciler(&env)
        .update_all(&desired(&env), ModifyOptions::default())
        .unwrap();

    assert!(!report.is_success());
    assert_eq!(report.failed.len(), 2);
    assert_eq!(report.failed[0].kind, ResourceKind::Core);
    assert!(report.failed[0].reason.contains("9.9.9"));
    assert_eq!(report.failed[1].name, "plugins/alpha");
    assert!(report.failed[1].reason.contains("core update failed"));
    env.assert_not_exists("plugins/alpha");
}

#[test]
fn newer_manifest_fails_only_its_plugin() {
    let env = TestEnv::new();
    let a = env.remote("alpha");
    let b = env.remote("beta");
    env.write_config("1.16.3", &[("plugins/alpha", &a, "main"), ("plugins/beta", &b, "main")]);
    let reconciler = reconciler(&env);
    reconciler
        .update_all(&desired(&env), ModifyOptions::default())
        .unwrap();

    let config = desired(&env);
    let gated = reconciler.plugin_installer(&config.plugins[0]);
    fs::write(gated.manifest_path(), r#"{"lockFileVersion": 99, "versions": []}"#).unwrap();

    env.write_config(
        "1.16.3",
        &[("plugins/alpha", &a, "feature-x"), ("plugins/beta", &b, "feature-x")],
    );
    let report = reconciler
        .update_all(&desired(&env), ModifyOptions::default())
        .unwrap();

    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].name, "plugins/alpha");
    assert!(report.failed[0].reason.contains("99"));
    assert_eq!(report.updated, vec!["plugins/beta"]);
    env.assert_not_exists("plugins/alpha/feature.txt");
    env.assert_exists("plugins/beta/feature.txt");
}

#[test]
fn plugin_updates_append_to_install_history() {
    let env = TestEnv::new();
    let remote = env.remote("alpha");
    env.write_config("1.16.3", &[("plugins/alpha", &remote, "main")]);
    let reconciler = reconciler(&env);
    reconciler
        .update_all(&desired(&env), ModifyOptions::default())
        .unwrap();
    env.write_config("1.16.3", &[("plugins/alpha", &remote, "feature-x")]);
    reconciler
        .update_all(&desired(&env), ModifyOptions::default())
        .unwrap();

    let config = desired(&env);
    let installer = reconciler.plugin_installer(&config.plugins[0]);
    let manifest: PluginManifest = installer.manifest().unwrap().unwrap();
    assert_eq!(manifest.versions.len(), 2);
    assert!(manifest.versions[0].version.starts_with("main@"));
    assert!(manifest.versions[1].version.starts_with("feature-x@"));
    assert!(
        manifest.versions[1]
            .installed_files
            .contains(&"feature.txt".to_string())
    );
}

#[test]
fn custom_core_is_left_alone() {
    let env = TestEnv::new();
    env.write_config("custom", &[]);

    let report = reconciler(&env)
        .update_all(&desired(&env), ModifyOptions::default())
        .unwrap();

    assert_eq!(report.skipped, vec!["Rock"]);
    env.assert_not_exists("Rock");
}

#[test]
fn cancelled_batch_leaves_nothing_behind() {
    let env = TestEnv::new();
    let remote = env.remote("alpha");
    env.write_config("1.16.3", &[("plugins/alpha", &remote, "main")]);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let report = reconciler(&env)
        .with_cancellation(cancel)
        .update_all(&desired(&env), ModifyOptions::default())
        .unwrap();

    assert_eq!(report.failed.len(), 2);
    env.assert_not_exists("Rock");
    env.assert_not_exists("plugins/alpha");
}

#[test]
fn status_leaves_no_state_behind() {
    let env = TestEnv::new();
    let remote = env.remote("alpha");
    env.write_config("1.16.3", &[("plugins/alpha", &remote, "main")]);

    let checks = reconciler(&env).status(&desired(&env));

    assert_eq!(checks.len(), 2);
    env.assert_not_exists(".devenv");
}

#[test]
fn plugin_paths_overlapping_the_environment_or_core_are_refused() {
    let env = TestEnv::new();
    let remote = env.remote("alpha");
    env.write_config("custom", &[]);
    env.write_file("Core/user-data.txt", "keep");
    let url = remote.to_string_lossy().into_owned();

    let mut config = desired(&env);
    config.plugins = vec![
        PluginSpec::new("./", url.clone(), "main"),
        PluginSpec::new("Core/extra", url, "main"),
    ];
    let options = EngineOptions {
        core_dir: "Core".to_string(),
        ..EngineOptions::default()
    };
    let source = Arc::new(DirectoryPackageSource::new(env.packages()));
    let report = Reconciler::new(env.root(), source, options)
        .unwrap()
        .update_plugins(&config, forced())
        .unwrap();

    let failed: Vec<&str> = report.failed.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(failed, vec!["./", "Core/extra"]);
    assert!(report.updated.is_empty());
    env.assert_exists("environment.json");
    env.assert_exists("Core/user-data.txt");
    env.assert_not_exists("Core/extra");
}

#[derive(Default)]
struct Events(Mutex<Vec<String>>);

impl ReconcileObserver for Events {
    fn resource_started(&self, name: &str, action: &str) {
        self.0.lock().unwrap().push(format!("start {name}: {action}"));
    }

    fn resource_finished(&self, name: &str, result: Result<(), &Error>) {
        let outcome = if result.is_ok() { "ok" } else { "failed" };
        self.0.lock().unwrap().push(format!("finish {name}: {outcome}"));
    }
}

#[test]
fn observer_sees_each_resource() {
    let env = TestEnv::new();
    env.write_config("1.16.3", &[]);
    let events = Arc::new(Events::default());

    reconciler(&env)
        .with_observer(events.clone())
        .update_all(&desired(&env), ModifyOptions::default())
        .unwrap();

    assert_eq!(
        *events.0.lock().unwrap(),
        vec!["start Rock: install 1.16.3", "finish Rock: ok"]
    );
}
