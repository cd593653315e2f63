//! Cross-crate scenarios
//!
//! Each module drives a whole environment through one behavior: drift
//! detection, clone atomicity, pre-flight ordering, manifest gating,
//! concurrent invocations, and solution editing next to a live environment.

use std::fs;
use std::sync::Arc;

use devenv_core::{DirectoryPackageSource, EngineOptions, ModifyOptions, Reconciler};
use devenv_meta::DesiredEnvironment;
use devenv_test_utils::TestEnv;

fn reconciler(env: &TestEnv) -> Reconciler {
    let source = Arc::new(DirectoryPackageSource::new(env.packages()));
    Reconciler::new(env.root(), source, EngineOptions::default()).unwrap()
}

fn desired(env: &TestEnv) -> DesiredEnvironment {
    devenv_meta::load_from_root(&env.root()).unwrap()
}

// =============================================================================
// Drift detection
// =============================================================================

mod drift {
    use super::*;

    #[test]
    fn tampering_is_dirty_and_restoring_is_clean() {
        let env = TestEnv::new();
        env.write_config("1.16.3", &[]);
        let reconciler = reconciler(&env);
        reconciler
            .update_core(&desired(&env), ModifyOptions::default())
            .unwrap();
        let config = desired(&env);

        let original = fs::read(env.path("Rock/web.config")).unwrap();
        env.write_file("Rock/web.config", "<configuration debug=\"true\" />");
        let core = reconciler.status(&config).remove(0).unwrap();
        assert!(core.is_up_to_date);
        assert!(core.is_dirty);
        assert!(core.detail.contains("1 files modified"), "{}", core.detail);

        fs::write(env.path("Rock/web.config"), &original).unwrap();
        let core = reconciler.status(&config).remove(0).unwrap();
        assert!(core.is_up_to_date);
        assert!(!core.is_dirty);
    }

    #[test]
    fn deleted_file_counts_as_missing() {
        let env = TestEnv::new();
        env.write_config("1.16.3", &[]);
        let reconciler = reconciler(&env);
        reconciler
            .update_core(&desired(&env), ModifyOptions::default())
            .unwrap();

        fs::remove_file(env.path("Rock/bin/Rock.dll")).unwrap();
        let core = reconciler.status(&desired(&env)).remove(0).unwrap();
        assert!(core.is_dirty);
        assert!(core.detail.contains("1 missing"), "{}", core.detail);
    }

    #[test]
    fn dirty_core_needing_upgrade_is_replaced_only_when_forced() {
        let env = TestEnv::new();
        env.write_config("1.16.3", &[]);
        let reconciler = reconciler(&env);
        reconciler
            .update_core(&desired(&env), ModifyOptions::default())
            .unwrap();
        env.write_file("Rock/web.config", "edited");
        env.write_config("1.17.0", &[]);

        let err = reconciler
            .update_core(&desired(&env), ModifyOptions::default())
            .unwrap_err();
        assert!(err.is_dirty());
        assert_eq!(fs::read_to_string(env.path("Rock/web.config")).unwrap(), "edited");

        let forced = ModifyOptions {
            force: true,
            ..ModifyOptions::default()
        };
        let report = reconciler.update_core(&desired(&env), forced).unwrap();
        assert!(report.is_success(), "{:?}", report.failed);

        let installed = reconciler.core_installer().installed().unwrap();
        assert_eq!(installed.version, "1.17.0");
        let files: Vec<_> = installed.files.keys().cloned().collect();
        assert_eq!(files, vec!["bin/Rock.Blocks.dll", "bin/Rock.dll", "web.config"]);
        env.assert_not_exists("Rock/bin/Legacy.dll");
    }
}

// =============================================================================
// Clone atomicity
// =============================================================================

mod atomic_clone {
    use super::*;

    #[test]
    fn unknown_branch_leaves_no_plugin_directory() {
        let env = TestEnv::new();
        let remote = env.remote("alpha");
        env.write_config("custom", &[("plugins/alpha", &remote, "does-not-exist")]);

        let report = reconciler(&env)
            .update_plugins(&desired(&env), ModifyOptions::default())
            .unwrap();

        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].name, "plugins/alpha");
        env.assert_not_exists("plugins/alpha");

        let config = desired(&env);
        let installer = reconciler(&env).plugin_installer(&config.plugins[0]);
        assert!(!installer.manifest_path().exists());
    }

    #[test]
    fn unreachable_remote_fails_only_that_plugin() {
        let env = TestEnv::new();
        let good = env.remote("alpha");
        let missing = env.root().join("no-such-remote");
        env.write_config(
            "custom",
            &[("plugins/gone", &missing, "main"), ("plugins/alpha", &good, "main")],
        );

        let report = reconciler(&env)
            .update_plugins(&desired(&env), ModifyOptions::default())
            .unwrap();

        assert_eq!(report.updated, vec!["plugins/alpha"]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].name, "plugins/gone");
        env.assert_not_exists("plugins/gone");
    }
}

// =============================================================================
// Concurrent invocations
// =============================================================================

mod concurrency {
    use super::*;
    use std::thread;

    #[test]
    fn two_reconcilers_converge_on_the_same_environment() {
        let env = TestEnv::new();
        let a = env.remote("alpha");
        let b = env.remote("beta");
        env.write_config(
            "1.16.3",
            &[("plugins/alpha", &a, "feature-x"), ("plugins/beta", &b, "main")],
        );
        let config = desired(&env);

        thread::scope(|scope| {
            let run = || reconciler(&env).update_all(&config, ModifyOptions::default());
            let first = scope.spawn(run);
            let second = scope.spawn(run);
            for handle in [first, second] {
                let report = handle.join().unwrap().unwrap();
                assert!(report.is_success(), "{:?}", report.failed);
            }
        });

        let checks = reconciler(&env).status(&config);
        assert_eq!(checks.len(), 3);
        for check in checks {
            let status = check.unwrap();
            assert!(status.is_up_to_date && !status.is_dirty, "{status:?}");
        }
    }
}

// =============================================================================
// Configuration passthrough
// =============================================================================

mod configuration {
    use super::*;
    use serde_json::json;

    #[test]
    fn unknown_keys_do_not_affect_reconciliation() {
        let env = TestEnv::new();
        let remote = env.remote("alpha");
        let config = json!({
            "organization": { "name": "Spark", "code": "com.spark", "theme": "dark" },
            "core": { "version": "1.16.3", "channel": "stable" },
            "plugins": [
                { "path": "plugins/alpha", "url": remote.to_string_lossy(), "branch": "main", "owner": "ops" }
            ],
            "generator": { "entities": [] }
        });
        env.write_raw_config(&serde_json::to_string_pretty(&config).unwrap());

        let parsed = desired(&env);
        assert_eq!(parsed.extra["generator"], json!({ "entities": [] }));

        let report = reconciler(&env)
            .update_all(&parsed, ModifyOptions::default())
            .unwrap();
        assert!(report.is_success(), "{:?}", report.failed);
        assert_eq!(report.updated.len(), 2);
    }

    #[test]
    fn duplicate_paths_are_rejected_before_any_work() {
        let env = TestEnv::new();
        let remote = env.remote("alpha");
        env.write_config(
            "1.16.3",
            &[("plugins/alpha", &remote, "main"), ("./plugins/alpha/", &remote, "feature-x")],
        );

        let err = devenv_meta::load_from_root(&env.root()).unwrap_err();
        assert!(err.to_string().contains("already used"), "{err}");
        env.assert_not_exists("Rock");
    }
}

// =============================================================================
// Solution editing alongside an installed plugin
// =============================================================================

mod solution {
    use super::*;
    use devenv_core::{FileEmitter, FsFileEmitter};
    use devenv_sln::{CSHARP_PROJECT_TYPE, Project};
    use pretty_assertions::assert_eq;

    const SLN: &str = "\u{feff}\r\nMicrosoft Visual Studio Solution File, Format Version 12.00\r\nGlobal\r\n\tGlobalSection(SolutionConfigurationPlatforms) = preSolution\r\n\t\tDebug|Any CPU = Debug|Any CPU\r\n\tEndGlobalSection\r\n\tGlobalSection(ProjectConfigurationPlatforms) = postSolution\r\n\tEndGlobalSection\r\n\tGlobalSection(ExtensibilityGlobals) = postSolution\r\n\t\tSolutionGuid = {0F6F6F6F-0000-4000-8000-000000000000}\r\n\tEndGlobalSection\r\nEndGlobal\r\n";

    #[test]
    fn plugin_project_is_added_through_the_file_emitter() {
        let env = TestEnv::new();
        let remote = env.remote("alpha");
        env.write_config("custom", &[("plugins/alpha", &remote, "main")]);
        reconciler(&env)
            .update_plugins(&desired(&env), ModifyOptions::default())
            .unwrap();
        env.write_file("Rock.sln", SLN);

        let mut solution = devenv_sln::load(&env.path("Rock.sln")).unwrap();
        solution
            .add_project(Project::new(
                CSHARP_PROJECT_TYPE,
                "com.spark.Alpha",
                "plugins\\alpha\\com.spark.Alpha.csproj",
                "{A1A1A1A1-0000-4000-8000-000000000001}",
            ))
            .unwrap();
        let emitter = FsFileEmitter::new(env.root(), env.root());
        emitter.write_file("Rock.sln", &solution.to_string()).unwrap();

        let written = fs::read_to_string(env.path("Rock.sln")).unwrap();
        assert!(written.contains("SolutionGuid = {0F6F6F6F-0000-4000-8000-000000000000}"));

        let mut reparsed = devenv_sln::parse(&written).unwrap();
        reparsed.remove_project("com.spark.Alpha").unwrap();
        assert_eq!(reparsed.to_string(), SLN);

        // The solution lives outside the plugin, so the plugin stays clean.
        let status = reconciler(&env).status(&desired(&env));
        assert!(!status[1].as_ref().unwrap().is_dirty);
    }
}

// =============================================================================
// Update-check state
// =============================================================================

mod update_check {
    use chrono::{Duration, TimeZone, Utc};
    use devenv_core::update_check::{JsonFileStateStore, StateStore, check_and_maybe_notify};
    use semver::Version;
    use tempfile::TempDir;

    #[test]
    fn state_survives_between_invocations() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(".devenv/update-check.json");
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap();
        let current = Version::new(1, 0, 0);

        let first = JsonFileStateStore::new(&path);
        let notice = check_and_maybe_notify(&first, now, Duration::days(7), &current, || {
            Some(Version::new(1, 1, 0))
        })
        .unwrap();
        assert!(notice.is_some());

        let second = JsonFileStateStore::new(&path);
        assert_eq!(second.load().unwrap().last_checked, Some(now));
        let later = now + Duration::days(1);
        let notice = check_and_maybe_notify(&second, later, Duration::days(7), &current, || {
            panic!("lookup must not run inside the interval")
        })
        .unwrap();
        assert!(notice.is_none());
    }
}
