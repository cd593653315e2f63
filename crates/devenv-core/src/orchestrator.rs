//! Reconciliation orchestrator
//!
//! Drives the core installer and plugin installers toward a
//! [`DesiredEnvironment`]. One batch runs in fixed phases:
//!
//! 1. Check every resource in scope (read-only; plugins on a bounded pool).
//! 2. Partition into up to date and out of date.
//! 3. Pre-flight: if any out-of-date resource is dirty and `force` is off,
//!    abort before touching anything, naming every dirty resource.
//! 4. Dry run: report planned actions and stop.
//! 5. Execute: core first; a core failure fails the batch's plugins without
//!    attempting them. Plugin failures are isolated from each other.
//!
//! Work on one path is serialized through a path-keyed lock shared by checks
//! and updates.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use devenv_fs::{NormalizedPath, PathLocks, io};
use devenv_git::{CancellationToken, GitDriver};
use devenv_meta::{
    DEFAULT_CORE_DIR, DesiredEnvironment, PluginSpec, VersionSpec, is_same_or_nested,
};
use rayon::ThreadPool;
use rayon::prelude::*;

use crate::core_installer::CoreInstaller;
use crate::observer::{NullObserver, ReconcileObserver, ResourceProgress};
use crate::package::{HttpTimeouts, PackageSource};
use crate::plugin_installer::{PluginInstaller, STATE_DIR};
use crate::report::{PlannedAction, ResourceCheck, ResourceFailure, UpdateReport};
use crate::status::{ResourceKind, ResourceStatus};
use crate::{Error, Result};

/// Engine tunables.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Upper bound on concurrent plugin checks and updates.
    pub workers: usize,
    /// Core installation directory, relative to the environment root.
    pub core_dir: String,
    pub http: HttpTimeouts,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            workers: 4,
            core_dir: DEFAULT_CORE_DIR.to_string(),
            http: HttpTimeouts::default(),
        }
    }
}

/// Flags shared by every modifying command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModifyOptions {
    /// Report what would change without changing anything.
    pub dry_run: bool,
    /// Discard local modifications instead of refusing.
    pub force: bool,
}

/// Which resource families a batch covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    All,
    Core,
    Plugins,
}

impl Scope {
    fn core(self) -> bool {
        matches!(self, Scope::All | Scope::Core)
    }

    fn plugins(self) -> bool {
        matches!(self, Scope::All | Scope::Plugins)
    }
}

enum Target<'e> {
    Core,
    Plugin(&'e PluginSpec),
}

pub struct Reconciler {
    root: PathBuf,
    options: EngineOptions,
    source: Arc<dyn PackageSource>,
    git: GitDriver,
    locks: PathLocks,
    pool: ThreadPool,
    observer: Arc<dyn ReconcileObserver>,
    cancel: CancellationToken,
}

impl Reconciler {
    /// Create a reconciler for the environment rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WorkerPool`] if the worker pool cannot be started.
    pub fn new(
        root: impl Into<PathBuf>,
        source: Arc<dyn PackageSource>,
        options: EngineOptions,
    ) -> Result<Self> {
        let root = root.into();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(options.workers.max(1))
            .thread_name(|i| format!("devenv-worker-{i}"))
            .build()
            .map_err(|e| Error::WorkerPool {
                message: e.to_string(),
            })?;
        let locks = PathLocks::with_lock_dir(root.join(STATE_DIR).join("locks"));
        Ok(Self {
            root,
            options,
            source,
            git: GitDriver::new(),
            locks,
            pool,
            observer: Arc::new(NullObserver),
            cancel: CancellationToken::new(),
        })
    }

    pub fn with_observer(mut self, observer: Arc<dyn ReconcileObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_git(mut self, git: GitDriver) -> Self {
        self.git = git;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn core_installer(&self) -> CoreInstaller {
        let root = self.root.join(&self.options.core_dir);
        CoreInstaller::new(root, Arc::clone(&self.source))
    }

    pub fn plugin_installer(&self, spec: &PluginSpec) -> PluginInstaller {
        PluginInstaller::new(&self.root, spec.clone(), self.git.clone())
    }

    /// Status of the core and every plugin, in declaration order.
    ///
    /// Read-only: no lock files are created under the environment root.
    pub fn status(&self, env: &DesiredEnvironment) -> Vec<ResourceCheck> {
        self.check(env, Scope::All)
            .into_iter()
            .map(|(_, check)| check)
            .collect()
    }

    /// Reconcile the core and every plugin.
    pub fn update_all(
        &self,
        env: &DesiredEnvironment,
        options: ModifyOptions,
    ) -> Result<UpdateReport> {
        self.run(env, Scope::All, options)
    }

    /// Reconcile only the core distribution.
    pub fn update_core(
        &self,
        env: &DesiredEnvironment,
        options: ModifyOptions,
    ) -> Result<UpdateReport> {
        self.run(env, Scope::Core, options)
    }

    /// Reconcile only the plugins.
    pub fn update_plugins(
        &self,
        env: &DesiredEnvironment,
        options: ModifyOptions,
    ) -> Result<UpdateReport> {
        self.run(env, Scope::Plugins, options)
    }

    fn check<'e>(
        &self,
        env: &'e DesiredEnvironment,
        scope: Scope,
    ) -> Vec<(Target<'e>, ResourceCheck)> {
        let mut checks = Vec::new();
        if scope.core() {
            checks.push((Target::Core, self.check_core(env.core_version())));
        }
        if scope.plugins() {
            let plugins: Vec<ResourceCheck> = self.pool.install(|| {
                env.plugins
                    .par_iter()
                    .map(|spec| self.check_plugin(spec))
                    .collect()
            });
            checks.extend(env.plugins.iter().map(Target::Plugin).zip(plugins));
        }
        checks
    }

    fn check_core(&self, desired: &VersionSpec) -> ResourceCheck {
        let installer = self.core_installer();
        let failure = |error: Error| ResourceFailure {
            kind: ResourceKind::Core,
            name: installer.name().to_string(),
            error,
        };
        let _guard = self
            .locks
            .lock_existing(installer.root())
            .map_err(|e| failure(e.into()))?;
        installer.get_status(desired).map_err(failure)
    }

    fn check_plugin(&self, spec: &PluginSpec) -> ResourceCheck {
        let installer = self.plugin_installer(spec);
        let failure = |error: Error| ResourceFailure {
            kind: ResourceKind::Plugin,
            name: spec.path.clone(),
            error,
        };
        self.ensure_outside_core(spec).map_err(&failure)?;
        let _guard = self
            .locks
            .lock_existing(installer.dir())
            .map_err(|e| failure(e.into()))?;
        installer.get_status().map_err(failure)
    }

    /// A plugin may not live in or above the core installation directory.
    fn ensure_outside_core(&self, spec: &PluginSpec) -> Result<()> {
        let key = spec.path_key();
        let core = NormalizedPath::new(&self.options.core_dir);
        let core = core.as_str().trim_matches('/');
        if key.is_empty() || is_same_or_nested(core, &key) || is_same_or_nested(&key, core) {
            return Err(Error::InvalidPath {
                path: spec.path.clone(),
            });
        }
        Ok(())
    }

    /// Names of out-of-date resources with local changes.
    ///
    /// Plugin trees are re-read under their lock so edits made after the
    /// status pass still block the batch.
    fn dirty_resources(&self, work: &[(Target<'_>, ResourceStatus)]) -> Vec<String> {
        self.pool.install(|| {
            work.par_iter()
                .filter(|(target, status)| match target {
                    Target::Core => status.blocks_update(),
                    Target::Plugin(spec) => {
                        let installer = self.plugin_installer(spec);
                        let clean = self
                            .locks
                            .lock_existing(installer.dir())
                            .map_err(Error::from)
                            .and_then(|_guard| installer.is_clean());
                        status.blocks_update() || !matches!(clean, Ok(true))
                    }
                })
                .map(|(_, status)| format!("{} ({})", status.name, status.detail))
                .collect()
        })
    }

    fn run(
        &self,
        env: &DesiredEnvironment,
        scope: Scope,
        options: ModifyOptions,
    ) -> Result<UpdateReport> {
        let mut report = UpdateReport::new(options.dry_run);
        let mut work: Vec<(Target<'_>, ResourceStatus)> = Vec::new();
        let mut core_failure: Option<String> = None;

        for (target, check) in self.check(env, scope) {
            match check {
                Ok(status) if status.is_up_to_date => report.skipped.push(status.name),
                Ok(status) => work.push((target, status)),
                Err(failure) => {
                    if matches!(target, Target::Core) {
                        core_failure = Some(failure.error.to_string());
                    }
                    report.fail(failure.kind, failure.name, failure.error);
                }
            }
        }

        if !options.force {
            let dirty = self.dirty_resources(&work);
            if !dirty.is_empty() {
                tracing::warn!(count = dirty.len(), "Dirty resources block the update");
                return Err(Error::DirtyEnvironment { resources: dirty });
            }
        }

        if options.dry_run {
            for (target, status) in &work {
                report.planned.push(self.plan(env, target, status, options.force));
            }
            return Ok(report);
        }

        let mut plugins = Vec::new();
        for (target, status) in work {
            match target {
                Target::Core => {
                    let action = self.plan(env, &target, &status, options.force);
                    let name = status.name;
                    self.observer.resource_started(&name, &action.description);
                    let result =
                        self.update_core_resource(&name, env.core_version(), options.force);
                    self.observer
                        .resource_finished(&name, result.as_ref().map(|_| ()));
                    match result {
                        Ok(()) => report.updated.push(name),
                        Err(e) => {
                            core_failure = Some(e.to_string());
                            report.fail(ResourceKind::Core, name, e);
                        }
                    }
                }
                Target::Plugin(spec) => plugins.push((spec, status)),
            }
        }

        if let Some(reason) = &core_failure {
            for (spec, _) in plugins {
                let error = Error::NotAttempted {
                    reason: format!("core update failed: {reason}"),
                };
                report.fail(ResourceKind::Plugin, spec.path.clone(), error);
            }
            return Ok(report);
        }

        let planned: Vec<(&PluginSpec, String)> = plugins
            .iter()
            .map(|(spec, status)| {
                let action = self.plan(env, &Target::Plugin(spec), status, options.force);
                (*spec, action.description)
            })
            .collect();

        let results: Vec<(&PluginSpec, Result<()>)> = self.pool.install(|| {
            planned
                .par_iter()
                .map(|(spec, action)| {
                    self.observer.resource_started(&spec.path, action);
                    let result = self.update_plugin_resource(spec, options.force);
                    self.observer
                        .resource_finished(&spec.path, result.as_ref().map(|_| ()));
                    (*spec, result)
                })
                .collect()
        });

        for (spec, result) in results {
            match result {
                Ok(()) => report.updated.push(spec.path.clone()),
                Err(e) => report.fail(ResourceKind::Plugin, spec.path.clone(), e),
            }
        }

        tracing::info!(summary = %report.summary(), "Reconciliation finished");
        Ok(report)
    }

    fn update_core_resource(&self, name: &str, desired: &VersionSpec, force: bool) -> Result<()> {
        let VersionSpec::Semantic(version) = desired else {
            return Ok(());
        };
        let installer = self.core_installer();
        let _guard = self.locks.lock(installer.root())?;
        let progress = ResourceProgress::new(name, self.observer.as_ref());
        installer.replace(version, force, &progress, &self.cancel)?;
        Ok(())
    }

    fn update_plugin_resource(&self, spec: &PluginSpec, force: bool) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(Error::Cancelled {
                operation: format!("update of {}", spec.path),
            });
        }
        let installer = self.plugin_installer(spec);
        let _guard = self.locks.lock(installer.dir())?;
        let progress = ResourceProgress::new(&spec.path, self.observer.as_ref());
        installer.install_or_update(force, &progress, &self.cancel)?;
        Ok(())
    }

    fn plan(
        &self,
        env: &DesiredEnvironment,
        target: &Target<'_>,
        status: &ResourceStatus,
        force: bool,
    ) -> PlannedAction {
        let description = match target {
            Target::Core => {
                let installer = self.core_installer();
                let version = env.core_version();
                match installer.installed() {
                    _ if status.is_dirty && force => {
                        format!("delete {} and install {version}", installer.root().display())
                    }
                    Some(installed) => format!("replace {} with {version}", installed.version),
                    None => format!("install {version}"),
                }
            }
            Target::Plugin(spec) => {
                let installer = self.plugin_installer(spec);
                let absent = io::is_absent_or_empty(installer.dir()).unwrap_or(false);
                if absent {
                    format!("clone {} at {}", spec.url, spec.branch)
                } else if status.is_dirty && force {
                    format!("discard local changes and check out {}", spec.branch)
                } else {
                    format!("fetch and check out {}", spec.branch)
                }
            }
        };
        PlannedAction {
            kind: status.kind,
            name: status.name.clone(),
            description,
        }
    }
}
