//! Environment status and update commands

use std::path::Path;
use std::sync::Arc;

use colored::Colorize;
use devenv_core::{
    EngineOptions, Error as CoreError, HttpTimeouts, ModifyOptions, PackageSource,
    ReconcileObserver, Reconciler, ResourceStatus, Scope, UpdateReport, package_source_from,
};
use devenv_git::{CancellationToken, ProgressEvent, ProgressSink};

use crate::error::{CliError, Result};

/// Source used when none is configured. Fails only if the core actually
/// needs a package.
struct UnconfiguredSource;

impl PackageSource for UnconfiguredSource {
    fn location(&self, _version: &str) -> String {
        "(no package source; pass --source or set DEVENV_PACKAGE_SOURCE)".to_string()
    }

    fn fetch(
        &self,
        version: &str,
        _dest: &Path,
        _progress: &dyn ProgressSink,
        _cancel: &CancellationToken,
    ) -> devenv_core::Result<u64> {
        Err(CoreError::PackageNotFound {
            version: version.to_string(),
            location: self.location(version),
        })
    }
}

/// Prints one line per resource start, stage and outcome.
struct ConsoleObserver;

impl ReconcileObserver for ConsoleObserver {
    fn resource_started(&self, name: &str, action: &str) {
        println!("{} {}: {}", "=>".blue().bold(), name.cyan(), action);
    }

    fn resource_finished(&self, name: &str, outcome: std::result::Result<(), &CoreError>) {
        match outcome {
            Ok(()) => println!("   {} {}", "+".green(), name),
            Err(e) => println!("   {} {}: {}", "!".red(), name, e),
        }
    }

    fn stage(&self, name: &str, stage: &str) {
        println!("   {} {}", format!("{name}:").dimmed(), stage.dimmed());
    }

    fn progress(&self, name: &str, event: &ProgressEvent) {
        tracing::trace!(
            resource = %name,
            stage = %event.stage,
            processed = event.processed,
            total = event.total,
            "Progress"
        );
    }
}

fn reconciler(
    target: &Path,
    source: Arc<dyn PackageSource>,
    cancel: CancellationToken,
) -> Result<Reconciler> {
    Ok(Reconciler::new(target, source, EngineOptions::default())?
        .with_observer(Arc::new(ConsoleObserver))
        .with_cancellation(cancel))
}

fn status_line(status: &ResourceStatus) -> String {
    let label = match (status.is_up_to_date, status.is_dirty) {
        (true, false) => format!("{:<10}", "OK").green().bold(),
        (false, false) => format!("{:<10}", "OUTDATED").yellow().bold(),
        (_, true) => format!("{:<10}", "DIRTY").red().bold(),
    };
    format!(
        "   {label} {:<8} {:<28} {}",
        status.kind.to_string(),
        status.name,
        status.detail
    )
}

/// Run the status command
///
/// Fails if any resource could not be checked.
pub fn run_status(target: &Path) -> Result<()> {
    println!(
        "{} Checking environment at {}",
        "=>".blue().bold(),
        target.display()
    );

    let env = devenv_meta::load_from_root(target)?;
    let reconciler = reconciler(target, Arc::new(UnconfiguredSource), CancellationToken::new())?;

    let mut failures = 0;
    for check in reconciler.status(&env) {
        match check {
            Ok(status) => println!("{}", status_line(&status)),
            Err(failure) => {
                failures += 1;
                println!(
                    "   {} {:<8} {:<28} {}",
                    format!("{:<10}", "ERROR").red().bold(),
                    failure.kind.to_string(),
                    failure.name,
                    failure.error
                );
            }
        }
    }

    if failures > 0 {
        return Err(CliError::user(format!(
            "{failures} resource(s) could not be checked"
        )));
    }
    Ok(())
}

/// Arguments of one update invocation.
pub struct UpdateRequest<'a> {
    pub target: &'a Path,
    pub scope: Scope,
    pub source: Option<&'a str>,
    pub options: ModifyOptions,
}

/// Run an update command
///
/// A dirty pre-flight abort or any failed resource is an error.
pub fn run_update(request: UpdateRequest<'_>, cancel: CancellationToken) -> Result<()> {
    let heading = if request.options.dry_run {
        "Planning update of"
    } else {
        "Updating"
    };
    println!(
        "{} {heading} {}",
        "=>".blue().bold(),
        request.target.display()
    );

    let env = devenv_meta::load_from_root(request.target)?;
    let source: Arc<dyn PackageSource> = match request.source {
        Some(spec) => package_source_from(spec, HttpTimeouts::default())?,
        None => Arc::new(UnconfiguredSource),
    };
    let reconciler = reconciler(request.target, source, cancel)?;

    let report = match request.scope {
        Scope::All => reconciler.update_all(&env, request.options)?,
        Scope::Core => reconciler.update_core(&env, request.options)?,
        Scope::Plugins => reconciler.update_plugins(&env, request.options)?,
    };

    print_report(&report);
    if report.is_success() {
        Ok(())
    } else {
        Err(CliError::user(format!(
            "{} resource(s) failed to update",
            report.failed.len()
        )))
    }
}

fn print_report(report: &UpdateReport) {
    println!();
    if report.dry_run {
        if report.planned.is_empty() {
            println!("{} Nothing to do.", "OK".green().bold());
        } else {
            println!("{} Would perform:", "PLAN".blue().bold());
            for action in &report.planned {
                println!("   {} {}: {}", "+".green(), action.name.cyan(), action.description);
            }
        }
    }
    for name in &report.skipped {
        println!("   {} {} {}", "=".dimmed(), name, "(up to date)".dimmed());
    }
    for failed in &report.failed {
        println!("   {} {}: {}", "!".red(), failed.name, failed.reason);
    }
    println!("{}", report.summary());
}
