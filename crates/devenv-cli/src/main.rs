//! Dev environment manager CLI
//!
//! Keeps a core install and a set of plugin repositories in line with the
//! environment's `environment.json`, and edits solution files.

mod cli;
mod commands;
mod error;

use std::time::Duration;

use clap::Parser;
use colored::Colorize;
use devenv_core::Scope;
use devenv_git::{CancellationToken, GitDriver};
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands, EnvironmentAction, SolutionAction, UpdateResource};
use commands::UpdateRequest;
use error::{CliError, Result};

/// Connect and read timeout for git transports.
const GIT_TIMEOUT: Duration = Duration::from_secs(60);

fn main() {
    if let Err(e) = run() {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    execute_command(cli.command)
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose)
        .init();
    tracing::debug!("Verbose mode enabled");
}

/// Trip the returned token on Ctrl-C.
fn install_cancel_handler() -> Result<CancellationToken> {
    let token = CancellationToken::new();
    let handler_token = token.clone();
    ctrlc::set_handler(move || {
        eprintln!("{} cancelling, cleaning up partial work...", "!".yellow().bold());
        handler_token.cancel();
    })
    .map_err(|e| CliError::user(format!("Failed to install Ctrl-C handler: {e}")))?;
    Ok(token)
}

fn execute_command(cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Environment { action } => match action {
            EnvironmentAction::Status { target } => commands::run_status(&target.target),
            EnvironmentAction::Update { resource } => cmd_update(resource),
        },
        Commands::Solution { action } => match action {
            SolutionAction::List { file } => commands::run_list(&file),
            SolutionAction::AddProject {
                file,
                name,
                path,
                kind,
                id,
            } => commands::run_add_project(&file, &name, &path, kind, id.as_deref()),
            SolutionAction::RemoveProject { file, name } => {
                commands::run_remove_project(&file, &name)
            }
        },
    }
}

fn cmd_update(resource: UpdateResource) -> Result<()> {
    let (target, source, modify, scope) = match resource {
        UpdateResource::Rock {
            target,
            source,
            modify,
        } => (target, source.source, modify, Scope::Core),
        UpdateResource::Plugin { target, modify } => (target, None, modify, Scope::Plugins),
        UpdateResource::All {
            target,
            source,
            modify,
        } => (target, source.source, modify, Scope::All),
    };

    GitDriver::set_transport_timeout(GIT_TIMEOUT)?;
    let cancel = install_cancel_handler()?;
    commands::run_update(
        UpdateRequest {
            target: &target.target,
            scope,
            source: source.as_deref(),
            options: modify.into(),
        },
        cancel,
    )
}
