//! CLI argument parsing using clap derive

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use devenv_core::ModifyOptions;

/// Dev environment manager - keep a core install and its plugins in line with environment.json
#[derive(Parser, Debug)]
#[command(name = "devenv")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// The command to run
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Inspect or update the development environment
    Environment {
        #[command(subcommand)]
        action: EnvironmentAction,
    },

    /// Edit solution files
    Solution {
        #[command(subcommand)]
        action: SolutionAction,
    },
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum EnvironmentAction {
    /// Show the state of the core install and every plugin
    Status {
        #[command(flatten)]
        target: TargetArgs,
    },

    /// Bring resources up to date
    Update {
        #[command(subcommand)]
        resource: UpdateResource,
    },
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum UpdateResource {
    /// Update the core install
    Rock {
        #[command(flatten)]
        target: TargetArgs,
        #[command(flatten)]
        source: SourceArgs,
        #[command(flatten)]
        modify: ModifyArgs,
    },

    /// Update every plugin
    Plugin {
        #[command(flatten)]
        target: TargetArgs,
        #[command(flatten)]
        modify: ModifyArgs,
    },

    /// Update the core install, then every plugin
    All {
        #[command(flatten)]
        target: TargetArgs,
        #[command(flatten)]
        source: SourceArgs,
        #[command(flatten)]
        modify: ModifyArgs,
    },
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct TargetArgs {
    /// Environment root (the directory holding environment.json)
    #[arg(long, default_value = ".")]
    pub target: PathBuf,
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct SourceArgs {
    /// Package source: an http(s) base URL or a directory of <version>.zip files
    #[arg(long, env = "DEVENV_PACKAGE_SOURCE")]
    pub source: Option<String>,
}

#[derive(Args, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModifyArgs {
    /// Discard local modifications instead of refusing
    #[arg(long)]
    pub force: bool,

    /// Show what would change without changing anything
    #[arg(long)]
    pub dry_run: bool,
}

impl From<ModifyArgs> for ModifyOptions {
    fn from(args: ModifyArgs) -> Self {
        ModifyOptions {
            dry_run: args.dry_run,
            force: args.force,
        }
    }
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum SolutionAction {
    /// List the projects in a solution
    List {
        /// Solution file
        file: PathBuf,
    },

    /// Add a project to a solution
    AddProject {
        /// Solution file
        file: PathBuf,

        /// Project name
        #[arg(long)]
        name: String,

        /// Project path relative to the solution
        #[arg(long)]
        path: String,

        /// Project type
        #[arg(long, value_enum, default_value_t = ProjectKind::Csharp)]
        kind: ProjectKind,

        /// Project id; a new one is generated when omitted
        #[arg(long)]
        id: Option<String>,
    },

    /// Remove a project from a solution
    RemoveProject {
        /// Solution file
        file: PathBuf,

        /// Project name or id
        name: String,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectKind {
    Csharp,
    Sdk,
    Website,
    Folder,
}

impl ProjectKind {
    pub fn type_id(self) -> &'static str {
        match self {
            ProjectKind::Csharp => devenv_sln::CSHARP_PROJECT_TYPE,
            ProjectKind::Sdk => devenv_sln::SDK_CSHARP_PROJECT_TYPE,
            ProjectKind::Website => devenv_sln::WEBSITE_PROJECT_TYPE,
            ProjectKind::Folder => devenv_sln::SOLUTION_FOLDER_TYPE,
        }
    }
}
