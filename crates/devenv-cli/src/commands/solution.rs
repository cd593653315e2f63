//! Solution list, add-project and remove-project commands

use std::path::Path;

use colored::Colorize;
use devenv_core::{FileEmitter, FsFileEmitter};
use devenv_sln::{Project, Solution};

use crate::cli::ProjectKind;
use crate::error::{CliError, Result};

fn save(file: &Path, solution: &Solution) -> Result<()> {
    let dir = match file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let name = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| CliError::user(format!("{} is not a file path", file.display())))?;
    FsFileEmitter::new(dir, dir).write_file(&name, &solution.to_string())?;
    Ok(())
}

/// Run the solution list command
pub fn run_list(file: &Path) -> Result<()> {
    let solution = devenv_sln::load(file)?;
    if solution.projects.is_empty() {
        println!("No projects in {}", file.display());
        return Ok(());
    }
    for project in &solution.projects {
        println!(
            "{:<32} {:<48} {}",
            project.name,
            project.path,
            project.id
        );
    }
    Ok(())
}

/// Run the solution add-project command
pub fn run_add_project(
    file: &Path,
    name: &str,
    path: &str,
    kind: ProjectKind,
    id: Option<&str>,
) -> Result<()> {
    let mut solution = devenv_sln::load(file)?;
    let project = match id {
        Some(id) => Project::new(kind.type_id(), name, path, id),
        None => Project::with_new_id(kind.type_id(), name, path),
    };
    let id = project.id.clone();
    solution.add_project(project)?;
    save(file, &solution)?;
    println!("{} Added {} {}", "OK".green().bold(), name.cyan(), id.dimmed());
    Ok(())
}

/// Run the solution remove-project command
pub fn run_remove_project(file: &Path, name: &str) -> Result<()> {
    let mut solution = devenv_sln::load(file)?;
    let removed = solution.remove_project(name)?;
    save(file, &solution)?;
    println!("{} Removed {}", "OK".green().bold(), removed.name.cyan());
    Ok(())
}
