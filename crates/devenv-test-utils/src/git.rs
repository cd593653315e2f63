//! Local git "remotes" built with `git2`.
//!
//! Plugin tests clone from these instead of a network host. Each fixture is a
//! non-bare repository whose branches are created by committing straight into
//! its working tree.

use std::fs;
use std::path::Path;

use git2::build::CheckoutBuilder;
use git2::{IndexAddOption, Oid, Repository, RepositoryInitOptions, Signature};

/// Initialises a repository whose unborn HEAD points at `main`.
///
/// # Panics
/// Panics if `git2` fails to create the repository.
pub fn init_repo(path: &Path) -> Repository {
    let mut opts = RepositoryInitOptions::new();
    opts.initial_head("main");
    Repository::init_opts(path, &opts).unwrap_or_else(|e| {
        panic!(
            "init_repo: failed to init repository at {}: {e}",
            path.display()
        )
    })
}

/// Commits `files` (relative path, content) on `branch`.
///
/// The branch is created from the current HEAD commit if it does not exist
/// yet, and is left checked out afterwards.
///
/// # Panics
/// Panics if any git or filesystem operation fails.
pub fn commit_files(repo: &Repository, branch: &str, files: &[(&str, &str)], message: &str) -> Oid {
    switch_to(repo, branch);

    let workdir = repo
        .workdir()
        .unwrap_or_else(|| panic!("commit_files: repository has no working tree"));
    for (rel, content) in files {
        let path = workdir.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap_or_else(|e| {
                panic!("commit_files: failed to create {}: {e}", parent.display())
            });
        }
        fs::write(&path, content)
            .unwrap_or_else(|e| panic!("commit_files: failed to write {}: {e}", path.display()));
    }

    let mut index = repo.index().unwrap();
    index
        .add_all(["*"].iter(), IndexAddOption::DEFAULT, None)
        .unwrap_or_else(|e| panic!("commit_files: failed to stage files: {e}"));
    index.write().unwrap();
    let tree_id = index.write_tree().unwrap();
    let tree = repo.find_tree(tree_id).unwrap();

    let sig = Signature::now("Test User", "test@test.com").unwrap();
    let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
    let parents: Vec<&git2::Commit<'_>> = parent.iter().collect();

    repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
        .unwrap_or_else(|e| panic!("commit_files: commit on {branch} failed: {e}"))
}

/// Points HEAD at `branch`, creating it from the current commit if needed,
/// and force-checks out its tree.
fn switch_to(repo: &Repository, branch: &str) {
    let refname = format!("refs/heads/{branch}");
    let head_commit = repo.head().ok().and_then(|h| h.peel_to_commit().ok());

    if repo.find_reference(&refname).is_err()
        && let Some(commit) = &head_commit
    {
        repo.branch(branch, commit, false)
            .unwrap_or_else(|e| panic!("switch_to: failed to create {branch}: {e}"));
    }

    repo.set_head(&refname)
        .unwrap_or_else(|e| panic!("switch_to: failed to set HEAD to {branch}: {e}"));
    if repo.head().is_ok() {
        repo.checkout_head(Some(CheckoutBuilder::new().force()))
            .unwrap_or_else(|e| panic!("switch_to: checkout of {branch} failed: {e}"));
    }
}

/// A plugin remote with three branches:
///
/// - `main`: `README.md`, `src/plugin.txt`
/// - `feature-x`: `main` plus `feature.txt`
/// - `feature/login`: `main` plus `login.txt`
///
/// HEAD is left on `main`.
///
/// # Panics
/// Panics if any git operation fails.
pub fn plugin_remote(path: &Path) -> Repository {
    let repo = init_repo(path);
    commit_files(
        &repo,
        "main",
        &[("README.md", "# Plugin\n"), ("src/plugin.txt", "v1\n")],
        "Initial commit",
    );
    commit_files(&repo, "feature-x", &[("feature.txt", "x\n")], "Add feature x");
    switch_to(&repo, "main");
    commit_files(&repo, "feature/login", &[("login.txt", "login\n")], "Add login");
    switch_to(&repo, "main");
    repo
}

/// Branch head commit id as hex.
///
/// # Panics
/// Panics if the branch does not exist.
pub fn branch_commit(repo: &Repository, branch: &str) -> String {
    repo.find_reference(&format!("refs/heads/{branch}"))
        .and_then(|r| r.peel_to_commit())
        .map(|c| c.id().to_string())
        .unwrap_or_else(|e| panic!("branch_commit: {branch} not found: {e}"))
}
