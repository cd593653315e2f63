//! Git operations used by the plugin installer

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::time::Duration;

use git2::build::CheckoutBuilder;
use git2::{
    BranchType, FetchOptions, ObjectType, RemoteCallbacks, Repository, ResetType, Status,
    StatusOptions, TreeWalkMode, TreeWalkResult,
};

use crate::progress::{CancellationToken, ProgressSink, StageTracker};
use crate::remote::{self, RefPattern, RemoteRef};
use crate::{Error, Result};
use devenv_fs::io;

const ORIGIN: &str = "origin";

/// What HEAD points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Head {
    Branch(String),
    /// Detached or unborn HEAD. Never satisfies a branch requirement.
    Detached,
}

impl std::fmt::Display for Head {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Head::Branch(name) => f.write_str(name),
            Head::Detached => f.write_str("(detached)"),
        }
    }
}

/// Git driver backed by libgit2.
#[derive(Debug, Clone)]
pub struct GitDriver {
    depth: Option<i32>,
}

impl Default for GitDriver {
    fn default() -> Self {
        Self { depth: Some(1) }
    }
}

impl GitDriver {
    /// Shallow (depth 1) fetches against network remotes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply connect and read timeouts to every git transport in the process.
    pub fn set_transport_timeout(timeout: Duration) -> Result<()> {
        let millis = i32::try_from(timeout.as_millis()).unwrap_or(i32::MAX);
        // SAFETY: libgit2 global options; called before any transfer starts.
        unsafe {
            git2::opts::set_server_connect_timeout_in_milliseconds(millis)?;
            git2::opts::set_server_timeout_in_milliseconds(millis)?;
        }
        Ok(())
    }

    /// libgit2's local transport cannot negotiate shallow fetches, and a local
    /// source has no bandwidth to save.
    fn depth_for(&self, url: &str) -> Option<i32> {
        let local = url.starts_with("file://") || Path::new(url).exists();
        if local { None } else { self.depth }
    }

    /// Branches (or tags) advertised by `url` that match `patterns`.
    pub fn list_remote_branches(
        &self,
        url: &str,
        patterns: &[RefPattern],
    ) -> Result<Vec<RemoteRef>> {
        remote::list_remote_refs(url, patterns)
    }

    /// Clone `branch` of `url` into `dest`.
    ///
    /// Only the target branch is fetched. On any failure, including
    /// cancellation, `dest` is removed so a half-cloned tree is never left
    /// behind to be mistaken for a stale one.
    pub fn clone_repository(
        &self,
        url: &str,
        branch: &str,
        dest: &Path,
        progress: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<()> {
        if !io::is_absent_or_empty(dest)? {
            return Err(Error::DestinationNotEmpty {
                path: dest.to_path_buf(),
            });
        }

        tracing::info!(url = %url, branch = %branch, dest = %dest.display(), "Cloning");

        let result: Result<()> = (|| {
            let repo = Repository::init(dest)?;
            repo.remote_with_fetch(ORIGIN, url, &branch_refspec(branch))?;
            self.fetch_branch(&repo, url, branch, progress, cancel)?;
            checkout_branch(&repo, branch)
        })();

        if let Err(e) = &result {
            tracing::warn!(
                dest = %dest.display(),
                error = %e,
                "Clone failed, removing destination"
            );
            io::remove_dir_all_robust(dest)?;
        }
        result
    }

    /// Fetch `branch` from origin and check it out.
    ///
    /// An existing local branch is checked out as-is; otherwise a local
    /// branch tracking `origin/<branch>` is created. The caller must have
    /// established that the working tree is clean.
    pub fn fetch_and_checkout(
        &self,
        repo_path: &Path,
        branch: &str,
        progress: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let repo = self.open(repo_path)?;
        let url = repo
            .find_remote(ORIGIN)?
            .url()
            .unwrap_or_default()
            .to_string();

        let refspec = branch_refspec(branch);
        let configured = repo
            .find_remote(ORIGIN)?
            .fetch_refspecs()?
            .iter()
            .flatten()
            .any(|s| s == refspec || s == "+refs/heads/*:refs/remotes/origin/*");
        if !configured {
            repo.remote_add_fetch(ORIGIN, &refspec)?;
        }

        self.fetch_branch(&repo, &url, branch, progress, cancel)?;
        checkout_branch(&repo, branch)
    }

    fn fetch_branch(
        &self,
        repo: &Repository,
        url: &str,
        branch: &str,
        progress: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let tracker = RefCell::new(StageTracker::new(progress));

        let mut callbacks = RemoteCallbacks::new();
        callbacks.sideband_progress(|data| {
            tracker.borrow_mut().sideband(data);
            !cancel.is_cancelled()
        });
        callbacks.transfer_progress(|stats| {
            tracker.borrow_mut().transfer(&stats);
            !cancel.is_cancelled()
        });

        let mut options = FetchOptions::new();
        options.remote_callbacks(callbacks);
        if let Some(depth) = self.depth_for(url) {
            options.depth(depth);
        }

        let mut remote = repo.find_remote(ORIGIN)?;
        remote
            .fetch(&[branch_refspec(branch)], Some(&mut options), None)
            .map_err(|e| Error::from_transport("fetch", e, cancel.is_cancelled()))?;

        if cancel.is_cancelled() {
            return Err(Error::Cancelled {
                operation: "fetch".into(),
            });
        }

        if repo.find_reference(&remote_ref(branch)).is_err() {
            return Err(Error::BranchNotFound {
                name: branch.to_string(),
                url: url.to_string(),
            });
        }
        Ok(())
    }

    pub fn open(&self, repo_path: &Path) -> Result<Repository> {
        Repository::open(repo_path).map_err(|e| match e.code() {
            git2::ErrorCode::NotFound => Error::NotARepository {
                path: repo_path.to_path_buf(),
            },
            _ => Error::Git(e),
        })
    }

    /// True if `path` is the root of a git working tree.
    pub fn is_repository(&self, path: &Path) -> bool {
        Repository::open(path)
            .ok()
            .and_then(|r| r.workdir().map(|w| same_dir(w, path)))
            .unwrap_or(false)
    }

    pub fn current_branch(&self, repo_path: &Path) -> Result<Head> {
        let repo = self.open(repo_path)?;
        let head = match repo.head() {
            Ok(head) => head,
            Err(e) if e.code() == git2::ErrorCode::UnbornBranch => return Ok(Head::Detached),
            Err(e) => return Err(e.into()),
        };
        if head.is_branch() {
            Ok(Head::Branch(head.shorthand().unwrap_or("HEAD").to_string()))
        } else {
            Ok(Head::Detached)
        }
    }

    pub fn head_commit(&self, repo_path: &Path) -> Result<String> {
        let repo = self.open(repo_path)?;
        let commit = repo.head()?.peel_to_commit()?;
        Ok(commit.id().to_string())
    }

    /// True only if there are no staged, unstaged, or untracked changes.
    /// Ignored files do not count.
    pub fn is_working_tree_clean(&self, repo_path: &Path) -> Result<bool> {
        let repo = self.open(repo_path)?;
        let mut opts = StatusOptions::new();
        opts.include_untracked(true)
            .recurse_untracked_dirs(true)
            .include_ignored(false)
            .exclude_submodules(true);
        let statuses = repo.statuses(Some(&mut opts))?;
        Ok(statuses.is_empty())
    }

    /// Number of changed entries, for status details.
    pub fn change_count(&self, repo_path: &Path) -> Result<usize> {
        let repo = self.open(repo_path)?;
        let mut opts = StatusOptions::new();
        opts.include_untracked(true).include_ignored(false);
        Ok(repo.statuses(Some(&mut opts))?.len())
    }

    /// Discard every local modification and remove untracked files.
    ///
    /// Destructive. Callers must have confirmed intent.
    pub fn hard_reset_and_clean(&self, repo_path: &Path) -> Result<()> {
        let repo = self.open(repo_path)?;
        let head = repo.head()?.peel(ObjectType::Commit)?;
        repo.reset(&head, ResetType::Hard, Some(CheckoutBuilder::new().force()))?;

        let mut opts = StatusOptions::new();
        opts.include_untracked(true)
            .recurse_untracked_dirs(false)
            .include_ignored(false);
        let untracked: Vec<PathBuf> = repo
            .statuses(Some(&mut opts))?
            .iter()
            .filter(|entry| entry.status().contains(Status::WT_NEW))
            .filter_map(|entry| entry.path().map(|p| repo_path.join(p)))
            .collect();

        for path in untracked {
            if path.is_dir() {
                io::remove_dir_all_robust(&path)?;
            } else {
                io::remove_file_robust(&path)?;
            }
        }

        tracing::info!(path = %repo_path.display(), "Discarded local changes");
        Ok(())
    }

    /// Every blob path in HEAD's tree, slash-separated.
    pub fn tracked_files(&self, repo_path: &Path) -> Result<Vec<String>> {
        let repo = self.open(repo_path)?;
        let tree = repo.head()?.peel_to_tree()?;
        let mut files = Vec::new();
        tree.walk(TreeWalkMode::PreOrder, |root, entry| {
            if entry.kind() == Some(ObjectType::Blob)
                && let Some(name) = entry.name()
            {
                files.push(format!("{root}{name}"));
            }
            TreeWalkResult::Ok
        })?;
        files.sort();
        Ok(files)
    }

    /// Delete a repository directory, including read-only object files.
    pub fn delete_repository(&self, path: &Path) -> Result<()> {
        io::remove_dir_all_robust(path)?;
        Ok(())
    }
}

fn branch_refspec(branch: &str) -> String {
    format!("+refs/heads/{branch}:refs/remotes/{ORIGIN}/{branch}")
}

fn remote_ref(branch: &str) -> String {
    format!("refs/remotes/{ORIGIN}/{branch}")
}

fn checkout_branch(repo: &Repository, branch: &str) -> Result<()> {
    let local = match repo.find_branch(branch, BranchType::Local) {
        Ok(existing) => existing,
        Err(_) => {
            let commit = repo.find_reference(&remote_ref(branch))?.peel_to_commit()?;
            let mut created = repo.branch(branch, &commit, false)?;
            created.set_upstream(Some(&format!("{ORIGIN}/{branch}")))?;
            created
        }
    };

    let target = local.get().peel(ObjectType::Commit)?;
    repo.checkout_tree(&target, Some(CheckoutBuilder::new().force()))?;
    repo.set_head(&format!("refs/heads/{branch}"))?;

    tracing::debug!(branch = %branch, "Checked out branch");
    Ok(())
}

fn same_dir(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
