//! Plugin installer
//!
//! Keeps one plugin repository checked out at its declared branch.
//!
//! ```text
//! Absent --clone--> Cloned(branch)
//! Cloned(b1) + desired b2, clean  --fetch + checkout--> Cloned(b2)
//! Cloned(b)  + dirty              => refused unless forced
//! forced on dirty                 --reset + clean, then checkout-->
//! ```
//!
//! Install records live under `<env>/.devenv/plugins/` rather than inside the
//! working tree, so recording an install never dirties the tree it records.

use std::path::{Path, PathBuf};

use devenv_fs::io;
use devenv_git::{CancellationToken, GitDriver, Head, ProgressSink};
use devenv_meta::PluginSpec;

use crate::manifest::{self, PluginManifest, PluginManifestEntry};
use crate::slug::path_slug;
use crate::status::{ResourceKind, ResourceStatus};
use crate::{Error, Result};

/// Directory under the environment root holding devenv's own state.
pub const STATE_DIR: &str = devenv_meta::STATE_DIR;

pub struct PluginInstaller {
    spec: PluginSpec,
    dir: PathBuf,
    manifest_path: PathBuf,
    git: GitDriver,
}

impl PluginInstaller {
    pub fn new(env_root: &Path, spec: PluginSpec, git: GitDriver) -> Self {
        let dir = spec.install_dir(env_root);
        let manifest_path = env_root
            .join(STATE_DIR)
            .join("plugins")
            .join(format!("{}.lock.json", path_slug(&spec.path_key())));
        Self {
            spec,
            dir,
            manifest_path,
            git,
        }
    }

    pub fn name(&self) -> &str {
        &self.spec.path
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn manifest_path(&self) -> &Path {
        &self.manifest_path
    }

    /// Install history, refusing newer manifest schemas.
    pub fn manifest(&self) -> Result<Option<PluginManifest>> {
        PluginManifest::load_checked(&self.manifest_path)
    }

    /// A directory that exists, has content, and is not a repository root.
    fn is_foreign(&self) -> Result<bool> {
        Ok(!io::is_absent_or_empty(&self.dir)? && !self.git.is_repository(&self.dir))
    }

    fn status(&self, detail: impl Into<String>) -> ResourceStatus {
        ResourceStatus::out_of_date(ResourceKind::Plugin, &self.spec.path, detail)
    }

    /// Compare the checkout against the declared branch.
    ///
    /// Only the branch name counts: a detached HEAD is out of date even when
    /// it sits on the branch's commit.
    pub fn get_status(&self) -> Result<ResourceStatus> {
        let manifest = self.manifest()?;
        let branch = &self.spec.branch;

        if io::is_absent_or_empty(&self.dir)? {
            return Ok(self.status(format!("not installed, wanted {branch}")));
        }
        if self.is_foreign()? {
            return Ok(self
                .status("exists but is not a git repository")
                .with_dirty("unknown contents"));
        }

        let mut status = match self.git.current_branch(&self.dir)? {
            Head::Branch(current) if current == *branch => {
                if manifest.is_some() {
                    let detail = format!("on {branch}");
                    ResourceStatus::up_to_date(ResourceKind::Plugin, &self.spec.path, detail)
                } else {
                    self.status(format!("on {branch}, no install record"))
                }
            }
            Head::Branch(current) => self.status(format!("on {current}, expected {branch}")),
            Head::Detached => self.status(format!("detached HEAD, expected {branch}")),
        };

        if !self.git.is_working_tree_clean(&self.dir)? {
            let changes = self.git.change_count(&self.dir)?;
            status = status.with_dirty(format!("{changes} local changes"));
        }
        Ok(status)
    }

    /// True if the working tree has no local changes. A missing checkout is
    /// clean; a non-repository directory is not.
    pub fn is_clean(&self) -> Result<bool> {
        if io::is_absent_or_empty(&self.dir)? {
            return Ok(true);
        }
        if self.is_foreign()? {
            return Ok(false);
        }
        Ok(self.git.is_working_tree_clean(&self.dir)?)
    }

    /// Bring the checkout to the declared branch and record the result.
    ///
    /// # Errors
    ///
    /// - [`Error::UnsupportedManifestVersion`] before anything is touched
    /// - [`Error::DirtyWorkingTree`] if local changes exist and `force` is off
    pub fn install_or_update(
        &self,
        force: bool,
        progress: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<PluginManifestEntry> {
        let mut manifest = self.manifest()?.unwrap_or_default();
        let branch = &self.spec.branch;

        if io::is_absent_or_empty(&self.dir)? {
            self.git
                .clone_repository(&self.spec.url, branch, &self.dir, progress, cancel)?;
        } else if self.is_foreign()? {
            if !force {
                return Err(Error::DirtyWorkingTree {
                    path: self.dir.clone(),
                });
            }
            tracing::warn!(path = %self.dir.display(), "Replacing non-repository directory");
            self.git.delete_repository(&self.dir)?;
            self.git
                .clone_repository(&self.spec.url, branch, &self.dir, progress, cancel)?;
        } else {
            if !self.git.is_working_tree_clean(&self.dir)? {
                if !force {
                    return Err(Error::DirtyWorkingTree {
                        path: self.dir.clone(),
                    });
                }
                self.git.hard_reset_and_clean(&self.dir)?;
            }
            self.git
                .fetch_and_checkout(&self.dir, branch, progress, cancel)?;
        }

        let entry = PluginManifestEntry {
            version: format!("{branch}@{}", self.git.head_commit(&self.dir)?),
            installed_files: self.git.tracked_files(&self.dir)?,
        };
        manifest.append(entry.clone());
        manifest::save(&self.manifest_path, &manifest)?;

        tracing::info!(plugin = %self.spec.path, version = %entry.version, "Plugin updated");
        Ok(entry)
    }
}
