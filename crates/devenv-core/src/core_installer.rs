//! Core distribution installer
//!
//! Installs a released core package into `<env>/<core_dir>` and records a
//! hash for every file it places there. State per installation root:
//!
//! ```text
//! Absent --install--> Installed(version, manifest)
//! Installed(v1) + desired v2 not satisfied  => out of date
//! Installed(v)  + drift                      => dirty
//! any           --force_remove-->            Absent
//! ```

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use devenv_fs::{NormalizedPath, checksum, io};
use devenv_git::progress::StageTracker;
use devenv_git::{CancellationToken, ProgressSink};
use devenv_meta::VersionSpec;
use tempfile::NamedTempFile;
use walkdir::WalkDir;
use zip::ZipArchive;

use crate::manifest::{self, CORE_MANIFEST_FILE, CoreManifest};
use crate::package::PackageSource;
use crate::status::{ResourceKind, ResourceStatus};
use crate::version;
use crate::{Error, Result};

/// Stage label reported while unpacking.
pub const EXTRACT_STAGE: &str = "extracting";

pub struct CoreInstaller {
    root: PathBuf,
    name: String,
    source: Arc<dyn PackageSource>,
}

impl CoreInstaller {
    /// `root` is the core installation directory itself.
    pub fn new(root: impl Into<PathBuf>, source: Arc<dyn PackageSource>) -> Self {
        let root = root.into();
        let name = root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "core".to_string());
        Self { root, name, source }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.root.join(CORE_MANIFEST_FILE)
    }

    /// The recorded installation, if any.
    pub fn installed(&self) -> Option<CoreManifest> {
        manifest::load(&self.manifest_path())
    }

    /// Compare the installation against `desired`.
    ///
    /// A non-empty root without a readable manifest is unknown state: out of
    /// date and dirty, so only a forced update replaces it.
    pub fn get_status(&self, desired: &VersionSpec) -> Result<ResourceStatus> {
        if desired.is_custom() {
            return Ok(ResourceStatus::up_to_date(
                ResourceKind::Core,
                &self.name,
                "custom build, not managed",
            ));
        }

        let Some(installed) = self.installed() else {
            if io::is_absent_or_empty(&self.root)? {
                return Ok(ResourceStatus::out_of_date(
                    ResourceKind::Core,
                    &self.name,
                    format!("not installed, wanted {desired}"),
                ));
            }
            return Ok(ResourceStatus::out_of_date(
                ResourceKind::Core,
                &self.name,
                format!("no install record, wanted {desired}"),
            )
            .with_dirty("unmanaged files present"));
        };

        let satisfied = semver::Version::parse(&installed.version)
            .map(|v| version::satisfies(&v, desired))
            .unwrap_or(false);

        let mut status = if satisfied {
            ResourceStatus::up_to_date(ResourceKind::Core, &self.name, installed.version.clone())
        } else {
            ResourceStatus::out_of_date(
                ResourceKind::Core,
                &self.name,
                format!("installed {}, wanted {desired}", installed.version),
            )
        };

        let drift = manifest::compute_drift(&installed, &self.root)?;
        if !drift.is_empty() {
            tracing::debug!(
                root = %self.root.display(),
                modified = ?drift.modified,
                missing = ?drift.missing,
                "Core drift detected"
            );
            status = status.with_dirty(drift.summary());
        }
        Ok(status)
    }

    /// Download, extract, and record `version`.
    ///
    /// The root must be absent or empty. A failed or cancelled download
    /// leaves the root untouched; a failed or cancelled extraction removes
    /// every file written in this attempt.
    pub fn install(
        &self,
        version: &semver::Version,
        progress: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<CoreManifest> {
        self.ensure_empty_root()?;
        let package = self.download(version, progress, cancel)?;
        self.install_package(package.path(), version, progress, cancel)
    }

    /// Replace whatever is installed with `version`.
    ///
    /// The package is downloaded before anything is removed, so a download
    /// failure leaves the current installation in place. Without `force` only
    /// manifest-listed files are removed and leftover user files make the
    /// install refuse; with `force` the root is deleted outright.
    pub fn replace(
        &self,
        version: &semver::Version,
        force: bool,
        progress: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<CoreManifest> {
        let package = self.download(version, progress, cancel)?;
        if cancel.is_cancelled() {
            return Err(Error::Cancelled {
                operation: "install".into(),
            });
        }
        if force {
            self.force_remove()?;
        } else {
            if let Some(installed) = self.installed()
                && self.has_unmanaged_files(&installed)?
            {
                return Err(Error::InstallRootNotEmpty {
                    path: self.root.clone(),
                });
            }
            self.remove()?;
        }
        self.ensure_empty_root()?;
        self.install_package(package.path(), version, progress, cancel)
    }

    /// True if the root holds files the manifest does not list.
    fn has_unmanaged_files(&self, installed: &CoreManifest) -> Result<bool> {
        for entry in WalkDir::new(&self.root).min_depth(1) {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(&self.root).to_path_buf();
                Error::io(path, e.into())
            })?;
            if entry.file_type().is_dir() {
                continue;
            }
            let rel = NormalizedPath::relative(&self.root, entry.path())?;
            if rel.as_str() != CORE_MANIFEST_FILE && !installed.files.contains_key(rel.as_str()) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn ensure_empty_root(&self) -> Result<()> {
        if io::is_absent_or_empty(&self.root)? {
            Ok(())
        } else {
            Err(Error::InstallRootNotEmpty {
                path: self.root.clone(),
            })
        }
    }

    /// Fetch the package for `version` into a temporary file that is deleted
    /// when dropped.
    fn download(
        &self,
        version: &semver::Version,
        progress: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<NamedTempFile> {
        let package = tempfile::Builder::new()
            .prefix("devenv-package-")
            .suffix(".zip")
            .tempfile()
            .map_err(|e| Error::io(std::env::temp_dir(), e))?;
        let size = self
            .source
            .fetch(&version.to_string(), package.path(), progress, cancel)?;
        tracing::debug!(
            location = %self.source.location(&version.to_string()),
            bytes = size,
            "Package downloaded"
        );
        Ok(package)
    }

    fn install_package(
        &self,
        package: &Path,
        version: &semver::Version,
        progress: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<CoreManifest> {
        let version = version.to_string();
        let root_existed = self.root.exists();
        let mut written = Vec::new();
        let result = self
            .extract(package, progress, cancel, &mut written)
            .and_then(|files| {
                let manifest = CoreManifest {
                    version: version.clone(),
                    files,
                };
                manifest::save(&self.manifest_path(), &manifest)?;
                Ok(manifest)
            });

        match result {
            Ok(manifest) => {
                tracing::info!(
                    root = %self.root.display(),
                    version = %version,
                    files = manifest.files.len(),
                    "Installed core"
                );
                Ok(manifest)
            }
            Err(e) => {
                tracing::warn!(
                    root = %self.root.display(),
                    error = %e,
                    "Install failed, removing extracted files"
                );
                for path in &written {
                    io::remove_file_robust(path)?;
                }
                io::remove_empty_dirs(&self.root, !root_existed)?;
                Err(e)
            }
        }
    }

    /// Unpack every entry, recording each file written in `written` as soon
    /// as it is created.
    fn extract(
        &self,
        package: &Path,
        progress: &dyn ProgressSink,
        cancel: &CancellationToken,
        written: &mut Vec<PathBuf>,
    ) -> Result<BTreeMap<String, String>> {
        let invalid = |message: String| Error::InvalidPackage {
            path: package.to_path_buf(),
            message,
        };

        let file = File::open(package).map_err(|e| Error::io(package, e))?;
        let mut archive = ZipArchive::new(file).map_err(|e| invalid(e.to_string()))?;
        let total = archive.len();
        let mut tracker = StageTracker::new(progress);
        let mut files = BTreeMap::new();

        fs::create_dir_all(&self.root).map_err(|e| Error::io(&self.root, e))?;

        for i in 0..total {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled {
                    operation: "extract".into(),
                });
            }
            let mut entry = archive.by_index(i).map_err(|e| invalid(e.to_string()))?;
            let rel = NormalizedPath::new(entry.name().trim_end_matches('/'));
            if !rel.is_contained() {
                return Err(invalid(format!("entry '{}' escapes the install root", entry.name())));
            }
            if rel.as_str() == CORE_MANIFEST_FILE {
                return Err(invalid(format!("entry '{}' is reserved", entry.name())));
            }

            let out = rel.under(&self.root);
            if entry.is_dir() {
                fs::create_dir_all(&out).map_err(|e| Error::io(&out, e))?;
            } else {
                if let Some(parent) = out.parent() {
                    fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
                }
                let mut dest = File::create(&out).map_err(|e| Error::io(&out, e))?;
                written.push(out.clone());
                std::io::copy(&mut entry, &mut dest)
                    .map_err(|e| invalid(format!("failed to extract '{}': {e}", rel)))?;
                drop(dest);
                files.insert(rel.as_str().to_string(), checksum::hash_file(&out)?);
            }
            tracker.report(EXTRACT_STAGE, i + 1, total);
        }
        Ok(files)
    }

    /// Delete exactly what the manifest lists, then the manifest, then any
    /// directories left empty, then the root if it is empty.
    ///
    /// Files the user added alongside the installation survive.
    pub fn remove(&self) -> Result<()> {
        let Some(installed) = self.installed() else {
            if io::is_absent_or_empty(&self.root)? {
                return Ok(());
            }
            return Err(Error::UnmanagedDirectory {
                path: self.root.clone(),
            });
        };

        for rel in installed.files.keys() {
            let normalized = NormalizedPath::new(rel);
            if !normalized.is_contained() {
                tracing::warn!(path = %rel, "Skipping manifest entry outside the install root");
                continue;
            }
            io::remove_file_robust(&normalized.under(&self.root))?;
        }
        io::remove_file_robust(&self.manifest_path())?;
        io::remove_empty_dirs(&self.root, true)?;

        tracing::info!(root = %self.root.display(), version = %installed.version, "Removed core");
        Ok(())
    }

    /// Delete the whole installation root, managed or not.
    pub fn force_remove(&self) -> Result<()> {
        io::remove_dir_all_robust(&self.root)?;
        tracing::info!(root = %self.root.display(), "Force-removed core");
        Ok(())
    }
}
