//! Atomic writes and permission-tolerant deletes

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use fs2::FileExt;
use walkdir::WalkDir;

use crate::{Error, Result};

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Write content atomically to a file with locking.
///
/// Uses write-to-temp-then-rename so readers observe either the old or the
/// new content, never a partial write. The temp file lives in the target's
/// directory to keep the rename on one filesystem.
pub fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }

    let temp_name = format!(
        ".{}.{}.{}.tmp",
        path.file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default(),
        std::process::id(),
        TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
    );
    let temp_path = path.with_file_name(&temp_name);

    let result = (|| {
        let mut temp_file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)
            .map_err(|e| Error::io(&temp_path, e))?;

        temp_file.lock_exclusive().map_err(|_| Error::LockFailed {
            path: path.to_path_buf(),
        })?;

        temp_file
            .write_all(content)
            .map_err(|e| Error::io(&temp_path, e))?;
        temp_file.sync_all().map_err(|e| Error::io(&temp_path, e))?;

        temp_file.unlock().map_err(|_| Error::LockFailed {
            path: path.to_path_buf(),
        })?;
        drop(temp_file);

        fs::rename(&temp_path, path).map_err(|e| Error::io(path, e))
    })();

    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    result
}

/// Read text content from a file.
pub fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| Error::io(path, e))
}

/// True if `path` does not exist or is a directory with no entries.
pub fn is_absent_or_empty(path: &Path) -> Result<bool> {
    if !path.exists() {
        return Ok(true);
    }
    let mut entries = fs::read_dir(path).map_err(|e| Error::io(path, e))?;
    Ok(entries.next().is_none())
}

#[allow(clippy::permissions_set_readonly_false)]
fn make_writable(path: &Path) -> Result<()> {
    let meta = fs::symlink_metadata(path).map_err(|e| Error::io(path, e))?;
    if meta.file_type().is_symlink() {
        return Ok(());
    }
    let mut perms = meta.permissions();
    if perms.readonly() {
        perms.set_readonly(false);
        fs::set_permissions(path, perms).map_err(|e| Error::io(path, e))?;
    }
    Ok(())
}

/// Remove a single file, clearing a read-only attribute first if present.
///
/// A file that is already gone is not an error.
pub fn remove_file_robust(path: &Path) -> Result<()> {
    match fs::symlink_metadata(path) {
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(Error::io(path, e)),
        Ok(_) => {}
    }
    make_writable(path)?;
    fs::remove_file(path).map_err(|e| Error::io(path, e))
}

/// Recursively delete a directory tree.
///
/// Git marks its object database read-only, and a plain `remove_dir_all`
/// fails on those files on Windows. Every entry has its read-only bit
/// cleared (directories first, so their children become deletable) before
/// the tree is removed bottom-up.
pub fn remove_dir_all_robust(path: &Path) -> Result<()> {
    if fs::symlink_metadata(path).is_err() {
        return Ok(());
    }

    for entry in WalkDir::new(path) {
        let entry = entry.map_err(|e| walk_error(path, e))?;
        make_writable(entry.path())?;
    }

    for entry in WalkDir::new(path).contents_first(true) {
        let entry = entry.map_err(|e| walk_error(path, e))?;
        let p = entry.path();
        if entry.file_type().is_dir() {
            fs::remove_dir(p).map_err(|e| Error::io(p, e))?;
        } else {
            fs::remove_file(p).map_err(|e| Error::io(p, e))?;
        }
    }

    tracing::debug!(path = %path.display(), "Removed directory tree");
    Ok(())
}

/// Remove every empty directory below `root`, bottom-up.
///
/// `root` itself is removed too when `include_root` is set and it ends up
/// empty. Directories that still hold files are left alone.
pub fn remove_empty_dirs(root: &Path, include_root: bool) -> Result<()> {
    if !root.is_dir() {
        return Ok(());
    }
    for entry in WalkDir::new(root).contents_first(true).min_depth(1) {
        let entry = entry.map_err(|e| walk_error(root, e))?;
        if entry.file_type().is_dir() && is_absent_or_empty(entry.path())? {
            fs::remove_dir(entry.path()).map_err(|e| Error::io(entry.path(), e))?;
        }
    }
    if include_root && is_absent_or_empty(root)? {
        fs::remove_dir(root).map_err(|e| Error::io(root, e))?;
    }
    Ok(())
}

fn walk_error(root: &Path, e: walkdir::Error) -> Error {
    let path = e.path().unwrap_or(root).to_path_buf();
    let source = e
        .into_io_error()
        .unwrap_or_else(|| std::io::Error::other("filesystem loop detected"));
    Error::io(path, source)
}
