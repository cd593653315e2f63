//! Core distribution package sources
//!
//! A package is a zip archive named `{version}.zip` whose entries are
//! relative to the core installation root. Sources only fetch bytes;
//! extraction belongs to the core installer.

use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use devenv_git::progress::StageTracker;
use devenv_git::{CancellationToken, ProgressSink};
use reqwest::StatusCode;
use reqwest::blocking::Client;

use crate::{Error, Result};

const CHUNK_SIZE: usize = 64 * 1024;

/// Stage label reported while fetching.
pub const DOWNLOAD_STAGE: &str = "downloading";

/// Where packages come from.
pub trait PackageSource: Send + Sync {
    /// Human-readable location of `version`'s package.
    fn location(&self, version: &str) -> String;

    /// Write the package for `version` to `dest`, returning its size.
    ///
    /// On error `dest` may hold a partial download; callers must discard it.
    fn fetch(
        &self,
        version: &str,
        dest: &Path,
        progress: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<u64>;
}

/// Timeouts applied to HTTP package downloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpTimeouts {
    pub connect: Duration,
    /// Whole-request limit, body included.
    pub total: Duration,
}

impl Default for HttpTimeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(30),
            total: Duration::from_secs(30 * 60),
        }
    }
}

/// Packages served over HTTP(S) at `{base_url}/{version}.zip`.
#[derive(Debug, Clone)]
pub struct HttpPackageSource {
    base_url: String,
    client: Client,
}

impl HttpPackageSource {
    pub fn new(base_url: impl Into<String>, timeouts: HttpTimeouts) -> Result<Self> {
        let base_url = base_url.into();
        let client = Client::builder()
            .connect_timeout(timeouts.connect)
            .timeout(timeouts.total)
            .user_agent(concat!("devenv/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Download {
                url: base_url.clone(),
                message: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self { base_url, client })
    }

    fn url(&self, version: &str) -> String {
        format!("{}/{version}.zip", self.base_url.trim_end_matches('/'))
    }
}

impl PackageSource for HttpPackageSource {
    fn location(&self, version: &str) -> String {
        self.url(version)
    }

    fn fetch(
        &self,
        version: &str,
        dest: &Path,
        progress: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<u64> {
        let url = self.url(version);
        tracing::info!(url = %url, "Downloading package");

        let mut response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| classify(&url, e))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(Error::PackageNotFound {
                version: version.to_string(),
                location: url,
            });
        }
        if !response.status().is_success() {
            let status = response.status();
            let error = Error::Download {
                url,
                message: format!("server responded with {status}"),
            };
            return Err(if status.is_server_error() {
                Error::Transient {
                    operation: "download".into(),
                    message: error.to_string(),
                }
            } else {
                error
            });
        }

        let total = response.content_length().unwrap_or(0);
        copy_with_progress(&mut response, dest, total, progress, cancel, &url)
    }
}

fn classify(url: &str, e: reqwest::Error) -> Error {
    if e.is_timeout() || e.is_connect() || e.is_request() || e.is_body() {
        Error::Transient {
            operation: format!("download {url}"),
            message: e.to_string(),
        }
    } else {
        Error::Download {
            url: url.to_string(),
            message: e.to_string(),
        }
    }
}

/// Packages stored as `{dir}/{version}.zip`.
#[derive(Debug, Clone)]
pub struct DirectoryPackageSource {
    dir: PathBuf,
}

impl DirectoryPackageSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, version: &str) -> PathBuf {
        self.dir.join(format!("{version}.zip"))
    }
}

impl PackageSource for DirectoryPackageSource {
    fn location(&self, version: &str) -> String {
        self.path(version).display().to_string()
    }

    fn fetch(
        &self,
        version: &str,
        dest: &Path,
        progress: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<u64> {
        let path = self.path(version);
        let mut file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::PackageNotFound {
                    version: version.to_string(),
                    location: path.display().to_string(),
                });
            }
            Err(e) => return Err(Error::io(&path, e)),
        };
        let total = file.metadata().map(|m| m.len()).unwrap_or(0);
        copy_with_progress(&mut file, dest, total, progress, cancel, &path.display().to_string())
    }
}

/// Pick a source from a `--source` value: `http(s)://` URLs download,
/// `file://` URLs and plain paths read from a directory.
pub fn package_source_from(spec: &str, timeouts: HttpTimeouts) -> Result<Arc<dyn PackageSource>> {
    if spec.starts_with("http://") || spec.starts_with("https://") {
        return Ok(Arc::new(HttpPackageSource::new(spec, timeouts)?));
    }
    let dir = spec.strip_prefix("file://").unwrap_or(spec);
    Ok(Arc::new(DirectoryPackageSource::new(dir)))
}

fn copy_with_progress(
    reader: &mut dyn Read,
    dest: &Path,
    total: u64,
    progress: &dyn ProgressSink,
    cancel: &CancellationToken,
    origin: &str,
) -> Result<u64> {
    let mut out = File::create(dest).map_err(|e| Error::io(dest, e))?;
    let mut tracker = StageTracker::new(progress);
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut written: u64 = 0;

    tracker.report(DOWNLOAD_STAGE, 0, total as usize);
    loop {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled {
                operation: "download".into(),
            });
        }
        let n = reader.read(&mut buf).map_err(|e| Error::Transient {
            operation: format!("download {origin}"),
            message: e.to_string(),
        })?;
        if n == 0 {
            break;
        }
        out.write_all(&buf[..n]).map_err(|e| Error::io(dest, e))?;
        written += n as u64;
        tracker.report(DOWNLOAD_STAGE, written as usize, total as usize);
    }
    out.sync_all().map_err(|e| Error::io(dest, e))?;
    Ok(written)
}
