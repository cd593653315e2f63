//! Desired-state types
//!
//! Unknown keys at the top level, under `organization`, under `core`, and on
//! each plugin entry are kept in `extra` maps and written back unchanged.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use devenv_fs::NormalizedPath;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Error;

/// Default core installation directory under the environment root.
pub const DEFAULT_CORE_DIR: &str = "Rock";

/// Directory under the environment root holding devenv's own state.
pub const STATE_DIR: &str = ".devenv";

/// The wanted core distribution version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum VersionSpec {
    Semantic(semver::Version),
    /// The core is not managed; always satisfied.
    Custom,
}

impl VersionSpec {
    pub fn is_custom(&self) -> bool {
        matches!(self, VersionSpec::Custom)
    }
}

impl FromStr for VersionSpec {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("custom") {
            return Ok(VersionSpec::Custom);
        }
        semver::Version::parse(trimmed)
            .map(VersionSpec::Semantic)
            .map_err(|_| Error::InvalidVersion {
                value: s.to_string(),
            })
    }
}

impl TryFrom<String> for VersionSpec {
    type Error = Error;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<VersionSpec> for String {
    fn from(spec: VersionSpec) -> Self {
        spec.to_string()
    }
}

impl fmt::Display for VersionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionSpec::Semantic(v) => write!(f, "{v}"),
            VersionSpec::Custom => write!(f, "custom"),
        }
    }
}

/// Organization identity used for generated namespaces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Organization {
    pub name: String,
    pub code: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoreSpec {
    pub version: VersionSpec,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One plugin repository to keep checked out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginSpec {
    /// Install path relative to the environment root.
    pub path: String,
    pub url: String,
    pub branch: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PluginSpec {
    pub fn new(path: impl Into<String>, url: impl Into<String>, branch: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            url: url.into(),
            branch: branch.into(),
            extra: Map::new(),
        }
    }

    /// Absolute install directory under `root`.
    pub fn install_dir(&self, root: &Path) -> PathBuf {
        NormalizedPath::new(&self.path).under(root)
    }

    /// Normalized key used for uniqueness checks and lock names.
    ///
    /// Empty and `.` segments are dropped, so `./` and `.` yield `""`.
    pub fn path_key(&self) -> String {
        NormalizedPath::new(&self.path)
            .as_str()
            .split('/')
            .filter(|part| !part.is_empty() && *part != ".")
            .collect::<Vec<_>>()
            .join("/")
    }
}

/// True if the directory keyed `inner` is `outer` or lies below it.
/// Keys compare case-insensitively.
pub fn is_same_or_nested(outer: &str, inner: &str) -> bool {
    let outer = outer.to_lowercase();
    let inner = inner.to_lowercase();
    inner == outer || inner.starts_with(&format!("{outer}/"))
}

/// Everything `environment.json` declares.
///
/// Loaded once per command and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesiredEnvironment {
    pub organization: Organization,
    pub core: CoreSpec,
    #[serde(default)]
    pub plugins: Vec<PluginSpec>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DesiredEnvironment {
    pub fn core_version(&self) -> &VersionSpec {
        &self.core.version
    }

    /// Look up a plugin by its install path.
    pub fn plugin(&self, path: &str) -> Option<&PluginSpec> {
        let key = PluginSpec::new(path, "", "").path_key();
        self.plugins.iter().find(|p| p.path_key() == key)
    }

    pub fn to_json_pretty(&self) -> String {
        // Maps of JSON values and plain strings always serialize.
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}
