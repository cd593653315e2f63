//! Per-resource status
//!
//! Computed fresh on every query and never persisted.

use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Core,
    Plugin,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::Core => write!(f, "core"),
            ResourceKind::Plugin => write!(f, "plugin"),
        }
    }
}

/// Observed state of one resource against its desired state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceStatus {
    pub kind: ResourceKind,
    /// Display name: the core directory or the plugin install path.
    pub name: String,
    pub is_up_to_date: bool,
    /// Local files differ from what was installed.
    pub is_dirty: bool,
    /// Human-readable reason, e.g. `on main, expected feature-x`.
    pub detail: String,
}

impl ResourceStatus {
    pub fn up_to_date(
        kind: ResourceKind,
        name: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            name: name.into(),
            is_up_to_date: true,
            is_dirty: false,
            detail: detail.into(),
        }
    }

    pub fn out_of_date(
        kind: ResourceKind,
        name: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            name: name.into(),
            is_up_to_date: false,
            is_dirty: false,
            detail: detail.into(),
        }
    }

    /// Mark dirty, appending `reason` to the detail.
    pub fn with_dirty(mut self, reason: impl AsRef<str>) -> Self {
        self.is_dirty = true;
        if self.detail.is_empty() {
            self.detail = reason.as_ref().to_string();
        } else {
            self.detail = format!("{}; {}", self.detail, reason.as_ref());
        }
        self
    }

    /// Needs an update that local changes would block.
    pub fn blocks_update(&self) -> bool {
        !self.is_up_to_date && self.is_dirty
    }
}
