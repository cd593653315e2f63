//! Reconciliation results

use std::fmt;

use serde::Serialize;

use crate::Error;
use crate::status::{ResourceKind, ResourceStatus};

/// A status check that could not complete for one resource.
#[derive(Debug)]
pub struct ResourceFailure {
    pub kind: ResourceKind,
    pub name: String,
    pub error: Error,
}

impl fmt::Display for ResourceFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.kind, self.name, self.error)
    }
}

/// Outcome of checking one resource.
pub type ResourceCheck = std::result::Result<ResourceStatus, ResourceFailure>;

/// What an update would do to one resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedAction {
    pub kind: ResourceKind,
    pub name: String,
    pub description: String,
}

/// A resource that was not brought up to date, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedResource {
    pub kind: ResourceKind,
    pub name: String,
    pub reason: String,
}

/// Summary of one reconciliation batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UpdateReport {
    /// True if nothing was executed.
    pub dry_run: bool,
    /// Actions a dry run would have taken.
    pub planned: Vec<PlannedAction>,
    pub updated: Vec<String>,
    /// Already up to date.
    pub skipped: Vec<String>,
    pub failed: Vec<FailedResource>,
}

impl UpdateReport {
    pub fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            ..Self::default()
        }
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn fail(&mut self, kind: ResourceKind, name: impl Into<String>, reason: impl fmt::Display) {
        self.failed.push(FailedResource {
            kind,
            name: name.into(),
            reason: reason.to_string(),
        });
    }

    /// One-line summary, e.g. `2 updated, 1 up to date, 0 failed`.
    pub fn summary(&self) -> String {
        if self.dry_run {
            format!(
                "{} planned, {} up to date, {} failed",
                self.planned.len(),
                self.skipped.len(),
                self.failed.len()
            )
        } else {
            format!(
                "{} updated, {} up to date, {} failed",
                self.updated.len(),
                self.skipped.len(),
                self.failed.len()
            )
        }
    }
}
