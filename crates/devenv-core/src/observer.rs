//! Per-resource progress reporting
//!
//! Transfer progress from the git driver and package sources carries no
//! resource name. [`ResourceProgress`] tags it so a single observer can
//! follow several concurrent plugin updates.

use devenv_git::{ProgressEvent, ProgressSink};

use crate::Error;

/// Receives reconciliation events. Every method defaults to a no-op.
pub trait ReconcileObserver: Send + Sync {
    fn resource_started(&self, _name: &str, _action: &str) {}

    fn resource_finished(&self, _name: &str, _outcome: std::result::Result<(), &Error>) {}

    fn stage(&self, _name: &str, _stage: &str) {}

    fn progress(&self, _name: &str, _event: &ProgressEvent) {}
}

/// Ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl ReconcileObserver for NullObserver {}

/// Adapts an observer into a [`ProgressSink`] for one resource.
pub struct ResourceProgress<'a> {
    name: &'a str,
    observer: &'a dyn ReconcileObserver,
}

impl<'a> ResourceProgress<'a> {
    pub fn new(name: &'a str, observer: &'a dyn ReconcileObserver) -> Self {
        Self { name, observer }
    }
}

impl ProgressSink for ResourceProgress<'_> {
    fn on_stage(&self, stage: &str) {
        self.observer.stage(self.name, stage);
    }

    fn on_progress(&self, event: &ProgressEvent) {
        self.observer.progress(self.name, event);
    }
}
