//! Transfer progress and cancellation
//!
//! Progress arrives from two libgit2 callbacks: server sideband text
//! (`Counting objects:  50% (5/10)`) and local transfer counters. Both are
//! folded into one stream of [`ProgressEvent`]s. A stage transition is always
//! delivered as its own event so sinks can reset their totals.

use std::sync::Arc;
use std::sync::LazyLock;
use std::sync::atomic::{AtomicBool, Ordering};

use regex::Regex;

/// One progress observation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    /// Lowercase stage label, e.g. `"receiving objects"`.
    pub stage: String,
    pub processed: usize,
    pub total: usize,
}

/// Receiver for progress events. Implementations must be cheap; they run
/// inside transfer callbacks.
pub trait ProgressSink: Send + Sync {
    /// Called once when a new stage begins, before its first event.
    fn on_stage(&self, _stage: &str) {}

    fn on_progress(&self, event: &ProgressEvent);
}

/// Discards all progress.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn on_progress(&self, _event: &ProgressEvent) {}
}

/// Shared flag used to abort long-running transfers.
///
/// Cloned tokens observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

static SIDEBAND_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:remote:\s*)?([A-Za-z][A-Za-z ]*?):\s+(?:\d+%\s+\((\d+)/(\d+)\)|(\d+))")
        .expect("Invalid sideband regex")
});

/// Folds raw callback data into deduplicated, stage-aware events.
pub struct StageTracker<'a> {
    sink: &'a dyn ProgressSink,
    current: Option<String>,
    last: Option<(usize, usize)>,
}

impl<'a> StageTracker<'a> {
    pub fn new(sink: &'a dyn ProgressSink) -> Self {
        Self {
            sink,
            current: None,
            last: None,
        }
    }

    /// Report a counter for `stage`.
    pub fn report(&mut self, stage: &str, processed: usize, total: usize) {
        if self.current.as_deref() != Some(stage) {
            self.current = Some(stage.to_string());
            self.last = None;
            self.sink.on_stage(stage);
        } else if self.last == Some((processed, total)) {
            return;
        }
        self.last = Some((processed, total));
        self.sink.on_progress(&ProgressEvent {
            stage: stage.to_string(),
            processed,
            total,
        });
    }

    /// Parse server sideband output. Segments are split on `\r` and `\n`.
    pub fn sideband(&mut self, data: &[u8]) {
        let text = String::from_utf8_lossy(data);
        for segment in text.split(['\r', '\n']) {
            let Some(caps) = SIDEBAND_LINE.captures(segment.trim()) else {
                continue;
            };
            let stage = caps[1].trim().to_lowercase();
            let parse = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<usize>().ok());
            match (parse(2), parse(3), parse(4)) {
                (Some(n), Some(t), _) => self.report(&stage, n, t),
                (_, _, Some(count)) => self.report(&stage, count, count),
                _ => {}
            }
        }
    }

    /// Fold libgit2's local transfer counters.
    pub fn transfer(&mut self, progress: &git2::Progress<'_>) {
        let received = progress.received_objects();
        let total = progress.total_objects();
        if total > 0 && received == total && progress.total_deltas() > 0 {
            self.report(
                "resolving deltas",
                progress.indexed_deltas(),
                progress.total_deltas(),
            );
        } else {
            self.report("receiving objects", received, total);
        }
    }
}
