//! Update-notifier state
//!
//! The last-check timestamp is an explicit value loaded through a
//! [`StateStore`], so deciding whether to check is a pure function of that
//! state and the current time.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use devenv_fs::io;
use semver::Version;
use serde::{Deserialize, Serialize};

use crate::Result;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCheckState {
    pub last_checked: Option<DateTime<Utc>>,
}

/// Persistence for [`UpdateCheckState`].
pub trait StateStore {
    fn load(&self) -> Result<UpdateCheckState>;
    fn save(&self, state: &UpdateCheckState) -> Result<()>;
}

/// Stores the state as JSON. A missing or unreadable file is a fresh state.
#[derive(Debug, Clone)]
pub struct JsonFileStateStore {
    path: PathBuf,
}

impl JsonFileStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StateStore for JsonFileStateStore {
    fn load(&self) -> Result<UpdateCheckState> {
        Ok(crate::manifest::load(&self.path).unwrap_or_default())
    }

    fn save(&self, state: &UpdateCheckState) -> Result<()> {
        let json = serde_json::to_string_pretty(state)?;
        io::write_atomic(&self.path, json.as_bytes())?;
        Ok(())
    }
}

/// A newer release exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub current: Version,
    pub latest: Version,
}

/// True when no check has happened within `interval` of `now`.
pub fn should_check(state: &UpdateCheckState, now: DateTime<Utc>, interval: Duration) -> bool {
    match state.last_checked {
        None => true,
        Some(last) => now - last >= interval || last > now,
    }
}

/// Check for a newer release at most once per `interval`.
///
/// `latest` is only called when a check is due; its `None` means the
/// lookup failed and still counts as a check.
pub fn check_and_maybe_notify(
    store: &dyn StateStore,
    now: DateTime<Utc>,
    interval: Duration,
    current: &Version,
    latest: impl FnOnce() -> Option<Version>,
) -> Result<Option<Notice>> {
    let state = store.load()?;
    if !should_check(&state, now, interval) {
        return Ok(None);
    }

    let found = latest();
    store.save(&UpdateCheckState {
        last_checked: Some(now),
    })?;

    Ok(found
        .filter(|latest| latest > current)
        .map(|latest| Notice {
            current: current.clone(),
            latest,
        }))
}
