//! Git resource driver for the dev environment manager
//!
//! Wraps the handful of git operations the reconciler needs: remote ref
//! listing, shallow clone, fetch + checkout, branch and cleanliness queries,
//! destructive reset, and repository deletion. The driver never retries;
//! callers decide what is safe to repeat.

pub mod driver;
pub mod error;
pub mod progress;
pub mod remote;

pub use driver::{GitDriver, Head};
pub use error::{Error, Result};
pub use progress::{CancellationToken, NullProgress, ProgressEvent, ProgressSink};
pub use remote::{RefPattern, RemoteRef};
