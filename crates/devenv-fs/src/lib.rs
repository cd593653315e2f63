//! Filesystem primitives for the dev environment manager
//!
//! Content hashing, slash-normalized relative paths, atomic writes,
//! permission-tolerant deletes and path-keyed locks.

pub mod checksum;
pub mod error;
pub mod io;
pub mod lock;
pub mod path;

pub use checksum::{hash_bytes, hash_file};
pub use error::{Error, Result};
pub use lock::{PathLockGuard, PathLocks};
pub use path::NormalizedPath;
