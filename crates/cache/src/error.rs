//! Cache Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction. Underlying `sqlx` errors are kept as
//! child frames of [`ErrorKind::Database`] so nothing from the storage engine
//! is masked.

use derive_more::{Display, Error};

/// A cache error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for cache operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
/// Lookups that simply find nothing are not errors; they return `Ok(None)`.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Disk I/O, corruption, lock timeouts and constraint failures reported by SQLite.
    #[display("database error")]
    Database,
    /// The cache file was written by a different schema version. Delete the
    /// file and rebuild the cache from the remote drive.
    #[display("cache incompatible, rebuild required (found schema version {found}, expected {expected})")]
    SchemaIncompatible { found: i64, expected: i64 },
    /// A metadata key that callers rely on has never been written.
    #[display("metadata key not found: {_0}")]
    MissingMetadataKey(#[error(not(source))] String),
    /// A node id needed to build a path has no `nodes` row.
    #[display("cannot resolve path for node: {_0}")]
    PathResolution(#[error(not(source))] String),
    /// Parent links loop back onto a node already visited while building a
    /// path. The tree is corrupt; re-fetch the affected nodes from the drive.
    #[display("parent cycle at node: {_0}")]
    ParentCycle(#[error(not(source))] String),
    /// A value that cannot be represented in (or read back from) its column.
    #[display("invalid cache data: {_0}")]
    InvalidData(#[error(not(source))] &'static str),
    /// A name search pattern that isn't a valid regular expression.
    #[display("invalid search pattern: {_0}")]
    InvalidPattern(#[error(not(source))] String),
    /// The cache configuration was rejected.
    #[display("invalid cache configuration")]
    Config,
    /// A dispatched operation panicked, or the worker pool is shut down.
    #[display("cache worker failed")]
    Worker,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    ///
    /// A failed [`apply_changes`](crate::Cache::apply_changes) leaves the cache
    /// untouched, so the whole batch can be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Database | Self::Worker)
    }
}
