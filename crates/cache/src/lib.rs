//! Local SQLite mirror of a remote drive's file tree.
//!
//! The cache is not the source of truth - the remote drive is. It keeps
//! enough metadata to answer lookups without a network round trip, and is
//! kept current by applying the remote change stream in atomic batches
//! together with the stream's checkpoint. If the cache file is deleted (or
//! rejected as incompatible) it can be rebuilt from the drive.
//!
//! # Architecture
//! - **Schema**: fixed DDL plus a schema version in `PRAGMA user_version`.
//!   Mismatched versions are rejected, never migrated.
//! - **Codec**: a [`Node`] is spread over `nodes`, `files`, `parentage`,
//!   `images`, `videos` and `private`. Writes replace the full row set.
//! - **Engine**: one transaction per operation, on a connection the caller
//!   provides.
//! - **Facade**: [`Cache`] runs each operation on a spawned task with a fresh
//!   connection, bounded by the configured number of workers.
//!
//! The tree is expected to give every node but the root exactly one parent.
//! Nothing enforces that; [`Cache::find_orphan_nodes`] and
//! [`Cache::find_multiple_parents_nodes`] report where it doesn't hold.

mod cache;
mod codec;
mod db;
mod engine;
pub mod error;
mod models;
mod node;
mod schema;

pub use crate::cache::Cache;
pub use crate::db::Database;
pub use crate::engine::{CHECK_POINT, ROOT_ID};
pub use crate::node::{Change, FileMeta, ImageMeta, Node, VideoMeta};
pub use crate::schema::SCHEMA_VERSION;
pub use stratus_config::CacheConfig;
