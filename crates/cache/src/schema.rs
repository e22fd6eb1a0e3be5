//! On-disk schema and version check.
//!
//! The schema is never migrated. A cache file written by any other schema
//! version is rejected and has to be rebuilt from the remote drive.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use sqlx::{Connection, SqliteConnection};
use tracing::instrument;

/// Bump this for every breaking change to `queries/schema.sql`.
pub const SCHEMA_VERSION: i64 = 4;

/// Create the tables if they don't exist yet, then check the stored version.
#[instrument(skip(conn))]
pub(crate) async fn initialize(conn: &mut SqliteConnection) -> Result<()> {
    match create(conn).await {
        Ok(()) => tracing::debug!(version = SCHEMA_VERSION, "Created cache schema"),
        Err(err) if is_already_initialized(&err) => tracing::debug!("Cache schema already present"),
        Err(err) => return Err(err).or_raise(|| ErrorKind::Database),
    }
    let found = version(conn).await?;
    if found != SCHEMA_VERSION {
        tracing::error!(found, expected = SCHEMA_VERSION, "Cache schema version mismatch; rebuild required");
        exn::bail!(ErrorKind::SchemaIncompatible { found, expected: SCHEMA_VERSION });
    }
    Ok(())
}

/// Read the schema version stored in the database header.
pub(crate) async fn version(conn: &mut SqliteConnection) -> Result<i64> {
    sqlx::query_scalar::<_, i64>("PRAGMA user_version")
        .fetch_one(conn)
        .await
        .or_raise(|| ErrorKind::Database)
}

async fn create(conn: &mut SqliteConnection) -> sqlx::Result<()> {
    // All or nothing, so a half-created schema can't pass for an initialized one.
    let mut tx = conn.begin().await?;
    sqlx::raw_sql(include_str!("../queries/schema.sql")).execute(&mut *tx).await?;
    let pragma = format!("PRAGMA user_version = {SCHEMA_VERSION}");
    sqlx::raw_sql(&pragma).execute(&mut *tx).await?;
    tx.commit().await
}

fn is_already_initialized(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => db.message().contains("already exists"),
        _ => false,
    }
}
