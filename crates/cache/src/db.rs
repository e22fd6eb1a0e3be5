//! Database connection management.
//!
//! Nothing is pooled: every cache operation gets a brand-new connection for
//! the duration of its own transaction. This trades per-call connection
//! overhead for isolation that is trivial to reason about.

use exn::ResultExt;
use sqlx::sqlite::{SqliteAutoVacuum, SqliteConnectOptions, SqliteJournalMode, SqliteSynchronous};
use sqlx::{Connection, Executor, SqliteConnection};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use stratus_config::CacheConfig;
use tracing::instrument;

use crate::error::{ErrorKind, Result};
use crate::schema;

/// Connection factory for the cache file.
///
/// Cheap to clone; holds only the connection options derived from the
/// configured data-source name.
#[derive(Debug, Clone)]
pub struct Database {
    options: SqliteConnectOptions,
}

impl Database {
    /// Build connection options from the configuration.
    ///
    /// For plain filesystem paths the parent directory is created if needed.
    /// No connection is opened yet.
    pub fn new(config: &CacheConfig) -> Result<Self> {
        config.validate().or_raise(|| ErrorKind::Config)?;
        let dsn = config.dsn.trim();
        let options = if dsn.starts_with("sqlite:") {
            SqliteConnectOptions::from_str(dsn).or_raise(|| ErrorKind::Config)?
        } else {
            let path = Path::new(dsn);
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
                && !parent.exists()
            {
                // Non-async on purpose; this only happens once when the cache is opened.
                std::fs::create_dir_all(parent).or_raise(|| ErrorKind::Database)?;
            }
            SqliteConnectOptions::new().filename(path)
        };
        Ok(Self { options: Self::base_options(options, config.busy_timeout()) })
    }

    /// Connection options shared by every connection.
    fn base_options(options: SqliteConnectOptions, busy_timeout: Duration) -> SqliteConnectOptions {
        options
            .create_if_missing(true)
            // WAL lets readers on other connections proceed while one writer commits.
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true)
            .synchronous(SqliteSynchronous::Normal)
            // Writers from other workers queue on the file lock instead of failing
            // straight away with SQLITE_BUSY.
            .busy_timeout(busy_timeout)
            .auto_vacuum(SqliteAutoVacuum::None)
    }

    /// Apply PRAGMA settings that aren't exposed via SqliteConnectOptions.
    async fn apply_pragmas(conn: &mut SqliteConnection) -> sqlx::Result<()> {
        conn.execute(sqlx::raw_sql(
            r#"
                PRAGMA temp_store = MEMORY;
                PRAGMA cache_size = -8192;
            "#,
        ))
        .await?;
        Ok(())
    }

    /// Open a fresh connection.
    ///
    /// The caller owns it and should close it once its
    /// transaction is over.
    pub async fn connect(&self) -> Result<SqliteConnection> {
        let mut conn = SqliteConnection::connect_with(&self.options).await.or_raise(|| ErrorKind::Database)?;
        Self::apply_pragmas(&mut conn).await.or_raise(|| ErrorKind::Database)?;
        Ok(conn)
    }

    /// Create the schema if needed and reject incompatible cache files.
    #[instrument("initializing cache schema", skip(self))]
    pub async fn initialize(&self) -> Result<()> {
        let mut conn = self.connect().await?;
        let result = schema::initialize(&mut conn).await;
        close(conn).await;
        result
    }
}

/// Close a connection, logging rather than failing: by the time a connection
/// is closed its transaction has already committed or rolled back.
pub(crate) async fn close(conn: SqliteConnection) {
    if let Err(err) = conn.close().await {
        tracing::debug!(error = %err, "Failed to close cache connection cleanly");
    }
}
