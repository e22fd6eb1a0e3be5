//! Async facade over the engine.
//!
//! Every public operation is a single suspend point: the caller awaits while
//! the operation runs on a spawned task with its own fresh connection, and
//! resumes with the result (or error) once that connection has been closed.
//! Nothing is retried.
//!
//! Dispatched work is not cancellable. If the caller stops waiting, the task
//! still runs its transaction to completion, committing or rolling back as
//! usual; only the result is discarded.

use crate::db::{self, Database};
use crate::engine;
use crate::error::{ErrorKind, Result};
use crate::node::{Change, Node};
use exn::ResultExt;
use futures::future::BoxFuture;
use sqlx::SqliteConnection;
use std::sync::Arc;
use stratus_config::CacheConfig;
use time::UtcDateTime;
use tokio::sync::Semaphore;
use tracing::{Instrument, instrument};

/// Handle to the local metadata cache of a remote drive.
///
/// Cheap to clone; clones share the same bound on operations in flight.
/// The handle itself holds no cache state, only how to connect.
#[derive(Debug, Clone)]
pub struct Cache {
    database: Database,
    workers: Arc<Semaphore>,
    capacity: u32,
}

impl Cache {
    /// Open (creating if needed) the cache described by `config`.
    ///
    /// Fails with [`ErrorKind::SchemaIncompatible`] if the file was written by
    /// another schema version; the file must then be deleted and rebuilt.
    #[instrument("opening drive cache", skip(config), fields(dsn = %config.dsn))]
    pub async fn open(config: &CacheConfig) -> Result<Self> {
        let database = Database::new(config)?;
        database.initialize().await?;
        let capacity = u32::try_from(config.workers).or_raise(|| ErrorKind::Config)?;
        Ok(Self {
            database,
            workers: Arc::new(Semaphore::new(config.workers)),
            capacity,
        })
    }

    /// The connection factory, for callers that need to run their own queries.
    pub fn database(&self) -> &Database {
        &self.database
    }

    /// Wait for operations in flight to finish, then refuse new ones.
    ///
    /// Operations dispatched after this fail with [`ErrorKind::Worker`].
    pub async fn close(&self) {
        if let Ok(permits) = self.workers.acquire_many(self.capacity).await {
            permits.forget();
        }
        self.workers.close();
    }

    /// Run `op` on a fresh connection in a spawned task, bounded by the
    /// worker limit, and hand back its result.
    ///
    /// `op` owns the connection while it runs and returns it alongside the
    /// result so it can be closed here.
    async fn dispatch<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(SqliteConnection) -> BoxFuture<'static, (SqliteConnection, Result<T>)> + Send + 'static,
    {
        let permit = Arc::clone(&self.workers).acquire_owned().await.or_raise(|| ErrorKind::Worker)?;
        let database = self.database.clone();
        let task = tokio::spawn(
            async move {
                let _permit = permit;
                let conn = database.connect().await?;
                let (conn, result) = op(conn).await;
                db::close(conn).await;
                result
            }
            .in_current_span(),
        );
        task.await.or_raise(|| ErrorKind::Worker)?
    }

    // =========================================================================
    // Metadata
    // =========================================================================

    /// Read a metadata value that is expected to exist.
    ///
    /// Fails with [`ErrorKind::MissingMetadataKey`] if it was never written;
    /// use [`try_get_metadata`](Self::try_get_metadata) when absence is normal.
    #[instrument(skip(self, key), fields(key = %key.as_ref()))]
    pub async fn get_metadata(&self, key: impl AsRef<str>) -> Result<String> {
        let key = key.as_ref().to_string();
        self.dispatch(move |mut conn| Box::pin(async move {
            let result = engine::get_metadata(&mut conn, &key).await;
            (conn, result)
        })).await
    }

    #[instrument(skip(self, key), fields(key = %key.as_ref()))]
    pub async fn try_get_metadata(&self, key: impl AsRef<str>) -> Result<Option<String>> {
        let key = key.as_ref().to_string();
        self.dispatch(move |mut conn| Box::pin(async move {
            let result = engine::try_get_metadata(&mut conn, &key).await;
            (conn, result)
        })).await
    }

    #[instrument(skip(self, key, value), fields(key = %key.as_ref()))]
    pub async fn set_metadata(&self, key: impl AsRef<str>, value: impl Into<String>) -> Result<()> {
        let key = key.as_ref().to_string();
        let value = value.into();
        self.dispatch(move |mut conn| Box::pin(async move {
            let result = engine::set_metadata(&mut conn, &key, &value).await;
            (conn, result)
        }))
            .await
    }

    /// The remote change cursor, or `None` before the first applied batch.
    pub async fn get_checkpoint(&self) -> Result<Option<String>> {
        self.try_get_metadata(engine::CHECK_POINT).await
    }

    /// Id of the nameless root node.
    pub async fn get_root_id(&self) -> Result<String> {
        self.get_metadata(engine::ROOT_ID).await
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    #[instrument(skip(self))]
    pub async fn get_root_node(&self) -> Result<Node> {
        self.dispatch(|mut conn| Box::pin(async move {
            let result = engine::get_root_node(&mut conn).await;
            (conn, result)
        })).await
    }

    #[instrument(skip(self, id), fields(id = %id.as_ref()))]
    pub async fn get_node_by_id(&self, id: impl AsRef<str>) -> Result<Option<Node>> {
        let id = id.as_ref().to_string();
        self.dispatch(move |mut conn| Box::pin(async move {
            let result = engine::get_node_by_id(&mut conn, &id).await;
            (conn, result)
        })).await
    }

    /// Resolve an absolute path such as `/docs/report.txt`.
    ///
    /// A missing path component is `Ok(None)`, not an error.
    #[instrument(skip(self, path), fields(path = %path.as_ref()))]
    pub async fn get_node_by_path(&self, path: impl AsRef<str>) -> Result<Option<Node>> {
        let path = path.as_ref().to_string();
        self.dispatch(move |mut conn| Box::pin(async move {
            let result = engine::get_node_by_path(&mut conn, &path).await;
            (conn, result)
        }))
            .await
    }

    /// Build the path of a node by walking up its parents.
    ///
    /// Fails with [`ErrorKind::PathResolution`] if the node, or a parent the
    /// walk needs, has no row, and with [`ErrorKind::ParentCycle`] if parent
    /// links loop. Orphans are not an error: their path is relative, starting
    /// at the topmost known ancestor.
    #[instrument(skip(self, id), fields(id = %id.as_ref()))]
    pub async fn get_path_by_id(&self, id: impl AsRef<str>) -> Result<String> {
        let id = id.as_ref().to_string();
        self.dispatch(move |mut conn| Box::pin(async move {
            let result = engine::get_path_by_id(&mut conn, &id).await;
            (conn, result)
        })).await
    }

    #[instrument(skip(self, name, parent_id), fields(name = %name.as_ref(), parent_id = %parent_id.as_ref()))]
    pub async fn get_node_by_name_from_parent_id(
        &self,
        name: impl AsRef<str>,
        parent_id: impl AsRef<str>,
    ) -> Result<Option<Node>> {
        let name = name.as_ref().to_string();
        let parent_id = parent_id.as_ref().to_string();
        self.dispatch(move |mut conn| Box::pin(async move {
            let result = engine::get_node_by_name_from_parent_id(&mut conn, &name, &parent_id).await;
            (conn, result)
        }))
        .await
    }

    #[instrument(skip(self, id), fields(id = %id.as_ref()))]
    pub async fn get_children_by_id(&self, id: impl AsRef<str>) -> Result<Vec<Node>> {
        let id = id.as_ref().to_string();
        self.dispatch(move |mut conn| Box::pin(async move {
            let result = engine::get_children_by_id(&mut conn, &id).await;
            (conn, result)
        }))
            .await
    }

    #[instrument(skip(self))]
    pub async fn get_trashed_nodes(&self) -> Result<Vec<Node>> {
        self.dispatch(|mut conn| Box::pin(async move {
            let result = engine::get_trashed_nodes(&mut conn).await;
            (conn, result)
        })).await
    }

    /// Total bytes of files created in `[begin, end)`.
    #[instrument(skip(self))]
    pub async fn get_uploaded_size(&self, begin: UtcDateTime, end: UtcDateTime) -> Result<u64> {
        self.dispatch(move |mut conn| Box::pin(async move {
            let result = engine::get_uploaded_size(&mut conn, begin, end).await;
            (conn, result)
        })).await
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Store a complete node, replacing whatever was stored for its id.
    ///
    /// Inserting the nameless node also records it as the root.
    #[instrument(skip(self, node), fields(id = %node.id))]
    pub async fn insert_node(&self, node: Node) -> Result<()> {
        self.dispatch(move |mut conn| Box::pin(async move {
            let result = engine::insert_node(&mut conn, &node).await;
            (conn, result)
        })).await
    }

    /// Remove a node and everything attached to it. Its children are kept and
    /// become orphans.
    #[instrument(skip(self, id), fields(id = %id.as_ref()))]
    pub async fn delete_node(&self, id: impl AsRef<str>) -> Result<()> {
        let id = id.as_ref().to_string();
        self.dispatch(move |mut conn| Box::pin(async move {
            let result = engine::delete_node(&mut conn, &id).await;
            (conn, result)
        })).await
    }

    /// Apply a batch of remote changes and record `check_point`, atomically.
    ///
    /// On error nothing from the batch is visible and the previous checkpoint
    /// is kept, so the same batch can be retried.
    #[instrument(skip(self, changes, check_point), fields(changes = changes.len()))]
    pub async fn apply_changes(&self, changes: Vec<Change>, check_point: impl Into<String>) -> Result<()> {
        let check_point = check_point.into();
        self.dispatch(move |mut conn| Box::pin(async move {
            let result = engine::apply_changes(&mut conn, &changes, &check_point).await;
            (conn, result)
        }))
        .await
    }

    // =========================================================================
    // Search and consistency
    // =========================================================================

    /// Case-insensitive regex search over names. The root never matches.
    #[instrument(skip(self, pattern), fields(pattern = %pattern.as_ref()))]
    pub async fn find_nodes_by_regex(&self, pattern: impl AsRef<str>) -> Result<Vec<Node>> {
        let pattern = pattern.as_ref().to_string();
        self.dispatch(move |mut conn| Box::pin(async move {
            let result = engine::find_nodes_by_regex(&mut conn, &pattern).await;
            (conn, result)
        }))
            .await
    }

    /// Non-root nodes without a parent edge to an existing node.
    #[instrument(skip(self))]
    pub async fn find_orphan_nodes(&self) -> Result<Vec<Node>> {
        self.dispatch(|mut conn| Box::pin(async move {
            let result = engine::find_orphan_nodes(&mut conn).await;
            (conn, result)
        })).await
    }

    /// Nodes with more than one parent, which a well-formed tree never has.
    ///
    /// Every parent is listed in [`Node::parents`], so its length is the
    /// node's parent count.
    #[instrument(skip(self))]
    pub async fn find_multiple_parents_nodes(&self) -> Result<Vec<Node>> {
        self.dispatch(|mut conn| Box::pin(async move {
            let result = engine::find_multiple_parents_nodes(&mut conn).await;
            (conn, result)
        })).await
    }
}
