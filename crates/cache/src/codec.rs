//! Translation between a [`Node`] and its rows across `nodes`, `files`,
//! `parentage`, `images`, `videos` and `private`.
//!
//! None of these functions open a transaction; they expect to run inside one
//! owned by the engine.

use crate::error::{ErrorKind, Result};
use crate::models::{FileRow, ImageRow, NodeHead, NodeRow, VideoRow};
use crate::node::{FileMeta, ImageMeta, Node, VideoMeta};
use exn::ResultExt;
use sqlx::SqliteConnection;
use std::collections::{BTreeMap, BTreeSet};

/// Every row that belongs to a node, child tables first so the foreign keys
/// on `files`, `images` and `videos` never point at a missing node.
const DELETE_STATEMENTS: [&str; 6] = [
    "DELETE FROM files WHERE id = ?1",
    "DELETE FROM images WHERE id = ?1",
    "DELETE FROM videos WHERE id = ?1",
    "DELETE FROM private WHERE id = ?1",
    "DELETE FROM parentage WHERE parent = ?1 OR child = ?1",
    "DELETE FROM nodes WHERE id = ?1",
];

/// Assemble a node from its rows, or `None` if there is no `nodes` row.
pub(crate) async fn read_node(conn: &mut SqliteConnection, id: &str) -> Result<Option<Node>> {
    let row: Option<NodeRow> = sqlx::query_as("SELECT id, name, trashed, created, modified FROM nodes WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .or_raise(|| ErrorKind::Database)?;
    let Some(row) = row else {
        return Ok(None);
    };
    let head = NodeHead::try_from(row)?;

    let file: Option<FileRow> = sqlx::query_as("SELECT id, mime_type, hash, size FROM files WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .or_raise(|| ErrorKind::Database)?;
    let parents: Vec<String> = sqlx::query_scalar("SELECT parent FROM parentage WHERE child = ?")
        .bind(id)
        .fetch_all(&mut *conn)
        .await
        .or_raise(|| ErrorKind::Database)?;
    let image: Option<ImageRow> = sqlx::query_as("SELECT width, height FROM images WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .or_raise(|| ErrorKind::Database)?;
    let video: Option<VideoRow> = sqlx::query_as("SELECT width, height, ms_duration FROM videos WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .or_raise(|| ErrorKind::Database)?;
    let private: Vec<(String, Option<String>)> = sqlx::query_as("SELECT key, value FROM private WHERE id = ?")
        .bind(id)
        .fetch_all(&mut *conn)
        .await
        .or_raise(|| ErrorKind::Database)?;

    Ok(Some(Node {
        id: head.id,
        name: head.name,
        trashed: head.trashed,
        created: head.created,
        modified: head.modified,
        file: file.map(FileMeta::try_from).transpose()?,
        parents: parents.into_iter().collect::<BTreeSet<_>>(),
        image: image.map(ImageMeta::try_from).transpose()?,
        video: video.map(VideoMeta::try_from).transpose()?,
        // Only other writers leave a NULL value; it reads back as "".
        private: private
            .into_iter()
            .map(|(key, value)| (key, value.unwrap_or_default()))
            .collect::<BTreeMap<_, _>>(),
    }))
}

/// Decode each id in turn, skipping ids that have no `nodes` row.
pub(crate) async fn read_nodes(conn: &mut SqliteConnection, ids: Vec<String>) -> Result<Vec<Node>> {
    let mut nodes = Vec::with_capacity(ids.len());
    for id in ids {
        match read_node(conn, &id).await? {
            Some(node) => nodes.push(node),
            None => tracing::trace!(id, "Referenced node has no row; skipping"),
        }
    }
    Ok(nodes)
}

/// Replace every row belonging to `node` with its current state.
///
/// Not additive: secondary rows that the node no longer carries (file
/// metadata, media, parent edges, private keys) are removed.
pub(crate) async fn write_node(conn: &mut SqliteConnection, node: &Node) -> Result<()> {
    let id = node.id.as_str();
    // Convert everything up front so an unrepresentable value fails before any write.
    let node_row = NodeRow::from(node);
    let file_row = node.file.as_ref().map(|file| FileRow::try_from((id, file))).transpose()?;
    let image_row = node.image.as_ref().map(ImageRow::from);
    let video_row = node.video.as_ref().map(VideoRow::try_from).transpose()?;

    sqlx::query(include_str!("../queries/upsert_node.sql"))
        .bind(node_row.id)
        .bind(node_row.name)
        .bind(node_row.trashed)
        .bind(node_row.created)
        .bind(node_row.modified)
        .execute(&mut *conn)
        .await
        .or_raise(|| ErrorKind::Database)?;

    let written = match file_row {
        Some(row) => sqlx::query(include_str!("../queries/upsert_file.sql"))
            .bind(row.id)
            .bind(row.mime_type)
            .bind(row.hash)
            .bind(row.size)
            .execute(&mut *conn)
            .await,
        None => sqlx::query("DELETE FROM files WHERE id = ?").bind(id).execute(&mut *conn).await,
    };
    written.or_raise(|| ErrorKind::Database)?;

    sqlx::query("DELETE FROM parentage WHERE child = ?")
        .bind(id)
        .execute(&mut *conn)
        .await
        .or_raise(|| ErrorKind::Database)?;
    for parent in &node.parents {
        sqlx::query("INSERT INTO parentage (parent, child) VALUES (?, ?)")
            .bind(parent)
            .bind(id)
            .execute(&mut *conn)
            .await
            .or_raise(|| ErrorKind::Database)?;
    }

    let written = match image_row {
        Some(row) => sqlx::query(include_str!("../queries/upsert_image.sql"))
            .bind(id)
            .bind(row.width)
            .bind(row.height)
            .execute(&mut *conn)
            .await,
        None => sqlx::query("DELETE FROM images WHERE id = ?").bind(id).execute(&mut *conn).await,
    };
    written.or_raise(|| ErrorKind::Database)?;

    let written = match video_row {
        Some(row) => sqlx::query(include_str!("../queries/upsert_video.sql"))
            .bind(id)
            .bind(row.width)
            .bind(row.height)
            .bind(row.ms_duration)
            .execute(&mut *conn)
            .await,
        None => sqlx::query("DELETE FROM videos WHERE id = ?").bind(id).execute(&mut *conn).await,
    };
    written.or_raise(|| ErrorKind::Database)?;

    sqlx::query("DELETE FROM private WHERE id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await
        .or_raise(|| ErrorKind::Database)?;
    for (key, value) in &node.private {
        sqlx::query("INSERT INTO private (id, key, value) VALUES (?, ?, ?)")
            .bind(id)
            .bind(key)
            .bind(value)
            .execute(&mut *conn)
            .await
            .or_raise(|| ErrorKind::Database)?;
    }
    Ok(())
}

/// Remove a node and every row attached to it, including parent edges in
/// both directions. Children keep their own rows and become orphans.
pub(crate) async fn delete_node(conn: &mut SqliteConnection, id: &str) -> Result<()> {
    for statement in DELETE_STATEMENTS {
        sqlx::query(statement)
            .bind(id)
            .execute(&mut *conn)
            .await
            .or_raise(|| ErrorKind::Database)?;
    }
    Ok(())
}
