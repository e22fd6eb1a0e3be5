//! One function per cache operation, each running in exactly one transaction
//! on the connection it is given.
//!
//! Read-only operations open a transaction for a consistent snapshot and let
//! it roll back on drop. Read-write operations commit on success; any error
//! returns early and drops the transaction, which rolls back every write.

use crate::codec;
use crate::error::{ErrorKind, Result};
use crate::node::{Change, Node};
use exn::{OptionExt, ResultExt};
use regex::RegexBuilder;
use sqlx::{Connection, Sqlite, SqliteConnection, Transaction};
use std::collections::BTreeSet;
use time::UtcDateTime;

/// Metadata key holding the id of the nameless root node.
pub const ROOT_ID: &str = "root_id";
/// Metadata key holding the remote change-stream cursor.
pub const CHECK_POINT: &str = "check_point";

async fn begin(conn: &mut SqliteConnection) -> Result<Transaction<'_, Sqlite>> {
    conn.begin().await.or_raise(|| ErrorKind::Database)
}

async fn commit(tx: Transaction<'_, Sqlite>) -> Result<()> {
    tx.commit().await.or_raise(|| ErrorKind::Database)
}

// =========================================================================
// Metadata
// =========================================================================

async fn read_metadata(conn: &mut SqliteConnection, key: &str) -> Result<Option<String>> {
    let value: Option<Option<String>> = sqlx::query_scalar("SELECT value FROM metadata WHERE key = ?")
        .bind(key)
        .fetch_optional(conn)
        .await
        .or_raise(|| ErrorKind::Database)?;
    Ok(value.map(Option::unwrap_or_default))
}

async fn write_metadata(conn: &mut SqliteConnection, key: &str, value: &str) -> Result<()> {
    sqlx::query("INSERT OR REPLACE INTO metadata (key, value) VALUES (?, ?)")
        .bind(key)
        .bind(value)
        .execute(conn)
        .await
        .or_raise(|| ErrorKind::Database)?;
    Ok(())
}

async fn require_metadata(conn: &mut SqliteConnection, key: &str) -> Result<String> {
    read_metadata(conn, key)
        .await?
        .ok_or_raise(|| ErrorKind::MissingMetadataKey(key.to_string()))
}

pub(crate) async fn get_metadata(conn: &mut SqliteConnection, key: &str) -> Result<String> {
    let mut tx = begin(conn).await?;
    require_metadata(&mut tx, key).await
}

pub(crate) async fn try_get_metadata(conn: &mut SqliteConnection, key: &str) -> Result<Option<String>> {
    let mut tx = begin(conn).await?;
    read_metadata(&mut tx, key).await
}

pub(crate) async fn set_metadata(conn: &mut SqliteConnection, key: &str, value: &str) -> Result<()> {
    let mut tx = begin(conn).await?;
    write_metadata(&mut tx, key, value).await?;
    commit(tx).await
}

// =========================================================================
// Lookups
// =========================================================================

pub(crate) async fn get_node_by_id(conn: &mut SqliteConnection, id: &str) -> Result<Option<Node>> {
    let mut tx = begin(conn).await?;
    codec::read_node(&mut tx, id).await
}

pub(crate) async fn get_root_node(conn: &mut SqliteConnection) -> Result<Node> {
    let mut tx = begin(conn).await?;
    let root_id = require_metadata(&mut tx, ROOT_ID).await?;
    codec::read_node(&mut tx, &root_id)
        .await?
        .ok_or_raise(|| ErrorKind::PathResolution(root_id.clone()))
}

async fn child_id_by_name(conn: &mut SqliteConnection, name: &str, parent_id: &str) -> Result<Option<String>> {
    sqlx::query_scalar(include_str!("../queries/get_node_by_name_from_parent_id.sql"))
        .bind(parent_id)
        .bind(name)
        .fetch_optional(conn)
        .await
        .or_raise(|| ErrorKind::Database)
}

pub(crate) async fn get_node_by_name_from_parent_id(
    conn: &mut SqliteConnection,
    name: &str,
    parent_id: &str,
) -> Result<Option<Node>> {
    let mut tx = begin(conn).await?;
    match child_id_by_name(&mut tx, name, parent_id).await? {
        Some(id) => codec::read_node(&mut tx, &id).await,
        None => Ok(None),
    }
}

/// Walk down from the root one path component at a time.
///
/// `/` and empty components are ignored, so `/docs//a.txt` and `docs/a.txt`
/// both resolve like `/docs/a.txt`.
pub(crate) async fn get_node_by_path(conn: &mut SqliteConnection, path: &str) -> Result<Option<Node>> {
    let mut tx = begin(conn).await?;
    let mut current = require_metadata(&mut tx, ROOT_ID).await?;
    for name in path.split('/').filter(|part| !part.is_empty()) {
        match child_id_by_name(&mut tx, name, &current).await? {
            Some(id) => current = id,
            None => return Ok(None),
        }
    }
    codec::read_node(&mut tx, &current).await
}

/// Walk up the parent chain and join the names into a path.
///
/// A walk that reaches the root yields an absolute path (`/docs/a.txt`, or
/// `/` for the root itself). A walk cut short by an orphan yields the
/// relative path collected so far. When a node has several parents the
/// lexicographically smallest parent id is followed. Parent links that loop
/// back onto the walk fail with [`ErrorKind::ParentCycle`].
pub(crate) async fn get_path_by_id(conn: &mut SqliteConnection, id: &str) -> Result<String> {
    let mut tx = begin(conn).await?;
    let mut parts: Vec<String> = Vec::new();
    let mut visited: BTreeSet<String> = BTreeSet::new();
    let mut current = id.to_string();
    let reached_root = loop {
        if !visited.insert(current.clone()) {
            tracing::warn!(id = %current, start = %id, "Parent links form a cycle");
            exn::bail!(ErrorKind::ParentCycle(current));
        }
        let name: Option<Option<String>> = sqlx::query_scalar("SELECT name FROM nodes WHERE id = ?")
            .bind(&current)
            .fetch_optional(&mut *tx)
            .await
            .or_raise(|| ErrorKind::Database)?;
        let name = name
            .ok_or_raise(|| ErrorKind::PathResolution(current.clone()))?
            .unwrap_or_default();
        if name.is_empty() {
            break true;
        }
        parts.push(name);

        let parents: Vec<String> = sqlx::query_scalar("SELECT parent FROM parentage WHERE child = ? ORDER BY parent")
            .bind(&current)
            .fetch_all(&mut *tx)
            .await
            .or_raise(|| ErrorKind::Database)?;
        let Some(parent) = parents.first() else {
            break false;
        };
        if parents.len() > 1 {
            tracing::warn!(id = %current, parent = %parent, count = parents.len(), "Node has multiple parents; following the first");
        }
        current = parent.clone();
    };
    parts.reverse();
    let path = parts.join("/");
    Ok(if reached_root { format!("/{path}") } else { path })
}

pub(crate) async fn get_children_by_id(conn: &mut SqliteConnection, id: &str) -> Result<Vec<Node>> {
    let mut tx = begin(conn).await?;
    let ids: Vec<String> = sqlx::query_scalar("SELECT child FROM parentage WHERE parent = ? ORDER BY child")
        .bind(id)
        .fetch_all(&mut *tx)
        .await
        .or_raise(|| ErrorKind::Database)?;
    codec::read_nodes(&mut tx, ids).await
}

pub(crate) async fn get_trashed_nodes(conn: &mut SqliteConnection) -> Result<Vec<Node>> {
    let mut tx = begin(conn).await?;
    let ids: Vec<String> = sqlx::query_scalar("SELECT id FROM nodes WHERE trashed = 1 ORDER BY id")
        .fetch_all(&mut *tx)
        .await
        .or_raise(|| ErrorKind::Database)?;
    codec::read_nodes(&mut tx, ids).await
}

/// Total size of files created in `[begin, end)`.
pub(crate) async fn get_uploaded_size(
    conn: &mut SqliteConnection,
    begin_at: UtcDateTime,
    end_at: UtcDateTime,
) -> Result<u64> {
    let mut tx = begin(conn).await?;
    let total: i64 = sqlx::query_scalar(include_str!("../queries/get_uploaded_size.sql"))
        .bind(begin_at.unix_timestamp())
        .bind(end_at.unix_timestamp())
        .fetch_one(&mut *tx)
        .await
        .or_raise(|| ErrorKind::Database)?;
    u64::try_from(total).or_raise(|| ErrorKind::InvalidData("uploaded size"))
}

// =========================================================================
// Mutations
// =========================================================================

/// Store a complete node. The nameless node also becomes the root.
pub(crate) async fn insert_node(conn: &mut SqliteConnection, node: &Node) -> Result<()> {
    let mut tx = begin(conn).await?;
    codec::write_node(&mut tx, node).await?;
    if node.is_root() {
        write_metadata(&mut tx, ROOT_ID, &node.id).await?;
    }
    commit(tx).await
}

pub(crate) async fn delete_node(conn: &mut SqliteConnection, id: &str) -> Result<()> {
    let mut tx = begin(conn).await?;
    codec::delete_node(&mut tx, id).await?;
    commit(tx).await
}

/// Apply a whole change batch and move the checkpoint, all or nothing.
pub(crate) async fn apply_changes(conn: &mut SqliteConnection, changes: &[Change], check_point: &str) -> Result<()> {
    let mut tx = begin(conn).await?;
    for change in changes {
        match change {
            Change::Remove(id) => codec::delete_node(&mut tx, id).await?,
            Change::Upsert(node) => codec::write_node(&mut tx, node).await?,
        }
    }
    write_metadata(&mut tx, CHECK_POINT, check_point).await?;
    commit(tx).await
}

// =========================================================================
// Search and consistency
// =========================================================================

/// Case-insensitive regex search over node names. The root never matches.
pub(crate) async fn find_nodes_by_regex(conn: &mut SqliteConnection, pattern: &str) -> Result<Vec<Node>> {
    let regex = RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .or_raise(|| ErrorKind::InvalidPattern(pattern.to_string()))?;
    let mut tx = begin(conn).await?;
    let rows: Vec<(String, String)> = sqlx::query_as("SELECT id, name FROM nodes WHERE name IS NOT NULL ORDER BY id")
        .fetch_all(&mut *tx)
        .await
        .or_raise(|| ErrorKind::Database)?;
    let ids = rows
        .into_iter()
        .filter(|(_, name)| regex.is_match(name))
        .map(|(id, _)| id)
        .collect::<Vec<_>>();
    codec::read_nodes(&mut tx, ids).await
}

pub(crate) async fn find_orphan_nodes(conn: &mut SqliteConnection) -> Result<Vec<Node>> {
    let mut tx = begin(conn).await?;
    let ids: Vec<String> = sqlx::query_scalar(include_str!("../queries/find_orphan_nodes.sql"))
        .fetch_all(&mut *tx)
        .await
        .or_raise(|| ErrorKind::Database)?;
    codec::read_nodes(&mut tx, ids).await
}

/// Nodes with more than one parent edge. Each appears once, with every
/// parent listed in [`Node::parents`].
pub(crate) async fn find_multiple_parents_nodes(conn: &mut SqliteConnection) -> Result<Vec<Node>> {
    let mut tx = begin(conn).await?;
    let ids: Vec<String> = sqlx::query_scalar(include_str!("../queries/find_multiple_parents_nodes.sql"))
        .fetch_all(&mut *tx)
        .await
        .or_raise(|| ErrorKind::Database)?;
    codec::read_nodes(&mut tx, ids).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::FileMeta;
    use crate::testing;
    use rstest::rstest;

    fn text(id: &str, name: &str, parent: &str) -> Node {
        Node::file(
            id,
            name,
            FileMeta { mime_type: "text/plain".to_string(), hash: format!("hash-{id}"), size: 100 },
        )
        .with_parent(parent)
    }

    /// root("") -> docs(D) -> report.txt(R)
    async fn tree(conn: &mut SqliteConnection) {
        insert_node(conn, &Node::root("ROOT")).await.unwrap();
        insert_node(conn, &Node::folder("D", "docs").with_parent("ROOT")).await.unwrap();
        insert_node(conn, &text("R", "report.txt", "D")).await.unwrap();
    }

    #[tokio::test]
    async fn test_metadata() {
        let (_dir, db) = testing::database().await;
        let mut conn = db.connect().await.unwrap();
        let err = get_metadata(&mut conn, "missing").await.unwrap_err();
        assert_eq!(*err, ErrorKind::MissingMetadataKey("missing".to_string()));
        assert_eq!(try_get_metadata(&mut conn, "missing").await.unwrap(), None);

        set_metadata(&mut conn, "k", "one").await.unwrap();
        set_metadata(&mut conn, "k", "two").await.unwrap();
        assert_eq!(get_metadata(&mut conn, "k").await.unwrap(), "two");
    }

    #[tokio::test]
    async fn test_insert_root_sets_root_id() {
        let (_dir, db) = testing::database().await;
        let mut conn = db.connect().await.unwrap();
        insert_node(&mut conn, &Node::folder("D", "docs")).await.unwrap();
        assert_eq!(try_get_metadata(&mut conn, ROOT_ID).await.unwrap(), None);
        insert_node(&mut conn, &Node::root("ROOT")).await.unwrap();
        assert_eq!(get_metadata(&mut conn, ROOT_ID).await.unwrap(), "ROOT");
        assert_eq!(get_root_node(&mut conn).await.unwrap().id, "ROOT");
    }

    #[rstest]
    #[case("/docs/report.txt", Some("R"))]
    #[case("docs/report.txt", Some("R"))]
    #[case("/docs", Some("D"))]
    #[case("/docs/", Some("D"))]
    #[case("/", Some("ROOT"))]
    #[case("/docs/missing.txt", None)]
    #[case("/nope/report.txt", None)]
    #[case("/docs/report.txt/deeper", None)]
    #[tokio::test]
    async fn test_get_node_by_path(#[case] path: &str, #[case] expected: Option<&str>) {
        let (_dir, db) = testing::database().await;
        let mut conn = db.connect().await.unwrap();
        tree(&mut conn).await;
        let node = get_node_by_path(&mut conn, path).await.unwrap();
        assert_eq!(node.as_ref().map(|n| n.id.as_str()), expected);
    }

    #[tokio::test]
    async fn test_get_node_by_path_without_root() {
        let (_dir, db) = testing::database().await;
        let mut conn = db.connect().await.unwrap();
        let err = get_node_by_path(&mut conn, "/docs").await.unwrap_err();
        assert_eq!(*err, ErrorKind::MissingMetadataKey(ROOT_ID.to_string()));
    }

    #[rstest]
    #[case("R", "/docs/report.txt")]
    #[case("D", "/docs")]
    #[case("ROOT", "/")]
    #[tokio::test]
    async fn test_get_path_by_id(#[case] id: &str, #[case] expected: &str) {
        let (_dir, db) = testing::database().await;
        let mut conn = db.connect().await.unwrap();
        tree(&mut conn).await;
        assert_eq!(get_path_by_id(&mut conn, id).await.unwrap(), expected);
    }

    #[tokio::test]
    async fn test_get_path_by_id_orphan_and_missing() {
        let (_dir, db) = testing::database().await;
        let mut conn = db.connect().await.unwrap();
        tree(&mut conn).await;
        insert_node(&mut conn, &Node::folder("L", "lost")).await.unwrap();
        insert_node(&mut conn, &text("F", "found.txt", "L")).await.unwrap();
        assert_eq!(get_path_by_id(&mut conn, "F").await.unwrap(), "lost/found.txt");

        let err = get_path_by_id(&mut conn, "ghost").await.unwrap_err();
        assert_eq!(*err, ErrorKind::PathResolution("ghost".to_string()));

        // An edge pointing at a parent that was never stored.
        insert_node(&mut conn, &text("X", "x.txt", "vanished")).await.unwrap();
        let err = get_path_by_id(&mut conn, "X").await.unwrap_err();
        assert_eq!(*err, ErrorKind::PathResolution("vanished".to_string()));
    }

    #[tokio::test]
    async fn test_get_path_by_id_follows_smallest_parent() {
        let (_dir, db) = testing::database().await;
        let mut conn = db.connect().await.unwrap();
        tree(&mut conn).await;
        insert_node(&mut conn, &Node::folder("A", "archive").with_parent("ROOT")).await.unwrap();
        insert_node(&mut conn, &text("R", "report.txt", "D").with_parent("A")).await.unwrap();
        assert_eq!(get_path_by_id(&mut conn, "R").await.unwrap(), "/archive/report.txt");
    }

    #[rstest]
    #[case("A", "A")]
    #[case("B", "B")]
    #[case("F", "A")]
    #[tokio::test]
    async fn test_get_path_by_id_parent_cycle(#[case] id: &str, #[case] repeated: &str) {
        let (_dir, db) = testing::database().await;
        let mut conn = db.connect().await.unwrap();
        tree(&mut conn).await;
        insert_node(&mut conn, &Node::folder("A", "a").with_parent("B")).await.unwrap();
        insert_node(&mut conn, &Node::folder("B", "b").with_parent("A")).await.unwrap();
        insert_node(&mut conn, &text("F", "f.txt", "A")).await.unwrap();
        let walk = tokio::time::timeout(std::time::Duration::from_secs(5), get_path_by_id(&mut conn, id));
        let err = walk.await.expect("walk must stop on a cycle").unwrap_err();
        assert_eq!(*err, ErrorKind::ParentCycle(repeated.to_string()));
    }

    #[tokio::test]
    async fn test_get_path_by_id_self_parent() {
        let (_dir, db) = testing::database().await;
        let mut conn = db.connect().await.unwrap();
        insert_node(&mut conn, &Node::folder("S", "loop").with_parent("S")).await.unwrap();
        let err = get_path_by_id(&mut conn, "S").await.unwrap_err();
        assert_eq!(*err, ErrorKind::ParentCycle("S".to_string()));
    }

    #[tokio::test]
    async fn test_children_and_trash() {
        let (_dir, db) = testing::database().await;
        let mut conn = db.connect().await.unwrap();
        tree(&mut conn).await;
        insert_node(&mut conn, &text("T", "old.txt", "D").with_trashed(true)).await.unwrap();

        let children = get_children_by_id(&mut conn, "D").await.unwrap();
        assert_eq!(children.iter().map(|n| n.id.as_str()).collect::<Vec<_>>(), vec!["R", "T"]);
        assert!(get_children_by_id(&mut conn, "R").await.unwrap().is_empty());

        let trashed = get_trashed_nodes(&mut conn).await.unwrap();
        assert_eq!(trashed.len(), 1);
        assert_eq!(trashed[0].id, "T");
    }

    #[tokio::test]
    async fn test_get_node_by_name_from_parent_id() {
        let (_dir, db) = testing::database().await;
        let mut conn = db.connect().await.unwrap();
        tree(&mut conn).await;
        let node = get_node_by_name_from_parent_id(&mut conn, "report.txt", "D").await.unwrap();
        assert_eq!(node.map(|n| n.id), Some("R".to_string()));
        assert_eq!(get_node_by_name_from_parent_id(&mut conn, "report.txt", "ROOT").await.unwrap(), None);
    }

    #[rstest]
    #[case("^REPORT", vec!["R"])]
    #[case("o", vec!["D", "R"])]
    #[case(".*", vec!["D", "R"])]
    #[case("^$", vec![])]
    #[tokio::test]
    async fn test_find_nodes_by_regex(#[case] pattern: &str, #[case] expected: Vec<&str>) {
        let (_dir, db) = testing::database().await;
        let mut conn = db.connect().await.unwrap();
        tree(&mut conn).await;
        let nodes = find_nodes_by_regex(&mut conn, pattern).await.unwrap();
        assert_eq!(nodes.iter().map(|n| n.id.as_str()).collect::<Vec<_>>(), expected);
    }

    #[tokio::test]
    async fn test_find_nodes_by_invalid_regex() {
        let (_dir, db) = testing::database().await;
        let mut conn = db.connect().await.unwrap();
        let err = find_nodes_by_regex(&mut conn, "(unclosed").await.unwrap_err();
        assert_eq!(*err, ErrorKind::InvalidPattern("(unclosed".to_string()));
    }

    #[tokio::test]
    async fn test_orphans_come_and_go() {
        let (_dir, db) = testing::database().await;
        let mut conn = db.connect().await.unwrap();
        tree(&mut conn).await;
        assert!(find_orphan_nodes(&mut conn).await.unwrap().is_empty());

        let mut report = get_node_by_id(&mut conn, "R").await.unwrap().unwrap();
        report.parents.clear();
        insert_node(&mut conn, &report).await.unwrap();
        let orphans = find_orphan_nodes(&mut conn).await.unwrap();
        assert_eq!(orphans.iter().map(|n| n.id.as_str()).collect::<Vec<_>>(), vec!["R"]);

        report.parents.insert("D".to_string());
        insert_node(&mut conn, &report).await.unwrap();
        assert!(find_orphan_nodes(&mut conn).await.unwrap().is_empty());

        // Deleting the parent drops the edge along with it.
        delete_node(&mut conn, "D").await.unwrap();
        let orphans = find_orphan_nodes(&mut conn).await.unwrap();
        assert_eq!(orphans.iter().map(|n| n.id.as_str()).collect::<Vec<_>>(), vec!["R"]);
    }

    #[tokio::test]
    async fn test_edge_to_unknown_parent_is_an_orphan() {
        let (_dir, db) = testing::database().await;
        let mut conn = db.connect().await.unwrap();
        tree(&mut conn).await;
        insert_node(&mut conn, &text("X", "x.txt", "vanished")).await.unwrap();
        let orphans = find_orphan_nodes(&mut conn).await.unwrap();
        assert_eq!(orphans.iter().map(|n| n.id.as_str()).collect::<Vec<_>>(), vec!["X"]);
    }

    #[tokio::test]
    async fn test_find_multiple_parents_nodes() {
        let (_dir, db) = testing::database().await;
        let mut conn = db.connect().await.unwrap();
        tree(&mut conn).await;
        assert!(find_multiple_parents_nodes(&mut conn).await.unwrap().is_empty());
        insert_node(&mut conn, &Node::folder("A", "archive").with_parent("ROOT")).await.unwrap();
        insert_node(&mut conn, &text("R", "report.txt", "D").with_parent("A")).await.unwrap();
        let nodes = find_multiple_parents_nodes(&mut conn).await.unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].id, "R");
        assert_eq!(nodes[0].parents.len(), 2);
    }

    #[tokio::test]
    async fn test_apply_changes() {
        let (_dir, db) = testing::database().await;
        let mut conn = db.connect().await.unwrap();
        tree(&mut conn).await;
        let changes = vec![
            Change::Remove("R".to_string()),
            Change::Upsert(text("N", "notes.txt", "D")),
            Change::Upsert(Node::folder("D", "documents").with_parent("ROOT")),
        ];
        apply_changes(&mut conn, &changes, "cursor-2").await.unwrap();
        assert_eq!(get_node_by_id(&mut conn, "R").await.unwrap(), None);
        assert_eq!(get_path_by_id(&mut conn, "N").await.unwrap(), "/documents/notes.txt");
        assert_eq!(get_metadata(&mut conn, CHECK_POINT).await.unwrap(), "cursor-2");
    }

    #[tokio::test]
    async fn test_apply_changes_rolls_back_on_failure() {
        let (_dir, db) = testing::database().await;
        let mut conn = db.connect().await.unwrap();
        tree(&mut conn).await;
        set_metadata(&mut conn, CHECK_POINT, "cursor-1").await.unwrap();

        let mut oversized = text("BIG", "big.bin", "D");
        oversized.file.as_mut().unwrap().size = u64::MAX;
        let changes = vec![
            Change::Remove("R".to_string()),
            Change::Upsert(text("N", "notes.txt", "D")),
            Change::Upsert(oversized),
        ];
        let err = apply_changes(&mut conn, &changes, "cursor-2").await.unwrap_err();
        assert_eq!(*err, ErrorKind::InvalidData("file size"));

        assert!(get_node_by_id(&mut conn, "R").await.unwrap().is_some());
        assert_eq!(get_node_by_id(&mut conn, "N").await.unwrap(), None);
        assert_eq!(get_metadata(&mut conn, CHECK_POINT).await.unwrap(), "cursor-1");
    }

    #[tokio::test]
    async fn test_get_uploaded_size() {
        let (_dir, db) = testing::database().await;
        let mut conn = db.connect().await.unwrap();
        let at = |secs: i64| UtcDateTime::from_unix_timestamp(secs).unwrap();
        insert_node(&mut conn, &text("a", "a.txt", "D").with_times(at(100), at(100))).await.unwrap();
        insert_node(&mut conn, &text("b", "b.txt", "D").with_times(at(200), at(200))).await.unwrap();
        insert_node(&mut conn, &text("c", "c.txt", "D").with_times(at(300), at(300))).await.unwrap();
        insert_node(&mut conn, &Node::folder("d", "dir").with_times(at(150), at(150))).await.unwrap();

        assert_eq!(get_uploaded_size(&mut conn, at(100), at(300)).await.unwrap(), 200);
        assert_eq!(get_uploaded_size(&mut conn, at(0), at(1000)).await.unwrap(), 300);
        assert_eq!(get_uploaded_size(&mut conn, at(400), at(500)).await.unwrap(), 0);
    }
}
