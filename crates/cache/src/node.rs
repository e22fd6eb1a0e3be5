//! The in-memory view of one remote drive entry.

use std::collections::{BTreeMap, BTreeSet};
use time::UtcDateTime;

/// Metadata only files carry. Folders have none.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileMeta {
    pub mime_type: String,
    /// Content hash as reported by the remote drive.
    pub hash: String,
    pub size: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageMeta {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VideoMeta {
    pub width: u32,
    pub height: u32,
    pub ms_duration: u64,
}

/// A file or folder on the remote drive.
///
/// Writes always replace the whole node, so a `Node` must describe the
/// complete desired state rather than a delta.
///
/// Timestamps are stored with second precision; sub-second components do not
/// survive a round trip through the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    /// Stable remote identifier.
    pub id: String,
    /// Empty for the root node, and only for the root node.
    pub name: String,
    pub trashed: bool,
    pub created: UtcDateTime,
    pub modified: UtcDateTime,
    /// `None` for folders.
    pub file: Option<FileMeta>,
    /// Normally exactly one. Zero is an orphan; more than one breaks the
    /// tree and shows up in
    /// [`find_multiple_parents_nodes`](crate::Cache::find_multiple_parents_nodes).
    pub parents: BTreeSet<String>,
    pub image: Option<ImageMeta>,
    pub video: Option<VideoMeta>,
    /// Per-node key/value pairs that the remote API does not own.
    ///
    /// Values are never absent: a NULL value stored by another writer reads
    /// back as an empty string.
    pub private: BTreeMap<String, String>,
}

impl Node {
    /// A folder with no parents, no media and epoch timestamps.
    pub fn folder(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            trashed: false,
            created: UtcDateTime::UNIX_EPOCH,
            modified: UtcDateTime::UNIX_EPOCH,
            file: None,
            parents: BTreeSet::new(),
            image: None,
            video: None,
            private: BTreeMap::new(),
        }
    }

    /// The nameless folder every path is resolved from.
    pub fn root(id: impl Into<String>) -> Self {
        Self::folder(id, "")
    }

    pub fn file(id: impl Into<String>, name: impl Into<String>, meta: FileMeta) -> Self {
        Self { file: Some(meta), ..Self::folder(id, name) }
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parents.insert(parent.into());
        self
    }

    pub fn with_times(mut self, created: UtcDateTime, modified: UtcDateTime) -> Self {
        self.created = created;
        self.modified = modified;
        self
    }

    pub fn with_trashed(mut self, trashed: bool) -> Self {
        self.trashed = trashed;
        self
    }

    pub fn with_image(mut self, image: ImageMeta) -> Self {
        self.image = Some(image);
        self
    }

    pub fn with_video(mut self, video: VideoMeta) -> Self {
        self.video = Some(video);
        self
    }

    pub fn with_private(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.private.insert(key.into(), value.into());
        self
    }

    /// Derived from the absence of file metadata.
    pub fn is_folder(&self) -> bool {
        self.file.is_none()
    }

    pub fn is_root(&self) -> bool {
        self.name.is_empty()
    }

    pub fn mime_type(&self) -> Option<&str> {
        self.file.as_ref().map(|f| f.mime_type.as_str())
    }

    pub fn hash(&self) -> Option<&str> {
        self.file.as_ref().map(|f| f.hash.as_str())
    }

    pub fn size(&self) -> Option<u64> {
        self.file.as_ref().map(|f| f.size)
    }
}

/// One entry of an incremental change batch from the remote drive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    /// The node was removed remotely; drop it and every row attached to it.
    Remove(String),
    /// The node was created or changed; store this complete snapshot.
    Upsert(Node),
}

impl Change {
    pub fn id(&self) -> &str {
        match self {
            Self::Remove(id) => id,
            Self::Upsert(node) => &node.id,
        }
    }

    pub fn is_removed(&self) -> bool {
        matches!(self, Self::Remove(_))
    }
}
