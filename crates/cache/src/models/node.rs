use crate::error::{Error, ErrorKind};
use crate::node::Node;
use exn::ResultExt;
use time::UtcDateTime;

/// The `nodes` table row. The root's empty name is stored as NULL.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct NodeRow {
    pub(crate) id: String,
    pub(crate) name: Option<String>,
    pub(crate) trashed: bool,
    pub(crate) created: i64,
    pub(crate) modified: i64,
}
impl From<&Node> for NodeRow {
    fn from(node: &Node) -> Self {
        Self {
            id: node.id.clone(),
            name: (!node.name.is_empty()).then(|| node.name.clone()),
            trashed: node.trashed,
            created: node.created.unix_timestamp(),
            modified: node.modified.unix_timestamp(),
        }
    }
}

/// Everything in a [`Node`] that lives in the `nodes` row itself.
pub(crate) struct NodeHead {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) trashed: bool,
    pub(crate) created: UtcDateTime,
    pub(crate) modified: UtcDateTime,
}
impl TryFrom<NodeRow> for NodeHead {
    type Error = Error;
    fn try_from(row: NodeRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            name: row.name.unwrap_or_default(),
            trashed: row.trashed,
            created: UtcDateTime::from_unix_timestamp(row.created)
                .or_raise(|| ErrorKind::InvalidData("created date"))?,
            modified: UtcDateTime::from_unix_timestamp(row.modified)
                .or_raise(|| ErrorKind::InvalidData("modified date"))?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_name_is_stored_as_null() {
        let row = NodeRow::from(&Node::root("0AAbc"));
        assert_eq!(row.name, None);
        let head = NodeHead::try_from(row).unwrap();
        assert_eq!(head.name, "");
    }

    #[test]
    fn test_model_to_row() {
        let created = UtcDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        let modified = UtcDateTime::from_unix_timestamp(1_700_000_600).unwrap();
        let node = Node::folder("1xyz", "Pictures").with_times(created, modified).with_trashed(true);
        let row = NodeRow::from(&node);
        assert_eq!(row.name.as_deref(), Some("Pictures"));
        assert!(row.trashed);
        assert_eq!(row.created, 1_700_000_000);
        assert_eq!(row.modified, 1_700_000_600);
    }

    #[test]
    fn test_out_of_range_timestamp_is_invalid() {
        let row = NodeRow {
            id: "1xyz".to_string(),
            name: Some("Pictures".to_string()),
            trashed: false,
            created: i64::MAX,
            modified: 0,
        };
        let err = NodeHead::try_from(row).err().unwrap();
        assert_eq!(*err, ErrorKind::InvalidData("created date"));
    }
}
