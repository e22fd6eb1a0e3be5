use crate::error::{Error, ErrorKind};
use crate::node::FileMeta;
use exn::ResultExt;

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct FileRow {
    pub(crate) id: String,
    pub(crate) mime_type: String,
    pub(crate) hash: String,
    pub(crate) size: i64,
}
impl TryFrom<(&str, &FileMeta)> for FileRow {
    type Error = Error;
    fn try_from((id, file): (&str, &FileMeta)) -> Result<Self, Self::Error> {
        Ok(Self {
            id: id.to_string(),
            mime_type: file.mime_type.clone(),
            hash: file.hash.clone(),
            size: i64::try_from(file.size).or_raise(|| ErrorKind::InvalidData("file size"))?,
        })
    }
}
impl TryFrom<FileRow> for FileMeta {
    type Error = Error;
    fn try_from(row: FileRow) -> Result<Self, Self::Error> {
        Ok(Self {
            mime_type: row.mime_type,
            hash: row.hash,
            size: u64::try_from(row.size).or_raise(|| ErrorKind::InvalidData("file size"))?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_to_model() {
        let row = FileRow {
            id: "1a2b3c".to_string(),
            mime_type: "text/plain".to_string(),
            hash: "d41d8cd98f00b204e9800998ecf8427e".to_string(),
            size: 1024,
        };
        let model = FileMeta::try_from(row).unwrap();
        assert_eq!(model.size, 1024);
        assert_eq!(model.mime_type, "text/plain");
    }

    #[test]
    fn test_negative_size_is_invalid() {
        let row = FileRow {
            id: "1a2b3c".to_string(),
            mime_type: "text/plain".to_string(),
            hash: "d41d8cd98f00b204e9800998ecf8427e".to_string(),
            size: -1,
        };
        let err = FileMeta::try_from(row).unwrap_err();
        assert_eq!(*err, ErrorKind::InvalidData("file size"));
    }

    #[test]
    fn test_oversized_model_is_invalid() {
        let model = FileMeta {
            mime_type: "application/octet-stream".to_string(),
            hash: "d41d8cd98f00b204e9800998ecf8427e".to_string(),
            size: u64::MAX,
        };
        let err = FileRow::try_from(("1a2b3c", &model)).unwrap_err();
        assert_eq!(*err, ErrorKind::InvalidData("file size"));
    }
}
