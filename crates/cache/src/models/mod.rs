mod file;
mod media;
mod node;

pub(crate) use self::file::FileRow;
pub(crate) use self::media::{ImageRow, VideoRow};
pub(crate) use self::node::{NodeHead, NodeRow};
