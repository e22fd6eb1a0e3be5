use crate::error::{Error, ErrorKind};
use crate::node::{ImageMeta, VideoMeta};
use exn::ResultExt;

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ImageRow {
    pub(crate) width: i64,
    pub(crate) height: i64,
}
impl From<&ImageMeta> for ImageRow {
    fn from(image: &ImageMeta) -> Self {
        Self { width: i64::from(image.width), height: i64::from(image.height) }
    }
}
impl TryFrom<ImageRow> for ImageMeta {
    type Error = Error;
    fn try_from(row: ImageRow) -> Result<Self, Self::Error> {
        Ok(Self {
            width: u32::try_from(row.width).or_raise(|| ErrorKind::InvalidData("image width"))?,
            height: u32::try_from(row.height).or_raise(|| ErrorKind::InvalidData("image height"))?,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct VideoRow {
    pub(crate) width: i64,
    pub(crate) height: i64,
    pub(crate) ms_duration: i64,
}
impl TryFrom<&VideoMeta> for VideoRow {
    type Error = Error;
    fn try_from(video: &VideoMeta) -> Result<Self, Self::Error> {
        Ok(Self {
            width: i64::from(video.width),
            height: i64::from(video.height),
            ms_duration: i64::try_from(video.ms_duration).or_raise(|| ErrorKind::InvalidData("video duration"))?,
        })
    }
}
impl TryFrom<VideoRow> for VideoMeta {
    type Error = Error;
    fn try_from(row: VideoRow) -> Result<Self, Self::Error> {
        Ok(Self {
            width: u32::try_from(row.width).or_raise(|| ErrorKind::InvalidData("video width"))?,
            height: u32::try_from(row.height).or_raise(|| ErrorKind::InvalidData("video height"))?,
            ms_duration: u64::try_from(row.ms_duration).or_raise(|| ErrorKind::InvalidData("video duration"))?,
        })
    }
}
