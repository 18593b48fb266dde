pub(crate) mod codec;
#[cfg(feature = "media-ffmpeg")]
pub(crate) mod ffmpeg;
pub(crate) mod subchannel;
