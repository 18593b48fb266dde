use std::sync::Arc;

use crate::decode::still::DecodedImage;
use crate::foundation::error::{DisplayError, DisplayResult};

/// One encoded video chunk as received from the protocol layer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VideoChunk {
    /// `true` for a keyframe, `false` for a delta.
    pub keyframe: bool,
    /// Opaque bitstream bytes.
    pub data: Arc<[u8]>,
}

impl VideoChunk {
    /// Build a chunk from its flag and bitstream.
    pub fn new(keyframe: bool, data: impl Into<Arc<[u8]>>) -> Self {
        Self {
            keyframe,
            data: data.into(),
        }
    }

    /// Split a payload whose first byte is the keyframe flag and the rest the bitstream.
    pub fn from_tagged(payload: &[u8]) -> DisplayResult<Self> {
        let (&flag, rest) = payload
            .split_first()
            .ok_or_else(|| DisplayError::protocol("empty video payload"))?;
        Ok(Self::new(flag != 0, rest))
    }
}

/// Identifies one codec session; frames from torn-down sessions are discarded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u64);

/// Session parameters handed to a codec at configuration time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VideoConfig {
    /// Session the codec serves.
    pub session: SessionId,
    /// Coded width in pixels.
    pub width: u32,
    /// Coded height in pixels.
    pub height: u32,
}

/// A decoded frame emitted by a codec session.
#[derive(Clone, Debug)]
pub struct DecodedVideoFrame {
    /// Session that produced the frame.
    pub session: SessionId,
    /// Pixels; dropped right after the frame is drawn.
    pub image: DecodedImage,
}

/// Where codec sessions emit decoded frames.
pub type VideoFrameSender = crossbeam_channel::Sender<DecodedVideoFrame>;

/// A persistent, stateful decoder session bound to one video rectangle.
///
/// `decode` only submits; decoded frames arrive later on the [`VideoFrameSender`] the session
/// was created with, possibly from another thread.
pub trait VideoCodec: Send {
    /// Feed one chunk to the decoder.
    fn decode(&mut self, chunk: &VideoChunk) -> DisplayResult<()>;

    /// Release decoder resources. Called once when the session is torn down.
    fn close(&mut self) {}
}

/// Creates codec sessions for video subchannels.
pub trait VideoCodecFactory: Send + Sync {
    /// Configure a new session, failing with [`DisplayError::Configuration`] when the codec
    /// cannot serve `cfg`.
    fn create(
        &self,
        cfg: VideoConfig,
        frames: VideoFrameSender,
    ) -> DisplayResult<Box<dyn VideoCodec>>;
}

#[cfg(test)]
#[path = "../../tests/unit/video/codec.rs"]
mod tests;
