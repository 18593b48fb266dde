use std::sync::Arc;

use crate::decode::still::DecodedImage;
use crate::foundation::core::{PixelRect, Rgb8};
use crate::video::codec::VideoChunk;

/// Operation kinds, declared in the order a frame applies them.
///
/// Copies come last because they read back pixels the other kinds just wrote.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OpKind {
    /// Solid colour fill.
    Fill,
    /// Raw pixel blit.
    Blit,
    /// Decoded still image draw.
    Image,
    /// Region copy within the surface.
    Copy,
    /// Video bitstream chunk; routed to a video subchannel, never queued per frame.
    Video,
}

impl OpKind {
    /// Number of per-frame lanes (every kind except [`OpKind::Video`]).
    pub const LANES: usize = 4;

    /// Lane index inside a frame, `None` for kinds that bypass the frame queue.
    pub fn lane(self) -> Option<usize> {
        match self {
            Self::Fill => Some(0),
            Self::Blit => Some(1),
            Self::Image => Some(2),
            Self::Copy => Some(3),
            Self::Video => None,
        }
    }
}

/// One drawing instruction with its target rectangle and payload.
#[derive(Clone, Debug)]
pub enum Operation {
    /// Fill `rect` with `color`.
    Fill {
        /// Target rectangle.
        rect: PixelRect,
        /// Fill colour.
        color: Rgb8,
    },
    /// Replace `rect` with RGBA8 pixels starting at `offset` in `pixels`.
    Blit {
        /// Target rectangle.
        rect: PixelRect,
        /// Shared pixel buffer (may hold several rects).
        pixels: Arc<[u8]>,
        /// Byte offset of the first pixel.
        offset: usize,
    },
    /// Copy the pixels under `src` to `(dst_x, dst_y)`.
    Copy {
        /// Source rectangle.
        src: PixelRect,
        /// Destination left edge.
        dst_x: u32,
        /// Destination top edge.
        dst_y: u32,
    },
    /// Draw an already decoded image into `rect`.
    Image {
        /// Target rectangle.
        rect: PixelRect,
        /// Decoded pixels.
        image: DecodedImage,
    },
    /// Feed a video chunk to the subchannel bound to `rect`.
    Video {
        /// Target rectangle.
        rect: PixelRect,
        /// Bitstream chunk.
        chunk: VideoChunk,
    },
}

impl Operation {
    /// Kind tag.
    pub fn kind(&self) -> OpKind {
        match self {
            Self::Fill { .. } => OpKind::Fill,
            Self::Blit { .. } => OpKind::Blit,
            Self::Copy { .. } => OpKind::Copy,
            Self::Image { .. } => OpKind::Image,
            Self::Video { .. } => OpKind::Video,
        }
    }

    /// Rectangle written by the operation.
    pub fn target(&self) -> PixelRect {
        match self {
            Self::Fill { rect, .. }
            | Self::Blit { rect, .. }
            | Self::Image { rect, .. }
            | Self::Video { rect, .. } => *rect,
            Self::Copy { src, dst_x, dst_y } => {
                PixelRect::new(*dst_x, *dst_y, src.width, src.height)
            }
        }
    }
}

/// An operation tagged with the surface generation it was issued against.
#[derive(Clone, Debug)]
pub struct StampedOp {
    /// Surface generation at issue time.
    pub generation: u64,
    /// The operation.
    pub op: Operation,
}

impl StampedOp {
    /// Tag `op` with `generation`.
    pub fn new(generation: u64, op: Operation) -> Self {
        Self { generation, op }
    }
}
