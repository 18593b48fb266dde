//! Frame composition core for remote-framebuffer viewers.
//!
//! A [`Display`] accepts rect commands (fills, raw blits, region copies, compressed images and
//! video chunks) tagged with a [`FrameId`], decodes images on a worker pool, and applies each
//! frame to its [`Surface`] atomically and in ascending frame order, one frame per
//! [`Display::tick`]. Queue depth is reported back through [`DisplayEvents`] so the network
//! reader can throttle.
//!
//! ```
//! use rfb_display::{Display, DisplayOpts, FrameId, Rgb8};
//!
//! let mut display = Display::new(4, 4, DisplayOpts::default())?;
//! display.fill(0, 0, 4, 4, Rgb8::new(255, 0, 0), FrameId(1));
//! display.tick();
//! assert_eq!(display.surface().pixel(2, 2), Some([255, 0, 0, 255]));
//! # Ok::<(), rfb_display::DisplayError>(())
//! ```
#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

mod config;
mod decode;
mod display;
mod events;
mod foundation;
mod queue;
mod replay;
mod schedule;
mod surface;
mod video;

pub use config::DisplayOpts;
pub use decode::pool::{DecodePool, DecodePoolOpts, DecodeRequest};
pub use decode::still::{DecodedImage, decode_image, resolve_format};
pub use display::Display;
pub use events::{DisplayEvent, DisplayEvents, NoopEvents};
pub use foundation::core::{FrameId, PixelRect, Rgb8};
pub use foundation::error::{DisplayError, DisplayResult};
pub use queue::frame_queue::{Completion, DrainedFrame, FrameQueue, Take, TicketId};
pub use queue::op::{OpKind, Operation, StampedOp};
pub use replay::{ReplayCommand, ReplayScript, ReplaySummary};
pub use schedule::stats::RenderStats;
pub use schedule::tick::TickReport;
pub use surface::Surface;
pub use video::codec::{
    DecodedVideoFrame, SessionId, VideoChunk, VideoCodec, VideoCodecFactory, VideoConfig,
    VideoFrameSender,
};
#[cfg(feature = "media-ffmpeg")]
#[cfg_attr(docsrs, doc(cfg(feature = "media-ffmpeg")))]
pub use video::ffmpeg::{FfmpegVp8Factory, is_ffmpeg_on_path};
pub use video::subchannel::{VideoChannels, VideoState, VideoSubchannel, VideoSubmit};
