use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};

use crate::decode::still::DecodedImage;
use crate::foundation::core::PixelRect;
use crate::foundation::error::{DisplayError, DisplayResult};
use crate::video::codec::{
    DecodedVideoFrame, SessionId, VideoChunk, VideoCodec, VideoCodecFactory, VideoConfig,
};

/// Externally visible session state of a subchannel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VideoState {
    /// No codec session.
    Unconfigured,
    /// A codec session is bound to the subchannel's rectangle.
    Configured,
}

/// What happened to a submitted chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VideoSubmit {
    /// Handed to the codec.
    Forwarded,
    /// Dropped: the session has not seen a keyframe yet.
    AwaitingKeyframe,
}

enum Session {
    Unconfigured,
    Configured {
        rect: PixelRect,
        id: SessionId,
        codec: Box<dyn VideoCodec>,
        awaiting_key: bool,
    },
}

/// Video path for one rectangle origin: owns exactly one codec session at a time.
pub struct VideoSubchannel {
    x: u32,
    y: u32,
    session: Session,
    last_used: Instant,
}

impl VideoSubchannel {
    /// Create an unconfigured subchannel anchored at `(x, y)`.
    pub fn new(x: u32, y: u32) -> Self {
        Self {
            x,
            y,
            session: Session::Unconfigured,
            last_used: Instant::now(),
        }
    }

    /// When a chunk was last submitted.
    pub fn last_used(&self) -> Instant {
        self.last_used
    }

    /// Current state.
    pub fn state(&self) -> VideoState {
        match self.session {
            Session::Unconfigured => VideoState::Unconfigured,
            Session::Configured { .. } => VideoState::Configured,
        }
    }

    /// Current session id.
    pub fn session(&self) -> Option<SessionId> {
        match &self.session {
            Session::Unconfigured => None,
            Session::Configured { id, .. } => Some(*id),
        }
    }

    /// Rectangle the current session draws into.
    pub fn bound_rect(&self) -> Option<PixelRect> {
        match &self.session {
            Session::Unconfigured => None,
            Session::Configured { rect, .. } => Some(*rect),
        }
    }

    /// Feed a chunk, configuring (or reconfiguring after a size change) first.
    ///
    /// The replacement codec is created before the old one is closed, so invalid dimensions or
    /// a codec refusal leave the previous session running.
    pub fn submit(
        &mut self,
        width: u32,
        height: u32,
        chunk: &VideoChunk,
        factory: &dyn VideoCodecFactory,
        frames: &Sender<DecodedVideoFrame>,
        next_session: &mut u64,
    ) -> DisplayResult<VideoSubmit> {
        let rect = PixelRect::new(self.x, self.y, width, height);
        if rect.is_empty() {
            return Err(DisplayError::configuration(format!(
                "video rect {width}x{height} at ({}, {}) has no area",
                self.x, self.y
            )));
        }
        self.last_used = Instant::now();

        let needs_session = match &self.session {
            Session::Unconfigured => true,
            Session::Configured { rect: bound, .. } => {
                (bound.width, bound.height) != (width, height)
            }
        };
        if needs_session {
            let id = SessionId(*next_session);
            let codec = factory.create(
                VideoConfig {
                    session: id,
                    width,
                    height,
                },
                frames.clone(),
            )?;
            *next_session += 1;
            if let Session::Configured { rect: bound, .. } = &self.session {
                tracing::debug!(
                    from = ?(bound.width, bound.height),
                    to = ?(width, height),
                    "video rect resized, replacing session"
                );
            }
            self.teardown();
            tracing::debug!(session = id.0, width, height, "video session configured");
            self.session = Session::Configured {
                rect,
                id,
                codec,
                awaiting_key: true,
            };
        }

        let Session::Configured {
            codec,
            awaiting_key,
            ..
        } = &mut self.session
        else {
            return Err(DisplayError::configuration("video session missing"));
        };
        if *awaiting_key && !chunk.keyframe {
            return Ok(VideoSubmit::AwaitingKeyframe);
        }
        codec.decode(chunk)?;
        if chunk.keyframe {
            *awaiting_key = false;
        }
        Ok(VideoSubmit::Forwarded)
    }

    /// Close the codec and return to [`VideoState::Unconfigured`].
    pub fn teardown(&mut self) {
        if let Session::Configured { mut codec, id, .. } =
            std::mem::replace(&mut self.session, Session::Unconfigured)
        {
            codec.close();
            tracing::debug!(session = id.0, "video session closed");
        }
    }
}

impl Drop for VideoSubchannel {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// All video subchannels of a display plus the channel their codecs emit frames on.
pub struct VideoChannels {
    factory: Option<Arc<dyn VideoCodecFactory>>,
    channels: HashMap<(u32, u32), VideoSubchannel>,
    next_session: u64,
    tx: Sender<DecodedVideoFrame>,
    rx: Receiver<DecodedVideoFrame>,
}

impl VideoChannels {
    /// Create the router; without a factory every video operation is a configuration error.
    pub fn new(factory: Option<Arc<dyn VideoCodecFactory>>) -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        Self {
            factory,
            channels: HashMap::new(),
            next_session: 0,
            tx,
            rx,
        }
    }

    /// Route a chunk to the subchannel anchored at the rect origin.
    pub fn submit(&mut self, rect: PixelRect, chunk: &VideoChunk) -> DisplayResult<VideoSubmit> {
        let factory = self
            .factory
            .as_deref()
            .ok_or_else(|| DisplayError::configuration("no video codec installed"))?;
        self.channels
            .entry((rect.x, rect.y))
            .or_insert_with(|| VideoSubchannel::new(rect.x, rect.y))
            .submit(
                rect.width,
                rect.height,
                chunk,
                factory,
                &self.tx,
                &mut self.next_session,
            )
    }

    /// Subchannel anchored at `(x, y)`.
    pub fn get(&self, x: u32, y: u32) -> Option<&VideoSubchannel> {
        self.channels.get(&(x, y))
    }

    /// Collect frames emitted since the last call, paired with the rect they draw into.
    ///
    /// Frames from sessions that no longer exist are dropped.
    pub fn drain_ready(&mut self) -> Vec<(PixelRect, DecodedImage)> {
        let live: HashMap<SessionId, PixelRect> = self
            .channels
            .values()
            .filter_map(|c| Some((c.session()?, c.bound_rect()?)))
            .collect();
        self.rx
            .try_iter()
            .filter_map(|frame| {
                let rect = live.get(&frame.session).copied();
                if rect.is_none() {
                    tracing::trace!(session = frame.session.0, "dropping frame of closed session");
                }
                Some((rect?, frame.image))
            })
            .collect()
    }

    /// Close and forget every subchannel that received no chunk within `max_idle` of `now`.
    ///
    /// Each configured subchannel holds a live codec session, so this bounds how many sessions
    /// survive once the remote side stops updating an area. Returns the number evicted.
    pub fn evict_idle(&mut self, now: Instant, max_idle: Duration) -> usize {
        let before = self.channels.len();
        self.channels.retain(|&(x, y), c| {
            let keep = now.saturating_duration_since(c.last_used) <= max_idle;
            if !keep {
                tracing::debug!(x, y, session = ?c.session(), "evicting idle video subchannel");
            }
            keep
        });
        before - self.channels.len()
    }

    /// Tear down every session.
    pub fn teardown_all(&mut self) {
        self.channels.clear();
    }

    /// Number of subchannels with a configured session.
    pub fn configured(&self) -> usize {
        self.channels
            .values()
            .filter(|c| c.state() == VideoState::Configured)
            .count()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/video/subchannel.rs"]
mod tests;
