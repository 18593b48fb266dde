use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::config::DisplayOpts;
use crate::decode::pool::{DecodePool, DecodeRequest};
use crate::events::{DisplayEvents, NoopEvents};
use crate::foundation::core::{FrameId, PixelRect, Rgb8};
use crate::foundation::error::{DisplayError, DisplayResult};
use crate::queue::frame_queue::{Completion, FrameQueue};
use crate::queue::op::{Operation, StampedOp};
use crate::schedule::stats::RenderStats;
use crate::schedule::tick::{Scheduler, TickContext, TickReport};
use crate::surface::Surface;
use crate::video::codec::{VideoChunk, VideoCodecFactory};
use crate::video::subchannel::{VideoChannels, VideoSubmit};

/// A remote display being reconstructed from rect commands.
///
/// The inbound methods mirror the protocol's rect commands and never fail: a rejected command is
/// logged, counted in [`RenderStats`], and dropped while the rest of its frame proceeds. Nothing
/// touches the [`Surface`] until [`Display::tick`] applies the oldest ready frame.
pub struct Display {
    opts: DisplayOpts,
    surface: Surface,
    queue: Arc<FrameQueue>,
    decoder: DecodePool,
    video: VideoChannels,
    scheduler: Scheduler,
    events: Box<dyn DisplayEvents>,
    decode_failures: Arc<AtomicU64>,
}

impl Display {
    /// Create a display with a `width`x`height` surface, no event sink and no video codec.
    pub fn new(width: u32, height: u32, opts: DisplayOpts) -> DisplayResult<Self> {
        opts.validate()?;
        let decoder = DecodePool::new(&opts.decode)?;
        tracing::debug!(
            width,
            height,
            decode_threads = decoder.threads(),
            max_pending_frames = opts.max_pending_frames,
            "display created"
        );
        Ok(Self {
            scheduler: Scheduler::new(opts.max_pending_frames),
            opts,
            surface: Surface::new(width, height),
            queue: Arc::new(FrameQueue::new()),
            decoder,
            video: VideoChannels::new(None),
            events: Box::new(NoopEvents),
            decode_failures: Arc::new(AtomicU64::new(0)),
        })
    }

    /// Route backpressure and flush signals to `events`.
    pub fn with_events(mut self, events: impl DisplayEvents + 'static) -> Self {
        self.events = Box::new(events);
        self
    }

    /// Enable video rects, creating sessions through `factory`.
    pub fn with_video_codec(mut self, factory: Arc<dyn VideoCodecFactory>) -> Self {
        self.video = VideoChannels::new(Some(factory));
        self
    }

    /// Queue a solid fill.
    pub fn fill(&mut self, x: u32, y: u32, w: u32, h: u32, rgb: Rgb8, frame: FrameId) {
        let op = Operation::Fill {
            rect: PixelRect::new(x, y, w, h),
            color: rgb,
        };
        self.enqueue(frame, op);
    }

    /// Queue a raw RGBA8 blit read from `pixels[offset..]`.
    ///
    /// A buffer shorter than `offset + w * h * 4` is a protocol violation.
    #[allow(clippy::too_many_arguments)]
    pub fn blit(
        &mut self,
        x: u32,
        y: u32,
        w: u32,
        h: u32,
        pixels: impl Into<Arc<[u8]>>,
        offset: usize,
        frame: FrameId,
    ) {
        let pixels = pixels.into();
        let needed = (w as usize)
            .checked_mul(h as usize)
            .and_then(|n| n.checked_mul(4))
            .and_then(|n| n.checked_add(offset));
        if needed.is_none_or(|n| pixels.len() < n) {
            self.reject(
                frame,
                DisplayError::protocol(format!(
                    "blit {w}x{h} at offset {offset} needs more than the {} bytes supplied",
                    pixels.len()
                )),
            );
            return;
        }
        let op = Operation::Blit {
            rect: PixelRect::new(x, y, w, h),
            pixels,
            offset,
        };
        self.enqueue(frame, op);
    }

    /// Queue a copy of the `w`x`h` region at `(src_x, src_y)` to `(dst_x, dst_y)`.
    #[allow(clippy::too_many_arguments)]
    pub fn copy(
        &mut self,
        src_x: u32,
        src_y: u32,
        w: u32,
        h: u32,
        dst_x: u32,
        dst_y: u32,
        frame: FrameId,
    ) {
        let op = Operation::Copy {
            src: PixelRect::new(src_x, src_y, w, h),
            dst_x,
            dst_y,
        };
        self.enqueue(frame, op);
    }

    /// Decode `bytes` off-thread and draw the result into the rect as part of `frame`.
    ///
    /// `frame` stays pending until the decode completes, fails, or misses its deadline.
    #[allow(clippy::too_many_arguments)]
    #[tracing::instrument(level = "trace", skip(self, bytes))]
    pub fn image(
        &mut self,
        x: u32,
        y: u32,
        w: u32,
        h: u32,
        mime: &str,
        bytes: impl Into<Arc<[u8]>>,
        frame: FrameId,
    ) {
        let rect = PixelRect::new(x, y, w, h);
        if rect.is_empty() {
            tracing::debug!(%frame, "skipping zero-area image rect");
            return;
        }
        let deadline = Instant::now() + self.opts.decode.deadline();
        let ticket = match self.queue.reserve(frame, deadline) {
            Ok(ticket) => ticket,
            Err(e) => {
                self.reject(frame, e);
                return;
            }
        };

        let generation = self.surface.generation();
        let queue = Arc::clone(&self.queue);
        let failures = Arc::clone(&self.decode_failures);
        let request = DecodeRequest {
            bytes: bytes.into(),
            format: mime.to_owned(),
        };
        self.decoder.submit(request, move |result| {
            let op = match result {
                Ok(image) => Some(StampedOp::new(generation, Operation::Image { rect, image })),
                Err(e) => {
                    tracing::warn!(%frame, "dropping image rect: {e}");
                    failures.fetch_add(1, Ordering::Relaxed);
                    None
                }
            };
            if queue.complete(ticket, op) == Completion::Stale {
                tracing::debug!(%frame, ticket = ticket.0, "late decode result discarded");
            }
        });
    }

    /// Feed a video chunk to the subchannel anchored at `(x, y)`.
    ///
    /// Video bypasses the frame queue; decoded frames are drawn by the next tick after they
    /// arrive.
    #[allow(clippy::too_many_arguments)]
    pub fn video(
        &mut self,
        x: u32,
        y: u32,
        w: u32,
        h: u32,
        bitstream: impl Into<Arc<[u8]>>,
        keyframe: bool,
        frame: FrameId,
    ) {
        let chunk = VideoChunk::new(keyframe, bitstream);
        match self.video.submit(PixelRect::new(x, y, w, h), &chunk) {
            Ok(VideoSubmit::Forwarded) => {
                tracing::trace!(%frame, keyframe, bytes = chunk.data.len(), "video chunk forwarded");
            }
            Ok(VideoSubmit::AwaitingKeyframe) => {
                tracing::debug!(%frame, "dropping video delta before first keyframe");
                self.scheduler.stats_mut().ops_rejected += 1;
            }
            Err(e @ DisplayError::Decode(_)) => {
                tracing::warn!(%frame, "video chunk skipped: {e}");
                self.scheduler.stats_mut().video_errors += 1;
            }
            Err(e) => self.reject(frame, e),
        }
    }

    /// Reallocate the surface and close every video session.
    ///
    /// Operations issued before the resize are dropped when their frame is applied.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.surface.resize(width, height);
        self.video.teardown_all();
        tracing::debug!(
            width,
            height,
            generation = self.surface.generation(),
            "surface resized"
        );
    }

    /// Run one scheduler tick.
    ///
    /// Video subchannels idle for longer than the configured timeout are closed first.
    pub fn tick(&mut self) -> TickReport {
        self.video
            .evict_idle(Instant::now(), self.opts.video_idle_timeout());
        self.scheduler.tick(TickContext {
            surface: &mut self.surface,
            queue: &self.queue,
            video: &mut self.video,
            events: self.events.as_mut(),
        })
    }

    /// Tick until no frame is pending or `timeout` elapses; returns `true` when idle.
    ///
    /// Ticks back-to-back while frames drain and sleeps the tick interval while waiting on
    /// decodes.
    pub fn flush_blocking(&mut self, timeout: Duration) -> bool {
        let started = Instant::now();
        loop {
            let report = self.tick();
            if self.queue.is_empty() {
                return true;
            }
            let elapsed = started.elapsed();
            if elapsed >= timeout {
                tracing::warn!(
                    pending = self.queue.pending_len(),
                    in_flight = self.queue.in_flight(),
                    "flush timed out"
                );
                return false;
            }
            if report.drained.is_none() {
                std::thread::sleep(self.opts.tick_interval().min(timeout - elapsed));
            }
        }
    }

    /// Backpressure state emitted by the most recent tick.
    pub fn is_saturated(&self) -> bool {
        self.scheduler.is_saturated()
    }

    /// Snapshot of the render counters.
    pub fn stats(&self) -> RenderStats {
        let mut stats = self.scheduler.stats().clone();
        stats.decode_failures = self.decode_failures.load(Ordering::Relaxed);
        stats
    }

    /// The surface as of the last tick.
    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    /// Frames waiting to be applied, oldest first.
    pub fn pending_frames(&self) -> Vec<FrameId> {
        self.queue.pending_frames()
    }

    /// Image decodes still running.
    pub fn decodes_in_flight(&self) -> usize {
        self.queue.in_flight()
    }

    /// Number of video subchannels with a live session.
    pub fn video_sessions(&self) -> usize {
        self.video.configured()
    }

    /// Options the display runs with.
    pub fn opts(&self) -> &DisplayOpts {
        &self.opts
    }

    fn enqueue(&mut self, frame: FrameId, op: Operation) {
        let op = StampedOp::new(self.surface.generation(), op);
        if let Err(e) = self.queue.enqueue(frame, op) {
            self.reject(frame, e);
        }
    }

    fn reject(&mut self, frame: FrameId, err: DisplayError) {
        tracing::warn!(%frame, "dropping rect: {err}");
        let stats = self.scheduler.stats_mut();
        stats.ops_rejected += 1;
        if matches!(err, DisplayError::ProtocolViolation(_)) {
            stats.protocol_violations += 1;
        }
    }
}

impl std::fmt::Debug for Display {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Display")
            .field("width", &self.surface.width())
            .field("height", &self.surface.height())
            .field("generation", &self.surface.generation())
            .field("pending", &self.queue.pending_len())
            .field("decoder", &self.decoder)
            .finish()
    }
}
