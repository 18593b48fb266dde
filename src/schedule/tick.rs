use std::time::Instant;

use crate::events::DisplayEvents;
use crate::foundation::core::FrameId;
use crate::queue::frame_queue::{DrainedFrame, FrameQueue, Take};
use crate::queue::op::{Operation, StampedOp};
use crate::schedule::stats::{FpsWindow, RenderStats};
use crate::surface::Surface;
use crate::video::subchannel::VideoChannels;

/// What one tick did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Frame drained and applied.
    pub drained: Option<FrameId>,
    /// Oldest frame, when it was still waiting on decodes.
    pub blocked: Option<FrameId>,
    /// Backpressure state emitted this tick.
    pub saturated: bool,
    /// `true` when this tick emptied the queue.
    pub flushed: bool,
    /// Operations applied.
    pub applied: usize,
    /// Operations dropped as stale.
    pub stale: usize,
    /// Video frames composited.
    pub video_frames: usize,
}

/// Everything a tick reads or mutates, borrowed from the owning display.
pub(crate) struct TickContext<'a> {
    pub(crate) surface: &'a mut Surface,
    pub(crate) queue: &'a FrameQueue,
    pub(crate) video: &'a mut VideoChannels,
    pub(crate) events: &'a mut dyn DisplayEvents,
}

/// Drives the frame queue onto the surface one frame per tick.
#[derive(Debug)]
pub(crate) struct Scheduler {
    max_pending_frames: usize,
    saturated: bool,
    stats: RenderStats,
    fps: FpsWindow,
}

impl Scheduler {
    pub(crate) fn new(max_pending_frames: usize) -> Self {
        Self {
            max_pending_frames,
            saturated: false,
            stats: RenderStats::default(),
            fps: FpsWindow::default(),
        }
    }

    pub(crate) fn is_saturated(&self) -> bool {
        self.saturated
    }

    pub(crate) fn stats(&self) -> &RenderStats {
        &self.stats
    }

    pub(crate) fn stats_mut(&mut self) -> &mut RenderStats {
        &mut self.stats
    }

    /// Expire overdue decodes, draw ready video, signal backpressure, then apply at most one
    /// frame.
    ///
    /// Backpressure is computed before draining, so a saturated signal is always observed ahead
    /// of the drain it accompanies.
    #[tracing::instrument(level = "trace", skip_all, fields(tick = self.stats.ticks))]
    pub(crate) fn tick(&mut self, ctx: TickContext<'_>) -> TickReport {
        let started = Instant::now();
        let mut report = TickReport::default();

        for (ticket, frame) in ctx.queue.expire_overdue(started) {
            tracing::warn!(ticket = ticket.0, %frame, "image decode missed its deadline");
            self.stats.decode_expired += 1;
        }

        for (rect, image) in ctx.video.drain_ready() {
            ctx.surface.draw_image(rect, &image);
            report.video_frames += 1;
        }
        self.stats.video_frames_drawn += report.video_frames as u64;

        let pending = ctx.queue.pending_len();
        let saturated = pending > self.max_pending_frames;
        if saturated != self.saturated {
            tracing::debug!(pending, saturated, "backpressure changed");
        }
        self.saturated = saturated;
        report.saturated = saturated;
        ctx.events.on_backpressure(saturated);

        match ctx.queue.take_oldest() {
            Take::Drained(frame) => {
                report.drained = Some(frame.frame);
                self.apply(ctx.surface, frame, &mut report);
                self.stats.frames_drained += 1;
                self.fps.record(started);
            }
            Take::Blocked(frame) => {
                tracing::trace!(%frame, "oldest frame waiting on decodes");
                report.blocked = Some(frame);
            }
            Take::Empty => {}
        }

        if pending > 0 && ctx.queue.is_empty() {
            report.flushed = true;
            ctx.events.on_flush_ready();
        }

        let now = Instant::now();
        self.stats.ticks += 1;
        self.stats.last_tick = now.duration_since(started);
        self.stats.fps = self.fps.rate(now);
        report
    }

    fn apply(&mut self, surface: &mut Surface, frame: DrainedFrame, report: &mut TickReport) {
        let generation = surface.generation();
        for StampedOp {
            generation: issued,
            op,
        } in frame.ops
        {
            if issued != generation {
                tracing::debug!(
                    frame = %frame.frame,
                    kind = ?op.kind(),
                    rect = ?op.target(),
                    issued,
                    current = generation,
                    "dropping operation issued before resize"
                );
                report.stale += 1;
                continue;
            }
            match op {
                Operation::Fill { rect, color } => surface.fill(rect, color),
                Operation::Blit {
                    rect,
                    pixels,
                    offset,
                } => surface.blit(rect, &pixels, offset),
                Operation::Image { rect, image } => surface.draw_image(rect, &image),
                Operation::Copy { src, dst_x, dst_y } => surface.copy_region(src, dst_x, dst_y),
                Operation::Video { rect, .. } => {
                    tracing::warn!(frame = %frame.frame, ?rect, "video operation found in frame queue");
                    self.stats.protocol_violations += 1;
                    continue;
                }
            }
            report.applied += 1;
        }
        self.stats.ops_applied += report.applied as u64;
        self.stats.ops_stale += report.stale as u64;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/schedule/tick.rs"]
mod tests;
