use std::collections::{BTreeMap, HashMap};
use std::time::Instant;

use parking_lot::Mutex;
use smallvec::SmallVec;

use crate::foundation::core::FrameId;
use crate::foundation::error::{DisplayError, DisplayResult};
use crate::queue::op::{OpKind, StampedOp};

/// Handle for one in-flight decode reservation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TicketId(pub u64);

/// Every queued operation of one frame, in apply order.
#[derive(Debug)]
pub struct DrainedFrame {
    /// Frame the operations belong to.
    pub frame: FrameId,
    /// Fill, then blit, then image, then copy operations; FIFO within each kind.
    pub ops: Vec<StampedOp>,
}

/// Result of [`FrameQueue::take_oldest`].
#[derive(Debug)]
pub enum Take {
    /// The oldest frame was removed from the queue.
    Drained(DrainedFrame),
    /// The oldest frame still waits on decodes; nothing younger may be applied.
    Blocked(FrameId),
    /// No frame is pending.
    Empty,
}

/// Result of [`FrameQueue::complete`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Completion {
    /// The decoded operation joined its frame.
    Enqueued,
    /// The decode failed; the frame no longer waits for it.
    Failed,
    /// The ticket had already expired or resolved; the result was discarded.
    Stale,
}

#[derive(Debug, Default)]
struct FrameLanes {
    lanes: [Vec<StampedOp>; OpKind::LANES],
    in_flight: u32,
}

impl FrameLanes {
    fn queued(&self) -> usize {
        self.lanes.iter().map(Vec::len).sum()
    }
}

#[derive(Debug)]
struct Reservation {
    frame: FrameId,
    deadline: Instant,
}

#[derive(Debug, Default)]
struct QueueState {
    frames: BTreeMap<FrameId, FrameLanes>,
    tickets: HashMap<TicketId, Reservation>,
    next_ticket: u64,
    last_drained: Option<FrameId>,
}

impl QueueState {
    fn check_frame(&self, frame: FrameId) -> DisplayResult<()> {
        if let Some(last) = self.last_drained
            && frame < last
        {
            return Err(DisplayError::protocol(format!(
                "frame {frame} arrived after frame {last} was rendered"
            )));
        }
        Ok(())
    }

    fn remove(&mut self, frame: FrameId) -> Option<DrainedFrame> {
        let lanes = self.frames.remove(&frame)?;
        let mut ops = Vec::with_capacity(lanes.queued());
        for lane in lanes.lanes {
            ops.extend(lane);
        }
        self.last_drained = Some(self.last_drained.map_or(frame, |last| last.max(frame)));
        Some(DrainedFrame { frame, ops })
    }
}

/// Ready-to-apply operations grouped by frame and kind, plus in-flight decode bookkeeping.
///
/// A frame is pending from its first enqueue or reservation until it is drained. All state sits
/// behind one mutex so decode workers can complete into the queue while the render tick drains
/// it.
#[derive(Debug, Default)]
pub struct FrameQueue {
    state: Mutex<QueueState>,
}

impl FrameQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a ready operation to the tail of its kind's lane for `frame`.
    ///
    /// Video operations and frames older than the last drained one are protocol violations.
    pub fn enqueue(&self, frame: FrameId, op: StampedOp) -> DisplayResult<()> {
        let lane = op.op.kind().lane().ok_or_else(|| {
            DisplayError::protocol("video operations are not queued per frame")
        })?;
        let mut st = self.state.lock();
        st.check_frame(frame)?;
        st.frames.entry(frame).or_default().lanes[lane].push(op);
        Ok(())
    }

    /// Register a decode that will later complete into `frame`.
    ///
    /// The frame cannot be drained until every reservation is completed or expired.
    pub fn reserve(&self, frame: FrameId, deadline: Instant) -> DisplayResult<TicketId> {
        let mut st = self.state.lock();
        st.check_frame(frame)?;
        let ticket = TicketId(st.next_ticket);
        st.next_ticket += 1;
        st.frames.entry(frame).or_default().in_flight += 1;
        st.tickets.insert(ticket, Reservation { frame, deadline });
        Ok(ticket)
    }

    /// Resolve a reservation with its decoded operation, or `None` when the decode failed.
    pub fn complete(&self, ticket: TicketId, op: Option<StampedOp>) -> Completion {
        let mut st = self.state.lock();
        let Some(res) = st.tickets.remove(&ticket) else {
            return Completion::Stale;
        };
        let Some(lanes) = st.frames.get_mut(&res.frame) else {
            return Completion::Stale;
        };
        lanes.in_flight = lanes.in_flight.saturating_sub(1);
        match op.and_then(|op| op.op.kind().lane().map(|lane| (lane, op))) {
            Some((lane, op)) => {
                lanes.lanes[lane].push(op);
                Completion::Enqueued
            }
            None => Completion::Failed,
        }
    }

    /// Force-fail every reservation whose deadline is at or before `now`.
    pub fn expire_overdue(&self, now: Instant) -> SmallVec<[(TicketId, FrameId); 4]> {
        let mut st = self.state.lock();
        let mut expired: SmallVec<[(TicketId, FrameId); 4]> = st
            .tickets
            .iter()
            .filter(|(_, r)| r.deadline <= now)
            .map(|(t, r)| (*t, r.frame))
            .collect();
        expired.sort_unstable();
        for (ticket, frame) in &expired {
            st.tickets.remove(ticket);
            if let Some(lanes) = st.frames.get_mut(frame) {
                lanes.in_flight = lanes.in_flight.saturating_sub(1);
            }
        }
        expired
    }

    /// Remove and return every operation of the smallest pending frame, unless it still has
    /// decodes in flight.
    pub fn take_oldest(&self) -> Take {
        let mut st = self.state.lock();
        let Some((&frame, lanes)) = st.frames.first_key_value() else {
            return Take::Empty;
        };
        if lanes.in_flight > 0 {
            return Take::Blocked(frame);
        }
        st.remove(frame).map_or(Take::Empty, Take::Drained)
    }

    /// Remove and return every operation of `frame`.
    ///
    /// Returns `None` when the frame is not pending or still has decodes in flight, so draining
    /// the same frame twice is a no-op.
    pub fn drain(&self, frame: FrameId) -> Option<DrainedFrame> {
        let mut st = self.state.lock();
        if st.frames.get(&frame)?.in_flight > 0 {
            return None;
        }
        st.remove(frame)
    }

    /// Smallest pending frame.
    pub fn oldest(&self) -> Option<FrameId> {
        self.state.lock().frames.keys().next().copied()
    }

    /// Pending frames in ascending order.
    pub fn pending_frames(&self) -> Vec<FrameId> {
        self.state.lock().frames.keys().copied().collect()
    }

    /// Number of pending frames.
    pub fn pending_len(&self) -> usize {
        self.state.lock().frames.len()
    }

    /// Queued (ready) operations across all frames.
    pub fn queued_ops(&self) -> usize {
        self.state.lock().frames.values().map(FrameLanes::queued).sum()
    }

    /// Outstanding decode reservations.
    pub fn in_flight(&self) -> usize {
        self.state.lock().tickets.len()
    }

    /// `true` when no frame is pending.
    pub fn is_empty(&self) -> bool {
        self.state.lock().frames.is_empty()
    }

    /// Most recently drained frame.
    pub fn last_drained(&self) -> Option<FrameId> {
        self.state.lock().last_drained
    }
}

#[cfg(test)]
#[path = "../../tests/unit/queue/frame_queue.rs"]
mod tests;
