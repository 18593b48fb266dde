use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Counters describing what the display has done so far.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize)]
pub struct RenderStats {
    /// Ticks run.
    pub ticks: u64,
    /// Frames removed from the queue and applied.
    pub frames_drained: u64,
    /// Operations applied to the surface.
    pub ops_applied: u64,
    /// Operations dropped at apply time because the surface was resized after they were issued.
    pub ops_stale: u64,
    /// Operations rejected before reaching the queue (bad payload, protocol or configuration).
    pub ops_rejected: u64,
    /// Image decodes that failed.
    pub decode_failures: u64,
    /// Image decodes abandoned after their deadline.
    pub decode_expired: u64,
    /// Protocol violations observed.
    pub protocol_violations: u64,
    /// Video frames composited.
    pub video_frames_drawn: u64,
    /// Video chunks the codec refused.
    pub video_errors: u64,
    /// Wall time of the most recent tick.
    #[serde(with = "duration_micros")]
    pub last_tick: Duration,
    /// Frames drained during the last second.
    pub fps: f64,
}

/// Sliding one-second window of drain timestamps.
#[derive(Debug, Default)]
pub(crate) struct FpsWindow {
    drains: VecDeque<Instant>,
}

impl FpsWindow {
    const WINDOW: Duration = Duration::from_secs(1);

    pub(crate) fn record(&mut self, at: Instant) {
        self.drains.push_back(at);
    }

    pub(crate) fn rate(&mut self, now: Instant) -> f64 {
        while let Some(&front) = self.drains.front()
            && now.saturating_duration_since(front) > Self::WINDOW
        {
            self.drains.pop_front();
        }
        self.drains.len() as f64 / Self::WINDOW.as_secs_f64()
    }
}

mod duration_micros {
    use std::time::Duration;

    pub(super) fn serialize<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(u64::try_from(d.as_micros()).unwrap_or(u64::MAX))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/schedule/stats.rs"]
mod tests;
