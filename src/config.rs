use std::path::Path;
use std::time::Duration;

use anyhow::Context as _;

use crate::decode::pool::DecodePoolOpts;
use crate::foundation::error::{DisplayError, DisplayResult};

/// Display tuning knobs.
///
/// Every field has a default, so a JSON document only needs the fields it overrides.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct DisplayOpts {
    /// Pending frame count above which backpressure is signalled.
    pub max_pending_frames: usize,
    /// Decode pool settings.
    pub decode: DecodePoolOpts,
    /// Period between ticks when [`crate::Display::flush_blocking`] drives the scheduler.
    pub tick_interval_ms: u64,
    /// Video subchannels that receive no chunk for this long are closed on the next tick.
    pub video_idle_timeout_ms: u64,
}

impl Default for DisplayOpts {
    fn default() -> Self {
        Self {
            max_pending_frames: 3,
            decode: DecodePoolOpts::default(),
            tick_interval_ms: 16,
            video_idle_timeout_ms: 30_000,
        }
    }
}

impl DisplayOpts {
    /// Parse and validate a JSON document.
    pub fn from_json_str(json: &str) -> DisplayResult<Self> {
        let opts: Self = serde_json::from_str(json)
            .map_err(|e| DisplayError::validation(format!("invalid display options: {e}")))?;
        opts.validate()?;
        Ok(opts)
    }

    /// Read, parse and validate a JSON file.
    pub fn from_path(path: &Path) -> DisplayResult<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("read display options '{}'", path.display()))?;
        Self::from_json_str(&json)
    }

    /// Reject values the scheduler cannot run with.
    pub fn validate(&self) -> DisplayResult<()> {
        if self.max_pending_frames == 0 {
            return Err(DisplayError::validation("max_pending_frames must be >= 1"));
        }
        if self.decode.deadline_ms == 0 {
            return Err(DisplayError::validation("decode.deadline_ms must be > 0"));
        }
        if self.decode.threads == Some(0) {
            return Err(DisplayError::validation(
                "decode.threads must be >= 1 when set",
            ));
        }
        if self.tick_interval_ms == 0 {
            return Err(DisplayError::validation("tick_interval_ms must be > 0"));
        }
        if self.video_idle_timeout_ms == 0 {
            return Err(DisplayError::validation("video_idle_timeout_ms must be > 0"));
        }
        Ok(())
    }

    /// Tick period as a [`Duration`].
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Video idle timeout as a [`Duration`].
    pub fn video_idle_timeout(&self) -> Duration {
        Duration::from_millis(self.video_idle_timeout_ms)
    }
}

#[cfg(test)]
#[path = "../tests/unit/config.rs"]
mod tests;
