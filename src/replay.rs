use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context as _;

use crate::display::Display;
use crate::foundation::core::{FrameId, Rgb8};
use crate::foundation::error::{DisplayError, DisplayResult};

/// One line of a replay script.
///
/// Scripts are JSON lines tagged by `op`; file payloads are resolved against the script's
/// directory.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "op", rename_all = "snake_case", deny_unknown_fields)]
pub enum ReplayCommand {
    /// Reallocate the surface.
    Resize {
        /// New width.
        width: u32,
        /// New height.
        height: u32,
    },
    /// Solid fill.
    Fill {
        /// Left edge.
        x: u32,
        /// Top edge.
        y: u32,
        /// Width.
        w: u32,
        /// Height.
        h: u32,
        /// Colour.
        rgb: [u8; 3],
        /// Frame id.
        frame: u64,
    },
    /// Raw RGBA8 blit with inline pixels.
    Blit {
        /// Left edge.
        x: u32,
        /// Top edge.
        y: u32,
        /// Width.
        w: u32,
        /// Height.
        h: u32,
        /// RGBA8 bytes.
        pixels: Vec<u8>,
        /// Byte offset of the first pixel.
        #[serde(default)]
        offset: usize,
        /// Frame id.
        frame: u64,
    },
    /// Region copy.
    Copy {
        /// Source left edge.
        src_x: u32,
        /// Source top edge.
        src_y: u32,
        /// Width.
        w: u32,
        /// Height.
        h: u32,
        /// Destination left edge.
        dst_x: u32,
        /// Destination top edge.
        dst_y: u32,
        /// Frame id.
        frame: u64,
    },
    /// Compressed image read from `path`; `mime` defaults to the file extension.
    Image {
        /// Left edge.
        x: u32,
        /// Top edge.
        y: u32,
        /// Width.
        w: u32,
        /// Height.
        h: u32,
        /// Payload file, relative to the script.
        path: PathBuf,
        /// MIME type or bare format name.
        #[serde(default)]
        mime: Option<String>,
        /// Frame id.
        frame: u64,
    },
    /// Video chunk read from `path`.
    Video {
        /// Left edge.
        x: u32,
        /// Top edge.
        y: u32,
        /// Width.
        w: u32,
        /// Height.
        h: u32,
        /// Bitstream file, relative to the script.
        path: PathBuf,
        /// Keyframe flag.
        keyframe: bool,
        /// Frame id.
        frame: u64,
    },
    /// Run `count` scheduler ticks.
    Tick {
        /// Ticks to run.
        #[serde(default = "one")]
        count: u32,
    },
    /// Tick until idle or `timeout_ms` elapses (5 s when omitted).
    Flush {
        /// Timeout in milliseconds.
        #[serde(default)]
        timeout_ms: Option<u64>,
    },
}

fn one() -> u32 {
    1
}

/// A parsed replay script.
#[derive(Clone, Debug)]
pub struct ReplayScript {
    /// Commands in script order.
    pub commands: Vec<ReplayCommand>,
    /// Directory file payloads are resolved against.
    pub base_dir: PathBuf,
}

/// Totals for one [`ReplayScript::run`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    /// Commands executed.
    pub commands: usize,
    /// Ticks run by `tick` commands and flushes.
    pub ticks: u64,
    /// Flushes that timed out.
    pub flush_timeouts: usize,
}

impl ReplayScript {
    /// Parse a JSON-lines script. Blank lines and lines starting with `#` are skipped.
    pub fn parse(text: &str, base_dir: impl Into<PathBuf>) -> DisplayResult<Self> {
        let mut commands = Vec::new();
        for (idx, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let cmd = serde_json::from_str(line).map_err(|e| {
                DisplayError::validation(format!("replay line {}: {e}", idx + 1))
            })?;
            commands.push(cmd);
        }
        Ok(Self {
            commands,
            base_dir: base_dir.into(),
        })
    }

    /// Read and parse a script file; payload paths resolve against its directory.
    pub fn from_path(path: &Path) -> DisplayResult<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read replay script '{}'", path.display()))?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new(".")).to_path_buf();
        Self::parse(&text, base_dir)
    }

    /// Feed every command to `display`.
    ///
    /// Rejected rects are handled by the display itself; only unreadable payload files abort
    /// the run.
    #[tracing::instrument(skip_all, fields(commands = self.commands.len()))]
    pub fn run(&self, display: &mut Display) -> DisplayResult<ReplaySummary> {
        let mut summary = ReplaySummary::default();
        let ticks_before = display.stats().ticks;

        for cmd in &self.commands {
            match cmd {
                ReplayCommand::Resize { width, height } => display.resize(*width, *height),
                ReplayCommand::Fill {
                    x,
                    y,
                    w,
                    h,
                    rgb,
                    frame,
                } => display.fill(*x, *y, *w, *h, Rgb8::from(*rgb), FrameId(*frame)),
                ReplayCommand::Blit {
                    x,
                    y,
                    w,
                    h,
                    pixels,
                    offset,
                    frame,
                } => display.blit(*x, *y, *w, *h, pixels.as_slice(), *offset, FrameId(*frame)),
                ReplayCommand::Copy {
                    src_x,
                    src_y,
                    w,
                    h,
                    dst_x,
                    dst_y,
                    frame,
                } => display.copy(*src_x, *src_y, *w, *h, *dst_x, *dst_y, FrameId(*frame)),
                ReplayCommand::Image {
                    x,
                    y,
                    w,
                    h,
                    path,
                    mime,
                    frame,
                } => {
                    let bytes = self.read_payload(path)?;
                    let mime = match mime {
                        Some(m) => m.clone(),
                        None => mime_from_extension(path)?,
                    };
                    display.image(*x, *y, *w, *h, &mime, bytes, FrameId(*frame));
                }
                ReplayCommand::Video {
                    x,
                    y,
                    w,
                    h,
                    path,
                    keyframe,
                    frame,
                } => {
                    let bytes = self.read_payload(path)?;
                    display.video(*x, *y, *w, *h, bytes, *keyframe, FrameId(*frame));
                }
                ReplayCommand::Tick { count } => {
                    for _ in 0..*count {
                        display.tick();
                    }
                }
                ReplayCommand::Flush { timeout_ms } => {
                    let timeout = timeout_ms.map_or(Duration::from_secs(5), Duration::from_millis);
                    if !display.flush_blocking(timeout) {
                        summary.flush_timeouts += 1;
                    }
                }
            }
            summary.commands += 1;
        }

        summary.ticks = display.stats().ticks - ticks_before;
        Ok(summary)
    }

    fn read_payload(&self, rel: &Path) -> DisplayResult<Vec<u8>> {
        let path = self.base_dir.join(rel);
        Ok(std::fs::read(&path).with_context(|| format!("read payload '{}'", path.display()))?)
    }
}

fn mime_from_extension(path: &Path) -> DisplayResult<String> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .ok_or_else(|| {
            DisplayError::validation(format!(
                "image '{}' has no extension and no mime",
                path.display()
            ))
        })?;
    Ok(format!("image/{}", ext.to_ascii_lowercase()))
}

#[cfg(test)]
#[path = "../tests/unit/replay.rs"]
mod tests;
