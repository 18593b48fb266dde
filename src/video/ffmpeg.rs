use std::io::{Read, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, Command, Stdio};
use std::thread::JoinHandle;

use crate::decode::still::DecodedImage;
use crate::foundation::error::{DisplayError, DisplayResult};
use crate::video::codec::{
    DecodedVideoFrame, VideoChunk, VideoCodec, VideoCodecFactory, VideoConfig, VideoFrameSender,
};

const IVF_HEADER_LEN: u16 = 32;

/// Creates VP8 sessions backed by a long-running `ffmpeg` process.
///
/// Each session streams its chunks as IVF into `ffmpeg`'s stdin and a reader thread turns the
/// raw RGBA output back into frames. `ffmpeg` must be on `PATH` (or at `ffmpeg_bin`).
#[derive(Clone, Debug)]
pub struct FfmpegVp8Factory {
    /// Binary to spawn.
    pub ffmpeg_bin: PathBuf,
}

impl Default for FfmpegVp8Factory {
    fn default() -> Self {
        Self {
            ffmpeg_bin: PathBuf::from("ffmpeg"),
        }
    }
}

impl VideoCodecFactory for FfmpegVp8Factory {
    fn create(
        &self,
        cfg: VideoConfig,
        frames: VideoFrameSender,
    ) -> DisplayResult<Box<dyn VideoCodec>> {
        let (Ok(w), Ok(h)) = (u16::try_from(cfg.width), u16::try_from(cfg.height)) else {
            return Err(DisplayError::configuration(format!(
                "vp8 session {}x{} exceeds 65535 pixels per side",
                cfg.width, cfg.height
            )));
        };
        if w == 0 || h == 0 {
            return Err(DisplayError::configuration("vp8 session needs a non-empty size"));
        }

        let mut child = Command::new(&self.ffmpeg_bin)
            .args([
                "-loglevel",
                "error",
                "-fflags",
                "nobuffer",
                "-probesize",
                "32",
                "-f",
                "ivf",
                "-i",
                "pipe:0",
                "-f",
                "rawvideo",
                "-pix_fmt",
                "rgba",
                "-s",
                &format!("{w}x{h}"),
                "pipe:1",
            ])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                DisplayError::configuration(format!(
                    "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
                ))
            })?;

        let (Some(mut stdin), Some(stdout), Some(mut stderr)) =
            (child.stdin.take(), child.stdout.take(), child.stderr.take())
        else {
            reap(&mut child);
            return Err(DisplayError::configuration("failed to open ffmpeg stdio pipes"));
        };
        write_ivf_header(&mut child, &mut stdin, w, h)?;

        let reader = spawn_frame_reader(stdout, cfg, frames);
        let stderr_drain = std::thread::spawn(move || {
            let mut bytes = Vec::new();
            let _ = stderr.read_to_end(&mut bytes);
            let msg = String::from_utf8_lossy(&bytes);
            if !msg.trim().is_empty() {
                tracing::warn!(session = cfg.session.0, "ffmpeg: {}", msg.trim());
            }
        });

        Ok(Box::new(FfmpegVp8Session {
            cfg,
            child: Some(child),
            stdin: Some(stdin),
            reader: Some(reader),
            stderr_drain: Some(stderr_drain),
            pts: 0,
        }))
    }
}

struct FfmpegVp8Session {
    cfg: VideoConfig,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    reader: Option<JoinHandle<()>>,
    stderr_drain: Option<JoinHandle<()>>,
    pts: u64,
}

impl VideoCodec for FfmpegVp8Session {
    fn decode(&mut self, chunk: &VideoChunk) -> DisplayResult<()> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| DisplayError::decode("vp8 session is closed"))?;
        let len = u32::try_from(chunk.data.len())
            .map_err(|_| DisplayError::decode("vp8 chunk larger than 4 GiB"))?;

        let mut header = [0u8; 12];
        header[..4].copy_from_slice(&len.to_le_bytes());
        header[4..].copy_from_slice(&self.pts.to_le_bytes());
        stdin
            .write_all(&header)
            .and_then(|()| stdin.write_all(&chunk.data))
            .and_then(|()| stdin.flush())
            .map_err(|e| {
                DisplayError::decode(format!(
                    "failed to feed vp8 chunk to session {}: {e}",
                    self.cfg.session.0
                ))
            })?;
        self.pts += 1;
        Ok(())
    }

    fn close(&mut self) {
        drop(self.stdin.take());
        if let Some(mut child) = self.child.take() {
            reap(&mut child);
        }
        for handle in [self.reader.take(), self.stderr_drain.take()].into_iter().flatten() {
            if handle.join().is_err() {
                tracing::warn!(session = self.cfg.session.0, "ffmpeg helper thread panicked");
            }
        }
    }
}

impl Drop for FfmpegVp8Session {
    fn drop(&mut self) {
        self.close();
    }
}

fn spawn_frame_reader(
    mut stdout: std::process::ChildStdout,
    cfg: VideoConfig,
    frames: VideoFrameSender,
) -> JoinHandle<()> {
    std::thread::spawn(move || {
        let frame_len = cfg.width as usize * cfg.height as usize * 4;
        loop {
            let mut buf = vec![0u8; frame_len];
            if stdout.read_exact(&mut buf).is_err() {
                break;
            }
            let image = match DecodedImage::from_rgba8(cfg.width, cfg.height, buf) {
                Ok(image) => image,
                Err(e) => {
                    tracing::warn!(session = cfg.session.0, "dropping vp8 frame: {e}");
                    continue;
                }
            };
            if frames
                .send(DecodedVideoFrame {
                    session: cfg.session,
                    image,
                })
                .is_err()
            {
                break;
            }
        }
    })
}

/// Write the IVF file header, killing `child` when the pipe rejects it.
fn write_ivf_header(
    child: &mut Child,
    stdin: &mut impl Write,
    width: u16,
    height: u16,
) -> DisplayResult<()> {
    stdin.write_all(&ivf_file_header(width, height)).map_err(|e| {
        reap(child);
        DisplayError::configuration(format!("failed to write ivf header: {e}"))
    })
}

fn reap(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

fn ivf_file_header(width: u16, height: u16) -> [u8; IVF_HEADER_LEN as usize] {
    let mut h = [0u8; IVF_HEADER_LEN as usize];
    h[0..4].copy_from_slice(b"DKIF");
    h[4..6].copy_from_slice(&0u16.to_le_bytes());
    h[6..8].copy_from_slice(&IVF_HEADER_LEN.to_le_bytes());
    h[8..12].copy_from_slice(b"VP80");
    h[12..14].copy_from_slice(&width.to_le_bytes());
    h[14..16].copy_from_slice(&height.to_le_bytes());
    // 30/1 time base; frame count left at zero for a live stream.
    h[16..20].copy_from_slice(&30u32.to_le_bytes());
    h[20..24].copy_from_slice(&1u32.to_le_bytes());
    h
}

/// Return `true` when `ffmpeg` can be invoked from `PATH`.
pub fn is_ffmpeg_on_path() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

#[cfg(test)]
#[path = "../../tests/unit/video/ffmpeg.rs"]
mod tests;
