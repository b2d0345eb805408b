use std::io::Read;
use std::process::{Command, Stdio};
use std::sync::mpsc;
use std::time::Duration;

use crate::foundation::core::{Canvas, FALLBACK_CANVAS};
use crate::foundation::error::{GrisailleError, GrisailleResult};
use crate::gfx::FrameRGBA;
use crate::media::probe::{SourceInfo, probe_source};

/// Bound on how long a single frame grab may block before the pipeline
/// proceeds with the currently presented frame.
pub const DEFAULT_GRAB_DEADLINE: Duration = Duration::from_millis(1000);

/// Outcome of one bounded frame grab.
#[derive(Clone, Debug)]
pub enum Grab {
    /// The frame presented at the requested timestamp.
    Decoded(FrameRGBA),
    /// No frame became available within the deadline. The run proceeds with
    /// whatever frame is currently presented; callers surface the reason.
    Missed(MissReason),
}

/// Why a grab produced no frame.
#[derive(Clone, Debug)]
pub enum MissReason {
    /// The decoder did not deliver within the deadline.
    DeadlineExpired,
    /// The decoder finished but emitted no frame (e.g. a seek landing past
    /// the last packet).
    NoFrame,
    /// The decoder exited with an error.
    Decoder(String),
}

impl std::fmt::Display for MissReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MissReason::DeadlineExpired => write!(f, "deadline expired"),
            MissReason::NoFrame => write!(f, "decoder produced no frame"),
            MissReason::Decoder(msg) => write!(f, "decoder failed: {msg}"),
        }
    }
}

/// Source of presented frames at arbitrary timestamps.
///
/// A miss is the tolerated per-sample transient; an `Err` is structural and
/// aborts the run.
pub trait FrameSource {
    /// Metadata of the loaded source.
    fn info(&self) -> &SourceInfo;

    /// Decode the frame presented at `timestamp_secs`, waiting at most
    /// `deadline`.
    fn grab(&mut self, timestamp_secs: f64, deadline: Duration) -> GrisailleResult<Grab>;
}

/// Frame source decoding single RGBA frames through the system `ffmpeg`.
pub struct FfmpegFrameSource {
    info: SourceInfo,
    canvas: Canvas,
}

impl FfmpegFrameSource {
    /// Wrap an already probed source.
    ///
    /// Frames are decoded at the source's native dimensions when known, else
    /// at the fallback canvas.
    pub fn new(info: SourceInfo) -> Self {
        let canvas = info.dimensions.unwrap_or(FALLBACK_CANVAS);
        Self { info, canvas }
    }

    /// Probe `path` and wrap the result.
    pub fn open(path: &std::path::Path) -> GrisailleResult<Self> {
        Ok(Self::new(probe_source(path)?))
    }

    /// Dimensions every grabbed frame is decoded at.
    pub fn frame_canvas(&self) -> Canvas {
        self.canvas
    }
}

impl FrameSource for FfmpegFrameSource {
    fn info(&self) -> &SourceInfo {
        &self.info
    }

    fn grab(&mut self, timestamp_secs: f64, deadline: Duration) -> GrisailleResult<Grab> {
        let mut child = Command::new("ffmpeg")
            .args(["-v", "error", "-ss", &format!("{timestamp_secs:.9}")])
            .arg("-i")
            .arg(&self.info.source_path)
            .args([
                "-frames:v",
                "1",
                "-f",
                "rawvideo",
                "-pix_fmt",
                "rgba",
                "-vf",
                &format!("scale={}:{}", self.canvas.width, self.canvas.height),
                "pipe:1",
            ])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                GrisailleError::media(format!("failed to spawn ffmpeg for frame decode: {e}"))
            })?;

        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| GrisailleError::media("failed to open decoder stdout (unexpected)"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| GrisailleError::media("failed to open decoder stderr (unexpected)"))?;

        let (tx, rx) = mpsc::channel::<std::io::Result<Vec<u8>>>();
        let reader = std::thread::spawn(move || {
            let mut bytes = Vec::new();
            let res = stdout.read_to_end(&mut bytes).map(|_| bytes);
            // The receiver may already have given up on the deadline.
            let _ = tx.send(res);
        });
        let stderr_drain = std::thread::spawn(move || {
            let mut bytes = Vec::new();
            let _ = stderr.read_to_end(&mut bytes);
            bytes
        });

        let grab = match rx.recv_timeout(deadline) {
            Ok(Ok(bytes)) => {
                let status = child.wait().map_err(|e| {
                    GrisailleError::media(format!("failed to wait for frame decoder: {e}"))
                })?;
                let stderr_bytes = stderr_drain.join().unwrap_or_default();
                if !status.success() {
                    Grab::Missed(MissReason::Decoder(
                        String::from_utf8_lossy(&stderr_bytes).trim().to_string(),
                    ))
                } else if bytes.is_empty() {
                    Grab::Missed(MissReason::NoFrame)
                } else if bytes.len() == self.canvas.rgba8_len() {
                    Grab::Decoded(FrameRGBA {
                        width: self.canvas.width,
                        height: self.canvas.height,
                        data: bytes,
                    })
                } else {
                    return Err(GrisailleError::media(format!(
                        "decoded frame has invalid size: got {} bytes, expected {}",
                        bytes.len(),
                        self.canvas.rgba8_len()
                    )));
                }
            }
            Ok(Err(e)) => {
                let _ = child.kill();
                let _ = child.wait();
                let _ = stderr_drain.join();
                return Err(GrisailleError::media(format!(
                    "failed to read decoded frame: {e}"
                )));
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {
                let _ = child.kill();
                let _ = child.wait();
                let _ = stderr_drain.join();
                tracing::warn!(
                    timestamp_secs,
                    deadline_ms = deadline.as_millis() as u64,
                    "frame grab deadline expired"
                );
                Grab::Missed(MissReason::DeadlineExpired)
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                let _ = child.kill();
                let _ = child.wait();
                let _ = stderr_drain.join();
                return Err(GrisailleError::media(
                    "frame decoder reader disconnected unexpectedly",
                ));
            }
        };

        let _ = reader.join();
        Ok(grab)
    }
}
