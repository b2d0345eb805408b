use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use anyhow::Context as _;

use crate::encode::engine::{EncodeCommand, EncodeEngine};
use crate::foundation::error::{GrisailleError, GrisailleResult};

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

/// Encoding engine backed by the system `ffmpeg` binary and a scratch
/// directory standing in for the engine's virtual filesystem.
///
/// Each instance owns a fresh scratch namespace
/// (`grisaille_scratch_<pid>_<nanos>` under the scratch root), created at
/// `init` and removed on drop, so concurrent processes and successive runs
/// never share frame files.
pub struct FfmpegEngine {
    scratch_root: PathBuf,
    scratch: Option<PathBuf>,
}

impl FfmpegEngine {
    /// Engine with its scratch namespace under the OS temp directory.
    pub fn new() -> Self {
        Self::with_scratch_root(std::env::temp_dir())
    }

    /// Engine with its scratch namespace under `root`.
    pub fn with_scratch_root(root: impl Into<PathBuf>) -> Self {
        Self {
            scratch_root: root.into(),
            scratch: None,
        }
    }

    /// Path of the scratch namespace, once initialized.
    pub fn scratch_dir(&self) -> Option<&Path> {
        self.scratch.as_deref()
    }

    fn scratch_or_err(&self) -> GrisailleResult<&Path> {
        self.scratch
            .as_deref()
            .ok_or_else(|| GrisailleError::encode("engine not initialized"))
    }
}

impl Default for FfmpegEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl EncodeEngine for FfmpegEngine {
    fn init(&mut self) -> GrisailleResult<()> {
        if self.scratch.is_some() {
            return Ok(());
        }
        if !is_ffmpeg_on_path() {
            return Err(GrisailleError::encode(
                "ffmpeg is required for MP4 recomposition, but was not found on PATH",
            ));
        }
        let dir = self.scratch_root.join(format!(
            "grisaille_scratch_{}_{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_nanos())
                .unwrap_or(0)
        ));
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create scratch directory '{}'", dir.display()))?;
        self.scratch = Some(dir);
        Ok(())
    }

    fn write_file(&mut self, name: &str, bytes: &[u8]) -> GrisailleResult<()> {
        let path = self.scratch_or_err()?.join(name);
        std::fs::write(&path, bytes)
            .map_err(|e| GrisailleError::encode(format!("failed to write '{name}': {e}")))
    }

    fn remove_file(&mut self, name: &str) -> GrisailleResult<()> {
        let path = self.scratch_or_err()?.join(name);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(GrisailleError::encode(format!(
                "failed to remove '{name}': {e}"
            ))),
        }
    }

    fn list_files(&self) -> GrisailleResult<Vec<String>> {
        let dir = self.scratch_or_err()?;
        let entries = std::fs::read_dir(dir)
            .map_err(|e| GrisailleError::encode(format!("failed to list scratch files: {e}")))?;
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry
                .map_err(|e| GrisailleError::encode(format!("failed to list scratch files: {e}")))?;
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        Ok(names)
    }

    fn read_file(&self, name: &str) -> GrisailleResult<Vec<u8>> {
        let path = self.scratch_or_err()?.join(name);
        std::fs::read(&path)
            .map_err(|e| GrisailleError::encode(format!("failed to read '{name}': {e}")))
    }

    fn run(&mut self, cmd: &EncodeCommand) -> GrisailleResult<()> {
        let dir = self.scratch_or_err()?.to_path_buf();

        let out = Command::new("ffmpeg")
            .current_dir(&dir)
            .args([
                "-loglevel",
                "error",
                "-framerate",
                &cmd.framerate.hz.to_string(),
                "-i",
                &cmd.input_pattern,
                "-c:v",
                "libx264",
                "-pix_fmt",
                "yuv420p",
                "-y",
                &cmd.output,
            ])
            .stdin(Stdio::null())
            .output()
            .map_err(|e| {
                GrisailleError::encode(format!(
                    "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
                ))
            })?;

        if !out.status.success() {
            let stderr = String::from_utf8_lossy(&out.stderr);
            return Err(GrisailleError::encode(format!(
                "ffmpeg exited with status {}: {}",
                out.status,
                stderr.trim()
            )));
        }

        Ok(())
    }
}

impl Drop for FfmpegEngine {
    fn drop(&mut self) {
        if let Some(dir) = self.scratch.take() {
            let _ = std::fs::remove_dir_all(dir);
        }
    }
}
