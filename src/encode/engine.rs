use std::collections::BTreeMap;

use crate::foundation::core::SampleRate;
use crate::foundation::error::{GrisailleError, GrisailleResult};

/// Default output artifact name. A new run overwrites it by name.
pub const OUTPUT_FILE_NAME: &str = "output_grayscale.mp4";

/// Input pattern the recomposition step consumes: zero-padded sequential
/// indices starting at 0, no gaps.
pub const FRAME_FILE_PATTERN: &str = "frame%05d.png";

/// Scratch file name for frame `index`.
pub fn frame_file_name(index: u32) -> String {
    format!("frame{index:05}.png")
}

/// Returns `true` for names produced by [`frame_file_name`].
pub fn is_frame_file(name: &str) -> bool {
    let bytes = name.as_bytes();
    bytes.len() == 14
        && name.starts_with("frame")
        && name.ends_with(".png")
        && bytes[5..10].iter().all(|b| b.is_ascii_digit())
}

/// The fixed recomposition command: an H.264, yuv420p MP4 built from the
/// numbered frame sequence at the sampling rate, overwriting any existing
/// output of the same name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncodeCommand {
    /// Input framerate of the image sequence.
    pub framerate: SampleRate,
    /// Numbered input pattern, relative to the scratch namespace.
    pub input_pattern: String,
    /// Output file name, relative to the scratch namespace.
    pub output: String,
}

impl EncodeCommand {
    /// Command with the conventional pattern and output name.
    pub fn new(framerate: SampleRate) -> Self {
        Self {
            framerate,
            input_pattern: FRAME_FILE_PATTERN.to_string(),
            output: OUTPUT_FILE_NAME.to_string(),
        }
    }

    /// Replace the output name.
    pub fn with_output(mut self, output: impl Into<String>) -> Self {
        self.output = output.into();
        self
    }
}

/// External encoding engine operating on a scratch file namespace.
///
/// The namespace passes input frames in and the muxed output back out;
/// callers never touch real paths. `init` is one-time and possibly slow, and
/// must succeed before anything is written. The `Result` of a write is its
/// durability signal: once `write_file` returns `Ok`, a subsequent
/// `list_files`/`read_file` observes the file.
pub trait EncodeEngine {
    /// One-time engine initialization.
    fn init(&mut self) -> GrisailleResult<()>;

    /// Write one file into the scratch namespace, replacing any previous
    /// contents under the same name.
    fn write_file(&mut self, name: &str, bytes: &[u8]) -> GrisailleResult<()>;

    /// Remove a file from the scratch namespace, if present.
    fn remove_file(&mut self, name: &str) -> GrisailleResult<()>;

    /// Names currently present in the scratch namespace.
    fn list_files(&self) -> GrisailleResult<Vec<String>>;

    /// Read a file back from the scratch namespace.
    fn read_file(&self, name: &str) -> GrisailleResult<Vec<u8>>;

    /// Run the fixed recomposition command against the scratch namespace.
    fn run(&mut self, cmd: &EncodeCommand) -> GrisailleResult<()>;
}

/// In-memory engine for tests and debugging.
///
/// `run` consumes the contiguous `frame00000.png`-rooted prefix the way the
/// real `%05d` demuxer does and synthesizes a deterministic MP4-flavored stub
/// output. Executed commands are recorded in order.
#[derive(Debug, Default)]
pub struct InMemoryEngine {
    initialized: bool,
    files: BTreeMap<String, Vec<u8>>,
    runs: Vec<EncodeCommand>,
}

impl InMemoryEngine {
    /// Create an empty engine.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a file before a run (e.g. to simulate leftovers from an earlier
    /// run).
    pub fn seed_file(&mut self, name: impl Into<String>, bytes: Vec<u8>) {
        self.files.insert(name.into(), bytes);
    }

    /// Commands executed so far.
    pub fn runs(&self) -> &[EncodeCommand] {
        &self.runs
    }

    /// Bytes of `name`, if present.
    pub fn file(&self, name: &str) -> Option<&[u8]> {
        self.files.get(name).map(Vec::as_slice)
    }

    fn contiguous_frame_count(&self) -> u32 {
        let mut count = 0u32;
        while self.files.contains_key(&frame_file_name(count)) {
            count += 1;
        }
        count
    }
}

impl EncodeEngine for InMemoryEngine {
    fn init(&mut self) -> GrisailleResult<()> {
        self.initialized = true;
        Ok(())
    }

    fn write_file(&mut self, name: &str, bytes: &[u8]) -> GrisailleResult<()> {
        if !self.initialized {
            return Err(GrisailleError::encode("engine not initialized"));
        }
        self.files.insert(name.to_string(), bytes.to_vec());
        Ok(())
    }

    fn remove_file(&mut self, name: &str) -> GrisailleResult<()> {
        if !self.initialized {
            return Err(GrisailleError::encode("engine not initialized"));
        }
        self.files.remove(name);
        Ok(())
    }

    fn list_files(&self) -> GrisailleResult<Vec<String>> {
        Ok(self.files.keys().cloned().collect())
    }

    fn read_file(&self, name: &str) -> GrisailleResult<Vec<u8>> {
        self.files
            .get(name)
            .cloned()
            .ok_or_else(|| GrisailleError::encode(format!("no such file '{name}'")))
    }

    fn run(&mut self, cmd: &EncodeCommand) -> GrisailleResult<()> {
        if !self.initialized {
            return Err(GrisailleError::encode("engine not initialized"));
        }
        self.runs.push(cmd.clone());

        let frames = self.contiguous_frame_count();
        if frames == 0 {
            return Err(GrisailleError::encode(format!(
                "no input matched '{}'",
                cmd.input_pattern
            )));
        }

        let mut out = Vec::new();
        out.extend_from_slice(&[0, 0, 0, 0x18]);
        out.extend_from_slice(b"ftypisom");
        out.extend_from_slice(&cmd.framerate.hz.to_be_bytes());
        out.extend_from_slice(&frames.to_be_bytes());
        self.files.insert(cmd.output.clone(), out);
        Ok(())
    }
}
