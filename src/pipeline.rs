use std::time::Duration;

use crate::encode::engine::{EncodeCommand, EncodeEngine, frame_file_name, is_frame_file};
use crate::foundation::core::{Canvas, FALLBACK_CANVAS, SamplePlan, SampleRate};
use crate::foundation::error::{GrisailleError, GrisailleResult};
use crate::gfx::program::{ColorProgram, draw};
use crate::gfx::target::RenderTarget;
use crate::gfx::texture::Texture2D;
use crate::media::grab::{DEFAULT_GRAB_DEADLINE, FrameSource, Grab, MissReason};

/// Options for one pipeline run.
#[derive(Clone, Debug)]
pub struct RunOptions {
    /// Ceiling on the sampled duration in seconds.
    pub cap_secs: f64,
    /// Fixed sampling cadence.
    pub sample_rate: SampleRate,
    /// Bound on each per-sample frame grab.
    pub grab_deadline: Duration,
    /// Output artifact name inside the scratch namespace.
    pub output_name: String,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            cap_secs: 10.0,
            sample_rate: SampleRate { hz: 10 },
            grab_deadline: DEFAULT_GRAB_DEADLINE,
            output_name: crate::encode::engine::OUTPUT_FILE_NAME.to_string(),
        }
    }
}

/// Phases a run moves through, in order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunPhase {
    /// One-time engine initialization (possibly slow on first use).
    InitializingEngine,
    /// Sampling, filtering, and writing frames.
    Sampling,
    /// Recomposing the frame sequence into the output container.
    Recomposing,
    /// Reading the artifact back from the scratch namespace.
    ReadingBack,
}

/// Tolerated per-sample incidents, surfaced instead of silently absorbed.
#[derive(Clone, Debug)]
pub enum RunWarning {
    /// The grab missed its deadline or failed; the previously presented frame
    /// was substituted.
    FrameMissed {
        /// Zero-based sample number.
        sample: u32,
        /// Requested timestamp in seconds.
        timestamp_secs: f64,
        /// Why no fresh frame was available.
        reason: MissReason,
    },
    /// A frame write failed; the sample was dropped and later indices
    /// shifted down to keep the sequence contiguous.
    FrameWriteFailed {
        /// Zero-based sample number.
        sample: u32,
        /// The write error.
        error: String,
    },
}

/// Observer of run progress. All methods default to no-ops.
pub trait RunObserver {
    /// A new phase began.
    fn phase(&mut self, _phase: RunPhase) {}
    /// `current` of `total` samples processed.
    fn progress(&mut self, _current: u32, _total: u32) {}
    /// A tolerated incident occurred.
    fn warning(&mut self, _warning: &RunWarning) {}
}

/// Observer that ignores everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullObserver;

impl RunObserver for NullObserver {}

/// Counters for one run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Samples the plan scheduled.
    pub samples_total: u32,
    /// Frames written into the scratch namespace.
    pub frames_written: u32,
    /// Samples that proceeded with a substituted stale frame.
    pub frames_missed: u32,
    /// Samples dropped because their write failed.
    pub frames_dropped: u32,
}

/// The muxed output of a successful run.
#[derive(Clone, Debug)]
pub struct Artifact {
    /// Name the artifact carries in the scratch namespace.
    pub file_name: String,
    /// The muxed MP4 bytes.
    pub bytes: Vec<u8>,
    /// Run counters.
    pub stats: RunStats,
}

/// Per-run pipeline context.
///
/// Owns the render target and the single reused texture slot for the
/// duration of the run; the exclusive borrow in [`Pipeline::run`] is what
/// makes "one active run at a time" hold.
pub struct Pipeline<'a> {
    source: &'a mut dyn FrameSource,
    engine: &'a mut dyn EncodeEngine,
    program: &'a dyn ColorProgram,
    opts: RunOptions,
    target: RenderTarget,
    texture: Texture2D,
}

impl<'a> Pipeline<'a> {
    /// Build a pipeline over a loaded source, an encoding engine, and a
    /// color-transform program.
    pub fn new(
        source: &'a mut dyn FrameSource,
        engine: &'a mut dyn EncodeEngine,
        program: &'a dyn ColorProgram,
        opts: RunOptions,
    ) -> GrisailleResult<Self> {
        if opts.output_name.is_empty() {
            return Err(GrisailleError::validation("output name must be non-empty"));
        }
        let canvas = source.info().dimensions.unwrap_or(FALLBACK_CANVAS);
        Ok(Self {
            source,
            engine,
            program,
            opts,
            target: RenderTarget::new(canvas),
            texture: Texture2D::new(),
        })
    }

    /// Dimensions of the render target for this run.
    pub fn target_canvas(&self) -> Canvas {
        self.target.canvas()
    }

    /// Sample, filter, and recompose the source into the output artifact.
    pub fn run(&mut self, observer: &mut dyn RunObserver) -> GrisailleResult<Artifact> {
        observer.phase(RunPhase::InitializingEngine);
        self.engine.init()?;
        self.sweep_stale_files()?;

        let plan = SamplePlan::new(
            self.source.info().duration_secs,
            self.opts.cap_secs,
            self.opts.sample_rate,
        )?;
        let total = plan.total_samples();
        let mut stats = RunStats {
            samples_total: total,
            ..RunStats::default()
        };

        tracing::debug!(
            total,
            effective_secs = plan.effective_duration_secs(),
            width = self.target.canvas().width,
            height = self.target.canvas().height,
            "starting sample loop"
        );
        observer.phase(RunPhase::Sampling);

        let mut written = 0u32;
        for (sample, timestamp) in plan.timestamps().enumerate() {
            let sample = sample as u32;

            match self.source.grab(timestamp, self.opts.grab_deadline)? {
                Grab::Decoded(frame) => self.texture.upload(&frame)?,
                Grab::Missed(reason) => {
                    // The texture slot keeps its previous contents: the run
                    // proceeds with whatever frame is currently presented.
                    tracing::warn!(sample, timestamp, %reason, "sample missed, substituting stale frame");
                    stats.frames_missed += 1;
                    observer.warning(&RunWarning::FrameMissed {
                        sample,
                        timestamp_secs: timestamp,
                        reason,
                    });
                }
            }

            self.target.clear([0, 0, 0, 255]);
            draw(&mut self.target, &self.texture, self.program)?;

            let png = encode_png(&self.target.to_frame())?;
            let name = frame_file_name(written);
            match self.engine.write_file(&name, &png) {
                Ok(()) => written += 1,
                Err(e) => {
                    tracing::warn!(sample, %e, "frame write failed, dropping sample");
                    stats.frames_dropped += 1;
                    observer.warning(&RunWarning::FrameWriteFailed {
                        sample,
                        error: e.to_string(),
                    });
                }
            }

            observer.progress(sample + 1, total);
        }
        stats.frames_written = written;

        let frame_files = self
            .engine
            .list_files()?
            .into_iter()
            .filter(|name| is_frame_file(name))
            .count();
        if frame_files == 0 {
            return Err(GrisailleError::pipeline("no frames produced"));
        }

        observer.phase(RunPhase::Recomposing);
        let cmd =
            EncodeCommand::new(self.opts.sample_rate).with_output(self.opts.output_name.clone());
        self.engine.run(&cmd)?;

        if !self
            .engine
            .list_files()?
            .iter()
            .any(|name| name == &self.opts.output_name)
        {
            return Err(GrisailleError::pipeline("output not generated"));
        }

        observer.phase(RunPhase::ReadingBack);
        let bytes = self.engine.read_file(&self.opts.output_name)?;
        tracing::debug!(len = bytes.len(), "artifact read back");

        Ok(Artifact {
            file_name: self.opts.output_name.clone(),
            bytes,
            stats,
        })
    }

    /// Remove frame files and output leftovers so an earlier run sharing the
    /// namespace can never leak into this one.
    fn sweep_stale_files(&mut self) -> GrisailleResult<()> {
        for name in self.engine.list_files()? {
            if is_frame_file(&name) || name == self.opts.output_name {
                tracing::debug!(%name, "sweeping stale scratch file");
                self.engine.remove_file(&name)?;
            }
        }
        Ok(())
    }
}

fn encode_png(frame: &crate::gfx::FrameRGBA) -> GrisailleResult<Vec<u8>> {
    use image::ImageEncoder as _;

    let mut bytes = Vec::new();
    image::codecs::png::PngEncoder::new(&mut bytes)
        .write_image(
            &frame.data,
            frame.width,
            frame.height,
            image::ExtendedColorType::Rgba8,
        )
        .map_err(|e| GrisailleError::pipeline(format!("png encode failed: {e}")))?;
    Ok(bytes)
}
