//! Grisaille samples a source video at a fixed cadence, pushes every sampled
//! frame through a two-stage grayscale color-transform program, and
//! recomposes the filtered frames into an H.264/yuv420p MP4 through an
//! external encoding engine (the system `ffmpeg`).
//!
//! The public API is run-oriented:
//!
//! - Probe a source with [`probe_source`]
//! - Open a [`FrameSource`] and an [`EncodeEngine`]
//! - Build a [`Pipeline`] and call [`Pipeline::run`]
#![forbid(unsafe_code)]

pub mod encode;
pub mod foundation;
pub mod gfx;
pub mod media;
pub mod pipeline;

pub use foundation::core::{Canvas, FALLBACK_CANVAS, SamplePlan, SampleRate};
pub use foundation::error::{GrisailleError, GrisailleResult};

pub use encode::engine::{
    EncodeCommand, EncodeEngine, InMemoryEngine, frame_file_name, is_frame_file,
};
pub use encode::ffmpeg::{FfmpegEngine, is_ffmpeg_on_path};
pub use gfx::FrameRGBA;
pub use gfx::program::{ColorProgram, GrayscaleProgram, draw};
pub use gfx::target::RenderTarget;
pub use gfx::texture::Texture2D;
pub use media::grab::{DEFAULT_GRAB_DEADLINE, FfmpegFrameSource, FrameSource, Grab, MissReason};
pub use media::probe::{SourceInfo, probe_source};
pub use pipeline::{
    Artifact, NullObserver, Pipeline, RunObserver, RunOptions, RunPhase, RunStats, RunWarning,
};
