//! Bounded transcoding worker pool and the ffmpeg/ffprobe plumbing behind it.

mod pipeline;
mod preset;
mod probe;
mod process;
mod runner;

pub use pipeline::{
    DEFAULT_QUEUE_CAPACITY, PipelineConfig, TranscodePipeline, TranscodeResult, TranscodeTask,
};
pub use preset::{PresetMode, choose_preset, preset_by_extension, select_preset};
pub use probe::{FfProbe, ProbeFormat, ProbeReport, ProbeStream};
pub use runner::{FfmpegRunner, RunOutcome, TranscodeRunner};
