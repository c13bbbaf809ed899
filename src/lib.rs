//! Motion-aware frame re-timing for 2D animation clips.
//!
//! The public entry point is [`run`]: given an input/output path pair and a
//! [`RetimeConfig`], it drives the pose -> feature -> normalize -> aggregate
//! -> smooth -> classify -> select -> report pipeline and returns an
//! [`AnalysisOutcome`]. The CLI binary (`src/main.rs`) is a thin wrapper
//! around this function that renders the stdout/stderr JSON contract.

pub mod analysis;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod pose;
pub mod report;
pub mod video_io;

use std::path::Path;

pub use config::RetimeConfig;
pub use error::CoreError;
pub use pipeline::AnalysisOutcome;

use pose::SyntheticPoseExtractor;
use report::FileResultStore;
use video_io::{FfmpegFrameSource, FfmpegVideoWriter};

/// Arguments for one retiming invocation, the in-process equivalent of the
/// CLI flags in spec.md §6.
pub struct RunArgs {
    pub input_path: String,
    pub output_path: String,
    pub config: RetimeConfig,
    pub save_keypoints_override: bool,
    pub debug_features: bool,
    pub profile_performance: bool,
}

/// Run the full pipeline against real files with the default `ffmpeg-next`
/// video backend.
///
/// A caller embedding this crate directly (rather than through the CLI) can
/// instead call [`pipeline::run_pipeline`] with its own `FrameSource`,
/// `PoseExtractor`, writer factory, and `ResultStore` — this function is the
/// default wiring for the CLI binary and for out-of-process callers.
pub fn run(args: RunArgs) -> Result<AnalysisOutcome, CoreError> {
    args.config.validate().map_err(CoreError::Config)?;

    let input_path = Path::new(&args.input_path);
    if !input_path.exists() {
        return Err(CoreError::InputNotFound(input_path.to_owned()));
    }

    let mut frame_source =
        FfmpegFrameSource::open(input_path).map_err(|source| CoreError::InputUnreadable {
            path: input_path.to_owned(),
            source,
        })?;

    // TODO: wire a real keypoint-detector adapter once one is bundled; the
    // synthetic extractor lets the pipeline run end to end in the meantime.
    let landmark_count = 17;
    let mut pose_extractor =
        SyntheticPoseExtractor::new(landmark_count, args.config.min_valid_keypoints);

    let output_path_for_writer = args.output_path.clone();
    let writer_factory = move |width: u32, height: u32, fps: f64| {
        let path = Path::new(&output_path_for_writer);
        FfmpegVideoWriter::create(path, width, height, fps)
            .map(|writer| Box::new(writer) as Box<dyn video_io::VideoWriter>)
    };

    let output_dir = input_path
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf();
    let result_store = FileResultStore::new(output_dir);

    pipeline::run_pipeline(
        &args,
        &mut frame_source,
        &mut pose_extractor,
        writer_factory,
        &result_store,
    )
}
