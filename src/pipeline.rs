use std::time::Instant;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use crate::analysis::features::FeatureComputer;
use crate::analysis::normalize::Normalizer;
use crate::analysis::{MiAggregator, Smoother};
use crate::config::RetimeConfig;
use crate::error::{CoreError, WriteError};
use crate::pose::{Pose, PoseExtractor};
use crate::report::{AnalysisResult, ContributionBreakdown, FrameRecord, ResultStore};
use crate::video_io::{Frame, FrameSource, VideoWriter};
use crate::RunArgs;

const MIN_FRAME_COUNT: usize = 3;
const FRAME_RATE_TOLERANCE_PCT: f64 = 1.0;

/// Summary handed back to the caller after a successful run.
pub struct AnalysisOutcome {
    pub output_video_path: String,
    pub database_id: String,
    pub transient_pose_failures: usize,
}

/// Runs the full pipeline: read frames, extract poses, compute and
/// normalize features, aggregate and smooth MI, classify, select output
/// frames, write the re-timed video, persist the analysis document.
pub fn run_pipeline(
    args: &RunArgs,
    frame_source: &mut dyn FrameSource,
    pose_extractor: &mut dyn PoseExtractor,
    writer_factory: impl FnOnce(u32, u32, f64) -> anyhow::Result<Box<dyn VideoWriter>>,
    result_store: &dyn ResultStore,
) -> Result<AnalysisOutcome, CoreError> {
    let config = &args.config;

    let stage_started = Instant::now();
    let progress = stderr_progress_bar(args.profile_performance);

    let mut frames = Vec::new();
    while let Some(frame) =
        frame_source
            .next_frame()
            .map_err(|source| CoreError::InputUnreadable {
                path: args.input_path.clone().into(),
                source,
            })?
    {
        frames.push(frame);
        progress.inc(1);
    }
    progress.finish_and_clear();

    if let Some(measured_fps) = frame_source.measured_fps() {
        let declared_fps = frame_source.declared_fps();
        let drift_pct = ((measured_fps - declared_fps) / declared_fps).abs() * 100.0;
        if drift_pct > FRAME_RATE_TOLERANCE_PCT {
            return Err(CoreError::VariableFrameRate {
                declared_fps,
                measured_fps,
                tolerance_pct: FRAME_RATE_TOLERANCE_PCT,
            });
        }
    }

    if frames.len() < MIN_FRAME_COUNT {
        return Err(CoreError::ShortClip {
            frame_count: frames.len(),
        });
    }

    let (width, height) = (frames[0].width, frames[0].height);
    let delta_t = frame_source.delta_t();

    let pose_started = Instant::now();
    let poses: Vec<Pose> = frames.iter().map(|f| pose_extractor.detect(f)).collect();
    log_stage_timing("pose extraction", pose_started, args.profile_performance);

    let transient_pose_failures = poses.iter().filter(|p| p.invalid).count();
    if transient_pose_failures == poses.len() {
        return Err(CoreError::NoSubjectDetected);
    }

    let feature_started = Instant::now();
    let joint_triples = FeatureComputer::default_joint_triples(poses[0].points.len());
    let feature_computer = FeatureComputer::new(config.min_valid_keypoints, joint_triples);
    let raw_features = feature_computer.compute_series(&poses, delta_t);
    log_stage_timing("feature extraction", feature_started, args.profile_performance);

    let normalized = Normalizer::normalize(&raw_features);
    let aggregator = MiAggregator::new(config.motion_weights);
    let mi = aggregator.aggregate(&normalized);

    let smoother = Smoother::new(
        config.smoothing_method,
        config.smoothing_alpha,
        config.smoothing_window,
    );
    let mi_smoothed = smoother.smooth(&mi);

    let accel_normalized: Vec<f64> = normalized.iter().map(|f| f.acceleration).collect();
    let (states, preserved) =
        crate::analysis::classify(&mi_smoothed, &accel_normalized, delta_t, config);

    let plan = crate::analysis::build_output_plan(&states, &preserved);
    debug_assert_eq!(plan.len(), frames.len());

    let write_started = Instant::now();
    let mut writer = writer_factory(width, height, 1.0 / delta_t)
        .map_err(|e| CoreError::OutputWrite(WriteError::Video(e)))?;
    for &source_index in &plan {
        let frame = frames
            .get(source_index)
            .ok_or_else(|| CoreError::OutputWrite(WriteError::Video(anyhow::anyhow!(
                "output plan referenced out-of-range frame {source_index}"
            ))))?;
        writer
            .write_frame(frame)
            .map_err(|e| CoreError::OutputWrite(WriteError::Video(e)))?;
    }
    writer
        .finish()
        .map_err(|e| CoreError::OutputWrite(WriteError::Video(e)))?;
    log_stage_timing("video write", write_started, args.profile_performance);

    let frame_data = build_frame_records(
        &frames,
        &poses,
        &mi,
        &mi_smoothed,
        &states,
        &raw_features,
        config,
        args,
    );

    let mut result = AnalysisResult::new(
        args.input_path.clone(),
        args.output_path.clone(),
        config.clone(),
        frame_data,
        transient_pose_failures,
    );
    let database_id = result_store
        .persist(&mut result)
        .map_err(CoreError::OutputWrite)?;

    log_stage_timing("total pipeline", stage_started, args.profile_performance);

    Ok(AnalysisOutcome {
        output_video_path: args.output_path.clone(),
        database_id,
        transient_pose_failures,
    })
}

#[allow(clippy::too_many_arguments)]
fn build_frame_records(
    frames: &[Frame],
    poses: &[Pose],
    mi: &[f64],
    mi_smoothed: &[f64],
    states: &[crate::analysis::MotionState],
    raw_features: &[crate::analysis::FeatureVec],
    config: &RetimeConfig,
    args: &RunArgs,
) -> Vec<FrameRecord> {
    let want_keypoints = config.save_keypoints || args.save_keypoints_override;
    let want_debug = args.debug_features || config.save_keypoints;

    frames
        .iter()
        .enumerate()
        .map(|(i, frame)| {
            let keypoints = if want_keypoints {
                Some(poses[i].points.iter().map(Into::into).collect())
            } else {
                None
            };
            let contribution = if want_debug {
                let f = raw_features[i];
                Some(ContributionBreakdown {
                    displacement: f.displacement,
                    velocity: f.velocity,
                    acceleration: f.acceleration,
                    direction_change: f.direction_change,
                    pose_change: f.pose_change,
                })
            } else {
                None
            };
            FrameRecord {
                frame_index: frame.index,
                timestamp: frame.timestamp,
                motion_intensity_score: mi_smoothed.get(i).copied().unwrap_or(mi[i]),
                motion_state: states[i].into(),
                keypoints,
                contribution,
            }
        })
        .collect()
}

fn stderr_progress_bar(enabled: bool) -> ProgressBar {
    if !enabled {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::with_draw_target(None, ProgressDrawTarget::stderr());
    if let Ok(style) = ProgressStyle::with_template("{spinner} decoding frames: {pos}") {
        bar.set_style(style);
    }
    bar
}

fn log_stage_timing(stage: &str, started: Instant, enabled: bool) {
    if enabled {
        tracing::info!(
            stage,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "stage complete"
        );
    }
}
