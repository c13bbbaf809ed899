use std::path::PathBuf;

use thiserror::Error;

/// Top-level failure of a retiming invocation.
///
/// Every fatal condition from the spec's error table surfaces as one of
/// these variants and is rendered as the stderr JSON contract by `main.rs`.
/// `TransientPoseFailure` is deliberately absent here: it is recovered
/// locally by the pose stage and only ever shows up as a counter on
/// [`crate::AnalysisOutcome`].
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("input not found: {0}")]
    InputNotFound(PathBuf),

    #[error("input unreadable: {0}: {source}")]
    InputUnreadable {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error(
        "variable frame rate: declared {declared_fps:.3} fps, measured {measured_fps:.3} fps \
         (>{tolerance_pct:.1}% drift)"
    )]
    VariableFrameRate {
        declared_fps: f64,
        measured_fps: f64,
        tolerance_pct: f64,
    },

    #[error("no subject detected: every frame failed pose extraction")]
    NoSubjectDetected,

    #[error("clip too short: {frame_count} frames (minimum 3)")]
    ShortClip { frame_count: usize },

    #[error("output write error: {0}")]
    OutputWrite(#[from] WriteError),
}

/// Config-validation failures, checked once before the pipeline runs.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("motion_weights must sum to 1.0 +/- 0.01, got {sum:.4}")]
    WeightsDoNotSumToOne { sum: f64 },

    #[error("unknown smoothing_method '{0}' (expected 'ema' or 'window')")]
    UnknownSmoothingMethod(String),

    #[error("threshold_high ({threshold_high}) must be greater than threshold_low ({threshold_low})")]
    ThresholdOrder {
        threshold_high: f64,
        threshold_low: f64,
    },

    #[error("invalid JSON config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failures writing the re-timed video or the persisted analysis document.
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("mux output video: {0}")]
    Video(#[source] anyhow::Error),

    #[error("persist analysis result: {0}")]
    Persist(#[source] anyhow::Error),

    #[error("rename temp file {temp} to {dest}: {source}")]
    Rename {
        temp: PathBuf,
        dest: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
