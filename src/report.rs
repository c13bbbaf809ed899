use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::analysis::MotionState;
use crate::config::RetimeConfig;
use crate::error::WriteError;
use crate::pose::Point;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MotionStateLabel {
    Low,
    Mid,
    High,
}

impl From<MotionState> for MotionStateLabel {
    fn from(state: MotionState) -> Self {
        match state {
            MotionState::Low => MotionStateLabel::Low,
            MotionState::Mid => MotionStateLabel::Mid,
            MotionState::High => MotionStateLabel::High,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeypointRecord {
    pub x: f64,
    pub y: f64,
    pub valid: bool,
}

impl From<&Point> for KeypointRecord {
    fn from(p: &Point) -> Self {
        Self {
            x: p.x,
            y: p.y,
            valid: p.valid,
        }
    }
}

/// A per-frame contribution breakdown, gated behind `--debug-features` or
/// `save_keypoints` — the debug field spec.md §3 lists on `MIStream`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ContributionBreakdown {
    pub displacement: f64,
    pub velocity: f64,
    pub acceleration: f64,
    pub direction_change: f64,
    pub pose_change: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameRecord {
    pub frame_index: usize,
    pub timestamp: f64,
    pub motion_intensity_score: f64,
    pub motion_state: MotionStateLabel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keypoints: Option<Vec<KeypointRecord>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contribution: Option<ContributionBreakdown>,
}

/// The document handed to the persistence store. `_id` is filled in by
/// `ResultStore::persist`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<String>,
    pub source_video_path: String,
    pub output_video_path: String,
    pub analysis_timestamp: String,
    pub parameters: RetimeConfig,
    pub frame_data: Vec<FrameRecord>,
    pub transient_pose_failures: usize,
}

impl AnalysisResult {
    pub fn new(
        source_video_path: String,
        output_video_path: String,
        parameters: RetimeConfig,
        frame_data: Vec<FrameRecord>,
        transient_pose_failures: usize,
    ) -> Self {
        Self {
            _id: None,
            source_video_path,
            output_video_path,
            analysis_timestamp: Utc::now().to_rfc3339(),
            parameters,
            frame_data,
            transient_pose_failures,
        }
    }
}

/// Accepts an `AnalysisResult` document and returns an id, per the
/// persistence-store collaborator interface in spec.md §1.
pub trait ResultStore {
    fn persist(&self, result: &mut AnalysisResult) -> Result<String, WriteError>;
}

/// Default file-based store: writes the document as JSON next to the output
/// video, atomically (temp path then rename), matching the
/// `std::fs::rename` pattern used elsewhere in the pack for durable writes.
pub struct FileResultStore {
    directory: PathBuf,
}

impl FileResultStore {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }
}

impl ResultStore for FileResultStore {
    fn persist(&self, result: &mut AnalysisResult) -> Result<String, WriteError> {
        let id = format!("{:x}", md5_like_id(&result.output_video_path, &result.analysis_timestamp));
        result._id = Some(id.clone());

        let dest = self.directory.join(format!("{id}.json"));
        let json = serde_json::to_vec_pretty(result).map_err(|e| WriteError::Persist(e.into()))?;
        write_atomic(&dest, &json)?;
        Ok(id)
    }
}

/// Cheap, dependency-free content id: not cryptographic, just stable and
/// unique enough to key a persisted document by its own content.
fn md5_like_id(output_path: &str, timestamp: &str) -> u64 {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};
    let mut hasher = DefaultHasher::new();
    output_path.hash(&mut hasher);
    timestamp.hash(&mut hasher);
    hasher.finish()
}

/// Write `data` to `final_path` atomically: write to a sibling temp path,
/// then rename over the destination. Mirrors
/// `SentryShot-sentryshot/src/recdb/migrate.rs`'s write-then-rename pattern.
pub fn write_atomic(final_path: &Path, data: &[u8]) -> Result<(), WriteError> {
    let temp = final_path.with_extension("tmp");
    fs::write(&temp, data).map_err(|e| WriteError::Persist(e.into()))?;
    fs::rename(&temp, final_path).map_err(|source| WriteError::Rename {
        temp,
        dest: final_path.to_owned(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn persist_writes_and_assigns_id() {
        let dir = tempdir().unwrap();
        let store = FileResultStore::new(dir.path());
        let mut result = AnalysisResult::new(
            "in.mp4".into(),
            "out.mp4".into(),
            RetimeConfig::default(),
            Vec::new(),
            0,
        );
        let id = store.persist(&mut result).unwrap();
        assert_eq!(result._id, Some(id.clone()));
        assert!(dir.path().join(format!("{id}.json")).exists());
        assert!(!dir.path().join(format!("{id}.tmp")).exists());
    }

    #[test]
    fn write_atomic_leaves_no_temp_file_behind() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("doc.json");
        write_atomic(&dest, b"{}").unwrap();
        assert!(dest.exists());
        assert!(!dest.with_extension("tmp").exists());
    }
}
