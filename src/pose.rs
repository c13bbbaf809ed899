use crate::video_io::Frame;

/// A single 2D landmark in pixel space, with its own validity flag.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub valid: bool,
}

/// Per-frame pose: N landmarks plus the character scale `S`.
///
/// `S` is the diagonal of the axis-aligned bounding box over valid points.
/// `invalid` means fewer than `min_valid_keypoints` points validated — in
/// that case `scale` still carries a best-effort value and callers must
/// consult `invalid` rather than trust it directly (§3: "if bbox diagonal <
/// ε or pose invalid, S(t) := S(t-1)").
#[derive(Debug, Clone)]
pub struct Pose {
    pub points: Vec<Point>,
    pub scale: f64,
    pub invalid: bool,
}

impl Pose {
    pub fn valid_points(&self) -> impl Iterator<Item = &Point> {
        self.points.iter().filter(|p| p.valid)
    }
}

/// Capability set for keypoint detection: `{detect(frame) -> Pose}`.
///
/// Implementations are interchangeable (bundled detector, remote service,
/// synthetic for tests) and must not leak any detector-specific coordinate
/// convention beyond pixel `(x, y)`.
pub trait PoseExtractor {
    fn detect(&mut self, frame: &Frame) -> Pose;
}

const SCALE_EPSILON: f64 = 1e-8;

/// Build a `Pose` from raw landmark coordinates, applying the
/// minimum-valid-keypoints rule and computing the bbox-diagonal scale.
///
/// Shared by every `PoseExtractor` implementation so the invalid/scale logic
/// from spec.md §4.1 lives in exactly one place.
pub fn finalize_pose(points: Vec<Point>, min_valid_keypoints: usize) -> Pose {
    let valid_count = points.iter().filter(|p| p.valid).count();
    let invalid = valid_count < min_valid_keypoints;

    let scale = if valid_count == 0 {
        0.0
    } else {
        let (mut min_x, mut min_y, mut max_x, mut max_y) =
            (f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY);
        for p in points.iter().filter(|p| p.valid) {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        let dx = max_x - min_x;
        let dy = max_y - min_y;
        (dx * dx + dy * dy).sqrt()
    };

    let invalid = invalid || scale < SCALE_EPSILON;

    Pose {
        points,
        scale,
        invalid,
    }
}

/// Deterministic detector used by tests and as a placeholder wiring point:
/// projects a fixed landmark template, jittered by frame index, onto the
/// frame bounds. Never marks a pose invalid — useful for exercising the
/// rest of the pipeline without a real detector backend.
pub struct SyntheticPoseExtractor {
    pub landmark_count: usize,
    pub min_valid_keypoints: usize,
}

impl SyntheticPoseExtractor {
    pub fn new(landmark_count: usize, min_valid_keypoints: usize) -> Self {
        Self {
            landmark_count,
            min_valid_keypoints,
        }
    }
}

impl PoseExtractor for SyntheticPoseExtractor {
    fn detect(&mut self, frame: &Frame) -> Pose {
        let w = f64::from(frame.width.max(1));
        let h = f64::from(frame.height.max(1));
        let t = frame.index as f64;
        let points = (0..self.landmark_count)
            .map(|i| {
                let phase = t * 0.1 + i as f64;
                Point {
                    x: (w / 2.0) + (w / 4.0) * phase.cos(),
                    y: (h / 2.0) + (h / 4.0) * phase.sin(),
                    valid: true,
                }
            })
            .collect();
        finalize_pose(points, self.min_valid_keypoints)
    }
}

/// Adapter boundary for an external/bundled pose detector backend.
///
/// The core never depends on a specific detector library's conventions; a
/// real backend plugs in here and only needs to produce pixel-space
/// `Point`s per frame, handing them to [`finalize_pose`].
pub struct ExternalPoseExtractor<F> {
    detect_fn: F,
    min_valid_keypoints: usize,
}

impl<F> ExternalPoseExtractor<F>
where
    F: FnMut(&Frame) -> Vec<Point>,
{
    pub fn new(detect_fn: F, min_valid_keypoints: usize) -> Self {
        Self {
            detect_fn,
            min_valid_keypoints,
        }
    }
}

impl<F> PoseExtractor for ExternalPoseExtractor<F>
where
    F: FnMut(&Frame) -> Vec<Point>,
{
    fn detect(&mut self, frame: &Frame) -> Pose {
        let points = (self.detect_fn)(frame);
        finalize_pose(points, self.min_valid_keypoints)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(index: usize) -> Frame {
        Frame {
            index,
            timestamp: index as f64 / 30.0,
            width: 100,
            height: 100,
            pixels: Vec::new(),
        }
    }

    #[test]
    fn synthetic_extractor_always_valid_with_default_landmarks() {
        let mut extractor = SyntheticPoseExtractor::new(10, 5);
        let pose = extractor.detect(&frame(0));
        assert!(!pose.invalid);
        assert!(pose.scale > 0.0);
    }

    #[test]
    fn too_few_valid_points_marks_invalid() {
        let points = vec![
            Point { x: 1.0, y: 1.0, valid: true },
            Point { x: 2.0, y: 2.0, valid: false },
            Point { x: 3.0, y: 3.0, valid: false },
        ];
        let pose = finalize_pose(points, 2);
        assert!(pose.invalid);
    }

    #[test]
    fn degenerate_bbox_is_invalid() {
        let points = vec![
            Point { x: 5.0, y: 5.0, valid: true },
            Point { x: 5.0, y: 5.0, valid: true },
            Point { x: 5.0, y: 5.0, valid: true },
        ];
        let pose = finalize_pose(points, 2);
        assert!(pose.invalid);
        assert_eq!(pose.scale, 0.0);
    }
}
