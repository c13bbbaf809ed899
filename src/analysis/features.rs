use rayon::prelude::*;

use crate::pose::Pose;

const EPSILON: f64 = 1e-8;

/// Per-frame 5-tuple (D, V, A, Θ, P) plus an `invalid` flag for frames whose
/// valid-point count fell below the minimum on either side of the pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVec {
    pub displacement: f64,
    pub velocity: f64,
    pub acceleration: f64,
    pub direction_change: f64,
    pub pose_change: f64,
    pub invalid: bool,
}

impl FeatureVec {
    pub const ZERO: Self = Self {
        displacement: 0.0,
        velocity: 0.0,
        acceleration: 0.0,
        direction_change: 0.0,
        pose_change: 0.0,
        invalid: false,
    };
}

/// A joint-angle triple `(a, b, c)`: point indices whose angle at `b` is
/// tracked frame to frame for the pose-change feature `P(t)`.
pub type JointTriple = (usize, usize, usize);

/// Builds the per-frame feature series from a pose sequence.
///
/// Grounded on spec.md §4.2's formulas: displacement/velocity/acceleration
/// are normalized by the character scale `S(t)` and `Δt`, direction change is
/// the mean per-point turning angle, and pose change is the mean absolute
/// joint-angle delta across a configurable triple set.
pub struct FeatureComputer {
    min_valid_points: usize,
    joint_triples: Vec<JointTriple>,
}

impl FeatureComputer {
    pub fn new(min_valid_points: usize, joint_triples: Vec<JointTriple>) -> Self {
        Self {
            min_valid_points,
            joint_triples,
        }
    }

    /// Derive a default joint-triple set from the landmark count: every
    /// consecutive run of three points forms one angle at the middle point.
    /// `P(t)` is zero for identical poses by construction (per spec.md §9's
    /// open question on the exact formula, left to the implementer subject
    /// to that constraint).
    pub fn default_joint_triples(landmark_count: usize) -> Vec<JointTriple> {
        if landmark_count < 3 {
            return Vec::new();
        }
        (0..landmark_count - 2).map(|i| (i, i + 1, i + 2)).collect()
    }

    /// Each frame's feature vector only ever looks at `poses[t-2..=t]`, so
    /// the whole series is embarrassingly parallel across `t` (spec.md §5
    /// lists per-frame feature computation as a safe parallelization
    /// target, alongside pose extraction).
    pub fn compute_series(&self, poses: &[Pose], delta_t: f64) -> Vec<FeatureVec> {
        if poses.is_empty() {
            return Vec::new();
        }
        if poses.len() == 1 {
            return vec![FeatureVec::ZERO];
        }

        (0..poses.len())
            .into_par_iter()
            .map(|t| {
                if t == 0 {
                    FeatureVec::ZERO
                } else {
                    self.compute_one(poses, delta_t, t)
                }
            })
            .collect()
    }

    fn compute_one(&self, poses: &[Pose], delta_t: f64, t: usize) -> FeatureVec {
        let prev = &poses[t - 1];
        let curr = &poses[t];

        let n = prev.points.len().min(curr.points.len());
        let mut displacements = Vec::with_capacity(n);
        let mut velocities = Vec::with_capacity(n);

        for i in 0..n {
            let p0 = prev.points[i];
            let p1 = curr.points[i];
            if !p0.valid || !p1.valid {
                continue;
            }
            let dx = p1.x - p0.x;
            let dy = p1.y - p0.y;
            let dist = (dx * dx + dy * dy).sqrt();
            let scale = curr.scale.max(EPSILON);
            let d = dist / scale;
            displacements.push(d);
            velocities.push(d / delta_t.max(EPSILON));
        }

        // Acceleration needs v(t) and v(t-1); v(t-1) is derived the same way
        // using the t-2..t-1 pair, independent of this frame's own pass.
        let acceleration = if t < 2 {
            0.0
        } else {
            self.acceleration_at(poses, delta_t, t)
        };

        let direction_change = if t < 2 {
            0.0
        } else {
            self.direction_change_at(poses, t)
        };

        let valid_count = (0..n)
            .filter(|&i| prev.points[i].valid && curr.points[i].valid)
            .count();
        let invalid = valid_count < self.min_valid_points || prev.invalid || curr.invalid;

        let displacement = mean(&displacements);
        let velocity = mean(&velocities);
        let pose_change = self.pose_change(prev, curr);

        if invalid {
            FeatureVec {
                invalid: true,
                ..FeatureVec::ZERO
            }
        } else {
            FeatureVec {
                displacement,
                velocity,
                acceleration,
                direction_change,
                pose_change,
                invalid: false,
            }
        }
    }

    fn velocities_at(&self, poses: &[Pose], delta_t: f64, t: usize) -> Vec<f64> {
        let prev = &poses[t - 1];
        let curr = &poses[t];
        let n = prev.points.len().min(curr.points.len());
        (0..n)
            .filter_map(|i| {
                let p0 = prev.points[i];
                let p1 = curr.points[i];
                if !p0.valid || !p1.valid {
                    return None;
                }
                let dx = p1.x - p0.x;
                let dy = p1.y - p0.y;
                let dist = (dx * dx + dy * dy).sqrt();
                Some((i, dist / curr.scale.max(EPSILON) / delta_t.max(EPSILON)))
            })
            .map(|(_, v)| v)
            .collect()
    }

    fn acceleration_at(&self, poses: &[Pose], delta_t: f64, t: usize) -> f64 {
        let v_t = self.velocities_at(poses, delta_t, t);
        let v_prev = self.velocities_at(poses, delta_t, t - 1);
        let len = v_t.len().min(v_prev.len());
        let accs: Vec<f64> = (0..len)
            .map(|i| ((v_t[i] - v_prev[i]) / delta_t.max(EPSILON)).abs())
            .collect();
        mean(&accs)
    }

    fn direction_change_at(&self, poses: &[Pose], t: usize) -> f64 {
        let prev = &poses[t - 1];
        let curr = &poses[t];
        let before = &poses[t - 2];
        let n = prev.points.len().min(curr.points.len()).min(before.points.len());

        let directions: Vec<f64> = (0..n)
            .filter_map(|i| {
                let p0 = prev.points[i];
                let p1 = curr.points[i];
                let q0 = before.points[i];
                if !p0.valid || !p1.valid || !q0.valid {
                    return None;
                }
                let (dx, dy) = (p1.x - p0.x, p1.y - p0.y);
                let (pdx, pdy) = (p0.x - q0.x, p0.y - q0.y);
                let mag_u = (dx * dx + dy * dy).sqrt();
                let mag_prev = (pdx * pdx + pdy * pdy).sqrt();
                let cos_theta = ((dx * pdx + dy * pdy) / (mag_u * mag_prev + EPSILON)).clamp(-1.0, 1.0);
                Some(cos_theta.acos() / std::f64::consts::PI)
            })
            .collect();
        mean(&directions)
    }

    fn pose_change(&self, prev: &Pose, curr: &Pose) -> f64 {
        if self.joint_triples.is_empty() {
            return 0.0;
        }
        let mut deltas = Vec::with_capacity(self.joint_triples.len());
        for &(a, b, c) in &self.joint_triples {
            if let (Some(angle_prev), Some(angle_curr)) = (
                joint_angle(prev, a, b, c),
                joint_angle(curr, a, b, c),
            ) {
                deltas.push((angle_curr - angle_prev).abs() / std::f64::consts::PI);
            }
        }
        mean(&deltas)
    }
}

fn joint_angle(pose: &Pose, a: usize, b: usize, c: usize) -> Option<f64> {
    let pa = pose.points.get(a)?;
    let pb = pose.points.get(b)?;
    let pc = pose.points.get(c)?;
    if !pa.valid || !pb.valid || !pc.valid {
        return None;
    }
    let ux = pa.x - pb.x;
    let uy = pa.y - pb.y;
    let vx = pc.x - pb.x;
    let vy = pc.y - pb.y;
    let mag_u = (ux * ux + uy * uy).sqrt();
    let mag_v = (vx * vx + vy * vy).sqrt();
    let cos_theta = ((ux * vx + uy * vy) / (mag_u * mag_v + EPSILON)).clamp(-1.0, 1.0);
    Some(cos_theta.acos())
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::Point;

    fn pose(points: Vec<(f64, f64)>) -> Pose {
        let points: Vec<Point> = points
            .into_iter()
            .map(|(x, y)| Point { x, y, valid: true })
            .collect();
        crate::pose::finalize_pose(points, 1)
    }

    #[test]
    fn first_frame_is_all_zero() {
        let computer = FeatureComputer::new(1, Vec::new());
        let poses = vec![pose(vec![(0.0, 0.0), (10.0, 0.0)])];
        let series = computer.compute_series(&poses, 1.0 / 30.0);
        assert_eq!(series[0], FeatureVec::ZERO);
    }

    #[test]
    fn acceleration_is_zero_at_t_equals_one() {
        let computer = FeatureComputer::new(1, Vec::new());
        let poses = vec![
            pose(vec![(0.0, 0.0), (10.0, 0.0)]),
            pose(vec![(1.0, 0.0), (11.0, 0.0)]),
        ];
        let series = computer.compute_series(&poses, 1.0 / 30.0);
        assert_eq!(series[1].acceleration, 0.0);
    }

    #[test]
    fn identical_poses_yield_zero_pose_change() {
        let triples = FeatureComputer::default_joint_triples(3);
        let computer = FeatureComputer::new(1, triples);
        let p = pose(vec![(0.0, 0.0), (5.0, 5.0), (10.0, 0.0)]);
        let poses = vec![p.clone(), p];
        let series = computer.compute_series(&poses, 1.0 / 30.0);
        assert_eq!(series[1].pose_change, 0.0);
    }

    #[test]
    fn displacement_is_scale_normalized() {
        let computer = FeatureComputer::new(1, Vec::new());
        let poses = vec![
            pose(vec![(0.0, 0.0), (10.0, 10.0)]),
            pose(vec![(2.0, 0.0), (12.0, 10.0)]),
        ];
        let series = computer.compute_series(&poses, 1.0 / 30.0);
        assert!(series[1].displacement > 0.0);
        assert!(series[1].displacement.is_finite());
    }
}
