use super::normalize::NormalizedFeatureVec;
use crate::config::MotionWeights;

/// Weighted sum of the five normalized channels into a single `MI(t) ∈ [0,1]`.
pub struct MiAggregator {
    weights: MotionWeights,
}

impl MiAggregator {
    pub fn new(weights: MotionWeights) -> Self {
        Self { weights }
    }

    pub fn aggregate(&self, normalized: &[NormalizedFeatureVec]) -> Vec<f64> {
        normalized.iter().map(|f| self.aggregate_one(f)).collect()
    }

    fn aggregate_one(&self, f: &NormalizedFeatureVec) -> f64 {
        let w = &self.weights;
        (w.displacement * f.displacement
            + w.velocity * f.velocity
            + w.acceleration * f.acceleration
            + w.direction_change * f.direction_change
            + w.pose_change * f.pose_change)
            .clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_weights_on_unit_input_sum_to_one() {
        let agg = MiAggregator::new(MotionWeights::default());
        let f = NormalizedFeatureVec {
            displacement: 1.0,
            velocity: 1.0,
            acceleration: 1.0,
            direction_change: 1.0,
            pose_change: 1.0,
        };
        let mi = agg.aggregate(&[f]);
        assert!((mi[0] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn zero_input_yields_zero_mi() {
        let agg = MiAggregator::new(MotionWeights::default());
        let mi = agg.aggregate(&[NormalizedFeatureVec::default()]);
        assert_eq!(mi[0], 0.0);
    }
}
