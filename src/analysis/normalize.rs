use super::features::FeatureVec;

/// Per-clip min-max normalizer for the five raw feature channels.
///
/// Whole-clip normalization is a latency trap if streaming is ever desired:
/// the min/max pass below needs every frame before it can emit a single
/// normalized value. It's kept as its own pass rather than folded into
/// `FeatureComputer` so a future rolling-window variant can replace just
/// this step.
pub struct Normalizer;

#[derive(Debug, Clone, Copy, Default)]
pub struct NormalizedFeatureVec {
    pub displacement: f64,
    pub velocity: f64,
    pub acceleration: f64,
    pub direction_change: f64,
    pub pose_change: f64,
}

impl Normalizer {
    pub fn normalize(raw: &[FeatureVec]) -> Vec<NormalizedFeatureVec> {
        let d: Vec<f64> = raw.iter().map(|f| f.displacement).collect();
        let v: Vec<f64> = raw.iter().map(|f| f.velocity).collect();
        let a: Vec<f64> = raw.iter().map(|f| f.acceleration).collect();
        let theta: Vec<f64> = raw.iter().map(|f| f.direction_change).collect();
        let p: Vec<f64> = raw.iter().map(|f| f.pose_change).collect();

        let d_n = min_max_scale(&d);
        let v_n = min_max_scale(&v);
        let a_n = min_max_scale(&a);
        let theta_n = min_max_scale(&theta);
        let p_n = min_max_scale(&p);

        (0..raw.len())
            .map(|i| NormalizedFeatureVec {
                displacement: d_n[i],
                velocity: v_n[i],
                acceleration: a_n[i],
                direction_change: theta_n[i],
                pose_change: p_n[i],
            })
            .collect()
    }
}

/// Scales `values` into `[0,1]`. If `max == min` (a constant or empty
/// channel) the whole channel collapses to 0, per spec.md §4.3.
fn min_max_scale(values: &[f64]) -> Vec<f64> {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        return vec![0.0; values.len()];
    }
    let min = finite.iter().copied().fold(f64::INFINITY, f64::min);
    let max = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let span = max - min;
    if span <= 0.0 {
        return vec![0.0; values.len()];
    }
    values
        .iter()
        .map(|v| if v.is_finite() { (v - min) / span } else { 0.0 })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(d: f64) -> FeatureVec {
        FeatureVec {
            displacement: d,
            ..FeatureVec::ZERO
        }
    }

    #[test]
    fn constant_channel_collapses_to_zero() {
        let series = vec![raw(0.5), raw(0.5), raw(0.5)];
        let normalized = Normalizer::normalize(&series);
        assert!(normalized.iter().all(|f| f.displacement == 0.0));
    }

    #[test]
    fn min_and_max_map_to_zero_and_one() {
        let series = vec![raw(0.0), raw(5.0), raw(10.0)];
        let normalized = Normalizer::normalize(&series);
        assert_eq!(normalized[0].displacement, 0.0);
        assert_eq!(normalized[2].displacement, 1.0);
        assert!((normalized[1].displacement - 0.5).abs() < 1e-9);
    }
}
