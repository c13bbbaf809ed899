use crate::config::SmoothingMethod;

/// Smooths a raw `MI(t)` series into `MI̅(t)` using either EMA or a centered
/// moving window, per spec.md §4.3.
pub struct Smoother {
    method: SmoothingMethod,
    alpha: f64,
    window: usize,
}

impl Smoother {
    pub fn new(method: SmoothingMethod, alpha: f64, window: usize) -> Self {
        Self {
            method,
            alpha,
            window,
        }
    }

    pub fn smooth(&self, mi: &[f64]) -> Vec<f64> {
        match self.method {
            SmoothingMethod::Ema => self.smooth_ema(mi),
            SmoothingMethod::Window => self.smooth_window(mi),
        }
    }

    fn smooth_ema(&self, mi: &[f64]) -> Vec<f64> {
        if mi.is_empty() {
            return Vec::new();
        }
        let mut out = Vec::with_capacity(mi.len());
        let mut prev = mi[0];
        out.push(prev);
        for &value in &mi[1..] {
            prev = self.alpha * value + (1.0 - self.alpha) * prev;
            out.push(prev);
        }
        out
    }

    fn smooth_window(&self, mi: &[f64]) -> Vec<f64> {
        let w = self.window.max(1);
        let half = w / 2;
        mi.iter()
            .enumerate()
            .map(|(i, _)| {
                let lo = i.saturating_sub(half);
                let hi = (i + half + 1).min(mi.len());
                let slice = &mi[lo..hi];
                slice.iter().sum::<f64>() / slice.len() as f64
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ema_first_value_is_unchanged() {
        let smoother = Smoother::new(SmoothingMethod::Ema, 0.5, 3);
        let out = smoother.smooth(&[0.2, 0.8, 0.8]);
        assert_eq!(out[0], 0.2);
    }

    #[test]
    fn ema_constant_input_is_stable() {
        let smoother = Smoother::new(SmoothingMethod::Ema, 0.7, 3);
        let out = smoother.smooth(&[0.5; 10]);
        assert!(out.iter().all(|v| (*v - 0.5).abs() < 1e-9));
    }

    #[test]
    fn window_smoothing_truncates_at_boundaries() {
        let smoother = Smoother::new(SmoothingMethod::Window, 0.7, 3);
        let out = smoother.smooth(&[1.0, 0.0, 1.0, 0.0, 1.0]);
        assert_eq!(out.len(), 5);
        assert!((out[0] - 0.5).abs() < 1e-9);
    }
}
