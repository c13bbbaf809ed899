use crate::config::RetimeConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionState {
    Low,
    Mid,
    High,
}

#[derive(Debug, Clone, Copy)]
struct Run {
    state: MotionState,
    start: usize,
    end: usize,
}

impl Run {
    fn len(&self) -> usize {
        self.end - self.start
    }
}

/// Runs the full three-pass classification: hysteresis FSM, tame/tsume
/// annotation, then minimum-dwell enforcement. Returns the final state per
/// frame plus a `preserved` flag (tame/tsume never changes the state
/// labels, only marks frames `FrameSelector` must emit verbatim).
///
/// Annotation runs on the *preliminary* states, before dwell enforcement, so
/// a tame hold run short enough to otherwise be erased by min-dwell can be
/// flagged and protected from that erasure before the erasing pass runs.
pub fn classify(
    mi_smoothed: &[f64],
    accel_normalized: &[f64],
    delta_t: f64,
    config: &RetimeConfig,
) -> (Vec<MotionState>, Vec<bool>) {
    let preliminary = classify_preliminary(mi_smoothed, config);

    let preserved = if config.enable_tame_tsume {
        let onsets = detect_tsume_onsets(
            mi_smoothed,
            accel_normalized,
            &preliminary,
            config.threshold_high,
            config.tsume_accel_threshold,
        );
        annotate_preserved(&preliminary, &onsets, config.tame_extension_frames)
    } else {
        vec![false; preliminary.len()]
    };

    let min_frames = min_dwell_frames(config.min_duration, delta_t);
    let final_states = enforce_min_dwell(&preliminary, min_frames, &preserved);

    (final_states, preserved)
}

fn min_dwell_frames(min_duration: f64, delta_t: f64) -> usize {
    if delta_t <= 0.0 {
        return 1;
    }
    (min_duration / delta_t).ceil().max(1.0) as usize
}

fn classify_preliminary(mi: &[f64], config: &RetimeConfig) -> Vec<MotionState> {
    let tau_h = config.threshold_high;
    let tau_l = config.threshold_low;
    let delta = config.hysteresis_margin;

    let mut states = Vec::with_capacity(mi.len());
    let mut iter = mi.iter();
    let Some(&first) = iter.next() else {
        return states;
    };

    let mut state = initial_state(first, tau_h, tau_l);
    states.push(state);

    for &value in iter {
        state = transition(state, value, tau_h, tau_l, delta);
        states.push(state);
    }
    states
}

fn initial_state(mi: f64, tau_h: f64, tau_l: f64) -> MotionState {
    if mi >= tau_h {
        MotionState::High
    } else if mi >= tau_l {
        MotionState::Mid
    } else {
        MotionState::Low
    }
}

fn transition(state: MotionState, mi: f64, tau_h: f64, tau_l: f64, delta: f64) -> MotionState {
    match state {
        MotionState::High => {
            if mi < tau_l - delta {
                MotionState::Low
            } else if mi < tau_h - delta {
                MotionState::Mid
            } else {
                MotionState::High
            }
        }
        MotionState::Mid => {
            if mi >= tau_h + delta {
                MotionState::High
            } else if mi < tau_l - delta {
                MotionState::Low
            } else {
                MotionState::Mid
            }
        }
        MotionState::Low => {
            if mi >= tau_h + delta {
                MotionState::High
            } else if mi >= tau_l + delta {
                MotionState::Mid
            } else {
                MotionState::Low
            }
        }
    }
}

fn compute_runs(states: &[MotionState]) -> Vec<Run> {
    let mut runs = Vec::new();
    let mut start = 0;
    for i in 1..=states.len() {
        if i == states.len() || states[i] != states[start] {
            runs.push(Run {
                state: states[start],
                start,
                end: i,
            });
            start = i;
        }
    }
    runs
}

/// Second pass: any run shorter than `min_frames` (other than possibly the
/// last, or one containing a tame/tsume-preserved frame) is rewritten to the
/// previous run's state, or the next run's state if it's the first run.
/// Repeats until no further rewrite applies, since a rewrite can merge into
/// a neighbor and create a new short run.
fn enforce_min_dwell(states: &[MotionState], min_frames: usize, preserved: &[bool]) -> Vec<MotionState> {
    let mut states = states.to_vec();
    if states.is_empty() {
        return states;
    }

    for _ in 0..states.len() + 1 {
        let runs = compute_runs(&states);
        if runs.len() <= 1 {
            break;
        }
        let mut rewritten = false;
        for (i, run) in runs.iter().enumerate() {
            let is_last = i == runs.len() - 1;
            let is_protected = preserved[run.start..run.end].iter().any(|&p| p);
            if is_last || is_protected || run.len() >= min_frames {
                continue;
            }
            let replacement = if i == 0 { runs[1].state } else { runs[i - 1].state };
            if replacement != run.state {
                for slot in states.iter_mut().take(run.end).skip(run.start) {
                    *slot = replacement;
                }
                rewritten = true;
                break;
            }
        }
        if !rewritten {
            break;
        }
    }
    states
}

const TSUME_RISE_WINDOW: usize = 2;

fn detect_tsume_onsets(
    mi: &[f64],
    accel_normalized: &[f64],
    states: &[MotionState],
    threshold_high: f64,
    accel_threshold: f64,
) -> Vec<usize> {
    let mut onsets = Vec::new();
    for t in 1..mi.len() {
        let rose_into_high = mi[t] >= threshold_high
            && (t.saturating_sub(TSUME_RISE_WINDOW)..t).any(|j| mi[j] < threshold_high);
        let accel_onset = accel_normalized.get(t).is_some_and(|&a| a > accel_threshold)
            && matches!(states[t - 1], MotionState::Low | MotionState::Mid);
        if rose_into_high || accel_onset {
            onsets.push(t);
        }
    }
    onsets
}

/// Third pass: for each onset, look back up to `extension_budget` frames; if
/// any of those is LOW, the entire preceding LOW run (back to its start) is
/// marked preserved. Never touches state labels.
fn annotate_preserved(states: &[MotionState], onsets: &[usize], extension_budget: usize) -> Vec<bool> {
    let mut preserved = vec![false; states.len()];
    if states.is_empty() {
        return preserved;
    }
    let runs = compute_runs(states);

    for &t in onsets {
        let lookback_start = t.saturating_sub(extension_budget);
        for j in lookback_start..t {
            if states[j] == MotionState::Low {
                if let Some(run) = runs.iter().find(|r| r.start <= j && j < r.end) {
                    for slot in preserved.iter_mut().take(run.end).skip(run.start) {
                        *slot = true;
                    }
                }
            }
        }
    }
    preserved
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> RetimeConfig {
        RetimeConfig::default()
    }

    #[test]
    fn constant_mid_stays_mid() {
        let mi = vec![0.50; 20];
        let (states, _) = classify(&mi, &vec![0.0; 20], 1.0 / 30.0, &config());
        assert!(states.iter().all(|s| *s == MotionState::Mid));
    }

    #[test]
    fn constant_high_stays_high() {
        let mi = vec![0.80; 20];
        let (states, _) = classify(&mi, &vec![0.0; 20], 1.0 / 30.0, &config());
        assert!(states.iter().all(|s| *s == MotionState::High));
    }

    #[test]
    fn step_low_to_high() {
        let mut mi = vec![0.10; 10];
        mi.extend(vec![0.80; 10]);
        let (states, _) = classify(&mi, &vec![0.0; 20], 1.0 / 30.0, &config());
        assert!(states[..10].iter().all(|s| *s == MotionState::Low));
        assert!(states[10..].iter().all(|s| *s == MotionState::High));
    }

    #[test]
    fn single_frame_spike_is_rewritten_by_min_dwell() {
        let mut mi = vec![0.10; 20];
        mi[5] = 0.80;
        let cfg = config();
        let (states, _) = classify(&mi, &vec![0.0; 20], 1.0 / 30.0, &cfg);
        assert!(states.iter().all(|s| *s == MotionState::Low));
    }

    #[test]
    fn hysteresis_retention_band_is_stable() {
        // Inside HIGH's retention band (>= tau_h - delta) for many frames: never drops.
        let mut mi = vec![0.90; 5];
        mi.extend(vec![0.57; 50]); // tau_h - delta = 0.55, so 0.57 stays HIGH
        let (states, _) = classify(&mi, &vec![0.0; 55], 1.0 / 30.0, &config());
        assert!(states.iter().all(|s| *s == MotionState::High));
    }

    #[test]
    fn tame_tsume_preserves_low_run_before_onset() {
        let mut mi = vec![0.10; 10];
        mi.extend(vec![0.80; 5]);
        let mut cfg = config();
        cfg.enable_tame_tsume = true;
        cfg.tame_extension_frames = 3;
        let (states, preserved) = classify(&mi, &vec![0.0; 15], 1.0 / 30.0, &cfg);
        assert_eq!(states[0], MotionState::Low);
        assert!(preserved[..10].iter().all(|p| *p));
    }

    #[test]
    fn tame_tsume_protects_short_low_dip_from_min_dwell_erasure() {
        // A 2-frame LOW dip between MID and HIGH is shorter than the default
        // min-dwell window (3 frames at 30fps) and would normally be erased
        // (rewritten to the preceding MID run). With tame/tsume enabled, the
        // dip sits right before the rise into HIGH, so it must survive.
        let mut mi = vec![0.50; 10];
        mi.extend(vec![0.10; 2]);
        mi.extend(vec![0.80; 10]);
        let mut cfg = config();
        cfg.enable_tame_tsume = true;

        let (states, preserved) = classify(&mi, &vec![0.0; 22], 1.0 / 30.0, &cfg);

        assert_eq!(states[10], MotionState::Low);
        assert_eq!(states[11], MotionState::Low);
        assert!(preserved[10] && preserved[11]);
    }

    #[test]
    fn without_tame_tsume_the_same_short_low_dip_is_erased() {
        let mut mi = vec![0.50; 10];
        mi.extend(vec![0.10; 2]);
        mi.extend(vec![0.80; 10]);
        let cfg = config();

        let (states, preserved) = classify(&mi, &vec![0.0; 22], 1.0 / 30.0, &cfg);

        assert_ne!(states[10], MotionState::Low);
        assert!(preserved.iter().all(|p| !p));
    }

    #[test]
    fn swapped_thresholds_are_rejected_by_config() {
        let mut cfg = config();
        cfg.threshold_high = 0.2;
        cfg.threshold_low = 0.5;
        assert!(cfg.validate().is_err());
    }
}
