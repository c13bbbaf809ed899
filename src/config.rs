use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

const KNOWN_KEYS: &[&str] = &[
    "threshold_high",
    "threshold_low",
    "hysteresis_margin",
    "min_duration",
    "smoothing_method",
    "smoothing_alpha",
    "smoothing_window",
    "motion_weights",
    "enable_tame_tsume",
    "tame_extension_frames",
    "tsume_accel_threshold",
    "save_keypoints",
    "min_valid_keypoints",
];

/// Per-feature weighting applied by the MI aggregator.
///
/// Field order mirrors the spec's `(D, V, A, Θ, P)` 5-tuple.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct MotionWeights {
    pub displacement: f64,
    pub velocity: f64,
    pub acceleration: f64,
    pub direction_change: f64,
    pub pose_change: f64,
}

impl Default for MotionWeights {
    fn default() -> Self {
        Self {
            displacement: 0.30,
            velocity: 0.25,
            acceleration: 0.20,
            direction_change: 0.15,
            pose_change: 0.10,
        }
    }
}

impl MotionWeights {
    pub fn sum(&self) -> f64 {
        self.displacement + self.velocity + self.acceleration + self.direction_change + self.pose_change
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SmoothingMethod {
    Ema,
    Window,
}

impl Default for SmoothingMethod {
    fn default() -> Self {
        SmoothingMethod::Ema
    }
}

fn default_threshold_high() -> f64 {
    0.60
}
fn default_threshold_low() -> f64 {
    0.35
}
fn default_hysteresis_margin() -> f64 {
    0.05
}
fn default_min_duration() -> f64 {
    0.08
}
fn default_smoothing_alpha() -> f64 {
    0.7
}
fn default_smoothing_window() -> usize {
    3
}
fn default_tame_extension_frames() -> usize {
    3
}
fn default_tsume_accel_threshold() -> f64 {
    0.7
}
fn default_min_valid_keypoints() -> usize {
    5
}

/// Typed, defaulted, validated config schema for one retiming run.
///
/// Mirrors the keys in the spec's §6 Config JSON table exactly; every field
/// has a `#[serde(default = ...)]` so a caller can supply a partial JSON
/// object and still get the documented defaults, the way
/// `SentryShot-sentryshot/plugins/motion/config.rs` validates a typed config
/// parsed out of a raw `serde_json::Value`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RetimeConfig {
    #[serde(default = "default_threshold_high")]
    pub threshold_high: f64,
    #[serde(default = "default_threshold_low")]
    pub threshold_low: f64,
    #[serde(default = "default_hysteresis_margin")]
    pub hysteresis_margin: f64,
    #[serde(default = "default_min_duration")]
    pub min_duration: f64,
    #[serde(default)]
    pub smoothing_method: SmoothingMethod,
    #[serde(default = "default_smoothing_alpha")]
    pub smoothing_alpha: f64,
    #[serde(default = "default_smoothing_window")]
    pub smoothing_window: usize,
    #[serde(default)]
    pub motion_weights: MotionWeights,
    #[serde(default)]
    pub enable_tame_tsume: bool,
    #[serde(default = "default_tame_extension_frames")]
    pub tame_extension_frames: usize,
    #[serde(default = "default_tsume_accel_threshold")]
    pub tsume_accel_threshold: f64,
    #[serde(default)]
    pub save_keypoints: bool,
    #[serde(default = "default_min_valid_keypoints")]
    pub min_valid_keypoints: usize,
}

impl Default for RetimeConfig {
    fn default() -> Self {
        Self {
            threshold_high: default_threshold_high(),
            threshold_low: default_threshold_low(),
            hysteresis_margin: default_hysteresis_margin(),
            min_duration: default_min_duration(),
            smoothing_method: SmoothingMethod::default(),
            smoothing_alpha: default_smoothing_alpha(),
            smoothing_window: default_smoothing_window(),
            motion_weights: MotionWeights::default(),
            enable_tame_tsume: false,
            tame_extension_frames: default_tame_extension_frames(),
            tsume_accel_threshold: default_tsume_accel_threshold(),
            save_keypoints: false,
            min_valid_keypoints: default_min_valid_keypoints(),
        }
    }
}

impl RetimeConfig {
    /// Parse from the raw `--config` JSON string, warning on unrecognized
    /// top-level keys rather than rejecting them outright (spec.md §9:
    /// "Unknown keys should be a warning, not silent").
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let value: serde_json::Value = serde_json::from_str(raw)?;
        warn_on_unknown_keys(&value);
        validate_smoothing_method(&value)?;
        let config: Self = serde_json::from_value(value)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.to_owned(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    /// Validate the invariants the spec nails down: weights sum to 1.0
    /// within tolerance, and `threshold_high > threshold_low`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let sum = self.motion_weights.sum();
        if (sum - 1.0).abs() > 0.01 {
            return Err(ConfigError::WeightsDoNotSumToOne { sum });
        }
        if self.threshold_high <= self.threshold_low {
            return Err(ConfigError::ThresholdOrder {
                threshold_high: self.threshold_high,
                threshold_low: self.threshold_low,
            });
        }
        Ok(())
    }
}

/// Checked ahead of the typed `serde_json::from_value` pass: a bad
/// `smoothing_method` string would otherwise surface as an opaque
/// `ConfigError::Json` from the enum deserializer rather than the named
/// `UnknownSmoothingMethod` variant.
fn validate_smoothing_method(value: &serde_json::Value) -> Result<(), ConfigError> {
    let Some(obj) = value.as_object() else {
        return Ok(());
    };
    let Some(raw) = obj.get("smoothing_method") else {
        return Ok(());
    };
    let Some(s) = raw.as_str() else {
        return Ok(());
    };
    if s != "ema" && s != "window" {
        return Err(ConfigError::UnknownSmoothingMethod(s.to_string()));
    }
    Ok(())
}

fn warn_on_unknown_keys(value: &serde_json::Value) {
    let Some(obj) = value.as_object() else {
        return;
    };
    let known: HashSet<&str> = KNOWN_KEYS.iter().copied().collect();
    for key in obj.keys() {
        if !known.contains(key.as_str()) {
            tracing::warn!(key, "unrecognized config key, ignoring");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let cfg = RetimeConfig::default();
        assert!((cfg.threshold_high - 0.60).abs() < 1e-9);
        assert!((cfg.threshold_low - 0.35).abs() < 1e-9);
        assert!((cfg.hysteresis_margin - 0.05).abs() < 1e-9);
        assert!((cfg.min_duration - 0.08).abs() < 1e-9);
        assert_eq!(cfg.smoothing_method, SmoothingMethod::Ema);
        assert!((cfg.motion_weights.sum() - 1.0).abs() < 0.01);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn rejects_weights_that_do_not_sum_to_one() {
        let raw = r#"{"motion_weights":{"displacement":0.3,"velocity":0.3,"acceleration":0.3,"direction_change":0.3,"pose_change":0.3}}"#;
        let err = RetimeConfig::from_json_str(raw).unwrap_err();
        assert!(matches!(err, ConfigError::WeightsDoNotSumToOne { .. }));
    }

    #[test]
    fn rejects_swapped_thresholds() {
        let raw = r#"{"threshold_high":0.2,"threshold_low":0.5}"#;
        let err = RetimeConfig::from_json_str(raw).unwrap_err();
        assert!(matches!(err, ConfigError::ThresholdOrder { .. }));
    }

    #[test]
    fn parses_partial_overrides() {
        let raw = r#"{"min_duration":0.1,"enable_tame_tsume":true}"#;
        let cfg = RetimeConfig::from_json_str(raw).unwrap();
        assert!((cfg.min_duration - 0.1).abs() < 1e-9);
        assert!(cfg.enable_tame_tsume);
        assert!((cfg.threshold_high - 0.60).abs() < 1e-9);
    }

    #[test]
    fn unknown_keys_do_not_fail_parsing() {
        let raw = r#"{"bogus_key": 42, "min_duration": 0.09}"#;
        let cfg = RetimeConfig::from_json_str(raw).unwrap();
        assert!((cfg.min_duration - 0.09).abs() < 1e-9);
    }

    #[test]
    fn rejects_unknown_smoothing_method_with_named_variant() {
        let raw = r#"{"smoothing_method":"gaussian"}"#;
        let err = RetimeConfig::from_json_str(raw).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::UnknownSmoothingMethod(ref s) if s == "gaussian"
        ));
    }

    #[test]
    fn accepts_window_smoothing_method() {
        let raw = r#"{"smoothing_method":"window"}"#;
        let cfg = RetimeConfig::from_json_str(raw).unwrap();
        assert_eq!(cfg.smoothing_method, SmoothingMethod::Window);
    }
}
