//! Analysis configuration
//!
//! Every tolerance, weight and threshold used by the pipeline lives here and is
//! passed explicitly into each stage. All structs deserialize with defaults, so a
//! partial JSON document only needs the keys it overrides.

use crate::error::ComputeError;
use serde::{Deserialize, Serialize};

/// Default pool length used as the SWOLF reference distance (meters)
pub const DEFAULT_POOL_LENGTH: f64 = 25.0;

/// Default rolling window for anomaly detection (sessions)
pub const DEFAULT_ANOMALY_WINDOW: usize = 5;

/// Relative tolerance with an absolute floor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tolerance {
    /// Fraction of the reference total (0.01 = 1%)
    pub relative: f64,
    /// Minimum allowed difference in the reference unit
    pub minimum: f64,
}

impl Tolerance {
    pub const fn new(relative: f64, minimum: f64) -> Self {
        Self { relative, minimum }
    }

    /// Allowed absolute difference for a given total
    pub fn allowed(&self, total: f64) -> f64 {
        (self.relative * total.abs()).max(self.minimum)
    }

    /// Whether `actual` is within tolerance of `total`
    pub fn accepts(&self, actual: f64, total: f64) -> bool {
        (actual - total).abs() <= self.allowed(total)
    }
}

impl Default for Tolerance {
    fn default() -> Self {
        Self::new(0.01, 1.0)
    }
}

/// Structural checks applied when a session is constructed
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Interval distance sum vs. session total
    pub distance_tolerance: Tolerance,
}

/// Score deduction per issue severity
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IssueWeights {
    pub warning: f64,
    pub error: f64,
}

impl Default for IssueWeights {
    fn default() -> Self {
        Self {
            warning: 0.05,
            error: 0.2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    /// Interval distance sum vs. session total distance
    pub distance_tolerance: Tolerance,
    /// Interval duration sum vs. session total duration (seconds)
    pub duration_tolerance: Tolerance,
    pub weights: IssueWeights,
    /// Anything faster than this (seconds per 100 m) is not humanly possible
    pub min_pace_per_100m: f64,
    /// Anything slower than this (seconds per 100 m) is treated as a stall
    pub max_pace_per_100m: f64,
    pub min_heart_rate: f64,
    pub max_heart_rate: f64,
    /// Consecutive identical readings before a sensor is considered frozen
    pub dropout_run_length: usize,
    /// Non-blocking sessions scoring below this are usable with caveats
    pub caveat_score_threshold: f64,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            distance_tolerance: Tolerance::default(),
            duration_tolerance: Tolerance::default(),
            weights: IssueWeights::default(),
            min_pace_per_100m: 45.0,
            max_pace_per_100m: 600.0,
            min_heart_rate: 30.0,
            max_heart_rate: 220.0,
            dropout_run_length: 4,
            caveat_score_threshold: 0.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// SWOLF reference distance, normally one pool length (meters)
    pub pool_length: f64,
    /// How far an interval may differ from the reference and still count
    pub length_tolerance: f64,
    /// Average device SWOLF samples when no interval matches the reference
    pub use_device_swolf_fallback: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            pool_length: DEFAULT_POOL_LENGTH,
            length_tolerance: 0.5,
            use_device_swolf_fallback: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionAnalyzerConfig {
    /// Intervals further than this many standard deviations from the session
    /// mean pace are reported as inconsistent
    pub inconsistency_std_devs: f64,
}

impl Default for SessionAnalyzerConfig {
    fn default() -> Self {
        Self {
            inconsistency_std_devs: 1.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendConfig {
    /// Number of prior sessions forming the anomaly baseline
    pub anomaly_window: usize,
    /// Deviation (in standard deviations) that marks an anomaly
    pub anomaly_std_devs: f64,
    /// Smallest baseline spread, as a fraction of the baseline mean
    pub min_relative_spread: f64,
    /// Relative change over the window required to call a trend (0.02 = 2%)
    pub significance_threshold: f64,
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            anomaly_window: DEFAULT_ANOMALY_WINDOW,
            anomaly_std_devs: 2.0,
            min_relative_spread: 0.01,
            significance_threshold: 0.02,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommendationConfig {
    /// Pace coefficient of variation considered high variance
    pub high_variance_cv: f64,
    /// Meters per stroke below which technique work is suggested
    pub low_stroke_efficiency: f64,
    /// Longest acceptable break between sessions (days)
    pub max_gap_days: f64,
    pub min_sessions_per_week: f64,
    pub max_sessions_per_week: f64,
}

impl Default for RecommendationConfig {
    fn default() -> Self {
        Self {
            high_variance_cv: 0.08,
            low_stroke_efficiency: 1.0,
            max_gap_days: 7.0,
            min_sessions_per_week: 2.0,
            max_sessions_per_week: 6.0,
        }
    }
}

/// Full pipeline configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub model: ModelConfig,
    pub validator: ValidatorConfig,
    pub metrics: MetricsConfig,
    pub session: SessionAnalyzerConfig,
    pub trend: TrendConfig,
    pub recommendations: RecommendationConfig,
}

impl AnalysisConfig {
    /// Parse and validate a JSON configuration document
    pub fn from_json(json: &str) -> Result<Self, ComputeError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Reject values no stage can work with
    pub fn validate(&self) -> Result<(), ComputeError> {
        for (name, tolerance) in [
            ("model.distance_tolerance", &self.model.distance_tolerance),
            ("validator.distance_tolerance", &self.validator.distance_tolerance),
            ("validator.duration_tolerance", &self.validator.duration_tolerance),
        ] {
            if !(tolerance.relative >= 0.0 && tolerance.minimum >= 0.0) {
                return Err(invalid(format!("{name} must be non-negative")));
            }
        }

        let v = &self.validator;
        if !(v.weights.warning >= 0.0 && v.weights.error >= 0.0) {
            return Err(invalid("issue weights must be non-negative"));
        }
        if !(v.min_pace_per_100m > 0.0 && v.min_pace_per_100m < v.max_pace_per_100m) {
            return Err(invalid("pace band must satisfy 0 < min < max"));
        }
        if !(v.min_heart_rate < v.max_heart_rate) {
            return Err(invalid("heart rate band must satisfy min < max"));
        }
        if v.dropout_run_length < 2 {
            return Err(invalid("dropout_run_length must be at least 2"));
        }
        if !(0.0..=1.0).contains(&v.caveat_score_threshold) {
            return Err(invalid("caveat_score_threshold must be within 0-1"));
        }

        if !(self.metrics.pool_length > 0.0) {
            return Err(invalid("pool_length must be positive"));
        }
        if !(self.metrics.length_tolerance >= 0.0) {
            return Err(invalid("length_tolerance must be non-negative"));
        }
        if !(self.session.inconsistency_std_devs > 0.0) {
            return Err(invalid("inconsistency_std_devs must be positive"));
        }

        let t = &self.trend;
        if t.anomaly_window < 2 {
            return Err(invalid("anomaly_window must be at least 2"));
        }
        if !(t.anomaly_std_devs > 0.0) {
            return Err(invalid("anomaly_std_devs must be positive"));
        }
        if !(t.min_relative_spread > 0.0) {
            return Err(invalid("min_relative_spread must be positive"));
        }
        if !(t.significance_threshold >= 0.0) {
            return Err(invalid("significance_threshold must be non-negative"));
        }

        let r = &self.recommendations;
        if r.min_sessions_per_week > r.max_sessions_per_week {
            return Err(invalid(
                "min_sessions_per_week must not exceed max_sessions_per_week",
            ));
        }

        Ok(())
    }
}

fn invalid(message: impl Into<String>) -> ComputeError {
    ComputeError::InvalidConfig(message.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tolerance_floor() {
        let tolerance = Tolerance::default();
        // 1% of 50 m is 0.5 m, floor of 1 m wins
        assert!((tolerance.allowed(50.0) - 1.0).abs() < 1e-9);
        assert!((tolerance.allowed(1000.0) - 10.0).abs() < 1e-9);
        assert!(tolerance.accepts(1009.0, 1000.0));
        assert!(!tolerance.accepts(1011.0, 1000.0));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = AnalysisConfig::from_json(r#"{"metrics": {"pool_length": 50.0}}"#).unwrap();
        assert_eq!(config.metrics.pool_length, 50.0);
        assert_eq!(config.trend.anomaly_window, DEFAULT_ANOMALY_WINDOW);
        assert_eq!(config.validator.weights, IssueWeights::default());
    }

    #[test]
    fn test_rejects_inverted_pace_band() {
        let json = r#"{"validator": {"min_pace_per_100m": 120.0, "max_pace_per_100m": 60.0}}"#;
        assert!(matches!(
            AnalysisConfig::from_json(json),
            Err(ComputeError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_rejects_window_without_spread() {
        let mut config = AnalysisConfig::default();
        config.trend.anomaly_window = 0;
        assert!(config.validate().is_err());
        // A single prior session has no standard deviation
        config.trend.anomaly_window = 1;
        assert!(config.validate().is_err());
        config.trend.anomaly_window = 2;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_zero_spread_floor() {
        let mut config = AnalysisConfig::default();
        config.trend.min_relative_spread = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_round_trip_default() {
        let json = AnalysisConfig::default().to_json().unwrap();
        let parsed = AnalysisConfig::from_json(&json).unwrap();
        assert_eq!(parsed.metrics.pool_length, DEFAULT_POOL_LENGTH);
    }
}
