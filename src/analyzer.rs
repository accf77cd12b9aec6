//! Session analysis
//!
//! Runs validation and metrics for each session and produces a per-session
//! summary with an interval breakdown. One summary per input, even when the
//! session is unusable.

use crate::config::AnalysisConfig;
use crate::config::SessionAnalyzerConfig;
use crate::metrics::MetricsCalculator;
use crate::stats;
use crate::types::{DataQualityReport, SwimmingMetrics, SwimmingSession, VenueType};
use crate::validator::DataValidator;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Pace of a single interval
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntervalPace {
    pub index: u32,
    pub pace_per_100m: f64,
}

/// Interval whose pace strays from the session mean
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntervalDeviation {
    pub index: u32,
    pub pace_per_100m: f64,
    /// Signed distance from the mean, in standard deviations (positive = slower)
    pub deviation_std_devs: f64,
}

/// Fastest, slowest and outlying intervals of a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntervalBreakdown {
    pub fastest: IntervalPace,
    pub slowest: IntervalPace,
    pub mean_pace_per_100m: f64,
    pub std_dev_pace: f64,
    pub inconsistent: Vec<IntervalDeviation>,
}

/// Per-session result: quality always, metrics when usable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub start_time: Option<DateTime<Utc>>,
    pub venue: VenueType,
    pub total_distance_meters: Option<f64>,
    pub total_duration_sec: Option<f64>,
    pub max_hr_bpm: Option<f64>,
    pub quality: DataQualityReport,
    pub metrics: Option<SwimmingMetrics>,
    pub breakdown: Option<IntervalBreakdown>,
}

impl SessionSummary {
    pub fn is_usable(&self) -> bool {
        self.metrics.is_some()
    }
}

/// Validates, measures and summarizes sessions
#[derive(Debug, Clone, Default)]
pub struct SessionAnalyzer {
    validator: DataValidator,
    calculator: MetricsCalculator,
    config: SessionAnalyzerConfig,
}

impl SessionAnalyzer {
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            validator: DataValidator::new(config.validator.clone()),
            calculator: MetricsCalculator::new(config.metrics.clone()),
            config: config.session.clone(),
        }
    }

    pub fn validator(&self) -> &DataValidator {
        &self.validator
    }

    /// Summarize one session
    pub fn analyze(&self, session: &SwimmingSession) -> SessionSummary {
        let quality = self.validator.validate(session);

        let metrics = match self.calculator.compute(session, &quality) {
            Ok(metrics) => Some(metrics),
            Err(e) => {
                warn!(session_id = session.session_id(), error = %e, "session excluded from metrics");
                None
            }
        };
        let breakdown = metrics
            .as_ref()
            .and_then(|m| self.breakdown(m));

        SessionSummary {
            session_id: session.session_id().to_string(),
            start_time: session.start_time(),
            venue: session.venue(),
            total_distance_meters: session.total_distance_meters(),
            total_duration_sec: session.total_duration_sec(),
            max_hr_bpm: session.max_hr_bpm(),
            quality,
            metrics,
            breakdown,
        }
    }

    /// Summarize many sessions, in input order
    pub fn analyze_batch(&self, sessions: &[SwimmingSession]) -> Vec<SessionSummary> {
        let summaries: Vec<SessionSummary> = sessions.iter().map(|s| self.analyze(s)).collect();
        debug!(
            sessions = summaries.len(),
            usable = summaries.iter().filter(|s| s.is_usable()).count(),
            "analyzed session batch"
        );
        summaries
    }

    fn breakdown(&self, metrics: &SwimmingMetrics) -> Option<IntervalBreakdown> {
        let paced: Vec<IntervalPace> = metrics
            .interval_metrics
            .iter()
            .filter_map(|m| {
                m.pace_per_100m.map(|pace| IntervalPace {
                    index: m.index,
                    pace_per_100m: pace,
                })
            })
            .collect();

        // Ties keep the earliest interval
        let fastest = *paced
            .iter()
            .reduce(|best, p| if p.pace_per_100m < best.pace_per_100m { p } else { best })?;
        let slowest = *paced
            .iter()
            .reduce(|worst, p| if p.pace_per_100m > worst.pace_per_100m { p } else { worst })?;

        let paces: Vec<f64> = paced.iter().map(|p| p.pace_per_100m).collect();
        let mean = stats::mean(&paces)?;
        let std_dev = stats::std_dev(&paces)?;

        let inconsistent = if std_dev > stats::EPSILON {
            let limit = self.config.inconsistency_std_devs;
            paced
                .iter()
                .map(|p| IntervalDeviation {
                    index: p.index,
                    pace_per_100m: p.pace_per_100m,
                    deviation_std_devs: (p.pace_per_100m - mean) / std_dev,
                })
                .filter(|d| d.deviation_std_devs.abs() > limit)
                .collect()
        } else {
            Vec::new()
        };

        Some(IntervalBreakdown {
            fastest,
            slowest,
            mean_pace_per_100m: mean,
            std_dev_pace: std_dev,
            inconsistent,
        })
    }
}
