//! Output encoding
//!
//! This module wraps analysis results in a versioned envelope carrying producer
//! metadata, and flattens them into rows for tabular export.

use crate::analyzer::SessionSummary;
use crate::error::ComputeError;
use crate::metrics::format_pace;
use crate::pipeline::AnalysisReport;
use crate::recommend::Recommendation;
use crate::schema::SCHEMA_VERSION;
use crate::trend::{MetricTrend, TrendReport};
use crate::{PRODUCER_NAME, SWIM_VERSION};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Current report schema version
pub const REPORT_VERSION: &str = "1.0.0";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportProducer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// Versioned wrapper around an [`AnalysisReport`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisEnvelope {
    pub report_version: String,
    /// Input record schema the report was computed from
    pub input_schema: String,
    pub producer: ReportProducer,
    pub computed_at_utc: String,
    pub report: AnalysisReport,
}

/// Encoder for analysis envelopes
pub struct ReportEncoder {
    instance_id: String,
}

impl Default for ReportEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportEncoder {
    /// Create a new encoder with a unique instance ID
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create an encoder with a specific instance ID
    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    pub fn encode(&self, report: AnalysisReport) -> AnalysisEnvelope {
        AnalysisEnvelope {
            report_version: REPORT_VERSION.to_string(),
            input_schema: SCHEMA_VERSION.to_string(),
            producer: ReportProducer {
                name: PRODUCER_NAME.to_string(),
                version: SWIM_VERSION.to_string(),
                instance_id: self.instance_id.clone(),
            },
            computed_at_utc: Utc::now().to_rfc3339(),
            report,
        }
    }

    /// Encode to a pretty-printed JSON string
    pub fn encode_to_json(&self, report: AnalysisReport) -> Result<String, ComputeError> {
        let envelope = self.encode(report);
        serde_json::to_string_pretty(&envelope).map_err(ComputeError::JsonError)
    }
}

/// One session flattened for tabular export
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionRow {
    pub session_id: String,
    pub date: Option<String>,
    pub venue: String,
    pub verdict: String,
    pub quality_score: f64,
    pub issue_count: usize,
    pub distance_meters: Option<f64>,
    pub duration_sec: Option<f64>,
    pub pace_per_100m: Option<f64>,
    pub pace_mmss: Option<String>,
    pub best_pace_per_100m: Option<f64>,
    pub swolf: Option<f64>,
    pub stroke_efficiency: Option<f64>,
    pub pace_cv: Option<f64>,
    pub heart_rate_efficiency: Option<f64>,
    pub average_hr_bpm: Option<f64>,
    pub max_hr_bpm: Option<f64>,
    pub strokes_per_length: Option<f64>,
    pub stroke_rate_per_min: Option<f64>,
}

impl SessionRow {
    /// Column names, in field order
    pub const HEADERS: [&'static str; 19] = [
        "session_id",
        "date",
        "venue",
        "verdict",
        "quality_score",
        "issue_count",
        "distance_meters",
        "duration_sec",
        "pace_per_100m",
        "pace_mmss",
        "best_pace_per_100m",
        "swolf",
        "stroke_efficiency",
        "pace_cv",
        "heart_rate_efficiency",
        "average_hr_bpm",
        "max_hr_bpm",
        "strokes_per_length",
        "stroke_rate_per_min",
    ];

    pub fn from_summary(summary: &SessionSummary) -> Self {
        let metrics = summary.metrics.as_ref();
        let pace = metrics.and_then(|m| m.average_pace_per_100m);

        Self {
            session_id: summary.session_id.clone(),
            date: summary
                .start_time
                .map(|t| t.date_naive().format("%Y-%m-%d").to_string()),
            venue: summary.venue.as_str().to_string(),
            verdict: summary.quality.verdict.as_str().to_string(),
            quality_score: summary.quality.score,
            issue_count: summary.quality.issues.len(),
            distance_meters: summary.total_distance_meters,
            duration_sec: summary.total_duration_sec,
            pace_per_100m: pace,
            pace_mmss: pace.and_then(format_pace),
            best_pace_per_100m: metrics.and_then(|m| m.best_pace_per_100m),
            swolf: metrics.and_then(|m| m.average_swolf),
            stroke_efficiency: metrics.and_then(|m| m.stroke_efficiency),
            pace_cv: metrics.and_then(|m| m.pace_consistency),
            heart_rate_efficiency: metrics.and_then(|m| m.heart_rate_efficiency),
            average_hr_bpm: metrics.and_then(|m| m.average_hr_bpm),
            max_hr_bpm: summary.max_hr_bpm,
            strokes_per_length: metrics.and_then(|m| m.strokes_per_length),
            stroke_rate_per_min: metrics.and_then(|m| m.stroke_rate_per_min),
        }
    }
}

/// One fitted metric trend
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendRow {
    pub metric: String,
    pub direction: String,
    pub slope_per_day: f64,
    pub relative_change: f64,
    pub r_squared: f64,
    pub sample_count: usize,
}

impl TrendRow {
    /// Rows for every metric with a fitted trend
    pub fn from_report(report: &TrendReport) -> Vec<Self> {
        report.trends().map(Self::from_trend).collect()
    }

    fn from_trend(trend: &MetricTrend) -> Self {
        Self {
            metric: trend.metric.as_str().to_string(),
            direction: trend.direction.as_str().to_string(),
            slope_per_day: trend.slope_per_day,
            relative_change: trend.relative_change,
            r_squared: trend.r_squared,
            sample_count: trend.sample_count,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecommendationRow {
    /// Position in the recommendation list, starting at 1
    pub rank: usize,
    pub rule: String,
    pub category: String,
    pub priority: String,
    pub message: String,
    /// `metric=observed (threshold)` pairs joined by `; `
    pub evidence: String,
}

impl RecommendationRow {
    pub fn from_recommendations(recommendations: &[Recommendation]) -> Vec<Self> {
        recommendations
            .iter()
            .enumerate()
            .map(|(i, r)| Self {
                rank: i + 1,
                rule: r.rule.as_str().to_string(),
                category: r.category.as_str().to_string(),
                priority: r.priority.as_str().to_string(),
                message: r.message.clone(),
                evidence: r
                    .evidence
                    .iter()
                    .map(|e| format!("{}={:.3} ({:.3})", e.metric, e.observed, e.threshold))
                    .collect::<Vec<_>>()
                    .join("; "),
            })
            .collect()
    }
}
