//! Pipeline orchestration
//!
//! This module provides the public API for Synheart Swim.
//! It runs the full pipeline from raw session JSON to an encoded analysis report.

use crate::analyzer::{SessionAnalyzer, SessionSummary};
use crate::config::AnalysisConfig;
use crate::encoder::ReportEncoder;
use crate::error::ComputeError;
use crate::recommend::{Recommendation, RecommendationEngine};
use crate::schema::{SessionRecord, SessionRecordAdapter};
use crate::trend::{TrendAnalyzer, TrendReport};
use crate::types::{DataQualityReport, SwimmingMetrics, SwimmingSession};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Everything computed for one batch of sessions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// One per input session, in input order
    pub summaries: Vec<SessionSummary>,
    pub trend: TrendReport,
    pub recommendations: Vec<Recommendation>,
}

impl AnalysisReport {
    /// Metrics of the most recent usable session
    pub fn latest_metrics(&self) -> Option<&SwimmingMetrics> {
        latest_metrics(&self.summaries, &self.trend)
    }
}

/// Convert raw session JSON (array or NDJSON) into an encoded analysis report.
///
/// # Arguments
/// * `raw_json` - Session records as a JSON array or newline-delimited JSON
/// * `config` - Analysis configuration; validated before use
///
/// # Returns
/// Pretty-printed JSON envelope with summaries, trends and recommendations
///
/// # Example
/// ```ignore
/// let report_json = sessions_to_analysis_json(sessions_json, &AnalysisConfig::default())?;
/// ```
pub fn sessions_to_analysis_json(
    raw_json: String,
    config: &AnalysisConfig,
) -> Result<String, ComputeError> {
    SwimAnalyzer::new(config.clone())?.analyze_json(&raw_json)
}

/// Configured pipeline: validate, measure, trend, recommend.
///
/// Holds no state between calls; the same input always yields the same report.
pub struct SwimAnalyzer {
    config: AnalysisConfig,
    sessions: SessionAnalyzer,
    trends: TrendAnalyzer,
    recommendations: RecommendationEngine,
    encoder: ReportEncoder,
}

impl Default for SwimAnalyzer {
    fn default() -> Self {
        Self::build(AnalysisConfig::default())
    }
}

impl SwimAnalyzer {
    /// Create an analyzer, rejecting invalid configuration
    pub fn new(config: AnalysisConfig) -> Result<Self, ComputeError> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: AnalysisConfig) -> Self {
        Self {
            sessions: SessionAnalyzer::new(&config),
            trends: TrendAnalyzer::new(config.trend.clone()),
            recommendations: RecommendationEngine::new(config.recommendations.clone()),
            encoder: ReportEncoder::new(),
            config,
        }
    }

    /// Use a fixed encoder instance ID
    pub fn with_instance_id(mut self, instance_id: String) -> Self {
        self.encoder = ReportEncoder::with_instance_id(instance_id);
        self
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Analyze constructed sessions
    pub fn analyze(&self, sessions: &[SwimmingSession]) -> AnalysisReport {
        let summaries = self.sessions.analyze_batch(sessions);
        let trend = self.trends.analyze_trend(&summaries);
        let recommendations = self
            .recommendations
            .recommend(&trend, latest_metrics(&summaries, &trend));

        info!(
            sessions = summaries.len(),
            usable = trend.usable_count,
            recommendations = recommendations.len(),
            "analysis complete"
        );

        AnalysisReport {
            summaries,
            trend,
            recommendations,
        }
    }

    /// Construct sessions from raw records, then analyze them.
    ///
    /// Fails on the first structurally invalid record.
    pub fn analyze_records(
        &self,
        records: Vec<SessionRecord>,
    ) -> Result<AnalysisReport, ComputeError> {
        let sessions = SessionRecordAdapter::to_sessions(records, &self.config.model)?;
        Ok(self.analyze(&sessions))
    }

    /// Parse, analyze and encode raw JSON input
    pub fn analyze_json(&self, raw_json: &str) -> Result<String, ComputeError> {
        let records = SessionRecordAdapter::parse_auto(raw_json)?;
        let report = self.analyze_records(records)?;
        self.encoder.encode_to_json(report)
    }

    /// Quality reports for raw records, without constructing sessions
    pub fn validate_records(&self, records: &[SessionRecord]) -> Vec<DataQualityReport> {
        records
            .iter()
            .map(|r| self.sessions.validator().validate_record(r))
            .collect()
    }
}

fn latest_metrics<'a>(
    summaries: &'a [SessionSummary],
    trend: &TrendReport,
) -> Option<&'a SwimmingMetrics> {
    let latest = trend.latest_session_id.as_deref()?;
    summaries
        .iter()
        .rev()
        .find(|s| s.session_id == latest && s.is_usable())
        .and_then(|s| s.metrics.as_ref())
}
