//! Training recommendations
//!
//! A fixed, ordered rule table maps a trend report and the most recent session's
//! metrics to recommendations. Every rule that applies fires, in table order, and
//! each recommendation carries the observed values that triggered it.

use crate::config::RecommendationConfig;
use crate::trend::{TrendDirection, TrendMetric, TrendReport};
use crate::types::SwimmingMetrics;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationCategory {
    Pace,
    Efficiency,
    Consistency,
    Recovery,
}

impl RecommendationCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecommendationCategory::Pace => "pace",
            RecommendationCategory::Efficiency => "efficiency",
            RecommendationCategory::Consistency => "consistency",
            RecommendationCategory::Recovery => "recovery",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationPriority {
    High,
    Medium,
    Low,
}

impl RecommendationPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecommendationPriority::High => "high",
            RecommendationPriority::Medium => "medium",
            RecommendationPriority::Low => "low",
        }
    }
}

/// Rule that produced a recommendation, in evaluation order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationRule {
    PacingDrills,
    PaceImproving,
    SwolfImproving,
    SwolfDeclining,
    LowStrokeEfficiency,
    HighPaceVariance,
    TrainingGap,
    LowFrequency,
    Overload,
    RecentSlowdown,
}

impl RecommendationRule {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecommendationRule::PacingDrills => "pacing_drills",
            RecommendationRule::PaceImproving => "pace_improving",
            RecommendationRule::SwolfImproving => "swolf_improving",
            RecommendationRule::SwolfDeclining => "swolf_declining",
            RecommendationRule::LowStrokeEfficiency => "low_stroke_efficiency",
            RecommendationRule::HighPaceVariance => "high_pace_variance",
            RecommendationRule::TrainingGap => "training_gap",
            RecommendationRule::LowFrequency => "low_frequency",
            RecommendationRule::Overload => "overload",
            RecommendationRule::RecentSlowdown => "recent_slowdown",
        }
    }
}

/// Observed value compared against a threshold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    pub metric: String,
    pub observed: f64,
    pub threshold: f64,
}

impl Evidence {
    fn new(metric: &str, observed: f64, threshold: f64) -> Self {
        Self {
            metric: metric.to_string(),
            observed,
            threshold,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub rule: RecommendationRule,
    pub category: RecommendationCategory,
    pub priority: RecommendationPriority,
    pub message: String,
    pub evidence: Vec<Evidence>,
}

/// Inputs visible to every rule
struct RuleContext<'a> {
    trend: &'a TrendReport,
    latest: Option<&'a SwimmingMetrics>,
    config: &'a RecommendationConfig,
}

impl RuleContext<'_> {
    /// Relative-change evidence when the metric moved in `direction`
    fn trend_evidence(&self, metric: TrendMetric, direction: TrendDirection) -> Option<Evidence> {
        let trend = self.trend.trend(metric)?;
        if trend.direction != direction {
            return None;
        }
        let threshold = if (direction == TrendDirection::Improving) == metric.lower_is_better() {
            -trend.significance_threshold
        } else {
            trend.significance_threshold
        };
        Some(Evidence::new(
            &format!("{}_relative_change", metric.as_str()),
            trend.relative_change,
            threshold,
        ))
    }

    fn high_pace_variance(&self) -> Option<Evidence> {
        let cv = self.latest?.pace_consistency?;
        (cv > self.config.high_variance_cv)
            .then(|| Evidence::new("pace_cv", cv, self.config.high_variance_cv))
    }
}

type Rule = fn(&RuleContext<'_>) -> Option<Recommendation>;

/// Evaluation order is part of the output contract
const RULES: [Rule; 10] = [
    pacing_drills,
    pace_improving,
    swolf_improving,
    swolf_declining,
    low_stroke_efficiency,
    high_pace_variance,
    training_gap,
    low_frequency,
    overload,
    recent_slowdown,
];

#[derive(Debug, Clone, Default)]
pub struct RecommendationEngine {
    config: RecommendationConfig,
}

impl RecommendationEngine {
    pub fn new(config: RecommendationConfig) -> Self {
        Self { config }
    }

    /// Evaluate every rule against the trend and the latest usable session.
    ///
    /// Identical inputs always give identical output, in the same order.
    pub fn recommend(
        &self,
        trend: &TrendReport,
        latest: Option<&SwimmingMetrics>,
    ) -> Vec<Recommendation> {
        let context = RuleContext {
            trend,
            latest,
            config: &self.config,
        };
        let recommendations: Vec<Recommendation> =
            RULES.iter().filter_map(|rule| rule(&context)).collect();

        debug!(count = recommendations.len(), "generated recommendations");
        recommendations
    }
}

fn recommendation(
    rule: RecommendationRule,
    category: RecommendationCategory,
    priority: RecommendationPriority,
    message: &str,
    evidence: Vec<Evidence>,
) -> Recommendation {
    Recommendation {
        rule,
        category,
        priority,
        message: message.to_string(),
        evidence,
    }
}

fn pacing_drills(ctx: &RuleContext<'_>) -> Option<Recommendation> {
    let declining = ctx.trend_evidence(TrendMetric::Pace, TrendDirection::Declining)?;
    let variance = ctx.high_pace_variance()?;
    Some(recommendation(
        RecommendationRule::PacingDrills,
        RecommendationCategory::Pace,
        RecommendationPriority::High,
        "Pace is slowing and uneven across intervals. Add pacing drills such as \
         negative-split or descending sets.",
        vec![declining, variance],
    ))
}

fn pace_improving(ctx: &RuleContext<'_>) -> Option<Recommendation> {
    let evidence = ctx.trend_evidence(TrendMetric::Pace, TrendDirection::Improving)?;
    Some(recommendation(
        RecommendationRule::PaceImproving,
        RecommendationCategory::Pace,
        RecommendationPriority::Low,
        "Pace is improving. Keep the current training structure and consider \
         a slightly longer main set.",
        vec![evidence],
    ))
}

fn swolf_improving(ctx: &RuleContext<'_>) -> Option<Recommendation> {
    let evidence = ctx.trend_evidence(TrendMetric::Swolf, TrendDirection::Improving)?;
    Some(recommendation(
        RecommendationRule::SwolfImproving,
        RecommendationCategory::Efficiency,
        RecommendationPriority::Low,
        "SWOLF is falling, so each length costs less. Technique work is paying off.",
        vec![evidence],
    ))
}

fn swolf_declining(ctx: &RuleContext<'_>) -> Option<Recommendation> {
    let evidence = ctx.trend_evidence(TrendMetric::Swolf, TrendDirection::Declining)?;
    Some(recommendation(
        RecommendationRule::SwolfDeclining,
        RecommendationCategory::Efficiency,
        RecommendationPriority::Medium,
        "SWOLF is rising. Focus on distance per stroke with catch-up or \
         single-arm drills.",
        vec![evidence],
    ))
}

fn low_stroke_efficiency(ctx: &RuleContext<'_>) -> Option<Recommendation> {
    let efficiency = ctx.latest?.stroke_efficiency?;
    let threshold = ctx.config.low_stroke_efficiency;
    (efficiency < threshold).then(|| {
        recommendation(
            RecommendationRule::LowStrokeEfficiency,
            RecommendationCategory::Efficiency,
            RecommendationPriority::Medium,
            "Distance per stroke is low. Lengthen the stroke and work on glide.",
            vec![Evidence::new("stroke_efficiency", efficiency, threshold)],
        )
    })
}

fn high_pace_variance(ctx: &RuleContext<'_>) -> Option<Recommendation> {
    let evidence = ctx.high_pace_variance()?;
    Some(recommendation(
        RecommendationRule::HighPaceVariance,
        RecommendationCategory::Consistency,
        RecommendationPriority::Medium,
        "Interval paces vary widely. Hold a steady target pace across repeats.",
        vec![evidence],
    ))
}

fn training_gap(ctx: &RuleContext<'_>) -> Option<Recommendation> {
    let gap = ctx.trend.longest_gap_days?;
    let threshold = ctx.config.max_gap_days;
    (gap > threshold).then(|| {
        recommendation(
            RecommendationRule::TrainingGap,
            RecommendationCategory::Consistency,
            RecommendationPriority::Medium,
            "There was a long break between sessions. Regular sessions hold \
             technique gains better.",
            vec![Evidence::new("longest_gap_days", gap, threshold)],
        )
    })
}

fn low_frequency(ctx: &RuleContext<'_>) -> Option<Recommendation> {
    let frequency = ctx.trend.sessions_per_week?;
    let threshold = ctx.config.min_sessions_per_week;
    (frequency < threshold).then(|| {
        recommendation(
            RecommendationRule::LowFrequency,
            RecommendationCategory::Consistency,
            RecommendationPriority::Medium,
            "Training frequency is low. Aim for more sessions per week.",
            vec![Evidence::new("sessions_per_week", frequency, threshold)],
        )
    })
}

fn overload(ctx: &RuleContext<'_>) -> Option<Recommendation> {
    let frequency = ctx.trend.sessions_per_week?;
    let threshold = ctx.config.max_sessions_per_week;
    if frequency <= threshold {
        return None;
    }
    let declining = ctx.trend_evidence(TrendMetric::Pace, TrendDirection::Declining)?;
    Some(recommendation(
        RecommendationRule::Overload,
        RecommendationCategory::Recovery,
        RecommendationPriority::High,
        "Frequent sessions with slowing pace suggest fatigue. Schedule recovery \
         days or easy swims.",
        vec![
            Evidence::new("sessions_per_week", frequency, threshold),
            declining,
        ],
    ))
}

fn recent_slowdown(ctx: &RuleContext<'_>) -> Option<Recommendation> {
    let anomaly = ctx
        .trend
        .latest_anomalies()
        .find(|a| a.metric == TrendMetric::Pace && a.value > a.baseline_mean)?;
    Some(recommendation(
        RecommendationRule::RecentSlowdown,
        RecommendationCategory::Recovery,
        RecommendationPriority::High,
        "The latest session was unusually slow for you. Check recovery, sleep \
         and illness before the next hard set.",
        vec![
            Evidence::new("pace_per_100m", anomaly.value, anomaly.baseline_mean),
            Evidence::new("pace_deviation_std_devs", anomaly.deviation_std_devs, 0.0),
        ],
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trend::{Anomaly, MetricTrend, PerformanceOverview, TrendStatus};
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn metric_trend(metric: TrendMetric, direction: TrendDirection, change: f64) -> MetricTrend {
        MetricTrend {
            metric,
            slope_per_day: change,
            relative_change: change,
            r_squared: 0.9,
            direction,
            significance_threshold: 0.02,
            sample_count: 6,
        }
    }

    fn report() -> TrendReport {
        TrendReport {
            status: TrendStatus::Ok,
            session_count: 6,
            usable_count: 6,
            time_range: None,
            pace_trend: None,
            swolf_trend: None,
            stroke_efficiency_trend: None,
            distance_trend: None,
            heart_rate_trend: None,
            strokes_per_length_trend: None,
            stroke_rate_trend: None,
            pace_consistency: Some(0.02),
            sessions_per_week: Some(3.0),
            longest_gap_days: Some(3.0),
            latest_session_id: Some("s6".to_string()),
            anomalies: Vec::new(),
            overview: PerformanceOverview::default(),
        }
    }

    fn latest(pace_cv: f64, efficiency: f64) -> SwimmingMetrics {
        SwimmingMetrics {
            session_id: "s6".to_string(),
            average_pace_per_100m: Some(120.0),
            best_pace_per_100m: Some(110.0),
            average_swolf: Some(40.0),
            swolf_intervals_used: 40,
            stroke_efficiency: Some(efficiency),
            pace_consistency: Some(pace_cv),
            heart_rate_efficiency: None,
            average_hr_bpm: None,
            strokes_per_length: Some(18.0),
            stroke_rate_per_min: Some(40.0),
            interval_metrics: Vec::new(),
            caveats: Vec::new(),
        }
    }

    fn rules(recommendations: &[Recommendation]) -> Vec<RecommendationRule> {
        recommendations.iter().map(|r| r.rule).collect()
    }

    #[test]
    fn test_quiet_history_has_no_recommendations() {
        let metrics = latest(0.02, 1.4);
        let out = RecommendationEngine::default().recommend(&report(), Some(&metrics));
        assert_eq!(out, vec![]);
    }

    #[test]
    fn test_declining_pace_with_variance_suggests_drills() {
        let mut trend = report();
        trend.pace_trend = Some(metric_trend(TrendMetric::Pace, TrendDirection::Declining, 0.05));
        let metrics = latest(0.12, 1.4);

        let out = RecommendationEngine::default().recommend(&trend, Some(&metrics));

        assert_eq!(
            rules(&out),
            vec![RecommendationRule::PacingDrills, RecommendationRule::HighPaceVariance]
        );
        let drills = &out[0];
        assert_eq!(drills.category, RecommendationCategory::Pace);
        assert_eq!(drills.evidence[0].metric, "pace_relative_change");
        assert_eq!(drills.evidence[0].observed, 0.05);
        assert_eq!(drills.evidence[1], Evidence::new("pace_cv", 0.12, 0.08));
    }

    #[test]
    fn test_declining_pace_alone_is_not_drills() {
        let mut trend = report();
        trend.pace_trend = Some(metric_trend(TrendMetric::Pace, TrendDirection::Declining, 0.05));
        let metrics = latest(0.02, 1.4);

        let out = RecommendationEngine::default().recommend(&trend, Some(&metrics));

        assert_eq!(out, vec![]);
    }

    #[test]
    fn test_improvements_and_consistency_rules_in_order() {
        let mut trend = report();
        trend.pace_trend = Some(metric_trend(TrendMetric::Pace, TrendDirection::Improving, -0.05));
        trend.swolf_trend = Some(metric_trend(TrendMetric::Swolf, TrendDirection::Improving, -0.04));
        trend.longest_gap_days = Some(12.0);
        trend.sessions_per_week = Some(1.0);
        let metrics = latest(0.02, 0.8);

        let out = RecommendationEngine::default().recommend(&trend, Some(&metrics));

        assert_eq!(
            rules(&out),
            vec![
                RecommendationRule::PaceImproving,
                RecommendationRule::SwolfImproving,
                RecommendationRule::LowStrokeEfficiency,
                RecommendationRule::TrainingGap,
                RecommendationRule::LowFrequency,
            ]
        );
        assert_eq!(out[0].evidence[0].threshold, -0.02);
    }

    #[test]
    fn test_overload_needs_declining_pace() {
        let mut trend = report();
        trend.sessions_per_week = Some(8.0);
        let metrics = latest(0.02, 1.4);
        let engine = RecommendationEngine::default();

        assert_eq!(engine.recommend(&trend, Some(&metrics)), vec![]);

        trend.pace_trend = Some(metric_trend(TrendMetric::Pace, TrendDirection::Declining, 0.03));
        let out = engine.recommend(&trend, Some(&metrics));
        assert_eq!(rules(&out), vec![RecommendationRule::Overload]);
        assert_eq!(out[0].category, RecommendationCategory::Recovery);
    }

    #[test]
    fn test_slow_latest_session_suggests_recovery() {
        let mut trend = report();
        trend.anomalies.push(Anomaly {
            session_id: "s6".to_string(),
            start_time: Utc.with_ymd_and_hms(2024, 2, 1, 7, 0, 0).unwrap(),
            metric: TrendMetric::Pace,
            value: 140.0,
            baseline_mean: 120.0,
            baseline_std_dev: 2.0,
            deviation_std_devs: 10.0,
        });

        let out = RecommendationEngine::default().recommend(&trend, None);

        assert_eq!(rules(&out), vec![RecommendationRule::RecentSlowdown]);
    }

    #[test]
    fn test_missing_latest_metrics_skips_session_rules() {
        let mut trend = report();
        trend.pace_trend = Some(metric_trend(TrendMetric::Pace, TrendDirection::Declining, 0.05));

        let out = RecommendationEngine::default().recommend(&trend, None);

        assert_eq!(out, vec![]);
    }

    #[test]
    fn test_output_is_deterministic() {
        let mut trend = report();
        trend.swolf_trend = Some(metric_trend(TrendMetric::Swolf, TrendDirection::Declining, 0.06));
        trend.longest_gap_days = Some(9.0);
        let metrics = latest(0.1, 0.9);
        let engine = RecommendationEngine::default();

        let first = engine.recommend(&trend, Some(&metrics));
        for _ in 0..5 {
            assert_eq!(engine.recommend(&trend, Some(&metrics)), first);
        }
        assert_eq!(first.len(), 4);
    }
}
