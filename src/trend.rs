//! Cross-session trend analysis
//!
//! Fits least-squares lines through per-session metrics over time, flags sessions
//! that deviate from a rolling baseline, and summarizes training frequency.
//! Sessions are ordered by start time. Metric math uses usable, dated sessions
//! only; training cadence counts every dated session, usable or not.

use crate::analyzer::SessionSummary;
use crate::config::TrendConfig;
use crate::stats::{self, EPSILON};
use crate::types::{SwimmingMetrics, VenueType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

const SECONDS_PER_DAY: f64 = 86_400.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Improving,
    Stable,
    Declining,
}

impl TrendDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrendDirection::Improving => "improving",
            TrendDirection::Stable => "stable",
            TrendDirection::Declining => "declining",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendStatus {
    Ok,
    /// Fewer than two usable sessions; only descriptive fields are populated
    InsufficientData,
}

/// Metric tracked across sessions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendMetric {
    Pace,
    Swolf,
    StrokeEfficiency,
    /// Session distance (meters)
    Distance,
    /// Session average heart rate (bpm)
    HeartRate,
    StrokesPerLength,
    /// Strokes per minute of swimming
    StrokeRate,
}

impl TrendMetric {
    /// Every fitted metric, in report order
    pub const ALL: [TrendMetric; 7] = [
        TrendMetric::Pace,
        TrendMetric::Swolf,
        TrendMetric::StrokeEfficiency,
        TrendMetric::Distance,
        TrendMetric::HeartRate,
        TrendMetric::StrokesPerLength,
        TrendMetric::StrokeRate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TrendMetric::Pace => "pace",
            TrendMetric::Swolf => "swolf",
            TrendMetric::StrokeEfficiency => "stroke_efficiency",
            TrendMetric::Distance => "distance",
            TrendMetric::HeartRate => "heart_rate",
            TrendMetric::StrokesPerLength => "strokes_per_length",
            TrendMetric::StrokeRate => "stroke_rate",
        }
    }

    /// Time, heart rate and stroke counts improve as they fall; distance and
    /// distance per stroke as they rise
    pub fn lower_is_better(&self) -> bool {
        !matches!(self, TrendMetric::StrokeEfficiency | TrendMetric::Distance)
    }

    fn value(&self, summary: &SessionSummary, metrics: &SwimmingMetrics) -> Option<f64> {
        match self {
            TrendMetric::Pace => metrics.average_pace_per_100m,
            TrendMetric::Swolf => metrics.average_swolf,
            TrendMetric::StrokeEfficiency => metrics.stroke_efficiency,
            TrendMetric::Distance => summary.total_distance_meters,
            TrendMetric::HeartRate => metrics.average_hr_bpm,
            TrendMetric::StrokesPerLength => metrics.strokes_per_length,
            TrendMetric::StrokeRate => metrics.stroke_rate_per_min,
        }
    }
}

/// Fitted trend for one metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricTrend {
    pub metric: TrendMetric,
    /// Change per day in the metric's unit
    pub slope_per_day: f64,
    /// Fitted change from first to last session, relative to the fitted start
    pub relative_change: f64,
    pub r_squared: f64,
    pub direction: TrendDirection,
    /// Relative change needed to leave `Stable`
    pub significance_threshold: f64,
    pub sample_count: usize,
}

/// Session that departs from its rolling baseline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anomaly {
    pub session_id: String,
    pub start_time: DateTime<Utc>,
    pub metric: TrendMetric,
    pub value: f64,
    pub baseline_mean: f64,
    pub baseline_std_dev: f64,
    /// Signed deviation in baseline standard deviations. The spread is floored
    /// at `min_relative_spread` of the baseline mean, so a flat baseline still
    /// has a scale.
    pub deviation_std_devs: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub span_days: f64,
}

/// Aggregate figures across the usable sessions of a history
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceOverview {
    pub usable_sessions: usize,
    pub pool_sessions: usize,
    pub open_water_sessions: usize,
    pub total_distance_meters: f64,
    pub total_duration_sec: f64,
    pub mean_pace_per_100m: Option<f64>,
    pub best_pace_per_100m: Option<f64>,
    pub mean_swolf: Option<f64>,
    pub mean_hr_bpm: Option<f64>,
    pub max_hr_bpm: Option<f64>,
}

/// Trend report over a session history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendReport {
    pub status: TrendStatus,
    /// All summaries supplied
    pub session_count: usize,
    /// Summaries with metrics and a start time
    pub usable_count: usize,
    /// Span of every dated session, usable or not
    pub time_range: Option<TimeRange>,
    pub pace_trend: Option<MetricTrend>,
    pub swolf_trend: Option<MetricTrend>,
    pub stroke_efficiency_trend: Option<MetricTrend>,
    pub distance_trend: Option<MetricTrend>,
    pub heart_rate_trend: Option<MetricTrend>,
    pub strokes_per_length_trend: Option<MetricTrend>,
    pub stroke_rate_trend: Option<MetricTrend>,
    /// Coefficient of variation of session paces
    pub pace_consistency: Option<f64>,
    /// Over every dated session, usable or not
    pub sessions_per_week: Option<f64>,
    /// Longest break between consecutive dated sessions
    pub longest_gap_days: Option<f64>,
    pub latest_session_id: Option<String>,
    pub anomalies: Vec<Anomaly>,
    pub overview: PerformanceOverview,
}

impl TrendReport {
    pub fn trend(&self, metric: TrendMetric) -> Option<&MetricTrend> {
        match metric {
            TrendMetric::Pace => self.pace_trend.as_ref(),
            TrendMetric::Swolf => self.swolf_trend.as_ref(),
            TrendMetric::StrokeEfficiency => self.stroke_efficiency_trend.as_ref(),
            TrendMetric::Distance => self.distance_trend.as_ref(),
            TrendMetric::HeartRate => self.heart_rate_trend.as_ref(),
            TrendMetric::StrokesPerLength => self.strokes_per_length_trend.as_ref(),
            TrendMetric::StrokeRate => self.stroke_rate_trend.as_ref(),
        }
    }

    /// Every fitted trend, in [`TrendMetric::ALL`] order
    pub fn trends(&self) -> impl Iterator<Item = &MetricTrend> {
        TrendMetric::ALL.into_iter().filter_map(|m| self.trend(m))
    }

    /// Anomalies recorded against the most recent usable session
    pub fn latest_anomalies(&self) -> impl Iterator<Item = &Anomaly> {
        let latest = self.latest_session_id.as_deref();
        self.anomalies
            .iter()
            .filter(move |a| Some(a.session_id.as_str()) == latest)
    }
}

/// A usable session positioned on the time axis
struct Point<'a> {
    start: DateTime<Utc>,
    days: f64,
    summary: &'a SessionSummary,
    metrics: &'a SwimmingMetrics,
}

#[derive(Debug, Clone, Default)]
pub struct TrendAnalyzer {
    config: TrendConfig,
}

impl TrendAnalyzer {
    pub fn new(config: TrendConfig) -> Self {
        Self { config }
    }

    /// Analyze a history of session summaries, in any order
    pub fn analyze_trend(&self, summaries: &[SessionSummary]) -> TrendReport {
        let points = usable_points(summaries);
        let overview = overview(&points);
        let time_range = time_range(summaries);
        let (sessions_per_week, longest_gap_days) = cadence(summaries);

        if points.len() < 2 {
            debug!(
                sessions = summaries.len(),
                usable = points.len(),
                "insufficient data for trends"
            );
            return TrendReport {
                status: TrendStatus::InsufficientData,
                session_count: summaries.len(),
                usable_count: points.len(),
                time_range,
                pace_trend: None,
                swolf_trend: None,
                stroke_efficiency_trend: None,
                distance_trend: None,
                heart_rate_trend: None,
                strokes_per_length_trend: None,
                stroke_rate_trend: None,
                pace_consistency: None,
                sessions_per_week,
                longest_gap_days,
                latest_session_id: points.last().map(|p| p.summary.session_id.clone()),
                anomalies: Vec::new(),
                overview,
            };
        }

        let paces: Vec<f64> = points
            .iter()
            .filter_map(|p| p.metrics.average_pace_per_100m)
            .collect();

        let mut anomalies = Vec::new();
        for metric in [TrendMetric::Pace, TrendMetric::Swolf] {
            anomalies.extend(self.anomalies(&points, metric));
        }
        anomalies.sort_by(|a, b| a.start_time.cmp(&b.start_time));

        let report = TrendReport {
            status: TrendStatus::Ok,
            session_count: summaries.len(),
            usable_count: points.len(),
            time_range,
            pace_trend: self.fit(&points, TrendMetric::Pace),
            swolf_trend: self.fit(&points, TrendMetric::Swolf),
            stroke_efficiency_trend: self.fit(&points, TrendMetric::StrokeEfficiency),
            distance_trend: self.fit(&points, TrendMetric::Distance),
            heart_rate_trend: self.fit(&points, TrendMetric::HeartRate),
            strokes_per_length_trend: self.fit(&points, TrendMetric::StrokesPerLength),
            stroke_rate_trend: self.fit(&points, TrendMetric::StrokeRate),
            pace_consistency: stats::coefficient_of_variation(&paces),
            sessions_per_week,
            longest_gap_days,
            latest_session_id: points.last().map(|p| p.summary.session_id.clone()),
            anomalies,
            overview,
        };

        debug!(
            sessions = report.session_count,
            usable = report.usable_count,
            anomalies = report.anomalies.len(),
            "computed trend report"
        );

        report
    }

    fn fit(&self, points: &[Point<'_>], metric: TrendMetric) -> Option<MetricTrend> {
        let series: Vec<(f64, f64)> = points
            .iter()
            .filter_map(|p| metric.value(p.summary, p.metrics).map(|v| (p.days, v)))
            .collect();

        let regression = stats::linear_regression(&series)?;
        let first_day = series.first()?.0;
        let last_day = series.last()?.0;
        let fitted_start = regression.predict(first_day);
        if fitted_start.abs() <= EPSILON {
            return None;
        }
        let relative_change = (regression.predict(last_day) - fitted_start) / fitted_start;

        let threshold = self.config.significance_threshold;
        let gain = if metric.lower_is_better() {
            -relative_change
        } else {
            relative_change
        };
        let direction = if gain > threshold {
            TrendDirection::Improving
        } else if gain < -threshold {
            TrendDirection::Declining
        } else {
            TrendDirection::Stable
        };

        Some(MetricTrend {
            metric,
            slope_per_day: regression.slope,
            relative_change,
            r_squared: regression.r_squared,
            direction,
            significance_threshold: threshold,
            sample_count: series.len(),
        })
    }

    /// Compare each session against the `anomaly_window` sessions before it
    fn anomalies(&self, points: &[Point<'_>], metric: TrendMetric) -> Vec<Anomaly> {
        let series: Vec<(&Point<'_>, f64)> = points
            .iter()
            .filter_map(|p| metric.value(p.summary, p.metrics).map(|v| (p, v)))
            .collect();
        let window = self.config.anomaly_window;
        let mut found = Vec::new();

        for i in window..series.len() {
            let baseline: Vec<f64> = series[i - window..i].iter().map(|(_, v)| *v).collect();
            let (Some(mean), Some(std_dev)) = (stats::mean(&baseline), stats::std_dev(&baseline))
            else {
                continue;
            };
            let spread = std_dev.max(mean.abs() * self.config.min_relative_spread);
            if spread <= EPSILON {
                continue;
            }

            let (point, value) = series[i];
            let deviation = (value - mean) / spread;
            if deviation.abs() > self.config.anomaly_std_devs {
                debug!(
                    session_id = %point.summary.session_id,
                    metric = metric.as_str(),
                    value,
                    deviation,
                    "anomaly detected"
                );
                found.push(Anomaly {
                    session_id: point.summary.session_id.clone(),
                    start_time: point.start,
                    metric,
                    value,
                    baseline_mean: mean,
                    baseline_std_dev: std_dev,
                    deviation_std_devs: deviation,
                });
            }
        }

        found
    }
}

/// Usable, dated summaries in stable start-time order
fn usable_points(summaries: &[SessionSummary]) -> Vec<Point<'_>> {
    let mut dated: Vec<(DateTime<Utc>, &SessionSummary, &SwimmingMetrics)> = summaries
        .iter()
        .filter_map(|s| Some((s.start_time?, s, s.metrics.as_ref()?)))
        .collect();
    dated.sort_by_key(|(start, _, _)| *start);

    let Some(origin) = dated.first().map(|(start, _, _)| *start) else {
        return Vec::new();
    };

    dated
        .into_iter()
        .map(|(start, summary, metrics)| Point {
            start,
            days: (start - origin).num_milliseconds() as f64 / 1000.0 / SECONDS_PER_DAY,
            summary,
            metrics,
        })
        .collect()
}

fn time_range(summaries: &[SessionSummary]) -> Option<TimeRange> {
    let start = summaries.iter().filter_map(|s| s.start_time).min()?;
    let end = summaries.iter().filter_map(|s| s.start_time).max()?;
    Some(TimeRange {
        start,
        end,
        span_days: (end - start).num_milliseconds() as f64 / 1000.0 / SECONDS_PER_DAY,
    })
}

/// Sessions per week and longest gap in days, over every dated session
fn cadence(summaries: &[SessionSummary]) -> (Option<f64>, Option<f64>) {
    let mut dated: Vec<DateTime<Utc>> = summaries.iter().filter_map(|s| s.start_time).collect();
    dated.sort();

    let days = |a: DateTime<Utc>, b: DateTime<Utc>| {
        (b - a).num_milliseconds() as f64 / 1000.0 / SECONDS_PER_DAY
    };
    let longest_gap = dated.windows(2).map(|w| days(w[0], w[1])).reduce(f64::max);
    let per_week = match (dated.first(), dated.last()) {
        (Some(first), Some(last)) if days(*first, *last) > EPSILON => {
            Some((dated.len() - 1) as f64 / days(*first, *last) * 7.0)
        }
        _ => None,
    };

    (per_week, longest_gap)
}

fn overview(points: &[Point<'_>]) -> PerformanceOverview {
    let paces: Vec<f64> = points
        .iter()
        .filter_map(|p| p.metrics.average_pace_per_100m)
        .collect();
    let swolfs: Vec<f64> = points.iter().filter_map(|p| p.metrics.average_swolf).collect();
    let heart_rates: Vec<f64> = points.iter().filter_map(|p| p.metrics.average_hr_bpm).collect();

    let best_pace = points
        .iter()
        .filter_map(|p| {
            p.metrics
                .best_pace_per_100m
                .or(p.metrics.average_pace_per_100m)
        })
        .reduce(f64::min);

    PerformanceOverview {
        usable_sessions: points.len(),
        pool_sessions: points
            .iter()
            .filter(|p| p.summary.venue == VenueType::Pool)
            .count(),
        open_water_sessions: points
            .iter()
            .filter(|p| p.summary.venue == VenueType::OpenWater)
            .count(),
        total_distance_meters: points
            .iter()
            .filter_map(|p| p.summary.total_distance_meters)
            .sum(),
        total_duration_sec: points
            .iter()
            .filter_map(|p| p.summary.total_duration_sec)
            .sum(),
        mean_pace_per_100m: stats::mean(&paces),
        best_pace_per_100m: best_pace,
        mean_swolf: stats::mean(&swolfs),
        mean_hr_bpm: stats::mean(&heart_rates),
        max_hr_bpm: points
            .iter()
            .filter_map(|p| p.summary.max_hr_bpm)
            .reduce(f64::max),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::SessionAnalyzer;
    use crate::recommend::{RecommendationEngine, RecommendationRule};
    use crate::schema::SessionRecord;
    use crate::types::{SwimmingInterval, SwimmingSession};
    use chrono::{Duration, TimeZone};
    use pretty_assertions::assert_eq;

    fn day(n: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 7, 0, 0).unwrap() + Duration::days(n)
    }

    /// 1000 m at the given pace, with 40 lengths of 25 m
    fn session(id: &str, day_offset: i64, pace: f64) -> SwimmingSession {
        let length_sec = pace / 4.0;
        let mut record = SessionRecord::new(id)
            .with_start_time(day(day_offset))
            .with_pool_length(25.0)
            .with_totals(1000.0, pace * 10.0);
        for i in 0..40 {
            record = record.with_interval(SwimmingInterval::new(i, 25.0, length_sec).with_strokes(16));
        }
        SwimmingSession::try_from(record).unwrap()
    }

    fn summaries(sessions: &[SwimmingSession]) -> Vec<SessionSummary> {
        SessionAnalyzer::default().analyze_batch(sessions)
    }

    #[test]
    fn test_falling_pace_is_improving() {
        let history = summaries(&[
            session("a", 0, 130.0),
            session("b", 1, 125.0),
            session("c", 2, 120.0),
        ]);

        let report = TrendAnalyzer::default().analyze_trend(&history);

        assert_eq!(report.status, TrendStatus::Ok);
        let pace = report.pace_trend.unwrap();
        assert_eq!(pace.direction, TrendDirection::Improving);
        assert!((pace.slope_per_day + 5.0).abs() < 1e-9);
        assert!((pace.relative_change - (-10.0 / 130.0)).abs() < 1e-9);
        assert_eq!(pace.sample_count, 3);
    }

    #[test]
    fn test_order_of_input_does_not_matter() {
        let history = summaries(&[
            session("c", 2, 120.0),
            session("a", 0, 130.0),
            session("b", 1, 125.0),
        ]);

        let report = TrendAnalyzer::default().analyze_trend(&history);

        assert_eq!(report.pace_trend.unwrap().direction, TrendDirection::Improving);
        assert_eq!(report.latest_session_id.as_deref(), Some("c"));
    }

    #[test]
    fn test_flat_pace_is_stable() {
        let history = summaries(&[
            session("a", 0, 120.0),
            session("b", 3, 121.0),
            session("c", 6, 120.0),
        ]);

        let report = TrendAnalyzer::default().analyze_trend(&history);

        assert_eq!(report.pace_trend.unwrap().direction, TrendDirection::Stable);
    }

    #[test]
    fn test_single_usable_session_is_insufficient() {
        let history = summaries(&[
            session("a", 0, 120.0),
            SwimmingSession::try_from(SessionRecord::new("broken")).unwrap(),
        ]);

        let report = TrendAnalyzer::default().analyze_trend(&history);

        assert_eq!(report.status, TrendStatus::InsufficientData);
        assert_eq!(report.session_count, 2);
        assert_eq!(report.usable_count, 1);
        assert!(report.pace_trend.is_none());
        assert!(report.sessions_per_week.is_none());
        assert_eq!(report.anomalies, vec![]);
        assert_eq!(report.overview.usable_sessions, 1);
        assert_eq!(report.overview.total_distance_meters, 1000.0);
        assert!(report.time_range.is_some());
    }

    #[test]
    fn test_empty_history() {
        let report = TrendAnalyzer::default().analyze_trend(&[]);
        assert_eq!(report.status, TrendStatus::InsufficientData);
        assert_eq!(report.session_count, 0);
        assert!(report.time_range.is_none());
        assert_eq!(report.overview, PerformanceOverview::default());
    }

    #[test]
    fn test_frequency_and_gap() {
        let history = summaries(&[
            session("a", 0, 120.0),
            session("b", 2, 120.0),
            session("c", 4, 120.0),
            session("d", 14, 120.0),
        ]);

        let report = TrendAnalyzer::default().analyze_trend(&history);

        // 3 intervals over 14 days
        assert!((report.sessions_per_week.unwrap() - 1.5).abs() < 1e-9);
        assert!((report.longest_gap_days.unwrap() - 10.0).abs() < 1e-9);
        assert_eq!(report.pace_consistency, Some(0.0));
    }

    #[test]
    fn test_anomaly_after_full_window() {
        let paces = [120.0, 122.0, 118.0, 121.0, 119.0, 140.0];
        let sessions: Vec<_> = paces
            .iter()
            .enumerate()
            .map(|(i, p)| session(&format!("s{i}"), i as i64, *p))
            .collect();

        let report = TrendAnalyzer::default().analyze_trend(&summaries(&sessions));

        let pace_anomalies: Vec<_> = report
            .anomalies
            .iter()
            .filter(|a| a.metric == TrendMetric::Pace)
            .collect();
        assert_eq!(pace_anomalies.len(), 1);
        assert_eq!(pace_anomalies[0].session_id, "s5");
        assert!(pace_anomalies[0].deviation_std_devs > 2.0);
        assert_eq!(report.latest_anomalies().count(), report.anomalies.len());
    }

    #[test]
    fn test_no_anomaly_with_exactly_window_sessions() {
        let paces = [120.0, 122.0, 118.0, 121.0, 160.0];
        let sessions: Vec<_> = paces
            .iter()
            .enumerate()
            .map(|(i, p)| session(&format!("s{i}"), i as i64, *p))
            .collect();

        let report = TrendAnalyzer::default().analyze_trend(&summaries(&sessions));

        assert_eq!(report.anomalies, vec![]);
    }

    #[test]
    fn test_overview_counts_venues() {
        let open_water = SwimmingSession::try_from(
            SessionRecord::new("ow")
                .with_start_time(day(3))
                .with_venue(VenueType::OpenWater)
                .with_totals(1500.0, 1800.0)
                .with_heart_rate(150.0, Some(172.0)),
        )
        .unwrap();
        let unusable_open_water = SwimmingSession::try_from(
            SessionRecord::new("ow-no-totals")
                .with_start_time(day(5))
                .with_venue(VenueType::OpenWater),
        )
        .unwrap();
        let history = summaries(&[session("a", 0, 110.0), open_water, unusable_open_water]);

        let report = TrendAnalyzer::default().analyze_trend(&history);

        assert_eq!(report.overview.usable_sessions, 2);
        assert_eq!(report.overview.pool_sessions, 1);
        assert_eq!(report.overview.open_water_sessions, 1);
        assert_eq!(report.overview.total_distance_meters, 2500.0);
        assert_eq!(report.overview.best_pace_per_100m, Some(110.0));
        assert_eq!(report.overview.max_hr_bpm, Some(172.0));
        assert_eq!(report.overview.mean_hr_bpm, Some(150.0));
    }

    fn history_of(paces: &[f64]) -> Vec<SessionSummary> {
        let sessions: Vec<_> = paces
            .iter()
            .enumerate()
            .map(|(i, p)| session(&format!("s{i}"), i as i64, *p))
            .collect();
        summaries(&sessions)
    }

    #[test]
    fn test_jump_after_flat_baseline_is_anomaly() {
        let history = history_of(&[120.0, 120.0, 120.0, 120.0, 120.0, 200.0]);

        let report = TrendAnalyzer::default().analyze_trend(&history);

        let pace_anomalies: Vec<_> = report
            .anomalies
            .iter()
            .filter(|a| a.metric == TrendMetric::Pace)
            .collect();
        assert_eq!(pace_anomalies.len(), 1);
        assert_eq!(pace_anomalies[0].session_id, "s5");
        assert_eq!(pace_anomalies[0].baseline_std_dev, 0.0);
        // Spread floored at 1% of 120
        assert!((pace_anomalies[0].deviation_std_devs - 80.0 / 1.2).abs() < 1e-9);

        let recommendations = RecommendationEngine::default().recommend(&report, None);
        assert!(recommendations
            .iter()
            .any(|r| r.rule == RecommendationRule::RecentSlowdown));
    }

    #[test]
    fn test_small_wobble_after_flat_baseline_is_not_anomaly() {
        let history = history_of(&[120.0, 120.0, 120.0, 120.0, 120.0, 121.0]);

        let report = TrendAnalyzer::default().analyze_trend(&history);

        assert_eq!(report.anomalies, vec![]);
    }

    #[test]
    fn test_unusable_dated_session_counts_toward_cadence() {
        let skipped = SwimmingSession::try_from(SessionRecord::new("skipped").with_start_time(day(4)))
            .unwrap();
        let history = summaries(&[session("a", 0, 120.0), skipped, session("b", 8, 120.0)]);

        let report = TrendAnalyzer::default().analyze_trend(&history);

        assert_eq!(report.status, TrendStatus::Ok);
        assert_eq!(report.usable_count, 2);
        assert!((report.longest_gap_days.unwrap() - 4.0).abs() < 1e-9);
        // 2 intervals over 8 days
        assert!((report.sessions_per_week.unwrap() - 1.75).abs() < 1e-9);

        let recommendations = RecommendationEngine::default().recommend(&report, None);
        assert!(!recommendations
            .iter()
            .any(|r| r.rule == RecommendationRule::TrainingGap));
    }

    #[test]
    fn test_distance_and_heart_rate_trends() {
        let sessions: Vec<_> = [(0, 1000.0, 150.0), (7, 1500.0, 146.0), (14, 2000.0, 142.0)]
            .into_iter()
            .map(|(d, distance, hr)| {
                SwimmingSession::try_from(
                    SessionRecord::new(format!("w{d}"))
                        .with_start_time(day(d))
                        .with_totals(distance, distance * 1.2)
                        .with_heart_rate(hr, None),
                )
                .unwrap()
            })
            .collect();

        let report = TrendAnalyzer::default().analyze_trend(&summaries(&sessions));

        let distance = report.trend(TrendMetric::Distance).unwrap();
        assert_eq!(distance.direction, TrendDirection::Improving);
        assert!((distance.relative_change - 1.0).abs() < 1e-9);
        let heart_rate = report.trend(TrendMetric::HeartRate).unwrap();
        assert_eq!(heart_rate.direction, TrendDirection::Improving);
        assert!((heart_rate.relative_change + 8.0 / 150.0).abs() < 1e-9);
        assert_eq!(report.pace_trend.unwrap().direction, TrendDirection::Stable);
        assert!(report.strokes_per_length_trend.is_none());
    }

    #[test]
    fn test_stroke_count_trends_fitted() {
        let history = history_of(&[130.0, 125.0, 120.0]);

        let report = TrendAnalyzer::default().analyze_trend(&history);

        // 16 strokes every length
        assert_eq!(
            report.strokes_per_length_trend.as_ref().unwrap().direction,
            TrendDirection::Stable
        );
        // Same strokes in less time raises the rate
        assert_eq!(
            report.stroke_rate_trend.as_ref().unwrap().direction,
            TrendDirection::Declining
        );
        assert_eq!(report.trends().count(), TrendMetric::ALL.len() - 1);
    }

    #[test]
    fn test_metric_polarity() {
        let higher_is_better: Vec<_> = TrendMetric::ALL
            .into_iter()
            .filter(|m| !m.lower_is_better())
            .collect();
        assert_eq!(
            higher_is_better,
            vec![TrendMetric::StrokeEfficiency, TrendMetric::Distance]
        );
    }
}
