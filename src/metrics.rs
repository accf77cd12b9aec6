//! Per-session swimming metrics
//!
//! Derives pace, SWOLF, stroke efficiency, pace consistency and heart-rate
//! efficiency from a validated session. Sessions judged unusable are refused.

use crate::config::MetricsConfig;
use crate::error::ComputeError;
use crate::stats;
use crate::types::{
    DataQualityReport, IntervalMetrics, MetricCaveat, SwimmingInterval, SwimmingMetrics,
    SwimmingSession, Verdict,
};
use tracing::debug;

/// Calculator for [`SwimmingMetrics`]
#[derive(Debug, Clone, Default)]
pub struct MetricsCalculator {
    config: MetricsConfig,
}

impl MetricsCalculator {
    pub fn new(config: MetricsConfig) -> Self {
        Self { config }
    }

    /// Compute metrics for a session that passed validation.
    ///
    /// Fails with [`ComputeError::UnusableSession`] when the report's verdict is unusable.
    pub fn compute(
        &self,
        session: &SwimmingSession,
        report: &DataQualityReport,
    ) -> Result<SwimmingMetrics, ComputeError> {
        if report.verdict == Verdict::Unusable {
            return Err(ComputeError::UnusableSession {
                session_id: session.session_id().to_string(),
                issues: report.issue_codes(),
            });
        }

        let mut caveats = Vec::new();
        if report.verdict == Verdict::UsableWithCaveats {
            caveats.extend(report.issues.iter().map(|issue| MetricCaveat::Quality {
                code: issue.code,
                message: issue.message.clone(),
            }));
        }

        let reference = session
            .pool_length_meters()
            .unwrap_or(self.config.pool_length);
        let swims: Vec<&SwimmingInterval> = session.intervals().filter(|i| !i.rest).collect();

        let interval_metrics: Vec<IntervalMetrics> = session
            .intervals()
            .map(|i| IntervalMetrics {
                index: i.index,
                pace_per_100m: i.pace_per_100m(),
                swolf: self.interval_swolf(i, reference),
                distance_per_stroke: distance_per_stroke(i),
            })
            .collect();

        let zero_duration = swims.iter().filter(|i| i.is_zero_duration_swim()).count();
        if zero_duration > 0 {
            caveats.push(MetricCaveat::ZeroDurationIntervalsSkipped {
                count: zero_duration,
            });
        }

        let paces: Vec<f64> = interval_metrics
            .iter()
            .filter_map(|m| m.pace_per_100m)
            .collect();

        let average_pace_per_100m =
            match (session.total_distance_meters(), session.total_duration_sec()) {
                (Some(distance), Some(duration)) => pace_per_100m(duration, distance),
                _ => None,
            };
        let best_pace_per_100m = paces
            .iter()
            .copied()
            .reduce(f64::min)
            .or_else(|| session.max_pace_sec_per_100m().filter(|p| *p > 0.0));

        let (average_swolf, swolf_intervals_used) =
            self.average_swolf(session, &swims, &interval_metrics, reference, &mut caveats);

        let stroke_efficiency = stroke_efficiency(session, &swims);
        let has_strokes = swims.iter().any(|i| i.counted_strokes().is_some())
            || session.total_strokes().is_some();
        if !has_strokes {
            caveats.push(MetricCaveat::NoStrokeData);
        }

        let counted: Vec<&&SwimmingInterval> = swims
            .iter()
            .filter(|i| i.counted_strokes().is_some() && i.distance_meters > 0.0)
            .collect();
        let stroke_counts: Vec<f64> = counted
            .iter()
            .filter_map(|i| i.counted_strokes().map(f64::from))
            .collect();
        let strokes_per_length = stats::mean(&stroke_counts);
        let counted_minutes: f64 = counted.iter().map(|i| i.duration_sec).sum::<f64>() / 60.0;
        let stroke_rate_per_min = if counted_minutes > 0.0 {
            Some(stroke_counts.iter().sum::<f64>() / counted_minutes)
        } else {
            None
        };

        let interval_hr: Vec<f64> = swims.iter().filter_map(|i| i.average_hr_bpm).collect();
        let average_hr_bpm = session
            .average_hr_bpm()
            .or_else(|| stats::mean(&interval_hr));
        let heart_rate_efficiency = match (average_pace_per_100m, average_hr_bpm) {
            (Some(pace), Some(hr)) if hr > 0.0 => Some(pace / hr),
            _ => None,
        };

        debug!(
            session_id = session.session_id(),
            pace = ?average_pace_per_100m,
            swolf = ?average_swolf,
            caveats = caveats.len(),
            "computed session metrics"
        );

        Ok(SwimmingMetrics {
            session_id: session.session_id().to_string(),
            average_pace_per_100m,
            best_pace_per_100m,
            average_swolf,
            swolf_intervals_used,
            stroke_efficiency,
            pace_consistency: stats::coefficient_of_variation(&paces),
            heart_rate_efficiency,
            average_hr_bpm,
            strokes_per_length,
            stroke_rate_per_min,
            interval_metrics,
            caveats,
        })
    }

    /// SWOLF for one interval, only when it is one reference length with strokes
    fn interval_swolf(&self, interval: &SwimmingInterval, reference: f64) -> Option<f64> {
        if !self.matches_reference(interval, reference) || interval.duration_sec <= 0.0 {
            return None;
        }
        interval
            .counted_strokes()
            .map(|strokes| interval.duration_sec + f64::from(strokes))
    }

    fn matches_reference(&self, interval: &SwimmingInterval, reference: f64) -> bool {
        !interval.rest && (interval.distance_meters - reference).abs() <= self.config.length_tolerance
    }

    fn average_swolf(
        &self,
        session: &SwimmingSession,
        swims: &[&SwimmingInterval],
        interval_metrics: &[IntervalMetrics],
        reference: f64,
        caveats: &mut Vec<MetricCaveat>,
    ) -> (Option<f64>, usize) {
        let values: Vec<f64> = interval_metrics.iter().filter_map(|m| m.swolf).collect();

        let off_length = swims
            .iter()
            .filter(|i| i.distance_meters > 0.0 && !self.matches_reference(i, reference))
            .count();
        if off_length > 0 {
            caveats.push(MetricCaveat::SwolfIntervalsExcluded { count: off_length });
        }

        if !values.is_empty() {
            return (stats::mean(&values), values.len());
        }

        let samples = session.swolf_samples();
        if self.config.use_device_swolf_fallback && !samples.is_empty() {
            caveats.push(MetricCaveat::SwolfFromDeviceSamples);
            return (stats::mean(samples), 0);
        }

        (None, 0)
    }
}

/// Seconds per 100 m; undefined when either side is not positive
pub fn pace_per_100m(duration_sec: f64, distance_meters: f64) -> Option<f64> {
    if distance_meters <= 0.0 || duration_sec <= 0.0 {
        return None;
    }
    Some(duration_sec / (distance_meters / 100.0))
}

/// Render a pace as zero-padded `mm:ss`, dropping fractional seconds.
///
/// `None` when the pace is not positive.
pub fn format_pace(pace_sec_per_100m: f64) -> Option<String> {
    if !pace_sec_per_100m.is_finite() || pace_sec_per_100m <= 0.0 {
        return None;
    }
    let total = pace_sec_per_100m.trunc() as u64;
    Some(format!("{:02}:{:02}", total / 60, total % 60))
}

fn distance_per_stroke(interval: &SwimmingInterval) -> Option<f64> {
    match interval.stroke_count {
        Some(strokes) if strokes > 0 && !interval.rest && interval.distance_meters > 0.0 => {
            Some(interval.distance_meters / f64::from(strokes))
        }
        _ => None,
    }
}

/// Meters per stroke from counted intervals, falling back to the session total
fn stroke_efficiency(session: &SwimmingSession, swims: &[&SwimmingInterval]) -> Option<f64> {
    let (distance, strokes) = swims
        .iter()
        .filter_map(|i| i.counted_strokes().map(|s| (i.distance_meters, f64::from(s))))
        .fold((0.0, 0.0), |(d, s), (di, si)| (d + di, s + si));

    if strokes > 0.0 {
        return Some(distance / strokes);
    }

    match (session.total_distance_meters(), session.total_strokes()) {
        (Some(distance), Some(strokes)) if strokes > 0 && distance > 0.0 => {
            Some(distance / f64::from(strokes))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SessionRecord;
    use crate::types::{IssueCode, QualityIssue, Severity};
    use crate::validator::DataValidator;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn compute(record: SessionRecord) -> SwimmingMetrics {
        let session = SwimmingSession::try_from(record).unwrap();
        let report = DataValidator::default().validate(&session);
        MetricsCalculator::default().compute(&session, &report).unwrap()
    }

    fn base(id: &str) -> SessionRecord {
        SessionRecord::new(id).with_start_time(Utc.with_ymd_and_hms(2024, 3, 4, 6, 30, 0).unwrap())
    }

    #[test]
    fn test_session_pace() {
        let metrics = compute(base("pace").with_totals(1000.0, 1200.0));
        assert_eq!(metrics.average_pace_per_100m, Some(120.0));
        assert_eq!(metrics.average_swolf, None);
        assert_eq!(metrics.pace_consistency, None);
        assert!(metrics.caveats.contains(&MetricCaveat::NoStrokeData));
    }

    #[test]
    fn test_best_pace_falls_back_to_device_value() {
        let metrics = compute(
            base("lap-less")
                .with_totals(1000.0, 1200.0)
                .with_device_paces(Some(120.0), Some(105.0)),
        );

        assert_eq!(metrics.best_pace_per_100m, Some(105.0));
    }

    #[test]
    fn test_interval_pace_preferred_over_device_best_pace() {
        let metrics = compute(
            base("laps")
                .with_totals(50.0, 40.0)
                .with_device_paces(None, Some(70.0))
                .with_interval(SwimmingInterval::new(0, 25.0, 19.0))
                .with_interval(SwimmingInterval::new(1, 25.0, 21.0)),
        );

        assert_eq!(metrics.best_pace_per_100m, Some(76.0));
    }

    #[test]
    fn test_zero_distance_has_no_pace() {
        let metrics = compute(base("still").with_totals(0.0, 600.0));
        assert_eq!(metrics.average_pace_per_100m, None);
        assert_eq!(metrics.heart_rate_efficiency, None);
    }

    #[test]
    fn test_swolf_for_full_lengths() {
        let mut record = base("swolf").with_pool_length(25.0).with_totals(100.0, 72.0);
        for i in 0..4 {
            record = record.with_interval(SwimmingInterval::new(i, 25.0, 18.0).with_strokes(20));
        }

        let metrics = compute(record);

        assert_eq!(metrics.average_swolf, Some(38.0));
        assert_eq!(metrics.swolf_intervals_used, 4);
        assert_eq!(metrics.stroke_efficiency, Some(1.25));
        assert_eq!(metrics.strokes_per_length, Some(20.0));
        assert_eq!(metrics.pace_consistency, Some(0.0));
        // 80 strokes over 72 s
        assert!((metrics.stroke_rate_per_min.unwrap() - 80.0 / 1.2).abs() < 1e-9);
        assert_eq!(metrics.caveats, vec![]);
    }

    #[test]
    fn test_stalled_stroke_counter_excluded_from_stroke_metrics() {
        let mut record = base("stalled").with_pool_length(25.0).with_totals(200.0, 144.0);
        for i in 0..4 {
            record = record.with_interval(SwimmingInterval::new(i, 25.0, 18.0).with_strokes(20));
        }
        for i in 4..8 {
            record = record.with_interval(SwimmingInterval::new(i, 25.0, 18.0).with_strokes(0));
        }

        let session = SwimmingSession::try_from(record).unwrap();
        let report = DataValidator::default().validate(&session);
        let metrics = MetricsCalculator::default().compute(&session, &report).unwrap();

        assert!(report.has_issue(IssueCode::SensorDropout));
        assert_eq!(metrics.stroke_efficiency, Some(1.25));
        assert_eq!(metrics.strokes_per_length, Some(20.0));
        assert_eq!(metrics.average_swolf, Some(38.0));
        assert_eq!(metrics.swolf_intervals_used, 4);
        // 80 strokes over the 72 s of counted swimming
        assert!((metrics.stroke_rate_per_min.unwrap() - 80.0 / 1.2).abs() < 1e-9);
        assert_eq!(metrics.interval_metrics[5].swolf, None);
    }

    #[test]
    fn test_off_length_intervals_excluded_from_swolf() {
        let record = base("mixed")
            .with_pool_length(25.0)
            .with_totals(75.0, 56.0)
            .with_interval(SwimmingInterval::new(0, 25.0, 18.0).with_strokes(20))
            .with_interval(SwimmingInterval::new(1, 50.0, 38.0).with_strokes(42));

        let metrics = compute(record);

        assert_eq!(metrics.average_swolf, Some(38.0));
        assert_eq!(metrics.swolf_intervals_used, 1);
        assert!(metrics
            .caveats
            .contains(&MetricCaveat::SwolfIntervalsExcluded { count: 1 }));
        assert_eq!(metrics.interval_metrics[1].swolf, None);
        assert_eq!(metrics.interval_metrics[1].pace_per_100m, Some(76.0));
    }

    #[test]
    fn test_device_swolf_fallback() {
        let metrics = compute(
            base("device")
                .with_totals(400.0, 480.0)
                .with_total_strokes(320)
                .with_swolf_samples(vec![40.0, 42.0]),
        );

        assert_eq!(metrics.average_swolf, Some(41.0));
        assert_eq!(metrics.swolf_intervals_used, 0);
        assert!(metrics.caveats.contains(&MetricCaveat::SwolfFromDeviceSamples));
        assert_eq!(metrics.stroke_efficiency, Some(1.25));
    }

    #[test]
    fn test_rest_intervals_ignored() {
        let record = base("rest")
            .with_pool_length(25.0)
            .with_totals(50.0, 66.0)
            .with_interval(SwimmingInterval::new(0, 25.0, 20.0).with_strokes(18))
            .with_interval(SwimmingInterval::rest(1, 30.0))
            .with_interval(SwimmingInterval::new(2, 25.0, 16.0).with_strokes(18));

        let metrics = compute(record);

        assert_eq!(metrics.best_pace_per_100m, Some(64.0));
        assert_eq!(metrics.interval_metrics[1].pace_per_100m, None);
        assert_eq!(metrics.swolf_intervals_used, 2);
        // CV of 80 and 64: std 8, mean 72
        assert!((metrics.pace_consistency.unwrap() - 8.0 / 72.0).abs() < 1e-12);
    }

    #[test]
    fn test_heart_rate_efficiency_uses_interval_mean() {
        let record = base("hr")
            .with_totals(50.0, 60.0)
            .with_interval(SwimmingInterval::new(0, 25.0, 30.0).with_heart_rate(110.0))
            .with_interval(SwimmingInterval::new(1, 25.0, 30.0).with_heart_rate(130.0));

        let metrics = compute(record);

        assert_eq!(metrics.average_hr_bpm, Some(120.0));
        assert_eq!(metrics.heart_rate_efficiency, Some(1.0));
    }

    #[test]
    fn test_unusable_session_is_refused() {
        let session = SwimmingSession::try_from(SessionRecord::new("bare")).unwrap();
        let report = DataValidator::default().validate(&session);

        let err = MetricsCalculator::default()
            .compute(&session, &report)
            .unwrap_err();

        assert!(matches!(err, ComputeError::UnusableSession { ref session_id, .. } if session_id == "bare"));
    }

    #[test]
    fn test_caveated_report_carries_issues() {
        let session = SwimmingSession::try_from(base("c").with_totals(100.0, 120.0)).unwrap();
        let report = DataQualityReport {
            session_id: "c".to_string(),
            score: 0.4,
            issues: vec![QualityIssue {
                code: IssueCode::SensorDropout,
                severity: Severity::Warning,
                message: "frozen".to_string(),
                field: None,
                interval_index: Some(0),
            }],
            verdict: Verdict::UsableWithCaveats,
        };

        let metrics = MetricsCalculator::default().compute(&session, &report).unwrap();

        assert_eq!(
            metrics.caveats[0],
            MetricCaveat::Quality {
                code: IssueCode::SensorDropout,
                message: "frozen".to_string()
            }
        );
    }

    #[test]
    fn test_format_pace() {
        assert_eq!(format_pace(120.0).as_deref(), Some("02:00"));
        assert_eq!(format_pace(95.4).as_deref(), Some("01:35"));
        assert_eq!(format_pace(119.6).as_deref(), Some("01:59"));
        assert_eq!(format_pace(725.0).as_deref(), Some("12:05"));
        assert_eq!(format_pace(0.0), None);
        assert_eq!(format_pace(-3.0), None);
    }
}
