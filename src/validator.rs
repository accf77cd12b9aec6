//! Data quality validation
//!
//! Judges whether a session's data is trustworthy before any metric is derived.
//! - Required fields present
//! - Paces and heart rates physically plausible
//! - Interval sums consistent with session totals
//! - Interval indices unique and ordered
//! - Frozen sensors (repeated identical readings)
//!
//! The same checks run on constructed sessions and on raw records, so callers can
//! inspect data that would fail construction.

use crate::config::ValidatorConfig;
use crate::schema::SessionRecord;
use crate::types::{
    DataQualityReport, IssueCode, QualityIssue, Severity, SwimmingInterval, SwimmingSession,
    Verdict,
};
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use tracing::debug;

/// Codes that make a session unusable when raised as errors
const BLOCKING_CODES: [IssueCode; 2] = [IssueCode::DistanceMismatch, IssueCode::MissingField];

/// Validator producing a [`DataQualityReport`] per session
#[derive(Debug, Clone, Default)]
pub struct DataValidator {
    config: ValidatorConfig,
}

/// Borrowed view shared by the session and record paths
struct SessionView<'a> {
    session_id: &'a str,
    start_time: Option<DateTime<Utc>>,
    end_time: Option<DateTime<Utc>>,
    total_distance_meters: Option<f64>,
    total_duration_sec: Option<f64>,
    average_hr_bpm: Option<f64>,
    max_hr_bpm: Option<f64>,
    /// Device-computed average and best pace
    device_paces: [(&'static str, Option<f64>); 2],
    /// Arrival order for records, index order for sessions
    intervals: Vec<&'a SwimmingInterval>,
}

impl<'a> SessionView<'a> {
    fn from_session(session: &'a SwimmingSession) -> Self {
        Self {
            session_id: session.session_id(),
            start_time: session.start_time(),
            end_time: session.end_time(),
            total_distance_meters: session.total_distance_meters(),
            total_duration_sec: session.total_duration_sec(),
            average_hr_bpm: session.average_hr_bpm(),
            max_hr_bpm: session.max_hr_bpm(),
            device_paces: [
                ("average_pace_sec_per_100m", session.average_pace_sec_per_100m()),
                ("max_pace_sec_per_100m", session.max_pace_sec_per_100m()),
            ],
            intervals: session.intervals().collect(),
        }
    }

    fn from_record(record: &'a SessionRecord) -> Self {
        Self {
            session_id: &record.session_id,
            start_time: record.start_time,
            end_time: record.end_time,
            total_distance_meters: record.total_distance_meters,
            total_duration_sec: record.total_duration_sec,
            average_hr_bpm: record.average_hr_bpm,
            max_hr_bpm: record.max_hr_bpm,
            device_paces: [
                ("average_pace_sec_per_100m", record.average_pace_sec_per_100m),
                ("max_pace_sec_per_100m", record.max_pace_sec_per_100m),
            ],
            intervals: record.intervals.iter().collect(),
        }
    }
}

impl DataValidator {
    pub fn new(config: ValidatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Validate a constructed session
    pub fn validate(&self, session: &SwimmingSession) -> DataQualityReport {
        self.run(&SessionView::from_session(session))
    }

    /// Validate a raw record without constructing it first.
    ///
    /// Duplicate and out-of-order indices are only observable here, since
    /// construction rejects them outright.
    pub fn validate_record(&self, record: &SessionRecord) -> DataQualityReport {
        self.run(&SessionView::from_record(record))
    }

    fn run(&self, view: &SessionView<'_>) -> DataQualityReport {
        let mut issues = Vec::new();

        self.check_required(view, &mut issues);
        self.check_session_values(view, &mut issues);
        self.check_timing(view, &mut issues);
        self.check_intervals(view, &mut issues);
        self.check_sums(view, &mut issues);
        self.check_indices(view, &mut issues);
        self.check_dropout(view, &mut issues);

        let score = quality_score(&issues, &self.config);
        let verdict = self.verdict(&issues, score);

        debug!(
            session_id = view.session_id,
            score,
            verdict = verdict.as_str(),
            issues = issues.len(),
            "validated session"
        );

        DataQualityReport {
            session_id: view.session_id.to_string(),
            score,
            issues,
            verdict,
        }
    }

    fn verdict(&self, issues: &[QualityIssue], score: f64) -> Verdict {
        let blocked = issues
            .iter()
            .any(|i| i.severity == Severity::Error && BLOCKING_CODES.contains(&i.code));

        if blocked {
            Verdict::Unusable
        } else if score < self.config.caveat_score_threshold {
            Verdict::UsableWithCaveats
        } else {
            Verdict::Usable
        }
    }

    fn check_required(&self, view: &SessionView<'_>, issues: &mut Vec<QualityIssue>) {
        let missing = [
            ("start_time", view.start_time.is_none()),
            ("total_distance_meters", view.total_distance_meters.is_none()),
            ("total_duration_sec", view.total_duration_sec.is_none()),
        ];
        for (field, absent) in missing {
            if absent {
                issues.push(session_issue(
                    IssueCode::MissingField,
                    Severity::Error,
                    field,
                    format!("required field {field} is missing"),
                ));
            }
        }
    }

    fn check_session_values(&self, view: &SessionView<'_>, issues: &mut Vec<QualityIssue>) {
        let totals = [
            ("total_distance_meters", view.total_distance_meters),
            ("total_duration_sec", view.total_duration_sec),
            ("average_hr_bpm", view.average_hr_bpm),
            ("max_hr_bpm", view.max_hr_bpm),
        ];
        for (field, value) in totals.into_iter().chain(view.device_paces) {
            if let Some(v) = value {
                if !v.is_finite() || v < 0.0 {
                    issues.push(session_issue(
                        IssueCode::ImplausibleValue,
                        Severity::Error,
                        field,
                        format!("{field} must be a non-negative number, got {v}"),
                    ));
                }
            }
        }

        match (view.total_distance_meters, view.total_duration_sec) {
            (Some(distance), Some(duration)) if distance > 0.0 && duration <= 0.0 => {
                issues.push(session_issue(
                    IssueCode::ImplausibleValue,
                    Severity::Error,
                    "total_duration_sec",
                    format!("{distance} m covered in zero time"),
                ));
            }
            (Some(distance), Some(duration)) if distance > 0.0 => {
                let pace = duration / (distance / 100.0);
                if let Some(message) = self.pace_problem(pace) {
                    issues.push(session_issue(
                        IssueCode::ImplausibleValue,
                        Severity::Warning,
                        "average_pace",
                        message,
                    ));
                }
            }
            _ => {}
        }

        for (field, value) in [
            ("average_hr_bpm", view.average_hr_bpm),
            ("max_hr_bpm", view.max_hr_bpm),
        ] {
            if let Some(message) = value.and_then(|hr| self.heart_rate_problem(hr)) {
                issues.push(session_issue(
                    IssueCode::ImplausibleValue,
                    Severity::Warning,
                    field,
                    message,
                ));
            }
        }

        for (field, value) in view.device_paces {
            let Some(pace) = value.filter(|p| *p > 0.0) else {
                continue;
            };
            if let Some(message) = self.pace_problem(pace) {
                issues.push(session_issue(
                    IssueCode::ImplausibleValue,
                    Severity::Warning,
                    field,
                    message,
                ));
            }
        }

        if let (Some(avg), Some(max)) = (view.average_hr_bpm, view.max_hr_bpm) {
            if max < avg {
                issues.push(session_issue(
                    IssueCode::ImplausibleValue,
                    Severity::Warning,
                    "max_hr_bpm",
                    format!("max heart rate {max} below average {avg}"),
                ));
            }
        }
    }

    /// End must follow start, and the recorded duration must fit between them
    fn check_timing(&self, view: &SessionView<'_>, issues: &mut Vec<QualityIssue>) {
        let (Some(start), Some(end)) = (view.start_time, view.end_time) else {
            return;
        };
        if end < start {
            issues.push(session_issue(
                IssueCode::ImplausibleValue,
                Severity::Error,
                "end_time",
                format!("session ends at {end} before it starts at {start}"),
            ));
            return;
        }

        let elapsed = (end - start).num_milliseconds() as f64 / 1000.0;
        if let Some(duration) = view.total_duration_sec {
            let allowed = self.config.duration_tolerance.allowed(elapsed);
            if duration > elapsed + allowed {
                issues.push(session_issue(
                    IssueCode::ImplausibleValue,
                    Severity::Warning,
                    "total_duration_sec",
                    format!(
                        "{duration} s recorded but only {elapsed} s elapsed between start and end"
                    ),
                ));
            }
        }
    }

    fn check_intervals(&self, view: &SessionView<'_>, issues: &mut Vec<QualityIssue>) {
        for interval in &view.intervals {
            let index = interval.index;

            if interval.distance_meters < 0.0 || interval.duration_sec < 0.0 {
                issues.push(interval_issue(
                    IssueCode::ImplausibleValue,
                    Severity::Error,
                    index,
                    format!(
                        "negative interval values: {} m in {} s",
                        interval.distance_meters, interval.duration_sec
                    ),
                ));
                continue;
            }

            if interval.is_zero_duration_swim() {
                issues.push(interval_issue(
                    IssueCode::ImplausibleValue,
                    Severity::Error,
                    index,
                    format!("{} m covered in zero time", interval.distance_meters),
                ));
                continue;
            }

            if let Some(message) = interval.pace_per_100m().and_then(|p| self.pace_problem(p)) {
                issues.push(interval_issue(
                    IssueCode::ImplausibleValue,
                    Severity::Warning,
                    index,
                    message,
                ));
            }

            if let Some(message) = interval
                .average_hr_bpm
                .and_then(|hr| self.heart_rate_problem(hr))
            {
                issues.push(interval_issue(
                    IssueCode::ImplausibleValue,
                    Severity::Warning,
                    index,
                    message,
                ));
            }
        }
    }

    fn check_sums(&self, view: &SessionView<'_>, issues: &mut Vec<QualityIssue>) {
        if view.intervals.is_empty() {
            return;
        }

        if let Some(total) = view.total_distance_meters {
            let sum: f64 = view.intervals.iter().map(|i| i.distance_meters).sum();
            let tolerance = &self.config.distance_tolerance;
            if !tolerance.accepts(sum, total) {
                issues.push(session_issue(
                    IssueCode::DistanceMismatch,
                    Severity::Error,
                    "total_distance_meters",
                    format!(
                        "intervals sum to {sum} m, session reports {total} m (allowed {} m)",
                        tolerance.allowed(total)
                    ),
                ));
            }
        }

        if let Some(total) = view.total_duration_sec {
            let sum: f64 = view.intervals.iter().map(|i| i.duration_sec).sum();
            let tolerance = &self.config.duration_tolerance;
            if !tolerance.accepts(sum, total) {
                issues.push(session_issue(
                    IssueCode::DistanceMismatch,
                    Severity::Error,
                    "total_duration_sec",
                    format!(
                        "intervals sum to {sum} s, session reports {total} s (allowed {} s)",
                        tolerance.allowed(total)
                    ),
                ));
            }
        }
    }

    fn check_indices(&self, view: &SessionView<'_>, issues: &mut Vec<QualityIssue>) {
        let mut seen = BTreeSet::new();
        let mut previous: Option<u32> = None;

        for interval in &view.intervals {
            let index = interval.index;
            if !seen.insert(index) {
                issues.push(interval_issue(
                    IssueCode::DuplicateInterval,
                    Severity::Error,
                    index,
                    format!("interval index {index} appears more than once"),
                ));
                continue;
            }
            if let Some(prev) = previous {
                if index < prev {
                    issues.push(interval_issue(
                        IssueCode::IntervalOrder,
                        Severity::Error,
                        index,
                        format!("interval {index} arrives after interval {prev}"),
                    ));
                }
            }
            previous = Some(index);
        }

        // Gaps: the sorted unique indices must read 0, 1, 2, ...
        if let Some((expected, _)) = seen
            .iter()
            .enumerate()
            .find(|(position, index)| **index != *position as u32)
        {
            let expected = expected as u32;
            issues.push(interval_issue(
                IssueCode::IntervalOrder,
                Severity::Error,
                expected,
                format!("interval {expected} is missing from the sequence"),
            ));
        }
    }

    fn check_dropout(&self, view: &SessionView<'_>, issues: &mut Vec<QualityIssue>) {
        let swims: Vec<&SwimmingInterval> = view
            .intervals
            .iter()
            .copied()
            .filter(|i| !i.rest)
            .collect();
        let min_run = self.config.dropout_run_length;

        let frozen_hr = runs(&swims, min_run, |a, b| {
            matches!((a.average_hr_bpm, b.average_hr_bpm), (Some(x), Some(y)) if x == y)
        });
        for (start, len) in frozen_hr {
            let first = swims[start];
            issues.push(interval_issue(
                IssueCode::SensorDropout,
                Severity::Warning,
                first.index,
                format!(
                    "heart rate frozen at {} bpm for {len} consecutive intervals",
                    first.average_hr_bpm.unwrap_or_default()
                ),
            ));
        }

        let lost_strokes = runs(&swims, min_run, |a, b| {
            a.is_stroke_dropout() && b.is_stroke_dropout()
        });
        for (start, len) in lost_strokes {
            issues.push(interval_issue(
                IssueCode::SensorDropout,
                Severity::Warning,
                swims[start].index,
                format!("no strokes counted over {len} consecutive swimming intervals"),
            ));
        }
    }

    fn pace_problem(&self, pace: f64) -> Option<String> {
        if pace < self.config.min_pace_per_100m {
            Some(format!(
                "pace {pace:.1} s/100m is faster than the plausible limit of {} s/100m",
                self.config.min_pace_per_100m
            ))
        } else if pace > self.config.max_pace_per_100m {
            Some(format!(
                "pace {pace:.1} s/100m is slower than {} s/100m (stall)",
                self.config.max_pace_per_100m
            ))
        } else {
            None
        }
    }

    fn heart_rate_problem(&self, hr: f64) -> Option<String> {
        if hr < self.config.min_heart_rate || hr > self.config.max_heart_rate {
            Some(format!(
                "heart rate {hr} bpm outside {}-{} bpm",
                self.config.min_heart_rate, self.config.max_heart_rate
            ))
        } else {
            None
        }
    }
}

/// Score in [0, 1]: one minus the summed severity weights, floored at zero
pub fn quality_score(issues: &[QualityIssue], config: &ValidatorConfig) -> f64 {
    let penalty: f64 = issues
        .iter()
        .map(|i| match i.severity {
            Severity::Warning => config.weights.warning,
            Severity::Error => config.weights.error,
        })
        .sum();
    (1.0 - penalty).clamp(0.0, 1.0)
}

/// Maximal runs of at least `min_len` items where each adjacent pair satisfies `linked`.
/// Returns (start position, run length).
fn runs<T>(items: &[T], min_len: usize, linked: impl Fn(&T, &T) -> bool) -> Vec<(usize, usize)> {
    let mut found = Vec::new();
    let mut start = 0;

    for i in 1..=items.len() {
        let continues = i < items.len() && linked(&items[i - 1], &items[i]);
        if !continues {
            let len = i - start;
            if len >= min_len {
                found.push((start, len));
            }
            start = i;
        }
    }

    found
}

fn session_issue(
    code: IssueCode,
    severity: Severity,
    field: &str,
    message: impl Into<String>,
) -> QualityIssue {
    QualityIssue {
        code,
        severity,
        message: message.into(),
        field: Some(field.to_string()),
        interval_index: None,
    }
}

fn interval_issue(
    code: IssueCode,
    severity: Severity,
    index: u32,
    message: impl Into<String>,
) -> QualityIssue {
    QualityIssue {
        code,
        severity,
        message: message.into(),
        field: None,
        interval_index: Some(index),
    }
}
