//! Core session model
//!
//! A [`SwimmingSession`] is the canonical, structurally valid representation of one
//! swim activity. It is immutable once constructed: every derived value produced by
//! later stages lives in separate output types, never on the session itself.

use crate::config::ModelConfig;
use crate::error::StructuralError;
use crate::schema::SessionRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Where the session took place
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VenueType {
    #[default]
    Pool,
    OpenWater,
}

impl VenueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            VenueType::Pool => "pool",
            VenueType::OpenWater => "open_water",
        }
    }
}

/// Stroke classification reported by the device
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrokeType {
    Freestyle,
    Backstroke,
    Breaststroke,
    Butterfly,
    Mixed,
    #[default]
    Unknown,
}

/// One contiguous segment of a session (a pool length, or an open-water leg)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwimmingInterval {
    /// Sequence index, unique within the session, starting at zero
    pub index: u32,
    /// Distance covered (meters)
    pub distance_meters: f64,
    /// Elapsed time (seconds)
    pub duration_sec: f64,
    /// Strokes taken during the interval
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_count: Option<u32>,
    /// Average heart rate (bpm)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_hr_bpm: Option<f64>,
    #[serde(default)]
    pub stroke_type: StrokeType,
    /// Rest intervals carry no swimming and are excluded from pace math
    #[serde(default)]
    pub rest: bool,
}

impl SwimmingInterval {
    pub fn new(index: u32, distance_meters: f64, duration_sec: f64) -> Self {
        Self {
            index,
            distance_meters,
            duration_sec,
            stroke_count: None,
            average_hr_bpm: None,
            stroke_type: StrokeType::Unknown,
            rest: false,
        }
    }

    /// A rest interval of the given length
    pub fn rest(index: u32, duration_sec: f64) -> Self {
        Self {
            rest: true,
            ..Self::new(index, 0.0, duration_sec)
        }
    }

    pub fn with_strokes(mut self, stroke_count: u32) -> Self {
        self.stroke_count = Some(stroke_count);
        self
    }

    pub fn with_heart_rate(mut self, average_hr_bpm: f64) -> Self {
        self.average_hr_bpm = Some(average_hr_bpm);
        self
    }

    pub fn with_stroke_type(mut self, stroke_type: StrokeType) -> Self {
        self.stroke_type = stroke_type;
        self
    }

    /// Seconds per 100 m, absent when the interval cannot define a pace.
    ///
    /// A zero-duration interval with distance is invalid input and never divided.
    pub fn pace_per_100m(&self) -> Option<f64> {
        if self.rest || self.distance_meters <= 0.0 || self.duration_sec <= 0.0 {
            return None;
        }
        Some(self.duration_sec / (self.distance_meters / 100.0))
    }

    /// Swimming interval that covered distance in zero time
    pub fn is_zero_duration_swim(&self) -> bool {
        !self.rest && self.distance_meters > 0.0 && self.duration_sec <= 0.0
    }

    /// Zero strokes over real distance: the counter stalled
    pub fn is_stroke_dropout(&self) -> bool {
        self.stroke_count == Some(0) && self.distance_meters > 0.0
    }

    /// Stroke count fit for stroke metrics; stalled counters and rests yield `None`
    pub fn counted_strokes(&self) -> Option<u32> {
        if self.rest || self.is_stroke_dropout() {
            return None;
        }
        self.stroke_count
    }
}

/// One swim activity.
///
/// Required fields (date, total distance, total duration) are optional here so the
/// validator can report their absence instead of construction failing on them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SessionRecord", into = "SessionRecord")]
pub struct SwimmingSession {
    session_id: String,
    start_time: Option<DateTime<Utc>>,
    end_time: Option<DateTime<Utc>>,
    venue: VenueType,
    pool_length_meters: Option<f64>,
    total_distance_meters: Option<f64>,
    total_duration_sec: Option<f64>,
    intervals: BTreeMap<u32, SwimmingInterval>,
    average_hr_bpm: Option<f64>,
    max_hr_bpm: Option<f64>,
    average_pace_sec_per_100m: Option<f64>,
    max_pace_sec_per_100m: Option<f64>,
    total_strokes: Option<u32>,
    swolf_samples: Vec<f64>,
}

impl SwimmingSession {
    /// Build a session from a raw record, enforcing structural invariants only.
    ///
    /// Plausibility is not judged here; that is the validator's job.
    pub fn from_record(
        record: SessionRecord,
        config: &ModelConfig,
    ) -> Result<Self, StructuralError> {
        if record.session_id.trim().is_empty() {
            return Err(StructuralError::EmptySessionId);
        }

        check_optional("total_distance_meters", record.total_distance_meters)?;
        check_optional("total_duration_sec", record.total_duration_sec)?;
        check_optional("pool_length_meters", record.pool_length_meters)?;
        check_optional("average_hr_bpm", record.average_hr_bpm)?;
        check_optional("max_hr_bpm", record.max_hr_bpm)?;
        check_optional("average_pace_sec_per_100m", record.average_pace_sec_per_100m)?;
        check_optional("max_pace_sec_per_100m", record.max_pace_sec_per_100m)?;
        for sample in &record.swolf_samples {
            check_value("swolf_samples", *sample)?;
        }

        let mut intervals = BTreeMap::new();
        for interval in record.intervals {
            check_value("interval.distance_meters", interval.distance_meters)?;
            check_value("interval.duration_sec", interval.duration_sec)?;
            check_optional("interval.average_hr_bpm", interval.average_hr_bpm)?;

            let index = interval.index;
            if intervals.insert(index, interval).is_some() {
                return Err(StructuralError::DuplicateIntervalIndex(index));
            }
        }

        for (expected, found) in intervals.keys().enumerate() {
            let expected = expected as u32;
            if *found != expected {
                return Err(StructuralError::NonContiguousIntervals {
                    expected,
                    found: *found,
                });
            }
        }

        if let (Some(total), false) = (record.total_distance_meters, intervals.is_empty()) {
            let interval_sum: f64 = intervals.values().map(|i| i.distance_meters).sum();
            if !config.distance_tolerance.accepts(interval_sum, total) {
                return Err(StructuralError::DistanceSumMismatch {
                    interval_sum,
                    total,
                    tolerance: config.distance_tolerance.allowed(total),
                });
            }
        }

        Ok(Self {
            session_id: record.session_id,
            start_time: record.start_time,
            end_time: record.end_time,
            venue: record.venue,
            pool_length_meters: record.pool_length_meters,
            total_distance_meters: record.total_distance_meters,
            total_duration_sec: record.total_duration_sec,
            intervals,
            average_hr_bpm: record.average_hr_bpm,
            max_hr_bpm: record.max_hr_bpm,
            average_pace_sec_per_100m: record.average_pace_sec_per_100m,
            max_pace_sec_per_100m: record.max_pace_sec_per_100m,
            total_strokes: record.total_strokes,
            swolf_samples: record.swolf_samples,
        })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        self.start_time
    }

    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        self.end_time
    }

    pub fn venue(&self) -> VenueType {
        self.venue
    }

    /// Device-reported pool length, if any
    pub fn pool_length_meters(&self) -> Option<f64> {
        self.pool_length_meters
    }

    pub fn total_distance_meters(&self) -> Option<f64> {
        self.total_distance_meters
    }

    pub fn total_duration_sec(&self) -> Option<f64> {
        self.total_duration_sec
    }

    /// Intervals in index order
    pub fn intervals(&self) -> impl Iterator<Item = &SwimmingInterval> {
        self.intervals.values()
    }

    pub fn interval(&self, index: u32) -> Option<&SwimmingInterval> {
        self.intervals.get(&index)
    }

    pub fn interval_count(&self) -> usize {
        self.intervals.len()
    }

    pub fn average_hr_bpm(&self) -> Option<f64> {
        self.average_hr_bpm
    }

    pub fn max_hr_bpm(&self) -> Option<f64> {
        self.max_hr_bpm
    }

    /// Raw device pace; the metrics stage recomputes its own from the totals
    pub fn average_pace_sec_per_100m(&self) -> Option<f64> {
        self.average_pace_sec_per_100m
    }

    /// Device-reported best pace, used when no interval defines one
    pub fn max_pace_sec_per_100m(&self) -> Option<f64> {
        self.max_pace_sec_per_100m
    }

    pub fn total_strokes(&self) -> Option<u32> {
        self.total_strokes
    }

    pub fn swolf_samples(&self) -> &[f64] {
        &self.swolf_samples
    }
}

impl TryFrom<SessionRecord> for SwimmingSession {
    type Error = StructuralError;

    fn try_from(record: SessionRecord) -> Result<Self, Self::Error> {
        Self::from_record(record, &ModelConfig::default())
    }
}

impl From<SwimmingSession> for SessionRecord {
    fn from(session: SwimmingSession) -> Self {
        SessionRecord {
            session_id: session.session_id,
            start_time: session.start_time,
            end_time: session.end_time,
            venue: session.venue,
            pool_length_meters: session.pool_length_meters,
            total_distance_meters: session.total_distance_meters,
            total_duration_sec: session.total_duration_sec,
            intervals: session.intervals.into_values().collect(),
            average_hr_bpm: session.average_hr_bpm,
            max_hr_bpm: session.max_hr_bpm,
            average_pace_sec_per_100m: session.average_pace_sec_per_100m,
            max_pace_sec_per_100m: session.max_pace_sec_per_100m,
            total_strokes: session.total_strokes,
            swolf_samples: session.swolf_samples,
        }
    }
}

fn check_value(field: &str, value: f64) -> Result<(), StructuralError> {
    if !value.is_finite() {
        return Err(StructuralError::NonFiniteValue {
            field: field.to_string(),
        });
    }
    if value < 0.0 {
        return Err(StructuralError::NegativeValue {
            field: field.to_string(),
            value,
        });
    }
    Ok(())
}

fn check_optional(field: &str, value: Option<f64>) -> Result<(), StructuralError> {
    match value {
        Some(v) => check_value(field, v),
        None => Ok(()),
    }
}

/// Reason a quality issue was raised
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCode {
    MissingField,
    ImplausibleValue,
    DistanceMismatch,
    SensorDropout,
    DuplicateInterval,
    IntervalOrder,
}

impl IssueCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueCode::MissingField => "missing_field",
            IssueCode::ImplausibleValue => "implausible_value",
            IssueCode::DistanceMismatch => "distance_mismatch",
            IssueCode::SensorDropout => "sensor_dropout",
            IssueCode::DuplicateInterval => "duplicate_interval",
            IssueCode::IntervalOrder => "interval_order",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Warning,
    Error,
}

/// Usability judgment for a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Usable,
    UsableWithCaveats,
    Unusable,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Usable => "usable",
            Verdict::UsableWithCaveats => "usable_with_caveats",
            Verdict::Unusable => "unusable",
        }
    }

    pub fn is_usable(&self) -> bool {
        !matches!(self, Verdict::Unusable)
    }
}

/// A single data-quality finding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityIssue {
    pub code: IssueCode,
    pub severity: Severity,
    pub message: String,
    /// Session field the issue refers to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// Interval the issue refers to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval_index: Option<u32>,
}

/// Per-session quality verdict
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataQualityReport {
    pub session_id: String,
    /// Quality score (0-1)
    pub score: f64,
    /// Issues in check order
    pub issues: Vec<QualityIssue>,
    pub verdict: Verdict,
}

impl DataQualityReport {
    pub fn has_issue(&self, code: IssueCode) -> bool {
        self.issues.iter().any(|i| i.code == code)
    }

    pub fn error_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Error)
            .count()
    }

    pub fn warning_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Warning)
            .count()
    }

    /// Comma-separated issue codes, in report order
    pub fn issue_codes(&self) -> String {
        self.issues
            .iter()
            .map(|i| i.code.as_str())
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Note attached to computed metrics explaining a limitation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MetricCaveat {
    /// Quality issue carried forward from the validator
    Quality { code: IssueCode, message: String },
    /// Swimming intervals whose length differs from the SWOLF reference
    SwolfIntervalsExcluded { count: usize },
    /// Average SWOLF taken from device samples rather than intervals
    SwolfFromDeviceSamples,
    /// Zero-duration swimming intervals left out of pace math
    ZeroDurationIntervalsSkipped { count: usize },
    /// No stroke counts anywhere in the session
    NoStrokeData,
}

/// Derived values for one interval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntervalMetrics {
    pub index: u32,
    /// Seconds per 100 m
    pub pace_per_100m: Option<f64>,
    /// Duration + strokes, for reference-length intervals only
    pub swolf: Option<f64>,
    /// Meters per stroke
    pub distance_per_stroke: Option<f64>,
}

/// Derived per-session metrics.
///
/// Every value that can be undefined is an `Option`; absence is never coerced to zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwimmingMetrics {
    pub session_id: String,
    /// Session pace (seconds per 100 m)
    pub average_pace_per_100m: Option<f64>,
    /// Fastest interval pace, else the device-reported best pace (seconds per 100 m)
    pub best_pace_per_100m: Option<f64>,
    pub average_swolf: Option<f64>,
    /// Intervals contributing to the SWOLF average
    pub swolf_intervals_used: usize,
    /// Meters per stroke
    pub stroke_efficiency: Option<f64>,
    /// Coefficient of variation of interval paces
    pub pace_consistency: Option<f64>,
    /// Pace per heart-rate unit (seconds per 100 m per bpm)
    pub heart_rate_efficiency: Option<f64>,
    pub average_hr_bpm: Option<f64>,
    /// Mean strokes per swimming interval
    pub strokes_per_length: Option<f64>,
    /// Strokes per minute of swimming time
    pub stroke_rate_per_min: Option<f64>,
    pub interval_metrics: Vec<IntervalMetrics>,
    pub caveats: Vec<MetricCaveat>,
}
