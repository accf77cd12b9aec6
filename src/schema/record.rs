//! swim.session.v1 record definition

use crate::types::{SwimmingInterval, VenueType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Current record schema version
pub const SCHEMA_VERSION: &str = "swim.session.v1";

/// One swim activity as supplied by an ingestion layer.
///
/// Nothing here is trusted: measurements may be missing, negative, or
/// inconsistent with each other, and intervals keep their arrival order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Caller-supplied unique identifier
    pub session_id: String,
    /// Session start (UTC)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    /// Session end (UTC)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub venue: VenueType,
    /// Pool length configured on the device (meters)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pool_length_meters: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_distance_meters: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_duration_sec: Option<f64>,
    /// Intervals in the order the source delivered them
    #[serde(default)]
    pub intervals: Vec<SwimmingInterval>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_hr_bpm: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_hr_bpm: Option<f64>,
    /// Device-computed average pace (seconds per 100 m)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_pace_sec_per_100m: Option<f64>,
    /// Device-computed best pace (seconds per 100 m)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_pace_sec_per_100m: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_strokes: Option<u32>,
    /// Device SWOLF readings, in order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub swolf_samples: Vec<f64>,
}

impl SessionRecord {
    /// Create an empty pool session record
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            start_time: None,
            end_time: None,
            venue: VenueType::Pool,
            pool_length_meters: None,
            total_distance_meters: None,
            total_duration_sec: None,
            intervals: Vec::new(),
            average_hr_bpm: None,
            max_hr_bpm: None,
            average_pace_sec_per_100m: None,
            max_pace_sec_per_100m: None,
            total_strokes: None,
            swolf_samples: Vec::new(),
        }
    }

    pub fn with_start_time(mut self, start_time: DateTime<Utc>) -> Self {
        self.start_time = Some(start_time);
        self
    }

    pub fn with_end_time(mut self, end_time: DateTime<Utc>) -> Self {
        self.end_time = Some(end_time);
        self
    }

    pub fn with_venue(mut self, venue: VenueType) -> Self {
        self.venue = venue;
        self
    }

    pub fn with_pool_length(mut self, meters: f64) -> Self {
        self.pool_length_meters = Some(meters);
        self
    }

    /// Set total distance (meters) and duration (seconds)
    pub fn with_totals(mut self, distance_meters: f64, duration_sec: f64) -> Self {
        self.total_distance_meters = Some(distance_meters);
        self.total_duration_sec = Some(duration_sec);
        self
    }

    pub fn with_interval(mut self, interval: SwimmingInterval) -> Self {
        self.intervals.push(interval);
        self
    }

    pub fn with_heart_rate(mut self, average_bpm: f64, max_bpm: Option<f64>) -> Self {
        self.average_hr_bpm = Some(average_bpm);
        self.max_hr_bpm = max_bpm;
        self
    }

    /// Set device-computed average and best pace (seconds per 100 m)
    pub fn with_device_paces(mut self, average: Option<f64>, best: Option<f64>) -> Self {
        self.average_pace_sec_per_100m = average;
        self.max_pace_sec_per_100m = best;
        self
    }

    pub fn with_total_strokes(mut self, strokes: u32) -> Self {
        self.total_strokes = Some(strokes);
        self
    }

    pub fn with_swolf_samples(mut self, samples: Vec<f64>) -> Self {
        self.swolf_samples = samples;
        self
    }
}
