//! Parsing batches of session records

use crate::config::ModelConfig;
use crate::error::ComputeError;
use crate::schema::record::SessionRecord;
use crate::types::SwimmingSession;
use std::collections::HashSet;

/// Reader for swim.session.v1 batches
pub struct SessionRecordAdapter;

impl SessionRecordAdapter {
    /// Parse a JSON string containing an array of records
    pub fn parse_array(json: &str) -> Result<Vec<SessionRecord>, ComputeError> {
        let records: Vec<SessionRecord> = serde_json::from_str(json)?;
        Ok(records)
    }

    /// Parse NDJSON (one record per line, blank lines ignored)
    pub fn parse_ndjson(ndjson: &str) -> Result<Vec<SessionRecord>, ComputeError> {
        let mut records = Vec::new();
        for (line_num, line) in ndjson.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<SessionRecord>(trimmed) {
                Ok(record) => records.push(record),
                Err(e) => {
                    return Err(ComputeError::ParseError(format!(
                        "Failed to parse line {}: {}",
                        line_num + 1,
                        e
                    )));
                }
            }
        }
        Ok(records)
    }

    /// Parse either a JSON array or NDJSON, based on the first non-blank character
    pub fn parse_auto(input: &str) -> Result<Vec<SessionRecord>, ComputeError> {
        if input.trim_start().starts_with('[') {
            Self::parse_array(input)
        } else {
            Self::parse_ndjson(input)
        }
    }

    /// Build sessions, failing on the first structurally malformed record.
    ///
    /// Session ids must be unique within the batch.
    pub fn to_sessions(
        records: Vec<SessionRecord>,
        config: &ModelConfig,
    ) -> Result<Vec<SwimmingSession>, ComputeError> {
        let mut seen = HashSet::new();
        records
            .into_iter()
            .map(|record| {
                if !seen.insert(record.session_id.clone()) {
                    tracing::warn!(session_id = %record.session_id, "rejected duplicate session id");
                    return Err(ComputeError::DuplicateSessionId(record.session_id));
                }
                let session_id = record.session_id.clone();
                SwimmingSession::from_record(record, config).map_err(|e| {
                    tracing::warn!(session_id = %session_id, error = %e, "rejected malformed session");
                    ComputeError::from(e)
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NDJSON: &str = r#"
{"session_id": "a", "total_distance_meters": 1000.0, "total_duration_sec": 1200.0}

{"session_id": "b", "total_distance_meters": 500.0, "total_duration_sec": 700.0}
"#;

    #[test]
    fn test_parse_ndjson_skips_blank_lines() {
        let records = SessionRecordAdapter::parse_ndjson(NDJSON).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].session_id, "b");
    }

    #[test]
    fn test_parse_ndjson_reports_line() {
        let err = SessionRecordAdapter::parse_ndjson("{\"session_id\": \"a\"}\nnot json").unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_parse_auto_detects_array() {
        let records =
            SessionRecordAdapter::parse_auto(r#"[{"session_id": "x"}, {"session_id": "y"}]"#).unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_to_sessions_fails_fast() {
        let records = SessionRecordAdapter::parse_array(
            r#"[{"session_id": "ok"}, {"session_id": "bad", "total_duration_sec": -5.0}]"#,
        )
        .unwrap();
        let result = SessionRecordAdapter::to_sessions(records, &ModelConfig::default());
        assert!(matches!(result, Err(ComputeError::Structural(_))));
    }

    #[test]
    fn test_to_sessions_rejects_duplicate_ids() {
        let records = SessionRecordAdapter::parse_array(
            r#"[{"session_id": "a"}, {"session_id": "b"}, {"session_id": "a"}]"#,
        )
        .unwrap();
        let result = SessionRecordAdapter::to_sessions(records, &ModelConfig::default());
        assert!(matches!(result, Err(ComputeError::DuplicateSessionId(ref id)) if id == "a"));
    }
}
