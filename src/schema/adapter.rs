//! Parsing and batch validation of ingestion records

use crate::error::{ComputeError, ValidationError};
use crate::schema::record::MetricRecord;

/// Adapter for reading metric records from text
pub struct RecordAdapter;

impl RecordAdapter {
    /// Parse a JSON string containing an array of records
    pub fn parse_array(json: &str) -> Result<Vec<MetricRecord>, ComputeError> {
        let records: Vec<MetricRecord> = serde_json::from_str(json)?;
        Ok(records)
    }

    /// Parse NDJSON (newline-delimited JSON), one record per line
    pub fn parse_ndjson(ndjson: &str) -> Result<Vec<MetricRecord>, ComputeError> {
        let mut records = Vec::new();
        for (line_num, line) in ndjson.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<MetricRecord>(trimmed) {
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

    /// Validate a batch, returning only the failures
    pub fn validate_records(records: &[MetricRecord]) -> Vec<RecordValidation> {
        records
            .iter()
            .enumerate()
            .filter_map(|(index, record)| {
                record.validate().err().map(|error| RecordValidation {
                    index,
                    kind: record.kind(),
                    error,
                })
            })
            .collect()
    }
}

/// A record that failed validation
#[derive(Debug, Clone, PartialEq)]
pub struct RecordValidation {
    pub index: usize,
    pub kind: &'static str,
    pub error: ValidationError,
}

#[cfg(test)]
mod tests {
    use super::*;

    const NDJSON: &str = r#"{"kind":"student","id":1,"name":"Ana Santos","email":"ana.santos@email.com"}
{"kind":"lesson","id":10,"title":"Intro to Web Programming","instructor_id":1}

{"kind":"attention","student_id":1,"lesson_id":10,"on_screen":true,"fatigue":0.2}
{"kind":"log","student_id":1,"lesson_id":10,"interaction_type":"click","detail":{"target":"slides.pdf"}}"#;

    #[test]
    fn test_parse_ndjson_skips_blank_lines() {
        let records = RecordAdapter::parse_ndjson(NDJSON).unwrap();
        assert_eq!(records.len(), 4);
        assert_eq!(records[3].kind(), "log");
    }

    #[test]
    fn test_parse_ndjson_reports_line_number() {
        let input = "{\"kind\":\"student\",\"id\":1,\"name\":\"Ana\"}\nnot json";
        let err = RecordAdapter::parse_ndjson(input).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_parse_array() {
        let json = r#"[{"kind":"instructor","id":1,"name":"Prof. Carlos Silva"}]"#;
        let records = RecordAdapter::parse_array(json).unwrap();
        assert_eq!(records[0].kind(), "instructor");
    }

    #[test]
    fn test_validate_records_returns_failures_only() {
        let input = r#"{"kind":"attention","student_id":1,"lesson_id":10,"on_screen":true,"fatigue":0.2}
{"kind":"attention","student_id":1,"lesson_id":10,"on_screen":true,"fatigue":1.7}"#;
        let records = RecordAdapter::parse_ndjson(input).unwrap();
        let failures = RecordAdapter::validate_records(&records);

        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].index, 1);
        assert_eq!(failures[0].error, ValidationError::FatigueOutOfRange(1.7));
    }
}
