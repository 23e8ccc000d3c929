//! Request and response payloads for the scoring contract.
//!
//! Requests arrive as UTF-8 JSON: a numeric array (nested or flat) for the
//! session variant, or a tabular record for the runnable variant. Responses
//! are always `{"scores": [<float>, ...]}`.

use crate::error::ScoringError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Row-major matrix of 32-bit float features.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    rows: usize,
    cols: usize,
    data: Vec<f32>,
}

impl FeatureMatrix {
    /// Build a matrix from rows, rejecting empty and ragged input.
    pub fn from_rows(rows: Vec<Vec<f32>>) -> Result<Self, ScoringError> {
        let cols = match rows.first() {
            Some(first) if !first.is_empty() => first.len(),
            _ => {
                return Err(ScoringError::MalformedPayload {
                    reason: "payload contains no feature values".to_string(),
                })
            }
        };
        if let Some(bad) = rows.iter().find(|r| r.len() != cols) {
            return Err(ScoringError::MalformedPayload {
                reason: format!(
                    "ragged rows: expected {cols} values per row, found {}",
                    bad.len()
                ),
            });
        }

        let count = rows.len();
        let data = rows.into_iter().flatten().collect();
        Ok(Self {
            rows: count,
            cols,
            data,
        })
    }

    /// Build a single pre-shaped row.
    pub fn single_row(row: Vec<f32>) -> Result<Self, ScoringError> {
        Self::from_rows(vec![row])
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Flat row-major data, `rows * cols` long.
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn row(&self, index: usize) -> &[f32] {
        &self.data[index * self.cols..(index + 1) * self.cols]
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ArrayPayload {
    Nested(Vec<Vec<f64>>),
    Flat(Vec<f64>),
}

/// Parse a JSON numeric array into a feature matrix.
///
/// Accepts `[[...], ...]` or a flat `[...]`, which is treated as one
/// pre-shaped row. Values are coerced to 32-bit floats.
pub fn parse_feature_matrix(raw_data: &str) -> Result<FeatureMatrix, ScoringError> {
    let payload: ArrayPayload =
        serde_json::from_str(raw_data).map_err(|e| ScoringError::MalformedPayload {
            reason: e.to_string(),
        })?;

    match payload {
        ArrayPayload::Nested(rows) => FeatureMatrix::from_rows(
            rows.into_iter()
                .map(|row| row.into_iter().map(|v| v as f32).collect())
                .collect(),
        ),
        ArrayPayload::Flat(row) => {
            FeatureMatrix::single_row(row.into_iter().map(|v| v as f32).collect())
        }
    }
}

/// Parse a JSON tabular record into a single-row feature matrix.
///
/// A JSON object is read in the given column order; an array (nested or
/// flat) is flattened into a single row of columns.
pub fn parse_tabular_record(
    raw_data: &str,
    columns: &[String],
) -> Result<FeatureMatrix, ScoringError> {
    let value: Value =
        serde_json::from_str(raw_data).map_err(|e| ScoringError::MalformedPayload {
            reason: e.to_string(),
        })?;

    match value {
        Value::Object(record) => {
            if columns.is_empty() {
                return Err(ScoringError::MalformedPayload {
                    reason: "record payload requires a configured column schema".to_string(),
                });
            }
            let mut row = Vec::with_capacity(columns.len());
            for column in columns {
                let value = record.get(column).ok_or_else(|| {
                    ScoringError::MalformedPayload {
                        reason: format!("record is missing column '{column}'"),
                    }
                })?;
                let number = value.as_f64().ok_or_else(|| ScoringError::MalformedPayload {
                    reason: format!("column '{column}' is not numeric"),
                })?;
                row.push(number as f32);
            }
            FeatureMatrix::single_row(row)
        }
        Value::Array(_) => {
            let mut row = Vec::new();
            flatten_numbers(&value, &mut row)?;
            FeatureMatrix::single_row(row)
        }
        other => Err(ScoringError::MalformedPayload {
            reason: format!("expected a JSON record or array, got {other}"),
        }),
    }
}

fn flatten_numbers(value: &Value, out: &mut Vec<f32>) -> Result<(), ScoringError> {
    match value {
        Value::Array(items) => {
            for item in items {
                flatten_numbers(item, out)?;
            }
            Ok(())
        }
        Value::Number(n) => {
            let number = n.as_f64().ok_or_else(|| ScoringError::MalformedPayload {
                reason: format!("value {n} is not representable as a float"),
            })?;
            out.push(number as f32);
            Ok(())
        }
        other => Err(ScoringError::MalformedPayload {
            reason: format!("expected a number, got {other}"),
        }),
    }
}

/// Response of a scoring call: class scores for the submitted example.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreResponse {
    pub scores: Vec<f32>,
}

impl ScoreResponse {
    /// Serialize the response to its wire form.
    pub fn to_json(&self) -> Result<String, ScoringError> {
        serde_json::to_string(self).map_err(|e| ScoringError::Inference {
            reason: format!("failed to serialize response: {e}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_array() {
        let matrix = parse_feature_matrix("[[5.1, 3.5, 1.4, 0.2]]").unwrap();
        assert_eq!(matrix.rows(), 1);
        assert_eq!(matrix.cols(), 4);
        assert_eq!(matrix.row(0), &[5.1, 3.5, 1.4, 0.2]);
    }

    #[test]
    fn test_flat_array_is_one_row() {
        let matrix = parse_feature_matrix("[5.1, 3.5, 1.4, 0.2]").unwrap();
        assert_eq!(matrix.rows(), 1);
        assert_eq!(matrix.cols(), 4);
    }

    #[test]
    fn test_multiple_rows() {
        let matrix = parse_feature_matrix("[[1, 2], [3, 4], [5, 6]]").unwrap();
        assert_eq!(matrix.rows(), 3);
        assert_eq!(matrix.cols(), 2);
        assert_eq!(matrix.row(2), &[5.0, 6.0]);
    }

    #[test]
    fn test_malformed_json() {
        let err = parse_feature_matrix("not json").unwrap_err();
        assert!(matches!(err, ScoringError::MalformedPayload { .. }));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let err = parse_feature_matrix("[[1, 2], [3]]").unwrap_err();
        assert!(matches!(err, ScoringError::MalformedPayload { .. }));
    }

    #[test]
    fn test_empty_payload_rejected() {
        assert!(parse_feature_matrix("[]").is_err());
        assert!(parse_feature_matrix("[[]]").is_err());
    }

    #[test]
    fn test_record_follows_column_order() {
        let columns: Vec<String> = ["sepal_length", "sepal_width", "petal_length", "petal_width"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        // Keys deliberately out of schema order
        let raw = r#"{"petal_width": 0.2, "sepal_length": 5.1, "petal_length": 1.4, "sepal_width": 3.5}"#;

        let matrix = parse_tabular_record(raw, &columns).unwrap();
        assert_eq!(matrix.row(0), &[5.1, 3.5, 1.4, 0.2]);
    }

    #[test]
    fn test_record_missing_column() {
        let columns = vec!["sepal_length".to_string(), "sepal_width".to_string()];
        let err = parse_tabular_record(r#"{"sepal_length": 5.1}"#, &columns).unwrap_err();
        assert!(matches!(err, ScoringError::MalformedPayload { .. }));
    }

    #[test]
    fn test_record_non_numeric_column() {
        let columns = vec!["sepal_length".to_string()];
        let err = parse_tabular_record(r#"{"sepal_length": "tall"}"#, &columns).unwrap_err();
        assert!(matches!(err, ScoringError::MalformedPayload { .. }));
    }

    #[test]
    fn test_record_without_schema() {
        let err = parse_tabular_record(r#"{"a": 1.0}"#, &[]).unwrap_err();
        assert!(matches!(err, ScoringError::MalformedPayload { .. }));
    }

    #[test]
    fn test_tabular_array_flattens_to_one_row() {
        let matrix = parse_tabular_record("[[5.1, 3.5], [1.4, 0.2]]", &[]).unwrap();
        assert_eq!(matrix.rows(), 1);
        assert_eq!(matrix.cols(), 4);
        assert_eq!(matrix.row(0), &[5.1, 3.5, 1.4, 0.2]);
    }

    #[test]
    fn test_response_wire_form() {
        let response = ScoreResponse {
            scores: vec![0.1, 0.7, 0.2],
        };
        let json = response.to_json().unwrap();
        assert_eq!(json, r#"{"scores":[0.1,0.7,0.2]}"#);
    }
}
