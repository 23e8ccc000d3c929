//! Error taxonomy for the scoring entry points.
//!
//! Registry and model-load failures are fatal at startup; payload, shape,
//! and inference failures are per-request and propagate untranslated to the
//! hosting platform.

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by `init` and `run`.
#[derive(Debug, Error)]
pub enum ScoringError {
    /// Configuration could not be read or deserialized.
    #[error("configuration error: {reason}")]
    Config { reason: String },

    /// The registry could not resolve a logical model name to an artifact.
    #[error("registry lookup for model '{name}' failed: {reason}")]
    Registry { name: String, reason: String },

    /// The resolved artifact could not be deserialized by the runtime.
    #[error("failed to load model artifact {}: {reason}", .path.display())]
    ModelLoad { path: PathBuf, reason: String },

    /// The request payload was not valid JSON in the expected shape.
    #[error("malformed request payload: {reason}")]
    MalformedPayload { reason: String },

    /// The input row width does not match the model's declared input width.
    #[error("input row has {actual} features, model expects {expected}")]
    ShapeMismatch { expected: usize, actual: usize },

    /// The inference runtime failed while evaluating the model.
    #[error("inference failed: {reason}")]
    Inference { reason: String },
}

impl ScoringError {
    /// True for failures that abort process startup rather than one request.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ScoringError::Config { .. }
                | ScoringError::Registry { .. }
                | ScoringError::ModelLoad { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        let startup = ScoringError::Registry {
            name: "classify_flowers".to_string(),
            reason: "no such directory".to_string(),
        };
        let request = ScoringError::ShapeMismatch {
            expected: 4,
            actual: 3,
        };

        assert!(startup.is_fatal());
        assert!(!request.is_fatal());
    }

    #[test]
    fn test_shape_mismatch_display() {
        let err = ScoringError::ShapeMismatch {
            expected: 4,
            actual: 7,
        };
        assert_eq!(
            err.to_string(),
            "input row has 7 features, model expects 4"
        );
    }
}
