//! Scoring runtimes behind a common contract.
//!
//! Both variants load an ONNX artifact and map one feature matrix to output
//! rows of scores; they differ in the runtime (ONNX Runtime session vs.
//! tract callable model) and in the request form they accept.

pub mod runnable;
pub mod session;

pub use runnable::RunnableScorer;
pub use session::SessionScorer;

use crate::error::ScoringError;
use crate::payload::FeatureMatrix;

/// Input/output binding of a loaded model, resolved once at load time.
#[derive(Debug, Clone)]
pub struct IoDescriptor {
    /// Name of the graph's first input slot
    pub input_name: String,
    /// Name of the graph's first output slot
    pub output_name: String,
    /// Feature count of one input row, when the graph declares it
    pub input_width: Option<usize>,
    /// Score count of one output row, when the graph declares it
    pub output_width: Option<usize>,
}

impl IoDescriptor {
    /// Check a row width against the declared input width.
    ///
    /// Models with a symbolic input dimension skip the check; the runtime
    /// surfaces any mismatch at evaluation time instead.
    pub fn check_input_width(&self, actual: usize) -> Result<(), ScoringError> {
        match self.input_width {
            Some(expected) if expected != actual => {
                Err(ScoringError::ShapeMismatch { expected, actual })
            }
            _ => Ok(()),
        }
    }
}

/// A loaded predictor handle.
pub trait Scorer: Send + Sync {
    /// The model's input/output binding.
    fn descriptor(&self) -> &IoDescriptor;

    /// Parse a raw request payload into the matrix this runtime expects.
    fn parse(&self, raw_data: &str) -> Result<FeatureMatrix, ScoringError>;

    /// Evaluate the model, returning its first output tensor as rows.
    fn predict(&self, batch: &FeatureMatrix) -> Result<Vec<Vec<f32>>, ScoringError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(input_width: Option<usize>) -> IoDescriptor {
        IoDescriptor {
            input_name: "float_input".to_string(),
            output_name: "output".to_string(),
            input_width,
            output_width: Some(3),
        }
    }

    #[test]
    fn test_width_check() {
        let d = descriptor(Some(4));
        assert!(d.check_input_width(4).is_ok());

        let err = d.check_input_width(3).unwrap_err();
        assert!(matches!(
            err,
            ScoringError::ShapeMismatch {
                expected: 4,
                actual: 3
            }
        ));
    }

    #[test]
    fn test_symbolic_width_skips_check() {
        let d = descriptor(None);
        assert!(d.check_input_width(17).is_ok());
    }
}
