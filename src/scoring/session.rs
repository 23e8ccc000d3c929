//! ONNX Runtime session scoring

use crate::error::ScoringError;
use crate::payload::{parse_feature_matrix, FeatureMatrix};
use crate::scoring::{IoDescriptor, Scorer};
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::{Tensor, ValueType};
use std::path::Path;
use std::sync::RwLock;
use tracing::info;

/// Scorer backed by an ONNX Runtime inference session.
///
/// Slot names and widths are read from session metadata once at load time.
/// The session sits behind a `RwLock` because `Session::run` takes `&mut`;
/// the handle is semantically read-only after load.
pub struct SessionScorer {
    session: RwLock<Session>,
    descriptor: IoDescriptor,
}

impl SessionScorer {
    /// Deserialize a model artifact into a session and resolve its bindings.
    pub fn load<P: AsRef<Path>>(path: P, intra_threads: usize) -> Result<Self, ScoringError> {
        let path = path.as_ref();

        ort::init().commit().map_err(|e| ScoringError::ModelLoad {
            path: path.to_path_buf(),
            reason: format!("runtime initialization failed: {e}"),
        })?;

        let session = Session::builder()
            .and_then(|b| b.with_optimization_level(GraphOptimizationLevel::Level3))
            .and_then(|b| b.with_intra_threads(intra_threads))
            .and_then(|b| b.commit_from_file(path))
            .map_err(|e| ScoringError::ModelLoad {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        let descriptor = describe(&session);

        info!(
            path = %path.display(),
            input = %descriptor.input_name,
            output = %descriptor.output_name,
            input_width = ?descriptor.input_width,
            threads = intra_threads,
            "ONNX session loaded"
        );

        Ok(Self {
            session: RwLock::new(session),
            descriptor,
        })
    }
}

impl Scorer for SessionScorer {
    fn descriptor(&self) -> &IoDescriptor {
        &self.descriptor
    }

    fn parse(&self, raw_data: &str) -> Result<FeatureMatrix, ScoringError> {
        parse_feature_matrix(raw_data)
    }

    fn predict(&self, batch: &FeatureMatrix) -> Result<Vec<Vec<f32>>, ScoringError> {
        let shape = vec![batch.rows() as i64, batch.cols() as i64];
        let input =
            Tensor::from_array((shape, batch.data().to_vec())).map_err(|e| {
                ScoringError::Inference {
                    reason: format!("failed to create input tensor: {e}"),
                }
            })?;

        let mut session = self.session.write().map_err(|e| ScoringError::Inference {
            reason: format!("session lock poisoned: {e}"),
        })?;

        let outputs = session
            .run(ort::inputs![self.descriptor.input_name.as_str() => input])
            .map_err(|e| ScoringError::Inference {
                reason: e.to_string(),
            })?;

        let value = outputs
            .get(self.descriptor.output_name.as_str())
            .ok_or_else(|| ScoringError::Inference {
                reason: format!("model produced no output '{}'", self.descriptor.output_name),
            })?;

        let (out_shape, data) =
            value
                .try_extract_tensor::<f32>()
                .map_err(|e| ScoringError::Inference {
                    reason: e.to_string(),
                })?;

        let dims: Vec<i64> = out_shape.iter().copied().collect();
        Ok(tensor_rows(&dims, data))
    }
}

/// Resolve slot names and widths from session metadata.
fn describe(session: &Session) -> IoDescriptor {
    let input_name = session
        .inputs
        .first()
        .map(|i| i.name.clone())
        .unwrap_or_else(|| "float_input".to_string());

    let output_name = session
        .outputs
        .first()
        .map(|o| o.name.clone())
        .unwrap_or_else(|| "output".to_string());

    let input_width = session
        .inputs
        .first()
        .and_then(|i| tensor_width(&i.input_type));
    let output_width = session
        .outputs
        .first()
        .and_then(|o| tensor_width(&o.output_type));

    IoDescriptor {
        input_name,
        output_name,
        input_width,
        output_width,
    }
}

/// Last concrete dimension of a tensor slot, if declared.
fn tensor_width(value_type: &ValueType) -> Option<usize> {
    match value_type {
        ValueType::Tensor { shape, .. } => {
            let dims: Vec<i64> = shape.iter().copied().collect();
            match dims.last() {
                Some(&last) if last > 0 => Some(last as usize),
                _ => None,
            }
        }
        _ => None,
    }
}

/// Split flat tensor data into rows per its shape.
fn tensor_rows(dims: &[i64], data: &[f32]) -> Vec<Vec<f32>> {
    match dims {
        [_, cols] if *cols > 0 => data
            .chunks(*cols as usize)
            .map(|chunk| chunk.to_vec())
            .collect(),
        _ => vec![data.to_vec()],
    }
}
