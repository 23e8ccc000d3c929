//! Callable model scoring via tract
//!
//! Loads the same ONNX artifacts as the session variant, but through tract's
//! pure-Rust runtime: the model is optimized into a runnable plan once at
//! load time and then invoked directly as a function over one row.

use crate::error::ScoringError;
use crate::payload::{parse_tabular_record, FeatureMatrix};
use crate::scoring::{IoDescriptor, Scorer};
use std::path::Path;
use tracing::info;
use tract_onnx::prelude::*;

type RunnableOnnx = RunnableModel<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// Scorer backed by a tract runnable model over a tabular row.
pub struct RunnableScorer {
    model: RunnableOnnx,
    columns: Vec<String>,
    descriptor: IoDescriptor,
}

impl RunnableScorer {
    /// Deserialize a model artifact into a runnable plan pinned to one row
    /// of the given columns.
    pub fn load<P: AsRef<Path>>(path: P, columns: &[String]) -> Result<Self, ScoringError> {
        let path = path.as_ref();
        if columns.is_empty() {
            return Err(ScoringError::ModelLoad {
                path: path.to_path_buf(),
                reason: "runnable runtime requires a configured column schema".to_string(),
            });
        }
        let width = columns.len();

        let model = tract_onnx::onnx()
            .model_for_path(path)
            .and_then(|m| m.with_input_fact(0, f32::fact([1, width]).into()))
            .and_then(|m| m.into_optimized())
            .and_then(|m| m.into_runnable())
            .map_err(|e| ScoringError::ModelLoad {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        let descriptor = describe(&model, width);

        info!(
            path = %path.display(),
            input = %descriptor.input_name,
            output = %descriptor.output_name,
            columns = width,
            "Runnable model loaded"
        );

        Ok(Self {
            model,
            columns: columns.to_vec(),
            descriptor,
        })
    }

    /// Column order expected in record payloads.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }
}

impl Scorer for RunnableScorer {
    fn descriptor(&self) -> &IoDescriptor {
        &self.descriptor
    }

    fn parse(&self, raw_data: &str) -> Result<FeatureMatrix, ScoringError> {
        parse_tabular_record(raw_data, &self.columns)
    }

    fn predict(&self, batch: &FeatureMatrix) -> Result<Vec<Vec<f32>>, ScoringError> {
        let array = tract_ndarray::Array2::from_shape_vec(
            (batch.rows(), batch.cols()),
            batch.data().to_vec(),
        )
        .map_err(|e| ScoringError::Inference {
            reason: format!("failed to build input tensor: {e}"),
        })?;
        let input: Tensor = array.into();

        let outputs = self
            .model
            .run(tvec!(input.into()))
            .map_err(|e| ScoringError::Inference {
                reason: e.to_string(),
            })?;

        let view = outputs[0]
            .to_array_view::<f32>()
            .map_err(|e| ScoringError::Inference {
                reason: e.to_string(),
            })?;

        let rows = if view.ndim() <= 1 {
            vec![view.iter().copied().collect()]
        } else {
            view.outer_iter()
                .map(|row| row.iter().copied().collect())
                .collect()
        };
        Ok(rows)
    }
}

/// Resolve slot names and widths from the optimized graph.
fn describe(model: &RunnableOnnx, width: usize) -> IoDescriptor {
    let graph = model.model();

    let input_name = graph
        .input_outlets()
        .ok()
        .and_then(|outlets| outlets.first())
        .map(|outlet| graph.node(outlet.node).name.clone())
        .unwrap_or_else(|| "input".to_string());

    let output_name = graph
        .output_outlets()
        .ok()
        .and_then(|outlets| outlets.first())
        .map(|outlet| graph.node(outlet.node).name.clone())
        .unwrap_or_else(|| "output".to_string());

    let output_width = graph
        .output_fact(0)
        .ok()
        .and_then(|fact| fact.shape.as_concrete())
        .and_then(|dims| dims.last().copied());

    IoDescriptor {
        input_name,
        output_name,
        input_width: Some(width),
        output_width,
    }
}
