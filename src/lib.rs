//! Scoring Service Library
//!
//! Inference-serving entry points for a managed model hosting platform:
//! `init` resolves a logical model name through the model registry and loads
//! it into an in-memory predictor, `run` turns one JSON request into a
//! `{"scores": [...]}` response. Two runtime variants implement the same
//! contract: an ONNX Runtime session and a tract callable model.

pub mod config;
pub mod error;
pub mod host;
pub mod payload;
pub mod registry;
pub mod scoring;

pub use config::AppConfig;
pub use error::ScoringError;
pub use host::{init, init_tracing, ScoringContext};
pub use payload::{FeatureMatrix, ScoreResponse};
pub use registry::{ModelRegistry, ResolvedModel};
pub use scoring::{IoDescriptor, RunnableScorer, Scorer, SessionScorer};
