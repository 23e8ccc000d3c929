//! Hosting contract for the managed scoring platform.
//!
//! The platform calls `init` once per worker process to build a
//! `ScoringContext`, then `run` for each request. The context replaces a
//! process-wide mutable handle: the hosting adapter constructs it explicitly
//! and passes it to every scoring call.

use crate::config::{AppConfig, LoggingConfig, RuntimeKind};
use crate::error::ScoringError;
use crate::payload::ScoreResponse;
use crate::registry::{ModelRegistry, ResolvedModel};
use crate::scoring::{IoDescriptor, RunnableScorer, Scorer, SessionScorer};
use tracing::{debug, info};

/// A loaded predictor plus the registry identity it was resolved from.
pub struct ScoringContext {
    model: ResolvedModel,
    scorer: Box<dyn Scorer>,
}

/// Resolve the configured model through the registry and load it with the
/// configured runtime.
///
/// Registry and load failures are fatal startup errors; each call builds an
/// independent context.
pub fn init(config: &AppConfig) -> Result<ScoringContext, ScoringError> {
    let registry = ModelRegistry::from_config(&config.registry);
    let resolved = registry.resolve(&config.model.name)?;

    let scorer: Box<dyn Scorer> = match config.model.runtime {
        RuntimeKind::Session => Box::new(SessionScorer::load(
            &resolved.path,
            config.model.onnx_threads,
        )?),
        RuntimeKind::Runnable => {
            Box::new(RunnableScorer::load(&resolved.path, &config.model.columns)?)
        }
    };

    let descriptor = scorer.descriptor();
    info!(
        model = %resolved.name,
        version = resolved.version,
        runtime = ?config.model.runtime,
        input = %descriptor.input_name,
        output = %descriptor.output_name,
        "Scoring context initialized"
    );

    Ok(ScoringContext::new(resolved, scorer))
}

impl ScoringContext {
    /// Build a context from an already-loaded scorer.
    pub fn new(model: ResolvedModel, scorer: Box<dyn Scorer>) -> Self {
        Self { model, scorer }
    }

    /// Registry identity of the loaded model.
    pub fn model(&self) -> &ResolvedModel {
        &self.model
    }

    /// Slot binding of the loaded model.
    pub fn descriptor(&self) -> &IoDescriptor {
        self.scorer.descriptor()
    }

    /// Score one raw request.
    ///
    /// Parses the payload, checks the row width against the descriptor,
    /// evaluates the model, and serializes the first output row as
    /// `{"scores": [...]}`. Errors propagate untranslated; converting them
    /// into HTTP responses is the hosting platform's job.
    pub fn run(&self, raw_data: &str) -> Result<String, ScoringError> {
        let batch = self.scorer.parse(raw_data)?;
        self.scorer.descriptor().check_input_width(batch.cols())?;

        let output = self.scorer.predict(&batch)?;
        let first = output
            .into_iter()
            .next()
            .ok_or_else(|| ScoringError::Inference {
                reason: "model produced no output rows".to_string(),
            })?;

        debug!(
            model = %self.model.name,
            rows = batch.rows(),
            scores = first.len(),
            "Request scored"
        );

        ScoreResponse { scores: first }.to_json()
    }
}

/// Initialize tracing from the logging configuration.
///
/// Called once by the hosting adapter before `init`. RUST_LOG overrides the
/// configured level.
pub fn init_tracing(config: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.level));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if config.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}
