//! Configuration management for the scoring service

use crate::error::ScoringError;
use config::{Config, File};
use serde::Deserialize;
use std::path::Path;

/// Runtime variant used to load and evaluate the model artifact
#[derive(Debug, Clone, Deserialize, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeKind {
    /// ONNX Runtime session with named input/output slots
    #[default]
    Session,
    /// Toolkit-style callable model (tract), invoked as a function
    Runnable,
}

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub registry: RegistryConfig,
    pub model: ModelConfig,
    pub logging: LoggingConfig,
}

/// Model registry configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RegistryConfig {
    /// Root directory of the registry (MODEL_REGISTRY_ROOT overrides)
    pub root: String,
}

/// Scoring model configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    /// Logical model name resolved through the registry at init time
    #[serde(default = "default_model_name")]
    pub name: String,
    /// Runtime variant: "session" (ONNX Runtime) or "runnable" (tract)
    #[serde(default)]
    pub runtime: RuntimeKind,
    /// Column order for tabular records (runnable variant)
    #[serde(default)]
    pub columns: Vec<String>,
    /// Number of intra-op threads for ONNX Runtime inference (default: 1)
    #[serde(default = "default_onnx_threads")]
    pub onnx_threads: usize,
}

fn default_model_name() -> String {
    "classify_flowers".to_string()
}

fn default_onnx_threads() -> usize {
    1
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl AppConfig {
    /// Load configuration from the default file
    pub fn load() -> Result<Self, ScoringError> {
        Self::load_from_path("config/config.toml")
    }

    /// Load configuration from a specific path
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ScoringError> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()
            .map_err(|e| ScoringError::Config {
                reason: format!("failed to read configuration: {e}"),
            })?;

        config.try_deserialize().map_err(|e| ScoringError::Config {
            reason: format!("failed to deserialize configuration: {e}"),
        })
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            registry: RegistryConfig {
                root: "models".to_string(),
            },
            model: ModelConfig {
                name: default_model_name(),
                runtime: RuntimeKind::Session,
                columns: vec![
                    "sepal_length".to_string(),
                    "sepal_width".to_string(),
                    "petal_length".to_string(),
                    "petal_width".to_string(),
                ],
                onnx_threads: 1,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "json".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.registry.root, "models");
        assert_eq!(config.model.name, "classify_flowers");
        assert_eq!(config.model.runtime, RuntimeKind::Session);
        assert_eq!(config.model.columns.len(), 4);
        assert_eq!(config.model.onnx_threads, 1);
    }

    #[test]
    fn test_load_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(
            file,
            r#"
[registry]
root = "/srv/registry"

[model]
name = "classify_flowers"
runtime = "runnable"
columns = ["a", "b"]

[logging]
level = "debug"
format = "pretty"
"#
        )
        .unwrap();

        let config = AppConfig::load_from_path(&path).unwrap();
        assert_eq!(config.registry.root, "/srv/registry");
        assert_eq!(config.model.runtime, RuntimeKind::Runnable);
        assert_eq!(config.model.columns, vec!["a", "b"]);
        assert_eq!(config.model.onnx_threads, 1);
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = AppConfig::load_from_path("no/such/config.toml").unwrap_err();
        assert!(matches!(err, ScoringError::Config { .. }));
    }
}
