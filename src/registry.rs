//! Filesystem-backed model registry lookup.
//!
//! The registry stores artifacts under `<root>/<logical name>/<version>/`,
//! where `<version>` is a numeric directory name and the highest version
//! wins. A version directory may carry a `manifest.json` naming the artifact
//! file; otherwise the single `.onnx` file in the directory is used.

use crate::config::RegistryConfig;
use crate::error::ScoringError;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment variable overriding the configured registry root.
pub const REGISTRY_ROOT_ENV: &str = "MODEL_REGISTRY_ROOT";

const MANIFEST_FILE: &str = "manifest.json";

/// Metadata recorded alongside a registered model version.
#[derive(Debug, Clone, Deserialize)]
pub struct VersionManifest {
    /// Artifact file name within the version directory
    pub artifact: Option<String>,
    /// When this version was registered
    pub registered_at: Option<DateTime<Utc>>,
    /// Free-form description from the publisher
    pub description: Option<String>,
}

/// A logical model name resolved to a concrete artifact on disk.
#[derive(Debug, Clone)]
pub struct ResolvedModel {
    /// Logical model name
    pub name: String,
    /// Registry version that was selected
    pub version: u64,
    /// Path to the artifact file
    pub path: PathBuf,
    /// Manifest of the selected version, when present
    pub manifest: Option<VersionManifest>,
}

/// Resolver for logical model names.
pub struct ModelRegistry {
    root: PathBuf,
}

impl ModelRegistry {
    /// Create a registry rooted at the given directory.
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    /// Create a registry from configuration, honoring MODEL_REGISTRY_ROOT.
    pub fn from_config(config: &RegistryConfig) -> Self {
        let root = std::env::var(REGISTRY_ROOT_ENV).unwrap_or_else(|_| config.root.clone());
        Self::new(root)
    }

    /// Registry root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a logical model name to the artifact of its latest version.
    pub fn resolve(&self, name: &str) -> Result<ResolvedModel, ScoringError> {
        let model_dir = self.root.join(name);
        if !model_dir.is_dir() {
            return Err(ScoringError::Registry {
                name: name.to_string(),
                reason: format!("model is not registered under {}", self.root.display()),
            });
        }

        let version = self.latest_version(name, &model_dir)?;
        let version_dir = model_dir.join(version.to_string());

        let manifest = read_manifest(name, &version_dir)?;
        let path = locate_artifact(name, &version_dir, manifest.as_ref())?;

        debug!(
            model = %name,
            version = version,
            path = %path.display(),
            "Resolved model artifact"
        );

        Ok(ResolvedModel {
            name: name.to_string(),
            version,
            path,
            manifest,
        })
    }

    /// Find the highest numeric version directory for a model.
    fn latest_version(&self, name: &str, model_dir: &Path) -> Result<u64, ScoringError> {
        let entries = fs::read_dir(model_dir).map_err(|e| ScoringError::Registry {
            name: name.to_string(),
            reason: format!("failed to list versions: {e}"),
        })?;

        let mut latest: Option<u64> = None;
        for entry in entries {
            let entry = entry.map_err(|e| ScoringError::Registry {
                name: name.to_string(),
                reason: format!("failed to list versions: {e}"),
            })?;
            if !entry.path().is_dir() {
                continue;
            }
            // Non-numeric directory names are not versions
            if let Some(version) = entry
                .file_name()
                .to_str()
                .and_then(|s| s.parse::<u64>().ok())
            {
                latest = Some(latest.map_or(version, |v| v.max(version)));
            }
        }

        latest.ok_or_else(|| ScoringError::Registry {
            name: name.to_string(),
            reason: "model has no registered versions".to_string(),
        })
    }
}

fn read_manifest(name: &str, version_dir: &Path) -> Result<Option<VersionManifest>, ScoringError> {
    let manifest_path = version_dir.join(MANIFEST_FILE);
    if !manifest_path.is_file() {
        return Ok(None);
    }

    let raw = fs::read_to_string(&manifest_path).map_err(|e| ScoringError::Registry {
        name: name.to_string(),
        reason: format!("failed to read {}: {e}", manifest_path.display()),
    })?;
    let manifest: VersionManifest =
        serde_json::from_str(&raw).map_err(|e| ScoringError::Registry {
            name: name.to_string(),
            reason: format!("invalid manifest {}: {e}", manifest_path.display()),
        })?;

    if let Some(registered_at) = manifest.registered_at {
        info!(
            version_dir = %version_dir.display(),
            registered_at = %registered_at,
            "Loaded registry manifest"
        );
    }

    Ok(Some(manifest))
}

fn locate_artifact(
    name: &str,
    version_dir: &Path,
    manifest: Option<&VersionManifest>,
) -> Result<PathBuf, ScoringError> {
    if let Some(file) = manifest.and_then(|m| m.artifact.as_deref()) {
        let path = version_dir.join(file);
        if !path.is_file() {
            return Err(ScoringError::Registry {
                name: name.to_string(),
                reason: format!("manifest artifact '{file}' does not exist"),
            });
        }
        return Ok(path);
    }

    // Without a manifest, the version directory must hold exactly one .onnx file
    let mut candidates = Vec::new();
    let entries = fs::read_dir(version_dir).map_err(|e| ScoringError::Registry {
        name: name.to_string(),
        reason: format!("failed to list artifacts: {e}"),
    })?;
    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) == Some("onnx") {
            candidates.push(path);
        }
    }

    match candidates.len() {
        1 => Ok(candidates.remove(0)),
        0 => Err(ScoringError::Registry {
            name: name.to_string(),
            reason: format!("no .onnx artifact in {}", version_dir.display()),
        }),
        n => Err(ScoringError::Registry {
            name: name.to_string(),
            reason: format!("{n} .onnx artifacts in {}, manifest required", version_dir.display()),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn register(root: &Path, name: &str, version: &str, artifact: &str) {
        let dir = root.join(name).join(version);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(artifact), b"onnx-bytes").unwrap();
    }

    #[test]
    fn test_resolve_latest_numeric_version() {
        let root = tempfile::tempdir().unwrap();
        register(root.path(), "classify_flowers", "1", "model.onnx");
        register(root.path(), "classify_flowers", "2", "model.onnx");
        register(root.path(), "classify_flowers", "10", "model.onnx");

        let registry = ModelRegistry::new(root.path());
        let resolved = registry.resolve("classify_flowers").unwrap();

        // 10 beats 2 numerically even though "2" > "10" lexicographically
        assert_eq!(resolved.version, 10);
        assert!(resolved.path.ends_with("classify_flowers/10/model.onnx"));
    }

    #[test]
    fn test_unregistered_model() {
        let root = tempfile::tempdir().unwrap();
        let registry = ModelRegistry::new(root.path());

        let err = registry.resolve("no_such_model").unwrap_err();
        assert!(matches!(err, ScoringError::Registry { .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_non_numeric_directories_ignored() {
        let root = tempfile::tempdir().unwrap();
        register(root.path(), "classify_flowers", "3", "model.onnx");
        fs::create_dir_all(root.path().join("classify_flowers/staging")).unwrap();

        let registry = ModelRegistry::new(root.path());
        let resolved = registry.resolve("classify_flowers").unwrap();
        assert_eq!(resolved.version, 3);
    }

    #[test]
    fn test_manifest_selects_artifact() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("classify_flowers/4");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("flowers-v4.onnx"), b"onnx-bytes").unwrap();
        fs::write(dir.join("flowers-v4-quantized.onnx"), b"onnx-bytes").unwrap();
        fs::write(
            dir.join("manifest.json"),
            r#"{"artifact": "flowers-v4.onnx", "registered_at": "2024-11-02T09:30:00Z"}"#,
        )
        .unwrap();

        let registry = ModelRegistry::new(root.path());
        let resolved = registry.resolve("classify_flowers").unwrap();

        assert!(resolved.path.ends_with("flowers-v4.onnx"));
        let manifest = resolved.manifest.unwrap();
        assert_eq!(manifest.artifact.as_deref(), Some("flowers-v4.onnx"));
        assert!(manifest.registered_at.is_some());
    }

    #[test]
    fn test_version_without_artifact() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir_all(root.path().join("classify_flowers/1")).unwrap();

        let registry = ModelRegistry::new(root.path());
        let err = registry.resolve("classify_flowers").unwrap_err();
        assert!(matches!(err, ScoringError::Registry { .. }));
    }

    #[test]
    fn test_ambiguous_artifacts_require_manifest() {
        let root = tempfile::tempdir().unwrap();
        register(root.path(), "classify_flowers", "1", "a.onnx");
        fs::write(
            root.path().join("classify_flowers/1/b.onnx"),
            b"onnx-bytes",
        )
        .unwrap();

        let registry = ModelRegistry::new(root.path());
        let err = registry.resolve("classify_flowers").unwrap_err();
        assert!(matches!(err, ScoringError::Registry { .. }));
    }
}
