//! Model Bundle - Feature pipeline + novelty model loaded once at startup
//!
//! A bundle is a JSON document with the trained feature pipeline, the LOF
//! reference set, and descriptive metadata. Shapes are validated while
//! deserializing; the SHA-256 of the raw file can be pinned via config.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::lof::{LocalOutlierFactor, NoveltyModel};
use crate::error::BundleError;
use crate::logic::features::layout::{validate_layout, LayoutInfo};
use crate::logic::features::{FeatureTransformer, SvdFeaturePipeline};

// ============================================================================
// DATA STRUCTURES
// ============================================================================

/// Descriptive metadata shipped inside the bundle
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BundleMetadata {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub trained_at: Option<String>,
    /// Expected CRC32 of the transformer's input layout
    #[serde(default)]
    pub layout_hash: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelBundle {
    #[serde(default)]
    pub metadata: BundleMetadata,
    pub feature_pipe: SvdFeaturePipeline,
    pub lof: LocalOutlierFactor,
}

/// Bundle plus load-time facts, for status reporting
#[derive(Debug, Clone)]
pub struct LoadedModel {
    pub bundle: ModelBundle,
    pub source: String,
    pub sha256: String,
    pub loaded_at: DateTime<Utc>,
}

/// Model summary for status endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    pub version: String,
    pub description: Option<String>,
    pub trained_at: Option<String>,
    pub source: String,
    pub sha256: String,
    pub loaded_at: DateTime<Utc>,
    pub n_neighbors: usize,
    pub reference_size: usize,
    pub layout: LayoutInfo,
}

// ============================================================================
// LOADING
// ============================================================================

impl ModelBundle {
    /// Parse and cross-check a bundle held in memory.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, BundleError> {
        let bundle: ModelBundle =
            serde_json::from_slice(bytes).map_err(|e| BundleError::Format(e.to_string()))?;
        bundle.check()?;
        Ok(bundle)
    }

    fn check(&self) -> Result<(), BundleError> {
        let produced = self.feature_pipe.n_features();
        let expected = self.lof.n_features();
        if produced != expected {
            return Err(BundleError::Format(format!(
                "feature pipeline produces {} features, model expects {}",
                produced, expected
            )));
        }

        if let Some(declared) = self.metadata.layout_hash {
            validate_layout(declared, self.feature_pipe.layout_hash())?;
        }

        Ok(())
    }
}

impl LoadedModel {
    /// Read a bundle from disk, verifying its checksum when one is pinned.
    pub fn load(path: impl AsRef<Path>, expected_sha256: Option<&str>) -> Result<Self, BundleError> {
        let path = path.as_ref();
        let source = path.display().to_string();
        log::info!("Loading model bundle from: {}", source);

        let bytes = std::fs::read(path).map_err(|e| BundleError::Io {
            path: source.clone(),
            source: e,
        })?;

        let sha256 = hex::encode(Sha256::digest(&bytes));
        if let Some(expected) = expected_sha256 {
            if !expected.trim().eq_ignore_ascii_case(&sha256) {
                return Err(BundleError::Checksum {
                    expected: expected.trim().to_lowercase(),
                    actual: sha256,
                });
            }
        }

        let bundle = ModelBundle::from_slice(&bytes)?;

        log::info!(
            "Model bundle loaded: {} v{} ({} reference samples, {} features, sha256 {})",
            bundle.metadata.name,
            bundle.metadata.version,
            bundle.lof.reference_size(),
            bundle.lof.n_features(),
            &sha256[..12]
        );

        Ok(Self {
            bundle,
            source,
            sha256,
            loaded_at: Utc::now(),
        })
    }

    pub fn info(&self) -> ModelInfo {
        let meta = &self.bundle.metadata;
        ModelInfo {
            name: meta.name.clone(),
            version: meta.version.clone(),
            description: meta.description.clone(),
            trained_at: meta.trained_at.clone(),
            source: self.source.clone(),
            sha256: self.sha256.clone(),
            loaded_at: self.loaded_at,
            n_neighbors: self.bundle.lof.n_neighbors(),
            reference_size: self.bundle.lof.reference_size(),
            layout: self.bundle.feature_pipe.layout_info(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const BUNDLE: &str = r#"{
        "metadata": {"name": "test", "version": "1"},
        "feature_pipe": {
            "categorical": [{"column": "WAERS", "categories": ["EUR", "USD"]}],
            "numeric": [{"column": "DMBTR", "mean": 0.0, "scale": 1.0}],
            "components": [[1.0, 0.0, 0.0], [0.0, 1.0, 1.0]]
        },
        "lof": {
            "n_neighbors": 2,
            "reference": [[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [1.0, 1.0]]
        }
    }"#;

    fn write_bundle(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_bundle() {
        let file = write_bundle(BUNDLE);
        let loaded = LoadedModel::load(file.path(), None).unwrap();

        assert_eq!(loaded.sha256.len(), 64);
        let info = loaded.info();
        assert_eq!(info.name, "test");
        assert_eq!(info.reference_size, 4);
        assert_eq!(info.layout.feature_count, 2);
        assert_eq!(info.layout.encoded_width, 3);
    }

    #[test]
    fn test_checksum_pinning() {
        let file = write_bundle(BUNDLE);
        let digest = hex::encode(Sha256::digest(BUNDLE.as_bytes()));

        assert!(LoadedModel::load(file.path(), Some(&digest.to_uppercase())).is_ok());

        let err = LoadedModel::load(file.path(), Some("deadbeef")).unwrap_err();
        assert!(matches!(err, BundleError::Checksum { .. }));
    }

    #[test]
    fn test_width_mismatch_between_pipe_and_model() {
        let broken = BUNDLE.replace(
            r#""reference": [[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [1.0, 1.0]]"#,
            r#""reference": [[0.0], [1.0], [2.0], [3.0]]"#,
        );
        let err = ModelBundle::from_slice(broken.as_bytes()).unwrap_err();
        assert!(matches!(err, BundleError::Format(_)));
    }

    #[test]
    fn test_layout_hash_mismatch() {
        let pinned = BUNDLE.replace(
            r#""version": "1"}"#,
            r#""version": "1", "layout_hash": 1}"#,
        );
        let err = ModelBundle::from_slice(pinned.as_bytes()).unwrap_err();
        assert!(matches!(err, BundleError::Layout { expected: 1, .. }));
    }

    #[test]
    fn test_missing_file() {
        let err = LoadedModel::load("/nonexistent/bundle.json", None).unwrap_err();
        assert!(matches!(err, BundleError::Io { .. }));
    }
}
