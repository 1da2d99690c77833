//! Feature Transform - Validated batch → fixed-width feature matrix
//!
//! `FeatureTransformer` is the seam the pipeline consumes. The shipped
//! implementation is the transaction pipeline the model was trained with:
//! one-hot categories, shifted log + standardisation on amounts, then a
//! truncated-SVD projection down to F components.

use std::collections::HashMap;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use super::layout::{compute_layout_hash, LayoutInfo, LAYOUT_VERSION};
use crate::error::{BundleError, PipelineError, Result};
use crate::logic::input::{ValidatedBatch, Value};

/// Default shift applied before taking the log of an amount
pub const DEFAULT_LOG_EPS: f64 = 1e-7;

// ============================================================================
// TRANSFORMER TRAIT
// ============================================================================

/// Maps validated records to a numeric matrix with one row per record.
///
/// Implementations must be deterministic and free of side effects.
pub trait FeatureTransformer: Send + Sync {
    fn transform(&self, batch: &ValidatedBatch) -> Result<Array2<f64>>;

    /// Column count F of every matrix this transformer produces
    fn n_features(&self) -> usize;
}

// ============================================================================
// SVD FEATURE PIPELINE
// ============================================================================

/// One-hot encoding of a categorical column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoricalEncoding {
    pub column: String,
    pub categories: Vec<String>,
}

/// Log + standardisation of a numeric column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericScaling {
    pub column: String,
    pub mean: f64,
    pub scale: f64,
}

/// Serialized form of `SvdFeaturePipeline`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SvdFeaturePipelineParams {
    pub categorical: Vec<CategoricalEncoding>,
    pub numeric: Vec<NumericScaling>,
    #[serde(default = "default_log_eps")]
    pub log_eps: f64,
    /// `n_components × encoded_width`, row-major
    pub components: Vec<Vec<f64>>,
}

fn default_log_eps() -> f64 {
    DEFAULT_LOG_EPS
}

/// Trained transaction feature pipeline
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "SvdFeaturePipelineParams")]
pub struct SvdFeaturePipeline {
    categorical: Vec<CategoricalEncoding>,
    numeric: Vec<NumericScaling>,
    log_eps: f64,
    components: Array2<f64>,
    /// Category → one-hot offset, one map per categorical column
    lookup: Vec<HashMap<String, usize>>,
    layout_hash: u32,
}

impl SvdFeaturePipeline {
    pub fn new(
        categorical: Vec<CategoricalEncoding>,
        numeric: Vec<NumericScaling>,
        log_eps: f64,
        components: Array2<f64>,
    ) -> std::result::Result<Self, BundleError> {
        let encoded_width: usize =
            categorical.iter().map(|c| c.categories.len()).sum::<usize>() + numeric.len();

        if components.nrows() == 0 {
            return Err(BundleError::Format("feature pipeline has no components".to_string()));
        }
        if components.ncols() != encoded_width {
            return Err(BundleError::Format(format!(
                "components have {} columns, encoded layout is {} wide",
                components.ncols(),
                encoded_width
            )));
        }
        if !log_eps.is_finite() || log_eps <= 0.0 {
            return Err(BundleError::Format(format!("log_eps must be positive, got {}", log_eps)));
        }
        if components.iter().any(|v| !v.is_finite()) {
            return Err(BundleError::Format("components contain non-finite values".to_string()));
        }

        let mut lookup = Vec::with_capacity(categorical.len());
        for enc in &categorical {
            let mut map = HashMap::with_capacity(enc.categories.len());
            for (i, category) in enc.categories.iter().enumerate() {
                if map.insert(category.clone(), i).is_some() {
                    return Err(BundleError::Format(format!(
                        "duplicate category '{}' in column {}",
                        category, enc.column
                    )));
                }
            }
            lookup.push(map);
        }

        let layout_hash = compute_layout_hash(
            categorical
                .iter()
                .map(|c| (c.column.as_str(), c.categories.as_slice())),
            numeric.iter().map(|n| n.column.as_str()),
        );

        Ok(Self {
            categorical,
            numeric,
            log_eps,
            components,
            lookup,
            layout_hash,
        })
    }

    /// Width of a row after one-hot encoding, before projection
    pub fn encoded_width(&self) -> usize {
        self.components.ncols()
    }

    pub fn layout_hash(&self) -> u32 {
        self.layout_hash
    }

    pub fn layout_info(&self) -> LayoutInfo {
        LayoutInfo {
            version: LAYOUT_VERSION,
            hash: self.layout_hash,
            encoded_width: self.encoded_width(),
            feature_count: self.n_features(),
            categorical_columns: self.categorical.iter().map(|c| c.column.clone()).collect(),
            numeric_columns: self.numeric.iter().map(|n| n.column.clone()).collect(),
        }
    }

    fn resolve(batch: &ValidatedBatch, column: &str) -> Result<usize> {
        batch
            .column_index(column)
            .ok_or_else(|| PipelineError::Transform(format!("column '{}' not present in batch", column)))
    }

    /// One-hot + scaled numeric encoding, `n × encoded_width`
    fn encode(&self, batch: &ValidatedBatch) -> Result<Array2<f64>> {
        let cat_idx: Vec<usize> = self
            .categorical
            .iter()
            .map(|c| Self::resolve(batch, &c.column))
            .collect::<Result<_>>()?;
        let num_idx: Vec<usize> = self
            .numeric
            .iter()
            .map(|n| Self::resolve(batch, &n.column))
            .collect::<Result<_>>()?;

        let mut encoded = Array2::<f64>::zeros((batch.len(), self.encoded_width()));

        for (r, row) in batch.rows().iter().enumerate() {
            let mut offset = 0;

            for ((enc, map), &src) in self.categorical.iter().zip(&self.lookup).zip(&cat_idx) {
                // Unknown or null category encodes as all zeros
                if let Some(&pos) = row[src].category_key().and_then(|k| map.get(&*k)) {
                    encoded[[r, offset + pos]] = 1.0;
                }
                offset += enc.categories.len();
            }

            for (scaling, &src) in self.numeric.iter().zip(&num_idx) {
                let raw = match &row[src] {
                    Value::Number(n) => *n,
                    other => {
                        return Err(PipelineError::Transform(format!(
                            "row {}: column {} is not numeric ({:?})",
                            r, scaling.column, other
                        )))
                    }
                };
                let logged = (raw + self.log_eps).ln();
                let scale = if scaling.scale == 0.0 { 1.0 } else { scaling.scale };
                let value = (logged - scaling.mean) / scale;
                if !value.is_finite() {
                    return Err(PipelineError::Transform(format!(
                        "row {}: column {} produced a non-finite feature from {}",
                        r, scaling.column, raw
                    )));
                }
                encoded[[r, offset]] = value;
                offset += 1;
            }
        }

        Ok(encoded)
    }
}

impl TryFrom<SvdFeaturePipelineParams> for SvdFeaturePipeline {
    type Error = BundleError;

    fn try_from(params: SvdFeaturePipelineParams) -> std::result::Result<Self, Self::Error> {
        let rows = params.components.len();
        let cols = params.components.first().map(Vec::len).unwrap_or(0);
        if params.components.iter().any(|r| r.len() != cols) {
            return Err(BundleError::Format("components rows differ in length".to_string()));
        }
        let flat: Vec<f64> = params.components.into_iter().flatten().collect();
        let components = Array2::from_shape_vec((rows, cols), flat)
            .map_err(|e| BundleError::Format(format!("components shape: {}", e)))?;

        Self::new(params.categorical, params.numeric, params.log_eps, components)
    }
}

impl FeatureTransformer for SvdFeaturePipeline {
    fn transform(&self, batch: &ValidatedBatch) -> Result<Array2<f64>> {
        let encoded = self.encode(batch)?;
        Ok(encoded.dot(&self.components.t()))
    }

    fn n_features(&self) -> usize {
        self.components.nrows()
    }
}
