//! Model Module - Novelty scoring
//!
//! - `lof` - novelty model seam + Local Outlier Factor
//! - `scorer` - memory-bounded batch scoring
//! - `threshold` - global percentile cutoff
//! - `bundle` - model bundle loading

pub mod lof;
pub mod scorer;
pub mod threshold;
pub mod bundle;

// Re-export common types
pub use lof::{ExclusiveNoveltyModel, LocalOutlierFactor, LofParams, NoveltyModel, SerializedModel};
pub use scorer::BatchScorer;
pub use threshold::{percentile_threshold, Threshold, ThresholdConfig};
pub use bundle::{BundleMetadata, LoadedModel, ModelBundle, ModelInfo};
