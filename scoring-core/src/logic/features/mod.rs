//! Features Module - Feature Transform Engine
//!
//! Turns validated records into the fixed-width matrix the novelty model
//! expects. The pipeline only sees the `FeatureTransformer` trait.

pub mod layout;
pub mod transform;

// Re-export common types
pub use layout::{LayoutInfo, LAYOUT_VERSION};
pub use transform::{
    CategoricalEncoding, FeatureTransformer, NumericScaling, SvdFeaturePipeline,
    SvdFeaturePipelineParams, DEFAULT_LOG_EPS,
};
