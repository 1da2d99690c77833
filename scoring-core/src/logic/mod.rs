//! Logic Module - Scoring pipeline stages
//!
//! - `input/` - tabular records, schema validation
//! - `features/` - feature transform (one-hot, log, scale, SVD)
//! - `model/` - novelty model, batch scoring, threshold, bundle loading
//! - `ranking/` - stable ranking and pagination
//! - `pipeline` - the stages wired together per request

pub mod input;
pub mod features;
pub mod model;
pub mod ranking;

pub mod config;
pub mod stats;
pub mod pipeline;

#[cfg(test)]
mod tests;
