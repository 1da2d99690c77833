//! Data models

pub mod score;

pub use score::*;
