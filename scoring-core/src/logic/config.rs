//! Pipeline Configuration
//!
//! Limits and defaults applied to every request. Built once at startup and
//! owned by the `ScoringContext`.

use serde::{Deserialize, Serialize};

use super::model::ThresholdConfig;
use super::ranking::PageConfig;
use crate::constants::{DEFAULT_BATCH_SIZE, DEFAULT_MAX_ROWS, DEFAULT_TOP_K};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Rows per model invocation
    pub batch_size: usize,

    /// Rows accepted per request
    pub max_rows: usize,

    /// `top_k` used by point scoring when none is given
    pub default_top_k: usize,

    pub threshold: ThresholdConfig,

    pub pages: PageConfig,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            max_rows: DEFAULT_MAX_ROWS,
            default_top_k: DEFAULT_TOP_K,
            threshold: ThresholdConfig::default(),
            pages: PageConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ScoringConfig::default();
        assert_eq!(config.batch_size, 5000);
        assert_eq!(config.default_top_k, 10);
        assert_eq!(config.pages.default_page_size, 20);
        assert_eq!(config.pages.max_page_size, 100);
        assert_eq!(config.threshold.default_percentile, 95.0);
    }

    #[test]
    fn test_deserialize_from_json() {
        let config: ScoringConfig = serde_json::from_str(
            r#"{
                "batch_size": 128,
                "max_rows": 1000,
                "default_top_k": 5,
                "threshold": {"default_percentile": 90.0, "min_percentile": 50.0, "max_percentile": 99.9},
                "pages": {"default_page_size": 10, "max_page_size": 50}
            }"#,
        )
        .unwrap();
        assert_eq!(config.batch_size, 128);
        assert_eq!(config.pages.max_page_size, 50);
    }
}
