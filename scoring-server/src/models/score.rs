//! Scoring request models

use serde::{Deserialize, Serialize};
use validator::Validate;

use scoring_core::{ModelInfo, PageQuery, StatsSnapshot};

/// One JSON record: column name → scalar
pub type JsonRecord = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Deserialize, Validate)]
pub struct ScoreRequest {
    #[validate(length(min = 1, message = "records must not be empty"))]
    pub records: Vec<JsonRecord>,

    #[validate(range(min = 1, message = "top_k must be at least 1"))]
    pub top_k: Option<usize>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct ScoreCsvQuery {
    #[validate(range(min = 1, message = "page must be at least 1"))]
    pub page: Option<usize>,

    #[validate(range(min = 1, message = "page_size must be at least 1"))]
    pub page_size: Option<usize>,

    pub percentile: Option<f64>,
}

impl From<&ScoreCsvQuery> for PageQuery {
    fn from(query: &ScoreCsvQuery) -> Self {
        PageQuery {
            page: query.page,
            page_size: query.page_size,
            percentile: query.percentile,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ModelStatus {
    pub model: ModelInfo,
    pub stats: StatsSnapshot,
    pub batch_size: usize,
    pub max_rows: usize,
    pub serialized_scoring: bool,
}
