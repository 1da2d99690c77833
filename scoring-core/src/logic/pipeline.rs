//! Scoring Pipeline
//!
//! Validate → Transform → Score → Threshold → Rank → Paginate, once per
//! request, stopping at the first failing stage. Nothing partial is ever
//! returned.
//!
//! The transformer and model are shared read-only state: a `ScoringContext`
//! is built once at startup and handed (behind an `Arc`) to every request.

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use super::config::ScoringConfig;
use super::features::FeatureTransformer;
use super::input::{validate, RequiredSchema, Table, Value};
use super::model::{percentile_threshold, BatchScorer, NoveltyModel, Threshold};
use super::ranking::{paginate, rank_records, top_k, PageMeta, RankedRecord};
use super::stats::{ScoringStats, StatsSnapshot};
use crate::constants::TRANSACTION_ID_COLUMN;
use crate::error::{PipelineError, Result};

// ============================================================================
// DATA STRUCTURES
// ============================================================================

/// Point scoring result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointScores {
    /// Number of records scored
    pub n: usize,
    /// Effective k (≤ n)
    pub top_k: usize,
    pub top_index: Vec<usize>,
    pub top_scores: Vec<f64>,
}

/// Page parameters as the caller sent them
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PageQuery {
    pub page: Option<usize>,
    pub page_size: Option<usize>,
    pub percentile: Option<f64>,
}

/// Identifier carried through from the input for display
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordId {
    pub id: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedPageMeta {
    #[serde(flatten)]
    pub page: PageMeta,
    /// Anomalies across the whole upload, not just this page
    pub total_anomalies: usize,
}

/// One page of the ranked upload
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedPage {
    pub meta: RankedPageMeta,
    pub threshold: Threshold,
    pub records: Vec<RankedRecord<RecordId>>,
}

// ============================================================================
// SCORING CONTEXT
// ============================================================================

/// Immutable per-process scoring state
pub struct ScoringContext {
    schema: RequiredSchema,
    id_column: Option<String>,
    transformer: Arc<dyn FeatureTransformer>,
    model: Arc<dyn NoveltyModel>,
    scorer: BatchScorer,
    config: ScoringConfig,
    stats: ScoringStats,
}

impl ScoringContext {
    /// Context over the transaction schema with `BELNR` as identifier.
    pub fn new(
        transformer: Arc<dyn FeatureTransformer>,
        model: Arc<dyn NoveltyModel>,
        config: ScoringConfig,
    ) -> Result<Self> {
        if transformer.n_features() != model.n_features() {
            return Err(PipelineError::invalid_parameter(
                "model",
                format!(
                    "transformer produces {} features, model expects {}",
                    transformer.n_features(),
                    model.n_features()
                ),
            ));
        }
        if config.max_rows == 0 {
            return Err(PipelineError::invalid_parameter("max_rows", "must be at least 1"));
        }

        Ok(Self {
            schema: RequiredSchema::transaction(),
            id_column: Some(TRANSACTION_ID_COLUMN.to_string()),
            transformer,
            model,
            scorer: BatchScorer::new(config.batch_size)?,
            config,
            stats: ScoringStats::default(),
        })
    }

    pub fn with_schema(mut self, schema: RequiredSchema) -> Self {
        self.schema = schema;
        self
    }

    pub fn with_id_column(mut self, column: Option<&str>) -> Self {
        self.id_column = column.map(str::to_string);
        self
    }

    pub fn schema(&self) -> &RequiredSchema {
        &self.schema
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Validate → Transform → Score; one anomaly score per input row.
    pub fn score_table(&self, table: &Table) -> Result<Vec<f64>> {
        self.observe(|| {
            let scores = self.run_scoring(table)?;
            let rows = scores.len();
            Ok((scores, rows))
        })
    }

    /// Highest-scoring `top_k` records (default from config, capped at n).
    pub fn score_points(&self, table: &Table, top_k_requested: Option<usize>) -> Result<PointScores> {
        self.observe(|| {
            let k = match top_k_requested {
                None => self.config.default_top_k,
                Some(0) => return Err(PipelineError::invalid_parameter("top_k", "must be at least 1")),
                Some(k) => k,
            };

            let scores = self.run_scoring(table)?;
            let k = k.min(scores.len());
            let (top_index, top_scores) = top_k(&scores, k);

            log::info!("Point scoring: {} records, top {}", scores.len(), k);

            let rows = scores.len();
            Ok((
                PointScores {
                    n: rows,
                    top_k: k,
                    top_index,
                    top_scores,
                },
                rows,
            ))
        })
    }

    /// Score the whole upload, then return one page of the global ranking.
    ///
    /// Parameters are checked before any stage runs; the threshold and
    /// totals always come from the full score set.
    pub fn score_ranked_page(&self, table: &Table, query: &PageQuery) -> Result<RankedPage> {
        self.observe(|| {
            let percentile = self.config.threshold.resolve(query.percentile)?;
            let request = self.config.pages.request(query.page, query.page_size)?;

            let scores = self.run_scoring(table)?;
            let threshold = percentile_threshold(&scores, percentile)?;

            let ids = self.identifiers(table);
            let ranked = rank_records(&ids, &scores, &threshold);
            let total_anomalies = ranked.iter().filter(|r| r.is_anomaly).count();

            let (window, page) = paginate(&ranked, request)?;

            log::info!(
                "Ranked upload: {} rows, p{} threshold {:.6}, {} anomalies, page {}/{}",
                page.total_rows,
                threshold.percentile,
                threshold.value,
                total_anomalies,
                page.page,
                page.total_pages
            );

            Ok((
                RankedPage {
                    meta: RankedPageMeta { page, total_anomalies },
                    threshold,
                    records: window.to_vec(),
                },
                scores.len(),
            ))
        })
    }

    /// Run one request and record its outcome exactly once.
    ///
    /// `op` returns the result together with the number of rows scored.
    fn observe<T>(&self, op: impl FnOnce() -> Result<(T, usize)>) -> Result<T> {
        let start = Instant::now();

        match op() {
            Ok((value, rows)) => {
                self.stats.record_success(rows, start.elapsed());
                Ok(value)
            }
            Err(e) => {
                self.stats.record_failure();
                if e.is_client_error() {
                    log::warn!("Scoring rejected: {}", e);
                } else {
                    log::error!("Scoring failed: {}", e);
                }
                Err(e)
            }
        }
    }

    fn run_scoring(&self, table: &Table) -> Result<Vec<f64>> {
        if table.len() > self.config.max_rows {
            return Err(PipelineError::TooManyRows {
                limit: self.config.max_rows,
                got: table.len(),
            });
        }

        let batch = validate(table, &self.schema)?;

        let stage = Instant::now();
        let features = self.transformer.transform(&batch)?;
        if features.nrows() != batch.len() {
            return Err(PipelineError::Transform(format!(
                "transform returned {} rows for {} records",
                features.nrows(),
                batch.len()
            )));
        }
        log::debug!(
            "Transformed {} rows → {} features in {} ms",
            features.nrows(),
            features.ncols(),
            stage.elapsed().as_millis()
        );

        self.scorer.score(self.model.as_ref(), features.view())
    }

    fn identifiers(&self, table: &Table) -> Vec<RecordId> {
        let column = self.id_column.as_deref().and_then(|c| table.column_index(c));
        table
            .rows()
            .iter()
            .map(|row| RecordId {
                id: column.map(|i| row[i].clone()).unwrap_or(Value::Null),
            })
            .collect()
    }
}
