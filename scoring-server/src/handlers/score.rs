//! Scoring handlers
//!
//! Parsing and the pipeline are CPU-bound, so both run on the blocking pool.

use axum::{
    extract::{Multipart, Query, State},
    Json,
};
use tracing::Instrument;
use uuid::Uuid;
use validator::Validate;

use scoring_core::{PageQuery, PointScores, RankedPage, Table};

use crate::models::{ScoreCsvQuery, ScoreRequest};
use crate::{AppError, AppResult, AppState};

/// Multipart field carrying the CSV upload
const UPLOAD_FIELD: &str = "file";

/// Score JSON records, return the top-k indices
pub async fn score_points(
    State(state): State<AppState>,
    Json(req): Json<ScoreRequest>,
) -> AppResult<Json<PointScores>> {
    req.validate()?;

    let request_id = Uuid::new_v4();
    let span = tracing::info_span!("score", %request_id, records = req.records.len());

    async move {
        let context = state.context.clone();
        let blocking_span = tracing::Span::current();

        let result = tokio::task::spawn_blocking(move || {
            let _guard = blocking_span.enter();
            let table = Table::from_json_records(&req.records)?;
            context.score_points(&table, req.top_k)
        })
        .await??;

        tracing::info!(n = result.n, top_k = result.top_k, "Point scoring complete");
        Ok::<_, AppError>(Json(result))
    }
    .instrument(span)
    .await
}

/// Score an uploaded CSV, return one page of the global ranking
pub async fn score_csv(
    State(state): State<AppState>,
    Query(query): Query<ScoreCsvQuery>,
    mut multipart: Multipart,
) -> AppResult<Json<RankedPage>> {
    query.validate()?;

    let request_id = Uuid::new_v4();
    let span = tracing::info_span!("score_csv", %request_id);

    async move {
        let mut upload = None;
        while let Some(field) = multipart.next_field().await? {
            if field.name() == Some(UPLOAD_FIELD) {
                upload = Some(field.bytes().await?);
                break;
            }
        }
        let bytes = upload.ok_or_else(|| {
            AppError::ValidationError(format!("multipart field '{}' is required", UPLOAD_FIELD))
        })?;

        tracing::debug!(bytes = bytes.len(), "Upload received");

        let context = state.context.clone();
        let page_query = PageQuery::from(&query);
        let blocking_span = tracing::Span::current();

        let page = tokio::task::spawn_blocking(move || {
            let _guard = blocking_span.enter();
            let table = Table::from_csv(&bytes)?;
            context.score_ranked_page(&table, &page_query)
        })
        .await??;

        tracing::info!(
            rows = page.meta.page.total_rows,
            anomalies = page.meta.total_anomalies,
            page = page.meta.page.page,
            "Batch scoring complete"
        );
        Ok::<_, AppError>(Json(page))
    }
    .instrument(span)
    .await
}
