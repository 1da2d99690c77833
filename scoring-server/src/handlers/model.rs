//! Model status handler

use axum::{extract::State, Json};

use crate::models::ModelStatus;
use crate::AppState;

/// Loaded bundle metadata plus scoring counters
pub async fn info(State(state): State<AppState>) -> Json<ModelStatus> {
    let scoring = state.context.config();
    Json(ModelStatus {
        model: (*state.model).clone(),
        stats: state.context.stats(),
        batch_size: scoring.batch_size,
        max_rows: scoring.max_rows,
        serialized_scoring: state.config.serialize_scoring,
    })
}
