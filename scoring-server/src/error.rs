//! Error handling

use axum::{
    response::{IntoResponse, Response},
    http::StatusCode,
    Json,
};
use scoring_core::PipelineError;
use serde_json::{json, Map, Value};
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    // Pipeline errors
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    // Validation errors
    #[error("{0}")]
    ValidationError(String),

    // Generic errors
    #[error("{0}")]
    InternalError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut extra = Map::new();

        let (status, error_message) = match &self {
            AppError::Pipeline(err) => match err {
                PipelineError::MissingColumns { columns } => {
                    extra.insert("missing_columns".into(), json!(columns));
                    (StatusCode::BAD_REQUEST, err.to_string())
                }
                PipelineError::PageOutOfRange { page, total_pages } => {
                    extra.insert("page".into(), json!(page));
                    extra.insert("total_pages".into(), json!(total_pages));
                    (StatusCode::BAD_REQUEST, err.to_string())
                }
                PipelineError::InvalidParameter { name, .. } => {
                    extra.insert("parameter".into(), json!(name));
                    (StatusCode::BAD_REQUEST, err.to_string())
                }
                PipelineError::TooManyRows { limit, got } => {
                    extra.insert("limit".into(), json!(limit));
                    extra.insert("rows".into(), json!(got));
                    (StatusCode::PAYLOAD_TOO_LARGE, err.to_string())
                }
                PipelineError::Parse(_) | PipelineError::EmptyInput => {
                    (StatusCode::BAD_REQUEST, err.to_string())
                }
                PipelineError::Transform(_) | PipelineError::Scoring(_) => {
                    tracing::error!("Scoring pipeline error: {}", err);
                    (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
                }
            },
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        let mut body = Map::new();
        body.insert("error".into(), Value::String(error_message));
        body.insert("status".into(), json!(status.as_u16()));
        body.extend(extra);

        (status, Json(Value::Object(body))).into_response()
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::ValidationError(err.to_string())
    }
}

impl From<axum::extract::multipart::MultipartError> for AppError {
    fn from(err: axum::extract::multipart::MultipartError) -> Self {
        AppError::ValidationError(err.body_text())
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::InternalError(format!("scoring task failed: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_of(PipelineError::EmptyInput.into()), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_of(PipelineError::TooManyRows { limit: 1, got: 2 }.into()),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            status_of(PipelineError::Scoring("nan".into()).into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_of(AppError::ValidationError("bad".into())),
            StatusCode::BAD_REQUEST
        );
    }
}
