//! Ledger Anomaly Scoring Server
//!
//! HTTP front for the scoring pipeline.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    SCORING SERVER                           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌───────────┐  ┌───────────────┐  ┌─────────────────────┐  │
//! │  │  Router   │─▶│ spawn_blocking│─▶│  ScoringContext     │  │
//! │  │  (Axum)   │  │  (per request)│  │  (Arc, read-only)   │  │
//! │  └───────────┘  └───────────────┘  └──────────┬──────────┘  │
//! │                                               ▼             │
//! │                                     ┌──────────────────┐    │
//! │                                     │  Model bundle    │    │
//! │                                     │  (loaded once)   │    │
//! │                                     └──────────────────┘    │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod handlers;
pub mod models;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use scoring_core::logic::model::LocalOutlierFactor;
use scoring_core::{LoadedModel, ModelInfo, NoveltyModel, PipelineError, ScoringContext, SerializedModel};

pub use config::Config;
pub use error::{AppError, AppResult};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub context: Arc<ScoringContext>,
    pub model: Arc<ModelInfo>,
    pub config: Config,
}

impl AppState {
    /// Build the scoring context around a loaded bundle.
    pub fn new(config: Config, loaded: LoadedModel) -> Result<Self, PipelineError> {
        let info = loaded.info();
        let bundle = loaded.bundle;

        let model: Arc<dyn NoveltyModel> = if config.serialize_scoring {
            tracing::info!("Model calls serialized behind a single lock");
            Arc::new(SerializedModel::<LocalOutlierFactor>::new(bundle.lof))
        } else {
            Arc::new(bundle.lof)
        };

        let context = ScoringContext::new(Arc::new(bundle.feature_pipe), model, config.scoring_config())?;

        Ok(Self {
            context: Arc::new(context),
            model: Arc::new(info),
            config,
        })
    }
}

/// Create the main router with all routes
pub fn create_router(state: AppState) -> Router {
    let cors = if state.config.allowed_origins.is_empty() {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .allowed_origins
            .iter()
            .filter_map(|o| match o.parse() {
                Ok(v) => Some(v),
                Err(_) => {
                    tracing::warn!("Ignoring invalid CORS origin: {}", o);
                    None
                }
            })
            .collect();
        CorsLayer::new().allow_origin(AllowOrigin::list(origins))
    };
    let cors = cors.allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health::check))
        .route("/model", get(handlers::model::info))
        .route("/score", post(handlers::score::score_points))
        .route("/score_csv", post(handlers::score::score_csv))
        .layer(DefaultBodyLimit::max(state.config.max_upload_bytes))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
