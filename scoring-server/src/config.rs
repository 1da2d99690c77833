//! Configuration module

use std::env;
use std::str::FromStr;

use scoring_core::constants::{DEFAULT_BATCH_SIZE, DEFAULT_MAX_PAGE_SIZE, DEFAULT_MAX_ROWS};
use scoring_core::logic::ranking::PageConfig;
use scoring_core::ScoringConfig;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,

    /// Path to the JSON model bundle
    pub model_path: String,

    /// Expected SHA-256 of the bundle file (hex)
    pub model_sha256: Option<String>,

    /// Rows per model invocation
    pub batch_size: usize,

    /// Rows accepted per request
    pub max_rows: usize,

    pub max_page_size: usize,

    /// Request body limit in bytes
    pub max_upload_bytes: usize,

    /// CORS origins; empty allows any
    pub allowed_origins: Vec<String>,

    /// Run every model call under one lock
    pub serialize_scoring: bool,

    /// Emit JSON log lines
    pub log_json: bool,

    /// Environment (development, production)
    pub environment: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8000,
            model_path: "model/demo_bundle.json".to_string(),
            model_sha256: None,
            batch_size: DEFAULT_BATCH_SIZE,
            max_rows: DEFAULT_MAX_ROWS,
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
            max_upload_bytes: 50 * 1024 * 1024,
            allowed_origins: Vec::new(),
            serialize_scoring: false,
            log_json: false,
            environment: "development".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            port: parse_var("PORT", defaults.port),

            model_path: env::var("MODEL_PATH").unwrap_or(defaults.model_path),

            model_sha256: env::var("MODEL_SHA256")
                .ok()
                .filter(|s| !s.trim().is_empty()),

            batch_size: parse_var("BATCH_SIZE", defaults.batch_size),

            max_rows: parse_var("MAX_ROWS", defaults.max_rows),

            max_page_size: parse_var("MAX_PAGE_SIZE", defaults.max_page_size),

            max_upload_bytes: parse_var("MAX_UPLOAD_BYTES", defaults.max_upload_bytes),

            allowed_origins: env::var("ALLOWED_ORIGINS")
                .map(|v| parse_list(&v))
                .unwrap_or_default(),

            serialize_scoring: env::var("SERIALIZE_SCORING")
                .map(|v| parse_flag(&v))
                .unwrap_or(defaults.serialize_scoring),

            log_json: env::var("LOG_FORMAT")
                .map(|v| v.trim().eq_ignore_ascii_case("json"))
                .unwrap_or(defaults.log_json),

            environment: env::var("ENVIRONMENT").unwrap_or(defaults.environment),
        }
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Pipeline limits derived from this configuration
    pub fn scoring_config(&self) -> ScoringConfig {
        let defaults = ScoringConfig::default();
        ScoringConfig {
            batch_size: self.batch_size,
            max_rows: self.max_rows,
            pages: PageConfig {
                max_page_size: self.max_page_size,
                default_page_size: defaults.pages.default_page_size.min(self.max_page_size),
            },
            ..defaults
        }
    }
}

fn parse_var<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}
