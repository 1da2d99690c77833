//! Pipeline Error Types
//!
//! Every stage returns `Result<_, PipelineError>`; the service layer decides
//! how each variant maps onto a transport response.

use thiserror::Error;

/// Errors raised by the scoring pipeline.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PipelineError {
    /// Malformed tabular input (bad CSV, nested JSON values, ...)
    #[error("Failed to parse input: {0}")]
    Parse(String),

    #[error("Input contains no records")]
    EmptyInput,

    /// Column names are sorted alphabetically
    #[error("Missing required columns: {columns:?}")]
    MissingColumns { columns: Vec<String> },

    #[error("Invalid parameter: {name} - {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("Too many rows: limit {limit}, got {got}")]
    TooManyRows { limit: usize, got: usize },

    #[error("Feature transform failed: {0}")]
    Transform(String),

    #[error("Scoring failed: {0}")]
    Scoring(String),

    #[error("Page {page} is out of range (total pages: {total_pages})")]
    PageOutOfRange { page: usize, total_pages: usize },
}

impl PipelineError {
    pub fn invalid_parameter(name: &str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.to_string(),
            reason: reason.into(),
        }
    }

    /// True when the caller's input caused the failure.
    ///
    /// Transform and scoring failures are server-side: the model is
    /// deterministic, so retrying the same request cannot succeed.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::Transform(_) | Self::Scoring(_))
    }
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Errors raised while loading a model bundle from disk.
#[derive(Debug, Error)]
pub enum BundleError {
    #[error("Failed to read model bundle {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Model bundle checksum mismatch: expected {expected}, got {actual}")]
    Checksum { expected: String, actual: String },

    #[error("Invalid model bundle: {0}")]
    Format(String),

    #[error("Feature layout mismatch: bundle declares {expected:08x}, transformer hashes to {actual:08x}")]
    Layout { expected: u32, actual: u32 },
}
