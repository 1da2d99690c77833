//! Scoring Core - Anomaly scoring for tabular accounting records
//!
//! Records go through validate → transform → score → threshold → rank →
//! paginate. Everything here is synchronous and transport-agnostic; the
//! HTTP surface lives in `scoring-server`.

pub mod constants;
pub mod error;
pub mod logic;

pub use error::{BundleError, PipelineError, Result};
pub use logic::config::ScoringConfig;
pub use logic::input::{RequiredSchema, Table, Value};
pub use logic::model::{LoadedModel, ModelBundle, ModelInfo, NoveltyModel, SerializedModel, Threshold};
pub use logic::pipeline::{PageQuery, PointScores, RankedPage, RankedPageMeta, RecordId, ScoringContext};
pub use logic::stats::StatsSnapshot;
