//! Input Module - Tabular records and schema validation

pub mod table;
pub mod schema;

pub use table::{Table, Value};
pub use schema::{validate, RequiredSchema, ValidatedBatch, NUMERIC_FALLBACK};
