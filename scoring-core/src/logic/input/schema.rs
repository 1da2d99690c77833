//! Schema Validation - Required-column contract + numeric coercion
//!
//! ## Policy
//! - Any required column missing → reject the whole batch, never partial.
//! - Unparsable numeric cell → 0.0. This is a business rule, not an error.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::table::{Table, Value};
use crate::constants::{TRANSACTION_COLUMNS, TRANSACTION_NUMERIC_COLUMNS};
use crate::error::{PipelineError, Result};

/// Value substituted for numeric cells that cannot be parsed
pub const NUMERIC_FALLBACK: f64 = 0.0;

/// Columns the pipeline needs and which of them are numeric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequiredSchema {
    columns: Vec<String>,
    numeric: Vec<String>,
}

impl RequiredSchema {
    /// Numeric columns that are not also listed as required are added
    /// to the required set.
    pub fn new<S: AsRef<str>>(columns: &[S], numeric: &[S]) -> Self {
        let mut columns: Vec<String> = columns.iter().map(|c| c.as_ref().to_string()).collect();
        let numeric: Vec<String> = numeric.iter().map(|c| c.as_ref().to_string()).collect();
        for col in &numeric {
            if !columns.contains(col) {
                columns.push(col.clone());
            }
        }
        Self { columns, numeric }
    }

    /// Accounting-document schema used by the transaction model
    pub fn transaction() -> Self {
        Self::new(TRANSACTION_COLUMNS, TRANSACTION_NUMERIC_COLUMNS)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn is_numeric(&self, column: &str) -> bool {
        self.numeric.iter().any(|c| c == column)
    }

    /// Required columns absent from `present`, sorted alphabetically
    pub fn missing_columns<S: AsRef<str>>(&self, present: &[S]) -> Vec<String> {
        let present: BTreeSet<&str> = present.iter().map(|c| c.as_ref()).collect();
        let missing: BTreeSet<&str> = self
            .columns
            .iter()
            .map(String::as_str)
            .filter(|c| !present.contains(c))
            .collect();
        missing.into_iter().map(str::to_string).collect()
    }
}

impl Default for RequiredSchema {
    fn default() -> Self {
        Self::transaction()
    }
}

/// Rows restricted to the required columns, numeric cells coerced
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedBatch {
    columns: Vec<String>,
    numeric: Vec<bool>,
    rows: Vec<Vec<Value>>,
}

impl ValidatedBatch {
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn is_numeric(&self, index: usize) -> bool {
        self.numeric.get(index).copied().unwrap_or(false)
    }
}

/// Check `table` against `schema` and coerce its numeric columns.
pub fn validate(table: &Table, schema: &RequiredSchema) -> Result<ValidatedBatch> {
    let missing = schema.missing_columns(table.columns());
    if !missing.is_empty() {
        log::warn!("Rejecting batch: missing required columns {:?}", missing);
        return Err(PipelineError::MissingColumns { columns: missing });
    }

    if table.is_empty() {
        return Err(PipelineError::EmptyInput);
    }

    // Every required column is present, so each lookup succeeds.
    let sources: Vec<usize> = schema
        .columns()
        .iter()
        .filter_map(|c| table.column_index(c))
        .collect();
    let numeric: Vec<bool> = schema.columns().iter().map(|c| schema.is_numeric(c)).collect();

    let mut coerced = 0usize;
    let rows = table
        .rows()
        .iter()
        .map(|row| {
            sources
                .iter()
                .zip(&numeric)
                .map(|(&src, &is_numeric)| {
                    let cell = &row[src];
                    if !is_numeric {
                        return cell.clone();
                    }
                    match cell.as_number() {
                        Some(n) => Value::Number(n),
                        None => {
                            coerced += 1;
                            Value::Number(NUMERIC_FALLBACK)
                        }
                    }
                })
                .collect()
        })
        .collect();

    if coerced > 0 {
        log::debug!("Coerced {} unparsable numeric cells to {}", coerced, NUMERIC_FALLBACK);
    }

    Ok(ValidatedBatch {
        columns: schema.columns().to_vec(),
        numeric,
        rows,
    })
}
