//! Table - Variable-width tabular input
//!
//! JSON record lists and CSV uploads both land here: an ordered list of
//! column names plus rows of scalar values. Nothing is coerced yet; that is
//! the schema validator's job.

use std::borrow::Cow;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

// ============================================================================
// VALUE
// ============================================================================

/// Scalar cell value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Number(f64),
    Text(String),
    Null,
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Numeric reading of the cell, `None` when it cannot be parsed.
    pub fn as_number(&self) -> Option<f64> {
        let parsed = match self {
            Value::Number(n) => Some(*n),
            Value::Text(s) => s.trim().parse::<f64>().ok(),
            Value::Null => None,
        };
        parsed.filter(|n| n.is_finite())
    }

    /// Key used to look the cell up in a learned category list.
    ///
    /// Integral numbers render without a fractional part so that `40` from
    /// JSON and `"40"` from CSV hit the same category.
    pub fn category_key(&self) -> Option<Cow<'_, str>> {
        match self {
            Value::Text(s) => Some(Cow::Borrowed(s.trim())),
            Value::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                Some(Cow::Owned(format!("{}", *n as i64)))
            }
            Value::Number(n) => Some(Cow::Owned(n.to_string())),
            Value::Null => None,
        }
    }

    fn from_json(column: &str, value: &serde_json::Value) -> Result<Self> {
        match value {
            serde_json::Value::Null => Ok(Value::Null),
            serde_json::Value::Bool(b) => Ok(Value::Text(b.to_string())),
            serde_json::Value::Number(n) => n
                .as_f64()
                .map(Value::Number)
                .ok_or_else(|| PipelineError::Parse(format!("field '{}' is not a valid number", column))),
            serde_json::Value::String(s) => Ok(Value::Text(s.clone())),
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => Err(PipelineError::Parse(
                format!("field '{}' must be a scalar value", column),
            )),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

// ============================================================================
// TABLE
// ============================================================================

/// Ordered columns + rows of values
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    /// Build a table, checking that every row matches the header width.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Result<Self> {
        if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != columns.len()) {
            return Err(PipelineError::Parse(format!(
                "row {} has {} fields, expected {}",
                i,
                row.len(),
                columns.len()
            )));
        }
        Ok(Self { columns, rows })
    }

    /// Parse a CSV document with a header row.
    ///
    /// Empty cells become `Value::Null`; everything else stays text until
    /// the schema validator coerces it.
    pub fn from_csv(bytes: &[u8]) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(bytes);

        let headers = reader
            .headers()
            .map_err(|e| PipelineError::Parse(format!("CSV header: {}", e)))?
            .clone();

        let columns: Vec<String> = headers
            .iter()
            .enumerate()
            .map(|(i, h)| {
                if i == 0 {
                    h.trim_start_matches('\u{feff}').to_string()
                } else {
                    h.to_string()
                }
            })
            .collect();

        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result.map_err(|e| PipelineError::Parse(format!("CSV: {}", e)))?;
            rows.push(
                record
                    .iter()
                    .map(|field| {
                        if field.is_empty() {
                            Value::Null
                        } else {
                            Value::Text(field.to_string())
                        }
                    })
                    .collect(),
            );
        }

        log::debug!("Parsed CSV upload: {} columns, {} rows", columns.len(), rows.len());
        Ok(Self { columns, rows })
    }

    /// Build a table from JSON objects.
    ///
    /// The column set is the union of all keys in first-seen order; a key
    /// absent from a record reads as null.
    pub fn from_json_records(records: &[serde_json::Map<String, serde_json::Value>]) -> Result<Self> {
        let mut columns: Vec<String> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();

        for record in records {
            for key in record.keys() {
                if !index.contains_key(key) {
                    index.insert(key.clone(), columns.len());
                    columns.push(key.clone());
                }
            }
        }

        let mut rows = Vec::with_capacity(records.len());
        for record in records {
            let mut row = vec![Value::Null; columns.len()];
            for (key, value) in record {
                row[index[key]] = Value::from_json(key, value)?;
            }
            rows.push(row);
        }

        Ok(Self { columns, rows })
    }

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

    /// Position of the first column with this name
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }
}
