//! Feature Layout - Encoded input layout of the transformer
//!
//! The one-hot + numeric layout a feature pipeline was trained on is
//! fingerprinted with CRC32 so a bundle whose transformer and metadata
//! disagree is rejected at load time instead of scoring garbage.
//!
//! ## Rules:
//! 1. Add/remove a column or category → hash changes
//! 2. Reorder columns or categories → hash changes
//! 3. Change the hashing scheme → increment LAYOUT_VERSION

use crc32fast::Hasher;
use serde::{Deserialize, Serialize};

use crate::error::BundleError;

// ============================================================================
// LAYOUT VERSION
// ============================================================================

/// Current layout hashing scheme
pub const LAYOUT_VERSION: u8 = 1;

const CATEGORICAL_TAG: u8 = b'c';
const NUMERIC_TAG: u8 = b'n';

// ============================================================================
// LAYOUT HASH
// ============================================================================

/// CRC32 over the categorical columns (with their categories) followed by
/// the numeric columns, in encoding order.
pub fn compute_layout_hash<'a, C, N>(categorical: C, numeric: N) -> u32
where
    C: IntoIterator<Item = (&'a str, &'a [String])>,
    N: IntoIterator<Item = &'a str>,
{
    let mut hasher = Hasher::new();
    hasher.update(&[LAYOUT_VERSION]);

    for (column, categories) in categorical {
        hasher.update(&[CATEGORICAL_TAG]);
        hasher.update(column.as_bytes());
        hasher.update(&[0]);
        for category in categories {
            hasher.update(category.as_bytes());
            hasher.update(&[0]);
        }
    }

    for column in numeric {
        hasher.update(&[NUMERIC_TAG]);
        hasher.update(column.as_bytes());
        hasher.update(&[0]);
    }

    hasher.finalize()
}

/// Check a declared layout hash against the transformer's own.
pub fn validate_layout(declared: u32, actual: u32) -> Result<(), BundleError> {
    if declared != actual {
        return Err(BundleError::Layout {
            expected: declared,
            actual,
        });
    }
    Ok(())
}

// ============================================================================
// LAYOUT INFO
// ============================================================================

/// Layout summary for status endpoints and logs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutInfo {
    pub version: u8,
    pub hash: u32,
    /// Width after one-hot encoding
    pub encoded_width: usize,
    /// Width of the projected feature vector (F)
    pub feature_count: usize,
    pub categorical_columns: Vec<String>,
    pub numeric_columns: Vec<String>,
}
