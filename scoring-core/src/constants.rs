//! Central Configuration Constants
//!
//! Single source of truth for pipeline defaults and the transaction schema.

/// Rows scored per model invocation
pub const DEFAULT_BATCH_SIZE: usize = 5000;

/// Upper bound on rows accepted in a single request
pub const DEFAULT_MAX_ROWS: usize = 1_000_000;

pub const DEFAULT_PAGE_SIZE: usize = 20;
pub const DEFAULT_MAX_PAGE_SIZE: usize = 100;

/// Default anomaly percentile
pub const DEFAULT_PERCENTILE: f64 = 95.0;
pub const MIN_PERCENTILE: f64 = 50.0;
pub const MAX_PERCENTILE: f64 = 99.9;

/// Default number of indices returned by point scoring
pub const DEFAULT_TOP_K: usize = 10;

// ============================================
// Transaction schema
// ============================================

/// Columns the feature pipeline needs, in model order
pub const TRANSACTION_COLUMNS: &[&str] = &[
    "PRCTR", // profit center
    "BSCHL", // posting key
    "HKONT", // G/L account
    "WAERS", // currency
    "BUKRS", // company code
    "KTOSL", // transaction key
    "DMBTR", // amount in local currency
    "WRBTR", // amount in document currency
];

/// Subset of `TRANSACTION_COLUMNS` coerced to numbers
pub const TRANSACTION_NUMERIC_COLUMNS: &[&str] = &["DMBTR", "WRBTR"];

/// Document number, carried through for display only
pub const TRANSACTION_ID_COLUMN: &str = "BELNR";
