//! Ranking Module - Ordering and pagination of scored records

pub mod rank;
pub mod paginate;

pub use rank::{rank_indices, rank_records, top_k, RankedRecord};
pub use paginate::{paginate, total_pages, PageConfig, PageMeta, PageRequest};
