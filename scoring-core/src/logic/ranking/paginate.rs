//! Paginator - Windows over the full ranked sequence
//!
//! Pages past the end are errors; nothing is clamped or wrapped.

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_MAX_PAGE_SIZE, DEFAULT_PAGE_SIZE};
use crate::error::{PipelineError, Result};

/// Bounds for page requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageConfig {
    pub default_page_size: usize,
    pub max_page_size: usize,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
        }
    }
}

/// A checked page request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: usize,
    pub page_size: usize,
}

impl PageConfig {
    /// Fill defaults and check bounds; does not know the row count yet.
    pub fn request(&self, page: Option<usize>, page_size: Option<usize>) -> Result<PageRequest> {
        let page = page.unwrap_or(1);
        let page_size = page_size.unwrap_or(self.default_page_size);

        if page < 1 {
            return Err(PipelineError::invalid_parameter("page", "must be at least 1"));
        }
        if page_size < 1 || page_size > self.max_page_size {
            return Err(PipelineError::invalid_parameter(
                "page_size",
                format!("must be between 1 and {}, got {}", self.max_page_size, page_size),
            ));
        }

        Ok(PageRequest { page, page_size })
    }
}

/// Pagination metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMeta {
    pub page: usize,
    pub page_size: usize,
    pub total_rows: usize,
    pub total_pages: usize,
}

/// `ceil(total_rows / page_size)`, never less than 1
pub fn total_pages(total_rows: usize, page_size: usize) -> usize {
    total_rows.div_ceil(page_size).max(1)
}

/// Slice `[(page-1)*page_size, page*page_size)` out of `items`.
pub fn paginate<T>(items: &[T], request: PageRequest) -> Result<(&[T], PageMeta)> {
    let PageRequest { page, page_size } = request;
    if page < 1 || page_size < 1 {
        return Err(PipelineError::invalid_parameter(
            "page",
            "page and page_size must be at least 1",
        ));
    }

    let total_rows = items.len();
    let total_pages = total_pages(total_rows, page_size);
    if page > total_pages {
        return Err(PipelineError::PageOutOfRange { page, total_pages });
    }

    let start = ((page - 1) * page_size).min(total_rows);
    let end = (page * page_size).min(total_rows);

    Ok((
        &items[start..end],
        PageMeta {
            page,
            page_size,
            total_rows,
            total_pages,
        },
    ))
}
