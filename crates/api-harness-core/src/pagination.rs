//! Offset/limit pagination for endpoint listings.

use serde::Serialize;

use crate::query::QueryError;

pub const DEFAULT_LIMIT: i64 = 10;
pub const MAX_LIMIT: i64 = 100;

/// Validated page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub limit: usize,
    pub offset: usize,
}

impl PageRequest {
    /// Validate raw caller arguments. `limit` must be in `[1, 100]` and
    /// `offset` must be non-negative; missing values take the defaults
    /// (`10`, `0`).
    pub fn new(limit: Option<i64>, offset: Option<i64>) -> Result<Self, QueryError> {
        let limit = limit.unwrap_or(DEFAULT_LIMIT);
        let offset = offset.unwrap_or(0);
        if !(1..=MAX_LIMIT).contains(&limit) {
            return Err(QueryError::InvalidPagination(format!(
                "limit must be between 1 and {}, got {}",
                MAX_LIMIT, limit
            )));
        }
        if offset < 0 {
            return Err(QueryError::InvalidPagination(format!(
                "offset must be >= 0, got {}",
                offset
            )));
        }
        Ok(Self {
            limit: limit as usize,
            offset: offset as usize,
        })
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT as usize,
            offset: 0,
        }
    }
}

/// Pagination metadata returned next to a page of items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
    pub has_next: bool,
    pub has_previous: bool,
}

/// Slice `items` to `[offset, offset + limit)`, clamped to the end.
pub fn paginate<T: Clone>(items: &[T], page: PageRequest) -> (Vec<T>, Pagination) {
    let total = items.len();
    let start = page.offset.min(total);
    let end = page.offset.saturating_add(page.limit).min(total);
    let slice = items[start..end].to_vec();
    let pagination = Pagination {
        total,
        limit: page.limit,
        offset: page.offset,
        has_next: page.offset.saturating_add(page.limit) < total,
        has_previous: page.offset > 0,
    };
    (slice, pagination)
}
