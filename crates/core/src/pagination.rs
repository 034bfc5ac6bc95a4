//! Page-window arithmetic for paginated list endpoints.
//!
//! Pure, no I/O. The window is computed from the total row count so that
//! `begin` never points past the end of the table.

use serde::{Deserialize, Serialize};

/// Page size used when neither the caller nor configuration provides one.
pub const DEFAULT_PAGE_SIZE: i64 = 10;

/// Query parameters accepted by paginated list endpoints.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageQuery {
    /// 1-based page number.
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

/// The resolved page window, echoed back to callers alongside the rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageWindow {
    /// 1-based page number actually used.
    pub start: i64,
    pub size: i64,
    /// Zero-based row offset of the first row on the page.
    pub begin: i64,
    pub total: i64,
    pub total_pages: i64,
}

impl PageWindow {
    /// SQL `LIMIT` for this window.
    pub fn limit(&self) -> i64 {
        self.size
    }

    /// SQL `OFFSET` for this window.
    pub fn offset(&self) -> i64 {
        self.begin
    }
}

/// Compute the page window for `total` rows.
///
/// - A missing or non-positive page is treated as page 1.
/// - A missing or non-positive size falls back to `default_size` (itself
///   floored at 1).
/// - `begin = (page - 1) * size`, clamped to `[0, total]`.
/// - `total_pages = ceil(total / size)`, 0 when there are no rows.
pub fn page_window(total: i64, query: &PageQuery, default_size: i64) -> PageWindow {
    let total = total.max(0);
    let start = query.page.filter(|p| *p >= 1).unwrap_or(1);
    let size = query
        .page_size
        .filter(|s| *s >= 1)
        .unwrap_or_else(|| default_size.max(1));

    let begin = (start - 1).saturating_mul(size).clamp(0, total);
    let total_pages = total / size + i64::from(total % size != 0);

    PageWindow {
        start,
        size,
        begin,
        total,
        total_pages,
    }
}
