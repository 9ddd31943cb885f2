//! Pagination utilities for song listing
//!
//! `page` and `pageSize` arrive as raw query strings. Values that do not
//! parse fall back to the defaults rather than failing the request.

/// Page size used when the client does not ask for one
pub const DEFAULT_PAGE_SIZE: i64 = 10;

/// Largest page size a client may request
pub const MAX_PAGE_SIZE: i64 = 100;

/// Pagination parameters after sanitizing client input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// Current page number (1-indexed)
    pub page: i64,
    /// Rows per page
    pub page_size: i64,
    /// Offset for SQL LIMIT/OFFSET query
    pub offset: i64,
}

/// Parse an integer query parameter, falling back to `default`
pub fn parse_param(raw: Option<&str>, default: i64) -> i64 {
    raw.map(str::trim)
        .filter(|v| !v.is_empty())
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or(default)
}

/// Calculate pagination from the requested page and page size
///
/// `page < 1` becomes 1. `page_size < 1` becomes [`DEFAULT_PAGE_SIZE`], and
/// anything above [`MAX_PAGE_SIZE`] is capped. The page is not clamped to the
/// last page: asking past the end yields an empty result.
///
/// # Examples
/// ```
/// use songbook_api::pagination::calculate_pagination;
///
/// let p = calculate_pagination(3, 10);
/// assert_eq!(p.page, 3);
/// assert_eq!(p.offset, 20);
///
/// // Out-of-range values are sanitized
/// let p = calculate_pagination(0, 1000);
/// assert_eq!(p.page, 1);
/// assert_eq!(p.page_size, 100);
/// ```
pub fn calculate_pagination(requested_page: i64, requested_page_size: i64) -> Pagination {
    let page = requested_page.max(1);
    let page_size = if requested_page_size < 1 {
        DEFAULT_PAGE_SIZE
    } else {
        requested_page_size.min(MAX_PAGE_SIZE)
    };
    let offset = (page - 1).saturating_mul(page_size);

    Pagination {
        page,
        page_size,
        offset,
    }
}

/// Number of pages needed for `total_results` rows
pub fn total_pages(total_results: i64, page_size: i64) -> i64 {
    if page_size < 1 {
        return 0;
    }
    (total_results + page_size - 1) / page_size
}
