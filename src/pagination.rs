//! Offset pagination over filtered queries
//!
//! [`paginate`] runs exactly two reads: a count sharing the criteria's filter
//! predicate, then a bounded fetch in the criteria's sort order. The two reads
//! are not transactionally consistent with each other; a concurrent write may
//! skew `total_records` against the visible page, which is accepted.

use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgRow, FromRow, PgPool, Postgres, QueryBuilder};

use crate::{error::Result, query::QueryCriteria};

/// Default number of items per page
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Maximum allowed items per page
pub const MAX_PAGE_SIZE: u32 = 100;

/// Requested page bounds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct PageParams {
    /// Page number (1-indexed). None defaults to 1.
    pub page: Option<u32>,

    /// Items per page. None defaults to DEFAULT_PAGE_SIZE.
    pub page_size: Option<u32>,
}

impl PageParams {
    /// Create page params from raw request values
    #[must_use]
    pub fn new(page: Option<u32>, page_size: Option<u32>) -> Self {
        Self { page, page_size }
    }

    /// Get the 1-indexed page number, defaulting to 1
    #[must_use]
    pub fn page_number(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    /// Get the page size, clamped to 1..=MAX_PAGE_SIZE
    #[must_use]
    pub fn page_size(&self) -> u32 {
        self.page_size
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE)
    }

    /// Rows to skip: (page - 1) * page_size
    #[must_use]
    pub fn offset(&self) -> u64 {
        u64::from(self.page_number().saturating_sub(1)) * u64::from(self.page_size())
    }
}

/// Page metadata returned alongside the rows
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMeta {
    /// 1-indexed page that was fetched
    pub current_page: u32,
    /// Requested page size (not the row count actually returned)
    pub page_size: u32,
    /// Total pages for the filtered set, floored to 1 when empty
    pub total_pages: u32,
    /// Total rows matching the filter predicate
    pub total_records: u64,
    /// Whether a later page exists
    pub has_next: bool,
    /// Whether an earlier page exists
    pub has_prev: bool,
}

impl PageMeta {
    /// Compute metadata from the count query result
    #[must_use]
    pub fn new(current_page: u32, page_size: u32, total_records: u64) -> Self {
        let total_pages = total_records
            .div_ceil(u64::from(page_size.max(1)))
            .max(1)
            .min(u64::from(u32::MAX)) as u32;

        Self {
            current_page,
            page_size,
            total_pages,
            total_records,
            has_next: current_page < total_pages,
            has_prev: current_page > 1,
        }
    }
}

/// One page of rows plus its metadata
#[derive(Debug, Clone, Serialize)]
pub struct Paginated<T> {
    /// The fetched rows, at most `page_size` of them
    pub data: Vec<T>,
    /// Page metadata computed from the count query
    pub pagination: PageMeta,
}

/// Fetch one page of `table` matching `criteria`
///
/// Any error from either read aborts the operation; no partial response is
/// produced.
pub async fn paginate<T>(
    pool: &PgPool,
    table: &str,
    criteria: &QueryCriteria,
    params: &PageParams,
) -> Result<Paginated<T>>
where
    T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
{
    let mut count_query = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM ");
    count_query.push(table);
    criteria.push_where(&mut count_query);

    let total_records: i64 = count_query.build_query_scalar().fetch_one(pool).await?;

    let mut fetch_query = QueryBuilder::<Postgres>::new("SELECT * FROM ");
    fetch_query.push(table);
    criteria.push_where(&mut fetch_query);
    criteria.push_order_by(&mut fetch_query);
    fetch_query.push(" LIMIT ");
    fetch_query.push_bind(i64::from(params.page_size()));
    fetch_query.push(" OFFSET ");
    fetch_query.push_bind(params.offset() as i64);

    let data = fetch_query.build_query_as::<T>().fetch_all(pool).await?;

    Ok(Paginated {
        data,
        pagination: PageMeta::new(
            params.page_number(),
            params.page_size(),
            total_records.max(0) as u64,
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_number_defaults_to_one() {
        assert_eq!(PageParams::default().page_number(), 1);
        assert_eq!(PageParams::new(Some(0), None).page_number(), 1);
    }

    #[test]
    fn test_page_size_clamping() {
        assert_eq!(PageParams::default().page_size(), DEFAULT_PAGE_SIZE);
        assert_eq!(PageParams::new(None, Some(0)).page_size(), 1);
        assert_eq!(PageParams::new(None, Some(500)).page_size(), MAX_PAGE_SIZE);
        assert_eq!(PageParams::new(None, Some(25)).page_size(), 25);
    }

    #[test]
    fn test_offset_calculation() {
        assert_eq!(PageParams::new(Some(1), Some(10)).offset(), 0);
        assert_eq!(PageParams::new(Some(2), Some(10)).offset(), 10);
        assert_eq!(PageParams::new(Some(3), Some(50)).offset(), 100);
    }

    #[test]
    fn test_meta_total_pages_rounds_up() {
        let meta = PageMeta::new(1, 10, 101);
        assert_eq!(meta.total_pages, 11);
        assert!(meta.has_next);
        assert!(!meta.has_prev);
    }

    #[test]
    fn test_meta_empty_set_reports_one_page() {
        let meta = PageMeta::new(1, 10, 0);
        assert_eq!(meta.total_pages, 1);
        assert_eq!(meta.total_records, 0);
        assert!(!meta.has_next);
        assert!(!meta.has_prev);
    }

    #[test]
    fn test_meta_exact_multiple() {
        let meta = PageMeta::new(2, 10, 20);
        assert_eq!(meta.total_pages, 2);
        assert!(!meta.has_next);
        assert!(meta.has_prev);
    }

    #[test]
    fn test_meta_middle_page() {
        let meta = PageMeta::new(2, 10, 35);
        assert_eq!(meta.total_pages, 4);
        assert!(meta.has_next);
        assert!(meta.has_prev);
    }

    #[test]
    fn test_meta_serializes_snake_case_keys() {
        let json = serde_json::to_value(PageMeta::new(1, 10, 3)).unwrap();
        assert_eq!(json["current_page"], 1);
        assert_eq!(json["page_size"], 10);
        assert_eq!(json["total_pages"], 1);
        assert_eq!(json["total_records"], 3);
        assert_eq!(json["has_next"], false);
        assert_eq!(json["has_prev"], false);
    }
}
