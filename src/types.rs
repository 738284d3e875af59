use serde::{Deserialize, Serialize};

/// Page size used when a paginated call sets no limit.
pub const DEFAULT_PAGE_SIZE: u64 = 10;

/// One page of items plus the metadata derived from the request and the
/// server's total count.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageResult<T> {
    pub data: Vec<T>,
    pub pagination: Pagination,
}

/// Page metadata. `page_size` and `limit` are the effective page size.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub total_count: u64,
    pub skip: u64,
    pub limit: u64,
    pub current_page: u64,
    pub page_size: u64,
    pub total_pages: u64,
}

impl Pagination {
    /// Derives page metadata. A missing or zero `limit` falls back to
    /// [`DEFAULT_PAGE_SIZE`].
    pub fn compute(skip: Option<u64>, limit: Option<u64>, total_count: u64) -> Self {
        let skip = skip.unwrap_or(0);
        let page_size = limit.filter(|limit| *limit > 0).unwrap_or(DEFAULT_PAGE_SIZE);
        Self {
            total_count,
            skip,
            limit: page_size,
            current_page: skip / page_size,
            page_size,
            total_pages: total_count.div_ceil(page_size),
        }
    }
}
