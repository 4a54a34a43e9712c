use serde::Serialize;

/// Validated page window of a listing request.
///
/// Only built from validated request parameters, so `page` and `limit` are
/// never zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Pagination {
    page: u32,
    limit: u32,
}

impl Pagination {
    pub(crate) const DEFAULT_PAGE: u32 = 1;
    pub(crate) const DEFAULT_LIMIT: u32 = 10;

    pub(crate) fn new(page: u32, limit: u32) -> Self {
        Self { page, limit }
    }

    pub(crate) fn page(&self) -> u32 {
        self.page
    }

    pub(crate) fn limit(&self) -> u32 {
        self.limit
    }

    /// Number of records before the current page.
    pub(crate) fn skip(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: Self::DEFAULT_PAGE,
            limit: Self::DEFAULT_LIMIT,
        }
    }
}

/// Shape of the result set relative to the requested page.
///
/// `total_pages` is zero when nothing matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
    #[schema(example = 1)]
    current_page: u32,
    #[schema(example = 3)]
    total_pages: u64,
    #[schema(example = 25)]
    total_count: u64,
    has_next_page: bool,
    has_previous_page: bool,
    #[schema(example = 10)]
    limit: u32,
}

impl PaginationMeta {
    pub(crate) fn new(total_count: u64, pagination: &Pagination) -> Self {
        let total_pages = total_count.div_ceil(u64::from(pagination.limit()));
        Self {
            current_page: pagination.page(),
            total_pages,
            total_count,
            has_next_page: u64::from(pagination.page()) < total_pages,
            has_previous_page: pagination.page() > 1,
            limit: pagination.limit(),
        }
    }

    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    pub fn total_pages(&self) -> u64 {
        self.total_pages
    }

    pub fn total_count(&self) -> u64 {
        self.total_count
    }

    pub fn has_next_page(&self) -> bool {
        self.has_next_page
    }

    pub fn has_previous_page(&self) -> bool {
        self.has_previous_page
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }
}
