/// Pagination query parameters
#[derive(Debug, Clone, Copy)]
pub struct PaginationParams {
    pub page: u64,
    pub limit: u64,
}

/// Paginated response wrapper
#[derive(Debug)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
}

impl<T> PaginatedResult<T> {
    pub fn new(items: Vec<T>, total: u64, page: u64, limit: u64) -> Self {
        let total_pages = ((total as f64) / (limit as f64)).ceil() as u64;
        Self {
            items,
            total,
            page,
            limit,
            total_pages,
        }
    }
}
