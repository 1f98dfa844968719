//! Pagination
//!
//! 1-based page/size query parameters with defaults; invalid or zero
//! inputs fall back to the defaults.

use serde::Serialize;

const DEFAULT_SIZE: i64 = 10;
const DEFAULT_PAGE: i64 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    size: i64,
    page: i64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            size: DEFAULT_SIZE,
            page: DEFAULT_PAGE,
        }
    }
}

impl Pagination {
    pub fn new(size: i64, page: i64) -> Self {
        Self {
            size: if size > 0 { size } else { DEFAULT_SIZE },
            page: if page > 0 { page } else { DEFAULT_PAGE },
        }
    }

    pub fn from_params(size: Option<i64>, page: Option<i64>) -> Self {
        Self::new(size.unwrap_or(0), page.unwrap_or(0))
    }

    pub fn size(&self) -> i64 {
        self.size
    }

    pub fn page(&self) -> i64 {
        self.page
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.size
    }

    pub fn limit(&self) -> i64 {
        self.size
    }

    pub fn total_pages(&self, total_count: i64) -> i64 {
        (total_count + self.size - 1) / self.size
    }

    pub fn has_more(&self, total_count: i64) -> bool {
        self.page < total_count / self.size
    }

    pub fn response(&self, total_count: i64) -> PaginationResponse {
        PaginationResponse {
            total_count,
            total_pages: self.total_pages(total_count),
            page: self.page,
            size: self.size,
            has_more: self.has_more(total_count),
        }
    }
}

/// Pagination block of a search response
#[derive(Debug, Clone, Serialize)]
pub struct PaginationResponse {
    pub total_count: i64,
    pub total_pages: i64,
    pub page: i64,
    pub size: i64,
    pub has_more: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_for_invalid_input() {
        let pagination = Pagination::new(0, -3);
        assert_eq!(pagination.size(), 10);
        assert_eq!(pagination.page(), 1);

        let pagination = Pagination::from_params(None, None);
        assert_eq!(pagination, Pagination::default());
    }

    #[test]
    fn test_offset() {
        assert_eq!(Pagination::new(10, 1).offset(), 0);
        assert_eq!(Pagination::new(10, 3).offset(), 20);
        assert_eq!(Pagination::new(25, 2).offset(), 25);
    }

    #[test]
    fn test_total_pages_rounds_up() {
        let pagination = Pagination::new(10, 1);
        assert_eq!(pagination.total_pages(0), 0);
        assert_eq!(pagination.total_pages(1), 1);
        assert_eq!(pagination.total_pages(10), 1);
        assert_eq!(pagination.total_pages(11), 2);
    }

    #[test]
    fn test_has_more_uses_integer_division() {
        let pagination = Pagination::new(10, 1);
        assert!(!pagination.has_more(10));
        assert!(pagination.has_more(11));
        assert!(!Pagination::new(10, 2).has_more(11));
    }

    #[test]
    fn test_single_result_first_page() {
        let pagination = Pagination::new(10, 1);
        let response = pagination.response(1);
        assert_eq!(response.total_count, 1);
        assert_eq!(response.total_pages, 1);
        assert_eq!(response.page, 1);
        assert_eq!(response.size, 10);
        assert!(!response.has_more);
    }
}
