use serde::{Deserialize, Serialize};

/// Success envelope shared by the list/detail endpoints.
#[derive(Debug, Serialize)]
pub struct DataResponse<T> {
    pub message: String,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
}

/// (page, limit) as supplied by clients of the paginated endpoints.
#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_page() -> i64 {
    1
}
fn default_limit() -> i64 {
    10
}

impl PageQuery {
    /// Clamps page/limit to sane positives and converts to (offset, limit).
    /// Saturating math: an absurd page just lands beyond the data, which the
    /// handlers answer with an empty list rather than an error.
    pub fn offset_limit(&self) -> (i64, i64) {
        let page = self.page.max(1);
        let limit = self.limit.max(1);
        (page.saturating_sub(1).saturating_mul(limit), limit)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: i64,
    pub total_pages: i64,
    pub items_per_page: i64,
    pub total_items: i64,
}

impl Pagination {
    pub fn new(page: i64, limit: i64, total_items: i64) -> Self {
        let limit = limit.max(1);
        Self {
            current_page: page.max(1),
            total_pages: (total_items + limit - 1) / limit,
            items_per_page: limit,
            total_items,
        }
    }

    /// Envelope for an empty result set: page 1 of 0.
    pub fn empty(limit: i64) -> Self {
        Self {
            current_page: 1,
            total_pages: 0,
            items_per_page: limit.max(1),
            total_items: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_query_translates_to_offset() {
        let q = PageQuery { page: 3, limit: 10 };
        assert_eq!(q.offset_limit(), (20, 10));
    }

    #[test]
    fn page_query_clamps_nonpositive_values() {
        let q = PageQuery { page: 0, limit: -5 };
        assert_eq!(q.offset_limit(), (0, 1));
    }

    #[test]
    fn page_query_saturates_on_huge_values() {
        let q = PageQuery {
            page: i64::MAX,
            limit: 10,
        };
        assert_eq!(q.offset_limit(), (i64::MAX, 10));

        let q = PageQuery {
            page: i64::MAX,
            limit: i64::MAX,
        };
        assert_eq!(q.offset_limit(), (i64::MAX, i64::MAX));
    }

    #[test]
    fn total_pages_rounds_up() {
        assert_eq!(Pagination::new(1, 10, 25).total_pages, 3);
        assert_eq!(Pagination::new(1, 10, 30).total_pages, 3);
        assert_eq!(Pagination::new(1, 10, 0).total_pages, 0);
    }

    #[test]
    fn page_beyond_data_keeps_correct_totals() {
        let p = Pagination::new(9, 10, 25);
        assert_eq!(p.current_page, 9);
        assert_eq!(p.total_pages, 3);
        assert_eq!(p.total_items, 25);
    }

    #[test]
    fn pagination_serializes_camel_case() {
        let json = serde_json::to_string(&Pagination::new(1, 10, 25)).unwrap();
        assert!(json.contains("currentPage"));
        assert!(json.contains("totalPages"));
        assert!(json.contains("itemsPerPage"));
        assert!(json.contains("totalItems"));
    }
}
