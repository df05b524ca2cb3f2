use serde::Deserialize;

/// (page, limit) for the catalog-facing lists; the catalog default page
/// size is 20, larger than the user-data lists.
#[derive(Debug, Deserialize)]
pub struct CatalogPageQuery {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_page() -> i64 {
    1
}
fn default_limit() -> i64 {
    20
}

impl CatalogPageQuery {
    /// Saturating math so hostile page/limit values degrade to a large
    /// offset (upstream answers with an empty page) instead of overflowing.
    pub fn offset_limit(&self) -> (u32, u32) {
        let page = self.page.clamp(1, u32::MAX as i64) as u32;
        let limit = self.limit.clamp(1, u32::MAX as i64) as u32;
        (page.saturating_sub(1).saturating_mul(limit), limit)
    }
}

#[derive(Debug, Deserialize)]
pub struct TitleSearchQuery {
    pub title: Option<String>,
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenreSearchQuery {
    pub genre_ids: Option<String>,
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

/// Feed paging arrives as raw strings so garbage input degrades to the
/// defaults instead of a deserialization rejection.
#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    pub limit: Option<String>,
    pub offset: Option<String>,
    pub lang: Option<String>,
}

pub fn parse_lenient(value: Option<&str>) -> Option<i64> {
    value.and_then(|s| s.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_page_query_translates_to_offset() {
        let q = CatalogPageQuery { page: 2, limit: 20 };
        assert_eq!(q.offset_limit(), (20, 20));
    }

    #[test]
    fn catalog_page_query_clamps_nonpositive() {
        let q = CatalogPageQuery { page: -1, limit: 0 };
        assert_eq!(q.offset_limit(), (0, 1));
    }

    #[test]
    fn catalog_page_query_saturates_on_huge_values() {
        let q = CatalogPageQuery {
            page: 100_000,
            limit: 100_000,
        };
        assert_eq!(q.offset_limit(), (u32::MAX, 100_000));

        let q = CatalogPageQuery {
            page: i64::MAX,
            limit: i64::MAX,
        };
        assert_eq!(q.offset_limit(), (u32::MAX, u32::MAX));
    }

    #[test]
    fn lenient_parse_accepts_numbers_and_rejects_garbage() {
        assert_eq!(parse_lenient(Some("120")), Some(120));
        assert_eq!(parse_lenient(Some(" 7 ")), Some(7));
        assert_eq!(parse_lenient(Some("abc")), None);
        assert_eq!(parse_lenient(Some("")), None);
        assert_eq!(parse_lenient(None), None);
    }
}
