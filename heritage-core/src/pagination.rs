use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

pub const MAX_PAGE_SIZE: u64 = 100;

const fn default_page() -> u64 {
    1
}

/// Page request as it arrives from a query string. `page` is 1 based.
#[derive(Debug, Deserialize, ToSchema, IntoParams, PartialEq, Eq, Clone, Copy)]
#[into_params(parameter_in = Query)]
pub struct Pagination {
    #[serde(default = "default_page")]
    pub page: u64,
    pub limit: Option<u64>,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: default_page(),
            limit: None,
        }
    }
}

impl Pagination {
    pub fn with_default_limit(page: u64) -> Self {
        Self { page, limit: None }
    }

    pub fn with_limit(page: u64, limit: u64) -> Self {
        Self {
            page,
            limit: Some(limit),
        }
    }
}

/// One page of rows plus the number of rows matching the query across all pages.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: u64) -> Self {
        Self { items, total }
    }

    pub fn empty() -> Self {
        Self::new(vec![], 0)
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub current_page: u64,
    pub total_pages: u64,
    pub total_items: u64,
    pub items_per_page: u64,
}

impl PageMeta {
    pub fn new(page: u64, limit: u64, total: u64) -> Self {
        Self {
            current_page: page,
            total_pages: total.div_ceil(limit.max(1)),
            total_items: total,
            items_per_page: limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, 10, 0)]
    #[case(1, 10, 1)]
    #[case(10, 10, 1)]
    #[case(11, 10, 2)]
    #[case(25, 5, 5)]
    #[case(26, 5, 6)]
    fn total_pages_rounds_up(#[case] total: u64, #[case] limit: u64, #[case] expected: u64) {
        let meta = PageMeta::new(1, limit, total);
        assert_eq!(expected, meta.total_pages);
        assert_eq!(total, meta.total_items);
        assert_eq!(limit, meta.items_per_page);
    }

    #[test]
    fn page_meta_serializes_camel_case() {
        let json = serde_json::to_value(PageMeta::new(2, 10, 35)).unwrap();
        assert_eq!(
            serde_json::json!({
                "currentPage": 2,
                "totalPages": 4,
                "totalItems": 35,
                "itemsPerPage": 10
            }),
            json
        );
    }

    #[test]
    fn pagination_documents_query_params() {
        let params = Pagination::into_params(|| None);

        let names: Vec<_> = params.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(vec!["page", "limit"], names);
        assert!(
            params
                .iter()
                .all(|p| p.parameter_in == utoipa::openapi::path::ParameterIn::Query)
        );
    }
}
