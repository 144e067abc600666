//! Page size and page number for a search request.

use serde::Serialize;

use super::query::{OptionValue, Query};
use super::template::SearchTemplate;

pub const ITEMS_PARAM: &str = "items";
pub const PAGE_PARAM: &str = "page";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Paging {
    pub items_per_page: u64,
    pub page: u64,
}

impl Paging {
    pub fn new(items_per_page: u64, page: u64) -> Self {
        Self {
            items_per_page,
            page,
        }
    }

    pub fn offset(&self) -> u64 {
        self.page.saturating_mul(self.items_per_page)
    }

    /// Items per page: the query's `items` option, the template default, the
    /// request parameter, then `default_items`. Page: the query option, the
    /// request parameter, then 0. Unparseable values fall through; a page
    /// size must be positive.
    pub fn resolve(
        query: &Query,
        template: &SearchTemplate,
        request_params: &[(String, String)],
        default_items: u64,
    ) -> Self {
        let positive = |n: &u64| *n > 0;
        let items_per_page = option_number(query, ITEMS_PARAM)
            .filter(positive)
            .or_else(|| {
                parse(template.default_values().get(ITEMS_PARAM).map(String::as_str))
                    .filter(positive)
            })
            .or_else(|| param_number(request_params, ITEMS_PARAM).filter(positive))
            .unwrap_or(default_items);
        let page = option_number(query, PAGE_PARAM)
            .or_else(|| param_number(request_params, PAGE_PARAM))
            .unwrap_or(0);
        Self::new(items_per_page, page)
    }
}

fn parse(value: Option<&str>) -> Option<u64> {
    value.and_then(|v| v.trim().parse().ok())
}

fn option_number(query: &Query, key: &str) -> Option<u64> {
    parse(query.option(key).and_then(OptionValue::as_scalar))
}

fn param_number(params: &[(String, String)], key: &str) -> Option<u64> {
    parse(
        params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str()),
    )
}
