use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::ToSchema;

use crate::models::OrderStatus;

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct Pagination {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl Pagination {
    /// Page, page size and row offset. The offset is `None` when the page lies beyond
    /// any addressable row, which callers answer with an empty page.
    pub fn normalize(&self) -> (i64, i64, Option<i64>) {
        let page = self.page.unwrap_or(1).max(1);
        let per_page = self.per_page.unwrap_or(20).clamp(1, 100);
        let offset = (page - 1).checked_mul(per_page);
        (page, per_page, offset)
    }
}

#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    Desc,
}

/// Raw query string of `GET /menu-items/`.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct MenuItemQuery {
    /// Category title, matched case-insensitively.
    pub category: Option<String>,
    /// Exact price.
    pub to_price: Option<Decimal>,
    /// Case-sensitive substring of the title.
    pub search: Option<String>,
    /// Comma separated fields, `-` prefix for descending.
    pub ordering: Option<String>,
    pub perpage: Option<i64>,
    pub page: Option<i64>,
}

// Paging fields are inlined: `serde(flatten)` loses numeric types in query strings.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct OrderListQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub status: Option<OrderStatus>,
    pub sort_order: Option<SortOrder>,
}

impl OrderListQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page,
            per_page: self.per_page,
        }
    }
}
