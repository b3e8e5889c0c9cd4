//! Filtering, ordering and paging of the menu listing.
//!
//! A [`MenuQueryPlan`] is parsed from the raw query string up front, so malformed input is
//! rejected before the store is touched. Running a plan always reads the current store
//! state; nothing is cached between calls.

use rust_decimal::Decimal;
use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, Order, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, SelectTwo,
    sea_query::{Expr, Func, LikeExpr},
};

use crate::{
    entity::{
        categories::{self, Column as CatCol, Entity as Categories},
        menu_items::{self, Column as MenuCol, Entity as MenuItems},
    },
    error::{AppError, AppResult},
    routes::params::MenuItemQuery,
};

pub const DEFAULT_PER_PAGE: i64 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Id,
    Title,
    Price,
    Inventory,
    Category,
}

impl SortField {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "id" => Some(SortField::Id),
            "title" => Some(SortField::Title),
            "price" => Some(SortField::Price),
            "inventory" | "stock" => Some(SortField::Inventory),
            "category" | "category_id" => Some(SortField::Category),
            _ => None,
        }
    }

    fn column(&self) -> MenuCol {
        match self {
            SortField::Id => MenuCol::Id,
            SortField::Title => MenuCol::Title,
            SortField::Price => MenuCol::Price,
            SortField::Inventory => MenuCol::Inventory,
            SortField::Category => MenuCol::CategoryId,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey {
    pub field: SortField,
    pub descending: bool,
}

/// Parse `price,-title` style ordering. Empty segments are skipped.
pub fn parse_ordering(raw: &str) -> AppResult<Vec<SortKey>> {
    raw.split(',')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            let (descending, name) = match segment.strip_prefix('-') {
                Some(rest) => (true, rest.trim()),
                None => (false, segment),
            };
            SortField::parse(name)
                .map(|field| SortKey { field, descending })
                .ok_or_else(|| AppError::Validation(format!("cannot order by '{name}'")))
        })
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MenuFilter {
    pub category: Option<String>,
    pub price: Option<Decimal>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSpec {
    pub page: i64,
    pub per_page: i64,
}

impl PageSpec {
    /// Row offset of the page, or `None` when no rows can be on it.
    pub fn offset(&self) -> Option<u64> {
        if self.page < 1 {
            return None;
        }
        (self.page - 1)
            .checked_mul(self.per_page)
            .and_then(|offset| u64::try_from(offset).ok())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MenuQueryPlan {
    pub filter: MenuFilter,
    pub sort: Vec<SortKey>,
    pub page: PageSpec,
}

impl MenuQueryPlan {
    pub fn from_query(query: MenuItemQuery) -> AppResult<Self> {
        let per_page = query.perpage.unwrap_or(DEFAULT_PER_PAGE);
        if per_page < 1 {
            return Err(AppError::Validation("perpage must be at least 1".into()));
        }

        let sort = match query.ordering.as_deref() {
            Some(raw) => parse_ordering(raw)?,
            None => Vec::new(),
        };

        Ok(Self {
            filter: MenuFilter {
                category: query.category.filter(|c| !c.trim().is_empty()),
                price: query.to_price,
                search: query.search.filter(|s| !s.is_empty()),
            },
            sort,
            page: PageSpec {
                page: query.page.unwrap_or(1),
                per_page,
            },
        })
    }

    /// Filtered and ordered menu items joined with their category, without paging.
    pub fn select(&self) -> SelectTwo<MenuItems, Categories> {
        let mut select = MenuItems::find().find_also_related(Categories);

        if let Some(category) = &self.filter.category {
            select = select.filter(
                Expr::expr(Func::lower(Expr::col((Categories, CatCol::Title))))
                    .eq(category.to_lowercase()),
            );
        }
        if let Some(price) = self.filter.price {
            select = select.filter(MenuCol::Price.eq(price));
        }
        if let Some(search) = &self.filter.search {
            let pattern = format!("%{}%", escape_like(search));
            select = select.filter(
                Expr::col((MenuItems, MenuCol::Title)).like(LikeExpr::new(pattern).escape('\\')),
            );
        }

        for key in &self.sort {
            let order = if key.descending { Order::Desc } else { Order::Asc };
            select = select.order_by(key.field.column(), order);
        }
        // ties resolve by id so pages never overlap
        if !self.sort.iter().any(|key| key.field == SortField::Id) {
            select = select.order_by_asc(MenuCol::Id);
        }

        select
    }

    /// Total matching rows and the requested page. A page past the end is empty.
    pub async fn run<C: ConnectionTrait>(
        &self,
        conn: &C,
    ) -> AppResult<(Vec<(menu_items::Model, Option<categories::Model>)>, u64)> {
        let select = self.select();
        let total = select.clone().count(conn).await?;

        let rows = match self.page.offset() {
            Some(offset) if offset < total => {
                select
                    .offset(offset)
                    .limit(self.page.per_page as u64)
                    .all(conn)
                    .await?
            }
            _ => Vec::new(),
        };

        Ok((rows, total))
    }
}

fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}
