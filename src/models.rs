use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    authz::Role,
    error::{AppError, AppResult},
};

/// Multiplier applied to the menu price to show the taxed price.
pub const TAX_MULTIPLIER: Decimal = Decimal::from_parts(15, 0, 0, false, 1);

/// Largest amount a money column (`NUMERIC(10, 2)`) holds: 99,999,999.99.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(1_410_065_407, 2, 0, false, 2);

/// Quantity times unit price. Always computed here, never taken from the client.
pub fn line_total(quantity: i32, unit_price: Decimal) -> Decimal {
    Decimal::from(quantity) * unit_price
}

/// Reject amounts the store cannot hold.
pub fn ensure_amount(amount: Decimal, what: &str) -> AppResult<Decimal> {
    if amount > MAX_AMOUNT {
        return Err(AppError::Validation(format!(
            "{what} must not exceed {MAX_AMOUNT}"
        )));
    }
    Ok(amount)
}

/// [`line_total`] bounded to what a line can store.
pub fn checked_line_total(quantity: i32, unit_price: Decimal) -> AppResult<Decimal> {
    ensure_amount(line_total(quantity, unit_price), "line total")
}

/// Sum of the line totals of `(quantity, unit_price)` pairs.
pub fn order_total<I>(lines: I) -> Decimal
where
    I: IntoIterator<Item = (i32, Decimal)>,
{
    lines
        .into_iter()
        .map(|(quantity, unit_price)| line_total(quantity, unit_price))
        .sum()
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: Option<String>,
    pub roles: Vec<Role>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Category {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MenuItem {
    pub id: Uuid,
    pub title: String,
    pub price: Decimal,
    pub price_after_tax: Decimal,
    pub inventory: i32,
    pub category_id: Uuid,
    pub category: Option<Category>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CartItem {
    pub id: Uuid,
    pub user_id: Uuid,
    pub menuitem_id: Uuid,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub price: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Order lifecycle. Stored as a boolean flag: `false` placed, `true` delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Placed,
    Delivered,
}

impl OrderStatus {
    pub fn from_flag(delivered: bool) -> Self {
        if delivered {
            OrderStatus::Delivered
        } else {
            OrderStatus::Placed
        }
    }

    pub fn as_flag(&self) -> bool {
        matches!(self, OrderStatus::Delivered)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Placed => "placed",
            OrderStatus::Delivered => "delivered",
        }
    }

    /// Validate a status patch. Repeating the current status is a conflict and a
    /// delivered order cannot be reopened.
    pub fn transition(self, to: OrderStatus) -> AppResult<OrderStatus> {
        match (self, to) {
            (OrderStatus::Placed, OrderStatus::Delivered) => Ok(OrderStatus::Delivered),
            (from, to) if from == to => Err(AppError::Conflict(format!(
                "order is already {}",
                to.as_str()
            ))),
            (OrderStatus::Delivered, OrderStatus::Placed) => Err(AppError::Validation(
                "a delivered order cannot be reopened".into(),
            )),
            _ => Err(AppError::Validation("invalid status transition".into())),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub delivery_crew_id: Option<Uuid>,
    pub status: OrderStatus,
    pub total: Decimal,
    pub date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub menuitem_id: Uuid,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub price: Decimal,
}
