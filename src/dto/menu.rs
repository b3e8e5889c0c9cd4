use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{Category, MenuItem};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateMenuItemRequest {
    pub title: String,
    pub price: Decimal,
    pub inventory: i32,
    pub category_id: Uuid,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateMenuItemRequest {
    pub title: Option<String>,
    pub price: Option<Decimal>,
    pub inventory: Option<i32>,
    pub category_id: Option<Uuid>,
}

impl From<CreateMenuItemRequest> for UpdateMenuItemRequest {
    fn from(value: CreateMenuItemRequest) -> Self {
        Self {
            title: Some(value.title),
            price: Some(value.price),
            inventory: Some(value.inventory),
            category_id: Some(value.category_id),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct MenuItemList {
    pub items: Vec<MenuItem>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateCategoryRequest {
    pub slug: String,
    pub title: String,
}

#[derive(Serialize, ToSchema)]
pub struct CategoryList {
    pub items: Vec<Category>,
}
