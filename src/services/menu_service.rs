use rust_decimal::{Decimal, RoundingStrategy};
use sea_orm::{ActiveModelTrait, ActiveValue::NotSet, EntityTrait, Set};
use uuid::Uuid;

use crate::{
    audit,
    authz::{Op, Resource},
    dto::menu::{CreateMenuItemRequest, MenuItemList, UpdateMenuItemRequest},
    entity::{
        categories::{Entity as Categories, Model as CategoryModel},
        menu_items::{ActiveModel, Entity as MenuItems, Model as MenuItemModel},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{MAX_AMOUNT, MenuItem, TAX_MULTIPLIER},
    response::{ApiResponse, Meta},
    routes::params::MenuItemQuery,
    services::{category_service::category_from_entity, menu_query::MenuQueryPlan},
    state::AppState,
};

pub async fn list_menu_items(
    state: &AppState,
    user: &AuthUser,
    query: MenuItemQuery,
) -> AppResult<ApiResponse<MenuItemList>> {
    user.ensure(Resource::MenuItem, Op::Read)?;
    let plan = MenuQueryPlan::from_query(query)?;

    let (rows, total) = plan.run(&state.orm).await?;
    let items = rows
        .into_iter()
        .map(|(item, category)| menu_item_from_entity(item, category))
        .collect();

    let meta = Meta::new(plan.page.page, plan.page.per_page, total as i64);
    Ok(ApiResponse::success("Menu items", MenuItemList { items }, Some(meta)))
}

pub async fn get_menu_item(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<MenuItem>> {
    user.ensure(Resource::MenuItem, Op::Read)?;
    let result = MenuItems::find_by_id(id)
        .find_also_related(Categories)
        .one(&state.orm)
        .await?;
    let (item, category) = match result {
        Some(row) => row,
        None => return Err(AppError::NotFound),
    };
    Ok(ApiResponse::success(
        "Menu item",
        menu_item_from_entity(item, category),
        None,
    ))
}

pub async fn create_menu_item(
    state: &AppState,
    user: &AuthUser,
    payload: CreateMenuItemRequest,
) -> AppResult<ApiResponse<MenuItem>> {
    user.ensure(Resource::MenuItem, Op::Create)?;
    let title = validate_title(&payload.title)?;
    validate_price(payload.price)?;
    validate_inventory(payload.inventory)?;
    let category = existing_category(state, payload.category_id).await?;

    let item = ActiveModel {
        id: Set(Uuid::new_v4()),
        title: Set(title),
        price: Set(payload.price),
        inventory: Set(payload.inventory),
        category_id: Set(category.id),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    tracing::info!(menu_item = %item.id, "menu item created");
    audit::record(
        &state.pool,
        user.user_id,
        "menu_item_create",
        "menu_items",
        serde_json::json!({ "menu_item_id": item.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Menu item created",
        menu_item_from_entity(item, Some(category)),
        Some(Meta::empty()),
    ))
}

/// Apply the provided fields. A full replacement passes every field.
pub async fn update_menu_item(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateMenuItemRequest,
) -> AppResult<ApiResponse<MenuItem>> {
    user.ensure(Resource::MenuItem, Op::Update)?;

    let existing = MenuItems::find_by_id(id).one(&state.orm).await?;
    let existing = match existing {
        Some(item) => item,
        None => return Err(AppError::NotFound),
    };
    let category_id = payload.category_id.unwrap_or(existing.category_id);

    let mut active: ActiveModel = existing.into();
    if let Some(title) = payload.title {
        active.title = Set(validate_title(&title)?);
    }
    if let Some(price) = payload.price {
        validate_price(price)?;
        active.price = Set(price);
    }
    if let Some(inventory) = payload.inventory {
        validate_inventory(inventory)?;
        active.inventory = Set(inventory);
    }
    let category = existing_category(state, category_id).await?;
    active.category_id = Set(category.id);

    let item = active.update(&state.orm).await?;

    tracing::info!(menu_item = %item.id, "menu item updated");
    audit::record(
        &state.pool,
        user.user_id,
        "menu_item_update",
        "menu_items",
        serde_json::json!({ "menu_item_id": item.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Updated",
        menu_item_from_entity(item, Some(category)),
        Some(Meta::empty()),
    ))
}

pub async fn delete_menu_item(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    user.ensure(Resource::MenuItem, Op::Delete)?;
    let result = MenuItems::delete_by_id(id).exec(&state.orm).await?;

    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    tracing::info!(menu_item = %id, "menu item deleted");
    audit::record(
        &state.pool,
        user.user_id,
        "menu_item_delete",
        "menu_items",
        serde_json::json!({ "menu_item_id": id }),
    )
    .await;

    Ok(ApiResponse::acknowledged("Deleted"))
}

async fn existing_category(state: &AppState, id: Uuid) -> AppResult<CategoryModel> {
    Categories::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::Validation("category does not exist".into()))
}

fn validate_title(title: &str) -> AppResult<String> {
    let title = title.trim();
    if title.is_empty() {
        return Err(AppError::Validation("title is required".into()));
    }
    Ok(title.to_string())
}

pub fn validate_price(price: Decimal) -> AppResult<()> {
    if price < Decimal::ZERO {
        return Err(AppError::Validation("price must not be negative".into()));
    }
    if price > MAX_AMOUNT {
        return Err(AppError::Validation(format!(
            "price must not exceed {MAX_AMOUNT}"
        )));
    }
    if price.normalize().scale() > 2 {
        return Err(AppError::Validation(
            "price must have at most 2 decimal places".into(),
        ));
    }
    Ok(())
}

pub fn validate_inventory(inventory: i32) -> AppResult<()> {
    if inventory < 0 {
        return Err(AppError::Validation("inventory must not be negative".into()));
    }
    Ok(())
}

pub fn menu_item_from_entity(model: MenuItemModel, category: Option<CategoryModel>) -> MenuItem {
    MenuItem {
        id: model.id,
        title: model.title,
        price: model.price,
        price_after_tax: (model.price * TAX_MULTIPLIER)
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero),
        inventory: model.inventory,
        category_id: model.category_id,
        category: category.map(category_from_entity),
    }
}
