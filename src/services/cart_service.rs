use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, ConnectionTrait, DbErr, EntityTrait,
    QueryFilter, Set, SqlErr,
};
use sqlx::FromRow;
use uuid::Uuid;

use crate::{
    audit,
    authz::{Op, Resource},
    db::DbPool,
    dto::cart::{AddToCartRequest, CartList, ClearedCart, UpdateCartQuantityRequest},
    entity::{
        cart_items::{
            ActiveModel as CartActive, Column as CartCol, Entity as CartItems, Model as CartModel,
        },
        menu_items::Entity as MenuItems,
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{CartItem, checked_line_total},
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    state::AppState,
};

const DUPLICATE_LINE: &str = "menu item is already in the cart, update its quantity instead";

#[derive(FromRow)]
struct CartRow {
    id: Uuid,
    user_id: Uuid,
    menuitem_id: Uuid,
    quantity: i32,
    unit_price: Decimal,
    price: Decimal,
    created_at: DateTime<Utc>,
}

/// Lines of the caller's own cart, newest first.
pub async fn list_cart(
    state: &AppState,
    user: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<CartList>> {
    user.ensure(Resource::Cart, Op::Read)?;
    let (page, limit, offset) = pagination.normalize();
    let items = match offset {
        Some(offset) => fetch_cart_page(&state.pool, user.user_id, limit, offset).await?,
        None => Vec::new(),
    };

    let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM cart_items WHERE user_id = $1")
        .bind(user.user_id)
        .fetch_one(&state.pool)
        .await?;

    let meta = Meta::new(page, limit, total.0);
    Ok(ApiResponse::success("OK", CartList { items }, Some(meta)))
}

async fn fetch_cart_page(
    pool: &DbPool,
    user_id: Uuid,
    limit: i64,
    offset: i64,
) -> AppResult<Vec<CartItem>> {
    let rows = sqlx::query_as::<_, CartRow>(
        r#"
        SELECT id, user_id, menuitem_id, quantity, unit_price, price, created_at
        FROM cart_items
        WHERE user_id = $1
        ORDER BY created_at DESC, id
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(user_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| CartItem {
            id: row.id,
            user_id: row.user_id,
            menuitem_id: row.menuitem_id,
            quantity: row.quantity,
            unit_price: row.unit_price,
            price: row.price,
            created_at: row.created_at,
        })
        .collect())
}

pub async fn add_to_cart(
    state: &AppState,
    user: &AuthUser,
    payload: AddToCartRequest,
) -> AppResult<ApiResponse<CartItem>> {
    user.ensure(Resource::Cart, Op::Create)?;
    validate_quantity(payload.quantity)?;

    let menu_item = MenuItems::find_by_id(payload.menuitem_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::Validation("menu item not found".into()))?;

    let exist = CartItems::find()
        .filter(CartCol::UserId.eq(user.user_id))
        .filter(CartCol::MenuitemId.eq(menu_item.id))
        .one(&state.orm)
        .await?;
    if exist.is_some() {
        return Err(AppError::Conflict(DUPLICATE_LINE.into()));
    }

    let price = checked_line_total(payload.quantity, menu_item.price)?;

    let line = CartActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.user_id),
        menuitem_id: Set(menu_item.id),
        quantity: Set(payload.quantity),
        unit_price: Set(menu_item.price),
        price: Set(price),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await
    .map_err(duplicate_line)?;

    audit::record(
        &state.pool,
        user.user_id,
        "cart_add",
        "cart_items",
        serde_json::json!({ "menuitem_id": line.menuitem_id, "quantity": line.quantity }),
    )
    .await;

    Ok(ApiResponse::success("Added to cart", cart_item_from_entity(line), None))
}

/// Change the quantity of an existing line, keeping the unit price captured when it was added.
pub async fn update_quantity(
    state: &AppState,
    user: &AuthUser,
    menuitem_id: Uuid,
    payload: UpdateCartQuantityRequest,
) -> AppResult<ApiResponse<CartItem>> {
    user.ensure(Resource::Cart, Op::Update)?;
    validate_quantity(payload.quantity)?;

    let line = CartItems::find()
        .filter(CartCol::UserId.eq(user.user_id))
        .filter(CartCol::MenuitemId.eq(menuitem_id))
        .one(&state.orm)
        .await?;
    let line = match line {
        Some(line) => line,
        None => return Err(AppError::NotFound),
    };

    let price = checked_line_total(payload.quantity, line.unit_price)?;
    let mut active: CartActive = line.into();
    active.quantity = Set(payload.quantity);
    active.price = Set(price);
    let line = active.update(&state.orm).await?;

    audit::record(
        &state.pool,
        user.user_id,
        "cart_update",
        "cart_items",
        serde_json::json!({ "menuitem_id": menuitem_id, "quantity": payload.quantity }),
    )
    .await;

    Ok(ApiResponse::success("Updated", cart_item_from_entity(line), None))
}

pub async fn remove_from_cart(
    state: &AppState,
    user: &AuthUser,
    menuitem_id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    user.ensure(Resource::Cart, Op::Delete)?;
    let result = CartItems::delete_many()
        .filter(CartCol::UserId.eq(user.user_id))
        .filter(CartCol::MenuitemId.eq(menuitem_id))
        .exec(&state.orm)
        .await?;

    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    audit::record(
        &state.pool,
        user.user_id,
        "cart_remove",
        "cart_items",
        serde_json::json!({ "menuitem_id": menuitem_id }),
    )
    .await;

    Ok(ApiResponse::acknowledged("Removed from cart"))
}

pub async fn clear_cart(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<ClearedCart>> {
    user.ensure(Resource::Cart, Op::Delete)?;
    let removed = clear_lines(&state.orm, user.user_id).await?;

    audit::record(
        &state.pool,
        user.user_id,
        "cart_clear",
        "cart_items",
        serde_json::json!({ "removed": removed }),
    )
    .await;

    Ok(ApiResponse::success(
        "Cart cleared",
        ClearedCart { removed },
        Some(Meta::empty()),
    ))
}

/// Delete every line of a user's cart on the given connection or transaction.
pub async fn clear_lines<C: ConnectionTrait>(conn: &C, user_id: Uuid) -> AppResult<u64> {
    let result = CartItems::delete_many()
        .filter(CartCol::UserId.eq(user_id))
        .exec(conn)
        .await?;
    Ok(result.rows_affected)
}

pub fn validate_quantity(quantity: i32) -> AppResult<()> {
    if quantity < 1 {
        return Err(AppError::Validation(
            "quantity must be greater than 0".to_string(),
        ));
    }
    Ok(())
}

fn duplicate_line(err: DbErr) -> AppError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => AppError::Conflict(DUPLICATE_LINE.into()),
        _ => AppError::OrmError(err),
    }
}

fn cart_item_from_entity(model: CartModel) -> CartItem {
    CartItem {
        id: model.id,
        user_id: model.user_id,
        menuitem_id: model.menuitem_id,
        quantity: model.quantity,
        unit_price: model.unit_price,
        price: model.price,
        created_at: model.created_at.with_timezone(&Utc),
    }
}
