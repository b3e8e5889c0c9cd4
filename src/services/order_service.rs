//! Order lifecycle: checkout from the cart, role-scoped reads, crew assignment,
//! delivery and deletion.

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, Condition, EntityTrait, FromQueryResult,
    IsolationLevel, JoinType, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
    RelationTrait, Set, TransactionTrait,
    sea_query::{Expr, LockType},
};
use uuid::Uuid;

use crate::{
    audit,
    authz::{Op, Resource, Role},
    db::is_serialization_failure,
    dto::orders::{OrderList, OrderUpdateRequest, OrderWithItems},
    entity::{
        cart_items::{self, Column as CartCol, Entity as CartItems},
        menu_items::{Column as MenuCol, Entity as MenuItems},
        order_items::{
            ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems,
            Model as OrderItemModel,
        },
        orders::{
            ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel,
        },
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Order, OrderItem, OrderStatus, checked_line_total, ensure_amount, order_total},
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, SortOrder},
    services::{cart_service::clear_lines, group_service::has_role},
    state::AppState,
};

const CHECKOUT_ATTEMPTS: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateMethod {
    Put,
    Patch,
}

/// Orders visible to the caller: all for managers, assigned ones for delivery crew,
/// own ones for customers.
fn visible_to(user: &AuthUser) -> Condition {
    let condition = Condition::all();
    if user.roles.contains(Role::Manager) {
        condition
    } else if user.roles.contains(Role::DeliveryCrew) {
        condition.add(OrderCol::DeliveryCrewId.eq(user.user_id))
    } else {
        condition.add(OrderCol::UserId.eq(user.user_id))
    }
}

pub async fn list_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    user.ensure(Resource::OrderCollection, Op::Read)?;
    let (page, limit, offset) = query.pagination().normalize();

    let mut condition = visible_to(user);
    if let Some(status) = query.status {
        condition = condition.add(OrderCol::Status.eq(status.as_flag()));
    }

    let mut finder = Orders::find().filter(condition);
    finder = match query.sort_order.unwrap_or(SortOrder::Desc) {
        SortOrder::Asc => finder.order_by_asc(OrderCol::CreatedAt),
        SortOrder::Desc => finder.order_by_desc(OrderCol::CreatedAt),
    };
    finder = finder.order_by_asc(OrderCol::Id);

    let total = finder.clone().count(&state.orm).await? as i64;

    let orders: Vec<Order> = match offset {
        Some(offset) => finder
            .limit(limit as u64)
            .offset(offset as u64)
            .all(&state.orm)
            .await?
            .into_iter()
            .map(order_from_entity)
            .collect(),
        None => Vec::new(),
    };

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Ok",
        OrderList { items: orders },
        Some(meta),
    ))
}

/// Turn the caller's cart into an order. Reading the cart, inserting the order and its
/// items, taking inventory and clearing the cart commit together or not at all.
///
/// A checkout that loses a serialization race is retried once against the fresh cart,
/// which the winner has usually emptied by then.
pub async fn checkout(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<OrderWithItems>> {
    user.ensure(Resource::OrderCollection, Op::Create)?;

    let mut attempt = 1;
    let (order, order_items) = loop {
        match place_order(state, user).await {
            Err(AppError::OrmError(err)) if is_serialization_failure(&err) => {
                if attempt >= CHECKOUT_ATTEMPTS {
                    tracing::warn!(user = %user.user_id, attempt, "checkout kept conflicting");
                    return Err(AppError::Conflict(
                        "another checkout of this cart is in progress".into(),
                    ));
                }
                tracing::debug!(user = %user.user_id, attempt, "checkout conflicted, retrying");
                attempt += 1;
            }
            result => break result?,
        }
    };
    let total = order.total;

    tracing::info!(
        order = %order.id,
        user = %user.user_id,
        %total,
        lines = order_items.len(),
        "order placed"
    );
    audit::record(
        &state.pool,
        user.user_id,
        "checkout",
        "orders",
        serde_json::json!({ "order_id": order.id, "total": total }),
    )
    .await;

    Ok(ApiResponse::success(
        "Checkout success",
        OrderWithItems {
            order: order_from_entity(order),
            items: order_items,
        },
        Some(Meta::empty()),
    ))
}

#[derive(Debug, FromQueryResult)]
struct CheckoutLine {
    menuitem_id: Uuid,
    quantity: i32,
    unit_price: Decimal,
    inventory: i32,
}

/// One serializable attempt at checkout. Dropping the transaction on an early return
/// rolls everything back.
async fn place_order(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<(OrderModel, Vec<OrderItem>)> {
    let txn = state
        .orm
        .begin_with_config(Some(IsolationLevel::Serializable), None)
        .await?;

    let lines = CartItems::find()
        .select_only()
        .column(CartCol::MenuitemId)
        .column(CartCol::Quantity)
        .column(CartCol::UnitPrice)
        .column_as(MenuCol::Inventory, "inventory")
        .join(JoinType::InnerJoin, cart_items::Relation::MenuItems.def())
        .filter(CartCol::UserId.eq(user.user_id))
        .order_by_asc(CartCol::CreatedAt)
        .lock(LockType::Update)
        .into_model::<CheckoutLine>()
        .all(&txn)
        .await?;

    if lines.is_empty() {
        return Err(AppError::EmptyCart);
    }

    for line in &lines {
        if line.inventory < line.quantity {
            return Err(AppError::Validation(format!(
                "insufficient inventory for menu item {}",
                line.menuitem_id
            )));
        }
    }

    let total = order_total(lines.iter().map(|line| (line.quantity, line.unit_price)));
    let total = ensure_amount(total, "order total")?;
    let now = Utc::now();

    let order = OrderActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.user_id),
        delivery_crew_id: Set(None),
        status: Set(OrderStatus::Placed.as_flag()),
        total: Set(total),
        date: Set(now.date_naive()),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await?;

    let mut order_items: Vec<OrderItem> = Vec::with_capacity(lines.len());
    for line in &lines {
        let item = OrderItemActive {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            menuitem_id: Set(line.menuitem_id),
            quantity: Set(line.quantity),
            unit_price: Set(line.unit_price),
            price: Set(checked_line_total(line.quantity, line.unit_price)?),
        }
        .insert(&txn)
        .await?;

        order_items.push(order_item_from_entity(item));

        MenuItems::update_many()
            .col_expr(
                MenuCol::Inventory,
                Expr::col(MenuCol::Inventory).sub(line.quantity),
            )
            .filter(MenuCol::Id.eq(line.menuitem_id))
            .exec(&txn)
            .await?;
    }

    clear_lines(&txn, user.user_id).await?;

    txn.commit().await?;
    Ok((order, order_items))
}

pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    user.ensure(Resource::Order, Op::Read)?;

    let order = Orders::find()
        .filter(visible_to(user).add(OrderCol::Id.eq(id)))
        .one(&state.orm)
        .await?;
    let order = match order {
        Some(o) => o,
        None => return Err(AppError::NotFound),
    };

    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order.id))
        .order_by_asc(OrderItemCol::Id)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(order_item_from_entity)
        .collect();

    Ok(ApiResponse::success(
        "OK",
        OrderWithItems {
            order: order_from_entity(order),
            items,
        },
        Some(Meta::empty()),
    ))
}

/// The operations a PUT/PATCH body asks for. Each named field needs its own capability;
/// a body naming none is a plain update by the owning customer.
pub fn requested_ops(method: UpdateMethod, payload: &OrderUpdateRequest) -> AppResult<Vec<Op>> {
    let mut ops = Vec::new();
    if payload.delivery_crew_id.is_some() {
        ops.push(Op::Assign);
    }
    if payload.status.is_some() {
        if method == UpdateMethod::Put {
            return Err(AppError::Validation(
                "status can only be changed with PATCH".into(),
            ));
        }
        ops.push(Op::StatusPatch);
    }
    if ops.is_empty() {
        ops.push(Op::Update);
    }
    Ok(ops)
}

pub async fn update_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    method: UpdateMethod,
    payload: OrderUpdateRequest,
) -> AppResult<ApiResponse<Order>> {
    let ops = requested_ops(method, &payload)?;
    for op in &ops {
        user.ensure(Resource::Order, *op)?;
    }

    let txn = state.orm.begin().await?;
    let order = Orders::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?;
    let order = match order {
        Some(o) => o,
        None => return Err(AppError::NotFound),
    };

    // customers only see their own orders, crew only the ones assigned to them
    if ops.contains(&Op::Update) && order.user_id != user.user_id {
        return Err(AppError::NotFound);
    }
    if ops.contains(&Op::StatusPatch) && order.delivery_crew_id != Some(user.user_id) {
        return Err(AppError::NotFound);
    }

    if let Some(crew_id) = payload.delivery_crew_id {
        if !has_role(&txn, crew_id, Role::DeliveryCrew).await? {
            return Err(AppError::Validation(
                "user is not a member of the delivery crew".into(),
            ));
        }
    }

    let current = OrderStatus::from_flag(order.status);
    let mut active: OrderActive = order.clone().into();
    let mut changed = false;

    if let Some(crew_id) = payload.delivery_crew_id {
        active.delivery_crew_id = Set(Some(crew_id));
        changed = true;
    }
    if let Some(status) = payload.status {
        let next = current.transition(status)?;
        active.status = Set(next.as_flag());
        changed = true;
    }

    let order = if changed {
        active.updated_at = Set(Utc::now().into());
        active.update(&txn).await?
    } else {
        order
    };
    txn.commit().await?;

    if let Some(crew_id) = payload.delivery_crew_id {
        tracing::info!(order = %order.id, crew = %crew_id, "delivery crew assigned");
        audit::record(
            &state.pool,
            user.user_id,
            "order_assign",
            "orders",
            serde_json::json!({ "order_id": order.id, "delivery_crew_id": crew_id }),
        )
        .await;
    }
    if payload.status.is_some() {
        tracing::info!(order = %order.id, "order delivered");
        audit::record(
            &state.pool,
            user.user_id,
            "order_status_update",
            "orders",
            serde_json::json!({
                "order_id": order.id,
                "status": OrderStatus::from_flag(order.status),
            }),
        )
        .await;
    }

    Ok(ApiResponse::success(
        "Order updated",
        order_from_entity(order),
        Some(Meta::empty()),
    ))
}

pub async fn delete_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    user.ensure(Resource::Order, Op::Delete)?;
    let result = Orders::delete_by_id(id).exec(&state.orm).await?;

    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    tracing::info!(order = %id, "order deleted");
    audit::record(
        &state.pool,
        user.user_id,
        "order_delete",
        "orders",
        serde_json::json!({ "order_id": id }),
    )
    .await;

    Ok(ApiResponse::acknowledged("Deleted"))
}

fn order_from_entity(model: OrderModel) -> Order {
    Order {
        id: model.id,
        user_id: model.user_id,
        delivery_crew_id: model.delivery_crew_id,
        status: OrderStatus::from_flag(model.status),
        total: model.total,
        date: model.date,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}

fn order_item_from_entity(model: OrderItemModel) -> OrderItem {
    OrderItem {
        id: model.id,
        order_id: model.order_id,
        menuitem_id: model.menuitem_id,
        quantity: model.quantity,
        unit_price: model.unit_price,
        price: model.price,
    }
}
