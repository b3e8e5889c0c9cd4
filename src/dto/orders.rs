use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{Order, OrderItem, OrderStatus};

/// Staff-owned fields of an order. An empty body is a plain customer update.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct OrderUpdateRequest {
    pub status: Option<OrderStatus>,
    pub delivery_crew_id: Option<Uuid>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderWithItems {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderList {
    pub items: Vec<Order>,
}
