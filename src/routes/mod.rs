use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{delete, get, post, put},
};

use crate::{middleware::throttle, state::AppState};

pub mod auth;
pub mod cart;
pub mod categories;
pub mod doc;
pub mod groups;
pub mod health;
pub mod menu_items;
pub mod misc;
pub mod orders;
pub mod params;

/// Build the API router. Throttling layers need the state up front; the state itself is
/// provided at the top level.
pub fn create_api_router(state: AppState) -> Router<AppState> {
    let per_user = Router::new()
        .route(
            "/menu-items/",
            get(menu_items::list_menu_items).post(menu_items::create_menu_item),
        )
        .route(
            "/menu-items/{id}",
            get(menu_items::get_menu_item)
                .put(menu_items::replace_menu_item)
                .patch(menu_items::patch_menu_item)
                .delete(menu_items::delete_menu_item),
        )
        .route(
            "/categories/",
            get(categories::list_categories).post(categories::create_category),
        )
        .route("/categories/{id}", delete(categories::delete_category))
        .route(
            "/groups/manager/users/",
            get(groups::list_managers).post(groups::add_manager),
        )
        .route("/groups/manager/users/{id}", delete(groups::remove_manager))
        .route(
            "/groups/delivery-crew/users",
            get(groups::list_delivery_crew).post(groups::add_delivery_crew),
        )
        .route(
            "/groups/delivery-crew/users/{id}",
            delete(groups::remove_delivery_crew),
        )
        .route(
            "/cart/menu-items/",
            get(cart::cart_list)
                .post(cart::add_to_cart)
                .delete(cart::clear_cart),
        )
        .route(
            "/cart/menu-items/{menuitem_id}",
            put(cart::update_quantity).delete(cart::remove_from_cart),
        )
        .route("/orders/", get(orders::list_orders).post(orders::checkout))
        .route(
            "/orders/{order_id}",
            get(orders::get_order)
                .put(orders::replace_order)
                .patch(orders::patch_order)
                .delete(orders::delete_order),
        )
        .route("/throttle-check-auth/", get(misc::throttle_check_auth))
        .route_layer(from_fn_with_state(state.clone(), throttle::per_user));

    let anonymous = Router::new()
        .route("/throttle-check/", get(misc::throttle_check))
        .route_layer(from_fn_with_state(state, throttle::per_anonymous));

    Router::new()
        .merge(per_user)
        .merge(anonymous)
        .route("/users/", post(auth::register))
        .route("/api-token-auth/", post(auth::obtain_token))
        .route("/me/", get(misc::me))
        .route("/secret/", get(misc::secret))
        .route("/manager-view/", get(misc::manager_view))
}
