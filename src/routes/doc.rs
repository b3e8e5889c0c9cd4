use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    authz::Role,
    dto::{
        auth::{MeResponse, MessageResponse, RegisterRequest, TokenRequest, TokenResponse},
        cart::{AddToCartRequest, CartList, ClearedCart, UpdateCartQuantityRequest},
        groups::{GroupMemberRequest, GroupMembers},
        menu::{
            CategoryList, CreateCategoryRequest, CreateMenuItemRequest, MenuItemList,
            UpdateMenuItemRequest,
        },
        orders::{OrderList, OrderUpdateRequest, OrderWithItems},
    },
    models::{CartItem, Category, MenuItem, Order, OrderItem, OrderStatus, User},
    response::{ApiResponse, Meta},
    routes::{
        auth, cart, categories, groups, health, menu_items, misc, orders, params,
    },
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    info(title = "Little Lemon API", description = "Restaurant menu, cart and order service"),
    paths(
        health::health_check,
        auth::register,
        auth::obtain_token,
        misc::me,
        misc::secret,
        misc::manager_view,
        misc::throttle_check,
        misc::throttle_check_auth,
        menu_items::list_menu_items,
        menu_items::get_menu_item,
        menu_items::create_menu_item,
        menu_items::replace_menu_item,
        menu_items::patch_menu_item,
        menu_items::delete_menu_item,
        categories::list_categories,
        categories::create_category,
        categories::delete_category,
        groups::list_managers,
        groups::add_manager,
        groups::remove_manager,
        groups::list_delivery_crew,
        groups::add_delivery_crew,
        groups::remove_delivery_crew,
        cart::cart_list,
        cart::add_to_cart,
        cart::update_quantity,
        cart::remove_from_cart,
        cart::clear_cart,
        orders::list_orders,
        orders::checkout,
        orders::get_order,
        orders::replace_order,
        orders::patch_order,
        orders::delete_order
    ),
    components(
        schemas(
            User,
            Role,
            Category,
            MenuItem,
            CartItem,
            Order,
            OrderItem,
            OrderStatus,
            RegisterRequest,
            TokenRequest,
            TokenResponse,
            MeResponse,
            MessageResponse,
            CreateMenuItemRequest,
            UpdateMenuItemRequest,
            MenuItemList,
            CreateCategoryRequest,
            CategoryList,
            GroupMemberRequest,
            GroupMembers,
            AddToCartRequest,
            UpdateCartQuantityRequest,
            CartList,
            ClearedCart,
            OrderUpdateRequest,
            OrderList,
            OrderWithItems,
            params::Pagination,
            params::MenuItemQuery,
            params::OrderListQuery,
            params::SortOrder,
            health::HealthData,
            Meta,
            ApiResponse<MenuItem>,
            ApiResponse<MenuItemList>,
            ApiResponse<Category>,
            ApiResponse<CategoryList>,
            ApiResponse<CartItem>,
            ApiResponse<CartList>,
            ApiResponse<Order>,
            ApiResponse<OrderList>,
            ApiResponse<OrderWithItems>,
            ApiResponse<GroupMembers>,
            ApiResponse<User>,
            ApiResponse<TokenResponse>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Registration, tokens and identity"),
        (name = "Menu", description = "Menu items and categories"),
        (name = "Groups", description = "Manager and delivery crew membership"),
        (name = "Cart", description = "Customer cart"),
        (name = "Orders", description = "Order lifecycle"),
        (name = "Throttling", description = "Rate limit checks"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
