use little_lemon_api::{
    authz::Role,
    config::AppConfig,
    db::{create_pool, run_migrations},
    dto::{
        auth::{RegisterRequest, TokenRequest},
        cart::AddToCartRequest,
        groups::GroupMemberRequest,
        menu::{CreateCategoryRequest, CreateMenuItemRequest},
        orders::OrderUpdateRequest,
    },
    entity::{Orders, user_groups::ActiveModel as GroupActive},
    error::AppError,
    middleware::auth::{AuthUser, decode_token},
    models::{Category, MenuItem, Order, OrderStatus},
    routes::params::{MenuItemQuery, OrderListQuery, Pagination},
    services::{
        auth_service, cart_service, category_service, group_service, menu_service,
        order_service::{self, UpdateMethod},
    },
    state::AppState,
};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ConnectionTrait, EntityTrait, PaginatorTrait, Set, Statement};
use tokio::sync::{Mutex, MutexGuard};
use uuid::Uuid;

// Every flow truncates the same tables, so they take turns.
static DB_LOCK: Mutex<()> = Mutex::const_new(());

// Integration flow: manager builds the menu, customer checks out, manager assigns crew,
// crew delivers, customer still reads the order.
#[tokio::test]
async fn checkout_assign_and_deliver_flow() -> anyhow::Result<()> {
    let Some((state, _guard)) = setup().await? else {
        return Ok(());
    };

    let manager = create_user(&state, "mario", Some(Role::Manager)).await?;
    let crew = create_user(&state, "dana", None).await?;
    let customer = create_user(&state, "adrian", None).await?;

    // Staff membership is managed by the manager.
    group_service::add_member(
        &state,
        &manager,
        Role::DeliveryCrew,
        GroupMemberRequest {
            username: Some("dana".into()),
        },
    )
    .await?;
    let crew = refresh(&state, crew).await?;
    assert!(crew.roles.contains(Role::DeliveryCrew));

    let err = group_service::add_member(
        &state,
        &manager,
        Role::DeliveryCrew,
        GroupMemberRequest { username: None },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    // Menu
    let cat = create_category(&state, &manager, "mains").await?.id;

    let forbidden = category_service::create_category(
        &state,
        &customer,
        CreateCategoryRequest {
            slug: "desserts".into(),
            title: "Desserts".into(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(forbidden, AppError::Forbidden));

    let soup = create_item(&state, &manager, "Lemon Soup", 999, 10, cat).await?;
    let dessert = create_item(&state, &manager, "Lemon Dessert", 500, 10, cat).await?;
    assert_eq!(soup.price_after_tax, Decimal::new(1499, 2));

    let err = menu_service::create_menu_item(
        &state,
        &customer,
        CreateMenuItemRequest {
            title: "Sneaky".into(),
            price: Decimal::ONE,
            inventory: 1,
            category_id: cat,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));

    let listed = menu_service::list_menu_items(
        &state,
        &customer,
        MenuItemQuery {
            search: Some("Soup".into()),
            ..Default::default()
        },
    )
    .await?;
    let items = listed.data.expect("menu").items;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].id, soup.id);

    // Cart
    let err = order_service::checkout(&state, &customer).await.unwrap_err();
    assert!(matches!(err, AppError::EmptyCart));

    add(&state, &customer, soup.id, 2).await?;
    add(&state, &customer, dessert.id, 1).await?;

    let dup = add(&state, &customer, soup.id, 1).await.unwrap_err();
    assert!(matches!(dup, AppError::Conflict(_)));

    let err = add(&state, &manager, soup.id, 1).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden));

    // Checkout
    let placed = order_service::checkout(&state, &customer)
        .await?
        .data
        .expect("order");
    assert_eq!(placed.order.total, Decimal::new(2498, 2));
    assert_eq!(placed.order.status, OrderStatus::Placed);
    assert_eq!(placed.items.len(), 2);

    let soup_line = placed
        .items
        .iter()
        .find(|item| item.menuitem_id == soup.id)
        .expect("soup line");
    assert_eq!(soup_line.quantity, 2);
    assert_eq!(soup_line.unit_price, Decimal::new(999, 2));
    assert_eq!(soup_line.price, Decimal::new(1998, 2));
    let dessert_line = placed
        .items
        .iter()
        .find(|item| item.menuitem_id == dessert.id)
        .expect("dessert line");
    assert_eq!(dessert_line.quantity, 1);
    assert_eq!(dessert_line.price, Decimal::new(500, 2));

    assert_eq!(inventory_of(&state, &customer, soup.id).await?, 8);
    assert_eq!(inventory_of(&state, &customer, dessert.id).await?, 9);

    let cart = cart_service::list_cart(&state, &customer, Pagination::default()).await?;
    assert!(cart.data.expect("cart").items.is_empty());

    let order_id = placed.order.id;

    // Crew cannot deliver before assignment.
    let err = patch(&state, &crew, order_id, Some(OrderStatus::Delivered), None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound));

    // Only a manager assigns, and only crew members.
    let err = patch(&state, &customer, order_id, None, Some(crew.user_id))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));

    let err = patch(&state, &manager, order_id, None, Some(customer.user_id))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    // A missing order is reported before the assignee is looked at.
    let err = patch(&state, &manager, Uuid::new_v4(), None, Some(customer.user_id))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound));

    let assigned = patch(&state, &manager, order_id, None, Some(crew.user_id)).await?;
    assert_eq!(assigned.delivery_crew_id, Some(crew.user_id));

    let crew_orders = order_service::list_orders(&state, &crew, OrderListQuery::default()).await?;
    assert_eq!(crew_orders.data.expect("orders").items.len(), 1);

    // Delivery
    let delivered = patch(&state, &crew, order_id, Some(OrderStatus::Delivered), None).await?;
    assert_eq!(delivered.status, OrderStatus::Delivered);

    let again = patch(&state, &crew, order_id, Some(OrderStatus::Delivered), None)
        .await
        .unwrap_err();
    assert!(matches!(again, AppError::Conflict(_)));

    let seen = order_service::get_order(&state, &customer, order_id)
        .await?
        .data
        .expect("order");
    assert_eq!(seen.order.status, OrderStatus::Delivered);
    assert_eq!(seen.items.len(), 2);

    // Deletion is for managers.
    let err = order_service::delete_order(&state, &customer, order_id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));
    order_service::delete_order(&state, &manager, order_id).await?;
    let err = order_service::get_order(&state, &manager, order_id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound));

    Ok(())
}

#[tokio::test]
async fn cart_listing_only_shows_the_callers_lines() -> anyhow::Result<()> {
    let Some((state, _guard)) = setup().await? else {
        return Ok(());
    };

    let manager = create_user(&state, "mario", Some(Role::Manager)).await?;
    let alice = create_user(&state, "alice", None).await?;
    let bob = create_user(&state, "bob", None).await?;

    let cat = create_category(&state, &manager, "mains").await?.id;
    let soup = create_item(&state, &manager, "Lemon Soup", 999, 10, cat).await?;

    add(&state, &alice, soup.id, 3).await?;

    let alice_cart = cart_service::list_cart(&state, &alice, Pagination::default()).await?;
    assert_eq!(alice_cart.meta.as_ref().and_then(|m| m.total), Some(1));
    let lines = alice_cart.data.expect("cart").items;
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].user_id, alice.user_id);
    assert_eq!(lines[0].price, Decimal::new(2997, 2));

    let bob_cart = cart_service::list_cart(&state, &bob, Pagination::default()).await?;
    assert_eq!(bob_cart.meta.as_ref().and_then(|m| m.total), Some(0));
    assert!(bob_cart.data.expect("cart").items.is_empty());

    // Bob emptying his cart leaves Alice's alone.
    cart_service::clear_cart(&state, &bob).await?;
    let alice_cart = cart_service::list_cart(&state, &alice, Pagination::default()).await?;
    assert_eq!(alice_cart.data.expect("cart").items.len(), 1);

    Ok(())
}

#[tokio::test]
async fn menu_pages_past_the_end_are_empty() -> anyhow::Result<()> {
    let Some((state, _guard)) = setup().await? else {
        return Ok(());
    };

    let manager = create_user(&state, "mario", Some(Role::Manager)).await?;
    let customer = create_user(&state, "adrian", None).await?;
    let cat = create_category(&state, &manager, "mains").await?.id;
    for (title, cents) in [("Bruschetta", 799), ("Greek Salad", 1250), ("Lemon Soup", 999)] {
        create_item(&state, &manager, title, cents, 10, cat).await?;
    }

    let page = |page: i64| MenuItemQuery {
        ordering: Some("price".into()),
        perpage: Some(2),
        page: Some(page),
        ..Default::default()
    };

    let second = menu_service::list_menu_items(&state, &customer, page(2)).await?;
    assert_eq!(second.meta.as_ref().and_then(|m| m.total), Some(3));
    let items = second.data.expect("menu").items;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].title, "Greek Salad");

    for past in [3, 0, -1, i64::MAX] {
        let resp = menu_service::list_menu_items(&state, &customer, page(past)).await?;
        assert_eq!(resp.meta.as_ref().and_then(|m| m.total), Some(3));
        assert!(resp.data.expect("menu").items.is_empty(), "page {past}");
    }

    Ok(())
}

#[tokio::test]
async fn failed_checkout_changes_nothing() -> anyhow::Result<()> {
    let Some((state, _guard)) = setup().await? else {
        return Ok(());
    };

    let manager = create_user(&state, "mario", Some(Role::Manager)).await?;
    let customer = create_user(&state, "adrian", None).await?;
    let cat = create_category(&state, &manager, "mains").await?.id;
    let salad = create_item(&state, &manager, "Greek Salad", 1250, 5, cat).await?;
    let soup = create_item(&state, &manager, "Lemon Soup", 999, 1, cat).await?;

    add(&state, &customer, salad.id, 2).await?;
    add(&state, &customer, soup.id, 2).await?;

    let err = order_service::checkout(&state, &customer).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    assert_eq!(Orders::find().count(&state.orm).await?, 0);
    let cart = cart_service::list_cart(&state, &customer, Pagination::default()).await?;
    assert_eq!(cart.data.expect("cart").items.len(), 2);
    assert_eq!(inventory_of(&state, &customer, salad.id).await?, 5);
    assert_eq!(inventory_of(&state, &customer, soup.id).await?, 1);

    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn racing_checkouts_place_one_order() -> anyhow::Result<()> {
    let Some((state, _guard)) = setup().await? else {
        return Ok(());
    };

    let manager = create_user(&state, "mario", Some(Role::Manager)).await?;
    let customer = create_user(&state, "adrian", None).await?;
    let cat = create_category(&state, &manager, "mains").await?.id;
    let soup = create_item(&state, &manager, "Lemon Soup", 999, 50, cat).await?;

    let rounds = 10;
    for _ in 0..rounds {
        add(&state, &customer, soup.id, 1).await?;

        let first = tokio::spawn({
            let (state, customer) = (state.clone(), customer.clone());
            async move { order_service::checkout(&state, &customer).await.map(|_| ()) }
        });
        let second = tokio::spawn({
            let (state, customer) = (state.clone(), customer.clone());
            async move { order_service::checkout(&state, &customer).await.map(|_| ()) }
        });

        let outcomes = [first.await?, second.await?];
        let placed = outcomes.iter().filter(|outcome| outcome.is_ok()).count();
        assert_eq!(placed, 1, "{outcomes:?}");
        for outcome in &outcomes {
            if let Err(err) = outcome {
                assert!(
                    matches!(err, AppError::EmptyCart | AppError::Conflict(_)),
                    "unexpected {err:?}"
                );
            }
        }
    }

    assert_eq!(Orders::find().count(&state.orm).await?, rounds);
    assert_eq!(inventory_of(&state, &customer, soup.id).await?, 40);

    Ok(())
}

#[tokio::test]
async fn oversized_input_is_a_validation_error() -> anyhow::Result<()> {
    let Some((state, _guard)) = setup().await? else {
        return Ok(());
    };

    let manager = create_user(&state, "mario", Some(Role::Manager)).await?;
    let customer = create_user(&state, "adrian", None).await?;
    let cat = create_category(&state, &manager, "mains").await?.id;
    let soup = create_item(&state, &manager, "Lemon Soup", 999, 10, cat).await?;

    let err = add(&state, &customer, soup.id, 2_000_000_000).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let err = menu_service::create_menu_item(
        &state,
        &manager,
        CreateMenuItemRequest {
            title: "Gold Leaf".into(),
            price: Decimal::new(100_000_000_000, 2),
            inventory: 1,
            category_id: cat,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let far = Pagination {
        page: Some(i64::MAX),
        per_page: Some(100),
    };
    let cart = cart_service::list_cart(&state, &customer, far).await?;
    assert!(cart.data.expect("cart").items.is_empty());

    let orders = order_service::list_orders(
        &state,
        &customer,
        OrderListQuery {
            page: Some(i64::MAX),
            per_page: Some(100),
            ..Default::default()
        },
    )
    .await?;
    assert!(orders.data.expect("orders").items.is_empty());

    Ok(())
}

/// Fresh state with empty tables, or `None` when no database is configured.
async fn setup() -> anyhow::Result<Option<(AppState, MutexGuard<'static, ()>)>> {
    // Allow skipping when no DB is configured in the environment.
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!(
                "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests."
            );
            return Ok(None);
        }
    };

    let guard = DB_LOCK.lock().await;
    let pool = create_pool(&database_url).await?;
    run_migrations(&pool).await?;

    let config = AppConfig {
        database_url,
        host: "127.0.0.1".into(),
        port: 0,
        jwt_secret: "test-secret".into(),
        token_ttl_hours: 1,
        anon_rate_per_minute: 10,
        user_rate_per_minute: 10,
    };
    let state = AppState::new(pool, &config);

    // Clean tables between runs
    let backend = state.orm.get_database_backend();
    state
        .orm
        .execute(Statement::from_string(
            backend,
            "TRUNCATE TABLE order_items, orders, cart_items, menu_items, categories, audit_logs, user_groups, users CASCADE",
        ))
        .await?;

    Ok(Some((state, guard)))
}

/// Register through the auth service and resolve roles the way the extractor does.
async fn create_user(
    state: &AppState,
    username: &str,
    role: Option<Role>,
) -> anyhow::Result<AuthUser> {
    auth_service::register_user(
        state,
        RegisterRequest {
            username: username.to_string(),
            email: None,
            password: "lemon-pass".into(),
        },
    )
    .await?;

    let token = auth_service::obtain_token(
        state,
        TokenRequest {
            username: username.to_string(),
            password: "lemon-pass".into(),
        },
    )
    .await?
    .data
    .expect("token")
    .token;
    let user_id = decode_token(&token, &state.jwt_secret)?;

    if let Some(role) = role {
        GroupActive {
            user_id: Set(user_id),
            group_name: Set(role.group_name().to_string()),
        }
        .insert(&state.orm)
        .await?;
    }

    refresh(
        state,
        AuthUser {
            user_id,
            username: username.to_string(),
            roles: Default::default(),
        },
    )
    .await
}

async fn refresh(state: &AppState, user: AuthUser) -> anyhow::Result<AuthUser> {
    let roles = group_service::roles_for(&state.orm, user.user_id).await?;
    Ok(AuthUser { roles, ..user })
}

async fn create_category(
    state: &AppState,
    manager: &AuthUser,
    slug: &str,
) -> anyhow::Result<Category> {
    let resp = category_service::create_category(
        state,
        manager,
        CreateCategoryRequest {
            slug: slug.to_string(),
            title: slug.to_uppercase(),
        },
    )
    .await?;
    Ok(resp.data.expect("category"))
}

async fn create_item(
    state: &AppState,
    manager: &AuthUser,
    title: &str,
    cents: i64,
    inventory: i32,
    category_id: Uuid,
) -> anyhow::Result<MenuItem> {
    let resp = menu_service::create_menu_item(
        state,
        manager,
        CreateMenuItemRequest {
            title: title.to_string(),
            price: Decimal::new(cents, 2),
            inventory,
            category_id,
        },
    )
    .await?;
    Ok(resp.data.expect("menu item"))
}

async fn inventory_of(state: &AppState, user: &AuthUser, id: Uuid) -> anyhow::Result<i32> {
    let resp = menu_service::get_menu_item(state, user, id).await?;
    Ok(resp.data.expect("menu item").inventory)
}

async fn add(
    state: &AppState,
    user: &AuthUser,
    menuitem_id: Uuid,
    quantity: i32,
) -> Result<(), AppError> {
    cart_service::add_to_cart(
        state,
        user,
        AddToCartRequest {
            menuitem_id,
            quantity,
        },
    )
    .await?;
    Ok(())
}

async fn patch(
    state: &AppState,
    user: &AuthUser,
    order_id: Uuid,
    status: Option<OrderStatus>,
    delivery_crew_id: Option<Uuid>,
) -> Result<Order, AppError> {
    let resp = order_service::update_order(
        state,
        user,
        order_id,
        UpdateMethod::Patch,
        OrderUpdateRequest {
            status,
            delivery_crew_id,
        },
    )
    .await?;
    Ok(resp.data.expect("order"))
}
