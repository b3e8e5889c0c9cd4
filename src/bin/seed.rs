use little_lemon_api::{
    authz::Role,
    config::AppConfig,
    db::{create_pool, run_migrations},
    services::auth_service::hash_password,
};
use rust_decimal::Decimal;
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    run_migrations(&pool).await?;

    let manager_id =
        ensure_user(&pool, "manager", "manager@littlelemon.com", "lemon-manager").await?;
    ensure_membership(&pool, manager_id, Role::Manager).await?;

    let crew_id = ensure_user(&pool, "crew", "crew@littlelemon.com", "lemon-crew").await?;
    ensure_membership(&pool, crew_id, Role::DeliveryCrew).await?;

    let customer_id =
        ensure_user(&pool, "customer", "customer@example.com", "lemon-customer").await?;

    seed_menu(&pool).await?;

    println!(
        "Seed completed. Manager ID: {manager_id}, Crew ID: {crew_id}, Customer ID: {customer_id}"
    );
    Ok(())
}

async fn ensure_user(
    pool: &sqlx::PgPool,
    username: &str,
    email: &str,
    password: &str,
) -> anyhow::Result<Uuid> {
    let password_hash = hash_password(password)?;

    let row: Option<(Uuid,)> = sqlx::query_as(
        r#"
        INSERT INTO users (id, username, email, password_hash)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (username) DO NOTHING
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(username)
    .bind(email)
    .bind(password_hash)
    .fetch_optional(pool)
    .await?;

    let user_id = match row {
        Some((id,)) => id,
        None => {
            let existing: (Uuid,) = sqlx::query_as("SELECT id FROM users WHERE username = $1")
                .bind(username)
                .fetch_one(pool)
                .await?;
            existing.0
        }
    };

    println!("Ensured user {username}");
    Ok(user_id)
}

async fn ensure_membership(pool: &sqlx::PgPool, user_id: Uuid, role: Role) -> anyhow::Result<()> {
    sqlx::query(
        "INSERT INTO user_groups (user_id, group_name) VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(user_id)
    .bind(role.group_name())
    .execute(pool)
    .await?;
    Ok(())
}

async fn ensure_category(pool: &sqlx::PgPool, slug: &str, title: &str) -> anyhow::Result<Uuid> {
    let (id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO categories (id, slug, title)
        VALUES ($1, $2, $3)
        ON CONFLICT (slug) DO UPDATE SET title = EXCLUDED.title
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(slug)
    .bind(title)
    .fetch_one(pool)
    .await?;
    Ok(id)
}

async fn seed_menu(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    let mains = ensure_category(pool, "mains", "Mains").await?;
    let desserts = ensure_category(pool, "desserts", "Desserts").await?;

    let items = vec![
        ("Greek Salad", Decimal::new(1250, 2), 40, mains),
        ("Bruschetta", Decimal::new(799, 2), 60, mains),
        ("Lemon Soup", Decimal::new(999, 2), 30, mains),
        ("Lemon Dessert", Decimal::new(500, 2), 25, desserts),
        ("Baklava", Decimal::new(650, 2), 20, desserts),
    ];

    for (title, price, inventory, category_id) in items {
        sqlx::query(
            r#"
            INSERT INTO menu_items (id, title, price, inventory, category_id)
            SELECT $1, $2, $3, $4, $5
            WHERE NOT EXISTS (SELECT 1 FROM menu_items WHERE title = $2)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(title)
        .bind(price)
        .bind(inventory)
        .bind(category_id)
        .execute(pool)
        .await?;
    }

    println!("Seeded menu");
    Ok(())
}
