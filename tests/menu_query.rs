use little_lemon_api::{
    error::AppError,
    routes::params::MenuItemQuery,
    services::menu_query::{
        DEFAULT_PER_PAGE, MenuQueryPlan, PageSpec, SortField, SortKey, parse_ordering,
    },
};
use rust_decimal::Decimal;
use sea_orm::{DbBackend, QueryTrait};

fn sql(plan: &MenuQueryPlan) -> String {
    plan.select().build(DbBackend::Postgres).to_string()
}

#[test]
fn ordering_parses_direction_and_aliases() {
    let keys = parse_ordering("price,-title, stock ,category_id").expect("valid ordering");
    assert_eq!(
        keys,
        vec![
            SortKey { field: SortField::Price, descending: false },
            SortKey { field: SortField::Title, descending: true },
            SortKey { field: SortField::Inventory, descending: false },
            SortKey { field: SortField::Category, descending: false },
        ]
    );
}

#[test]
fn ordering_skips_empty_segments() {
    let keys = parse_ordering(",price,,").expect("valid ordering");
    assert_eq!(keys.len(), 1);
}

#[test]
fn unknown_ordering_field_is_rejected() {
    let err = parse_ordering("price,password").unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[test]
fn defaults_apply_when_query_is_empty() {
    let plan = MenuQueryPlan::from_query(MenuItemQuery::default()).expect("plan");
    assert!(plan.sort.is_empty());
    assert_eq!(plan.page, PageSpec { page: 1, per_page: DEFAULT_PER_PAGE });
    assert_eq!(plan.filter.category, None);
    assert_eq!(plan.filter.search, None);
}

#[test]
fn non_positive_perpage_is_rejected() {
    for perpage in [0, -3] {
        let query = MenuItemQuery {
            perpage: Some(perpage),
            ..Default::default()
        };
        assert!(matches!(
            MenuQueryPlan::from_query(query),
            Err(AppError::Validation(_))
        ));
    }
}

#[test]
fn page_offsets() {
    assert_eq!(PageSpec { page: 1, per_page: 2 }.offset(), Some(0));
    assert_eq!(PageSpec { page: 3, per_page: 2 }.offset(), Some(4));
    assert_eq!(PageSpec { page: 0, per_page: 2 }.offset(), None);
    assert_eq!(PageSpec { page: -1, per_page: 2 }.offset(), None);
}

#[test]
fn filters_compose_into_sql() {
    let plan = MenuQueryPlan::from_query(MenuItemQuery {
        category: Some("Main".into()),
        to_price: Some(Decimal::new(999, 2)),
        search: Some("Soup".into()),
        ..Default::default()
    })
    .expect("plan");
    let sql = sql(&plan);

    assert!(sql.contains(r#"LOWER("categories"."title") = 'main'"#), "{sql}");
    assert!(sql.contains(r#""menu_items"."price" ="#), "{sql}");
    assert!(sql.contains(r#""menu_items"."title" LIKE '%Soup%'"#), "{sql}");
}

#[test]
fn blank_filters_are_ignored() {
    let plan = MenuQueryPlan::from_query(MenuItemQuery {
        category: Some("  ".into()),
        search: Some(String::new()),
        ..Default::default()
    })
    .expect("plan");
    let sql = sql(&plan);
    assert!(!sql.contains("LOWER"), "{sql}");
    assert!(!sql.contains("LIKE"), "{sql}");
}

#[test]
fn sort_keys_keep_order_and_end_with_id() {
    let plan = MenuQueryPlan::from_query(MenuItemQuery {
        ordering: Some("-price,title".into()),
        ..Default::default()
    })
    .expect("plan");
    let sql = sql(&plan);

    assert!(
        sql.contains(
            r#"ORDER BY "menu_items"."price" DESC, "menu_items"."title" ASC, "menu_items"."id" ASC"#
        ),
        "{sql}"
    );
}

#[test]
fn explicit_id_ordering_is_not_duplicated() {
    let plan = MenuQueryPlan::from_query(MenuItemQuery {
        ordering: Some("-id".into()),
        ..Default::default()
    })
    .expect("plan");
    let sql = sql(&plan);

    assert!(sql.contains(r#"ORDER BY "menu_items"."id" DESC"#), "{sql}");
    assert!(!sql.contains(r#""menu_items"."id" ASC"#), "{sql}");
}

#[test]
fn like_wildcards_in_search_are_escaped() {
    let plan = MenuQueryPlan::from_query(MenuItemQuery {
        search: Some("100%".into()),
        ..Default::default()
    })
    .expect("plan");
    let sql = sql(&plan);
    assert!(!sql.contains("'%100%%'"), "{sql}");
}
