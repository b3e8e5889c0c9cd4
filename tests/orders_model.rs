use axum::http::StatusCode;
use little_lemon_api::{
    authz::Op,
    db::is_serialization_failure,
    dto::orders::OrderUpdateRequest,
    error::AppError,
    models::{
        MAX_AMOUNT, OrderStatus, TAX_MULTIPLIER, checked_line_total, ensure_amount, line_total,
        order_total,
    },
    routes::params::Pagination,
    services::{
        cart_service::validate_quantity,
        category_service::is_valid_slug,
        menu_service::{validate_inventory, validate_price},
        order_service::{UpdateMethod, requested_ops},
    },
};
use rust_decimal::Decimal;
use sea_orm::DbErr;
use uuid::Uuid;

#[test]
fn placed_order_can_be_delivered() {
    let next = OrderStatus::Placed
        .transition(OrderStatus::Delivered)
        .expect("valid transition");
    assert_eq!(next, OrderStatus::Delivered);
    assert!(next.as_flag());
    assert_eq!(OrderStatus::from_flag(false), OrderStatus::Placed);
}

#[test]
fn repeated_delivery_conflicts() {
    let err = OrderStatus::Delivered
        .transition(OrderStatus::Delivered)
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
    assert_eq!(err.status(), StatusCode::CONFLICT);
}

#[test]
fn delivered_order_cannot_be_reopened() {
    let err = OrderStatus::Delivered
        .transition(OrderStatus::Placed)
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[test]
fn line_and_order_totals_are_exact() {
    let soup = Decimal::new(999, 2);
    let dessert = Decimal::new(500, 2);

    assert_eq!(line_total(2, soup), Decimal::new(1998, 2));
    assert_eq!(
        order_total([(2, soup), (1, dessert)]),
        Decimal::new(2498, 2)
    );
    assert_eq!(order_total(std::iter::empty()), Decimal::ZERO);
}

#[test]
fn tax_multiplier_is_one_and_a_half() {
    assert_eq!(TAX_MULTIPLIER * Decimal::new(1000, 2), Decimal::new(1500, 2));
}

#[test]
fn empty_body_is_a_customer_update() {
    let ops = requested_ops(UpdateMethod::Patch, &OrderUpdateRequest::default()).expect("ops");
    assert_eq!(ops, vec![Op::Update]);
}

#[test]
fn status_patch_and_assignment_need_their_own_capabilities() {
    let payload = OrderUpdateRequest {
        status: Some(OrderStatus::Delivered),
        delivery_crew_id: Some(Uuid::new_v4()),
    };
    let ops = requested_ops(UpdateMethod::Patch, &payload).expect("ops");
    assert_eq!(ops, vec![Op::Assign, Op::StatusPatch]);

    let assign_only = OrderUpdateRequest {
        status: None,
        delivery_crew_id: Some(Uuid::new_v4()),
    };
    let ops = requested_ops(UpdateMethod::Put, &assign_only).expect("ops");
    assert_eq!(ops, vec![Op::Assign]);
}

#[test]
fn status_cannot_change_through_put() {
    let payload = OrderUpdateRequest {
        status: Some(OrderStatus::Delivered),
        delivery_crew_id: None,
    };
    assert!(matches!(
        requested_ops(UpdateMethod::Put, &payload),
        Err(AppError::Validation(_))
    ));
}

#[test]
fn input_validators() {
    assert!(validate_quantity(1).is_ok());
    assert!(validate_quantity(0).is_err());

    assert!(validate_price(Decimal::new(1250, 2)).is_ok());
    assert!(validate_price(Decimal::new(-1, 0)).is_err());
    assert!(validate_price(Decimal::new(12345, 3)).is_err());

    assert!(validate_inventory(0).is_ok());
    assert!(validate_inventory(-1).is_err());

    assert!(is_valid_slug("main-dishes"));
    assert!(!is_valid_slug("Main Dishes"));
    assert!(!is_valid_slug(""));
}

#[test]
fn errors_map_to_status_and_kind() {
    let cases = [
        (AppError::Unauthenticated, StatusCode::UNAUTHORIZED, "unauthenticated"),
        (AppError::Forbidden, StatusCode::FORBIDDEN, "forbidden"),
        (AppError::NotFound, StatusCode::NOT_FOUND, "not_found"),
        (AppError::Conflict("dup".into()), StatusCode::CONFLICT, "conflict"),
        (AppError::Validation("bad".into()), StatusCode::BAD_REQUEST, "validation_error"),
        (AppError::Throttled, StatusCode::TOO_MANY_REQUESTS, "throttled"),
        (AppError::EmptyCart, StatusCode::BAD_REQUEST, "empty_cart"),
    ];
    for (err, status, kind) in cases {
        assert_eq!(err.status(), status);
        assert_eq!(err.kind(), kind);
    }
}

#[test]
fn amounts_are_bounded_by_the_money_column() {
    assert_eq!(MAX_AMOUNT, Decimal::new(9_999_999_999, 2));
    assert!(ensure_amount(MAX_AMOUNT, "total").is_ok());
    assert!(matches!(
        ensure_amount(MAX_AMOUNT + Decimal::new(1, 2), "total"),
        Err(AppError::Validation(_))
    ));

    let soup = Decimal::new(999, 2);
    assert_eq!(checked_line_total(2, soup).expect("fits"), Decimal::new(1998, 2));
    let err = checked_line_total(2_000_000_000, soup).unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);

    assert!(validate_price(MAX_AMOUNT).is_ok());
    assert!(validate_price(Decimal::new(100_000_000_000, 2)).is_err());
}

#[test]
fn pagination_offsets() {
    let page = |page, per_page| Pagination { page, per_page }.normalize();

    assert_eq!(page(None, None), (1, 20, Some(0)));
    assert_eq!(page(Some(3), Some(20)), (3, 20, Some(40)));
    assert_eq!(page(Some(0), Some(500)), (1, 100, Some(0)));
    assert_eq!(page(Some(2), Some(0)), (2, 1, Some(1)));
}

#[test]
fn unreachable_page_has_no_offset() {
    let (page, per_page, offset) = Pagination {
        page: Some(i64::MAX),
        per_page: Some(100),
    }
    .normalize();
    assert_eq!((page, per_page), (i64::MAX, 100));
    assert_eq!(offset, None);
}

#[test]
fn only_serialization_failures_are_retried() {
    assert!(!is_serialization_failure(&DbErr::RecordNotFound("order".into())));
    assert!(!is_serialization_failure(&DbErr::Custom("40001".into())));
}
