use std::time::{Duration, Instant};

use little_lemon_api::{
    error::AppError,
    throttle::{RateLimiter, ThrottleScope},
};

#[test]
fn eleventh_request_in_a_minute_is_rejected() {
    let limiter = RateLimiter::new(10, 10);
    let start = Instant::now();

    for i in 0..10 {
        let now = start + Duration::from_secs(i);
        assert!(limiter.allow_at("user:1", ThrottleScope::TenPerMinute, now));
    }
    assert!(!limiter.allow_at(
        "user:1",
        ThrottleScope::TenPerMinute,
        start + Duration::from_secs(30)
    ));
}

#[test]
fn window_resets_after_a_minute() {
    let limiter = RateLimiter::new(10, 2);
    let start = Instant::now();

    assert!(limiter.allow_at("user:1", ThrottleScope::TenPerMinute, start));
    assert!(limiter.allow_at("user:1", ThrottleScope::TenPerMinute, start));
    assert!(!limiter.allow_at(
        "user:1",
        ThrottleScope::TenPerMinute,
        start + Duration::from_secs(59)
    ));
    assert!(limiter.allow_at(
        "user:1",
        ThrottleScope::TenPerMinute,
        start + Duration::from_secs(60)
    ));
}

#[test]
fn identities_and_scopes_are_counted_separately() {
    let limiter = RateLimiter::new(1, 1);
    let now = Instant::now();

    assert!(limiter.allow_at("user:1", ThrottleScope::TenPerMinute, now));
    assert!(!limiter.allow_at("user:1", ThrottleScope::TenPerMinute, now));

    assert!(limiter.allow_at("user:2", ThrottleScope::TenPerMinute, now));
    assert!(limiter.allow_at("user:1", ThrottleScope::AnonymousDefault, now));
    assert_eq!(limiter.tracked_keys(), 3);
}

#[test]
fn limits_follow_scope() {
    let limiter = RateLimiter::new(5, 10);
    assert_eq!(limiter.limit(ThrottleScope::AnonymousDefault), 5);
    assert_eq!(limiter.limit(ThrottleScope::TenPerMinute), 10);
    assert_eq!(ThrottleScope::TenPerMinute.name(), "ten-per-minute");
    assert_eq!(ThrottleScope::AnonymousDefault.name(), "anonymous-default");
}

#[test]
fn check_reports_throttled() {
    let limiter = RateLimiter::new(1, 1);
    limiter
        .check("addr:127.0.0.1", ThrottleScope::AnonymousDefault)
        .expect("first request passes");

    let err = limiter
        .check("addr:127.0.0.1", ThrottleScope::AnonymousDefault)
        .unwrap_err();
    assert!(matches!(err, AppError::Throttled));
    assert_eq!(err.status().as_u16(), 429);
}

#[test]
fn prune_drops_only_expired_windows() {
    let limiter = RateLimiter::new(10, 10);
    let start = Instant::now();

    limiter.allow_at("user:old", ThrottleScope::TenPerMinute, start);
    limiter.allow_at(
        "user:new",
        ThrottleScope::TenPerMinute,
        start + Duration::from_secs(30),
    );
    assert_eq!(limiter.tracked_keys(), 2);

    limiter.prune_expired(start + Duration::from_secs(61));
    assert_eq!(limiter.tracked_keys(), 1);
}

#[test]
fn clones_share_counters() {
    let limiter = RateLimiter::new(10, 1);
    let other = limiter.clone();
    let now = Instant::now();

    assert!(limiter.allow_at("user:1", ThrottleScope::TenPerMinute, now));
    assert!(!other.allow_at("user:1", ThrottleScope::TenPerMinute, now));
}

#[tokio::test]
async fn concurrent_requests_never_exceed_the_limit() {
    let limiter = RateLimiter::new(10, 10);
    let mut handles = Vec::new();
    for _ in 0..50 {
        let limiter = limiter.clone();
        handles.push(tokio::spawn(async move {
            limiter.allow("user:busy", ThrottleScope::TenPerMinute)
        }));
    }

    let mut allowed = 0;
    for handle in handles {
        if handle.await.expect("task") {
            allowed += 1;
        }
    }
    assert_eq!(allowed, 10);
}
