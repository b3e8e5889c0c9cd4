use std::sync::Arc;

use crate::{
    config::AppConfig,
    db::{DbPool, OrmConn, orm_from_pool},
    throttle::RateLimiter,
};

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub orm: OrmConn,
    pub jwt_secret: Arc<str>,
    pub token_ttl_hours: i64,
    pub limiter: RateLimiter,
}

impl AppState {
    pub fn new(pool: DbPool, config: &AppConfig) -> Self {
        Self {
            orm: orm_from_pool(pool.clone()),
            pool,
            jwt_secret: Arc::from(config.jwt_secret.as_str()),
            token_ttl_hours: config.token_ttl_hours,
            limiter: RateLimiter::new(config.anon_rate_per_minute, config.user_rate_per_minute),
        }
    }
}
