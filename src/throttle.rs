//! Per-identity request throttling with fixed one-minute windows.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use dashmap::DashMap;

use crate::error::{AppError, AppResult};

const WINDOW: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThrottleScope {
    /// Unauthenticated traffic, keyed by client address.
    AnonymousDefault,
    /// Authenticated traffic on sensitive endpoints, keyed by user.
    TenPerMinute,
}

impl ThrottleScope {
    pub fn name(&self) -> &'static str {
        match self {
            ThrottleScope::AnonymousDefault => "anonymous-default",
            ThrottleScope::TenPerMinute => "ten-per-minute",
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

#[derive(Debug, Clone)]
pub struct RateLimiter {
    windows: Arc<DashMap<(String, ThrottleScope), Window>>,
    anon_limit: u32,
    user_limit: u32,
}

impl RateLimiter {
    pub fn new(anon_limit: u32, user_limit: u32) -> Self {
        Self {
            windows: Arc::new(DashMap::new()),
            anon_limit,
            user_limit,
        }
    }

    pub fn limit(&self, scope: ThrottleScope) -> u32 {
        match scope {
            ThrottleScope::AnonymousDefault => self.anon_limit,
            ThrottleScope::TenPerMinute => self.user_limit,
        }
    }

    pub fn allow(&self, identity: &str, scope: ThrottleScope) -> bool {
        self.allow_at(identity, scope, Instant::now())
    }

    /// Count one request at `now`. The shard lock held by `entry` makes the
    /// increment-and-compare atomic per key.
    pub fn allow_at(&self, identity: &str, scope: ThrottleScope, now: Instant) -> bool {
        let limit = self.limit(scope);
        let mut window = self
            .windows
            .entry((identity.to_string(), scope))
            .or_insert(Window {
                started: now,
                count: 0,
            });

        if now.saturating_duration_since(window.started) >= WINDOW {
            window.started = now;
            window.count = 0;
        }
        if window.count >= limit {
            return false;
        }
        window.count += 1;
        true
    }

    pub fn check(&self, identity: &str, scope: ThrottleScope) -> AppResult<()> {
        if self.allow(identity, scope) {
            Ok(())
        } else {
            tracing::debug!(identity, scope = scope.name(), "request throttled");
            Err(AppError::Throttled)
        }
    }

    /// Drop windows that have fully elapsed.
    pub fn prune_expired(&self, now: Instant) {
        self.windows
            .retain(|_, window| now.saturating_duration_since(window.started) < WINDOW);
    }

    pub fn tracked_keys(&self) -> usize {
        self.windows.len()
    }
}
