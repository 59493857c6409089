use anyhow::Result;
use redis::AsyncCommands;
use uuid::Uuid;

use crate::config::rate_limits::{current_window, RateLimits};
use crate::infra::cache::RedisCache;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitInfo {
    pub limited: bool,
    pub limit: u32,
    pub remaining: u32,
}

impl RateLimitInfo {
    fn unlimited() -> Self {
        Self {
            limited: false,
            limit: 0,
            remaining: 0,
        }
    }
}

/// Fixed-window counters in Redis, one key per (user, action, window).
#[derive(Clone)]
pub struct RateLimiter {
    cache: RedisCache,
    limits: RateLimits,
}

impl RateLimiter {
    pub fn new(cache: RedisCache, limits: RateLimits) -> Self {
        Self { cache, limits }
    }

    pub fn cache(&self) -> &RedisCache {
        &self.cache
    }

    /// Counts the attempt and reports whether it went over the quota.
    /// Attempts over the limit are counted too.
    pub async fn hit(&self, user_id: Uuid, action: &str) -> Result<RateLimitInfo> {
        let Some((limit, window)) = self.limits.limit_for_action(action) else {
            return Ok(RateLimitInfo::unlimited());
        };

        let window_seconds = window.seconds();
        let key = format!(
            "ratelimit:{}:{}:{}",
            user_id,
            action,
            current_window(window_seconds)
        );

        let mut conn = self.cache.client().get_multiplexed_async_connection().await?;
        let count: u32 = conn.incr(&key, 1).await?;
        if count == 1 {
            let _: () = conn.expire(&key, window_seconds as i64).await?;
        }

        if count > limit {
            tracing::debug!(
                user_id = %user_id,
                action = action,
                window = ?window,
                count = count,
                limit = limit,
                "rate limit exceeded"
            );
            return Ok(RateLimitInfo {
                limited: true,
                limit,
                remaining: 0,
            });
        }

        Ok(RateLimitInfo {
            limited: false,
            limit,
            remaining: limit - count,
        })
    }
}
