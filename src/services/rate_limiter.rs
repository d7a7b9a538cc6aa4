//! Fixed-window admission control
//!
//! The first request in a window creates the counter and sets its expiry, so
//! the window starts at that request and ends when the key expires. Bursts of
//! up to `2 * max_requests` are possible across a window boundary.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, warn};

use crate::cache::{CacheKey, CacheStore};
use crate::config::RateLimitConfig;
use crate::errors::{LinkPulseError, Result};

/// 放行结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Admission {
    /// 当前窗口内（含本次）的请求数
    pub count: u64,
    pub limit: u64,
}

impl Admission {
    pub fn remaining(&self) -> u64 {
        self.limit.saturating_sub(self.count)
    }
}

pub struct RateLimiter {
    cache: Arc<dyn CacheStore>,
    config: RateLimitConfig,
}

impl RateLimiter {
    pub fn new(cache: Arc<dyn CacheStore>, config: RateLimitConfig) -> Self {
        Self { cache, config }
    }

    /// 计数并判断是否放行
    ///
    /// 缓存故障一律拒绝（`Internal`），不会放行。
    pub async fn admit(&self, identity: &str, endpoint: &str) -> Result<Admission> {
        let rule = self.config.rule_for(endpoint);
        let key = CacheKey::RateLimit { identity, endpoint }.render();

        // INCR 与 EXPIRE 在独立任务中完成，调用方被取消时计数器仍会拿到过期时间
        let count = tokio::spawn(count_hit(self.cache.clone(), key, rule.window()))
            .await
            .map_err(|e| LinkPulseError::internal(format!("rate limiter task failed: {}", e)))??;

        let count = u64::try_from(count).unwrap_or(0);
        if count > rule.max_requests {
            debug!(
                "Rate limited {} on {} ({}/{})",
                identity, endpoint, count, rule.max_requests
            );
            return Err(LinkPulseError::rate_limited(format!(
                "Too many requests to {}: limit is {} per {}s",
                endpoint, rule.max_requests, rule.window_secs
            )));
        }

        Ok(Admission {
            count,
            limit: rule.max_requests,
        })
    }
}

/// 窗口内计数 +1；第一次命中时设置过期时间
async fn count_hit(cache: Arc<dyn CacheStore>, key: String, window: Duration) -> Result<i64> {
    let count = cache.incr(&key).await.map_err(|e| {
        error!("Rate limiter INCR failed for '{}': {}", key, e);
        LinkPulseError::internal(format!("rate limiter unavailable: {}", e.message()))
    })?;

    if count == 1
        && let Err(e) = cache.expire(&key, window).await
    {
        // 没有过期时间的计数器会永久封禁该身份，尽力删除
        error!("Rate limiter EXPIRE failed for '{}': {}", key, e);
        if let Err(del_err) = cache.del(&key).await {
            warn!("Failed to remove unexpiring counter '{}': {}", key, del_err);
        }
        return Err(LinkPulseError::internal(format!(
            "rate limiter unavailable: {}",
            e.message()
        )));
    }

    Ok(count)
}
