//! Shared fixtures for integration tests

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use linkpulse::LinkPulse;
use linkpulse::cache::{CacheStore, MemoryCacheStore};
use linkpulse::config::{RateLimitRule, StaticConfig};
use linkpulse::errors::{LinkPulseError, Result};
use linkpulse::storage::MemoryStore;

/// 可注入故障的缓存：包一层 MemoryCacheStore
#[derive(Default)]
pub struct FlakyCache {
    pub inner: MemoryCacheStore,
    pub fail_get: AtomicBool,
    pub fail_set: AtomicBool,
    pub fail_del: AtomicBool,
    pub fail_incr: AtomicBool,
    pub fail_expire: AtomicBool,
    /// 写入前等待（毫秒），0 表示不等待
    pub set_ex_delay_ms: AtomicU64,
    pub expire_delay_ms: AtomicU64,
}

impl FlakyCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_all(&self, on: bool) {
        for flag in [
            &self.fail_get,
            &self.fail_set,
            &self.fail_del,
            &self.fail_incr,
            &self.fail_expire,
        ] {
            flag.store(on, Ordering::SeqCst);
        }
    }

    async fn stall(delay_ms: &AtomicU64) {
        let ms = delay_ms.load(Ordering::SeqCst);
        if ms > 0 {
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }
    }

    fn check(flag: &AtomicBool, op: &str) -> Result<()> {
        if flag.load(Ordering::SeqCst) {
            Err(LinkPulseError::cache_operation(format!("injected {} failure", op)))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl CacheStore for FlakyCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Self::check(&self.fail_get, "GET")?;
        self.inner.get(key).await
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        Self::stall(&self.set_ex_delay_ms).await;
        Self::check(&self.fail_set, "SETEX")?;
        self.inner.set_ex(key, value, ttl).await
    }

    async fn del(&self, key: &str) -> Result<bool> {
        Self::check(&self.fail_del, "DEL")?;
        self.inner.del(key).await
    }

    async fn incr(&self, key: &str) -> Result<i64> {
        Self::check(&self.fail_incr, "INCR")?;
        self.inner.incr(key).await
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool> {
        Self::stall(&self.expire_delay_ms).await;
        Self::check(&self.fail_expire, "EXPIRE")?;
        self.inner.expire(key, ttl).await
    }

    async fn ping(&self) -> Result<()> {
        Self::check(&self.fail_get, "PING")
    }

    fn backend_name(&self) -> &'static str {
        "flaky"
    }
}

/// 测试用配置：创建端点放宽到 `create_limit` 次 / 60s
pub fn test_config(create_limit: u64) -> StaticConfig {
    let mut config = StaticConfig::default();
    config.rate_limit.endpoints.insert(
        linkpulse::config::CREATE_LINK_ENDPOINT.to_string(),
        RateLimitRule::new(create_limit, Duration::from_secs(60)),
    );
    config
}

pub struct TestApp {
    pub app: LinkPulse,
    pub store: Arc<MemoryStore>,
    pub cache: Arc<FlakyCache>,
}

pub fn test_app(config: &StaticConfig) -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let cache = Arc::new(FlakyCache::new());
    let app = LinkPulse::new(store.clone(), cache.clone(), config);
    TestApp { app, store, cache }
}
