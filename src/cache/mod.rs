//! Cache Store layer
//!
//! The cache never holds the only copy of anything. Every helper here treats
//! a failed or undecodable read as a miss and swallows failed writes, so a
//! broken cache degrades into extra durable-store reads and nothing worse.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{trace, warn};

use crate::config::CacheConfig;
use crate::errors::{LinkPulseError, Result};

pub mod keys;
pub mod store;
pub mod traits;

pub use keys::CacheKey;
pub use store::{MemoryCacheStore, RedisCacheStore};
pub use traits::CacheStore;

/// 根据配置创建缓存存储
pub fn create_cache_store(config: &CacheConfig) -> Result<Arc<dyn CacheStore>> {
    match config.backend.to_lowercase().as_str() {
        "redis" => Ok(Arc::new(RedisCacheStore::new(&config.redis_url)?)),
        "memory" => Ok(Arc::new(MemoryCacheStore::new())),
        other => Err(LinkPulseError::config(format!(
            "Unknown cache backend '{}'. Valid: redis, memory",
            other
        ))),
    }
}

/// 读取并反序列化缓存值
///
/// 读取失败或内容无法解析都按未命中处理（记录日志），调用方回源即可。
pub async fn get_json<T: DeserializeOwned>(
    cache: &dyn CacheStore,
    key: &CacheKey<'_>,
) -> Option<T> {
    let key = key.render();
    let raw = match cache.get(&key).await {
        Ok(Some(raw)) => raw,
        Ok(None) => {
            trace!("Cache miss: {}", key);
            return None;
        }
        Err(e) => {
            warn!("Cache read failed for '{}', treating as miss: {}", key, e);
            return None;
        }
    };

    match serde_json::from_str(&raw) {
        Ok(value) => {
            trace!("Cache hit: {}", key);
            Some(value)
        }
        Err(e) => {
            warn!("Undecodable cache entry '{}', treating as miss: {}", key, e);
            None
        }
    }
}

/// 序列化并写入缓存，失败只记录日志
pub async fn put_json<T: Serialize>(
    cache: &dyn CacheStore,
    key: &CacheKey<'_>,
    value: &T,
    ttl: Duration,
) {
    let key = key.render();
    let raw = match serde_json::to_string(value) {
        Ok(raw) => raw,
        Err(e) => {
            warn!("Failed to serialize cache entry '{}': {}", key, e);
            return;
        }
    };
    match cache.set_ex(&key, &raw, ttl).await {
        Ok(()) => trace!("Cache populated: {} ({}s)", key, ttl.as_secs()),
        Err(e) => warn!("Cache write failed for '{}': {}", key, e),
    }
}

/// 删除一组 key；每个 key 独立尝试，失败互不影响
pub async fn invalidate(cache: &dyn CacheStore, keys: &[CacheKey<'_>]) {
    for key in keys {
        let key = key.render();
        match cache.del(&key).await {
            Ok(removed) => trace!("Cache invalidated: {} (existed={})", key, removed),
            Err(e) => {
                let err = LinkPulseError::best_effort(format!("invalidate '{}': {}", key, e));
                warn!("{}", err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::UserId;

    #[tokio::test]
    async fn test_json_helpers() {
        let cache = MemoryCacheStore::new();
        let key = CacheKey::Profile(UserId(1));

        assert_eq!(get_json::<Vec<u32>>(&cache, &key).await, None);
        put_json(&cache, &key, &vec![1u32, 2, 3], Duration::from_secs(60)).await;
        assert_eq!(get_json::<Vec<u32>>(&cache, &key).await, Some(vec![1, 2, 3]));

        invalidate(&cache, &[key, CacheKey::GlobalStats]).await;
        assert!(!cache.contains("user:1:profile"));
    }

    #[tokio::test]
    async fn test_undecodable_entry_is_miss() {
        let cache = MemoryCacheStore::new();
        cache
            .set_ex("link:x:destination", "{not json", Duration::from_secs(60))
            .await
            .unwrap();
        let value: Option<u32> = get_json(&cache, &CacheKey::Destination("x")).await;
        assert_eq!(value, None);
    }

    #[test]
    fn test_factory_backends() {
        let mut config = CacheConfig {
            backend: "memory".into(),
            ..Default::default()
        };
        assert_eq!(create_cache_store(&config).unwrap().backend_name(), "memory");

        config.backend = "memcached".into();
        assert!(matches!(
            create_cache_store(&config).err(),
            Some(LinkPulseError::Config(_))
        ));
    }
}
