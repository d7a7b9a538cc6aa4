use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::time::Instant;

use crate::cache::CacheStore;
use crate::errors::{LinkPulseError, Result};

#[derive(Debug, Clone)]
struct Slot {
    value: String,
    /// `None` 表示永不过期（INCR 新建的 key 在 EXPIRE 之前即如此）
    expires_at: Option<Instant>,
}

impl Slot {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// 进程内缓存存储，语义对齐 Redis 的 GET/SETEX/DEL/INCR/EXPIRE
///
/// 过期基于 `tokio::time::Instant`，测试中可以用 `tokio::time::pause` 推进时间。
#[derive(Default, Clone)]
pub struct MemoryCacheStore {
    inner: Arc<DashMap<String, Slot>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 剩余存活时间；不存在或无过期时间返回 `None`
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        let now = Instant::now();
        let entry = self.inner.get(key)?;
        if entry.is_expired(now) {
            return None;
        }
        entry.expires_at.map(|at| at.saturating_duration_since(now))
    }

    pub fn contains(&self, key: &str) -> bool {
        let now = Instant::now();
        self.inner.get(key).is_some_and(|e| !e.is_expired(now))
    }

    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.inner.iter().filter(|e| !e.is_expired(now)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let now = Instant::now();
        let expired = match self.inner.get(key) {
            Some(entry) if !entry.is_expired(now) => return Ok(Some(entry.value.clone())),
            Some(_) => true,
            None => false,
        };
        if expired {
            self.inner.remove_if(key, |_, e| e.is_expired(now));
        }
        Ok(None)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        self.inner.insert(
            key.to_string(),
            Slot {
                value: value.to_string(),
                expires_at: Some(Instant::now() + ttl),
            },
        );
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<bool> {
        let now = Instant::now();
        Ok(self
            .inner
            .remove(key)
            .is_some_and(|(_, e)| !e.is_expired(now)))
    }

    async fn incr(&self, key: &str) -> Result<i64> {
        let now = Instant::now();
        match self.inner.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                let entry = occupied.get_mut();
                if entry.is_expired(now) {
                    *entry = Slot {
                        value: "1".to_string(),
                        expires_at: None,
                    };
                    return Ok(1);
                }
                let current: i64 = entry.value.parse().map_err(|_| {
                    LinkPulseError::cache_operation(format!(
                        "value at '{}' is not an integer",
                        key
                    ))
                })?;
                let next = current.checked_add(1).ok_or_else(|| {
                    LinkPulseError::cache_operation(format!("increment overflow at '{}'", key))
                })?;
                entry.value = next.to_string();
                Ok(next)
            }
            Entry::Vacant(vacant) => {
                vacant.insert(Slot {
                    value: "1".to_string(),
                    expires_at: None,
                });
                Ok(1)
            }
        }
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool> {
        let now = Instant::now();
        match self.inner.get_mut(key) {
            Some(mut entry) if !entry.is_expired(now) => {
                entry.expires_at = Some(now + ttl);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_set_ex_expires() {
        let store = MemoryCacheStore::new();
        store
            .set_ex("k", "v", Duration::from_secs(10))
            .await
            .unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));

        tokio::time::advance(Duration::from_secs(11)).await;
        assert_eq!(store.get("k").await.unwrap(), None);
        assert!(store.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_incr_then_expire() {
        let store = MemoryCacheStore::new();
        assert_eq!(store.incr("c").await.unwrap(), 1);
        assert_eq!(store.ttl("c"), None);
        assert!(store.expire("c", Duration::from_secs(60)).await.unwrap());
        assert_eq!(store.incr("c").await.unwrap(), 2);

        // INCR 不改变过期时间
        assert_eq!(store.ttl("c"), Some(Duration::from_secs(60)));

        tokio::time::advance(Duration::from_secs(61)).await;
        assert_eq!(store.incr("c").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_incr_non_integer_fails() {
        let store = MemoryCacheStore::new();
        store
            .set_ex("s", "hello", Duration::from_secs(10))
            .await
            .unwrap();
        assert!(matches!(
            store.incr("s").await,
            Err(LinkPulseError::CacheOperation(_))
        ));
    }

    #[tokio::test]
    async fn test_expire_missing_key() {
        let store = MemoryCacheStore::new();
        assert!(!store.expire("none", Duration::from_secs(1)).await.unwrap());
        assert!(!store.del("none").await.unwrap());
    }
}
