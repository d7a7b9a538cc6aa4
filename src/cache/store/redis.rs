use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use redis::{AsyncCommands, aio::MultiplexedConnection};
use tokio::sync::RwLock;
use tracing::{debug, error, trace};

use crate::cache::CacheStore;
use crate::errors::{LinkPulseError, Result};

/// Redis 缓存存储
///
/// key 原样写入（不加前缀），与其它共享同一 Redis 的服务保持 key 兼容。
pub struct RedisCacheStore {
    client: redis::Client,
    /// 持久化连接，使用 RwLock 保护
    connection: Arc<RwLock<Option<MultiplexedConnection>>>,
}

impl RedisCacheStore {
    /// 只校验 URL，不建立连接；首次操作时才连接
    pub fn new(redis_url: &str) -> Result<Self> {
        let client = redis::Client::open(redis_url).map_err(|e| {
            LinkPulseError::config(format!("Invalid Redis URL '{}': {}", redis_url, e))
        })?;

        debug!("RedisCacheStore created for {}", redis_url);

        Ok(Self {
            client,
            connection: Arc::new(RwLock::new(None)),
        })
    }

    /// 获取或建立持久连接
    async fn get_connection(&self) -> Result<MultiplexedConnection> {
        {
            let conn_guard = self.connection.read().await;
            if let Some(ref conn) = *conn_guard {
                return Ok(conn.clone());
            }
        }

        let mut conn_guard = self.connection.write().await;

        // 双重检查，避免竞态条件
        if let Some(ref conn) = *conn_guard {
            return Ok(conn.clone());
        }

        let new_conn = match self.client.get_multiplexed_async_connection().await {
            Ok(conn) => conn,
            Err(e) => {
                error!("Failed to get Redis connection: {}", e);
                return Err(e.into());
            }
        };
        *conn_guard = Some(new_conn.clone());
        debug!("Redis connection established and cached");

        Ok(new_conn)
    }

    /// 重置连接（在连接错误时调用）
    async fn reset_connection(&self) {
        let mut conn_guard = self.connection.write().await;
        *conn_guard = None;
        debug!("Redis connection reset due to error");
    }

    /// 命令失败时重置连接并把错误向上传递
    async fn fail<T>(&self, op: &str, key: &str, e: redis::RedisError) -> Result<T> {
        error!("Redis {} failed for key '{}': {}", op, key, e);
        self.reset_connection().await;
        Err(e.into())
    }
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.get_connection().await?;
        match conn.get::<_, Option<String>>(key).await {
            Ok(value) => {
                trace!("Redis GET {} -> hit={}", key, value.is_some());
                Ok(value)
            }
            Err(e) => self.fail("GET", key, e).await,
        }
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let mut conn = self.get_connection().await?;
        // SETEX 不接受 0 秒
        let secs = ttl.as_secs().max(1);
        match conn.set_ex::<_, _, ()>(key, value, secs).await {
            Ok(()) => {
                trace!("Redis SETEX {} ({}s)", key, secs);
                Ok(())
            }
            Err(e) => self.fail("SETEX", key, e).await,
        }
    }

    async fn del(&self, key: &str) -> Result<bool> {
        let mut conn = self.get_connection().await?;
        match conn.del::<_, i64>(key).await {
            Ok(deleted) => {
                trace!("Redis DEL {} -> {}", key, deleted);
                Ok(deleted > 0)
            }
            Err(e) => self.fail("DEL", key, e).await,
        }
    }

    async fn incr(&self, key: &str) -> Result<i64> {
        let mut conn = self.get_connection().await?;
        match conn.incr::<_, _, i64>(key, 1).await {
            Ok(count) => Ok(count),
            Err(e) => self.fail("INCR", key, e).await,
        }
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool> {
        let mut conn = self.get_connection().await?;
        let secs = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX).max(1);
        match conn.expire::<_, bool>(key, secs).await {
            Ok(applied) => Ok(applied),
            Err(e) => self.fail("EXPIRE", key, e).await,
        }
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self.get_connection().await?;
        match redis::cmd("PING").query_async::<String>(&mut conn).await {
            Ok(response) => {
                debug!("Redis ping: {}", response);
                Ok(())
            }
            Err(e) => self.fail("PING", "-", e).await,
        }
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_malformed_url() {
        let err = RedisCacheStore::new("not a url").err().unwrap();
        assert!(matches!(err, LinkPulseError::Config(_)));
    }

    #[test]
    fn test_construct_without_server() {
        // 构造不连接服务器
        let store = RedisCacheStore::new("redis://127.0.0.1:1/").unwrap();
        assert_eq!(store.backend_name(), "redis");
    }
}
