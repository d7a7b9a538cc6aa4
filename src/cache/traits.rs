use std::time::Duration;

use async_trait::async_trait;

use crate::errors::Result;

/// 外部键值缓存服务
///
/// 一致性约定：尽力而为，可能随时淘汰，跨 key 无事务。
/// 缓存中的任何值都不是唯一副本，丢失只会导致回源读取。
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// 读取原始字符串值，不存在返回 `Ok(None)`
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// 写入并设置过期时间
    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;

    /// 删除 key，返回是否确实删除
    async fn del(&self, key: &str) -> Result<bool>;

    /// 原子自增，不存在时从 0 开始，返回自增后的值
    async fn incr(&self, key: &str) -> Result<i64>;

    /// 为已存在的 key 设置过期时间，key 不存在返回 `false`
    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool>;

    /// 连通性检查
    async fn ping(&self) -> Result<()>;

    fn backend_name(&self) -> &'static str;
}
