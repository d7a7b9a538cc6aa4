use std::sync::Arc;

use async_trait::async_trait;

use crate::errors::Result;

pub mod backend;
pub mod models;

pub use backend::{MemoryStore, SeaOrmStore};
pub use models::{
    ClickEvent, DailyVisits, DashboardStats, LinkPage, LinkStatus, NewClickEvent, NewShortLink,
    ShortLink, StatsScope, TimeRange, UserId,
};

/// 持久化存储（事实来源）
///
/// Shortlink 与 ClickEvent 的唯一权威副本都在这里；缓存层只保存可丢弃的副本。
/// 实现负责短码唯一性：重复短码的插入/更新必须返回 `Conflict`。
#[async_trait]
pub trait DurableStore: Send + Sync {
    async fn get_link_by_code(&self, code: &str) -> Result<Option<ShortLink>>;

    async fn code_exists(&self, code: &str) -> Result<bool>;

    async fn insert_link(&self, link: NewShortLink) -> Result<ShortLink>;

    /// 按 id 覆盖 owner 以外的可变字段，返回更新后的记录
    async fn update_link(&self, link: &ShortLink) -> Result<ShortLink>;

    /// 返回是否确实删除了一条记录
    async fn delete_link(&self, code: &str) -> Result<bool>;

    async fn increment_redirect_count(&self, link_id: i64) -> Result<()>;

    async fn insert_click_event(&self, event: NewClickEvent) -> Result<ClickEvent>;

    async fn count_links(&self, scope: StatsScope) -> Result<u64>;

    /// `range` 为 `None` 时统计全部时间
    async fn count_click_events(&self, scope: StatsScope, range: Option<TimeRange>)
    -> Result<u64>;

    /// 按创建时间倒序分页
    async fn list_links(&self, owner: UserId, limit: u64, offset: u64)
    -> Result<(Vec<ShortLink>, u64)>;

    fn backend_name(&self) -> &str;
}

pub struct StorageFactory;

impl StorageFactory {
    /// 根据数据库 URL 创建 SeaORM 存储
    pub async fn create(database_url: &str, pool_size: u32) -> Result<Arc<dyn DurableStore>> {
        let backend_type = backend::infer_backend_from_url(database_url)?;
        let storage = SeaOrmStore::new(database_url, &backend_type, pool_size).await?;
        Ok(Arc::new(storage))
    }
}
