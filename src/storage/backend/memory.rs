//! In-process durable store
//!
//! Backs the test suites and embedded usage. Keeps per-operation call
//! counters so callers can assert how often the source of truth was read.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::trace;

use crate::errors::{LinkPulseError, Result};
use crate::storage::{
    ClickEvent, DurableStore, NewClickEvent, NewShortLink, ShortLink, StatsScope, TimeRange,
    UserId,
};

#[derive(Default)]
struct Tables {
    links: HashMap<i64, ShortLink>,
    /// short_code -> id
    codes: HashMap<String, i64>,
    clicks: Vec<ClickEvent>,
}

/// 调用计数快照
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StoreCallCounts {
    pub get_link_by_code: usize,
    pub increment_redirect_count: usize,
    pub insert_click_event: usize,
    pub count_links: usize,
    pub count_click_events: usize,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    next_link_id: AtomicU64,
    next_click_id: AtomicU64,
    get_calls: AtomicUsize,
    increment_calls: AtomicUsize,
    click_calls: AtomicUsize,
    count_link_calls: AtomicUsize,
    count_click_calls: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn call_counts(&self) -> StoreCallCounts {
        StoreCallCounts {
            get_link_by_code: self.get_calls.load(Ordering::Relaxed),
            increment_redirect_count: self.increment_calls.load(Ordering::Relaxed),
            insert_click_event: self.click_calls.load(Ordering::Relaxed),
            count_links: self.count_link_calls.load(Ordering::Relaxed),
            count_click_events: self.count_click_calls.load(Ordering::Relaxed),
        }
    }

    /// 按 id 读取（测试断言用）
    pub async fn link_by_id(&self, id: i64) -> Option<ShortLink> {
        self.tables.read().await.links.get(&id).cloned()
    }

    pub async fn click_events(&self) -> Vec<ClickEvent> {
        self.tables.read().await.clicks.clone()
    }

    /// 直接写入带指定时间戳的点击（用于构造历史数据）
    pub async fn seed_click(&self, event: NewClickEvent) -> ClickEvent {
        let mut tables = self.tables.write().await;
        let click = ClickEvent {
            id: self.next_click_id.fetch_add(1, Ordering::Relaxed) as i64 + 1,
            shortlink_id: event.shortlink_id,
            ip: event.ip,
            user_agent: event.user_agent,
            clicked_at: event.clicked_at,
        };
        tables.clicks.push(click.clone());
        click
    }
}

#[async_trait]
impl DurableStore for MemoryStore {
    async fn get_link_by_code(&self, code: &str) -> Result<Option<ShortLink>> {
        self.get_calls.fetch_add(1, Ordering::Relaxed);
        let tables = self.tables.read().await;
        Ok(tables
            .codes
            .get(code)
            .and_then(|id| tables.links.get(id))
            .cloned())
    }

    async fn code_exists(&self, code: &str) -> Result<bool> {
        Ok(self.tables.read().await.codes.contains_key(code))
    }

    async fn insert_link(&self, link: NewShortLink) -> Result<ShortLink> {
        let mut tables = self.tables.write().await;
        if tables.codes.contains_key(&link.short_code) {
            return Err(LinkPulseError::conflict(format!(
                "Short code already in use: {}",
                link.short_code
            )));
        }

        let now = Utc::now();
        let id = self.next_link_id.fetch_add(1, Ordering::Relaxed) as i64 + 1;
        let stored = ShortLink {
            id,
            owner: link.owner,
            original_url: link.original_url,
            short_code: link.short_code,
            status: link.status,
            redirect_count: 0,
            created_at: now,
            updated_at: now,
        };
        tables.codes.insert(stored.short_code.clone(), id);
        tables.links.insert(id, stored.clone());
        trace!("MemoryStore: inserted link {} ({})", stored.short_code, id);
        Ok(stored)
    }

    async fn update_link(&self, link: &ShortLink) -> Result<ShortLink> {
        let mut tables = self.tables.write().await;
        let Some(existing) = tables.links.get(&link.id).cloned() else {
            return Err(LinkPulseError::not_found(format!(
                "Shortlink not found: {}",
                link.id
            )));
        };

        if existing.short_code != link.short_code {
            if tables.codes.contains_key(&link.short_code) {
                return Err(LinkPulseError::conflict(format!(
                    "Short code already in use: {}",
                    link.short_code
                )));
            }
            tables.codes.remove(&existing.short_code);
            tables.codes.insert(link.short_code.clone(), link.id);
        }

        let updated = ShortLink {
            owner: existing.owner,
            redirect_count: existing.redirect_count,
            created_at: existing.created_at,
            updated_at: Utc::now(),
            ..link.clone()
        };
        tables.links.insert(link.id, updated.clone());
        Ok(updated)
    }

    async fn delete_link(&self, code: &str) -> Result<bool> {
        let mut tables = self.tables.write().await;
        match tables.codes.remove(code) {
            Some(id) => {
                tables.links.remove(&id);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn increment_redirect_count(&self, link_id: i64) -> Result<()> {
        self.increment_calls.fetch_add(1, Ordering::Relaxed);
        let mut tables = self.tables.write().await;
        if let Some(link) = tables.links.get_mut(&link_id) {
            link.redirect_count += 1;
            link.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn insert_click_event(&self, event: NewClickEvent) -> Result<ClickEvent> {
        self.click_calls.fetch_add(1, Ordering::Relaxed);
        Ok(self.seed_click(event).await)
    }

    async fn count_links(&self, scope: StatsScope) -> Result<u64> {
        self.count_link_calls.fetch_add(1, Ordering::Relaxed);
        let tables = self.tables.read().await;
        Ok(tables
            .links
            .values()
            .filter(|l| scope.contains(l.owner))
            .count() as u64)
    }

    async fn count_click_events(
        &self,
        scope: StatsScope,
        range: Option<TimeRange>,
    ) -> Result<u64> {
        self.count_click_calls.fetch_add(1, Ordering::Relaxed);
        let tables = self.tables.read().await;
        Ok(tables
            .clicks
            .iter()
            .filter(|c| range.is_none_or(|r| r.contains(c.clicked_at)))
            .filter(|c| {
                // 已删除链接的点击只计入全局范围
                match tables.links.get(&c.shortlink_id) {
                    Some(link) => scope.contains(link.owner),
                    None => scope == StatsScope::Global,
                }
            })
            .count() as u64)
    }

    async fn list_links(
        &self,
        owner: UserId,
        limit: u64,
        offset: u64,
    ) -> Result<(Vec<ShortLink>, u64)> {
        let tables = self.tables.read().await;
        let mut owned: Vec<ShortLink> = tables
            .links
            .values()
            .filter(|l| l.owner == Some(owner))
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        let total = owned.len() as u64;
        let items = owned
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect();
        Ok((items, total))
    }

    fn backend_name(&self) -> &str {
        "memory"
    }
}
