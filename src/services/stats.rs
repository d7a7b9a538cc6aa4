//! Dashboard statistics
//!
//! Per-scope aggregates are cached for `stats_ttl` and recomputed from the
//! durable store on a miss. Invalidation is driven by the click recorder and
//! by link mutations.
//!
//! Conventions for the time series:
//! - Days are UTC calendar days labelled `YYYY-MM-DD`, oldest first, today last.
//! - Week windows are anchored at computation time: this week is
//!   `[now - 7d, now)`, last week is `[now - 14d, now - 7d)`.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Days, NaiveDate, TimeDelta, Utc};
use tracing::debug;

use crate::cache::{self, CacheKey, CacheStore};
use crate::errors::{LinkPulseError, Result};
use crate::storage::{DailyVisits, DashboardStats, DurableStore, StatsScope, TimeRange};

/// 日序列长度
pub const SERIES_DAYS: u64 = 7;

pub struct StatsAggregator {
    store: Arc<dyn DurableStore>,
    cache: Arc<dyn CacheStore>,
    ttl: Duration,
}

impl StatsAggregator {
    pub fn new(store: Arc<dyn DurableStore>, cache: Arc<dyn CacheStore>, ttl: Duration) -> Self {
        Self { store, cache, ttl }
    }

    /// 读取统计（缓存优先）
    pub async fn get_stats(&self, scope: StatsScope) -> Result<DashboardStats> {
        let key = CacheKey::stats(scope);
        if let Some(stats) = cache::get_json::<DashboardStats>(self.cache.as_ref(), &key).await {
            return Ok(stats);
        }

        let stats = self
            .compute(scope, Utc::now())
            .await
            .map_err(|e| e.or_internal("compute dashboard stats"))?;
        cache::put_json(self.cache.as_ref(), &key, &stats, self.ttl).await;
        Ok(stats)
    }

    /// 从持久化存储重新计算，不读写缓存
    pub async fn compute(&self, scope: StatsScope, now: DateTime<Utc>) -> Result<DashboardStats> {
        debug!("Recomputing dashboard stats for {:?}", scope);

        let total_links = self.store.count_links(scope).await?;
        let total_visits = self.store.count_click_events(scope, None).await?;

        let week = TimeDelta::days(SERIES_DAYS as i64);
        let this_week = self
            .store
            .count_click_events(scope, Some(TimeRange::new(now - week, now)))
            .await?;
        let last_week = self
            .store
            .count_click_events(scope, Some(TimeRange::new(now - week - week, now - week)))
            .await?;

        let mut last_7_days = Vec::with_capacity(SERIES_DAYS as usize);
        for day in series_days(now) {
            let visits = self
                .store
                .count_click_events(scope, Some(day_range(day)?))
                .await?;
            last_7_days.push(DailyVisits {
                date: day.format("%Y-%m-%d").to_string(),
                visits,
            });
        }

        Ok(DashboardStats {
            total_links,
            total_visits,
            avg_click_rate: click_rate(total_visits, total_links),
            visits_growth: growth_percent(this_week, last_week),
            last_7_days,
        })
    }

    pub async fn invalidate(&self, scope: StatsScope) {
        cache::invalidate(self.cache.as_ref(), &[CacheKey::stats(scope)]).await;
    }
}

/// visits / links，无链接时为 0
pub fn click_rate(total_visits: u64, total_links: u64) -> f64 {
    if total_links == 0 {
        0.0
    } else {
        total_visits as f64 / total_links as f64
    }
}

/// 周环比百分比
pub fn growth_percent(this_week: u64, last_week: u64) -> f64 {
    match (this_week, last_week) {
        (0, 0) => 0.0,
        (_, 0) => 100.0,
        (this, last) => (this as f64 - last as f64) / last as f64 * 100.0,
    }
}

/// 最近 7 个 UTC 自然日，从旧到新
fn series_days(now: DateTime<Utc>) -> impl Iterator<Item = NaiveDate> {
    let today = now.date_naive();
    (0..SERIES_DAYS)
        .rev()
        .filter_map(move |back| today.checked_sub_days(Days::new(back)))
}

fn day_range(day: NaiveDate) -> Result<TimeRange> {
    let start = day.and_hms_opt(0, 0, 0).map(|t| t.and_utc());
    let end = day
        .checked_add_days(Days::new(1))
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|t| t.and_utc());
    match (start, end) {
        (Some(start), Some(end)) => Ok(TimeRange::new(start, end)),
        _ => Err(LinkPulseError::internal(format!("day out of range: {}", day))),
    }
}
