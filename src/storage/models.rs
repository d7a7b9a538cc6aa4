use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 认证层附加到请求上的唯一用户身份
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl UserId {
    pub fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for UserId {
    fn from(id: i64) -> Self {
        UserId(id)
    }
}

/// 链接状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkStatus {
    #[default]
    Active,
    Inactive,
}

impl LinkStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkStatus::Active => "active",
            LinkStatus::Inactive => "inactive",
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, LinkStatus::Active)
    }
}

impl fmt::Display for LinkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LinkStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            _ => Err(format!(
                "Invalid link status: '{}'. Valid: active, inactive",
                s
            )),
        }
    }
}

/// 短链接记录（持久化存储拥有，缓存中为 JSON 副本）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShortLink {
    pub id: i64,
    /// 匿名创建的链接没有所有者
    pub owner: Option<UserId>,
    pub original_url: String,
    pub short_code: String,
    #[serde(default)]
    pub status: LinkStatus,
    #[serde(default)]
    pub redirect_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 插入时由调用方提供的字段，id 与时间戳由存储生成
#[derive(Debug, Clone, PartialEq)]
pub struct NewShortLink {
    pub owner: Option<UserId>,
    pub original_url: String,
    pub short_code: String,
    pub status: LinkStatus,
}

/// 点击事件（只追加，从不更新或删除）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClickEvent {
    pub id: i64,
    pub shortlink_id: i64,
    pub ip: String,
    pub user_agent: String,
    pub clicked_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewClickEvent {
    pub shortlink_id: i64,
    pub ip: String,
    pub user_agent: String,
    pub clicked_at: DateTime<Utc>,
}

/// 统计范围：全部链接，或某个所有者的链接
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatsScope {
    Global,
    Owner(UserId),
}

impl StatsScope {
    /// 链接是否落在该范围内
    pub fn contains(&self, owner: Option<UserId>) -> bool {
        match self {
            StatsScope::Global => true,
            StatsScope::Owner(id) => owner == Some(*id),
        }
    }
}

impl From<Option<UserId>> for StatsScope {
    fn from(owner: Option<UserId>) -> Self {
        owner.map_or(StatsScope::Global, StatsScope::Owner)
    }
}

/// 半开时间区间 `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.start && at < self.end
    }
}

/// 单日访问量
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyVisits {
    /// `YYYY-MM-DD`（UTC）
    pub date: String,
    pub visits: u64,
}

/// 仪表盘统计（派生数据，只存在于缓存）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardStats {
    #[serde(rename = "totalLinks")]
    pub total_links: u64,
    #[serde(rename = "totalVisits")]
    pub total_visits: u64,
    #[serde(rename = "avgClickRate")]
    pub avg_click_rate: f64,
    #[serde(rename = "visitsGrowth")]
    pub visits_growth: f64,
    #[serde(rename = "last7Days")]
    pub last_7_days: Vec<DailyVisits>,
}

/// 分页结果
#[derive(Debug, Clone, PartialEq)]
pub struct LinkPage {
    pub items: Vec<ShortLink>,
    pub total: u64,
    pub limit: u64,
    pub page: u64,
    pub pages: u64,
    pub next: bool,
    pub back: bool,
}

impl LinkPage {
    pub fn new(items: Vec<ShortLink>, total: u64, limit: u64, page: u64) -> Self {
        let pages = if limit == 0 { 0 } else { total.div_ceil(limit) };
        Self {
            items,
            total,
            limit,
            page,
            pages,
            next: page * limit < total,
            back: page > 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parse_and_display() {
        assert_eq!("ACTIVE".parse::<LinkStatus>().unwrap(), LinkStatus::Active);
        assert_eq!("inactive".parse::<LinkStatus>().unwrap(), LinkStatus::Inactive);
        assert!("paused".parse::<LinkStatus>().is_err());
        assert_eq!(LinkStatus::Inactive.to_string(), "inactive");
    }

    #[test]
    fn test_scope_contains() {
        assert!(StatsScope::Global.contains(None));
        assert!(StatsScope::Owner(UserId(7)).contains(Some(UserId(7))));
        assert!(!StatsScope::Owner(UserId(7)).contains(Some(UserId(8))));
        assert!(!StatsScope::Owner(UserId(7)).contains(None));
    }

    #[test]
    fn test_dashboard_stats_wire_names() {
        let stats = DashboardStats {
            total_links: 1,
            total_visits: 3,
            avg_click_rate: 3.0,
            visits_growth: 100.0,
            last_7_days: vec![DailyVisits {
                date: "2024-01-01".into(),
                visits: 3,
            }],
        };
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["totalLinks"], 1);
        assert_eq!(json["avgClickRate"], 3.0);
        assert_eq!(json["last7Days"][0]["date"], "2024-01-01");
    }

    #[test]
    fn test_link_page_flags() {
        let page = LinkPage::new(Vec::new(), 25, 10, 2);
        assert_eq!(page.pages, 3);
        assert!(page.next);
        assert!(page.back);

        let last = LinkPage::new(Vec::new(), 25, 10, 3);
        assert!(!last.next);
    }
}
