//! Durable store backends
//!
//! - `MemoryStore`: in-process tables, used by tests and embedding
//! - `SeaOrmStore`: SQLite, MySQL/MariaDB and PostgreSQL via SeaORM

mod connection;
mod converters;
mod memory;
mod mutations;
mod query;

use async_trait::async_trait;
use sea_orm::{DatabaseConnection, DbErr, SqlErr};
use tracing::info;

use crate::errors::{LinkPulseError, Result};
use crate::storage::{
    ClickEvent, DurableStore, NewClickEvent, NewShortLink, ShortLink, StatsScope, TimeRange,
    UserId,
};

pub use connection::{connect_generic, connect_sqlite, run_migrations};
pub use converters::{model_to_click, model_to_shortlink};
pub use memory::{MemoryStore, StoreCallCounts};

/// 从数据库 URL 推断数据库类型
pub fn infer_backend_from_url(database_url: &str) -> Result<String> {
    if database_url.starts_with("sqlite:")
        || database_url.ends_with(".db")
        || database_url.ends_with(".sqlite")
    {
        Ok("sqlite".to_string())
    } else if database_url.starts_with("mysql://") || database_url.starts_with("mariadb://") {
        Ok("mysql".to_string())
    } else if database_url.starts_with("postgres://") || database_url.starts_with("postgresql://") {
        Ok("postgres".to_string())
    } else {
        Err(LinkPulseError::config(format!(
            "Cannot infer database type from URL: {}. Supported: sqlite://, mysql://, mariadb://, postgres://",
            database_url
        )))
    }
}

/// 将唯一约束冲突映射为 `Conflict`，其余为数据库错误
pub(crate) fn map_write_err(err: DbErr, short_code: &str) -> LinkPulseError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            LinkPulseError::conflict(format!("Short code already in use: {}", short_code))
        }
        _ => LinkPulseError::database_operation(err.to_string()),
    }
}

/// SeaORM-based durable store
#[derive(Clone)]
pub struct SeaOrmStore {
    db: DatabaseConnection,
    backend_name: String,
}

impl SeaOrmStore {
    pub async fn new(database_url: &str, backend_name: &str, pool_size: u32) -> Result<Self> {
        if database_url.is_empty() {
            return Err(LinkPulseError::config("DATABASE_URL is not set"));
        }

        let db = if backend_name == "sqlite" {
            connect_sqlite(database_url).await?
        } else {
            connect_generic(database_url, backend_name, pool_size).await?
        };

        run_migrations(&db).await?;

        info!("{} storage initialized", backend_name.to_uppercase());
        Ok(Self {
            db,
            backend_name: backend_name.to_string(),
        })
    }

    /// 复用已有连接（迁移需已执行）
    pub fn from_connection(db: DatabaseConnection, backend_name: &str) -> Self {
        Self {
            db,
            backend_name: backend_name.to_string(),
        }
    }

    pub fn get_db(&self) -> &DatabaseConnection {
        &self.db
    }
}

#[async_trait]
impl DurableStore for SeaOrmStore {
    async fn get_link_by_code(&self, code: &str) -> Result<Option<ShortLink>> {
        self.find_by_code(code).await
    }

    async fn code_exists(&self, code: &str) -> Result<bool> {
        self.exists(code).await
    }

    async fn insert_link(&self, link: NewShortLink) -> Result<ShortLink> {
        self.insert(link).await
    }

    async fn update_link(&self, link: &ShortLink) -> Result<ShortLink> {
        self.update(link).await
    }

    async fn delete_link(&self, code: &str) -> Result<bool> {
        self.remove(code).await
    }

    async fn increment_redirect_count(&self, link_id: i64) -> Result<()> {
        self.increment_redirects(link_id).await
    }

    async fn insert_click_event(&self, event: NewClickEvent) -> Result<ClickEvent> {
        self.log_click(event).await
    }

    async fn count_links(&self, scope: StatsScope) -> Result<u64> {
        self.count_links_in(scope).await
    }

    async fn count_click_events(
        &self,
        scope: StatsScope,
        range: Option<TimeRange>,
    ) -> Result<u64> {
        self.count_clicks_in(scope, range).await
    }

    async fn list_links(
        &self,
        owner: UserId,
        limit: u64,
        offset: u64,
    ) -> Result<(Vec<ShortLink>, u64)> {
        self.load_owned(owner, limit, offset).await
    }

    fn backend_name(&self) -> &str {
        &self.backend_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infer_backend_from_url() {
        assert_eq!(
            infer_backend_from_url("sqlite://data.db?mode=rwc").unwrap(),
            "sqlite"
        );
        assert_eq!(infer_backend_from_url("sqlite::memory:").unwrap(), "sqlite");
        assert_eq!(
            infer_backend_from_url("postgres://u:p@localhost/db").unwrap(),
            "postgres"
        );
        assert_eq!(
            infer_backend_from_url("mariadb://localhost/db").unwrap(),
            "mysql"
        );
        assert!(infer_backend_from_url("redis://localhost").is_err());
    }
}
