//! Mutation operations for SeaOrmStore
//!
//! This module contains all write database operations.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DbErr, EntityTrait, ExprTrait, NotSet, QueryFilter, Set,
    Unchanged, sea_query::Expr,
};
use tracing::{debug, info};

use super::converters::{model_to_click, model_to_shortlink};
use super::{SeaOrmStore, map_write_err};
use crate::errors::{LinkPulseError, Result};
use crate::storage::{ClickEvent, NewClickEvent, NewShortLink, ShortLink};

use migration::entities::{shortlink, shortlink_click};

impl SeaOrmStore {
    pub(super) async fn insert(&self, link: NewShortLink) -> Result<ShortLink> {
        let now = Utc::now();
        let model = shortlink::ActiveModel {
            id: NotSet,
            user_id: Set(link.owner.map(|o| o.get())),
            original_url: Set(link.original_url),
            short_code: Set(link.short_code.clone()),
            status: Set(link.status.as_str().to_string()),
            redirect_count: Set(0),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&self.db)
        .await
        .map_err(|e| map_write_err(e, &link.short_code))?;

        info!("Short link created: {}", model.short_code);
        Ok(model_to_shortlink(model))
    }

    pub(super) async fn update(&self, link: &ShortLink) -> Result<ShortLink> {
        let model = shortlink::ActiveModel {
            id: Unchanged(link.id),
            original_url: Set(link.original_url.clone()),
            short_code: Set(link.short_code.clone()),
            status: Set(link.status.as_str().to_string()),
            updated_at: Set(Utc::now()),
            ..Default::default()
        }
        .update(&self.db)
        .await
        .map_err(|e| match e {
            DbErr::RecordNotUpdated | DbErr::RecordNotFound(_) => {
                LinkPulseError::not_found(format!("Shortlink not found: {}", link.id))
            }
            other => map_write_err(other, &link.short_code),
        })?;

        info!("Short link updated: {}", model.short_code);
        Ok(model_to_shortlink(model))
    }

    pub(super) async fn remove(&self, code: &str) -> Result<bool> {
        let result = shortlink::Entity::delete_many()
            .filter(shortlink::Column::ShortCode.eq(code))
            .exec(&self.db)
            .await?;

        if result.rows_affected > 0 {
            info!("Short link deleted: {}", code);
        }
        Ok(result.rows_affected > 0)
    }

    /// `redirect_count = redirect_count + 1`，单条语句，天然可交换
    pub(super) async fn increment_redirects(&self, link_id: i64) -> Result<()> {
        let result = shortlink::Entity::update_many()
            .col_expr(
                shortlink::Column::RedirectCount,
                Expr::col(shortlink::Column::RedirectCount).add(1),
            )
            .col_expr(shortlink::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(shortlink::Column::Id.eq(link_id))
            .exec(&self.db)
            .await?;

        debug!(
            "increment_redirects({}) affected {} rows",
            link_id, result.rows_affected
        );
        Ok(())
    }

    pub(super) async fn log_click(&self, event: NewClickEvent) -> Result<ClickEvent> {
        let model = shortlink_click::ActiveModel {
            id: NotSet,
            shortlink_id: Set(event.shortlink_id),
            ip_address: Set(event.ip),
            user_agent: Set(event.user_agent),
            clicked_at: Set(event.clicked_at),
        }
        .insert(&self.db)
        .await?;

        Ok(model_to_click(model))
    }
}
