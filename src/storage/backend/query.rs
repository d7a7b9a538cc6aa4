//! Query operations for SeaOrmStore
//!
//! This module contains all read-only database operations.

use sea_orm::{
    ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
    sea_query::Query,
};
use tracing::trace;

use super::SeaOrmStore;
use super::converters::model_to_shortlink;
use crate::errors::Result;
use crate::storage::{ShortLink, StatsScope, TimeRange, UserId};

use migration::entities::{shortlink, shortlink_click};

impl SeaOrmStore {
    pub(super) async fn find_by_code(&self, code: &str) -> Result<Option<ShortLink>> {
        let model = shortlink::Entity::find()
            .filter(shortlink::Column::ShortCode.eq(code))
            .one(&self.db)
            .await?;
        Ok(model.map(model_to_shortlink))
    }

    pub(super) async fn exists(&self, code: &str) -> Result<bool> {
        let count = shortlink::Entity::find()
            .filter(shortlink::Column::ShortCode.eq(code))
            .count(&self.db)
            .await?;
        Ok(count > 0)
    }

    pub(super) async fn count_links_in(&self, scope: StatsScope) -> Result<u64> {
        let mut query = shortlink::Entity::find();
        if let StatsScope::Owner(owner) = scope {
            query = query.filter(shortlink::Column::UserId.eq(owner.get()));
        }
        Ok(query.count(&self.db).await?)
    }

    pub(super) async fn count_clicks_in(
        &self,
        scope: StatsScope,
        range: Option<TimeRange>,
    ) -> Result<u64> {
        let mut query = shortlink_click::Entity::find();

        if let Some(range) = range {
            query = query
                .filter(shortlink_click::Column::ClickedAt.gte(range.start))
                .filter(shortlink_click::Column::ClickedAt.lt(range.end));
        }

        // 所有者范围：点击所属链接必须归该用户
        if let StatsScope::Owner(owner) = scope {
            query = query.filter(
                shortlink_click::Column::ShortlinkId.in_subquery(
                    Query::select()
                        .column(shortlink::Column::Id)
                        .from(shortlink::Entity)
                        .and_where(shortlink::Column::UserId.eq(owner.get()))
                        .to_owned(),
                ),
            );
        }

        let count = query.count(&self.db).await?;
        trace!("count_clicks_in({:?}, {:?}) = {}", scope, range, count);
        Ok(count)
    }

    /// 按创建时间倒序分页加载某用户的链接
    pub(super) async fn load_owned(
        &self,
        owner: UserId,
        limit: u64,
        offset: u64,
    ) -> Result<(Vec<ShortLink>, u64)> {
        let total = shortlink::Entity::find()
            .filter(shortlink::Column::UserId.eq(owner.get()))
            .count(&self.db)
            .await?;

        let models = shortlink::Entity::find()
            .filter(shortlink::Column::UserId.eq(owner.get()))
            .order_by_desc(shortlink::Column::CreatedAt)
            .order_by_desc(shortlink::Column::Id)
            .offset(offset)
            .limit(limit)
            .all(&self.db)
            .await?;

        Ok((models.into_iter().map(model_to_shortlink).collect(), total))
    }
}
