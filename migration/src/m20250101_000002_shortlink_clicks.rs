//! 点击日志表
//!
//! 只追加的审计记录：链接 id、客户端 IP、User-Agent、时间戳。

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ShortlinkClicks::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ShortlinkClicks::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ShortlinkClicks::ShortlinkId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ShortlinkClicks::IpAddress)
                            .string_len(45)
                            .not_null(),
                    )
                    .col(ColumnDef::new(ShortlinkClicks::UserAgent).text().not_null())
                    .col(
                        ColumnDef::new(ShortlinkClicks::ClickedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // 时间范围查询
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_shortlink_clicks_clicked_at")
                    .table(ShortlinkClicks::Table)
                    .col(ShortlinkClicks::ClickedAt)
                    .to_owned(),
            )
            .await?;

        // 按链接 + 时间的复合索引（所有者范围统计）
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_shortlink_clicks_link_time")
                    .table(ShortlinkClicks::Table)
                    .col(ShortlinkClicks::ShortlinkId)
                    .col(ShortlinkClicks::ClickedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_shortlink_clicks_link_time")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_index(
                Index::drop()
                    .name("idx_shortlink_clicks_clicked_at")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(ShortlinkClicks::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ShortlinkClicks {
    Table,
    Id,
    ShortlinkId,
    IpAddress,
    UserAgent,
    ClickedAt,
}
