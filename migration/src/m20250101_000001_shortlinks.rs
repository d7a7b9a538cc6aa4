use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 创建 shortlinks 表
        manager
            .create_table(
                Table::create()
                    .table(Shortlinks::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Shortlinks::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Shortlinks::UserId).big_integer().null())
                    .col(ColumnDef::new(Shortlinks::OriginalUrl).text().not_null())
                    .col(
                        ColumnDef::new(Shortlinks::ShortCode)
                            .string_len(64)
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(Shortlinks::Status)
                            .string_len(16)
                            .not_null()
                            .default("active"),
                    )
                    .col(
                        ColumnDef::new(Shortlinks::RedirectCount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Shortlinks::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Shortlinks::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // 按所有者统计/分页
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_shortlinks_user_id")
                    .table(Shortlinks::Table)
                    .col(Shortlinks::UserId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_shortlinks_user_id").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Shortlinks::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Shortlinks {
    Table,
    Id,
    UserId,
    OriginalUrl,
    ShortCode,
    Status,
    RedirectCount,
    CreatedAt,
    UpdatedAt,
}
