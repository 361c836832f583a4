//! Create share request table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ShareRequest::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ShareRequest::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ShareRequest::UserId).string_len(32).not_null())
                    .col(ColumnDef::new(ShareRequest::PostId).string_len(32).not_null())
                    .col(
                        ColumnDef::new(ShareRequest::RequestId)
                            .string_len(128)
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(ShareRequest::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_share_request_user")
                            .from(ShareRequest::Table, ShareRequest::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_share_request_post")
                            .from(ShareRequest::Table, ShareRequest::PostId)
                            .to(Post::Table, Post::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Index: post_id - per-post share history
        manager
            .create_index(
                Index::create()
                    .name("idx_share_request_post")
                    .table(ShareRequest::Table)
                    .col(ShareRequest::PostId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ShareRequest::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum ShareRequest {
    Table,
    Id,
    UserId,
    PostId,
    RequestId,
    CreatedAt,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}

#[derive(Iden)]
enum Post {
    Table,
    Id,
}
