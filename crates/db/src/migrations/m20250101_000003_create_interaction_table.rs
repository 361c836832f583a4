//! Create interaction table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Interaction::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Interaction::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Interaction::UserId).string_len(32).not_null())
                    .col(ColumnDef::new(Interaction::PostId).string_len(32).not_null())
                    .col(ColumnDef::new(Interaction::Kind).string_len(16).not_null())
                    .col(
                        ColumnDef::new(Interaction::Active)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Interaction::RequestId)
                            .string_len(128)
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(Interaction::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Interaction::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_interaction_user")
                            .from(Interaction::Table, Interaction::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_interaction_post")
                            .from(Interaction::Table, Interaction::PostId)
                            .to(Post::Table, Post::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: (user_id, post_id, kind) - one row per interaction slot
        manager
            .create_index(
                Index::create()
                    .name("idx_interaction_user_post_kind")
                    .table(Interaction::Table)
                    .col(Interaction::UserId)
                    .col(Interaction::PostId)
                    .col(Interaction::Kind)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Index: (post_id, kind) - per-post lookups
        manager
            .create_index(
                Index::create()
                    .name("idx_interaction_post_kind")
                    .table(Interaction::Table)
                    .col(Interaction::PostId)
                    .col(Interaction::Kind)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Interaction::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Interaction {
    Table,
    Id,
    UserId,
    PostId,
    Kind,
    Active,
    RequestId,
    CreatedAt,
    UpdatedAt,
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
