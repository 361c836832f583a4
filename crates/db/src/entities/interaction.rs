//! Interaction entity (likes, bookmarks and shares of posts).
//!
//! At most one row exists per `(user_id, post_id, kind)`. Rows are never
//! deleted: undoing an interaction clears `active`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Kind of post interaction.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum InteractionKind {
    #[sea_orm(string_value = "like")]
    Like,
    #[sea_orm(string_value = "bookmark")]
    Bookmark,
    #[sea_orm(string_value = "share")]
    Share,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "interaction")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// The acting user
    pub user_id: String,

    /// The post acted upon
    pub post_id: String,

    pub kind: InteractionKind,

    pub active: bool,

    /// Most recent idempotency key applied to this row. Shares keep the key
    /// that created the row; later share keys live in `share_request`.
    #[sea_orm(unique)]
    pub request_id: String,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,

    #[sea_orm(
        belongs_to = "super::post::Entity",
        from = "Column::PostId",
        to = "super::post::Column::Id",
        on_delete = "Cascade"
    )]
    Post,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::post::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Post.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
