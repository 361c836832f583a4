//! Post repository.

use std::sync::Arc;

use crate::entities::{Post, post};
use flux_common::{AppError, AppResult};
use sea_orm::{
    ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait, PaginatorTrait,
    QueryFilter, prelude::Expr,
};

/// Post repository for database operations.
#[derive(Clone)]
pub struct PostRepository {
    db: Arc<DatabaseConnection>,
}

impl PostRepository {
    /// Create a new post repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a post that has not been deleted.
    pub async fn find_live(
        &self,
        txn: &DatabaseTransaction,
        id: &str,
    ) -> AppResult<Option<post::Model>> {
        Post::find_by_id(id)
            .filter(post::Column::IsDeleted.eq(false))
            .one(txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get a post that has not been deleted, returning an error if missing.
    pub async fn get_live(&self, txn: &DatabaseTransaction, id: &str) -> AppResult<post::Model> {
        self.find_live(txn, id)
            .await?
            .ok_or_else(|| AppError::PostNotFound(id.to_string()))
    }

    /// Increment like count atomically (single UPDATE query, no fetch).
    pub async fn increment_like_count(&self, txn: &DatabaseTransaction, id: &str) -> AppResult<()> {
        Post::update_many()
            .col_expr(post::Column::LikeCount, Expr::col(post::Column::LikeCount).add(1))
            .filter(post::Column::Id.eq(id))
            .exec(txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Decrement like count atomically, never below zero.
    pub async fn decrement_like_count(&self, txn: &DatabaseTransaction, id: &str) -> AppResult<()> {
        Post::update_many()
            .col_expr(post::Column::LikeCount, Expr::col(post::Column::LikeCount).sub(1))
            .filter(post::Column::Id.eq(id))
            .filter(post::Column::LikeCount.gt(0))
            .exec(txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Increment share count atomically (single UPDATE query, no fetch).
    pub async fn increment_share_count(
        &self,
        txn: &DatabaseTransaction,
        id: &str,
    ) -> AppResult<()> {
        Post::update_many()
            .col_expr(post::Column::ShareCount, Expr::col(post::Column::ShareCount).add(1))
            .filter(post::Column::Id.eq(id))
            .exec(txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Count live posts written by a user.
    pub async fn count_by_author(&self, user_id: &str) -> AppResult<u64> {
        Post::find()
            .filter(post::Column::UserId.eq(user_id))
            .filter(post::Column::IsDeleted.eq(false))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
