//! Follow repository.
//!
//! Follower and following counts are always computed from active rows.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use flux_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    DbErr, EntityTrait, PaginatorTrait, QueryFilter, Set,
};

use super::toggle_store::ToggleStore;
use crate::entities::{Follow, follow};

/// Slot key of a follow row.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FollowKey {
    pub follower_id: String,
    pub followee_id: String,
}

impl FollowKey {
    /// Build a key from its parts.
    #[must_use]
    pub fn new(follower_id: &str, followee_id: &str) -> Self {
        Self {
            follower_id: follower_id.to_string(),
            followee_id: followee_id.to_string(),
        }
    }
}

/// Follow repository for database operations.
#[derive(Clone)]
pub struct FollowRepository {
    db: Arc<DatabaseConnection>,
}

impl FollowRepository {
    /// Create a new follow repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Count active followers of a user.
    pub async fn count_followers(&self, user_id: &str) -> AppResult<u64> {
        count_followers_on(self.db.as_ref(), user_id).await
    }

    /// Count active followers of a user inside a transaction.
    pub async fn count_followers_in(
        &self,
        txn: &DatabaseTransaction,
        user_id: &str,
    ) -> AppResult<u64> {
        count_followers_on(txn, user_id).await
    }

    /// Count users a user actively follows.
    pub async fn count_following(&self, user_id: &str) -> AppResult<u64> {
        Follow::find()
            .filter(follow::Column::FollowerId.eq(user_id))
            .filter(follow::Column::Active.eq(true))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Check if `follower_id` actively follows `followee_id`.
    pub async fn is_following(&self, follower_id: &str, followee_id: &str) -> AppResult<bool> {
        let count = Follow::find()
            .filter(follow::Column::FollowerId.eq(follower_id))
            .filter(follow::Column::FolloweeId.eq(followee_id))
            .filter(follow::Column::Active.eq(true))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(count > 0)
    }
}

async fn count_followers_on<C: ConnectionTrait>(conn: &C, user_id: &str) -> AppResult<u64> {
    Follow::find()
        .filter(follow::Column::FolloweeId.eq(user_id))
        .filter(follow::Column::Active.eq(true))
        .count(conn)
        .await
        .map_err(|e| AppError::Database(e.to_string()))
}

#[async_trait]
impl ToggleStore for FollowRepository {
    type Key = FollowKey;
    type Record = follow::Model;

    async fn find_by_key(
        &self,
        txn: &DatabaseTransaction,
        key: &FollowKey,
    ) -> AppResult<Option<follow::Model>> {
        Follow::find()
            .filter(follow::Column::FollowerId.eq(key.follower_id.as_str()))
            .filter(follow::Column::FolloweeId.eq(key.followee_id.as_str()))
            .one(txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn find_by_request_id(
        &self,
        txn: &DatabaseTransaction,
        request_id: &str,
    ) -> AppResult<Option<follow::Model>> {
        Follow::find()
            .filter(follow::Column::RequestId.eq(request_id))
            .one(txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn insert_active(
        &self,
        txn: &DatabaseTransaction,
        id: String,
        key: &FollowKey,
        request_id: &str,
    ) -> Result<follow::Model, DbErr> {
        let now = Utc::now();
        follow::ActiveModel {
            id: Set(id),
            follower_id: Set(key.follower_id.clone()),
            followee_id: Set(key.followee_id.clone()),
            active: Set(true),
            request_id: Set(request_id.to_string()),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        }
        .insert(txn)
        .await
    }

    async fn transition(
        &self,
        txn: &DatabaseTransaction,
        record_id: &str,
        from: bool,
        to: bool,
        request_id: &str,
    ) -> AppResult<bool> {
        let result = Follow::update_many()
            .set(follow::ActiveModel {
                active: Set(to),
                request_id: Set(request_id.to_string()),
                updated_at: Set(Utc::now().into()),
                ..Default::default()
            })
            .filter(follow::Column::Id.eq(record_id))
            .filter(follow::Column::Active.eq(from))
            .exec(txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(result.rows_affected == 1)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase, TransactionTrait};

    fn count_row(n: i64) -> std::collections::BTreeMap<&'static str, sea_orm::Value> {
        maplit::btreemap! {
            "num_items" => sea_orm::Value::BigInt(Some(n))
        }
    }

    fn create_test_follow(id: &str, follower: &str, followee: &str, active: bool) -> follow::Model {
        follow::Model {
            id: id.to_string(),
            follower_id: follower.to_string(),
            followee_id: followee.to_string(),
            active,
            request_id: format!("req-{id}"),
            created_at: Utc::now().into(),
            updated_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_count_followers_and_following() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[count_row(12)]])
                .append_query_results([[count_row(3)]])
                .into_connection(),
        );

        let repo = FollowRepository::new(db);
        assert_eq!(repo.count_followers("u1").await.unwrap(), 12);
        assert_eq!(repo.count_following("u1").await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_is_following() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[count_row(1)]])
                .append_query_results([[count_row(0)]])
                .into_connection(),
        );

        let repo = FollowRepository::new(db);
        assert!(repo.is_following("u1", "u2").await.unwrap());
        assert!(!repo.is_following("u2", "u1").await.unwrap());
    }

    #[tokio::test]
    async fn test_find_by_key_returns_inactive_rows() {
        let row = create_test_follow("f1", "u1", "u2", false);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[row.clone()]])
                .into_connection(),
        );

        let repo = FollowRepository::new(db.clone());
        let txn = db.begin().await.unwrap();
        let found = repo
            .find_by_key(&txn, &FollowKey::new("u1", "u2"))
            .await
            .unwrap()
            .unwrap();
        txn.commit().await.unwrap();

        assert!(!found.active);
        assert_eq!(found.request_id, "req-f1");
    }

    #[tokio::test]
    async fn test_insert_active() {
        let row = create_test_follow("f1", "u1", "u2", true);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[row.clone()]])
                .into_connection(),
        );

        let repo = FollowRepository::new(db.clone());
        let txn = db.begin().await.unwrap();
        let created = repo
            .insert_active(&txn, "f1".to_string(), &FollowKey::new("u1", "u2"), "req-f1")
            .await
            .unwrap();
        txn.commit().await.unwrap();

        assert_eq!(created, row);
    }
}
