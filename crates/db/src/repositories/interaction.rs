//! Interaction repository.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use flux_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, Set,
};

use super::toggle_store::ToggleStore;
use crate::entities::{
    Interaction,
    interaction::{self, InteractionKind},
};

/// Slot key of an interaction row.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InteractionKey {
    pub user_id: String,
    pub post_id: String,
    pub kind: InteractionKind,
}

impl InteractionKey {
    /// Build a key from its parts.
    #[must_use]
    pub fn new(user_id: &str, post_id: &str, kind: InteractionKind) -> Self {
        Self {
            user_id: user_id.to_string(),
            post_id: post_id.to_string(),
            kind,
        }
    }
}

/// Interaction repository for database operations.
#[derive(Clone)]
pub struct InteractionRepository {
    db: Arc<DatabaseConnection>,
}

impl InteractionRepository {
    /// Create a new interaction repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Check whether a user currently has an active interaction of `kind` on a post.
    pub async fn is_active(
        &self,
        user_id: &str,
        post_id: &str,
        kind: InteractionKind,
    ) -> AppResult<bool> {
        let count = Interaction::find()
            .filter(interaction::Column::UserId.eq(user_id))
            .filter(interaction::Column::PostId.eq(post_id))
            .filter(interaction::Column::Kind.eq(kind))
            .filter(interaction::Column::Active.eq(true))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(count > 0)
    }
}

#[async_trait]
impl ToggleStore for InteractionRepository {
    type Key = InteractionKey;
    type Record = interaction::Model;

    async fn find_by_key(
        &self,
        txn: &DatabaseTransaction,
        key: &InteractionKey,
    ) -> AppResult<Option<interaction::Model>> {
        Interaction::find()
            .filter(interaction::Column::UserId.eq(key.user_id.as_str()))
            .filter(interaction::Column::PostId.eq(key.post_id.as_str()))
            .filter(interaction::Column::Kind.eq(key.kind))
            .one(txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn find_by_request_id(
        &self,
        txn: &DatabaseTransaction,
        request_id: &str,
    ) -> AppResult<Option<interaction::Model>> {
        Interaction::find()
            .filter(interaction::Column::RequestId.eq(request_id))
            .one(txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn insert_active(
        &self,
        txn: &DatabaseTransaction,
        id: String,
        key: &InteractionKey,
        request_id: &str,
    ) -> Result<interaction::Model, DbErr> {
        let now = Utc::now();
        interaction::ActiveModel {
            id: Set(id),
            user_id: Set(key.user_id.clone()),
            post_id: Set(key.post_id.clone()),
            kind: Set(key.kind),
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
        let result = Interaction::update_many()
            .set(interaction::ActiveModel {
                active: Set(to),
                request_id: Set(request_id.to_string()),
                updated_at: Set(Utc::now().into()),
                ..Default::default()
            })
            .filter(interaction::Column::Id.eq(record_id))
            .filter(interaction::Column::Active.eq(from))
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
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult, TransactionTrait};

    fn create_test_interaction(
        id: &str,
        user_id: &str,
        post_id: &str,
        kind: InteractionKind,
        active: bool,
    ) -> interaction::Model {
        interaction::Model {
            id: id.to_string(),
            user_id: user_id.to_string(),
            post_id: post_id.to_string(),
            kind,
            active,
            request_id: format!("req-{id}"),
            created_at: Utc::now().into(),
            updated_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_find_by_key_found() {
        let row = create_test_interaction("i1", "u1", "p1", InteractionKind::Like, true);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[row.clone()]])
                .into_connection(),
        );

        let repo = InteractionRepository::new(db.clone());
        let txn = db.begin().await.unwrap();
        let key = InteractionKey::new("u1", "p1", InteractionKind::Like);
        let found = repo.find_by_key(&txn, &key).await.unwrap();
        txn.commit().await.unwrap();

        assert_eq!(found, Some(row));
    }

    #[tokio::test]
    async fn test_find_by_request_id_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<interaction::Model>::new()])
                .into_connection(),
        );

        let repo = InteractionRepository::new(db.clone());
        let txn = db.begin().await.unwrap();
        let found = repo.find_by_request_id(&txn, "unknown").await.unwrap();
        txn.commit().await.unwrap();

        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_transition_reports_whether_row_flipped() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([
                    MockExecResult {
                        last_insert_id: 0,
                        rows_affected: 1,
                    },
                    MockExecResult {
                        last_insert_id: 0,
                        rows_affected: 0,
                    },
                ])
                .into_connection(),
        );

        let repo = InteractionRepository::new(db.clone());
        let txn = db.begin().await.unwrap();
        assert!(repo.transition(&txn, "i1", false, true, "r1").await.unwrap());
        assert!(!repo.transition(&txn, "i1", false, true, "r2").await.unwrap());
        txn.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_is_active() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[maplit::btreemap! {
                    "num_items" => sea_orm::Value::BigInt(Some(1))
                }]])
                .append_query_results([[maplit::btreemap! {
                    "num_items" => sea_orm::Value::BigInt(Some(0))
                }]])
                .into_connection(),
        );

        let repo = InteractionRepository::new(db);
        assert!(repo.is_active("u1", "p1", InteractionKind::Like).await.unwrap());
        assert!(!repo.is_active("u1", "p1", InteractionKind::Bookmark).await.unwrap());
    }
}
