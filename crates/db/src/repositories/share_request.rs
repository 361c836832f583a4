//! Share request repository.

use async_trait::async_trait;
use chrono::Utc;
use flux_common::{AppError, AppResult};
use sea_orm::{
    ColumnTrait, DatabaseTransaction, DbErr, EntityTrait, PaginatorTrait, QueryFilter, Set,
};

use super::interaction::InteractionKey;
use super::toggle_store::RequestLedger;
use crate::entities::{ShareRequest, share_request};

/// Ledger of every share request that was counted.
///
/// All access happens on the caller's transaction.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShareRequestRepository;

impl ShareRequestRepository {
    /// Create a new share request repository.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl RequestLedger for ShareRequestRepository {
    type Key = InteractionKey;

    async fn contains(&self, txn: &DatabaseTransaction, request_id: &str) -> AppResult<bool> {
        let count = ShareRequest::find()
            .filter(share_request::Column::RequestId.eq(request_id))
            .count(txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(count > 0)
    }

    async fn append(
        &self,
        txn: &DatabaseTransaction,
        id: String,
        key: &InteractionKey,
        request_id: &str,
    ) -> Result<(), DbErr> {
        let row = share_request::ActiveModel {
            id: Set(id),
            user_id: Set(key.user_id.clone()),
            post_id: Set(key.post_id.clone()),
            request_id: Set(request_id.to_string()),
            created_at: Set(Utc::now().into()),
        };
        ShareRequest::insert(row).exec_without_returning(txn).await?;
        Ok(())
    }
}
