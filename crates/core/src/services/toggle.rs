//! Atomic toggle coordinator.
//!
//! Each `(actor, target, kind)` slot owns at most one record, guarded by a
//! unique index. The first insert for a slot runs inside a savepoint so a
//! lost race can be rolled back without poisoning the request transaction.
//! Flips of an existing record are compare-and-swap updates on the flag, so
//! two concurrent requests can never both observe themselves as the winner.

use std::fmt::Debug;

use flux_common::{AppError, IdGenerator};
use flux_db::repositories::{RequestLedger, ToggleRecord, ToggleStore, is_unique_violation};
use sea_orm::{DatabaseTransaction, DbErr, TransactionTrait};
use tracing::debug;

use super::idempotency::RequestId;

/// Result of activating a slot.
#[derive(Debug)]
pub enum ApplyOutcome {
    /// A new record was inserted.
    Created,
    /// An inactive record was switched back on.
    Reactivated,
    /// The slot was already active, possibly because a concurrent request won.
    AlreadyActive,
    Error(AppError),
}

/// Result of deactivating a slot.
#[derive(Debug)]
pub enum RevokeOutcome {
    Revoked,
    /// No record, an inactive record, or a concurrent revoke won.
    WasNotActive,
    Error(AppError),
}

/// Result of a non-toggling action such as a share.
#[derive(Debug)]
pub enum RecordOutcome {
    /// The action was recorded and should be counted.
    Recorded,
    /// The request ID was already in the ledger, written by a concurrent call.
    Replayed,
    Error(AppError),
}

/// Flattened outcome reported alongside a response. Never serialized, so lost
/// races and first writers look identical to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    Created,
    Reactivated,
    AlreadyActive,
    Revoked,
    WasNotActive,
    Recorded,
    Replayed,
}

enum Insert<R> {
    Created(R),
    Conflict,
    Failed(AppError),
}

/// Drives the record lifecycle of one [`ToggleStore`].
#[derive(Clone)]
pub struct ToggleCoordinator<S> {
    store: S,
    id_gen: IdGenerator,
}

impl<S: ToggleStore> ToggleCoordinator<S> {
    #[must_use]
    pub const fn new(store: S) -> Self {
        Self {
            store,
            id_gen: IdGenerator::new(),
        }
    }

    /// Make the slot active.
    pub async fn apply(
        &self,
        txn: &DatabaseTransaction,
        key: &S::Key,
        request_id: &RequestId,
    ) -> ApplyOutcome {
        let existing = match self.store.find_by_key(txn, key).await {
            Ok(existing) => existing,
            Err(e) => return ApplyOutcome::Error(e),
        };

        match existing {
            Some(record) if record.is_active() => ApplyOutcome::AlreadyActive,
            Some(record) => {
                match self
                    .store
                    .transition(txn, record.record_id(), false, true, request_id.as_str())
                    .await
                {
                    Ok(true) => ApplyOutcome::Reactivated,
                    Ok(false) => {
                        debug!(?key, "Lost reactivation race");
                        ApplyOutcome::AlreadyActive
                    }
                    Err(e) => ApplyOutcome::Error(e),
                }
            }
            None => match self.try_create(txn, key, request_id).await {
                Insert::Created(_) => ApplyOutcome::Created,
                Insert::Conflict => ApplyOutcome::AlreadyActive,
                Insert::Failed(e) => ApplyOutcome::Error(e),
            },
        }
    }

    /// Make the slot inactive.
    pub async fn revoke(
        &self,
        txn: &DatabaseTransaction,
        key: &S::Key,
        request_id: &RequestId,
    ) -> RevokeOutcome {
        let record = match self.store.find_by_key(txn, key).await {
            Ok(Some(record)) if record.is_active() => record,
            Ok(_) => return RevokeOutcome::WasNotActive,
            Err(e) => return RevokeOutcome::Error(e),
        };

        match self
            .store
            .transition(txn, record.record_id(), true, false, request_id.as_str())
            .await
        {
            Ok(true) => RevokeOutcome::Revoked,
            Ok(false) => {
                debug!(?key, "Lost revoke race");
                RevokeOutcome::WasNotActive
            }
            Err(e) => RevokeOutcome::Error(e),
        }
    }

    /// Record a non-toggling action. Every distinct request ID counts once.
    ///
    /// The request is logged in `ledger` first; a duplicate log entry means a
    /// concurrent call with the same ID already counted it. The slot record is
    /// created on first use and left untouched afterwards.
    pub async fn record<L>(
        &self,
        txn: &DatabaseTransaction,
        ledger: &L,
        key: &S::Key,
        request_id: &RequestId,
    ) -> RecordOutcome
    where
        L: RequestLedger<Key = S::Key>,
    {
        match self.try_log(txn, ledger, key, request_id).await {
            Insert::Created(()) => {}
            Insert::Conflict => return RecordOutcome::Replayed,
            Insert::Failed(e) => return RecordOutcome::Error(e),
        }

        match self.store.find_by_key(txn, key).await {
            Ok(Some(_)) => RecordOutcome::Recorded,
            Ok(None) => match self.try_create(txn, key, request_id).await {
                // A concurrent first share created the record
                Insert::Created(_) | Insert::Conflict => RecordOutcome::Recorded,
                Insert::Failed(e) => RecordOutcome::Error(e),
            },
            Err(e) => RecordOutcome::Error(e),
        }
    }

    /// Insert an active record inside a savepoint.
    async fn try_create(
        &self,
        txn: &DatabaseTransaction,
        key: &S::Key,
        request_id: &RequestId,
    ) -> Insert<S::Record> {
        let savepoint = match txn.begin().await {
            Ok(savepoint) => savepoint,
            Err(e) => return Insert::Failed(e.into()),
        };
        let result = self
            .store
            .insert_active(&savepoint, self.id_gen.generate(), key, request_id.as_str())
            .await;
        settle(savepoint, result, key, request_id).await
    }

    /// Append to a request ledger inside a savepoint.
    async fn try_log<L>(
        &self,
        txn: &DatabaseTransaction,
        ledger: &L,
        key: &S::Key,
        request_id: &RequestId,
    ) -> Insert<()>
    where
        L: RequestLedger<Key = S::Key>,
    {
        let savepoint = match txn.begin().await {
            Ok(savepoint) => savepoint,
            Err(e) => return Insert::Failed(e.into()),
        };
        let result = ledger
            .append(&savepoint, self.id_gen.generate(), key, request_id.as_str())
            .await;
        settle(savepoint, result, key, request_id).await
    }
}

/// Commit the savepoint on success; roll it back and classify the error otherwise.
async fn settle<T, K: Debug>(
    savepoint: DatabaseTransaction,
    result: Result<T, DbErr>,
    key: &K,
    request_id: &RequestId,
) -> Insert<T> {
    match result {
        Ok(value) => match savepoint.commit().await {
            Ok(()) => Insert::Created(value),
            Err(e) => Insert::Failed(e.into()),
        },
        Err(e) => {
            if let Err(rollback_err) = savepoint.rollback().await {
                return Insert::Failed(rollback_err.into());
            }
            if is_unique_violation(&e) {
                debug!(?key, request_id = %request_id, error = %e, "Absorbed insert conflict");
                Insert::Conflict
            } else {
                Insert::Failed(e.into())
            }
        }
    }
}
