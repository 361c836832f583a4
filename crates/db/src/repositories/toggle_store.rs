//! Storage seam for toggle records.
//!
//! A toggle record is the single row that holds the active flag for one
//! `(actor, target, kind)` slot. Rows are created once and then flipped in
//! place, so the uniqueness index over the slot never has a gap.

use async_trait::async_trait;
use flux_common::AppResult;
use sea_orm::{DatabaseTransaction, DbErr, SqlErr};

use crate::entities::{follow, interaction};

/// Read access to the lifecycle fields shared by every toggle record.
pub trait ToggleRecord {
    /// Primary key of the row.
    fn record_id(&self) -> &str;
    /// Whether the slot is currently active.
    fn is_active(&self) -> bool;
    /// Most recent request ID bound to the row.
    fn request_id(&self) -> &str;
}

impl ToggleRecord for interaction::Model {
    fn record_id(&self) -> &str {
        &self.id
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn request_id(&self) -> &str {
        &self.request_id
    }
}

impl ToggleRecord for follow::Model {
    fn record_id(&self) -> &str {
        &self.id
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn request_id(&self) -> &str {
        &self.request_id
    }
}

/// Persistence operations the toggle engine needs from a record table.
///
/// Every method runs on the caller's transaction.
#[async_trait]
pub trait ToggleStore: Send + Sync {
    /// Slot key, e.g. `(user, post, kind)`.
    type Key: Send + Sync + std::fmt::Debug;
    /// Row type.
    type Record: ToggleRecord + Send + Sync + std::fmt::Debug;

    /// Find the record for a slot, active or not.
    async fn find_by_key(
        &self,
        txn: &DatabaseTransaction,
        key: &Self::Key,
    ) -> AppResult<Option<Self::Record>>;

    /// Find the record currently carrying `request_id`.
    async fn find_by_request_id(
        &self,
        txn: &DatabaseTransaction,
        request_id: &str,
    ) -> AppResult<Option<Self::Record>>;

    /// Insert an active record for a slot.
    ///
    /// Returns the raw [`DbErr`] so callers can tell a uniqueness conflict
    /// from other failures.
    async fn insert_active(
        &self,
        txn: &DatabaseTransaction,
        id: String,
        key: &Self::Key,
        request_id: &str,
    ) -> Result<Self::Record, DbErr>;

    /// Set `active = to` and bind `request_id`, only if the row is still
    /// `active = from`. Returns `true` when this call performed the flip.
    async fn transition(
        &self,
        txn: &DatabaseTransaction,
        record_id: &str,
        from: bool,
        to: bool,
        request_id: &str,
    ) -> AppResult<bool>;
}

/// Append-only log of request IDs for actions that count every request.
///
/// Toggle records only remember one request ID per slot. Actions such as
/// shares, which count every distinct request against the same slot, log
/// each accepted request here so older IDs stay recognisable.
#[async_trait]
pub trait RequestLedger: Send + Sync {
    /// Slot key the logged request belongs to.
    type Key: Send + Sync + std::fmt::Debug;

    /// Whether `request_id` has been logged.
    async fn contains(&self, txn: &DatabaseTransaction, request_id: &str) -> AppResult<bool>;

    /// Log `request_id` against a slot.
    ///
    /// A unique violation means the request was logged already.
    async fn append(
        &self,
        txn: &DatabaseTransaction,
        id: String,
        key: &Self::Key,
        request_id: &str,
    ) -> Result<(), DbErr>;
}

/// Whether `err` is the database rejecting a duplicate key.
#[must_use]
pub fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err, DbErr::RecordNotInserted)
        || matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_not_inserted_is_conflict() {
        assert!(is_unique_violation(&DbErr::RecordNotInserted));
    }

    #[test]
    fn test_other_errors_are_not_conflicts() {
        assert!(!is_unique_violation(&DbErr::Custom("timeout".into())));
        assert!(!is_unique_violation(&DbErr::RecordNotFound("x".into())));
    }
}
