//! Idempotency guard.
//!
//! Clients attach a request ID to every mutating call. Toggle records keep
//! the request ID of the call that last changed them, so a retried call with
//! the same ID finds its own record and is answered without touching state.
//! Shares count every request against one record, so their IDs are also
//! logged in an append-only ledger checked by [`LedgerGuard`].

use std::fmt;

use flux_common::{AppError, AppResult};
use flux_db::repositories::{RequestLedger, ToggleRecord, ToggleStore};
use sea_orm::DatabaseTransaction;
use tracing::debug;

/// A validated client-supplied idempotency key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestId(String);

impl RequestId {
    /// Longest accepted key, matching the `request_id` column width.
    pub const MAX_LEN: usize = 128;

    /// Validate a raw key.
    pub fn parse(raw: &str) -> AppResult<Self> {
        if raw.is_empty() {
            return Err(AppError::Validation("requestId must not be empty".to_string()));
        }
        if raw.chars().count() > Self::MAX_LEN {
            return Err(AppError::Validation(format!(
                "requestId must be at most {} characters",
                Self::MAX_LEN
            )));
        }
        if raw.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(AppError::Validation(
                "requestId must not contain whitespace or control characters".to_string(),
            ));
        }
        Ok(Self(raw.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RequestId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A record already bound to the incoming request ID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replay {
    pub record_id: String,
    /// State the earlier call left the record in.
    pub active: bool,
}

/// Detects replays against one record family.
///
/// Only the latest request ID of a record is remembered. Once a later call
/// flips the record, a retry of an earlier ID is no longer recognised: after
/// `like(r1)` then `unlike(r2)`, a delayed retry of `r1` is treated as a new
/// like and reactivates the record.
#[derive(Clone)]
pub struct IdempotencyGuard<S> {
    store: S,
}

impl<S: ToggleStore> IdempotencyGuard<S> {
    #[must_use]
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    /// Return the record carrying `request_id`, if any.
    ///
    /// A hit means the action was already applied and must not be applied again.
    pub async fn check_replay(
        &self,
        txn: &DatabaseTransaction,
        request_id: &RequestId,
    ) -> AppResult<Option<Replay>> {
        let hit = self
            .store
            .find_by_request_id(txn, request_id.as_str())
            .await?;

        Ok(hit.map(|record| {
            debug!(request_id = %request_id, record_id = record.record_id(), "Replayed request");
            Replay {
                record_id: record.record_id().to_string(),
                active: record.is_active(),
            }
        }))
    }
}

/// Detects replays of actions logged in a [`RequestLedger`].
#[derive(Clone)]
pub struct LedgerGuard<L> {
    ledger: L,
}

impl<L: RequestLedger> LedgerGuard<L> {
    #[must_use]
    pub const fn new(ledger: L) -> Self {
        Self { ledger }
    }

    /// Whether `request_id` was logged by an earlier call.
    pub async fn check_replay(
        &self,
        txn: &DatabaseTransaction,
        request_id: &RequestId,
    ) -> AppResult<bool> {
        let hit = self.ledger.contains(txn, request_id.as_str()).await?;
        if hit {
            debug!(request_id = %request_id, "Replayed logged request");
        }
        Ok(hit)
    }
}
