//! Post interaction service: likes, bookmarks and shares.
//!
//! Every mutating call runs in one transaction: load the live post, check
//! the request ID for a replay, drive the record, then adjust the counter.

use std::sync::Arc;

use flux_common::AppResult;
use flux_db::{
    entities::{interaction::InteractionKind, post},
    repositories::{InteractionKey, InteractionRepository, PostRepository, ShareRequestRepository},
};
use sea_orm::{DatabaseConnection, TransactionTrait};
use serde::Serialize;
use tracing::debug;

use super::counter::{Counter, CounterDelta, CounterMaintainer};
use super::idempotency::{IdempotencyGuard, LedgerGuard, RequestId};
use super::toggle::{
    ActionOutcome, ApplyOutcome, RecordOutcome, RevokeOutcome, ToggleCoordinator,
};

const ALREADY_PROCESSED: &str = "Already processed";

/// Action reported back to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResponseActionType {
    Liked,
    Unliked,
    Bookmarked,
    Unbookmarked,
    Shared,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionResponse {
    pub post_id: String,
    pub action_type: ResponseActionType,
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_count: Option<i64>,
    #[serde(skip)]
    pub outcome: ActionOutcome,
}

impl InteractionResponse {
    fn new(
        post_id: &str,
        action_type: ResponseActionType,
        message: &str,
        current_count: Option<i64>,
        outcome: ActionOutcome,
    ) -> Self {
        Self {
            post_id: post_id.to_string(),
            action_type,
            success: true,
            message: message.to_string(),
            current_count,
            outcome,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Direction {
    Apply,
    Revoke,
}

/// Static description of one toggling endpoint.
#[derive(Debug, Clone, Copy)]
struct ToggleAction {
    kind: InteractionKind,
    direction: Direction,
    counter: Option<Counter>,
    action_type: ResponseActionType,
    message: &'static str,
}

const LIKE: ToggleAction = ToggleAction {
    kind: InteractionKind::Like,
    direction: Direction::Apply,
    counter: Some(Counter::Like),
    action_type: ResponseActionType::Liked,
    message: "Post liked successfully",
};

const UNLIKE: ToggleAction = ToggleAction {
    kind: InteractionKind::Like,
    direction: Direction::Revoke,
    counter: Some(Counter::Like),
    action_type: ResponseActionType::Unliked,
    message: "Post unliked successfully",
};

const BOOKMARK: ToggleAction = ToggleAction {
    kind: InteractionKind::Bookmark,
    direction: Direction::Apply,
    counter: None,
    action_type: ResponseActionType::Bookmarked,
    message: "Post bookmarked successfully",
};

const UNBOOKMARK: ToggleAction = ToggleAction {
    kind: InteractionKind::Bookmark,
    direction: Direction::Revoke,
    counter: None,
    action_type: ResponseActionType::Unbookmarked,
    message: "Bookmark removed successfully",
};

fn snapshot(post: &post::Model, counter: Option<Counter>) -> Option<i64> {
    counter.map(|c| match c {
        Counter::Like => i64::from(post.like_count),
        Counter::Share => i64::from(post.share_count),
    })
}

/// Interaction service for business logic.
#[derive(Clone)]
pub struct InteractionService {
    db: Arc<DatabaseConnection>,
    post_repo: PostRepository,
    interaction_repo: InteractionRepository,
    guard: IdempotencyGuard<InteractionRepository>,
    share_ledger: ShareRequestRepository,
    share_guard: LedgerGuard<ShareRequestRepository>,
    coordinator: ToggleCoordinator<InteractionRepository>,
    counters: CounterMaintainer,
}

impl InteractionService {
    /// Create a new interaction service.
    #[must_use]
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        let post_repo = PostRepository::new(db.clone());
        let interaction_repo = InteractionRepository::new(db.clone());
        Self {
            guard: IdempotencyGuard::new(interaction_repo.clone()),
            share_ledger: ShareRequestRepository::new(),
            share_guard: LedgerGuard::new(ShareRequestRepository::new()),
            coordinator: ToggleCoordinator::new(interaction_repo.clone()),
            counters: CounterMaintainer::new(post_repo.clone()),
            post_repo,
            interaction_repo,
            db,
        }
    }

    pub async fn like(
        &self,
        user_id: &str,
        post_id: &str,
        request_id: &str,
    ) -> AppResult<InteractionResponse> {
        self.toggle(LIKE, user_id, post_id, request_id).await
    }

    pub async fn unlike(
        &self,
        user_id: &str,
        post_id: &str,
        request_id: &str,
    ) -> AppResult<InteractionResponse> {
        self.toggle(UNLIKE, user_id, post_id, request_id).await
    }

    pub async fn bookmark(
        &self,
        user_id: &str,
        post_id: &str,
        request_id: &str,
    ) -> AppResult<InteractionResponse> {
        self.toggle(BOOKMARK, user_id, post_id, request_id).await
    }

    pub async fn unbookmark(
        &self,
        user_id: &str,
        post_id: &str,
        request_id: &str,
    ) -> AppResult<InteractionResponse> {
        self.toggle(UNBOOKMARK, user_id, post_id, request_id).await
    }

    /// Share a post. Shares never toggle: every distinct request ID counts.
    ///
    /// Each counted request ID is logged, so a retry is recognised no matter
    /// how many shares happened in between.
    pub async fn share(
        &self,
        user_id: &str,
        post_id: &str,
        request_id: &str,
    ) -> AppResult<InteractionResponse> {
        let request_id = RequestId::parse(request_id)?;

        let txn = self.db.begin().await?;
        let post = self.post_repo.get_live(&txn, post_id).await?;

        let replayed = self.guard.check_replay(&txn, &request_id).await?.is_some()
            || self.share_guard.check_replay(&txn, &request_id).await?;
        if replayed {
            txn.commit().await?;
            return Ok(InteractionResponse::new(
                post_id,
                ResponseActionType::Shared,
                ALREADY_PROCESSED,
                snapshot(&post, Some(Counter::Share)),
                ActionOutcome::Replayed,
            ));
        }

        let key = InteractionKey::new(user_id, post_id, InteractionKind::Share);
        let (delta, outcome) = match self
            .coordinator
            .record(&txn, &self.share_ledger, &key, &request_id)
            .await
        {
            RecordOutcome::Recorded => (CounterDelta::Increment, ActionOutcome::Recorded),
            RecordOutcome::Replayed => (CounterDelta::Unchanged, ActionOutcome::Replayed),
            RecordOutcome::Error(e) => return Err(e),
        };

        let count = self
            .counters
            .on_transition(&txn, post_id, Counter::Share, delta)
            .await?;
        txn.commit().await?;

        debug!(user_id, post_id, ?outcome, "Share handled");
        Ok(InteractionResponse::new(
            post_id,
            ResponseActionType::Shared,
            "Post shared successfully",
            Some(count),
            outcome,
        ))
    }

    /// Check if a user currently likes a post.
    pub async fn is_liked(&self, user_id: &str, post_id: &str) -> AppResult<bool> {
        self.interaction_repo
            .is_active(user_id, post_id, InteractionKind::Like)
            .await
    }

    /// Check if a user currently has a post bookmarked.
    pub async fn is_bookmarked(&self, user_id: &str, post_id: &str) -> AppResult<bool> {
        self.interaction_repo
            .is_active(user_id, post_id, InteractionKind::Bookmark)
            .await
    }

    async fn toggle(
        &self,
        action: ToggleAction,
        user_id: &str,
        post_id: &str,
        request_id: &str,
    ) -> AppResult<InteractionResponse> {
        let request_id = RequestId::parse(request_id)?;

        let txn = self.db.begin().await?;
        let post = self.post_repo.get_live(&txn, post_id).await?;

        if self.guard.check_replay(&txn, &request_id).await?.is_some() {
            txn.commit().await?;
            return Ok(InteractionResponse::new(
                post_id,
                action.action_type,
                ALREADY_PROCESSED,
                snapshot(&post, action.counter),
                ActionOutcome::Replayed,
            ));
        }

        let key = InteractionKey::new(user_id, post_id, action.kind);
        let (delta, outcome) = match action.direction {
            Direction::Apply => match self.coordinator.apply(&txn, &key, &request_id).await {
                ApplyOutcome::Created => (CounterDelta::Increment, ActionOutcome::Created),
                ApplyOutcome::Reactivated => (CounterDelta::Increment, ActionOutcome::Reactivated),
                ApplyOutcome::AlreadyActive => {
                    (CounterDelta::Unchanged, ActionOutcome::AlreadyActive)
                }
                ApplyOutcome::Error(e) => return Err(e),
            },
            Direction::Revoke => match self.coordinator.revoke(&txn, &key, &request_id).await {
                RevokeOutcome::Revoked => (CounterDelta::Decrement, ActionOutcome::Revoked),
                RevokeOutcome::WasNotActive => {
                    (CounterDelta::Unchanged, ActionOutcome::WasNotActive)
                }
                RevokeOutcome::Error(e) => return Err(e),
            },
        };

        let count = match action.counter {
            Some(counter) => Some(
                self.counters
                    .on_transition(&txn, post_id, counter, delta)
                    .await?,
            ),
            None => None,
        };
        txn.commit().await?;

        debug!(user_id, post_id, kind = ?action.kind, ?outcome, "Interaction handled");
        Ok(InteractionResponse::new(
            post_id,
            action.action_type,
            action.message,
            count,
            outcome,
        ))
    }
}
