//! Follow relationships.
//!
//! Follow records go through the same toggle engine as post interactions,
//! but follower and following counts are always counted from active rows
//! instead of being stored on the user.

use std::sync::Arc;

use flux_common::{AppError, AppResult};
use flux_db::repositories::{
    FollowKey, FollowRepository, PostRepository, ToggleRecord, ToggleStore, UserRepository,
};
use sea_orm::{DatabaseConnection, DatabaseTransaction, TransactionTrait};
use serde::Serialize;
use tracing::debug;

use super::idempotency::{IdempotencyGuard, RequestId};
use super::toggle::{ActionOutcome, ApplyOutcome, RevokeOutcome, ToggleCoordinator};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FollowStatus {
    Followed,
    Unfollowed,
}

impl FollowStatus {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Followed => "Followed",
            Self::Unfollowed => "Unfollowed",
        }
    }
}

/// Response to a follow, unfollow or toggle.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipResponse {
    pub target_user_id: String,
    pub status: FollowStatus,
    pub success: bool,
    pub message: String,
    /// Follower count of the target after the call.
    pub current_count: i64,
    #[serde(skip)]
    pub outcome: ActionOutcome,
}

/// Profile header counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipInfo {
    pub followers_count: u64,
    pub following_count: u64,
    pub is_following: bool,
}

/// Full profile statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileStats {
    pub post_count: u64,
    pub followers_count: u64,
    pub following_count: u64,
    pub is_following: bool,
}

#[derive(Debug, Clone, Copy)]
enum FollowMode {
    Follow,
    Unfollow,
    Toggle,
}

/// Relationship service for business logic.
#[derive(Clone)]
pub struct RelationshipService {
    db: Arc<DatabaseConnection>,
    follow_repo: FollowRepository,
    user_repo: UserRepository,
    post_repo: PostRepository,
    guard: IdempotencyGuard<FollowRepository>,
    coordinator: ToggleCoordinator<FollowRepository>,
}

impl RelationshipService {
    /// Create a new relationship service.
    #[must_use]
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        let follow_repo = FollowRepository::new(db.clone());
        Self {
            guard: IdempotencyGuard::new(follow_repo.clone()),
            coordinator: ToggleCoordinator::new(follow_repo.clone()),
            user_repo: UserRepository::new(db.clone()),
            post_repo: PostRepository::new(db.clone()),
            follow_repo,
            db,
        }
    }

    /// Start following a user. Following an already-followed user succeeds.
    pub async fn follow(
        &self,
        follower_id: &str,
        followee_id: &str,
        request_id: &str,
    ) -> AppResult<RelationshipResponse> {
        self.run(FollowMode::Follow, follower_id, followee_id, request_id)
            .await
    }

    /// Stop following a user. Unfollowing a user who is not followed succeeds.
    pub async fn unfollow(
        &self,
        follower_id: &str,
        followee_id: &str,
        request_id: &str,
    ) -> AppResult<RelationshipResponse> {
        self.run(FollowMode::Unfollow, follower_id, followee_id, request_id)
            .await
    }

    /// Flip the follow state.
    pub async fn toggle_follow(
        &self,
        follower_id: &str,
        followee_id: &str,
        request_id: &str,
    ) -> AppResult<RelationshipResponse> {
        self.run(FollowMode::Toggle, follower_id, followee_id, request_id)
            .await
    }

    /// Follower and following counts of `target_id`, as seen by `viewer_id`.
    pub async fn relationship_info(
        &self,
        target_id: &str,
        viewer_id: &str,
    ) -> AppResult<RelationshipInfo> {
        let followers_count = self.follow_repo.count_followers(target_id).await?;
        let following_count = self.follow_repo.count_following(target_id).await?;
        let is_following = self.follow_repo.is_following(viewer_id, target_id).await?;

        Ok(RelationshipInfo {
            followers_count,
            following_count,
            is_following,
        })
    }

    /// Profile statistics of `target_id`, as seen by `viewer_id`.
    pub async fn profile_stats(&self, target_id: &str, viewer_id: &str) -> AppResult<ProfileStats> {
        let post_count = self.post_repo.count_by_author(target_id).await?;
        let followers_count = self.follow_repo.count_followers(target_id).await?;
        let following_count = self.follow_repo.count_following(target_id).await?;

        // Viewing your own profile never shows a follow button
        let is_following = if target_id == viewer_id {
            false
        } else {
            self.follow_repo.is_following(viewer_id, target_id).await?
        };

        Ok(ProfileStats {
            post_count,
            followers_count,
            following_count,
            is_following,
        })
    }

    async fn run(
        &self,
        mode: FollowMode,
        follower_id: &str,
        followee_id: &str,
        request_id: &str,
    ) -> AppResult<RelationshipResponse> {
        if follower_id == followee_id {
            return Err(AppError::Validation("You cannot follow yourself".to_string()));
        }
        let request_id = RequestId::parse(request_id)?;

        let txn = self.db.begin().await?;
        self.user_repo.get_by_id_in(&txn, followee_id).await?;

        if let Some(replay) = self.guard.check_replay(&txn, &request_id).await? {
            let count = self.follower_count(&txn, followee_id).await?;
            txn.commit().await?;
            let status = if replay.active {
                FollowStatus::Followed
            } else {
                FollowStatus::Unfollowed
            };
            return Ok(response(
                followee_id,
                status,
                "Already processed",
                count,
                ActionOutcome::Replayed,
            ));
        }

        let key = FollowKey::new(follower_id, followee_id);
        let activate = match mode {
            FollowMode::Follow => true,
            FollowMode::Unfollow => false,
            FollowMode::Toggle => !self
                .follow_repo
                .find_by_key(&txn, &key)
                .await?
                .is_some_and(|record| record.is_active()),
        };

        let (status, outcome) = if activate {
            let outcome = match self.coordinator.apply(&txn, &key, &request_id).await {
                ApplyOutcome::Created => ActionOutcome::Created,
                ApplyOutcome::Reactivated => ActionOutcome::Reactivated,
                ApplyOutcome::AlreadyActive => ActionOutcome::AlreadyActive,
                ApplyOutcome::Error(e) => return Err(e),
            };
            (FollowStatus::Followed, outcome)
        } else {
            let outcome = match self.coordinator.revoke(&txn, &key, &request_id).await {
                RevokeOutcome::Revoked => ActionOutcome::Revoked,
                RevokeOutcome::WasNotActive => ActionOutcome::WasNotActive,
                RevokeOutcome::Error(e) => return Err(e),
            };
            (FollowStatus::Unfollowed, outcome)
        };

        let count = self.follower_count(&txn, followee_id).await?;
        txn.commit().await?;

        debug!(follower_id, followee_id, ?mode, ?outcome, "Follow handled");
        Ok(response(followee_id, status, status.as_str(), count, outcome))
    }

    async fn follower_count(&self, txn: &DatabaseTransaction, user_id: &str) -> AppResult<i64> {
        let count = self.follow_repo.count_followers_in(txn, user_id).await?;
        i64::try_from(count).map_err(|e| AppError::Internal(e.to_string()))
    }
}

fn response(
    target_user_id: &str,
    status: FollowStatus,
    message: &str,
    current_count: i64,
    outcome: ActionOutcome,
) -> RelationshipResponse {
    RelationshipResponse {
        target_user_id: target_user_id.to_string(),
        status,
        success: true,
        message: message.to_string(),
        current_count,
        outcome,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use flux_db::entities::{follow, user};
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult, Value};
    use std::collections::BTreeMap;

    fn count_row(n: i64) -> BTreeMap<&'static str, Value> {
        maplit::btreemap! {
            "num_items" => Value::BigInt(Some(n))
        }
    }

    fn test_user(id: &str) -> user::Model {
        user::Model {
            id: id.to_string(),
            username: format!("user{id}"),
            token: None,
                created_at: Utc::now().into(),
        }
    }

    fn test_follow(active: bool, request_id: &str) -> follow::Model {
        follow::Model {
            id: "f1".to_string(),
            follower_id: "1".to_string(),
            followee_id: "2".to_string(),
            active,
            request_id: request_id.to_string(),
            created_at: Utc::now().into(),
            updated_at: Utc::now().into(),
        }
    }

    fn no_follows() -> Vec<follow::Model> {
        Vec::new()
    }

    fn service(db: MockDatabase) -> RelationshipService {
        RelationshipService::new(Arc::new(db.into_connection()))
    }

    #[tokio::test]
    async fn test_follow_yourself_is_rejected_before_storage() {
        // No mocked results: any storage access would error
        let service = service(MockDatabase::new(DatabaseBackend::Postgres));

        let result = service.follow("3", "3", "r1").await;
        match result {
            Err(AppError::Validation(msg)) => assert!(msg.contains("cannot follow yourself")),
            other => panic!("Expected Validation error, got {other:?}"),
        }
        assert!(matches!(
            service.toggle_follow("3", "3", "r2").await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_follow_creates_and_reports_follower_count() {
        let service = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[test_user("2")]])
                .append_query_results([no_follows()])
                .append_query_results([no_follows()])
                .append_query_results([[test_follow(true, "r1")]])
                .append_query_results([[count_row(1)]]),
        );

        let response = service.follow("1", "2", "r1").await.unwrap();
        assert_eq!(response.status, FollowStatus::Followed);
        assert_eq!(response.message, "Followed");
        assert_eq!(response.current_count, 1);
        assert_eq!(response.outcome, ActionOutcome::Created);
    }

    #[tokio::test]
    async fn test_toggle_flips_active_follow_off() {
        let service = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[test_user("2")]])
                .append_query_results([no_follows()])
                // toggle decides, then the coordinator re-reads
                .append_query_results([[test_follow(true, "r1")]])
                .append_query_results([[test_follow(true, "r1")]])
                .append_query_results([[count_row(0)]])
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }]),
        );

        let response = service.toggle_follow("1", "2", "r2").await.unwrap();
        assert_eq!(response.status, FollowStatus::Unfollowed);
        assert_eq!(response.message, "Unfollowed");
        assert_eq!(response.outcome, ActionOutcome::Revoked);
        assert_eq!(response.current_count, 0);
    }

    #[tokio::test]
    async fn test_replayed_follow_reports_recorded_state() {
        let service = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[test_user("2")]])
                .append_query_results([[test_follow(false, "r2")]])
                .append_query_results([[count_row(0)]]),
        );

        let response = service.toggle_follow("1", "2", "r2").await.unwrap();
        assert_eq!(response.message, "Already processed");
        assert_eq!(response.status, FollowStatus::Unfollowed);
        assert_eq!(response.outcome, ActionOutcome::Replayed);
    }

    #[tokio::test]
    async fn test_unfollow_when_not_following_succeeds() {
        let service = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[test_user("2")]])
                .append_query_results([no_follows()])
                .append_query_results([no_follows()])
                .append_query_results([[count_row(4)]]),
        );

        let response = service.unfollow("1", "2", "r9").await.unwrap();
        assert_eq!(response.status, FollowStatus::Unfollowed);
        assert_eq!(response.outcome, ActionOutcome::WasNotActive);
        assert_eq!(response.current_count, 4);
    }

    #[tokio::test]
    async fn test_follow_missing_user() {
        let service = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<user::Model>::new()]),
        );

        let result = service.follow("1", "ghost", "r1").await;
        assert!(matches!(result, Err(AppError::UserNotFound(id)) if id == "ghost"));
    }

    #[tokio::test]
    async fn test_relationship_info() {
        let service = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[count_row(10)]])
                .append_query_results([[count_row(5)]])
                .append_query_results([[count_row(1)]]),
        );

        let info = service.relationship_info("2", "1").await.unwrap();
        assert_eq!(
            info,
            RelationshipInfo {
                followers_count: 10,
                following_count: 5,
                is_following: true,
            }
        );
    }

    #[tokio::test]
    async fn test_profile_stats_of_self_skips_follow_check() {
        let service = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[count_row(7)]])
                .append_query_results([[count_row(2)]])
                .append_query_results([[count_row(3)]]),
        );

        let stats = service.profile_stats("1", "1").await.unwrap();
        assert_eq!(stats.post_count, 7);
        assert_eq!(stats.followers_count, 2);
        assert_eq!(stats.following_count, 3);
        assert!(!stats.is_following);

        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["postCount"], 7);
        assert_eq!(json["isFollowing"], false);
    }
}
