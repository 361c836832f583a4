//! Denormalized post counters.

use flux_common::{AppError, AppResult};
use flux_db::{entities::post, repositories::PostRepository};
use sea_orm::DatabaseTransaction;

/// Counter column on a post.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Counter {
    Like,
    Share,
}

impl Counter {
    fn read(self, post: &post::Model) -> i64 {
        match self {
            Self::Like => i64::from(post.like_count),
            Self::Share => i64::from(post.share_count),
        }
    }
}

/// Change to apply to a counter after a record transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterDelta {
    Increment,
    Decrement,
    Unchanged,
}

/// Keeps post counters in step with record transitions.
#[derive(Clone)]
pub struct CounterMaintainer {
    post_repo: PostRepository,
}

impl CounterMaintainer {
    #[must_use]
    pub const fn new(post_repo: PostRepository) -> Self {
        Self { post_repo }
    }

    /// Apply `delta` to `counter` and return the value now visible in `txn`.
    pub async fn on_transition(
        &self,
        txn: &DatabaseTransaction,
        post_id: &str,
        counter: Counter,
        delta: CounterDelta,
    ) -> AppResult<i64> {
        match (counter, delta) {
            (_, CounterDelta::Unchanged) => {}
            (Counter::Like, CounterDelta::Increment) => {
                self.post_repo.increment_like_count(txn, post_id).await?;
            }
            (Counter::Like, CounterDelta::Decrement) => {
                self.post_repo.decrement_like_count(txn, post_id).await?;
            }
            (Counter::Share, CounterDelta::Increment) => {
                self.post_repo.increment_share_count(txn, post_id).await?;
            }
            (Counter::Share, CounterDelta::Decrement) => {
                return Err(AppError::Internal(
                    "share counter is never decremented".to_string(),
                ));
            }
        }

        self.current(txn, post_id, counter).await
    }

    /// Read the counter without changing it.
    pub async fn current(
        &self,
        txn: &DatabaseTransaction,
        post_id: &str,
        counter: Counter,
    ) -> AppResult<i64> {
        let post = self.post_repo.get_live(txn, post_id).await?;
        Ok(counter.read(&post))
    }
}
