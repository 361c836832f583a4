//! Business logic services.

#![allow(missing_docs)]

pub mod counter;
pub mod idempotency;
pub mod interaction;
pub mod relationship;
pub mod toggle;
pub mod user;

pub use counter::{Counter, CounterDelta, CounterMaintainer};
pub use idempotency::{IdempotencyGuard, LedgerGuard, Replay, RequestId};
pub use interaction::{InteractionResponse, InteractionService, ResponseActionType};
pub use relationship::{
    FollowStatus, ProfileStats, RelationshipInfo, RelationshipResponse, RelationshipService,
};
pub use toggle::{ActionOutcome, ApplyOutcome, RecordOutcome, RevokeOutcome, ToggleCoordinator};
pub use user::UserService;
