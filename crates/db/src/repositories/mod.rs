//! Database repositories.

mod follow;
mod interaction;
mod post;
mod share_request;
mod toggle_store;
mod user;

pub use follow::{FollowKey, FollowRepository};
pub use interaction::{InteractionKey, InteractionRepository};
pub use post::PostRepository;
pub use share_request::ShareRequestRepository;
pub use toggle_store::{RequestLedger, ToggleRecord, ToggleStore, is_unique_violation};
pub use user::UserRepository;
