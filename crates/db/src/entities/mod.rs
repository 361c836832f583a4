//! Database entities.

pub mod follow;
pub mod interaction;
pub mod post;
pub mod share_request;
pub mod user;

pub use follow::Entity as Follow;
pub use interaction::Entity as Interaction;
pub use post::Entity as Post;
pub use share_request::Entity as ShareRequest;
pub use user::Entity as User;
