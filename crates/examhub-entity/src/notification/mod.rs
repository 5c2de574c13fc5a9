//! Notification entity and related types.

pub mod filter;
pub mod kind;
pub mod model;
pub mod priority;

pub use filter::{FeedOrdering, NotificationFilter};
pub use kind::NotificationKind;
pub use model::Notification;
pub use priority::Priority;
