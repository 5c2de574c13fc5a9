//! # examhub-entity
//!
//! Domain entities for the ExamHub console client: the notification
//! model and its supporting enumerations and query types.

pub mod notification;

pub use notification::{FeedOrdering, Notification, NotificationFilter, NotificationKind, Priority};
