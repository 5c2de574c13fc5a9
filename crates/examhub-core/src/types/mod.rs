//! Shared type definitions: typed identifiers.

pub mod id;

pub use id::{NotificationId, UserId};
