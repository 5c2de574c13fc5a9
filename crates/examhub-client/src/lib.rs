//! # examhub-client
//!
//! The boundary between the console client and the hosted data
//! service: the [`DataService`] trait the host environment implements,
//! the feed event and patch types carried across it, and the
//! [`NotificationStore`] data-access layer the rest of the notification
//! subsystem talks to.
//!
//! With the `mock` feature enabled, [`mock::MemoryDataService`]
//! provides an in-memory backend for tests.

pub mod events;
pub mod service;
pub mod store;

#[cfg(feature = "mock")]
pub mod mock;

pub use events::{BulkPredicate, EventSink, FeedEvent, ReadStatePatch};
pub use service::{DataService, FeedSubscription};
pub use store::NotificationStore;
