//! # examhub-realtime
//!
//! The change feed subscriber: one live push subscription per
//! recipient, delivering row-level events into an
//! [`EventSink`](examhub_client::EventSink) without touching
//! application state itself. Teardown is deterministic — the
//! [`FeedGuard`] closes the subscription on drop, so recipient
//! switches, logout, and shutdown can never leak a subscription.

pub mod state;
pub mod subscriber;

pub use state::FeedState;
pub use subscriber::{FeedGuard, FeedSubscriber};
