//! # examhub-cache
//!
//! The in-memory notification replica, keyed by recipient. Serves
//! notification lists and unread counts with bounded staleness: push
//! invalidation marks entries stale, a freshness window refetches on
//! read, and a periodic poll refetches unconditionally as the backstop
//! against silently dropped push events.
//!
//! The cache is the single shared mutable structure of the subsystem.
//! It is mutated only by fetch completions (token-checked so a stale
//! in-flight response can never overwrite a newer one), optimistic
//! mutations from the read-state controller, and invalidation signals
//! from the feed subscriber.

pub mod poller;
pub mod replica;

pub use poller::PollGuard;
pub use replica::{CacheSnapshot, NotificationCache};
