//! # examhub-notify
//!
//! The top of the notification subsystem: the read-state controller
//! (optimistic mutations with rollback), the priority presenter (toast
//! policy, repeat suppression, banner selection), and the
//! [`NotificationCenter`] facade that wires store, cache, feed, and
//! poller together for the UI shell.

pub mod center;
pub mod controller;
pub mod dedup;
pub mod presenter;

pub use center::NotificationCenter;
pub use controller::ReadStateController;
pub use dedup::ToastDeduplicator;
pub use presenter::{PriorityPresenter, Toast, ToastBehavior, ToastSink};
