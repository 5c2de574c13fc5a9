//! Typed events and patches carried across the data-service boundary.

use serde::{Deserialize, Serialize};

use examhub_core::types::{NotificationId, UserId};
use examhub_entity::Notification;

/// A row-level change event delivered over the push channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum FeedEvent {
    /// A notification was created.
    Inserted(Notification),
    /// A notification's read/dismissed state changed.
    Updated(Notification),
    /// A notification was purged by the backend.
    Deleted(NotificationId),
}

impl FeedEvent {
    /// The id of the affected notification.
    pub fn notification_id(&self) -> NotificationId {
        match self {
            Self::Inserted(n) | Self::Updated(n) => n.id,
            Self::Deleted(id) => *id,
        }
    }

    /// The recipient of the affected notification, when the event
    /// carries the full row. Delete events carry only the id.
    pub fn recipient_id(&self) -> Option<UserId> {
        match self {
            Self::Inserted(n) | Self::Updated(n) => Some(n.recipient_id),
            Self::Deleted(_) => None,
        }
    }
}

/// The only fields a client is ever allowed to change.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ReadStatePatch {
    /// New read flag, if changing.
    pub is_read: Option<bool>,
    /// New dismissed flag, if changing.
    pub is_dismissed: Option<bool>,
}

impl ReadStatePatch {
    /// Patch marking a notification read.
    pub fn read() -> Self {
        Self {
            is_read: Some(true),
            is_dismissed: None,
        }
    }

    /// Patch dismissing a notification.
    pub fn dismissed() -> Self {
        Self {
            is_read: None,
            is_dismissed: Some(true),
        }
    }

    /// Apply the patch to a notification replica.
    pub fn apply(&self, notification: &mut Notification) {
        if let Some(is_read) = self.is_read {
            notification.is_read = is_read;
        }
        if let Some(is_dismissed) = self.is_dismissed {
            notification.is_dismissed = is_dismissed;
        }
    }
}

/// Row selection for bulk updates, evaluated server-side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BulkPredicate {
    /// All unread, non-dismissed notifications.
    Unread,
    /// All read, non-dismissed notifications.
    ReadNotDismissed,
}

impl BulkPredicate {
    /// Whether a notification matches the predicate.
    pub fn matches(&self, notification: &Notification) -> bool {
        if notification.is_dismissed {
            return false;
        }
        match self {
            Self::Unread => !notification.is_read,
            Self::ReadNotDismissed => notification.is_read,
        }
    }
}

/// Receiver of push events for a single recipient.
///
/// The subscriber forwards transport events here without mutating any
/// application state itself; the cache layer implements this to
/// invalidate and refetch.
pub trait EventSink: Send + Sync + 'static {
    /// Handle one event delivered for `recipient_id`'s subscription.
    fn handle_event(&self, recipient_id: UserId, event: FeedEvent);
}
