//! Notification entity model.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use examhub_core::types::{NotificationId, UserId};

use super::kind::NotificationKind;
use super::priority::Priority;

/// A notification addressed to a single recipient.
///
/// The authoritative copy lives on the data service; instances held by
/// the client are replicas, reconciled on every mutation response and
/// on every push event. Clients only ever change `is_read` and
/// `is_dismissed`, never the content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    /// Unique notification identifier.
    pub id: NotificationId,
    /// The recipient user. A client only subscribes to and displays
    /// notifications where this matches the current user.
    pub recipient_id: UserId,
    /// The business event that created this notification.
    pub kind: NotificationKind,
    /// Priority tier, immutable once created.
    pub priority: Priority,
    /// Display title.
    pub title: String,
    /// Display body text.
    pub message: String,
    /// Optional deep-link route token for click navigation.
    pub link: Option<String>,
    /// Whether the recipient has read this notification.
    pub is_read: bool,
    /// Whether the recipient dismissed this notification. Dismissed
    /// rows are excluded from all list and count queries (soft delete).
    pub is_dismissed: bool,
    /// When the notification was created. Newest-first ordering key.
    pub created_at: DateTime<Utc>,
}

impl Notification {
    /// Check if the notification is unread.
    pub fn is_unread(&self) -> bool {
        !self.is_read
    }

    /// Whether the notification is recent enough to carry a "New"
    /// badge. Recomputed at render time, never stored.
    pub fn is_new(&self, now: DateTime<Utc>, badge_hours: i64) -> bool {
        now - self.created_at < Duration::hours(badge_hours)
    }
}
