//! Query filter and ordering for notification lists.

use serde::{Deserialize, Serialize};

use super::model::Notification;
use super::priority::Priority;

/// Ordering applied by the data service to a notification list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedOrdering {
    /// `created_at` descending. The general list order; priority-based
    /// ordering is a presentation concern.
    #[default]
    CreatedDesc,
    /// `priority` descending, then `created_at` descending. Used only
    /// for compact "top N" views.
    PriorityThenCreatedDesc,
}

/// Filter for listing a recipient's notifications.
///
/// Dismissed notifications are always excluded, regardless of filter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationFilter {
    /// Restrict to read (`true`) or unread (`false`) notifications.
    pub is_read: Option<bool>,
    /// Restrict to a single priority tier.
    pub priority: Option<Priority>,
    /// Maximum number of notifications to return.
    pub limit: Option<usize>,
    /// Ordering of the result.
    #[serde(default)]
    pub order: FeedOrdering,
}

impl NotificationFilter {
    /// Filter matching only unread notifications.
    pub fn unread_only() -> Self {
        Self {
            is_read: Some(false),
            ..Self::default()
        }
    }

    /// Filter for a compact top-N view, ordered by priority then
    /// recency.
    pub fn compact(limit: usize) -> Self {
        Self {
            is_read: Some(false),
            limit: Some(limit),
            order: FeedOrdering::PriorityThenCreatedDesc,
            ..Self::default()
        }
    }

    /// Whether a notification matches the `is_read`/`priority` criteria.
    /// Dismissed rows never match.
    pub fn matches(&self, notification: &Notification) -> bool {
        if notification.is_dismissed {
            return false;
        }
        if let Some(is_read) = self.is_read {
            if notification.is_read != is_read {
                return false;
            }
        }
        if let Some(priority) = self.priority {
            if notification.priority != priority {
                return false;
            }
        }
        true
    }

    /// Sort a list in place according to [`FeedOrdering`].
    pub fn sort(&self, notifications: &mut [Notification]) {
        match self.order {
            FeedOrdering::CreatedDesc => {
                notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            }
            FeedOrdering::PriorityThenCreatedDesc => {
                notifications.sort_by(|a, b| {
                    b.priority
                        .cmp(&a.priority)
                        .then(b.created_at.cmp(&a.created_at))
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::kind::NotificationKind;
    use chrono::{Duration, Utc};
    use examhub_core::types::{NotificationId, UserId};

    fn sample(priority: Priority, minutes_ago: i64) -> Notification {
        Notification {
            id: NotificationId::new(),
            recipient_id: UserId::new(),
            kind: NotificationKind::SystemNews,
            priority,
            title: String::new(),
            message: String::new(),
            link: None,
            is_read: false,
            is_dismissed: false,
            created_at: Utc::now() - Duration::minutes(minutes_ago),
        }
    }

    #[test]
    fn test_dismissed_never_matches() {
        let mut n = sample(Priority::High, 0);
        n.is_dismissed = true;
        assert!(!NotificationFilter::default().matches(&n));
    }

    #[test]
    fn test_compound_order_sorts_priority_then_recency() {
        let mut rows = vec![
            sample(Priority::Medium, 1),
            sample(Priority::Critical, 30),
            sample(Priority::High, 5),
            sample(Priority::High, 2),
        ];
        NotificationFilter::compact(10).sort(&mut rows);
        assert_eq!(rows[0].priority, Priority::Critical);
        assert_eq!(rows[1].priority, Priority::High);
        assert!(rows[1].created_at > rows[2].created_at);
        assert_eq!(rows[3].priority, Priority::Medium);
    }
}
