//! Priority-based toast presentation and banner selection.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, trace};

use examhub_core::config::notifications::NotificationsConfig;
use examhub_entity::{Notification, NotificationKind, Priority};

use crate::dedup::ToastDeduplicator;

/// How a toast behaves once shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastBehavior {
    /// Stays on screen until the operator dismisses it.
    Persistent,
    /// Auto-dismisses after the duration.
    Timed(Duration),
    /// No toast at all.
    Silent,
}

/// A toast ready for display.
#[derive(Debug, Clone)]
pub struct Toast {
    pub notification_id: examhub_core::types::NotificationId,
    pub kind: NotificationKind,
    pub priority: Priority,
    pub title: String,
    pub message: String,
    pub link: Option<String>,
    /// `None` means the toast persists until dismissed.
    pub duration: Option<Duration>,
}

/// Consumer of presented toasts. Implemented by the UI shell.
pub trait ToastSink: Send + Sync + 'static {
    fn toast(&self, toast: Toast);
}

/// Decides, per priority tier, whether and how an arriving notification
/// is surfaced, and selects the compact banner view.
pub struct PriorityPresenter {
    sink: Arc<dyn ToastSink>,
    dedup: ToastDeduplicator,
    high_duration: Duration,
    medium_duration: Duration,
    banner_limit: usize,
    new_badge_hours: i64,
}

impl PriorityPresenter {
    /// Create a presenter over a toast sink, with durations and limits
    /// from config.
    pub fn new(sink: Arc<dyn ToastSink>, config: &NotificationsConfig) -> Self {
        Self {
            sink,
            dedup: ToastDeduplicator::new(config.toast.dedup_window_ms),
            high_duration: Duration::from_millis(config.toast.high_duration_ms),
            medium_duration: Duration::from_millis(config.toast.medium_duration_ms),
            banner_limit: config.banner_limit,
            new_badge_hours: config.new_badge_hours,
        }
    }

    /// Toast behavior for a priority tier. Critical toasts persist,
    /// silent tiers update the badge count only.
    pub fn behavior_for(&self, priority: Priority) -> ToastBehavior {
        if priority.is_silent() {
            return ToastBehavior::Silent;
        }
        match priority {
            Priority::Critical => ToastBehavior::Persistent,
            Priority::High => ToastBehavior::Timed(self.high_duration),
            _ => ToastBehavior::Timed(self.medium_duration),
        }
    }

    /// Present an arriving notification, applying the priority policy
    /// and the repeat-suppression window.
    pub fn present(&self, notification: &Notification) {
        if notification.is_read || notification.is_dismissed {
            return;
        }
        let duration = match self.behavior_for(notification.priority) {
            ToastBehavior::Silent => {
                debug!(
                    notification = %notification.id,
                    "Low priority, badge only"
                );
                return;
            }
            ToastBehavior::Persistent => None,
            ToastBehavior::Timed(duration) => Some(duration),
        };
        if !self.dedup.should_display(notification.id) {
            trace!(notification = %notification.id, "Duplicate toast suppressed");
            return;
        }
        self.sink.toast(Toast {
            notification_id: notification.id,
            kind: notification.kind,
            priority: notification.priority,
            title: notification.title.clone(),
            message: notification.message.clone(),
            link: notification.link.clone(),
            duration,
        });
    }

    /// Select the compact banner view: the top unread items, highest
    /// priority first, newest first within a tier.
    pub fn banner_items(&self, notifications: &[Notification]) -> Vec<Notification> {
        let mut unread: Vec<Notification> = notifications
            .iter()
            .filter(|n| n.is_unread() && !n.is_dismissed)
            .cloned()
            .collect();
        unread.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then(b.created_at.cmp(&a.created_at))
        });
        unread.truncate(self.banner_limit);
        unread
    }

    /// Whether a notification still shows its "New" badge.
    pub fn is_new(&self, notification: &Notification, now: DateTime<Utc>) -> bool {
        notification.is_new(now, self.new_badge_hours)
    }

    /// Icon name for a notification kind. Unrecognized kinds fall back
    /// to the generic bell so forward-compatible payloads still render.
    pub fn icon_for(kind: NotificationKind) -> &'static str {
        match kind {
            NotificationKind::IncidentAssigned => "alert-triangle",
            NotificationKind::LeaveApproved => "calendar-check",
            NotificationKind::ShiftChanged => "clock",
            NotificationKind::ChecklistIncomplete => "list-checks",
            NotificationKind::SessionScheduled => "calendar",
            NotificationKind::DocumentShared => "file-text",
            NotificationKind::SystemNews => "megaphone",
            NotificationKind::Unknown => "bell",
        }
    }
}
