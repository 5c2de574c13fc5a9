//! Periodic poll backstop.

use tokio::task::JoinHandle;
use tracing::debug;

use examhub_core::types::UserId;

use crate::replica::NotificationCache;

/// Scoped handle for one recipient's periodic refresh task.
///
/// Push delivery is best-effort; this poll refetches unconditionally on
/// a fixed period so the cache converges even if the channel drops
/// events silently or dies outright. Dropping the guard stops the task.
#[derive(Debug)]
pub struct PollGuard {
    recipient_id: UserId,
    task: JoinHandle<()>,
}

impl PollGuard {
    /// The recipient this poller refreshes.
    pub fn recipient_id(&self) -> UserId {
        self.recipient_id
    }

    /// Stop polling explicitly. Equivalent to dropping the guard.
    pub fn stop(self) {}
}

impl Drop for PollGuard {
    fn drop(&mut self) {
        self.task.abort();
        debug!(recipient = %self.recipient_id, "Poll backstop stopped");
    }
}

impl NotificationCache {
    /// Start the periodic poll backstop for a recipient.
    pub fn spawn_poller(&self, recipient_id: UserId) -> PollGuard {
        let cache = self.clone();
        let period = self.poll_interval();
        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            // The immediate first tick overlaps the priming fetch; the
            // token check makes that harmless.
            loop {
                interval.tick().await;
                cache.refresh(recipient_id).await;
            }
        });
        debug!(recipient = %recipient_id, period_seconds = period.as_secs(), "Poll backstop started");
        PollGuard { recipient_id, task }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use examhub_client::mock::MemoryDataService;
    use examhub_client::store::NotificationStore;
    use examhub_core::config::notifications::NotificationsConfig;
    use examhub_core::types::NotificationId;
    use examhub_entity::{Notification, NotificationFilter, NotificationKind, Priority};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_poller_picks_up_missed_events() {
        let service = Arc::new(MemoryDataService::new());
        let alice = examhub_core::types::UserId::new();

        let config = NotificationsConfig::default();
        let cache = NotificationCache::new(NotificationStore::new(service.clone()), &config);
        cache.prime(alice).await;
        let _guard = cache.spawn_poller(alice);

        // A row appears on the server without any push event (seed does
        // not emit). The poll must still converge on it.
        service.seed(Notification {
            id: NotificationId::new(),
            recipient_id: alice,
            kind: NotificationKind::SystemNews,
            priority: Priority::Low,
            title: "Maintenance window".into(),
            message: "Sunday 02:00".into(),
            link: None,
            is_read: false,
            is_dismissed: false,
            created_at: Utc::now(),
        });

        tokio::time::sleep(std::time::Duration::from_secs(
            config.poll_interval_seconds + 5,
        ))
        .await;

        let snapshot = cache.snapshot(alice, &NotificationFilter::default());
        assert_eq!(snapshot.notifications.len(), 1);
        assert_eq!(snapshot.unread_count, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_guard_drop_stops_polling() {
        let service = Arc::new(MemoryDataService::new());
        let alice = examhub_core::types::UserId::new();

        let config = NotificationsConfig::default();
        let cache = NotificationCache::new(NotificationStore::new(service.clone()), &config);
        cache.prime(alice).await;
        let guard = cache.spawn_poller(alice);
        drop(guard);

        service.seed(Notification {
            id: NotificationId::new(),
            recipient_id: alice,
            kind: NotificationKind::SystemNews,
            priority: Priority::Low,
            title: "Maintenance window".into(),
            message: "Sunday 02:00".into(),
            link: None,
            is_read: false,
            is_dismissed: false,
            created_at: Utc::now(),
        });
        tokio::time::sleep(std::time::Duration::from_secs(
            config.poll_interval_seconds + 5,
        ))
        .await;

        // A full poll period passed with the guard dropped; had the
        // poller still been running, the row would be cached by now.
        // The read here may kick its own freshness refetch, but that
        // lands after this snapshot was taken.
        let snapshot = cache.snapshot(alice, &NotificationFilter::default());
        assert!(!snapshot.is_loading);
        assert!(snapshot.notifications.is_empty());
    }
}
