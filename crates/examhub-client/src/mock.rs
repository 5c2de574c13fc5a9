//! In-memory data service for tests.
//!
//! Behaves like the hosted backend: recipient scoping on every call, a
//! per-recipient push feed that re-emits a change event after every
//! successful mutation, and injectable failures for exercising rollback
//! paths.

use std::sync::Mutex;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::mpsc;

use examhub_core::error::{AppError, ErrorKind};
use examhub_core::result::AppResult;
use examhub_core::types::{NotificationId, UserId};
use examhub_entity::{Notification, NotificationFilter};

use crate::events::{BulkPredicate, FeedEvent, ReadStatePatch};
use crate::service::{DataService, FeedSubscription};

/// In-memory [`DataService`] implementation.
#[derive(Debug, Default)]
pub struct MemoryDataService {
    /// Notification rows, keyed by id.
    rows: DashMap<NotificationId, Notification>,
    /// Live feed senders per recipient.
    feeds: DashMap<UserId, Vec<mpsc::UnboundedSender<FeedEvent>>>,
    /// Failure to inject into the next service call.
    fail_next: Mutex<Option<ErrorKind>>,
    /// Failure to inject into the next subscribe call specifically.
    fail_next_subscribe: Mutex<Option<ErrorKind>>,
}

impl MemoryDataService {
    /// Create an empty service.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a row without emitting a feed event (pre-existing data).
    pub fn seed(&self, notification: Notification) {
        self.rows.insert(notification.id, notification);
    }

    /// Insert a row and deliver an `Inserted` event to the recipient's
    /// live subscriptions, as the backend does for new business events.
    pub fn publish(&self, notification: Notification) {
        let recipient_id = notification.recipient_id;
        self.rows.insert(notification.id, notification.clone());
        self.emit(recipient_id, FeedEvent::Inserted(notification));
    }

    /// Remove a row (backend purge) and deliver a `Deleted` event.
    pub fn purge(&self, id: NotificationId) {
        if let Some((_, row)) = self.rows.remove(&id) {
            self.emit(row.recipient_id, FeedEvent::Deleted(id));
        }
    }

    /// Make the next service call fail with the given kind.
    pub fn fail_next(&self, kind: ErrorKind) {
        *self.fail_next.lock().unwrap_or_else(|e| e.into_inner()) = Some(kind);
    }

    /// Make the next subscribe call fail, leaving fetches untouched.
    pub fn fail_next_subscribe(&self, kind: ErrorKind) {
        *self
            .fail_next_subscribe
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = Some(kind);
    }

    fn take_injected_failure(&self) -> AppResult<()> {
        let kind = self
            .fail_next
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        match kind {
            Some(kind) => Err(AppError::new(kind, "injected failure")),
            None => Ok(()),
        }
    }

    fn emit(&self, recipient_id: UserId, event: FeedEvent) {
        if let Some(mut senders) = self.feeds.get_mut(&recipient_id) {
            senders.retain(|tx| tx.send(event.clone()).is_ok());
        }
    }
}

#[async_trait]
impl DataService for MemoryDataService {
    async fn list_notifications(
        &self,
        recipient_id: UserId,
        filter: &NotificationFilter,
    ) -> AppResult<Vec<Notification>> {
        self.take_injected_failure()?;

        let mut rows: Vec<Notification> = self
            .rows
            .iter()
            .filter(|entry| entry.recipient_id == recipient_id && filter.matches(entry))
            .map(|entry| entry.value().clone())
            .collect();
        filter.sort(&mut rows);
        if let Some(limit) = filter.limit {
            rows.truncate(limit);
        }
        Ok(rows)
    }

    async fn unread_count(&self, recipient_id: UserId) -> AppResult<i64> {
        self.take_injected_failure()?;

        let count = self
            .rows
            .iter()
            .filter(|entry| {
                entry.recipient_id == recipient_id && !entry.is_dismissed && !entry.is_read
            })
            .count();
        Ok(count as i64)
    }

    async fn update_notification(
        &self,
        id: NotificationId,
        recipient_id: UserId,
        patch: ReadStatePatch,
    ) -> AppResult<Notification> {
        self.take_injected_failure()?;

        let updated = {
            let mut entry = self.rows.get_mut(&id).ok_or_else(|| {
                AppError::not_found(format!("notification {id} not found"))
            })?;
            // Rows of other recipients and already-dismissed rows are
            // invisible to the caller.
            if entry.recipient_id != recipient_id || entry.is_dismissed {
                return Err(AppError::not_found(format!("notification {id} not found")));
            }
            patch.apply(&mut entry);
            entry.value().clone()
        };

        self.emit(recipient_id, FeedEvent::Updated(updated.clone()));
        Ok(updated)
    }

    async fn update_all_for_recipient(
        &self,
        recipient_id: UserId,
        predicate: BulkPredicate,
        patch: ReadStatePatch,
    ) -> AppResult<u64> {
        self.take_injected_failure()?;

        let mut updated = Vec::new();
        for mut entry in self.rows.iter_mut() {
            if entry.recipient_id == recipient_id && predicate.matches(&entry) {
                patch.apply(&mut entry);
                updated.push(entry.value().clone());
            }
        }
        let affected = updated.len() as u64;
        for row in updated {
            self.emit(recipient_id, FeedEvent::Updated(row));
        }
        Ok(affected)
    }

    async fn subscribe(&self, recipient_id: UserId) -> AppResult<FeedSubscription> {
        let injected = self
            .fail_next_subscribe
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
            .or_else(|| self.fail_next.lock().unwrap_or_else(|e| e.into_inner()).take());
        if let Some(kind) = injected {
            return Err(AppError::channel(format!(
                "subscribe failed: {}",
                AppError::new(kind, "injected failure")
            )));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        self.feeds.entry(recipient_id).or_default().push(tx);
        Ok(FeedSubscription::new(recipient_id, rx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use examhub_entity::{NotificationKind, Priority};

    fn notification(recipient_id: UserId, priority: Priority) -> Notification {
        Notification {
            id: NotificationId::new(),
            recipient_id,
            kind: NotificationKind::IncidentAssigned,
            priority,
            title: "Incident assigned".into(),
            message: "Room 4 camera outage".into(),
            link: Some("/incidents/42".into()),
            is_read: false,
            is_dismissed: false,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_list_scopes_by_recipient() {
        let service = MemoryDataService::new();
        let alice = UserId::new();
        let bob = UserId::new();
        service.seed(notification(alice, Priority::High));
        service.seed(notification(bob, Priority::High));

        let rows = service
            .list_notifications(alice, &NotificationFilter::default())
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].recipient_id, alice);
    }

    #[tokio::test]
    async fn test_update_for_foreign_recipient_is_not_found() {
        let service = MemoryDataService::new();
        let alice = UserId::new();
        let bob = UserId::new();
        let n = notification(alice, Priority::Medium);
        let id = n.id;
        service.seed(n);

        let err = service
            .update_notification(id, bob, ReadStatePatch::read())
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_dismiss_twice_is_not_found() {
        let service = MemoryDataService::new();
        let alice = UserId::new();
        let n = notification(alice, Priority::Low);
        let id = n.id;
        service.seed(n);

        service
            .update_notification(id, alice, ReadStatePatch::dismissed())
            .await
            .unwrap();
        let err = service
            .update_notification(id, alice, ReadStatePatch::dismissed())
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_mutation_emits_feed_event() {
        let service = MemoryDataService::new();
        let alice = UserId::new();
        let n = notification(alice, Priority::High);
        let id = n.id;
        service.seed(n);

        let mut sub = service.subscribe(alice).await.unwrap();
        service
            .update_notification(id, alice, ReadStatePatch::read())
            .await
            .unwrap();

        match sub.recv().await {
            Some(FeedEvent::Updated(row)) => {
                assert_eq!(row.id, id);
                assert!(row.is_read);
            }
            other => panic!("expected Updated event, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_injected_failure_fires_once() {
        let service = MemoryDataService::new();
        let alice = UserId::new();
        service.fail_next(ErrorKind::Network);

        let err = service.unread_count(alice).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Network);
        assert_eq!(service.unread_count(alice).await.unwrap(), 0);
    }
}
