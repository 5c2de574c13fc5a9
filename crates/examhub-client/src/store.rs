//! Notification data-access layer.

use std::sync::Arc;

use tracing::debug;

use examhub_core::result::AppResult;
use examhub_core::types::{NotificationId, UserId};
use examhub_entity::{Notification, NotificationFilter};

use crate::events::{BulkPredicate, ReadStatePatch};
use crate::service::DataService;

/// Thin request/response layer over the external data service.
///
/// Performs no retries and no caching; callers (the cache and the
/// read-state controller) decide whether to retry, roll back optimistic
/// state, or surface an error.
#[derive(Clone)]
pub struct NotificationStore {
    service: Arc<dyn DataService>,
}

impl NotificationStore {
    /// Create a new store over a data-service implementation.
    pub fn new(service: Arc<dyn DataService>) -> Self {
        Self { service }
    }

    /// The underlying data service, for opening subscriptions.
    pub fn service(&self) -> Arc<dyn DataService> {
        Arc::clone(&self.service)
    }

    /// List notifications for a recipient.
    pub async fn list(
        &self,
        recipient_id: UserId,
        filter: &NotificationFilter,
    ) -> AppResult<Vec<Notification>> {
        let notifications = self.service.list_notifications(recipient_id, filter).await?;
        debug!(
            recipient = %recipient_id,
            count = notifications.len(),
            "Listed notifications"
        );
        Ok(notifications)
    }

    /// Get the unread notification count for a recipient.
    pub async fn unread_count(&self, recipient_id: UserId) -> AppResult<i64> {
        self.service.unread_count(recipient_id).await
    }

    /// Mark a notification as read. Recipient-scoped: fails with
    /// `NotFound` if the notification does not belong to the caller.
    pub async fn mark_read(
        &self,
        id: NotificationId,
        recipient_id: UserId,
    ) -> AppResult<Notification> {
        self.service
            .update_notification(id, recipient_id, ReadStatePatch::read())
            .await
    }

    /// Mark all of the recipient's unread notifications as read.
    /// Returns the number of affected rows.
    pub async fn mark_all_read(&self, recipient_id: UserId) -> AppResult<u64> {
        let affected = self
            .service
            .update_all_for_recipient(recipient_id, BulkPredicate::Unread, ReadStatePatch::read())
            .await?;
        debug!(recipient = %recipient_id, affected, "Marked all read");
        Ok(affected)
    }

    /// Dismiss (soft-delete) a notification.
    pub async fn dismiss(
        &self,
        id: NotificationId,
        recipient_id: UserId,
    ) -> AppResult<Notification> {
        self.service
            .update_notification(id, recipient_id, ReadStatePatch::dismissed())
            .await
    }

    /// Dismiss all of the recipient's read notifications.
    pub async fn dismiss_all_read(&self, recipient_id: UserId) -> AppResult<u64> {
        let affected = self
            .service
            .update_all_for_recipient(
                recipient_id,
                BulkPredicate::ReadNotDismissed,
                ReadStatePatch::dismissed(),
            )
            .await?;
        debug!(recipient = %recipient_id, affected, "Dismissed all read");
        Ok(affected)
    }
}
