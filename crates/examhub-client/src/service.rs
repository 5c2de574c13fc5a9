//! The `DataService` trait — what the hosted backend provides.

use async_trait::async_trait;
use tokio::sync::mpsc;

use examhub_core::result::AppResult;
use examhub_core::types::{NotificationId, UserId};
use examhub_entity::{Notification, NotificationFilter};

use crate::events::{BulkPredicate, FeedEvent, ReadStatePatch};

/// A live push subscription scoped to a single recipient.
///
/// Dropping the subscription closes the channel, which the service
/// implementation observes as an unsubscribe.
#[derive(Debug)]
pub struct FeedSubscription {
    recipient_id: UserId,
    rx: mpsc::UnboundedReceiver<FeedEvent>,
}

impl FeedSubscription {
    /// Create a subscription from a receiving channel half.
    pub fn new(recipient_id: UserId, rx: mpsc::UnboundedReceiver<FeedEvent>) -> Self {
        Self { recipient_id, rx }
    }

    /// The recipient this subscription is scoped to.
    pub fn recipient_id(&self) -> UserId {
        self.recipient_id
    }

    /// Receive the next event. Returns `None` when the transport side
    /// has closed the subscription.
    pub async fn recv(&mut self) -> Option<FeedEvent> {
        self.rx.recv().await
    }
}

/// Request/response and subscribe primitives of the external data
/// service.
///
/// The console client implements none of the persistence or transport
/// behind these calls; a host adapter maps them onto the hosted
/// backend's SDK. All operations are recipient-scoped server-side: a
/// notification that does not belong to the caller yields `NotFound`.
#[async_trait]
pub trait DataService: Send + Sync + 'static {
    /// List the recipient's non-dismissed notifications.
    ///
    /// Ordered `created_at` descending unless the filter requests the
    /// compound priority-then-recency order used for compact views.
    async fn list_notifications(
        &self,
        recipient_id: UserId,
        filter: &NotificationFilter,
    ) -> AppResult<Vec<Notification>>;

    /// Count the recipient's unread, non-dismissed notifications.
    async fn unread_count(&self, recipient_id: UserId) -> AppResult<i64>;

    /// Update the read/dismissed state of one notification.
    async fn update_notification(
        &self,
        id: NotificationId,
        recipient_id: UserId,
        patch: ReadStatePatch,
    ) -> AppResult<Notification>;

    /// Update all of the recipient's notifications matching a
    /// predicate. Returns the number of affected rows.
    async fn update_all_for_recipient(
        &self,
        recipient_id: UserId,
        predicate: BulkPredicate,
        patch: ReadStatePatch,
    ) -> AppResult<u64>;

    /// Open a push subscription for the recipient's notifications.
    async fn subscribe(&self, recipient_id: UserId) -> AppResult<FeedSubscription>;
}
