//! The notification center facade.
//!
//! Wires the store, replica cache, feed subscriber, poll backstop, and
//! presenter together behind one entry point. The UI shell talks to
//! [`NotificationCenter`] only.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, warn};

use examhub_cache::{CacheSnapshot, NotificationCache, PollGuard};
use examhub_client::events::{EventSink, FeedEvent};
use examhub_client::service::DataService;
use examhub_client::store::NotificationStore;
use examhub_core::config::notifications::NotificationsConfig;
use examhub_core::error::AppError;
use examhub_core::result::AppResult;
use examhub_core::types::{NotificationId, UserId};
use examhub_entity::{Notification, NotificationFilter};
use examhub_realtime::{FeedGuard, FeedState, FeedSubscriber};

use crate::controller::ReadStateController;
use crate::presenter::{PriorityPresenter, ToastSink};

/// The live machinery for the signed-in recipient. Dropping it closes
/// the feed and stops the poll backstop.
struct ActiveRecipient {
    recipient_id: UserId,
    /// `None` when the initial subscribe failed; the poll backstop
    /// still converges the cache.
    feed: Option<FeedGuard>,
    _poll: PollGuard,
}

/// Event sink bridging the feed into the cache and the presenter: an
/// arriving notification toasts first, then invalidates the cache.
struct CenterSink {
    cache: NotificationCache,
    presenter: Arc<PriorityPresenter>,
}

impl EventSink for CenterSink {
    fn handle_event(&self, recipient_id: UserId, event: FeedEvent) {
        if let FeedEvent::Inserted(notification) = &event {
            if !self.cache.is_tombstoned(recipient_id, notification.id) {
                self.presenter.present(notification);
            }
        }
        self.cache.handle_event(recipient_id, event);
    }
}

/// Facade over the notification subsystem, scoped to at most one
/// active recipient at a time.
pub struct NotificationCenter {
    cache: NotificationCache,
    controller: ReadStateController,
    presenter: Arc<PriorityPresenter>,
    subscriber: FeedSubscriber,
    active: Mutex<Option<ActiveRecipient>>,
}

impl NotificationCenter {
    /// Assemble the subsystem over a data service and a toast sink.
    pub fn new(
        service: Arc<dyn DataService>,
        toast_sink: Arc<dyn ToastSink>,
        config: &NotificationsConfig,
    ) -> Self {
        let store = NotificationStore::new(service);
        let cache = NotificationCache::new(store.clone(), config);
        let presenter = Arc::new(PriorityPresenter::new(toast_sink, config));
        let sink = Arc::new(CenterSink {
            cache: cache.clone(),
            presenter: Arc::clone(&presenter),
        });
        let subscriber = FeedSubscriber::new(store.service(), sink);
        let controller = ReadStateController::new(store, cache.clone());
        Self {
            cache,
            controller,
            presenter,
            subscriber,
            active: Mutex::new(None),
        }
    }

    /// Switch the active recipient. `None` signs out.
    ///
    /// The previous recipient's feed, poller, and cached state are torn
    /// down before the new recipient's machinery starts, so state is
    /// never overlaid across recipients. Idempotent for the current
    /// recipient.
    pub async fn set_recipient(&self, recipient: Option<UserId>) {
        let mut active = self.active.lock().await;
        if active.as_ref().map(|a| a.recipient_id) == recipient {
            return;
        }

        if let Some(previous) = active.take() {
            let previous_id = previous.recipient_id;
            drop(previous);
            self.cache.discard(previous_id);
            info!(recipient = %previous_id, "Recipient deactivated");
        }

        let Some(recipient_id) = recipient else {
            return;
        };

        self.cache.prime(recipient_id).await;
        let feed = match self.subscriber.open(recipient_id).await {
            Ok(guard) => Some(guard),
            // Push is an optimization; the poll backstop still runs.
            Err(e) => {
                warn!(recipient = %recipient_id, error = %e, "Feed unavailable, polling only");
                None
            }
        };
        let poll = self.cache.spawn_poller(recipient_id);
        *active = Some(ActiveRecipient {
            recipient_id,
            feed,
            _poll: poll,
        });
        info!(recipient = %recipient_id, "Recipient activated");
    }

    /// The currently active recipient, if any.
    pub async fn active_recipient(&self) -> Option<UserId> {
        self.active.lock().await.as_ref().map(|a| a.recipient_id)
    }

    /// Lifecycle state of the push feed, for a live/offline indicator.
    pub async fn feed_state(&self) -> FeedState {
        match self.active.lock().await.as_ref() {
            Some(active) => active
                .feed
                .as_ref()
                .map(|guard| guard.state())
                .unwrap_or(FeedState::Closed),
            None => FeedState::Closed,
        }
    }

    /// Read the active recipient's notifications from the cache.
    pub async fn snapshot(&self, filter: &NotificationFilter) -> CacheSnapshot {
        match self.active_recipient().await {
            Some(recipient_id) => self.cache.snapshot(recipient_id, filter),
            None => CacheSnapshot::default(),
        }
    }

    /// Cached unread count for the badge. Zero when signed out.
    pub async fn unread_count(&self) -> i64 {
        match self.active_recipient().await {
            Some(recipient_id) => self.cache.unread_count(recipient_id),
            None => 0,
        }
    }

    /// The compact banner selection from the cached list.
    pub async fn banner_items(&self) -> Vec<Notification> {
        let snapshot = self.snapshot(&NotificationFilter::unread_only()).await;
        self.presenter.banner_items(&snapshot.notifications)
    }

    /// Mark one notification as read.
    pub async fn mark_read(&self, id: NotificationId) -> AppResult<()> {
        let recipient_id = self.require_recipient().await?;
        self.controller.mark_read(recipient_id, id).await
    }

    /// Mark all unread notifications as read.
    pub async fn mark_all_read(&self) -> AppResult<()> {
        let recipient_id = self.require_recipient().await?;
        self.controller.mark_all_read(recipient_id).await
    }

    /// Dismiss one notification.
    pub async fn dismiss(&self, id: NotificationId) -> AppResult<()> {
        let recipient_id = self.require_recipient().await?;
        self.controller.dismiss(recipient_id, id).await
    }

    /// Dismiss all read notifications.
    pub async fn dismiss_all_read(&self) -> AppResult<()> {
        let recipient_id = self.require_recipient().await?;
        self.controller.dismiss_all_read(recipient_id).await
    }

    /// Force a refetch of the active recipient's state.
    pub async fn refetch(&self) {
        if let Some(recipient_id) = self.active_recipient().await {
            self.cache.refresh(recipient_id).await;
        }
    }

    async fn require_recipient(&self) -> AppResult<UserId> {
        self.active_recipient()
            .await
            .ok_or_else(|| AppError::authorization("no active recipient"))
    }
}
