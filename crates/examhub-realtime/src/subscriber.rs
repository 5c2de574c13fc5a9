//! The feed subscriber and its scoped guard.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use examhub_client::events::{EventSink, FeedEvent};
use examhub_client::service::{DataService, FeedSubscription};
use examhub_core::error::AppError;
use examhub_core::result::AppResult;
use examhub_core::types::UserId;

use crate::state::FeedState;

/// Opens push subscriptions and forwards their events into an
/// [`EventSink`].
///
/// At most one subscription may be live at a time. The holder enforces
/// this by dropping the previous [`FeedGuard`] before calling
/// [`FeedSubscriber::open`] for a new recipient — the drop aborts the
/// drain task and closes the channel, so two live subscriptions can
/// never target different recipients concurrently.
pub struct FeedSubscriber {
    service: Arc<dyn DataService>,
    sink: Arc<dyn EventSink>,
}

impl FeedSubscriber {
    /// Create a subscriber over a data service and an event sink.
    pub fn new(service: Arc<dyn DataService>, sink: Arc<dyn EventSink>) -> Self {
        Self { service, sink }
    }

    /// Open a subscription scoped to `recipient_id` and start draining
    /// it in a background task.
    pub async fn open(&self, recipient_id: UserId) -> AppResult<FeedGuard> {
        let (state_tx, state_rx) = watch::channel(FeedState::Connecting);

        let subscription = self
            .service
            .subscribe(recipient_id)
            .await
            .map_err(|e| AppError::channel(format!("failed to open feed: {e}")))?;
        let _ = state_tx.send(FeedState::Open);
        debug!(recipient = %recipient_id, "Feed subscription open");

        let service = Arc::clone(&self.service);
        let sink = Arc::clone(&self.sink);
        let task = tokio::spawn(async move {
            drain(subscription, service, sink, state_tx).await;
        });

        Ok(FeedGuard {
            recipient_id,
            task,
            state_rx,
        })
    }
}

/// Drain loop: forward every event for the subscribed recipient into
/// the sink. When the transport ends the stream, attempt a single
/// immediate resubscribe; if that fails, the feed stays closed and the
/// periodic poll carries correctness.
async fn drain(
    mut subscription: FeedSubscription,
    service: Arc<dyn DataService>,
    sink: Arc<dyn EventSink>,
    state_tx: watch::Sender<FeedState>,
) {
    let recipient_id = subscription.recipient_id();
    loop {
        while let Some(event) = subscription.recv().await {
            forward(&*sink, recipient_id, event);
        }

        // Transport closed the stream underneath us.
        let _ = state_tx.send(FeedState::Reconnecting);
        warn!(recipient = %recipient_id, "Feed channel dropped, resubscribing");

        match service.subscribe(recipient_id).await {
            Ok(sub) => {
                subscription = sub;
                let _ = state_tx.send(FeedState::Open);
                debug!(recipient = %recipient_id, "Feed subscription reopened");
            }
            Err(e) => {
                let _ = state_tx.send(FeedState::Closed);
                warn!(
                    recipient = %recipient_id,
                    error = %e,
                    "Feed resubscribe failed, poll backstop remains active"
                );
                return;
            }
        }
    }
}

/// Forward one event, filtering out rows for other recipients. The
/// service is expected to scope the subscription server-side; this is
/// the client-side half of the recipient-isolation invariant.
fn forward(sink: &dyn EventSink, recipient_id: UserId, event: FeedEvent) {
    if let Some(owner) = event.recipient_id() {
        if owner != recipient_id {
            warn!(
                recipient = %recipient_id,
                owner = %owner,
                "Dropping cross-recipient feed event"
            );
            return;
        }
    }
    sink.handle_event(recipient_id, event);
}

/// Scoped handle for one live subscription.
///
/// Acquire on "recipient known", release on any exit path: dropping the
/// guard aborts the drain task and closes the subscription channel.
#[derive(Debug)]
pub struct FeedGuard {
    recipient_id: UserId,
    task: JoinHandle<()>,
    state_rx: watch::Receiver<FeedState>,
}

impl FeedGuard {
    /// The recipient this subscription is scoped to.
    pub fn recipient_id(&self) -> UserId {
        self.recipient_id
    }

    /// Current lifecycle state, for "live/offline" surface indicators.
    pub fn state(&self) -> FeedState {
        if self.task.is_finished() {
            return FeedState::Closed;
        }
        *self.state_rx.borrow()
    }

    /// Tear the subscription down explicitly. Equivalent to dropping
    /// the guard.
    pub fn close(self) {}
}

impl Drop for FeedGuard {
    fn drop(&mut self) {
        self.task.abort();
        debug!(recipient = %self.recipient_id, "Feed subscription closed");
    }
}
