//! Optimistic read-state mutations with rollback.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use examhub_cache::NotificationCache;
use examhub_client::store::NotificationStore;
use examhub_core::result::AppResult;
use examhub_core::types::{NotificationId, UserId};

/// Applies read-state changes optimistically: the cache is mutated
/// first, the service call follows, and a hard failure rolls the cache
/// back before the error is surfaced.
///
/// `NotFound` from the service is treated as a benign race (the row was
/// already mutated or purged in another session); the optimistic state
/// stands and a refetch reconciles the details.
pub struct ReadStateController {
    store: NotificationStore,
    cache: NotificationCache,
    /// Per-notification locks serializing concurrent mutations of the
    /// same id. Entries are pruned once the last holder releases.
    in_flight: DashMap<NotificationId, Arc<Mutex<()>>>,
}

impl ReadStateController {
    /// Create a controller over a store and the cache it reconciles.
    pub fn new(store: NotificationStore, cache: NotificationCache) -> Self {
        Self {
            store,
            cache,
            in_flight: DashMap::new(),
        }
    }

    /// Mark one notification as read. Idempotent: a cached already-read
    /// row short-circuits without a service call.
    pub async fn mark_read(&self, recipient_id: UserId, id: NotificationId) -> AppResult<()> {
        let lock = self.lock_id(id);
        let guard = lock.lock().await;
        let result = self.mark_read_locked(recipient_id, id).await;
        drop(guard);
        drop(lock);
        self.release_id(id);
        result
    }

    async fn mark_read_locked(&self, recipient_id: UserId, id: NotificationId) -> AppResult<()> {
        if self.cache.is_read(recipient_id, id) == Some(true) {
            debug!(notification = %id, "Already read, skipping");
            return Ok(());
        }

        let flipped = self.cache.apply_read(recipient_id, id);
        match self.store.mark_read(id, recipient_id).await {
            Ok(_) => {
                self.cache.refresh_in_background(recipient_id);
                Ok(())
            }
            Err(e) if e.is_benign_race() => {
                debug!(notification = %id, "Row gone server-side, treating mark-read as settled");
                self.cache.refresh_in_background(recipient_id);
                Ok(())
            }
            Err(e) => {
                if flipped {
                    self.cache.revert_read(recipient_id, id);
                }
                warn!(notification = %id, error = %e, "Mark-read failed, rolled back");
                Err(e)
            }
        }
    }

    /// Mark every unread notification as read. On failure the whole
    /// entry is refetched instead of rolled back per id, since the
    /// server may have applied the change partially.
    pub async fn mark_all_read(&self, recipient_id: UserId) -> AppResult<()> {
        let flipped = self.cache.apply_all_read(recipient_id);
        match self.store.mark_all_read(recipient_id).await {
            Ok(affected) => {
                debug!(recipient = %recipient_id, affected, optimistic = flipped.len(), "Marked all read");
                self.cache.refresh_in_background(recipient_id);
                Ok(())
            }
            Err(e) => {
                warn!(recipient = %recipient_id, error = %e, "Mark-all-read failed, refetching");
                self.cache.refresh(recipient_id).await;
                Err(e)
            }
        }
    }

    /// Dismiss one notification. The id is tombstoned for the rest of
    /// the session so late push events cannot resurrect it. Idempotent
    /// for already-tombstoned ids.
    pub async fn dismiss(&self, recipient_id: UserId, id: NotificationId) -> AppResult<()> {
        let lock = self.lock_id(id);
        let guard = lock.lock().await;
        let result = self.dismiss_locked(recipient_id, id).await;
        drop(guard);
        drop(lock);
        self.release_id(id);
        result
    }

    async fn dismiss_locked(&self, recipient_id: UserId, id: NotificationId) -> AppResult<()> {
        if self.cache.is_tombstoned(recipient_id, id) {
            debug!(notification = %id, "Already dismissed locally, skipping");
            return Ok(());
        }

        let removed = self.cache.remove(recipient_id, id);
        match self.store.dismiss(id, recipient_id).await {
            Ok(_) => {
                self.cache.refresh_in_background(recipient_id);
                Ok(())
            }
            Err(e) if e.is_benign_race() => {
                debug!(notification = %id, "Row already dismissed server-side");
                self.cache.refresh_in_background(recipient_id);
                Ok(())
            }
            Err(e) => {
                match removed {
                    Some(row) => self.cache.restore(recipient_id, row),
                    None => self.cache.clear_tombstone(recipient_id, id),
                }
                warn!(notification = %id, error = %e, "Dismiss failed, rolled back");
                Err(e)
            }
        }
    }

    /// Dismiss every read notification. Removed rows are restored on a
    /// hard failure.
    pub async fn dismiss_all_read(&self, recipient_id: UserId) -> AppResult<()> {
        let removed = self.cache.remove_read(recipient_id);
        match self.store.dismiss_all_read(recipient_id).await {
            Ok(affected) => {
                debug!(recipient = %recipient_id, affected, "Dismissed all read");
                self.cache.refresh_in_background(recipient_id);
                Ok(())
            }
            Err(e) if e.is_benign_race() => {
                self.cache.refresh_in_background(recipient_id);
                Ok(())
            }
            Err(e) => {
                warn!(recipient = %recipient_id, error = %e, "Dismiss-all-read failed, rolled back");
                self.cache.restore_all(recipient_id, removed);
                Err(e)
            }
        }
    }

    fn lock_id(&self, id: NotificationId) -> Arc<Mutex<()>> {
        Arc::clone(&self.in_flight.entry(id).or_default())
    }

    fn release_id(&self, id: NotificationId) {
        // Only the map's own Arc left: no holder, no waiter.
        self.in_flight
            .remove_if(&id, |_, lock| Arc::strong_count(lock) == 1);
    }
}
