//! The per-recipient notification replica.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;
use tracing::{debug, warn};

use examhub_client::events::{EventSink, FeedEvent};
use examhub_client::store::NotificationStore;
use examhub_core::config::notifications::NotificationsConfig;
use examhub_core::types::{NotificationId, UserId};
use examhub_entity::{Notification, NotificationFilter};

/// A read-only view of one recipient's cached state.
#[derive(Debug, Clone, Default)]
pub struct CacheSnapshot {
    /// The cached notification list, filtered and ordered per request.
    pub notifications: Vec<Notification>,
    /// The cached unread count.
    pub unread_count: i64,
    /// True until the first fetch for this recipient has completed.
    pub is_loading: bool,
    /// True while a refetch is in flight. Distinct from staleness: a
    /// stale entry keeps serving its last known-good data while the
    /// refetch runs.
    pub is_refreshing: bool,
}

/// One recipient's cached state.
#[derive(Debug, Default)]
struct CacheEntry {
    notifications: Vec<Notification>,
    unread_count: i64,
    /// When the applied data was fetched. `None` marks the entry stale.
    fetched_at: Option<Instant>,
    refreshing: bool,
    /// Monotonic token handed to each refetch as it is issued.
    issued_token: u64,
    /// Token of the last fetch whose result was applied.
    applied_token: u64,
}

impl CacheEntry {
    fn is_stale(&self, window: Duration) -> bool {
        match self.fetched_at {
            None => true,
            Some(at) => at.elapsed() >= window,
        }
    }
}

struct CacheInner {
    store: NotificationStore,
    entries: DashMap<UserId, CacheEntry>,
    /// Session-scoped ids dismissed locally. A late push event for a
    /// tombstoned id must never re-admit it to the active list.
    tombstones: DashMap<UserId, HashSet<NotificationId>>,
    freshness_window: Duration,
    poll_interval: Duration,
}

/// The notification replica cache. Cheap to clone; all clones share
/// state.
#[derive(Clone)]
pub struct NotificationCache {
    inner: Arc<CacheInner>,
}

impl NotificationCache {
    /// Create a cache over a store, with staleness policy from config.
    pub fn new(store: NotificationStore, config: &NotificationsConfig) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                store,
                entries: DashMap::new(),
                tombstones: DashMap::new(),
                freshness_window: Duration::from_secs(config.freshness_window_seconds),
                poll_interval: Duration::from_secs(config.poll_interval_seconds),
            }),
        }
    }

    /// The configured poll interval, used by the poller guard.
    pub(crate) fn poll_interval(&self) -> Duration {
        self.inner.poll_interval
    }

    /// Create the recipient's entry and run the initial fetch.
    ///
    /// This is the only path that creates an entry; [`refresh`] and the
    /// read paths only ever refetch an existing one, so a refresh task
    /// that lands after [`discard`] cannot resurrect a switched-away
    /// recipient.
    ///
    /// [`refresh`]: Self::refresh
    /// [`discard`]: Self::discard
    pub async fn prime(&self, recipient_id: UserId) {
        self.inner.entries.entry(recipient_id).or_default();
        self.refresh(recipient_id).await;
    }

    /// Refetch the recipient's list and unread count from the service.
    /// Skipped entirely when the recipient has no entry (discarded or
    /// never primed).
    ///
    /// Each refetch takes a monotonic token when issued. A completion
    /// is applied only if no newer completion has been applied already;
    /// late results from superseded requests are discarded, so the
    /// cache always reflects the latest completed fetch.
    pub async fn refresh(&self, recipient_id: UserId) {
        let token = {
            let Some(mut entry) = self.inner.entries.get_mut(&recipient_id) else {
                debug!(recipient = %recipient_id, "No cache entry, skipping refresh");
                return;
            };
            entry.issued_token += 1;
            entry.refreshing = true;
            entry.issued_token
        };

        let filter = NotificationFilter::default();
        let listed = self.inner.store.list(recipient_id, &filter).await;
        let counted = self.inner.store.unread_count(recipient_id).await;

        let tombstoned = self.tombstoned_ids(recipient_id);

        // The recipient may have been discarded while the fetch was in
        // flight; its result is simply dropped.
        let Some(mut entry) = self.inner.entries.get_mut(&recipient_id) else {
            return;
        };

        let newest = entry.issued_token == token;
        if newest {
            entry.refreshing = false;
        }

        match (listed, counted) {
            (Ok(rows), Ok(count)) => {
                if token <= entry.applied_token {
                    debug!(
                        recipient = %recipient_id,
                        token,
                        applied = entry.applied_token,
                        "Discarding stale fetch result"
                    );
                    return;
                }
                // Rows dismissed locally but not yet confirmed by the
                // server stay hidden, and their unread share is
                // subtracted from the server's count.
                let hidden_unread = rows
                    .iter()
                    .filter(|n| tombstoned.contains(&n.id) && n.is_unread())
                    .count() as i64;
                entry.notifications = rows
                    .into_iter()
                    .filter(|n| !tombstoned.contains(&n.id))
                    .collect();
                entry.unread_count = (count - hidden_unread).max(0);
                entry.fetched_at = Some(Instant::now());
                entry.applied_token = token;
                debug!(
                    recipient = %recipient_id,
                    count = entry.notifications.len(),
                    unread = entry.unread_count,
                    "Cache refreshed"
                );
            }
            (listed, counted) => {
                let error = listed.err().or(counted.err());
                // Keep serving the last known-good data; the periodic
                // poll retries transient failures.
                warn!(
                    recipient = %recipient_id,
                    error = %error.map(|e| e.to_string()).unwrap_or_default(),
                    "Cache refresh failed, keeping last known-good state"
                );
            }
        }
    }

    /// Spawn a refetch without blocking the caller.
    pub fn refresh_in_background(&self, recipient_id: UserId) {
        let cache = self.clone();
        tokio::spawn(async move {
            cache.refresh(recipient_id).await;
        });
    }

    /// Mark the recipient's entry stale and refetch asynchronously.
    pub fn invalidate(&self, recipient_id: UserId) {
        if let Some(mut entry) = self.inner.entries.get_mut(&recipient_id) {
            entry.fetched_at = None;
        }
        self.refresh_in_background(recipient_id);
    }

    /// Read the recipient's cached state, applying the filter locally.
    ///
    /// Stale data is served as-is and a background refetch is kicked
    /// off; the caller is never blocked on the network.
    pub fn snapshot(&self, recipient_id: UserId, filter: &NotificationFilter) -> CacheSnapshot {
        let snapshot = {
            match self.inner.entries.get(&recipient_id) {
                Some(entry) => {
                    let mut rows: Vec<Notification> = entry
                        .notifications
                        .iter()
                        .filter(|n| filter.matches(n))
                        .cloned()
                        .collect();
                    filter.sort(&mut rows);
                    if let Some(limit) = filter.limit {
                        rows.truncate(limit);
                    }
                    CacheSnapshot {
                        notifications: rows,
                        unread_count: entry.unread_count,
                        is_loading: entry.fetched_at.is_none(),
                        is_refreshing: entry.refreshing,
                    }
                }
                None => CacheSnapshot {
                    is_loading: true,
                    ..CacheSnapshot::default()
                },
            }
        };
        self.refetch_if_stale(recipient_id);
        snapshot
    }

    /// Read the cached unread count. Lightweight path for badge-only
    /// consumers.
    pub fn unread_count(&self, recipient_id: UserId) -> i64 {
        let count = self
            .inner
            .entries
            .get(&recipient_id)
            .map(|entry| entry.unread_count)
            .unwrap_or(0);
        self.refetch_if_stale(recipient_id);
        count
    }

    fn refetch_if_stale(&self, recipient_id: UserId) {
        let should_refetch = match self.inner.entries.get(&recipient_id) {
            Some(entry) => entry.is_stale(self.inner.freshness_window) && !entry.refreshing,
            // No entry means the recipient is not active here.
            None => false,
        };
        if should_refetch {
            self.refresh_in_background(recipient_id);
        }
    }

    /// Drop a recipient's entry and tombstones entirely. Used on
    /// recipient switch: entries are never overlaid across recipients.
    pub fn discard(&self, recipient_id: UserId) {
        self.inner.entries.remove(&recipient_id);
        self.inner.tombstones.remove(&recipient_id);
        debug!(recipient = %recipient_id, "Cache entry discarded");
    }

    // ===== Optimistic mutations (read-state controller only) =====

    /// Cached read flag for one notification, if present.
    pub fn is_read(&self, recipient_id: UserId, id: NotificationId) -> Option<bool> {
        self.inner
            .entries
            .get(&recipient_id)
            .and_then(|entry| entry.notifications.iter().find(|n| n.id == id).map(|n| n.is_read))
    }

    /// Optimistically flip one notification to read, decrementing the
    /// unread count (floored at zero). Returns `true` if a cached
    /// unread row was flipped.
    pub fn apply_read(&self, recipient_id: UserId, id: NotificationId) -> bool {
        let Some(mut entry) = self.inner.entries.get_mut(&recipient_id) else {
            return false;
        };
        let Some(row) = entry.notifications.iter_mut().find(|n| n.id == id) else {
            return false;
        };
        if row.is_read {
            return false;
        }
        row.is_read = true;
        entry.unread_count = (entry.unread_count - 1).max(0);
        true
    }

    /// Roll back an optimistic read flip after a failed mutation.
    pub fn revert_read(&self, recipient_id: UserId, id: NotificationId) {
        let Some(mut entry) = self.inner.entries.get_mut(&recipient_id) else {
            return;
        };
        if let Some(row) = entry.notifications.iter_mut().find(|n| n.id == id) {
            if row.is_read {
                row.is_read = false;
                entry.unread_count += 1;
            }
        }
    }

    /// Optimistically flip every cached unread row to read. Returns the
    /// flipped ids (informational; failures recover by full refetch,
    /// not per-id rollback).
    pub fn apply_all_read(&self, recipient_id: UserId) -> Vec<NotificationId> {
        let Some(mut entry) = self.inner.entries.get_mut(&recipient_id) else {
            return Vec::new();
        };
        let mut flipped = Vec::new();
        for row in entry.notifications.iter_mut() {
            if !row.is_read {
                row.is_read = true;
                flipped.push(row.id);
            }
        }
        entry.unread_count = 0;
        flipped
    }

    /// Optimistically remove one notification and tombstone its id.
    /// Returns the removed row for potential rollback.
    pub fn remove(&self, recipient_id: UserId, id: NotificationId) -> Option<Notification> {
        self.add_tombstone(recipient_id, id);
        let mut entry = self.inner.entries.get_mut(&recipient_id)?;
        let index = entry.notifications.iter().position(|n| n.id == id)?;
        let removed = entry.notifications.remove(index);
        if removed.is_unread() {
            entry.unread_count = (entry.unread_count - 1).max(0);
        }
        Some(removed)
    }

    /// Roll back an optimistic removal: clear the tombstone and
    /// reinsert the row in newest-first position.
    pub fn restore(&self, recipient_id: UserId, notification: Notification) {
        self.clear_tombstone(recipient_id, notification.id);
        let mut entry = self.inner.entries.entry(recipient_id).or_default();
        if entry.notifications.iter().any(|n| n.id == notification.id) {
            return;
        }
        if notification.is_unread() {
            entry.unread_count += 1;
        }
        let position = entry
            .notifications
            .partition_point(|n| n.created_at > notification.created_at);
        entry.notifications.insert(position, notification);
    }

    /// Optimistically remove every cached read row, tombstoning each.
    /// Returns the removed rows for potential rollback.
    pub fn remove_read(&self, recipient_id: UserId) -> Vec<Notification> {
        let removed: Vec<Notification> = {
            let Some(mut entry) = self.inner.entries.get_mut(&recipient_id) else {
                return Vec::new();
            };
            let (read, unread): (Vec<Notification>, Vec<Notification>) = entry
                .notifications
                .drain(..)
                .partition(|n| n.is_read);
            entry.notifications = unread;
            read
        };
        for row in &removed {
            self.add_tombstone(recipient_id, row.id);
        }
        removed
    }

    /// Roll back an optimistic bulk removal.
    pub fn restore_all(&self, recipient_id: UserId, notifications: Vec<Notification>) {
        for row in notifications {
            self.restore(recipient_id, row);
        }
    }

    /// Whether an id was dismissed locally in this session.
    pub fn is_tombstoned(&self, recipient_id: UserId, id: NotificationId) -> bool {
        self.inner
            .tombstones
            .get(&recipient_id)
            .map(|set| set.contains(&id))
            .unwrap_or(false)
    }

    fn add_tombstone(&self, recipient_id: UserId, id: NotificationId) {
        self.inner
            .tombstones
            .entry(recipient_id)
            .or_default()
            .insert(id);
    }

    /// Clear a tombstone, e.g. when rolling back an optimistic dismiss
    /// whose row was not cached.
    pub fn clear_tombstone(&self, recipient_id: UserId, id: NotificationId) {
        if let Some(mut set) = self.inner.tombstones.get_mut(&recipient_id) {
            set.remove(&id);
        }
    }

    fn tombstoned_ids(&self, recipient_id: UserId) -> HashSet<NotificationId> {
        self.inner
            .tombstones
            .get(&recipient_id)
            .map(|set| set.value().clone())
            .unwrap_or_default()
    }
}

impl EventSink for NotificationCache {
    /// Push events invalidate and refetch rather than merging the event
    /// payload: the follow-up fetch is authoritative and the token
    /// check keeps out-of-order completions safe.
    fn handle_event(&self, recipient_id: UserId, event: FeedEvent) {
        let id = event.notification_id();
        match &event {
            FeedEvent::Inserted(_) | FeedEvent::Updated(_) => {
                if self.is_tombstoned(recipient_id, id) {
                    debug!(
                        recipient = %recipient_id,
                        notification = %id,
                        "Ignoring feed event for locally dismissed notification"
                    );
                    return;
                }
            }
            FeedEvent::Deleted(_) => {}
        }
        self.invalidate(recipient_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use examhub_client::events::{BulkPredicate, ReadStatePatch};
    use examhub_client::mock::MemoryDataService;
    use examhub_client::service::{DataService, FeedSubscription};
    use examhub_core::result::AppResult;
    use examhub_entity::{NotificationKind, Priority};
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tokio::sync::oneshot;

    fn config() -> NotificationsConfig {
        NotificationsConfig::default()
    }

    fn notification(recipient_id: UserId, is_read: bool) -> Notification {
        Notification {
            id: NotificationId::new(),
            recipient_id,
            kind: NotificationKind::ChecklistIncomplete,
            priority: Priority::Medium,
            title: "Checklist incomplete".into(),
            message: "Opening checklist has 2 open items".into(),
            link: None,
            is_read,
            is_dismissed: false,
            created_at: Utc::now(),
        }
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    #[tokio::test]
    async fn test_prime_populates_entry() {
        let service = Arc::new(MemoryDataService::new());
        let alice = UserId::new();
        service.seed(notification(alice, false));
        service.seed(notification(alice, true));

        let cache = NotificationCache::new(NotificationStore::new(service), &config());
        cache.prime(alice).await;

        let snapshot = cache.snapshot(alice, &NotificationFilter::default());
        assert_eq!(snapshot.notifications.len(), 2);
        assert_eq!(snapshot.unread_count, 1);
        assert!(!snapshot.is_loading);
    }

    #[tokio::test]
    async fn test_entries_are_recipient_scoped() {
        let service = Arc::new(MemoryDataService::new());
        let alice = UserId::new();
        let bob = UserId::new();
        service.seed(notification(alice, false));
        service.seed(notification(bob, false));

        let cache = NotificationCache::new(NotificationStore::new(service), &config());
        cache.prime(alice).await;

        let snapshot = cache.snapshot(alice, &NotificationFilter::default());
        assert!(snapshot
            .notifications
            .iter()
            .all(|n| n.recipient_id == alice));
    }

    #[tokio::test]
    async fn test_optimistic_read_floors_at_zero() {
        let service = Arc::new(MemoryDataService::new());
        let alice = UserId::new();
        let n = notification(alice, false);
        let id = n.id;
        service.seed(n);

        let cache = NotificationCache::new(NotificationStore::new(service), &config());
        cache.prime(alice).await;

        assert!(cache.apply_read(alice, id));
        assert_eq!(cache.unread_count(alice), 0);
        // Second flip is a no-op and the count stays at zero.
        assert!(!cache.apply_read(alice, id));
        assert_eq!(cache.unread_count(alice), 0);
    }

    #[tokio::test]
    async fn test_tombstoned_event_does_not_resurrect() {
        let service = Arc::new(MemoryDataService::new());
        let alice = UserId::new();
        let n = notification(alice, true);
        let id = n.id;
        service.seed(n.clone());

        let cache = NotificationCache::new(NotificationStore::new(service), &config());
        cache.prime(alice).await;
        cache.remove(alice, id);

        // A late push event for the dismissed id is ignored outright.
        cache.handle_event(alice, FeedEvent::Inserted(n));
        settle().await;

        let snapshot = cache.snapshot(alice, &NotificationFilter::default());
        assert!(snapshot.notifications.iter().all(|row| row.id != id));
    }

    #[tokio::test]
    async fn test_tombstone_survives_refetch() {
        let service = Arc::new(MemoryDataService::new());
        let alice = UserId::new();
        let n = notification(alice, false);
        let id = n.id;
        service.seed(n);

        let cache = NotificationCache::new(NotificationStore::new(service), &config());
        cache.prime(alice).await;
        cache.remove(alice, id);

        // The server still has the row (dismissal not yet confirmed);
        // a refetch must not re-admit it or count it unread.
        cache.refresh(alice).await;
        let snapshot = cache.snapshot(alice, &NotificationFilter::default());
        assert!(snapshot.notifications.is_empty());
        assert_eq!(snapshot.unread_count, 0);
    }

    /// Data service whose list responses are scripted and can be held
    /// back behind a gate, to interleave fetch completions.
    struct ScriptedService {
        lists: Mutex<VecDeque<(Option<oneshot::Receiver<()>>, Vec<Notification>)>>,
        counts: Mutex<VecDeque<i64>>,
    }

    #[async_trait]
    impl DataService for ScriptedService {
        async fn list_notifications(
            &self,
            _recipient_id: UserId,
            _filter: &NotificationFilter,
        ) -> AppResult<Vec<Notification>> {
            let (gate, rows) = self
                .lists
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .pop_front()
                .expect("unscripted list call");
            if let Some(gate) = gate {
                let _ = gate.await;
            }
            Ok(rows)
        }

        async fn unread_count(&self, _recipient_id: UserId) -> AppResult<i64> {
            Ok(self
                .counts
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .pop_front()
                .expect("unscripted count call"))
        }

        async fn update_notification(
            &self,
            _id: NotificationId,
            _recipient_id: UserId,
            _patch: ReadStatePatch,
        ) -> AppResult<Notification> {
            unimplemented!("not used in this test")
        }

        async fn update_all_for_recipient(
            &self,
            _recipient_id: UserId,
            _predicate: BulkPredicate,
            _patch: ReadStatePatch,
        ) -> AppResult<u64> {
            unimplemented!("not used in this test")
        }

        async fn subscribe(&self, _recipient_id: UserId) -> AppResult<FeedSubscription> {
            unimplemented!("not used in this test")
        }
    }

    #[tokio::test]
    async fn test_stale_fetch_completion_is_discarded() {
        let alice = UserId::new();
        let old_row = notification(alice, false);
        let new_row = notification(alice, false);
        let new_id = new_row.id;

        let (release_first, gate) = oneshot::channel();
        let service = Arc::new(ScriptedService {
            // Initial prime is empty; the next refresh is gated; the
            // one after completes immediately.
            lists: Mutex::new(VecDeque::from(vec![
                (None, Vec::new()),
                (Some(gate), vec![old_row]),
                (None, vec![new_row]),
            ])),
            counts: Mutex::new(VecDeque::from(vec![0, 1, 1])),
        });

        let cache = NotificationCache::new(NotificationStore::new(service), &config());
        cache.prime(alice).await;

        let first = {
            let cache = cache.clone();
            tokio::spawn(async move { cache.refresh(alice).await })
        };
        settle().await; // first refresh has taken its token and is gated

        cache.refresh(alice).await; // second refresh applies
        release_first.send(()).unwrap();
        first.await.unwrap(); // first completes late; its result is stale

        let snapshot = cache.snapshot(alice, &NotificationFilter::default());
        assert_eq!(snapshot.notifications.len(), 1);
        assert_eq!(snapshot.notifications[0].id, new_id);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_read_triggers_background_refetch() {
        let service = Arc::new(MemoryDataService::new());
        let alice = UserId::new();
        service.seed(notification(alice, false));

        let config = config();
        let cache = NotificationCache::new(NotificationStore::new(service.clone()), &config);
        cache.prime(alice).await;

        // A second row lands server-side with no push event.
        service.seed(notification(alice, false));

        // Within the freshness window the cached list is served as-is
        // and no refetch is kicked off.
        tokio::time::sleep(Duration::from_secs(config.freshness_window_seconds / 2)).await;
        let cached = cache.snapshot(alice, &NotificationFilter::default());
        assert_eq!(cached.notifications.len(), 1);
        settle().await;
        let cached = cache.snapshot(alice, &NotificationFilter::default());
        assert_eq!(cached.notifications.len(), 1);

        // Past the window a read still serves the stale data, but the
        // background refetch it triggers picks up the new row.
        tokio::time::sleep(Duration::from_secs(config.freshness_window_seconds)).await;
        let stale = cache.snapshot(alice, &NotificationFilter::default());
        assert_eq!(stale.notifications.len(), 1);
        settle().await;
        let fresh = cache.snapshot(alice, &NotificationFilter::default());
        assert_eq!(fresh.notifications.len(), 2);
        assert_eq!(fresh.unread_count, 2);
    }

    #[tokio::test]
    async fn test_late_refresh_after_discard_is_dropped() {
        let service = Arc::new(MemoryDataService::new());
        let alice = UserId::new();
        service.seed(notification(alice, false));

        let cache = NotificationCache::new(NotificationStore::new(service), &config());
        cache.prime(alice).await;
        cache.discard(alice);

        // A refresh queued before the recipient switch lands after the
        // discard; it must not recreate the entry.
        cache.refresh(alice).await;

        let snapshot = cache.snapshot(alice, &NotificationFilter::default());
        assert!(snapshot.is_loading);
        assert!(snapshot.notifications.is_empty());
        assert_eq!(cache.unread_count(alice), 0);
    }

    #[tokio::test]
    async fn test_discard_drops_entry_and_tombstones() {
        let service = Arc::new(MemoryDataService::new());
        let alice = UserId::new();
        let n = notification(alice, false);
        let id = n.id;
        service.seed(n);

        let cache = NotificationCache::new(NotificationStore::new(service), &config());
        cache.prime(alice).await;
        cache.remove(alice, id);
        assert!(cache.is_tombstoned(alice, id));

        cache.discard(alice);
        assert!(!cache.is_tombstoned(alice, id));
        let snapshot = cache.snapshot(alice, &NotificationFilter::default());
        assert!(snapshot.is_loading);
    }
}
