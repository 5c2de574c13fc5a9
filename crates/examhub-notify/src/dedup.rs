//! Suppression of repeat toasts within a time window.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use examhub_core::types::NotificationId;

/// Toast deduplicator. A notification that arrives again within the
/// window (duplicate delivery, reconnect replay) toasts only once.
#[derive(Debug)]
pub struct ToastDeduplicator {
    window: Duration,
    /// Last toast time per notification id
    last_seen: Mutex<HashMap<NotificationId, Instant>>,
}

impl ToastDeduplicator {
    /// Create a deduplicator with the given window
    pub fn new(window_ms: u64) -> Self {
        Self {
            window: Duration::from_millis(window_ms),
            last_seen: Mutex::new(HashMap::new()),
        }
    }

    /// Check if a toast for this id should be displayed.
    ///
    /// Returns `true` if the toast should proceed, `false` if it's a duplicate.
    pub fn should_display(&self, id: NotificationId) -> bool {
        let mut map = self.last_seen.lock().unwrap_or_else(|e| e.into_inner());
        let now = Instant::now();

        if let Some(last) = map.get(&id) {
            if now.duration_since(*last) < self.window {
                return false; // Too recent — suppress
            }
        }

        map.insert(id, now);
        // Opportunistic cleanup keeps the map bounded for long sessions.
        if map.len() > 128 {
            let cutoff = self.window * 10;
            map.retain(|_, v| now.duration_since(*v) < cutoff);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeat_within_window_is_suppressed() {
        let dedup = ToastDeduplicator::new(500);
        let id = NotificationId::new();

        assert!(dedup.should_display(id));
        assert!(!dedup.should_display(id));
    }

    #[test]
    fn test_distinct_ids_are_independent() {
        let dedup = ToastDeduplicator::new(500);

        assert!(dedup.should_display(NotificationId::new()));
        assert!(dedup.should_display(NotificationId::new()));
    }

    #[test]
    fn test_repeat_after_window_displays_again() {
        let dedup = ToastDeduplicator::new(0);
        let id = NotificationId::new();

        assert!(dedup.should_display(id));
        assert!(dedup.should_display(id));
    }
}
