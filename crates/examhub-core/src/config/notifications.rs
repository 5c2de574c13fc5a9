//! Notification subsystem configuration.

use serde::{Deserialize, Serialize};

/// Notification cache, feed, and presentation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    /// Freshness window in seconds. Cached data older than this is
    /// refetched on the next read even without a push event.
    #[serde(default = "default_freshness_window")]
    pub freshness_window_seconds: u64,
    /// Periodic poll interval in seconds. The backstop against missed
    /// or coalesced push events.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_seconds: u64,
    /// Maximum number of items selected for the compact banner view.
    #[serde(default = "default_banner_limit")]
    pub banner_limit: usize,
    /// Hours after creation during which a notification shows a "New"
    /// badge.
    #[serde(default = "default_new_badge_hours")]
    pub new_badge_hours: i64,
    /// Toast presentation settings.
    #[serde(default)]
    pub toast: ToastConfig,
}

/// Toast duration and deduplication settings per priority tier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToastConfig {
    /// Display duration for high-priority toasts in milliseconds.
    #[serde(default = "default_high_duration")]
    pub high_duration_ms: u64,
    /// Display duration for medium-priority toasts in milliseconds.
    #[serde(default = "default_medium_duration")]
    pub medium_duration_ms: u64,
    /// Window within which repeat toasts for the same notification are
    /// suppressed, in milliseconds.
    #[serde(default = "default_dedup_window")]
    pub dedup_window_ms: u64,
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            freshness_window_seconds: default_freshness_window(),
            poll_interval_seconds: default_poll_interval(),
            banner_limit: default_banner_limit(),
            new_badge_hours: default_new_badge_hours(),
            toast: ToastConfig::default(),
        }
    }
}

impl Default for ToastConfig {
    fn default() -> Self {
        Self {
            high_duration_ms: default_high_duration(),
            medium_duration_ms: default_medium_duration(),
            dedup_window_ms: default_dedup_window(),
        }
    }
}

fn default_freshness_window() -> u64 {
    30
}

fn default_poll_interval() -> u64 {
    60
}

fn default_banner_limit() -> usize {
    3
}

fn default_new_badge_hours() -> i64 {
    24
}

fn default_high_duration() -> u64 {
    8000
}

fn default_medium_duration() -> u64 {
    4000
}

fn default_dedup_window() -> u64 {
    500
}
