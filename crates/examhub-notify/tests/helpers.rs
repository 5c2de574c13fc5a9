//! Shared test helpers for integration tests.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;

use examhub_client::mock::MemoryDataService;
use examhub_core::config::notifications::NotificationsConfig;
use examhub_core::types::{NotificationId, UserId};
use examhub_entity::{Notification, NotificationKind, Priority};
use examhub_notify::{NotificationCenter, Toast, ToastSink};

/// Toast sink that records every presented toast.
#[derive(Default)]
pub struct RecordingToastSink {
    toasts: Mutex<Vec<Toast>>,
}

impl RecordingToastSink {
    pub fn count(&self) -> usize {
        self.toasts.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn last(&self) -> Option<Toast> {
        self.toasts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .last()
            .cloned()
    }
}

impl ToastSink for RecordingToastSink {
    fn toast(&self, toast: Toast) {
        self.toasts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(toast);
    }
}

/// A fully wired notification center over the in-memory service.
pub struct TestCenter {
    pub service: Arc<MemoryDataService>,
    pub toasts: Arc<RecordingToastSink>,
    pub center: NotificationCenter,
}

impl TestCenter {
    pub fn new() -> Self {
        let service = Arc::new(MemoryDataService::new());
        let toasts = Arc::new(RecordingToastSink::default());
        let center = NotificationCenter::new(
            service.clone(),
            toasts.clone(),
            &NotificationsConfig::default(),
        );
        Self {
            service,
            toasts,
            center,
        }
    }
}

pub fn notification(recipient_id: UserId, priority: Priority, is_read: bool) -> Notification {
    Notification {
        id: NotificationId::new(),
        recipient_id,
        kind: NotificationKind::IncidentAssigned,
        priority,
        title: "Incident assigned".into(),
        message: "Room 4 camera outage".into(),
        link: Some("/incidents/42".into()),
        is_read,
        is_dismissed: false,
        created_at: Utc::now(),
    }
}

/// Let background feed delivery and refetches run.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(30)).await;
}
