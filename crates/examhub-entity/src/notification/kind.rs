//! Notification kind enumeration.

use serde::{Deserialize, Serialize};

/// The business event a notification was created for. Drives the icon
/// and category label in the presenter.
///
/// The tag set is closed on the backend, but the client must tolerate
/// tags it does not know yet: unrecognized values deserialize to
/// [`NotificationKind::Unknown`] and fall back to a generic icon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// An incident was assigned to the recipient.
    IncidentAssigned,
    /// A leave request was approved.
    LeaveApproved,
    /// A shift assignment changed.
    ShiftChanged,
    /// A checklist has unanswered items.
    ChecklistIncomplete,
    /// A testing session was scheduled.
    SessionScheduled,
    /// A document was shared with the recipient.
    DocumentShared,
    /// A system-wide news item.
    SystemNews,
    /// Any tag the client does not recognize.
    #[serde(other)]
    Unknown,
}

impl NotificationKind {
    /// Return the kind as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IncidentAssigned => "incident_assigned",
            Self::LeaveApproved => "leave_approved",
            Self::ShiftChanged => "shift_changed",
            Self::ChecklistIncomplete => "checklist_incomplete",
            Self::SessionScheduled => "session_scheduled",
            Self::DocumentShared => "document_shared",
            Self::SystemNews => "system_news",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
