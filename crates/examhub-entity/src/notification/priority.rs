//! Notification priority levels.

use serde::{Deserialize, Serialize};

/// Notification priority levels.
///
/// Immutable once a notification is created. The derive order gives
/// `Low < Medium < High < Critical`, so a descending sort puts the most
/// urgent tier first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// Low priority — never toasted, badge/list update only.
    Low,
    /// Medium priority — short-duration toast.
    Medium,
    /// High priority — medium-duration toast.
    High,
    /// Critical priority — persistent toast, always shown immediately.
    Critical,
}

impl Priority {
    /// Convert to string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }

    /// Whether notifications of this priority arrive silently, with no
    /// toast. Deliberate noise reduction for the lowest tier.
    pub fn is_silent(&self) -> bool {
        matches!(self, Self::Low)
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
