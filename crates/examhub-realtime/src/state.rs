//! Feed subscription lifecycle states.

/// Lifecycle state of the push subscription.
///
/// `Closed → Connecting → Open → Closed` on explicit teardown, with
/// `Open → Reconnecting → Open` when the transport reports a drop. The
/// subscriber implements no backoff of its own; the cache's periodic
/// poll is the correctness backstop while the channel is down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedState {
    /// No live subscription.
    Closed,
    /// Subscription requested, not yet confirmed.
    Connecting,
    /// Subscription live, events flowing.
    Open,
    /// Transport dropped; a single resubscribe attempt is in flight.
    Reconnecting,
}

impl FeedState {
    /// Return the state as a string, for logs and surfaces.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Reconnecting => "reconnecting",
        }
    }
}

impl std::fmt::Display for FeedState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
