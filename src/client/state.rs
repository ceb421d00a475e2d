//! Session states and notices

use std::fmt;

use crate::shared::{ConnectionId, HubError};

/// Where a client session is in its lifecycle
///
/// ```text
/// Disconnected -> Connecting -> Connected -> Reconnecting -> Connected
///                                                  \-> Disconnected
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Connected { connection_id: ConnectionId },
    /// Waiting out the backoff before attempt number `attempt`
    Reconnecting { attempt: u32 },
}

impl SessionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected { .. })
    }

    pub fn connection_id(&self) -> Option<ConnectionId> {
        match self {
            Self::Connected { connection_id } => Some(*connection_id),
            _ => None,
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connecting => write!(f, "connecting"),
            Self::Connected { connection_id } => write!(f, "connected ({})", connection_id),
            Self::Reconnecting { attempt } => write!(f, "reconnecting (attempt {})", attempt),
        }
    }
}

/// Lifecycle notices published to observers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionNotice {
    Connected(ConnectionId),
    /// One connect attempt failed; the session will retry unless stopped
    AttemptFailed { attempt: u32, error: HubError },
    /// An established link was lost, or the session gave up
    Disconnected { reason: String },
}
