//! Stream session state

use crate::error::TransportError;

/// Why a session ended in failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorReason {
    /// No bearer token could be obtained; no connection was attempted
    Unauthenticated,
    /// The connection failed before or during streaming
    Transport(TransportError),
}

impl std::fmt::Display for ErrorReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorReason::Unauthenticated => write!(f, "Authentication required"),
            ErrorReason::Transport(err) => write!(f, "{}", err),
        }
    }
}

/// Lifecycle of one stream session
///
/// `Idle -> Authenticating -> Streaming -> {Complete | Errored}`. `Errored` is
/// also reachable from `Idle` (no token) and `Authenticating` (connect failure).
/// Nothing leaves `Complete` or `Errored`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum StreamState {
    #[default]
    Idle,
    /// Token acquired, waiting for the first fragment
    Authenticating,
    Streaming,
    /// Server closed the stream; the buffer is final
    Complete,
    Errored(ErrorReason),
}

impl StreamState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamState::Complete | StreamState::Errored(_))
    }

    /// No content yet and still waiting on the server or identity provider
    pub fn is_pending(&self) -> bool {
        matches!(self, StreamState::Idle | StreamState::Authenticating)
    }

    pub fn name(&self) -> &'static str {
        match self {
            StreamState::Idle => "idle",
            StreamState::Authenticating => "authenticating",
            StreamState::Streaming => "streaming",
            StreamState::Complete => "complete",
            StreamState::Errored(_) => "errored",
        }
    }
}

/// What a subscriber sees after every change
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub state: StreamState,
    /// Cumulative content so far, ready for the markdown renderer
    pub content: String,
}
