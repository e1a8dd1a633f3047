//! View model for the idea page
//!
//! Maps the gate and the session snapshot to what should be on screen,
//! independent of how it is drawn.

use crate::entitlement::Gate;
use crate::stream::{ErrorReason, SessionSnapshot, StreamState};

pub const LOADING_TEXT: &str = "Loading...";
pub const GENERATING_TEXT: &str = "Generating your business idea...";
pub const AUTH_REQUIRED_TEXT: &str = "Authentication required";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdeaView {
    /// Profile not loaded yet
    Loading,
    /// Signed out or no active subscription
    Paywall,
    /// Waiting on the token or the first fragment
    Generating,
    AuthenticationRequired,
    /// Markdown to render; may be partial while streaming
    Content(String),
    /// Stream failed; whatever arrived stays visible
    Failed { content: String, message: String },
}

impl IdeaView {
    /// View before any session exists
    ///
    /// A granted gate shows the pending state until the session reports.
    pub fn for_gate(gate: Gate) -> Self {
        match gate {
            Gate::Loading => IdeaView::Loading,
            Gate::Paywall => IdeaView::Paywall,
            Gate::Granted => IdeaView::Generating,
        }
    }

    pub fn from_snapshot(snapshot: &SessionSnapshot) -> Self {
        match &snapshot.state {
            StreamState::Idle | StreamState::Authenticating => IdeaView::Generating,
            StreamState::Streaming | StreamState::Complete => {
                IdeaView::Content(snapshot.content.clone())
            }
            StreamState::Errored(ErrorReason::Unauthenticated) => {
                IdeaView::AuthenticationRequired
            }
            StreamState::Errored(reason @ ErrorReason::Transport(_)) => IdeaView::Failed {
                content: snapshot.content.clone(),
                message: reason.to_string(),
            },
        }
    }

    /// Markdown to hand to the renderer, if any
    pub fn markdown(&self) -> Option<&str> {
        match self {
            IdeaView::Content(content) | IdeaView::Failed { content, .. } => Some(content),
            _ => None,
        }
    }
}
