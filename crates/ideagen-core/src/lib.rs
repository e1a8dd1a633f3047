//! ideagen core
//!
//! - Entitlement resolution over the user's profile signals
//! - Identity provider seam and file-backed session
//! - Authenticated idea stream: SSE decoding, transport, session state machine
//! - View model for the gated idea page
//! - Subscription webhook verification

pub mod auth;
pub mod config;
pub mod entitlement;
pub mod error;
pub mod stream;
pub mod view;
pub mod webhook;

pub use config::Config;
pub use entitlement::{gate, resolve, AccessDecision, Gate, Profile, ProfileSnapshot};
pub use error::{ConfigError, TransportError, WebhookError};
pub use stream::{StreamSession, StreamState};
pub use view::IdeaView;
